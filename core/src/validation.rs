//! Transaction validation: the gate in front of RFM derivation.
//!
//! A record is malformed when its customer id or product is empty,
//! its amount is negative or not finite, or its order date is after
//! the reference date. What happens next is decided by ValidationPolicy.

use crate::{
    config::ValidationPolicy,
    context::AnalysisContext,
    error::{RfmError, RfmResult},
    event::AnalysisEvent,
    stage::{AnalysisStage, StageOutput},
    store::{Transaction, TransactionStore},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    CustomerId,
    OrderDate,
    Amount,
    Product,
}

impl RecordField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CustomerId => "customer_id",
            Self::OrderDate  => "order_date",
            Self::Amount     => "amount",
            Self::Product    => "product",
        }
    }
}

/// A record that failed validation, with enough detail to find and fix it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position of the record in the submitted batch.
    pub index:       usize,
    pub customer_id: String,
    pub field:       RecordField,
    pub reason:      String,
}

impl fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record #{} (customer '{}'): {} {}",
            self.index,
            self.customer_id,
            self.field.name(),
            self.reason
        )
    }
}

/// Accepted records plus the rejects.
#[derive(Debug, Clone, Default)]
pub struct ValidatedBatch {
    pub accepted: TransactionStore,
    pub rejected: Vec<RejectedRecord>,
}

/// Check a single record. Returns the first problem found.
pub fn check_record(
    index: usize,
    txn: &Transaction,
    reference_date: NaiveDate,
) -> Option<RejectedRecord> {
    let reject = |field: RecordField, reason: String| RejectedRecord {
        index,
        customer_id: txn.customer_id.clone(),
        field,
        reason,
    };

    if txn.customer_id.trim().is_empty() {
        return Some(reject(RecordField::CustomerId, "is missing".into()));
    }
    if !txn.amount.is_finite() {
        return Some(reject(RecordField::Amount, format!("is not a finite number ({})", txn.amount)));
    }
    if txn.amount < 0.0 {
        return Some(reject(RecordField::Amount, format!("is negative ({:.2})", txn.amount)));
    }
    if txn.order_date > reference_date {
        return Some(reject(
            RecordField::OrderDate,
            format!("{} is after reference date {reference_date}", txn.order_date),
        ));
    }
    if txn.product.trim().is_empty() {
        return Some(reject(RecordField::Product, "is missing".into()));
    }
    None
}

pub struct TransactionValidator {
    policy: ValidationPolicy,
}

impl TransactionValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Split `store` into accepted and rejected records.
    ///
    /// Fails with `InvalidRecords` under `Strict` when anything is rejected,
    /// and under `RejectInvalid` when every record of a non-empty batch is.
    pub fn validate(
        &self,
        store: &TransactionStore,
        reference_date: NaiveDate,
    ) -> RfmResult<ValidatedBatch> {
        let mut accepted = Vec::with_capacity(store.len());
        let mut rejected = Vec::new();

        for (index, txn) in store.iter().enumerate() {
            match check_record(index, txn, reference_date) {
                Some(reject) => rejected.push(reject),
                None         => accepted.push(txn.clone()),
            }
        }

        if rejected.is_empty() {
            return Ok(ValidatedBatch { accepted: accepted.into(), rejected });
        }

        let nothing_left = accepted.is_empty();
        match self.policy {
            ValidationPolicy::Strict => Err(RfmError::InvalidRecords { rejected }),
            ValidationPolicy::RejectInvalid if nothing_left => {
                Err(RfmError::InvalidRecords { rejected })
            }
            ValidationPolicy::RejectInvalid => {
                for r in &rejected {
                    log::warn!("Rejected {r}");
                }
                Ok(ValidatedBatch { accepted: accepted.into(), rejected })
            }
        }
    }
}

impl AnalysisStage for TransactionValidator {
    type Input = TransactionStore;
    type Output = ValidatedBatch;

    fn name(&self) -> &'static str {
        "validation"
    }

    fn run(
        &self,
        ctx: &AnalysisContext,
        input: &TransactionStore,
    ) -> RfmResult<StageOutput<ValidatedBatch>> {
        let batch = self.validate(input, ctx.reference_date)?;

        let mut events = vec![AnalysisEvent::RecordsValidated {
            accepted: batch.accepted.len(),
            rejected: batch.rejected.len(),
        }];
        events.extend(batch.rejected.iter().map(|r| AnalysisEvent::RecordRejected {
            index:       r.index,
            customer_id: r.customer_id.clone(),
            field:       r.field.name().to_string(),
            reason:      r.reason.clone(),
        }));

        Ok(StageOutput::with_events(batch, events))
    }
}
