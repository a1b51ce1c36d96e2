//! RFM derivation: raw per-customer recency, frequency and monetary values.
//!
//! One CustomerRfm per distinct customer id present in the store,
//! ordered by customer id. Customers without transactions never appear.

use crate::{
    context::AnalysisContext,
    error::{RfmError, RfmResult},
    event::AnalysisEvent,
    stage::{AnalysisStage, StageOutput},
    store::TransactionStore,
    types::CustomerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRfm {
    pub customer_id:  CustomerId,
    pub recency_days: i64,
    pub frequency:    u32,
    pub monetary:     f64,
}

struct Accumulator {
    last_order: NaiveDate,
    frequency:  u32,
    monetary:   f64,
}

pub struct RfmCalculator;

impl RfmCalculator {
    /// Derive CustomerRfm rows as of `reference_date`.
    ///
    /// Fails with `InvalidInput` if any customer has an order dated
    /// after the reference date, or if a customer's order amounts sum
    /// past the range of f64.
    pub fn calculate(
        store: &TransactionStore,
        reference_date: NaiveDate,
    ) -> RfmResult<Vec<CustomerRfm>> {
        let mut by_customer: BTreeMap<&str, Accumulator> = BTreeMap::new();

        for txn in store.iter() {
            by_customer
                .entry(txn.customer_id.as_str())
                .and_modify(|acc| {
                    acc.last_order = acc.last_order.max(txn.order_date);
                    acc.frequency += 1;
                    acc.monetary += txn.amount;
                })
                .or_insert(Accumulator {
                    last_order: txn.order_date,
                    frequency:  1,
                    monetary:   txn.amount,
                });
        }

        by_customer
            .into_iter()
            .map(|(customer_id, acc)| {
                if acc.last_order > reference_date {
                    return Err(RfmError::InvalidInput {
                        customer_id: customer_id.to_string(),
                        field:       "order_date".into(),
                        reason:      format!(
                            "{} is after reference date {reference_date}",
                            acc.last_order
                        ),
                    });
                }
                if !acc.monetary.is_finite() {
                    return Err(RfmError::InvalidInput {
                        customer_id: customer_id.to_string(),
                        field:       "amount".into(),
                        reason:      format!(
                            "total of {} orders overflows f64",
                            acc.frequency
                        ),
                    });
                }
                Ok(CustomerRfm {
                    customer_id:  customer_id.to_string(),
                    recency_days: (reference_date - acc.last_order).num_days(),
                    frequency:    acc.frequency,
                    monetary:     acc.monetary,
                })
            })
            .collect()
    }
}

impl AnalysisStage for RfmCalculator {
    type Input = TransactionStore;
    type Output = Vec<CustomerRfm>;

    fn name(&self) -> &'static str {
        "rfm_calculator"
    }

    fn run(
        &self,
        ctx: &AnalysisContext,
        input: &TransactionStore,
    ) -> RfmResult<StageOutput<Vec<CustomerRfm>>> {
        let rows = Self::calculate(input, ctx.reference_date)?;
        log::debug!("Derived RFM values for {} customers", rows.len());
        let events = vec![AnalysisEvent::CustomersDerived { customers: rows.len() }];
        Ok(StageOutput::with_events(rows, events))
    }
}
