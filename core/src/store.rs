//! In-memory transaction store.
//!
//! RULE: The store is a pure data holder for one analysis run.
//! It never validates, derives or mutates records after ingestion.
//! Each run owns its own store; nothing here is shared between runs.

use crate::types::CustomerId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One customer order.
///
/// `customer_id` and `product` default to empty when absent from the
/// serialized form so that a missing field is reported by validation
/// instead of failing the whole parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub customer_id: CustomerId,
    pub order_date:  NaiveDate,
    pub amount:      f64,
    #[serde(default)]
    pub product:     String,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<CustomerId>,
        order_date: NaiveDate,
        amount: f64,
        product: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            order_date,
            amount,
            product: product.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Sum of every transaction amount.
    pub fn total_amount(&self) -> f64 {
        self.transactions.iter().map(|t| t.amount).sum()
    }
}

impl From<Vec<Transaction>> for TransactionStore {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self::new(transactions)
    }
}

impl FromIterator<Transaction> for TransactionStore {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
