//! Synthetic transaction generator.
//!
//! Produces a reproducible order history for demos and tests: a mix of
//! loyal regulars, occasional buyers and lapsed customers, so that every
//! segment tends to be populated. Same seed, same transactions.

use crate::{
    rng::{SampleRng, StreamSlot},
    store::{Transaction, TransactionStore},
};
use chrono::{Days, NaiveDate};

pub const DEFAULT_PRODUCTS: &[&str] = &[
    "Electronics",
    "Fashion",
    "Groceries",
    "Home Decor",
    "Sports",
    "Books",
];

/// Customer archetype: (population share, mean orders, days since last order upper bound).
const ARCHETYPES: &[(f64, f64, u64)] = &[
    (0.25, 14.0, 20),   // regulars
    (0.35, 5.0, 120),   // occasional
    (0.25, 2.0, 300),   // lapsing
    (0.15, 1.0, 700),   // one-off
];

#[derive(Debug, Clone)]
pub struct SampleGenerator {
    pub customers:      usize,
    pub reference_date: NaiveDate,
    /// Length of the order history in days, ending at the reference date.
    pub history_days:   u64,
    pub products:       Vec<String>,
}

impl SampleGenerator {
    pub fn new(customers: usize, reference_date: NaiveDate) -> Self {
        Self {
            customers,
            reference_date,
            history_days: 730,
            products: DEFAULT_PRODUCTS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn generate(&self, seed: u64) -> TransactionStore {
        if self.products.is_empty() {
            return TransactionStore::empty();
        }
        let mut customer_rng = SampleRng::new(seed, StreamSlot::Customers);
        let mut order_rng = SampleRng::new(seed, StreamSlot::Orders);
        let mut product_rng = SampleRng::new(seed, StreamSlot::Products);

        let shares: Vec<f64> = ARCHETYPES.iter().map(|a| a.0).collect();
        let mut transactions = Vec::new();

        for i in 0..self.customers {
            let (_, mean_orders, max_gap) = ARCHETYPES[customer_rng.weighted_index(&shares)];
            let customer_id = format!("c-{i:06}");

            // Orders: archetype mean ± 50%, at least one.
            let adj = 1.0 + (customer_rng.next_f64() - 0.5);
            let orders = ((mean_orders * adj).round() as u64).max(1);

            let last_gap = order_rng.next_u64_below(max_gap.min(self.history_days) + 1);
            let favourite = product_rng.next_u64_below(self.products.len() as u64) as usize;

            for n in 0..orders {
                let gap = if n == 0 {
                    last_gap
                } else {
                    let room = self.history_days.saturating_sub(last_gap) + 1;
                    last_gap + order_rng.next_u64_below(room)
                };
                let Some(order_date) = self.reference_date.checked_sub_days(Days::new(gap)) else {
                    continue;
                };

                let product = if product_rng.chance(0.6) {
                    favourite
                } else {
                    product_rng.next_u64_below(self.products.len() as u64) as usize
                };
                let amount = (order_rng.pareto(20.0, 1.6).min(5_000.0) * 100.0).round() / 100.0;

                transactions.push(Transaction::new(
                    customer_id.clone(),
                    order_date,
                    amount,
                    self.products[product].clone(),
                ));
            }
        }

        log::debug!(
            "Generated {} synthetic transactions for {} customers (seed {seed})",
            transactions.len(),
            self.customers
        );
        transactions.into()
    }
}
