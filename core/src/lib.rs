//! Percentile-based RFM scoring and customer segmentation.
//!
//! Pipeline: TransactionStore → validation → RFM calculator →
//! percentile scorer → segment classifier → customer table,
//! with read-only aggregation views on top. See engine.rs.

pub mod aggregation;
pub mod config;
pub mod context;
pub mod customer_table;
pub mod engine;
pub mod error;
pub mod event;
pub mod percentile;
pub mod percentile_scorer;
pub mod report;
pub mod rfm_calculator;
pub mod rng;
pub mod sample;
pub mod segment;
pub mod segment_classifier;
pub mod stage;
pub mod store;
pub mod types;
pub mod validation;
