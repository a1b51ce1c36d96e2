use crate::validation::RejectedRecord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfmError {
    #[error("Invalid input for customer '{customer_id}': {field} {reason}")]
    InvalidInput {
        customer_id: String,
        field:       String,
        reason:      String,
    },

    #[error("{} invalid transaction record(s); first: {}", .rejected.len(), first_rejection(.rejected))]
    InvalidRecords { rejected: Vec<RejectedRecord> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown segment '{name}'")]
    UnknownSegment { name: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn first_rejection(rejected: &[RejectedRecord]) -> String {
    rejected
        .first()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".into())
}

pub type RfmResult<T> = Result<T, RfmError>;
