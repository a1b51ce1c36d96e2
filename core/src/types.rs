//! Shared primitive types used across the entire analysis pipeline.

/// A stable, unique identifier for a customer.
pub type CustomerId = String;

/// The canonical analysis run identifier.
pub type RunId = String;

/// A single R, F or M score. Always in `MIN_SCORE..=MAX_SCORE`.
pub type Score = u8;

pub const MIN_SCORE: Score = 1;
pub const MAX_SCORE: Score = 5;

/// Combine three scores into the 3-digit RFM code (e.g. 5, 3, 1 → 531).
pub fn rfm_code(r: Score, f: Score, m: Score) -> u16 {
    r as u16 * 100 + f as u16 * 10 + m as u16
}
