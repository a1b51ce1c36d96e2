//! Stage trait.
//!
//! RULE: Every pipeline step implements AnalysisStage.
//! A stage reads the previous stage's table and returns a NEW table.
//! It never mutates its input and never calls another stage.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    context::AnalysisContext,
    error::RfmResult,
    event::AnalysisEvent,
};

/// The table a stage produced, plus what it wants recorded in the log.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub table:  T,
    pub events: Vec<AnalysisEvent>,
}

impl<T> StageOutput<T> {
    pub fn with_events(table: T, events: Vec<AnalysisEvent>) -> Self {
        Self { table, events }
    }
}

/// The contract every pipeline stage must fulfill.
pub trait AnalysisStage {
    type Input: ?Sized;
    type Output;

    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Run the stage once over `input` as of `ctx`.
    fn run(
        &self,
        ctx: &AnalysisContext,
        input: &Self::Input,
    ) -> RfmResult<StageOutput<Self::Output>>;
}
