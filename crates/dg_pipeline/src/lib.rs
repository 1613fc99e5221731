//! The digest pipeline: a fixed stage graph over one shared [`RunState`].
//!
//! Each stage reads the state and returns a [`StagePatch`]; the [`Pipeline`] merges
//! patches with field-level replace, records a [`StageEvent`] per stage and decides
//! whether a failure ends the run.

pub mod orchestrator;
pub mod patch;
pub mod services;
pub mod stage;
pub mod stages;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use orchestrator::{validate_request, Pipeline};
pub use patch::StagePatch;
pub use services::Services;
pub use stage::{FailurePolicy, Stage, StageContext, StageDescriptor, StageGraph, StageOutput};
pub use state::{RunOutcome, RunState, SkippedItem, StageEvent, StageName, StageStatus};
pub use tokio_util::sync::CancellationToken;

pub mod prelude {
    pub use super::{CancellationToken, Pipeline, RunOutcome, RunState, Services, StageName, StageStatus};
    pub use dg_core::{DigestConfig, Error, Result};
}
