use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use dg_core::{Error, Result};
use crate::patch::StagePatch;
use crate::state::{RunState, SkippedItem, StageName};

/// What a stage hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub patch: StagePatch,
    pub skipped: Vec<SkippedItem>,
}

impl StageOutput {
    pub fn new(patch: StagePatch) -> Self {
        Self {
            patch,
            skipped: Vec::new(),
        }
    }

    pub fn with_skipped(mut self, skipped: Vec<SkippedItem>) -> Self {
        self.skipped = skipped;
        self
    }
}

/// Per-run execution settings shared by every stage.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub cancel: CancellationToken,
    pub concurrency: usize,
}

impl StageContext {
    pub fn new(cancel: CancellationToken, concurrency: usize) -> Self {
        Self {
            cancel,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// `Some(reason)` when the stage should not run against this state.
    fn skip_reason(&self, _state: &RunState) -> Option<String> {
        None
    }

    async fn run(&self, state: &RunState, ctx: &StageContext) -> Result<StageOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Configuration errors abort the run; anything else degrades to an empty patch.
    Required,
    /// Every error degrades to an empty patch.
    BestEffort,
}

#[derive(Clone)]
pub struct StageDescriptor {
    pub name: StageName,
    pub predecessor: Option<StageName>,
    pub policy: FailurePolicy,
    pub stage: Arc<dyn Stage>,
}

impl fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("name", &self.name)
            .field("predecessor", &self.predecessor)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Stages in execution order. The order is fixed when the graph is built.
#[derive(Debug, Clone)]
pub struct StageGraph {
    stages: Vec<StageDescriptor>,
}

impl StageGraph {
    pub fn builder() -> StageGraphBuilder {
        StageGraphBuilder::default()
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }
}

#[derive(Default)]
pub struct StageGraphBuilder {
    stages: Vec<StageDescriptor>,
}

impl StageGraphBuilder {
    /// Register a stage after `predecessor`, which must already be registered.
    pub fn stage(mut self, predecessor: Option<StageName>, policy: FailurePolicy, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(StageDescriptor {
            name: stage.name(),
            predecessor,
            policy,
            stage,
        });
        self
    }

    pub fn build(self) -> Result<StageGraph> {
        let mut seen = HashSet::new();
        let mut roots = 0;

        for descriptor in &self.stages {
            if descriptor.name == StageName::End {
                return Err(Error::Configuration("'end' is implicit and cannot be registered".to_string()));
            }
            match descriptor.predecessor {
                None => roots += 1,
                Some(predecessor) if !seen.contains(&predecessor) => {
                    return Err(Error::Configuration(format!(
                        "Stage '{}' follows '{}', which is not registered before it",
                        descriptor.name, predecessor
                    )));
                }
                Some(_) => {}
            }
            if !seen.insert(descriptor.name) {
                return Err(Error::Configuration(format!("Stage '{}' registered twice", descriptor.name)));
            }
        }

        if roots != 1 {
            return Err(Error::Configuration(format!("Stage graph needs exactly one root, found {}", roots)));
        }
        Ok(StageGraph { stages: self.stages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(StageName);

    #[async_trait]
    impl Stage for Noop {
        fn name(&self) -> StageName {
            self.0
        }

        async fn run(&self, _state: &RunState, _ctx: &StageContext) -> Result<StageOutput> {
            Ok(StageOutput::new(StagePatch::Report { report_path: String::new() }))
        }
    }

    fn noop(name: StageName) -> Arc<dyn Stage> {
        Arc::new(Noop(name))
    }

    #[test]
    fn test_linear_with_branches() {
        let graph = StageGraph::builder()
            .stage(None, FailurePolicy::Required, noop(StageName::Fetch))
            .stage(Some(StageName::Fetch), FailurePolicy::Required, noop(StageName::Insights))
            .stage(Some(StageName::Fetch), FailurePolicy::Required, noop(StageName::Summarize))
            .build()
            .unwrap();

        let edges: Vec<_> = graph.stages().iter().map(|d| (d.predecessor, d.name)).collect();
        assert_eq!(
            edges,
            vec![
                (None, StageName::Fetch),
                (Some(StageName::Fetch), StageName::Insights),
                (Some(StageName::Fetch), StageName::Summarize),
            ]
        );
    }

    #[test]
    fn test_rejects_forward_reference() {
        let result = StageGraph::builder()
            .stage(None, FailurePolicy::Required, noop(StageName::Fetch))
            .stage(Some(StageName::Report), FailurePolicy::BestEffort, noop(StageName::Upload))
            .stage(Some(StageName::Fetch), FailurePolicy::BestEffort, noop(StageName::Report))
            .build();
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_cycle_and_duplicates() {
        let result = StageGraph::builder()
            .stage(Some(StageName::Fetch), FailurePolicy::Required, noop(StageName::Fetch))
            .build();
        assert!(result.is_err());

        let result = StageGraph::builder()
            .stage(None, FailurePolicy::Required, noop(StageName::Fetch))
            .stage(Some(StageName::Fetch), FailurePolicy::Required, noop(StageName::Fetch))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_requires_single_root() {
        assert!(StageGraph::builder().build().is_err());

        let result = StageGraph::builder()
            .stage(None, FailurePolicy::Required, noop(StageName::Fetch))
            .stage(None, FailurePolicy::Required, noop(StageName::Insights))
            .build();
        assert!(result.is_err());

        let result = StageGraph::builder()
            .stage(None, FailurePolicy::Required, noop(StageName::End))
            .build();
        assert!(result.is_err());
    }
}
