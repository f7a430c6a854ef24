use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineError;
use crate::side::CompilationSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Done => "done",
            StageStatus::Failed => "failed",
        }
    }
}

/// Lifecycle of a stage together with its result.
#[derive(Debug, Clone)]
pub enum StageState<T> {
    Pending,
    Running,
    Done(T),
    Failed(String),
}

impl<T> StageState<T> {
    pub fn status(&self) -> StageStatus {
        match self {
            StageState::Pending => StageStatus::Pending,
            StageState::Running => StageStatus::Running,
            StageState::Done(_) => StageStatus::Done,
            StageState::Failed(_) => StageStatus::Failed,
        }
    }

    pub fn done(&self) -> Option<&T> {
        match self {
            StageState::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// Lock a stage's state, recovering it if another stage thread panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A unit of work with declared upstream dependencies.
///
/// `run` executes synchronously to completion; results are read back through
/// the concrete stage's handle methods.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;
    fn side(&self) -> CompilationSide;
    /// Names of stages that must be `Done` before this one runs.
    fn dependencies(&self) -> Vec<String>;
    /// Paths this stage writes and owns exclusively.
    fn outputs(&self) -> Vec<PathBuf>;
    fn status(&self) -> StageStatus;
    fn run(&self) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: String,
    pub error: String,
}

/// Outcome of one [`TaskGraph::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphReport {
    pub completed: Vec<String>,
    pub failed: Vec<StageFailure>,
    /// Stages not attempted because something upstream failed.
    pub skipped: Vec<String>,
}

impl GraphReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Minimal dependency-ordered scheduler.
///
/// Ready stages run as a wave on scoped threads; no retries, and anything
/// downstream of a failure is skipped.
#[derive(Default)]
pub struct TaskGraph {
    stages: Vec<Arc<dyn Stage>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage; names and output paths must be unique within the graph.
    pub fn add(&mut self, stage: Arc<dyn Stage>) -> Result<&mut Self, PipelineError> {
        if self.stages.iter().any(|s| s.name() == stage.name()) {
            return Err(PipelineError::DuplicateStage(stage.name().to_string()));
        }
        for path in stage.outputs() {
            if let Some(owner) = self.stages.iter().find(|s| s.outputs().contains(&path)) {
                return Err(PipelineError::OutputConflict {
                    path,
                    first: owner.name().to_string(),
                    second: stage.name().to_string(),
                });
            }
        }
        self.stages.push(stage);
        Ok(self)
    }

    /// Check that every dependency exists and that there are no cycles.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let names: HashSet<&str> = self.stages.iter().map(|s| s.name()).collect();
        for stage in &self.stages {
            for dep in stage.dependencies() {
                if !names.contains(dep.as_str()) {
                    return Err(PipelineError::UnknownDependency {
                        stage: stage.name().to_string(),
                        dependency: dep,
                    });
                }
            }
        }

        let mut resolved: HashSet<String> = HashSet::new();
        loop {
            let ready: Vec<&str> = self
                .stages
                .iter()
                .filter(|s| !resolved.contains(s.name()))
                .filter(|s| s.dependencies().iter().all(|d| resolved.contains(d)))
                .map(|s| s.name())
                .collect();
            if ready.is_empty() {
                break;
            }
            resolved.extend(ready.into_iter().map(str::to_string));
        }
        if resolved.len() != self.stages.len() {
            let mut cyclic: Vec<String> = self
                .stages
                .iter()
                .map(|s| s.name().to_string())
                .filter(|name| !resolved.contains(name))
                .collect();
            cyclic.sort();
            return Err(PipelineError::DependencyCycle(cyclic));
        }
        Ok(())
    }

    /// Run every stage in dependency order.
    ///
    /// Structural problems are errors; stage failures are reported in the
    /// returned [`GraphReport`].
    pub fn run(&self) -> Result<GraphReport, PipelineError> {
        self.validate()?;

        let mut report = GraphReport::default();
        let mut done: HashSet<String> = HashSet::new();
        let mut dead: HashSet<String> = HashSet::new();
        let mut remaining: Vec<&Arc<dyn Stage>> = self.stages.iter().collect();

        while !remaining.is_empty() {
            let mut wave = Vec::new();
            let mut waiting = Vec::new();
            for stage in remaining {
                let deps = stage.dependencies();
                if deps.iter().any(|d| dead.contains(d)) {
                    dead.insert(stage.name().to_string());
                    report.skipped.push(stage.name().to_string());
                } else if deps.iter().all(|d| done.contains(d)) {
                    wave.push(stage);
                } else {
                    waiting.push(stage);
                }
            }
            if wave.is_empty() {
                // Only reachable when everything left waits on a skipped stage
                // discovered later in this same pass.
                if waiting.is_empty() {
                    break;
                }
                remaining = waiting;
                continue;
            }

            let results: Vec<(String, Result<(), String>)> = std::thread::scope(|scope| {
                let handles: Vec<_> = wave
                    .iter()
                    .map(|stage| {
                        let stage = Arc::clone(stage);
                        scope.spawn(move || stage.run().map_err(|e| e.to_string()))
                    })
                    .collect();
                wave.iter()
                    .zip(handles)
                    .map(|(stage, handle)| {
                        let outcome = handle
                            .join()
                            .unwrap_or_else(|_| Err("stage panicked".to_string()));
                        (stage.name().to_string(), outcome)
                    })
                    .collect()
            });

            for (name, outcome) in results {
                match outcome {
                    Ok(()) => {
                        done.insert(name.clone());
                        report.completed.push(name);
                    }
                    Err(error) => {
                        dead.insert(name.clone());
                        report.failed.push(StageFailure { stage: name, error });
                    }
                }
            }
            remaining = waiting;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStage {
        name: String,
        deps: Vec<String>,
        output: PathBuf,
        fail: bool,
        order: Arc<AtomicUsize>,
        state: Mutex<StageState<usize>>,
    }

    impl FakeStage {
        fn new(name: &str, deps: &[&str], fail: bool, order: &Arc<AtomicUsize>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                deps: deps.iter().map(|d| d.to_string()).collect(),
                output: PathBuf::from(format!("/out/{name}")),
                fail,
                order: Arc::clone(order),
                state: Mutex::new(StageState::Pending),
            })
        }

        fn finished_at(&self) -> Option<usize> {
            lock(&self.state).done().copied()
        }
    }

    impl Stage for FakeStage {
        fn name(&self) -> &str {
            &self.name
        }
        fn side(&self) -> CompilationSide {
            CompilationSide::Host
        }
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }
        fn outputs(&self) -> Vec<PathBuf> {
            vec![self.output.clone()]
        }
        fn status(&self) -> StageStatus {
            lock(&self.state).status()
        }
        fn run(&self) -> Result<(), PipelineError> {
            if self.fail {
                *lock(&self.state) = StageState::Failed("boom".into());
                return Err(PipelineError::DuplicateStage("boom".into()));
            }
            *lock(&self.state) = StageState::Done(self.order.fetch_add(1, Ordering::SeqCst));
            Ok(())
        }
    }

    #[test]
    fn runs_dependencies_first() {
        let order = Arc::new(AtomicUsize::new(0));
        let compile = FakeStage::new("compile", &[], false, &order);
        let extract = FakeStage::new("extract", &["compile"], false, &order);
        let mut graph = TaskGraph::new();
        // Added out of order on purpose.
        graph.add(extract.clone()).unwrap();
        graph.add(compile.clone()).unwrap();

        let report = graph.run().unwrap();
        assert!(report.is_success());
        assert_eq!(report.completed, vec!["compile", "extract"]);
        assert!(compile.finished_at().unwrap() < extract.finished_at().unwrap());
    }

    #[test]
    fn failure_skips_downstream_but_not_independent_stages() {
        let order = Arc::new(AtomicUsize::new(0));
        let mut graph = TaskGraph::new();
        graph.add(FakeStage::new("a-compile", &[], true, &order)).unwrap();
        graph.add(FakeStage::new("a-extract", &["a-compile"], false, &order)).unwrap();
        graph.add(FakeStage::new("a-host", &["a-extract"], false, &order)).unwrap();
        graph.add(FakeStage::new("b-compile", &[], false, &order)).unwrap();

        let report = graph.run().unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].stage, "a-compile");
        assert_eq!(report.skipped, vec!["a-extract", "a-host"]);
        assert_eq!(report.completed, vec!["b-compile"]);
    }

    #[test]
    fn rejects_duplicate_names_and_shared_outputs() {
        let order = Arc::new(AtomicUsize::new(0));
        let mut graph = TaskGraph::new();
        graph.add(FakeStage::new("x", &[], false, &order)).unwrap();
        let dup = graph.add(FakeStage::new("x", &[], false, &order)).err().unwrap();
        assert!(matches!(dup, PipelineError::DuplicateStage(name) if name == "x"));

        let sharing = Arc::new(FakeStage {
            name: "y".into(),
            deps: vec![],
            output: PathBuf::from("/out/x"),
            fail: false,
            order: order.clone(),
            state: Mutex::new(StageState::Pending),
        });
        let conflict = graph.add(sharing).err().unwrap();
        assert!(matches!(conflict, PipelineError::OutputConflict { .. }));
    }

    #[test]
    fn validate_reports_unknown_dependencies_and_cycles() {
        let order = Arc::new(AtomicUsize::new(0));
        let mut graph = TaskGraph::new();
        graph.add(FakeStage::new("lonely", &["ghost"], false, &order)).unwrap();
        assert!(matches!(graph.validate(), Err(PipelineError::UnknownDependency { .. })));

        let mut cyclic = TaskGraph::new();
        cyclic.add(FakeStage::new("a", &["b"], false, &order)).unwrap();
        cyclic.add(FakeStage::new("b", &["a"], false, &order)).unwrap();
        match cyclic.run() {
            Err(PipelineError::DependencyCycle(names)) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }
}
