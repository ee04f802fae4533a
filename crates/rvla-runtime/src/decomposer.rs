//! Recursive task decomposition.
//!
//! A task is split through a [`TaskDecomposer`] collaborator until it is
//! simple enough or the depth ceiling is reached; the executable leaves are
//! then run in depth-first order.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rvla_protocols::error::AgentError;
use rvla_protocols::model::{Decomposition, TaskDecomposer};
use rvla_protocols::types::truncate_chars;

use crate::context_examiner::ContextExaminer;

const SUMMARY_CHARS: usize = 500;
const STATE_QUESTION: &str = "What is the current state and relevant information?";

/// Default decomposition depth.
pub const DEFAULT_DECOMPOSITION_DEPTH: u32 = 3;

/// One node of a decomposition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionNode {
    pub task: String,
    pub depth: u32,
    pub reasoning: String,
    pub subtasks: Vec<DecompositionNode>,
    /// Leaves that should be handed to a [`LeafExecutor`].
    pub executable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
}

impl DecompositionNode {
    fn leaf(task: &str, depth: u32, verdict: Decomposition) -> Self {
        Self {
            task: task.to_string(),
            depth,
            reasoning: verdict.reasoning,
            subtasks: Vec::new(),
            executable: true,
            next_action: verdict.next_action,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.subtasks.is_empty()
    }

    /// Number of nodes in this subtree, including itself.
    pub fn count_nodes(&self) -> usize {
        1 + self.subtasks.iter().map(Self::count_nodes).sum::<usize>()
    }

    pub fn count_leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.subtasks.iter().map(Self::count_leaves).sum()
        }
    }

    /// Executable leaves in depth-first order.
    pub fn executable_leaves(&self) -> Vec<&DecompositionNode> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a DecompositionNode>) {
        if self.is_leaf() {
            if self.executable {
                out.push(self);
            }
            return;
        }
        for child in &self.subtasks {
            child.collect_leaves(out);
        }
    }
}

/// Runs one executable leaf.
#[async_trait]
pub trait LeafExecutor: Send + Sync {
    async fn execute(&self, node: &DecompositionNode) -> Result<String, AgentError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafResult {
    pub task: String,
    pub depth: u32,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub root_task: String,
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub results: Vec<LeafResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposeAndExecute {
    pub tree: DecompositionNode,
    pub execution: ExecutionReport,
    pub context_summary: String,
}

pub struct Decomposer {
    collaborator: Arc<dyn TaskDecomposer>,
    max_depth: u32,
}

impl Decomposer {
    pub fn new(collaborator: Arc<dyn TaskDecomposer>, max_depth: u32) -> Self {
        Self {
            collaborator,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Build the decomposition tree of `task` starting at `depth`.
    ///
    /// Nodes at the depth ceiling become leaves without asking the
    /// collaborator. A failing collaborator also yields a leaf.
    pub fn decompose<'a>(
        &'a self,
        task: &'a str,
        context_summary: &'a str,
        depth: u32,
    ) -> BoxFuture<'a, DecompositionNode> {
        Box::pin(async move {
            if depth >= self.max_depth {
                return DecompositionNode::leaf(
                    task,
                    depth,
                    Decomposition::leaf("depth limit reached"),
                );
            }

            let verdict = match self
                .collaborator
                .decompose_task(task, context_summary, depth, self.max_depth)
                .await
            {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("Decomposing '{}' failed, executing it directly: {}", task, e);
                    Decomposition::leaf(format!("decomposition failed: {}", e))
                }
            };

            if !verdict.has_subtasks() {
                return DecompositionNode::leaf(task, depth, verdict);
            }

            debug!(task, depth, subtasks = verdict.subtasks.len(), "Decomposed task");
            let mut children = Vec::with_capacity(verdict.subtasks.len());
            for subtask in &verdict.subtasks {
                children.push(self.decompose(subtask, context_summary, depth + 1).await);
            }

            DecompositionNode {
                task: task.to_string(),
                depth,
                reasoning: verdict.reasoning,
                subtasks: children,
                executable: false,
                next_action: None,
            }
        })
    }

    /// Run every executable leaf of `root` in depth-first order.
    pub async fn execute(
        &self,
        root: &DecompositionNode,
        executor: &dyn LeafExecutor,
    ) -> Result<ExecutionReport, AgentError> {
        let mut results = Vec::new();
        for leaf in root.executable_leaves() {
            let result = executor.execute(leaf).await?;
            results.push(LeafResult {
                task: leaf.task.clone(),
                depth: leaf.depth,
                result,
            });
        }

        Ok(ExecutionReport {
            root_task: root.task.clone(),
            total_nodes: root.count_nodes(),
            leaf_nodes: root.count_leaves(),
            results,
        })
    }

    /// Summarize `context`, decompose `task` against it, then execute.
    ///
    /// A failing context examination decomposes against an empty summary.
    pub async fn decompose_and_execute(
        &self,
        task: &str,
        context: &str,
        examiner: &ContextExaminer,
        executor: &dyn LeafExecutor,
    ) -> Result<DecomposeAndExecute, AgentError> {
        let context_summary = match examiner.query_context(context, STATE_QUESTION, task).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Context summary failed: {}", e);
                String::new()
            }
        };

        let bounded = truncate_chars(&context_summary, SUMMARY_CHARS);
        let tree = self.decompose(task, bounded, 0).await;
        let execution = self.execute(&tree, executor).await?;

        Ok(DecomposeAndExecute {
            tree,
            execution,
            context_summary,
        })
    }
}

impl std::fmt::Debug for Decomposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decomposer")
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::KeywordExaminer;
    use parking_lot::Mutex;
    use rvla_config::ContextConfig;
    use rvla_protocols::error::OracleError;

    /// Splits "a and b" style tasks on " and ".
    struct AndSplitter {
        calls: Mutex<Vec<(String, String, u32)>>,
        fail_on: Option<&'static str>,
    }

    impl AndSplitter {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl TaskDecomposer for AndSplitter {
        async fn decompose_task(
            &self,
            task: &str,
            context_summary: &str,
            depth: u32,
            _max_depth: u32,
        ) -> Result<Decomposition, OracleError> {
            self.calls
                .lock()
                .push((task.to_string(), context_summary.to_string(), depth));
            if self.fail_on == Some(task) {
                return Err(OracleError::EmptyResponse);
            }
            let parts: Vec<String> = task.split(" and ").map(str::to_string).collect();
            if parts.len() > 1 {
                Ok(Decomposition::split(parts))
            } else {
                let mut leaf = Decomposition::leaf("simple");
                leaf.next_action = Some(format!("do {}", task));
                Ok(leaf)
            }
        }
    }

    struct EchoExecutor {
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl LeafExecutor for EchoExecutor {
        async fn execute(&self, node: &DecompositionNode) -> Result<String, AgentError> {
            if self.fail_on == Some(node.task.as_str()) {
                return Err(AgentError::Planning(OracleError::EmptyResponse));
            }
            Ok(format!("ran {}@{}", node.task, node.depth))
        }
    }

    #[tokio::test]
    async fn test_simple_task_is_single_leaf() {
        let decomposer = Decomposer::new(Arc::new(AndSplitter::new()), 3);
        let tree = decomposer.decompose("open menu", "", 0).await;

        assert!(tree.is_leaf());
        assert!(tree.executable);
        assert_eq!(tree.next_action.as_deref(), Some("do open menu"));
        assert_eq!(tree.count_nodes(), 1);
    }

    #[tokio::test]
    async fn test_compound_task_split_recursively() {
        let splitter = Arc::new(AndSplitter::new());
        let decomposer = Decomposer::new(splitter.clone(), 3);
        let tree = decomposer
            .decompose("search and compare", "on home page", 0)
            .await;

        assert!(!tree.executable);
        assert_eq!(tree.subtasks.len(), 2);
        assert_eq!(tree.subtasks[1].task, "compare");
        assert_eq!(tree.subtasks[1].depth, 1);
        assert_eq!(tree.count_nodes(), 3);
        assert_eq!(tree.count_leaves(), 2);

        let calls = splitter.calls.lock().clone();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, summary, _)| summary == "on home page"));
    }

    #[tokio::test]
    async fn test_depth_ceiling_skips_collaborator() {
        let splitter = Arc::new(AndSplitter::new());
        let decomposer = Decomposer::new(splitter.clone(), 1);
        let tree = decomposer.decompose("a and b and c", "", 0).await;

        assert_eq!(tree.subtasks.len(), 3);
        assert!(tree.subtasks.iter().all(|n| n.executable && n.depth == 1));
        // Only the root consulted the collaborator.
        assert_eq!(splitter.calls.lock().len(), 1);

        let at_ceiling = decomposer.decompose("x and y", "", 1).await;
        assert!(at_ceiling.is_leaf());
        assert_eq!(at_ceiling.reasoning, "depth limit reached");
    }

    #[tokio::test]
    async fn test_collaborator_failure_yields_leaf() {
        let splitter = Arc::new(AndSplitter {
            calls: Mutex::new(Vec::new()),
            fail_on: Some("fragile"),
        });
        let decomposer = Decomposer::new(splitter, 3);
        let tree = decomposer.decompose("fragile", "", 0).await;

        assert!(tree.executable);
        assert!(tree.reasoning.starts_with("decomposition failed"));
    }

    #[tokio::test]
    async fn test_execute_runs_leaves_depth_first() {
        let decomposer = Decomposer::new(Arc::new(AndSplitter::new()), 3);
        let tree = DecompositionNode {
            task: "root".into(),
            depth: 0,
            reasoning: String::new(),
            executable: false,
            next_action: None,
            subtasks: vec![
                decomposer.decompose("find and open", "", 1).await,
                decomposer.decompose("pay", "", 1).await,
            ],
        };

        let report = decomposer
            .execute(&tree, &EchoExecutor { fail_on: None })
            .await
            .unwrap();

        assert_eq!(report.root_task, "root");
        assert_eq!(report.total_nodes, 5);
        assert_eq!(report.leaf_nodes, 3);
        let ran: Vec<_> = report.results.iter().map(|r| r.result.as_str()).collect();
        assert_eq!(ran, vec!["ran find@2", "ran open@2", "ran pay@1"]);
    }

    #[tokio::test]
    async fn test_execute_propagates_leaf_failure() {
        let decomposer = Decomposer::new(Arc::new(AndSplitter::new()), 3);
        let tree = decomposer.decompose("a and b", "", 0).await;
        let err = decomposer
            .execute(&tree, &EchoExecutor { fail_on: Some("b") })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Planning(_)));
    }

    #[tokio::test]
    async fn test_decompose_and_execute_bounds_summary() {
        let splitter = Arc::new(AndSplitter::new());
        let decomposer = Decomposer::new(splitter.clone(), DEFAULT_DECOMPOSITION_DEPTH);
        let examiner = ContextExaminer::new(
            Arc::new(KeywordExaminer::new("cart")),
            &ContextConfig::default(),
        );
        let context = "cart ".repeat(10);

        let outcome = decomposer
            .decompose_and_execute(
                "checkout and confirm",
                &context,
                &examiner,
                &EchoExecutor { fail_on: None },
            )
            .await
            .unwrap();

        assert_eq!(outcome.context_summary, "window 0 mentions true");
        assert_eq!(outcome.execution.results.len(), 2);
        let calls = splitter.calls.lock().clone();
        assert_eq!(calls[0].1, "window 0 mentions true");
    }

    #[tokio::test]
    async fn test_decompose_and_execute_survives_examiner_failure() {
        let decomposer = Decomposer::new(Arc::new(AndSplitter::new()), 3);
        let examiner = ContextExaminer::new(
            Arc::new(KeywordExaminer::failing()),
            &ContextConfig::default(),
        );

        let outcome = decomposer
            .decompose_and_execute("one step", "ctx", &examiner, &EchoExecutor { fail_on: None })
            .await
            .unwrap();
        assert!(outcome.context_summary.is_empty());
        assert_eq!(outcome.execution.results[0].result, "ran one step@0");
    }

    #[test]
    fn test_truncated_summary_length() {
        let long = "s".repeat(800);
        assert_eq!(truncate_chars(&long, SUMMARY_CHARS).chars().count(), 500);
    }
}
