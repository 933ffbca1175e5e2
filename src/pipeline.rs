//! The dialog decision pipeline.
//!
//! Wires the pieces together: application gating, context building,
//! deduplication, resolution, and the hand-off to the executor. Embedders
//! either feed [`ObservedWindow`]s into [`DialogPipeline::run`] through a
//! channel or call [`DialogPipeline::process_window`] directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::{BackendsConfig, PipelineConfig};
use crate::dialog::app_rules;
use crate::dialog::context::ContextBuilder;
use crate::dialog::dedup::{DedupVerdict, Deduplicator};
use crate::dialog::patterns::{AutoEditStrategy, CommandApprovalStrategy};
use crate::dialog::resolver::{DecisionResolver, ResolvedDecision};
use crate::dialog::rules::RuleBasedDefault;
use crate::dialog::strategy::{DecisionStrategy, StrategySet};
use crate::dialog::types::{Decision, DialogSnapshot, UiElement};
use crate::errors::PipelineError;
use crate::events::{EventBus, PipelineEvent};
use crate::llm::backend::GenerationBackend;
use crate::llm::fallback::FallbackCoordinator;
use crate::llm::types::ProviderKind;
use crate::llm::{AnthropicBackend, GeminiBackend, OllamaBackend, OpenAiBackend};

// ─── Boundary Types ─────────────────────────────────────────────────────────

/// One window's worth of raw facts from the detection source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedWindow {
    pub source_app: String,
    #[serde(default)]
    pub window_title: Option<String>,
    pub elements: Vec<UiElement>,
}

/// Maps a decision back onto the screen. Implemented by the embedder; the
/// pipeline never touches UI handles beyond passing `raw_elements` through.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, dialog: &DialogSnapshot, decision: &Decision) -> anyhow::Result<()>;
}

// ─── Pipeline ───────────────────────────────────────────────────────────────

pub struct DialogPipeline {
    config: PipelineConfig,
    context: ContextBuilder,
    dedup: Deduplicator,
    resolver: DecisionResolver,
    executor: Arc<dyn ActionExecutor>,
    events: EventBus,
    /// One lock per source app so cycles for the same app run one at a time.
    app_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DialogPipeline {
    pub fn new(
        config: PipelineConfig,
        executor: Arc<dyn ActionExecutor>,
    ) -> Result<Self, PipelineError> {
        Self::with_events(config, executor, EventBus::default())
    }

    /// Builds the pipeline with a caller-supplied event bus, so subscribers
    /// can be attached before any dialog is processed.
    pub fn with_events(
        config: PipelineConfig,
        executor: Arc<dyn ActionExecutor>,
        events: EventBus,
    ) -> Result<Self, PipelineError> {
        let backends = build_backends(&config.backends)?;
        let coordinator = Arc::new(FallbackCoordinator::new(
            backends,
            Duration::from_secs(config.backends.request_timeout_secs),
            events.clone(),
        ));

        let strategies = StrategySet::new(default_strategies(&config));
        tracing::info!(
            backends = ?coordinator.providers(),
            strategies = ?strategies.names(),
            "pipeline assembled"
        );

        let resolver = DecisionResolver::new(
            strategies,
            coordinator,
            RuleBasedDefault::new(&config.keywords),
            config.apps.clone(),
        );
        let context = ContextBuilder::new(&config.keywords);

        Ok(Self {
            config,
            context,
            dedup: Deduplicator::new(),
            resolver,
            executor,
            events,
            app_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The bus carrying discard/dedup/decision/execution events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Runs one full cycle for a raw window observation.
    pub async fn process_window(&self, window: ObservedWindow) -> Option<ResolvedDecision> {
        if !self.config.apps.is_allowed(&window.source_app) {
            tracing::debug!(app = %window.source_app, "application is not allowed, skipping");
            self.events.publish(PipelineEvent::DialogDiscarded {
                app: window.source_app,
                reason: "application not allowed".to_string(),
            });
            return None;
        }

        let snapshot = match self.context.build(
            &window.source_app,
            window.window_title.as_deref(),
            &window.elements,
        ) {
            Some(snapshot) => snapshot,
            None => {
                self.events.publish(PipelineEvent::DialogDiscarded {
                    app: window.source_app,
                    reason: "element set is not a dialog".to_string(),
                });
                return None;
            }
        };

        self.process_snapshot(snapshot).await
    }

    /// Runs one cycle for an already-built snapshot: dedup, resolve, and
    /// either execute or hold for confirmation.
    pub async fn process_snapshot(&self, snapshot: DialogSnapshot) -> Option<ResolvedDecision> {
        let cycle_id = Uuid::new_v4();

        if self.dedup.check(&snapshot) == DedupVerdict::Repeat {
            tracing::debug!(app = %snapshot.source_app, "dialog unchanged since last cycle");
            self.events.publish(PipelineEvent::DialogDeduplicated {
                app: snapshot.source_app.clone(),
            });
            return None;
        }

        tracing::info!(
            cycle_id = %cycle_id,
            app = %snapshot.source_app,
            kind = %snapshot.kind,
            options = snapshot.options.len(),
            "processing dialog"
        );

        let resolved = match self.resolver.resolve(&snapshot).await {
            Some(resolved) => resolved,
            None => {
                tracing::info!(
                    cycle_id = %cycle_id,
                    app = %snapshot.source_app,
                    "dialog left unhandled"
                );
                self.events.publish(PipelineEvent::DialogUnhandled {
                    cycle_id: cycle_id.to_string(),
                    app: snapshot.source_app.clone(),
                });
                return None;
            }
        };

        self.events.publish(PipelineEvent::DecisionResolved {
            cycle_id: cycle_id.to_string(),
            app: snapshot.source_app.clone(),
            chosen_option: resolved.decision.chosen_option.clone(),
            confidence: resolved.decision.confidence,
            via: resolved.via.to_string(),
            needs_confirmation: resolved.decision.needs_confirmation,
        });

        // A decision that requires confirmation is never auto-executed.
        if resolved.decision.needs_confirmation {
            tracing::info!(
                cycle_id = %cycle_id,
                app = %snapshot.source_app,
                option = %resolved.decision.chosen_option,
                "decision awaits user confirmation"
            );
            self.events.publish(PipelineEvent::AwaitingConfirmation {
                cycle_id: cycle_id.to_string(),
                app: snapshot.source_app.clone(),
                chosen_option: resolved.decision.chosen_option.clone(),
            });
            return Some(resolved);
        }

        match self.executor.execute(&snapshot, &resolved.decision).await {
            Ok(()) => {
                tracing::info!(
                    cycle_id = %cycle_id,
                    app = %snapshot.source_app,
                    option = %resolved.decision.chosen_option,
                    "action executed"
                );
                self.events.publish(PipelineEvent::ActionExecuted {
                    cycle_id: cycle_id.to_string(),
                    app: snapshot.source_app.clone(),
                    chosen_option: resolved.decision.chosen_option.clone(),
                });
            }
            Err(error) => {
                tracing::warn!(
                    cycle_id = %cycle_id,
                    app = %snapshot.source_app,
                    error = %error,
                    "executor failed"
                );
                self.events.publish(PipelineEvent::ActionFailed {
                    cycle_id: cycle_id.to_string(),
                    app: snapshot.source_app.clone(),
                    error: error.to_string(),
                });
            }
        }

        Some(resolved)
    }

    /// Consumes window observations until the channel closes, then lets
    /// in-flight cycles finish. Cycles for the same app are serialized;
    /// different apps proceed concurrently.
    pub async fn run(self: Arc<Self>, mut windows: mpsc::Receiver<ObservedWindow>) {
        let mut cycles = JoinSet::new();

        while let Some(window) = windows.recv().await {
            while let Some(result) = cycles.try_join_next() {
                if let Err(error) = result {
                    tracing::warn!(error = %error, "decision cycle panicked");
                }
            }

            let lock = self.app_lock(&window.source_app);
            let pipeline = Arc::clone(&self);
            cycles.spawn(async move {
                let _serialized = lock.lock().await;
                pipeline.process_window(window).await;
            });
        }

        while let Some(result) = cycles.join_next().await {
            if let Err(error) = result {
                tracing::warn!(error = %error, "decision cycle panicked");
            }
        }
        tracing::info!("pipeline drained");
    }

    fn app_lock(&self, app: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.app_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(app.to_string()).or_default().clone()
    }
}

// ─── Assembly ───────────────────────────────────────────────────────────────

/// Instantiates one backend per configured provider, in priority order.
fn build_backends(
    config: &BackendsConfig,
) -> Result<Vec<Arc<dyn GenerationBackend>>, PipelineError> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let mut backends: Vec<Arc<dyn GenerationBackend>> = Vec::with_capacity(config.priority.len());

    for provider in &config.priority {
        let backend: Arc<dyn GenerationBackend> = match provider {
            ProviderKind::Ollama => Arc::new(
                OllamaBackend::new(&config.ollama, timeout)
                    .map_err(|e| setup_error(*provider, e))?,
            ),
            ProviderKind::Openai => Arc::new(
                OpenAiBackend::new(&config.openai, timeout)
                    .map_err(|e| setup_error(*provider, e))?,
            ),
            ProviderKind::Anthropic => Arc::new(
                AnthropicBackend::new(&config.anthropic, timeout)
                    .map_err(|e| setup_error(*provider, e))?,
            ),
            ProviderKind::Gemini => Arc::new(
                GeminiBackend::new(&config.gemini, timeout)
                    .map_err(|e| setup_error(*provider, e))?,
            ),
        };
        backends.push(backend);
    }

    Ok(backends)
}

fn setup_error(provider: ProviderKind, error: crate::llm::errors::BackendError) -> PipelineError {
    PipelineError::BackendSetup {
        provider: provider.as_str().to_string(),
        reason: error.to_string(),
    }
}

/// Pattern strategies first, then the per-application tables.
fn default_strategies(config: &PipelineConfig) -> Vec<Box<dyn DecisionStrategy>> {
    let mut strategies: Vec<Box<dyn DecisionStrategy>> = vec![
        Box::new(CommandApprovalStrategy::new(&config.patterns)),
        Box::new(AutoEditStrategy::new(&config.patterns)),
    ];
    for app_strategy in app_rules::builtin_strategies() {
        strategies.push(Box::new(app_strategy));
    }
    strategies
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        executed: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingExecutor {
        fn failing() -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn executed(&self) -> Vec<(String, String)> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn execute(
            &self,
            dialog: &DialogSnapshot,
            decision: &Decision,
        ) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("press failed");
            }
            self.executed
                .lock()
                .unwrap()
                .push((dialog.source_app.clone(), decision.chosen_option.clone()));
            Ok(())
        }
    }

    /// Config with no backends so tests never touch the network.
    fn offline_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.backends.priority = Vec::new();
        config
    }

    fn pipeline_with(
        executor: Arc<RecordingExecutor>,
    ) -> Arc<DialogPipeline> {
        Arc::new(DialogPipeline::new(offline_config(), executor).unwrap())
    }

    fn save_window(app: &str) -> ObservedWindow {
        ObservedWindow {
            source_app: app.to_string(),
            window_title: Some("Untitled".to_string()),
            elements: vec![
                UiElement::new("AXStaticText")
                    .with_value("Do you want to save the changes made to this document?"),
                UiElement::new("AXButton").with_title("Save"),
                UiElement::new("AXButton").with_title("Don't Save"),
                UiElement::new("AXButton").with_title("Cancel"),
            ],
        }
    }

    fn drain(events: &mut tokio::sync::broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_save_dialog_flows_to_the_executor() {
        let executor = Arc::new(RecordingExecutor::default());
        let pipeline = pipeline_with(executor.clone());
        let mut events = pipeline.events().subscribe();

        let resolved = pipeline.process_window(save_window("TextEdit")).await.unwrap();
        assert_eq!(resolved.decision.chosen_option, "Save");
        assert_eq!(resolved.via.to_string(), "strategy:textedit_rules");
        assert_eq!(
            executor.executed(),
            vec![("TextEdit".to_string(), "Save".to_string())]
        );

        let seen = drain(&mut events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::DecisionResolved { via, .. } if via == "strategy:textedit_rules")));
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::ActionExecuted { chosen_option, .. } if chosen_option == "Save")));
    }

    #[tokio::test]
    async fn test_repeat_observation_is_deduplicated() {
        let executor = Arc::new(RecordingExecutor::default());
        let pipeline = pipeline_with(executor.clone());
        let mut events = pipeline.events().subscribe();

        assert!(pipeline.process_window(save_window("TextEdit")).await.is_some());
        assert!(pipeline.process_window(save_window("TextEdit")).await.is_none());
        assert_eq!(executor.executed().len(), 1);

        let seen = drain(&mut events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::DialogDeduplicated { app } if app == "TextEdit")));
    }

    #[tokio::test]
    async fn test_blacklisted_app_never_reaches_resolution() {
        let executor = Arc::new(RecordingExecutor::default());
        let pipeline = pipeline_with(executor.clone());
        let mut events = pipeline.events().subscribe();

        assert!(pipeline.process_window(save_window("Terminal")).await.is_none());
        assert!(executor.executed().is_empty());

        let seen = drain(&mut events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::DialogDiscarded { app, .. } if app == "Terminal")));
    }

    #[tokio::test]
    async fn test_confirmation_gate_blocks_execution() {
        let executor = Arc::new(RecordingExecutor::default());
        let pipeline = pipeline_with(executor.clone());
        let mut events = pipeline.events().subscribe();

        // Mail is on the confirmation-required list.
        let window = ObservedWindow {
            source_app: "Mail".to_string(),
            window_title: None,
            elements: vec![
                UiElement::new("AXStaticText")
                    .with_value("Are you sure you want to send this message without a subject?"),
                UiElement::new("AXButton").with_title("Send"),
                UiElement::new("AXButton").with_title("Don't Send"),
            ],
        };

        let resolved = pipeline.process_window(window).await.unwrap();
        assert_eq!(resolved.decision.chosen_option, "Don't Send");
        assert!(resolved.decision.needs_confirmation);
        assert!(executor.executed().is_empty());

        let seen = drain(&mut events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::AwaitingConfirmation { app, .. } if app == "Mail")));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::ActionExecuted { .. })));
    }

    #[tokio::test]
    async fn test_unresolvable_dialog_is_surfaced_as_unhandled() {
        let executor = Arc::new(RecordingExecutor::default());
        let pipeline = pipeline_with(executor.clone());
        let mut events = pipeline.events().subscribe();

        let window = ObservedWindow {
            source_app: "SomeApp".to_string(),
            window_title: None,
            elements: vec![
                UiElement::new("AXStaticText").with_value("Dismiss this notice"),
                UiElement::new("AXButton").with_title("Cancel"),
                UiElement::new("AXButton").with_title("No"),
            ],
        };

        assert!(pipeline.process_window(window).await.is_none());
        assert!(executor.executed().is_empty());

        let seen = drain(&mut events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::DialogUnhandled { app, .. } if app == "SomeApp")));
    }

    #[tokio::test]
    async fn test_executor_failure_is_reported_not_fatal() {
        let executor = Arc::new(RecordingExecutor::failing());
        let pipeline = pipeline_with(executor);
        let mut events = pipeline.events().subscribe();

        let resolved = pipeline.process_window(save_window("TextEdit")).await;
        assert!(resolved.is_some());

        let seen = drain(&mut events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, PipelineEvent::ActionFailed { error, .. } if error.contains("press failed"))));
    }

    #[tokio::test]
    async fn test_run_processes_until_channel_closes() {
        let executor = Arc::new(RecordingExecutor::default());
        let pipeline = pipeline_with(executor.clone());

        let (tx, rx) = mpsc::channel(8);
        let runner = tokio::spawn(Arc::clone(&pipeline).run(rx));

        tx.send(save_window("TextEdit")).await.unwrap();
        tx.send(ObservedWindow {
            source_app: "Notes".to_string(),
            window_title: None,
            elements: vec![
                UiElement::new("AXStaticText").with_value("Save this note before closing?"),
                UiElement::new("AXButton").with_title("Save"),
                UiElement::new("AXButton").with_title("Cancel"),
            ],
        })
        .await
        .unwrap();
        drop(tx);

        runner.await.unwrap();

        let executed = executor.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed.contains(&("TextEdit".to_string(), "Save".to_string())));
        assert!(executed.contains(&("Notes".to_string(), "Save".to_string())));
    }
}
