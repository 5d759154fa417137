//! [`Dialog`] — the per-session orchestrator that ties a script snapshot,
//! a transition store, and a [`DialogMachine`] together into the literal
//! ten-step `process` algorithm (spec §4.2).

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::machine::DialogMachine;
use crate::node::{EvalContext, NodeRegistry, SharedStore};
use crate::rng::RngSource;
use crate::template;
use crate::transition::{Action, Reason};
use crate::variables::VariableStore;
use chrono::{DateTime, Utc};
use dialog_transitions::TransitionLogEntry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Why a dialog stopped processing further responses (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    NotFinished,
    DialogConcluded,
    UserCancelled,
    DialogCancelled,
    DialogError,
    TimedOut,
}

/// The result of one [`Dialog::process`] call: what the host should show
/// the user, and whether the dialog is now finished.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub actions: Vec<Action>,
    pub finished: bool,
    pub finish_reason: FinishReason,
    pub new_state_id: Option<String>,
}

/// A running (or concluded) dialog session: a frozen script snapshot, the
/// variables collected so far, and whatever store is backing its
/// transition log.
pub struct Dialog {
    pub key: String,
    script: Vec<Value>,
    store: SharedStore,
    registry: NodeRegistry,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    rng: Box<dyn RngSource>,
    variables: VariableStore,
    started: DateTime<Utc>,
    pub finished: bool,
    pub finish_reason: FinishReason,
    pub metadata: Map<String, Value>,
}

impl Dialog {
    /// Starts a new session bound to `script` (already expanded/linted),
    /// logging and reading transitions through `store`.
    pub fn new(
        key: impl Into<String>,
        script: Vec<Value>,
        store: SharedStore,
        registry: NodeRegistry,
        config: EngineConfig,
        clock: Box<dyn Clock>,
        rng: Box<dyn RngSource>,
    ) -> Self {
        let started = clock.now();
        Self {
            key: key.into(),
            script,
            store,
            registry,
            config,
            clock,
            rng,
            variables: VariableStore::new(),
            started,
            finished: false,
            finish_reason: FinishReason::NotFinished,
            metadata: Map::new(),
        }
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// The literal ten-step algorithm (spec §4.2):
    /// 1. no-op if already finished;
    /// 2. read the last logged transition (`None` on a brand-new dialog);
    /// 3. build a fresh machine from the script snapshot and advance it to
    ///    the last logged state, if any;
    /// 4. evaluate one tick;
    /// 5. a `None` transition means nothing happened this tick — return no
    ///    actions, dialog still not finished;
    /// 6. a transition to `None` (`new_state_id` absent), or to a node of
    ///    kind `end`, concludes the dialog within this same call;
    /// 7. append a new log entry only if the destination differs from the
    ///    last one, or `refresh` forces re-entry;
    /// 8. same-state-without-refresh transitions are suppressed entirely —
    ///    no new entry, no actions — the idempotence guard behind prompt
    ///    re-ticking (spec §8 invariant 4);
    /// 9. render the composed actions through the template engine against
    ///    `(dialog metadata ∪ extras)`;
    /// 10. surface a `dialog-error` finish instead of propagating if the
    ///     machine raises.
    pub async fn process(&mut self, response: Option<&str>, extras: Value) -> Result<ProcessResult> {
        if self.finished {
            return Ok(ProcessResult {
                actions: Vec::new(),
                finished: true,
                finish_reason: self.finish_reason,
                new_state_id: None,
            });
        }

        let last = self.store.last(&self.key).await?;

        match self.tick(response, &extras, last.as_ref()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.finished = true;
                self.finish_reason = FinishReason::DialogError;
                self.metadata.insert("dialog_error".to_string(), json!(e.to_string()));
                Ok(ProcessResult {
                    actions: Vec::new(),
                    finished: true,
                    finish_reason: FinishReason::DialogError,
                    new_state_id: None,
                })
            }
        }
    }

    async fn tick(&mut self, response: Option<&str>, extras: &Value, last: Option<&TransitionLogEntry>) -> Result<ProcessResult> {
        let mut machine = DialogMachine::build(&self.script, &self.registry, &self.config)?;
        if let Some(last) = last {
            machine.advance_to(&last.state_id);
        }

        let ctx = EvalContext {
            response,
            last_transition: last,
            extras,
            variables: &self.variables,
            clock: self.clock.as_ref(),
            rng: self.rng.as_ref(),
            dialog_started: self.started,
            dialog_key: &self.key,
            store: self.store.as_ref(),
        };

        let transition = match machine.evaluate(&ctx).await? {
            Some(t) => t,
            None => {
                return Ok(ProcessResult {
                    actions: Vec::new(),
                    finished: false,
                    finish_reason: FinishReason::NotFinished,
                    new_state_id: Some(machine.current_node_id().to_string()),
                })
            }
        };

        // spec §4.2 step 7/8: append a new entry only if the destination
        // differs from the last logged state, or `refresh` forces re-entry.
        // A same-state, no-refresh transition (e.g. `Prompt`'s idle
        // self-tick) is dropped entirely — no entry, no actions.
        let same_state_no_refresh = last
            .zip(transition.new_state_id.as_deref())
            .map(|(l, new_id)| l.state_id == new_id)
            .unwrap_or(false)
            && !transition.refresh;

        if same_state_no_refresh {
            return Ok(ProcessResult {
                actions: Vec::new(),
                finished: false,
                finish_reason: FinishReason::NotFinished,
                new_state_id: transition.new_state_id.clone(),
            });
        }

        let when = self.clock.now();
        let logged_state_id = transition.new_state_id.clone().unwrap_or_else(|| machine.current_node_id().to_string());
        let entry = TransitionLogEntry {
            dialog: self.key.clone(),
            when,
            state_id: logged_state_id,
            // spec §4.2 step 8: `prior_state_id=last?.state_id` — `None` on
            // the very first transition, not the machine's pre-evaluate
            // current node (which defaults to `begin`'s own id before any
            // log entry exists).
            prior_state_id: last.map(|l| l.state_id.clone()),
            metadata: transition.full_metadata(),
        };
        self.store.append(entry).await?;

        // Arriving at a terminal `end` node concludes the dialog within
        // this same call — the literal S1/S2 scenarios finish after the
        // tick that transitions *into* the end node, not one tick later
        // once that node's own (input-independent) `evaluate` runs.
        let destination_is_end = transition
            .new_state_id
            .as_deref()
            .and_then(|id| machine.node(id))
            .map(|n| n.kind() == "end")
            .unwrap_or(false);

        if transition.new_state_id.is_none() || destination_is_end {
            self.finished = true;
            self.finish_reason = match transition.reason {
                Some(Reason::InterruptTimeElapsed) => FinishReason::TimedOut,
                _ => FinishReason::DialogConcluded,
            };
        }

        let context = template::merge_objects(&Value::Object(self.variables.snapshot()), extras);
        let raw_actions = transition.actions.unwrap_or_default();
        let actions: Vec<Action> = raw_actions
            .into_iter()
            .map(|action| render_action(action, &context, &self.config.template_fallback))
            .collect();

        Ok(ProcessResult {
            actions,
            finished: self.finished,
            finish_reason: self.finish_reason,
            new_state_id: transition.new_state_id,
        })
    }
}

/// Renders the string-bearing fields of an action through the template
/// engine; actions carrying no template-eligible text pass through
/// unchanged.
fn render_action(action: Action, context: &Value, fallback: &str) -> Action {
    match action {
        Action::Echo { message } => Action::Echo { message: template::render_str(&message, context, fallback) },
        Action::RaiseAlert { message } => Action::RaiseAlert { message: template::render_str(&message, context, fallback) },
        other => other,
    }
}
