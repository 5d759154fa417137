//! [`Transition`], [`Reason`], and the [`Action`] protocol — the types that
//! flow out of a node's `evaluate` and, ultimately, out of
//! `Dialog::process` to the host (spec §3, §6).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every dispatch cause a transition can carry, verbatim from spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    BeginDialog,
    EchoContinue,
    PauseElapsed,
    PromptInit,
    ValidResponse,
    InvalidResponse,
    Timeout,
    ValidChoice,
    ChoiceInit,
    EndDialog,
    PassedTest,
    FailedTest,
    MatchedCondition,
    NoMatchingConditions,
    ConditionalError,
    NextLoop,
    FinishedLoop,
    RandomBranch,
    Interrupt,
    InterruptContinue,
    InterruptResume,
    InterruptTimeElapsed,
    DialogError,
    SetVariableContinue,
    AlertContinue,
    EmbedDialogContinue,
    /// Not in spec's enum literal but required by the HTTP node's documented
    /// "any other exception" path, which spec §4.3 names `reason = error`.
    Error,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::BeginDialog => "begin-dialog",
            Reason::EchoContinue => "echo-continue",
            Reason::PauseElapsed => "pause-elapsed",
            Reason::PromptInit => "prompt-init",
            Reason::ValidResponse => "valid-response",
            Reason::InvalidResponse => "invalid-response",
            Reason::Timeout => "timeout",
            Reason::ValidChoice => "valid-choice",
            Reason::ChoiceInit => "choice-init",
            Reason::EndDialog => "end-dialog",
            Reason::PassedTest => "passed-test",
            Reason::FailedTest => "failed-test",
            Reason::MatchedCondition => "matched-condition",
            Reason::NoMatchingConditions => "no-matching-conditions",
            Reason::ConditionalError => "conditional-error",
            Reason::NextLoop => "next-loop",
            Reason::FinishedLoop => "finished-loop",
            Reason::RandomBranch => "random-branch",
            Reason::Interrupt => "interrupt",
            Reason::InterruptContinue => "interrupt-continue",
            Reason::InterruptResume => "interrupt-resume",
            Reason::InterruptTimeElapsed => "interrupt-time-elapsed",
            Reason::DialogError => "dialog-error",
            Reason::SetVariableContinue => "set-variable-continue",
            Reason::AlertContinue => "alert-continue",
            Reason::EmbedDialogContinue => "embed-dialog-continue",
            Reason::Error => "error",
        }
    }
}

/// An action emitted to the host, per spec §6's action protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Echo { message: String },
    RaiseAlert { message: String },
    Pause { duration: f64 },
    WaitForInput { timeout: Option<f64> },
    ExternalChoice { choices: Vec<ChoiceOption> },
    StoreValue { key: String, value: Value },
    UpdateValue {
        key: String,
        value: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        replacement: Option<Value>,
        operation: String,
    },
}

impl Action {
    /// Rewrites every node-id reference an action can carry, for
    /// [`crate::node::Node::prefix`]. Only `ExternalChoice` carries none;
    /// every other variant's identifiers are data, not graph references, so
    /// this is a no-op today but kept as the seam the spec's `Prefix(p)`
    /// contract names ("each action's `action`" — the field lives on the
    /// node-level action list entries, not here; see
    /// [`crate::node::prefix_opt`]).
    pub fn prefix(self, _prefix: &str) -> Self {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub identifier: String,
    pub label: String,
}

/// The result of one node's `evaluate` call.
#[derive(Debug, Clone, Default)]
pub struct Transition {
    /// `None` means terminate the dialog.
    pub new_state_id: Option<String>,
    pub reason: Option<Reason>,
    /// Extra metadata fields beyond `reason` (matched pattern, loop
    /// iteration, timeout duration, traceback, ...).
    pub metadata: Map<String, Value>,
    /// Actions to run before the destination's own entry actions.
    pub exit_actions: Vec<Action>,
    /// Forces re-entry into the destination even if it equals the current
    /// node.
    pub refresh: bool,
    /// `exit_actions ++ destination.actions()`, composed by the machine.
    /// `None` is the "no side effects" sentinel once composition is done;
    /// until the machine composes it, it is always `None`.
    pub actions: Option<Vec<Action>>,
}

impl Transition {
    pub fn to(id: impl Into<String>, reason: Reason) -> Self {
        Self { new_state_id: Some(id.into()), reason: Some(reason), ..Default::default() }
    }

    pub fn terminate(reason: Reason) -> Self {
        Self { new_state_id: None, reason: Some(reason), ..Default::default() }
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_exit_actions(mut self, actions: Vec<Action>) -> Self {
        self.exit_actions = actions;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the full metadata map including `reason`, ready to persist as
    /// a `TransitionLogEntry.metadata`.
    pub fn full_metadata(&self) -> Value {
        let mut map = self.metadata.clone();
        if let Some(reason) = self.reason {
            map.insert("reason".to_string(), Value::String(reason.as_str().to_string()));
        }
        Value::Object(map)
    }
}
