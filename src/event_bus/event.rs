use std::fmt;

use serde::{Deserialize, Serialize};

/// Observability event fanned out to sinks.
///
/// Stage events carry the label of the stage they concern (when known);
/// diagnostics cover everything else — scheduler lifecycle, bus health.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Stage(StageEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn stage_message(scope: impl Into<String>, detail: impl Into<String>) -> Self {
        Event::Stage(StageEvent {
            stage: None,
            scope: scope.into(),
            detail: detail.into(),
        })
    }

    pub fn stage_message_for(
        stage: impl Into<String>,
        scope: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Event::Stage(StageEvent {
            stage: Some(stage.into()),
            scope: scope.into(),
            detail: detail.into(),
        })
    }

    /// A work item was dropped because its stage failed.
    pub fn dispatch_failed(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Event::stage_message_for(stage, "dispatch", error)
    }

    pub fn diagnostic(scope: impl Into<String>, detail: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            detail: detail.into(),
        })
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Stage(event) => &event.scope,
            Event::Diagnostic(event) => &event.scope,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Event::Stage(event) => &event.detail,
            Event::Diagnostic(event) => &event.detail,
        }
    }

    /// The stage this event concerns, if any.
    pub fn stage(&self) -> Option<&str> {
        match self {
            Event::Stage(event) => event.stage.as_deref(),
            Event::Diagnostic(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(stage) => write!(f, "[{stage}] {}: {}", self.scope_label(), self.detail()),
            None => write!(f, "{}: {}", self.scope_label(), self.detail()),
        }
    }
}

/// Event scoped to one stage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageEvent {
    stage: Option<String>,
    scope: String,
    detail: String,
}

/// Free-floating engine diagnostic.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    detail: String,
}
