//! Error types for graph construction and work-item dispatch.

use miette::Diagnostic;
use thiserror::Error;

use crate::stage::StageError;
use crate::types::StageKind;

/// Construction-time wiring failures.
///
/// Every variant is raised synchronously by the builder call that caused
/// it, before the scheduler ever runs: a malformed graph never reaches
/// dispatch. Overwriting a bound link silently would mask wiring bugs
/// until runtime, so rebinding is an error rather than a warning.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A chain verb was used before `scenario(..)` opened a chain.
    #[error("step `{label}`: verb `{verb}` used without an open scenario")]
    #[diagnostic(
        code(stageflow::graphs::no_scenario),
        help("Call `scenario(..)` before wiring chain verbs.")
    )]
    NoScenario { verb: &'static str, label: String },

    /// The stage passed to a verb has the wrong role.
    #[error("step `{label}`: verb `{verb}` expects {expected}, found {found}")]
    #[diagnostic(
        code(stageflow::graphs::role_mismatch),
        help("Each verb accepts exactly one stage role; check the registration for this step.")
    )]
    RoleMismatch {
        verb: &'static str,
        label: String,
        expected: &'static str,
        found: StageKind,
    },

    /// The verb is valid but not at this point in the chain.
    #[error("step `{label}`: verb `{verb}` cannot follow `{previous}`")]
    #[diagnostic(
        code(stageflow::graphs::misplaced_verb),
        help("Scenario chains run from → when → given/is → then → to.")
    )]
    MisplacedVerb {
        verb: &'static str,
        label: String,
        previous: &'static str,
    },

    /// The chain was terminated by `to(..)`; only `and` may extend it.
    #[error("step `{label}`: the chain is sealed by its target; only `and` may extend it")]
    #[diagnostic(code(stageflow::graphs::sealed_scenario))]
    SealedScenario { label: String },

    /// A condition is on the cursor but no branch has been selected.
    #[error("condition `{stage}` needs `is(..)` before the next step can attach")]
    #[diagnostic(code(stageflow::graphs::branch_unselected))]
    BranchUnselected { stage: String },

    /// The selected condition branch is already wired.
    #[error("condition `{stage}` already routes its {branch}-branch")]
    #[diagnostic(
        code(stageflow::graphs::branch_rebound),
        help("Each branch of a condition is wired exactly once.")
    )]
    BranchRebound { stage: String, branch: bool },

    /// The stage's single downstream link is already bound.
    #[error("stage `{stage}` already has a downstream link")]
    #[diagnostic(
        code(stageflow::graphs::target_rebound),
        help("Downstream links are immutable once bound; fan out with a split stage instead.")
    )]
    TargetRebound { stage: String },

    /// `is(..)` used while the cursor is not a condition stage.
    #[error("`is({value})` requires the cursor to rest on a condition stage")]
    #[diagnostic(code(stageflow::graphs::is_outside_given))]
    IsOutsideGiven { value: bool },
}

/// A stage operation failed while processing one work item.
///
/// Dispatch errors are isolated per item: the drain loop logs the failure,
/// reports it to the event bus, drops the item, and keeps draining.
#[derive(Debug, Error, Diagnostic)]
#[error("stage `{stage}` failed while processing a work item")]
#[diagnostic(code(stageflow::graphs::dispatch))]
pub struct DispatchError {
    /// Label of the failing stage.
    pub stage: String,
    #[source]
    pub source: StageError,
}

impl DispatchError {
    pub(crate) fn new(stage: &str, source: StageError) -> Self {
        Self {
            stage: stage.to_string(),
            source,
        }
    }
}
