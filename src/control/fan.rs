//! Fan-out, fan-in, and branch-halting control stages.
//!
//! Split and Merge are the only fan mechanisms in the engine. A Split never
//! calls its branches directly — every branch becomes an independently
//! queued work item, so sibling branches interleave with all other pending
//! work and no caller may assume one sibling completes before another
//! starts. A Merge is the dual: it holds the last message seen from each
//! registered upstream and emits once per complete round.

use rustc_hash::FxHashMap;

use crate::message::Message;
use crate::types::StageId;

/// Fan-in barrier state: upstream identity → last message.
///
/// Upstreams register in wiring order; that order is the order their
/// messages appear in the merged output. A duplicate arrival before the
/// round completes overwrites the previous value for that upstream (warned,
/// not rejected). Arrivals from unregistered origins are dropped.
#[derive(Default)]
pub(crate) struct Merge {
    upstreams: Vec<StageId>,
    pending: FxHashMap<StageId, Option<Message>>,
}

impl Merge {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of registered upstreams; the round completes at this many
    /// distinct arrivals.
    pub(crate) fn arity(&self) -> usize {
        self.upstreams.len()
    }

    pub(crate) fn register_upstream(&mut self, upstream: StageId) {
        if self.upstreams.contains(&upstream) {
            tracing::warn!(%upstream, "upstream already registered with merge");
            return;
        }
        self.upstreams.push(upstream);
    }

    /// Records one arrival, returning the merged message when the round is
    /// complete.
    pub(crate) fn accept(
        &mut self,
        label: &str,
        origin: Option<StageId>,
        message: Option<Message>,
    ) -> Option<Message> {
        let Some(origin) = origin else {
            tracing::warn!(merge = label, "merge arrival without an origin; dropped");
            return None;
        };
        if !self.upstreams.contains(&origin) {
            tracing::warn!(merge = label, %origin, "merge arrival from unregistered origin; dropped");
            return None;
        }
        if self.pending.insert(origin, message).is_some() {
            tracing::warn!(merge = label, %origin, "duplicate merge arrival; previous message overwritten");
        }
        if self.pending.len() < self.upstreams.len() {
            return None;
        }

        tracing::debug!(merge = label, arity = self.arity(), "merge round complete");
        let pending = &mut self.pending;
        let parts = self
            .upstreams
            .iter()
            .map(|upstream| pending.remove(upstream).unwrap_or(None))
            .collect();
        pending.clear();
        Some(Message::merged(parts))
    }
}
