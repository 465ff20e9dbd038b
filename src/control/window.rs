//! Epoch-windowed predicates.
//!
//! `Before`, `After`, and `Around` gate a branch on where a message's epoch
//! falls relative to a reference epoch, with a fixed margin. The reference
//! is deliberately mutable after construction: one branch of a graph
//! (holding the [`EpochWriter`]) retargets the window that another branch
//! (holding [`EpochReader`] clones) reads as simulated time advances.
//!
//! This cell is the engine's only sanctioned cross-branch side channel, and
//! the single-writer rule is structural: [`EpochWriter`] is not `Clone` and
//! only it exposes `set`/`advance`.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeDelta, Utc};

use crate::message::Message;
use crate::stage::{Condition, StageError};

/// Creates a shared reference-epoch cell, split into its single write
/// handle and a cloneable read handle.
///
/// # Examples
///
/// ```
/// use chrono::{TimeDelta, Utc};
/// use stageflow::control::{epoch_cell, Before};
///
/// let now = Utc::now();
/// let (writer, reader) = epoch_cell(now);
/// let _gate = Before::new(reader.clone(), TimeDelta::seconds(60));
///
/// writer.advance(TimeDelta::seconds(10));
/// assert_eq!(reader.get(), now + TimeDelta::seconds(10));
/// ```
#[must_use]
pub fn epoch_cell(initial: DateTime<Utc>) -> (EpochWriter, EpochReader) {
    let cell = Arc::new(RwLock::new(initial));
    (
        EpochWriter { cell: cell.clone() },
        EpochReader { cell },
    )
}

/// Write handle for a reference-epoch cell. Deliberately not `Clone`.
#[derive(Debug)]
pub struct EpochWriter {
    cell: Arc<RwLock<DateTime<Utc>>>,
}

impl EpochWriter {
    /// Replaces the reference epoch.
    pub fn set(&self, epoch: DateTime<Utc>) {
        *self.cell.write().expect("epoch cell poisoned") = epoch;
    }

    /// Shifts the reference epoch by a delta.
    pub fn advance(&self, delta: TimeDelta) {
        let mut cell = self.cell.write().expect("epoch cell poisoned");
        *cell = *cell + delta;
    }

    /// Current reference epoch.
    #[must_use]
    pub fn get(&self) -> DateTime<Utc> {
        *self.cell.read().expect("epoch cell poisoned")
    }
}

/// Read handle for a reference-epoch cell.
#[derive(Clone, Debug)]
pub struct EpochReader {
    cell: Arc<RwLock<DateTime<Utc>>>,
}

impl EpochReader {
    /// Current reference epoch.
    #[must_use]
    pub fn get(&self) -> DateTime<Utc> {
        *self.cell.read().expect("epoch cell poisoned")
    }
}

fn message_epoch(message: Option<&Message>) -> Result<DateTime<Utc>, StageError> {
    message
        .ok_or(StageError::MissingInput { what: "message" })?
        .require_epoch()
}

/// True iff the message epoch precedes the reference by more than the
/// margin: `epoch < reference − margin`.
pub struct Before {
    reference: EpochReader,
    margin: TimeDelta,
}

impl Before {
    #[must_use]
    pub fn new(reference: EpochReader, margin: TimeDelta) -> Self {
        Self { reference, margin }
    }
}

impl Condition for Before {
    fn satisfy(&mut self, message: Option<&Message>) -> Result<bool, StageError> {
        let epoch = message_epoch(message)?;
        Ok(epoch < self.reference.get() - self.margin)
    }
}

/// True iff the message epoch follows the reference by more than the
/// margin: `epoch > reference + margin`.
pub struct After {
    reference: EpochReader,
    margin: TimeDelta,
}

impl After {
    #[must_use]
    pub fn new(reference: EpochReader, margin: TimeDelta) -> Self {
        Self { reference, margin }
    }
}

impl Condition for After {
    fn satisfy(&mut self, message: Option<&Message>) -> Result<bool, StageError> {
        let epoch = message_epoch(message)?;
        Ok(epoch > self.reference.get() + self.margin)
    }
}

/// True iff the message epoch lies strictly within the margin of the
/// reference: `reference − margin < epoch < reference + margin`.
pub struct Around {
    reference: EpochReader,
    margin: TimeDelta,
}

impl Around {
    #[must_use]
    pub fn new(reference: EpochReader, margin: TimeDelta) -> Self {
        Self { reference, margin }
    }
}

impl Condition for Around {
    fn satisfy(&mut self, message: Option<&Message>) -> Result<bool, StageError> {
        let epoch = message_epoch(message)?;
        let reference = self.reference.get();
        Ok(epoch > reference - self.margin && epoch < reference + self.margin)
    }
}
