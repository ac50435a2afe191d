//! Reconcilers between the Rekordbox XML and the Mixed In Key database
//!
//! Every reconciler walks the same phases: validate preconditions, back up
//! the store it is about to mutate, process entities one by one (a failure
//! on one entity is counted, never fatal), persist once, report. Dry runs
//! skip the backup and persistence but still produce the full report.

mod check;
mod deletion;
mod from_mik;
mod report;
mod tag_sync;
mod to_mik;

pub use check::{check, CheckReport};
pub use deletion::RemovalDeleter;
pub use from_mik::MikToXml;
pub use report::{DeletionReport, MirrorReport, TagSyncReport};
pub use tag_sync::TagSync;
pub use to_mik::XmlToMik;

use std::fmt;

/// Step of a reconciler run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    BackingUp,
    Processing,
    Persisting,
    Reporting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validating => "validating",
            Phase::BackingUp => "backing up",
            Phase::Processing => "processing",
            Phase::Persisting => "persisting",
            Phase::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

pub(crate) fn enter(operation: &str, phase: Phase) {
    log::debug!("{operation}: {phase}");
}
