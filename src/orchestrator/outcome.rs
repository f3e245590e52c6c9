//! Rebuild result classification.

use std::io;
use std::time::Duration;

use crate::install::InstallError;
use crate::logger;

/// How a failed rebuild is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A leftover install artifact; logged at verbose level and ignored
    Benign,
    /// Logged as an error; the session keeps running
    Reportable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failed(FailureClass),
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Classify by error type and kind.
///
/// Only an install that found the link already in place is benign; an
/// `AlreadyExists` raised outside the installer is reported.
pub fn classify(err: &anyhow::Error) -> FailureClass {
    let benign = err.chain().any(|cause| match cause.downcast_ref::<InstallError>() {
        Some(InstallError::LinkExists(_)) => true,
        Some(InstallError::Io { source, .. }) => source.kind() == io::ErrorKind::AlreadyExists,
        _ => false,
    });

    if benign {
        FailureClass::Benign
    } else {
        FailureClass::Reportable
    }
}

/// Log a finished rebuild and turn it into an outcome.
pub fn report(result: &anyhow::Result<()>, elapsed: Duration) -> BuildOutcome {
    let err = match result {
        Ok(()) => {
            logger::status_success(&format!("rebuilt in {}ms", elapsed.as_millis()));
            return BuildOutcome::Success;
        }
        Err(err) => err,
    };

    match classify(err) {
        FailureClass::Benign => {
            crate::debug!("start"; "ignored: {:#}", err);
            BuildOutcome::Failed(FailureClass::Benign)
        }
        FailureClass::Reportable => {
            crate::error!("start"; "rebuild failed: {:#}", err);
            BuildOutcome::Failed(FailureClass::Reportable)
        }
    }
}
