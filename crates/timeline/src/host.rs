//! Boundary to a host application's sequence editor.
//!
//! The engine never depends on a host being present; `NullHost` refuses every
//! request and everything else keeps working.

use thiserror::Error;

use crate::Transition;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no host sequence editor available")]
    Unavailable,
}

/// Something that can materialize a transition between two named clips.
pub trait TransitionHost {
    fn apply_transition(&mut self, transition: &Transition) -> Result<(), HostError>;
}

/// Stand-in used when no host is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl TransitionHost for NullHost {
    fn apply_transition(&mut self, _transition: &Transition) -> Result<(), HostError> {
        Err(HostError::Unavailable)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub applied: usize,
    pub failed: usize,
}
