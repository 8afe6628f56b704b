//! Request state machine.
//!
//! ```text
//! Created ─► Identified ─► Validated ─► Authorized ─► Dispatched ─► ResponseChecked ─► Completed
//!                 │             │             │
//!                 └─────────────┴─────────────┴──────► Rejected
//! ```
//!
//! Transitions only move forward. `Completed` and `Rejected` are terminal.

use std::fmt;

use thiserror::Error;

/// Position of a request in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Context allocated, nothing resolved yet.
    Created,
    /// Correlation, trace and caller identity are attached.
    Identified,
    /// Parameters and body passed validation.
    Validated,
    /// The decision point allowed the call.
    Authorized,
    /// The handler returned a response.
    Dispatched,
    /// The response was checked against its schema.
    ResponseChecked,
    /// Terminal: every stage ran.
    Completed,
    /// Terminal: a pre-dispatch stage failed.
    Rejected,
}

/// A transition the state machine refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid pipeline transition from {from} to {to}")]
pub struct InvalidTransition {
    /// State the request was in.
    pub from: PipelineState,
    /// State that was requested.
    pub to: PipelineState,
}

impl PipelineState {
    /// Returns the state that follows `self` on the success path.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Identified),
            Self::Identified => Some(Self::Validated),
            Self::Validated => Some(Self::Authorized),
            Self::Authorized => Some(Self::Dispatched),
            Self::Dispatched => Some(Self::ResponseChecked),
            Self::ResponseChecked => Some(Self::Completed),
            Self::Completed | Self::Rejected => None,
        }
    }

    /// Moves to `next`, which must be the immediate successor.
    pub fn advance(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.successor() == Some(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Moves to `Rejected`.
    ///
    /// Only the stages between identification and dispatch may reject.
    pub fn reject(self) -> Result<Self, InvalidTransition> {
        if self.can_reject() {
            Ok(Self::Rejected)
        } else {
            Err(InvalidTransition {
                from: self,
                to: Self::Rejected,
            })
        }
    }

    /// Returns `true` if a rejection is allowed from this state.
    #[must_use]
    pub const fn can_reject(self) -> bool {
        matches!(self, Self::Identified | Self::Validated | Self::Authorized)
    }

    /// Returns `true` for `Completed` and `Rejected`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Returns the snake_case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Identified => "identified",
            Self::Validated => "validated",
            Self::Authorized => "authorized",
            Self::Dispatched => "dispatched",
            Self::ResponseChecked => "response_checked",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
