//! Multi-device session registry.
//!
//! Every authenticated installation keeps one record under
//! `users/{uid}/sessions/{session_id}` and watches the whole collection. A
//! record deleted from elsewhere signs the installation out.

mod device;
mod id;
mod registry;

pub use device::*;
pub use id::*;
pub use registry::*;

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No active session")]
    NotActive,

    #[error("Sign-out failed: {0}")]
    SignOut(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Lifecycle of this installation's session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Active {
        session_id: String,
    },
    /// Closed from another device. Terminal until the next sign-in.
    Revoked,
    /// Closed locally. Terminal until the next sign-in.
    LoggedOut,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionState::Active { session_id } => Some(session_id),
            _ => None,
        }
    }

    /// Ended by a revocation or logout; only an explicit sign-in leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Revoked | SessionState::LoggedOut)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::Active { session_id } => write!(f, "active({})", session_id),
            SessionState::Revoked => write!(f, "revoked"),
            SessionState::LoggedOut => write!(f, "logged-out"),
        }
    }
}
