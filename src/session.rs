//! Registration gate in front of every workflow operation.

use crate::error::{AuthError, GatewayError};
use crate::model::{SessionState, VisitorIdentity};

#[derive(Debug, Clone, Default)]
enum Gate {
    #[default]
    LoggedOut,
    Authenticating(VisitorIdentity),
    LoggedIn(VisitorIdentity),
}

/// Owns the visitor identity and the open/closed state of the gate. There is
/// no logout: once open, the gate stays open for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct SessionController {
    gate: Gate,
}

impl SessionController {
    pub fn state(&self) -> SessionState {
        match self.gate {
            Gate::LoggedOut => SessionState::LoggedOut,
            Gate::Authenticating(_) => SessionState::Authenticating,
            Gate::LoggedIn(_) => SessionState::LoggedIn,
        }
    }

    pub fn visitor(&self) -> Option<&VisitorIdentity> {
        match &self.gate {
            Gate::LoggedIn(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.gate, Gate::LoggedIn(_))
    }

    /// Move to `Authenticating`. Returns `false` (and changes nothing) unless
    /// the session is currently logged out.
    pub fn begin(&mut self, identity: VisitorIdentity) -> bool {
        if !matches!(self.gate, Gate::LoggedOut) {
            return false;
        }
        self.gate = Gate::Authenticating(identity);
        true
    }

    /// Settle a pending login. An outcome with no login pending is ignored,
    /// so an open session can never be closed again.
    pub fn complete(&mut self, outcome: Result<(), GatewayError>) -> Result<(), AuthError> {
        let Gate::Authenticating(identity) = &self.gate else {
            tracing::debug!(state = ?self.state(), "registration outcome with no pending login");
            return Ok(());
        };
        match outcome {
            Ok(()) => {
                self.gate = Gate::LoggedIn(identity.clone());
                Ok(())
            }
            Err(e) => {
                self.gate = Gate::LoggedOut;
                Err(AuthError::Unavailable(e))
            }
        }
    }
}
