use crate::shared::error::{FramereelError, Result};

/// Lifecycle of an encoding session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unopened,
    Open,
    Closed,
}

impl SessionState {
    /// Fails fast unless the session accepts frames.
    pub fn ensure_writable(self, writer: &'static str) -> Result<()> {
        match self {
            SessionState::Open => Ok(()),
            SessionState::Unopened => Err(FramereelError::WriteBeforeOpen { writer }),
            SessionState::Closed => Err(FramereelError::WriteAfterClose { writer }),
        }
    }

    pub fn is_open(self) -> bool {
        self == SessionState::Open
    }
}
