use std::fmt;

use farm_trait::{
    FarmError,
    RpcError,
};

/// Why a user action did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The wallet dismissed the request. Never shown to the user.
    UserRejected,
    Reverted(String),
    Network(String),
    /// Rejected before anything was submitted.
    InvalidInput(FarmError),
    /// Another submission on the same farm has not returned yet.
    ActionInFlight,
}

impl ActionError {
    /// Whether the error should be stored for display.
    pub fn is_silent(&self) -> bool {
        matches!(self, ActionError::UserRejected)
    }
}

impl From<RpcError> for ActionError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::UserRejected => ActionError::UserRejected,
            RpcError::Reverted(reason) => ActionError::Reverted(reason),
            RpcError::Network(reason) => ActionError::Network(reason),
        }
    }
}

impl From<FarmError> for ActionError {
    fn from(e: FarmError) -> Self {
        ActionError::InvalidInput(e)
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::UserRejected => write!(f, "Transaction rejected"),
            ActionError::Reverted(reason) => write!(f, "Transaction failed: {reason}"),
            ActionError::Network(reason) => write!(f, "Network error: {reason}"),
            ActionError::InvalidInput(e) => write!(f, "{e}"),
            ActionError::ActionInFlight => write!(f, "Waiting for the previous transaction"),
        }
    }
}

impl std::error::Error for ActionError {}
