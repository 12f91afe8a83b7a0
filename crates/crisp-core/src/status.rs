//! The behavior-tree status contract.

use serde::{Deserialize, Serialize};

/// Result of ticking a behavior-tree node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BtStatus {
    Success,
    Failure,
    Running,
}

impl BtStatus {
    pub fn is_success(self) -> bool {
        self == BtStatus::Success
    }

    pub fn is_failure(self) -> bool {
        self == BtStatus::Failure
    }

    pub fn is_running(self) -> bool {
        self == BtStatus::Running
    }

    /// Swaps Success and Failure; Running is unchanged.
    pub fn inverted(self) -> BtStatus {
        match self {
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
            BtStatus::Running => BtStatus::Running,
        }
    }

    /// Success for `true`, Failure for `false`.
    pub fn from_bool(value: bool) -> BtStatus {
        if value {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }
}

impl std::fmt::Display for BtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BtStatus::Success => write!(f, "success"),
            BtStatus::Failure => write!(f, "failure"),
            BtStatus::Running => write!(f, "running"),
        }
    }
}
