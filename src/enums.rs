use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─── SwapStatus ──────────────────────────────────────────────────────

/// Terminal and in-flight states of one swap operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapStatus {
    Pending,
    Success,
    Failed,
}

impl SwapStatus {
    /// Canonical string stored in the history log.
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "PENDING",
            SwapStatus::Success => "SUCCESS",
            SwapStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(SwapStatus::Pending),
            "SUCCESS" => Ok(SwapStatus::Success),
            "FAILED" => Ok(SwapStatus::Failed),
            _ => Err(AppError::InvalidInput(format!("Unknown swap status: {}", s))),
        }
    }
}

// ─── NotificationKind ────────────────────────────────────────────────

/// Severity of a user-facing notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "INFO",
            NotificationKind::Success => "SUCCESS",
            NotificationKind::Warning => "WARNING",
            NotificationKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_status_round_trips_through_strings() {
        for status in [SwapStatus::Pending, SwapStatus::Success, SwapStatus::Failed] {
            assert_eq!(status.as_str().parse::<SwapStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<SwapStatus>().is_err());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!SwapStatus::Pending.is_terminal());
        assert!(SwapStatus::Success.is_terminal());
        assert!(SwapStatus::Failed.is_terminal());
    }
}
