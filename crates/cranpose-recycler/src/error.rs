use crate::holder::{HolderId, ViewType};

/// Errors reported by the recycler.
///
/// `ConsistencyMismatch` is never returned from a public operation. It is
/// built only so the recovered mismatch can be logged with a uniform message
/// before resolution falls through to the next tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecyclerError {
    OutOfRange {
        position: usize,
        item_count: usize,
    },
    InvalidOperationState {
        holder: Option<HolderId>,
        reason: &'static str,
    },
    ConsistencyMismatch {
        holder: HolderId,
        expected: ViewType,
        found: ViewType,
    },
}

impl RecyclerError {
    pub(crate) fn invalid_state(reason: &'static str) -> Self {
        RecyclerError::InvalidOperationState {
            holder: None,
            reason,
        }
    }

    pub(crate) fn invalid_holder(holder: HolderId, reason: &'static str) -> Self {
        RecyclerError::InvalidOperationState {
            holder: Some(holder),
            reason,
        }
    }
}

impl std::fmt::Display for RecyclerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecyclerError::OutOfRange {
                position,
                item_count,
            } => write!(
                f,
                "invalid item position {position}; item count is {item_count}"
            ),
            RecyclerError::InvalidOperationState {
                holder: Some(holder),
                reason,
            } => write!(f, "invalid operation on holder {holder}: {reason}"),
            RecyclerError::InvalidOperationState { holder: None, reason } => {
                write!(f, "invalid operation: {reason}")
            }
            RecyclerError::ConsistencyMismatch {
                holder,
                expected,
                found,
            } => write!(
                f,
                "holder {holder} has view type {found}; data source expects {expected}"
            ),
        }
    }
}

impl std::error::Error for RecyclerError {}
