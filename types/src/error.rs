//! The numbered failure taxonomy shared by every operation.
//!
//! Every failure carries a stable small-integer code ([`ErrorKind::code`])
//! plus a human-readable message (the `Display` of [`CenterError`]). Codes
//! are part of the external contract: consumers match on them, and they are
//! what an `Error` event carries.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::address::Address;
use crate::id::{GroupId, RequestId, ShareId};

/// Stable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorKind {
    IsNotOwner = 0,
    IsNotAUser = 1,
    IsNotARegisteredSystem = 2,
    UserAlreadyExists = 3,
    GroupNotActive = 4,
    NotOwnerOfGroup = 5,
    InGroup = 6,
    NotInGroup = 7,
    CircularDependency = 8,
    ShareDoesNotExist = 9,
    DoesNotOwnShare = 10,
    NoPendingParent = 11,
    NoPendingSubgroup = 12,
    RequestGroupMismatch = 13,
    InvalidUri = 14,
    NonnegativeTime = 15,
    RequestDoesNotExist = 16,
    StorageFailure = 17,
    TransportFailure = 18,
}

/// Coarse grouping of error kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller lacks the required relationship to the target.
    Authorization,
    /// The target id is unknown or in a conflicting state.
    Existence,
    /// The mutation would violate a graph invariant.
    Structural,
    /// A two-party handshake was accepted against the wrong request.
    Workflow,
    /// A malformed argument, rejected before any state is staged.
    Input,
    /// Storage or transport infrastructure failed.
    Infrastructure,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 19] = [
        ErrorKind::IsNotOwner,
        ErrorKind::IsNotAUser,
        ErrorKind::IsNotARegisteredSystem,
        ErrorKind::UserAlreadyExists,
        ErrorKind::GroupNotActive,
        ErrorKind::NotOwnerOfGroup,
        ErrorKind::InGroup,
        ErrorKind::NotInGroup,
        ErrorKind::CircularDependency,
        ErrorKind::ShareDoesNotExist,
        ErrorKind::DoesNotOwnShare,
        ErrorKind::NoPendingParent,
        ErrorKind::NoPendingSubgroup,
        ErrorKind::RequestGroupMismatch,
        ErrorKind::InvalidUri,
        ErrorKind::NonnegativeTime,
        ErrorKind::RequestDoesNotExist,
        ErrorKind::StorageFailure,
        ErrorKind::TransportFailure,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// The canonical upper-snake name, as used in `Error` events and logs.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::IsNotOwner => "IS_NOT_OWNER",
            ErrorKind::IsNotAUser => "IS_NOT_A_USER",
            ErrorKind::IsNotARegisteredSystem => "IS_NOT_A_REGISTERED_SYSTEM",
            ErrorKind::UserAlreadyExists => "USER_ALREADY_EXISTS",
            ErrorKind::GroupNotActive => "GROUP_NOT_ACTIVE",
            ErrorKind::NotOwnerOfGroup => "NOT_OWNER_OF_GROUP",
            ErrorKind::InGroup => "IN_GROUP",
            ErrorKind::NotInGroup => "NOT_IN_GROUP",
            ErrorKind::CircularDependency => "CIRCULAR_DEPENDENCY",
            ErrorKind::ShareDoesNotExist => "SHARE_DOES_NOT_EXIST",
            ErrorKind::DoesNotOwnShare => "DOES_NOT_OWN_SHARE",
            ErrorKind::NoPendingParent => "NO_PENDING_PARENT",
            ErrorKind::NoPendingSubgroup => "NO_PENDING_SUBGROUP",
            ErrorKind::RequestGroupMismatch => "REQUEST_GROUP_MISMATCH",
            ErrorKind::InvalidUri => "INVALID_URI",
            ErrorKind::NonnegativeTime => "NONNEGATIVE_TIME",
            ErrorKind::RequestDoesNotExist => "REQUEST_DOES_NOT_EXIST",
            ErrorKind::StorageFailure => "STORAGE_FAILURE",
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
        }
    }

    pub fn category(self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            IsNotOwner | IsNotAUser | IsNotARegisteredSystem | NotOwnerOfGroup
            | DoesNotOwnShare => ErrorCategory::Authorization,
            UserAlreadyExists | GroupNotActive | ShareDoesNotExist | RequestDoesNotExist => {
                ErrorCategory::Existence
            }
            InGroup | NotInGroup | CircularDependency => ErrorCategory::Structural,
            NoPendingParent | NoPendingSubgroup | RequestGroupMismatch => ErrorCategory::Workflow,
            InvalidUri | NonnegativeTime => ErrorCategory::Input,
            StorageFailure | TransportFailure => ErrorCategory::Infrastructure,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Error returned by every ShareCenter operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CenterError {
    #[error("{0} is not the registry owner")]
    NotOwner(Address),

    #[error("{0} is not a registered user")]
    NotAUser(Address),

    #[error("{0} is not a registered system")]
    NotARegisteredSystem(Address),

    #[error("user {0} already exists")]
    UserAlreadyExists(Address),

    #[error("group {0} is not active")]
    GroupNotActive(GroupId),

    #[error("{user} does not own group {group}")]
    NotOwnerOfGroup { user: Address, group: GroupId },

    #[error("{subject} is already in group {group}")]
    InGroup { group: GroupId, subject: String },

    #[error("{subject} is not in group {group}")]
    NotInGroup { group: GroupId, subject: String },

    #[error("placing group {parent} above group {child} would create a cycle")]
    CircularDependency { parent: GroupId, child: GroupId },

    #[error("share {0} does not exist")]
    ShareDoesNotExist(ShareId),

    #[error("{user} does not own share {share}")]
    DoesNotOwnShare { user: Address, share: ShareId },

    #[error("no pending parent request {request} for group {group}")]
    NoPendingParent { group: GroupId, request: RequestId },

    #[error("no pending subgroup request {request} for group {group}")]
    NoPendingSubgroup { group: GroupId, request: RequestId },

    #[error("request {request} targets group {expected}, not group {actual}")]
    RequestGroupMismatch {
        request: RequestId,
        expected: GroupId,
        actual: GroupId,
    },

    #[error("invalid uri: {0:?}")]
    InvalidUri(String),

    #[error("share lifetime must be non-negative, got {0}s")]
    NonnegativeTime(i64),

    #[error("request {0} does not exist")]
    RequestDoesNotExist(RequestId),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl CenterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CenterError::NotOwner(_) => ErrorKind::IsNotOwner,
            CenterError::NotAUser(_) => ErrorKind::IsNotAUser,
            CenterError::NotARegisteredSystem(_) => ErrorKind::IsNotARegisteredSystem,
            CenterError::UserAlreadyExists(_) => ErrorKind::UserAlreadyExists,
            CenterError::GroupNotActive(_) => ErrorKind::GroupNotActive,
            CenterError::NotOwnerOfGroup { .. } => ErrorKind::NotOwnerOfGroup,
            CenterError::InGroup { .. } => ErrorKind::InGroup,
            CenterError::NotInGroup { .. } => ErrorKind::NotInGroup,
            CenterError::CircularDependency { .. } => ErrorKind::CircularDependency,
            CenterError::ShareDoesNotExist(_) => ErrorKind::ShareDoesNotExist,
            CenterError::DoesNotOwnShare { .. } => ErrorKind::DoesNotOwnShare,
            CenterError::NoPendingParent { .. } => ErrorKind::NoPendingParent,
            CenterError::NoPendingSubgroup { .. } => ErrorKind::NoPendingSubgroup,
            CenterError::RequestGroupMismatch { .. } => ErrorKind::RequestGroupMismatch,
            CenterError::InvalidUri(_) => ErrorKind::InvalidUri,
            CenterError::NonnegativeTime(_) => ErrorKind::NonnegativeTime,
            CenterError::RequestDoesNotExist(_) => ErrorKind::RequestDoesNotExist,
            CenterError::Storage(_) => ErrorKind::StorageFailure,
            CenterError::Transport(_) => ErrorKind::TransportFailure,
        }
    }

    pub fn code(&self) -> u8 {
        self.kind().code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dense_and_round_trip() {
        for (i, kind) in ErrorKind::ALL.iter().enumerate() {
            assert_eq!(kind.code() as usize, i);
            assert_eq!(ErrorKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(ErrorKind::from_code(ErrorKind::ALL.len() as u8), None);
    }

    #[test]
    fn handshake_codes_match_the_client_contract() {
        assert_eq!(ErrorKind::NoPendingParent.code(), 11);
        assert_eq!(ErrorKind::NoPendingSubgroup.code(), 12);
        assert_eq!(ErrorKind::RequestGroupMismatch.code(), 13);
    }

    #[test]
    fn error_reports_kind_and_message() {
        let err = CenterError::CircularDependency {
            parent: GroupId::new(3),
            child: GroupId::new(1),
        };
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
        assert_eq!(err.code(), 8);
        assert_eq!(
            err.to_string(),
            "placing group 3 above group 1 would create a cycle"
        );
        assert_eq!(err.kind().category(), ErrorCategory::Structural);
    }

    #[test]
    fn kind_display_includes_name_and_code() {
        assert_eq!(ErrorKind::InvalidUri.to_string(), "INVALID_URI (14)");
    }
}
