//! Pending request storage trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use sharecenter_types::{AccessLevel, Address, Expiry, GroupId, RequestId, RequestType, Timestamp, Uri};

/// What a pending request proposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// `child` asks to become a subgroup of `parent`; `parent`'s owner accepts.
    Join { child: GroupId, parent: GroupId },
    /// `parent` invites `child` to become its subgroup; `child`'s owner accepts.
    Invite { parent: GroupId, child: GroupId },
    /// A share offered to `to_user`, who picks the receiving groups on accept.
    Share {
        from_group: GroupId,
        to_user: Address,
        uri: Uri,
        access: AccessLevel,
        expiry: Expiry,
    },
}

impl RequestKind {
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestKind::Join { .. } => RequestType::Join,
            RequestKind::Invite { .. } => RequestType::Invite,
            RequestKind::Share { .. } => RequestType::Share,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub proposer: Address,
    pub kind: RequestKind,
    pub created_at: Timestamp,
}

pub trait RequestStore {
    fn get_request(&self, id: RequestId) -> Result<Option<RequestRecord>, StoreError>;
    fn iter_requests(&self) -> Result<Vec<RequestRecord>, StoreError>;
}
