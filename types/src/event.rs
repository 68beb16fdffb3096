//! Events raised by committed mutations.
//!
//! Each successful mutation raises one or more events; a failed mutation
//! raises a single [`CenterEvent::Error`]. Events are sequenced at commit
//! time, so `seq` order is commit order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::id::{GroupId, RequestId, ShareId};
use crate::time::Timestamp;
use crate::uri::Uri;

/// The three kinds of two-party request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Join,
    Invite,
    Share,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestType::Join => "join",
            RequestType::Invite => "invite",
            RequestType::Share => "share",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CenterEvent {
    SystemAdded {
        system: Address,
    },
    UserCreated {
        user: Address,
        system: Address,
        personal_group: GroupId,
    },
    GroupCreated {
        group: GroupId,
        owner: Address,
    },
    /// `child` now sees the shares of `parent`.
    GroupLinked {
        parent: GroupId,
        child: GroupId,
    },
    GroupUnlinked {
        parent: GroupId,
        child: GroupId,
    },
    /// `peer` now sees the shares of `group`.
    ShareGroupAdded {
        group: GroupId,
        peer: GroupId,
    },
    ShareGroupRemoved {
        group: GroupId,
        peer: GroupId,
    },
    ShareAdded {
        share: ShareId,
        group: GroupId,
        uri: Uri,
    },
    ShareDeleted {
        share: ShareId,
        group: GroupId,
    },
    WriterAdded {
        group: GroupId,
        user: Address,
    },
    WriterRevoked {
        group: GroupId,
        user: Address,
    },
    ReaderAdded {
        group: GroupId,
        user: Address,
    },
    ReaderRevoked {
        group: GroupId,
        user: Address,
    },
    BlacklistUpdated {
        user: Address,
    },
    RequestProposed {
        request: RequestId,
        kind: RequestType,
        proposer: Address,
    },
    RequestAccepted {
        request: RequestId,
        kind: RequestType,
    },
    RequestRejected {
        request: RequestId,
    },
    RequestWithdrawn {
        request: RequestId,
    },
    /// A mutation failed; `code` is an [`crate::ErrorKind`] code.
    Error {
        code: u8,
    },
}

/// Field-less names of [`CenterEvent`] variants, used to route listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventName {
    SystemAdded,
    UserCreated,
    GroupCreated,
    GroupLinked,
    GroupUnlinked,
    ShareGroupAdded,
    ShareGroupRemoved,
    ShareAdded,
    ShareDeleted,
    WriterAdded,
    WriterRevoked,
    ReaderAdded,
    ReaderRevoked,
    BlacklistUpdated,
    RequestProposed,
    RequestAccepted,
    RequestRejected,
    RequestWithdrawn,
    Error,
}

impl EventName {
    pub const ALL: [EventName; 19] = [
        EventName::SystemAdded,
        EventName::UserCreated,
        EventName::GroupCreated,
        EventName::GroupLinked,
        EventName::GroupUnlinked,
        EventName::ShareGroupAdded,
        EventName::ShareGroupRemoved,
        EventName::ShareAdded,
        EventName::ShareDeleted,
        EventName::WriterAdded,
        EventName::WriterRevoked,
        EventName::ReaderAdded,
        EventName::ReaderRevoked,
        EventName::BlacklistUpdated,
        EventName::RequestProposed,
        EventName::RequestAccepted,
        EventName::RequestRejected,
        EventName::RequestWithdrawn,
        EventName::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::SystemAdded => "SystemAdded",
            EventName::UserCreated => "UserCreated",
            EventName::GroupCreated => "GroupCreated",
            EventName::GroupLinked => "GroupLinked",
            EventName::GroupUnlinked => "GroupUnlinked",
            EventName::ShareGroupAdded => "ShareGroupAdded",
            EventName::ShareGroupRemoved => "ShareGroupRemoved",
            EventName::ShareAdded => "ShareAdded",
            EventName::ShareDeleted => "ShareDeleted",
            EventName::WriterAdded => "WriterAdded",
            EventName::WriterRevoked => "WriterRevoked",
            EventName::ReaderAdded => "ReaderAdded",
            EventName::ReaderRevoked => "ReaderRevoked",
            EventName::BlacklistUpdated => "BlacklistUpdated",
            EventName::RequestProposed => "RequestProposed",
            EventName::RequestAccepted => "RequestAccepted",
            EventName::RequestRejected => "RequestRejected",
            EventName::RequestWithdrawn => "RequestWithdrawn",
            EventName::Error => "Error",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown event name '{s}'"))
    }
}

impl CenterEvent {
    pub fn name(&self) -> EventName {
        match self {
            CenterEvent::SystemAdded { .. } => EventName::SystemAdded,
            CenterEvent::UserCreated { .. } => EventName::UserCreated,
            CenterEvent::GroupCreated { .. } => EventName::GroupCreated,
            CenterEvent::GroupLinked { .. } => EventName::GroupLinked,
            CenterEvent::GroupUnlinked { .. } => EventName::GroupUnlinked,
            CenterEvent::ShareGroupAdded { .. } => EventName::ShareGroupAdded,
            CenterEvent::ShareGroupRemoved { .. } => EventName::ShareGroupRemoved,
            CenterEvent::ShareAdded { .. } => EventName::ShareAdded,
            CenterEvent::ShareDeleted { .. } => EventName::ShareDeleted,
            CenterEvent::WriterAdded { .. } => EventName::WriterAdded,
            CenterEvent::WriterRevoked { .. } => EventName::WriterRevoked,
            CenterEvent::ReaderAdded { .. } => EventName::ReaderAdded,
            CenterEvent::ReaderRevoked { .. } => EventName::ReaderRevoked,
            CenterEvent::BlacklistUpdated { .. } => EventName::BlacklistUpdated,
            CenterEvent::RequestProposed { .. } => EventName::RequestProposed,
            CenterEvent::RequestAccepted { .. } => EventName::RequestAccepted,
            CenterEvent::RequestRejected { .. } => EventName::RequestRejected,
            CenterEvent::RequestWithdrawn { .. } => EventName::RequestWithdrawn,
            CenterEvent::Error { .. } => EventName::Error,
        }
    }
}

/// An event as committed to the ledger's event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 1.
    pub seq: u64,
    /// Commit time of the mutation that raised the event.
    pub at: Timestamp,
    pub event: CenterEvent,
}
