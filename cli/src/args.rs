//! Command line definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sharecenter_center::Caller;
use sharecenter_types::{AccessLevel, Address, GroupId, Lifetime, RequestId, ShareId, Timestamp};
use sharecenter_utils::LogFormat;

#[derive(Parser)]
#[command(name = "sharecenter", about = "ShareCenter access-control registry", version)]
pub struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, global = true, env = "SHARECENTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, global = true, env = "SHARECENTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Registry owner, recorded the first time a data directory is opened.
    #[arg(long, global = true, env = "SHARECENTER_OWNER")]
    pub owner: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "SHARECENTER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output: "human" or "json".
    #[arg(long, global = true, env = "SHARECENTER_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The system and user a mutation runs as.
#[derive(Args, Clone)]
pub struct CallerArgs {
    /// Calling system.
    #[arg(long, env = "SHARECENTER_SYSTEM")]
    pub system: String,

    /// User the system acts for.
    #[arg(long = "as", env = "SHARECENTER_USER")]
    pub acting_user: String,
}

impl CallerArgs {
    pub fn caller(&self) -> Caller {
        Caller::new(self.system.as_str(), self.acting_user.as_str())
    }
}

/// The address an owner-only command runs as. The center refuses it unless
/// it is the registry owner.
#[derive(Args, Clone)]
pub struct OwnerArgs {
    #[arg(id = "as_owner", long = "as-owner", env = "SHARECENTER_AS_OWNER")]
    pub address: String,
}

impl OwnerArgs {
    pub fn address(&self) -> Address {
        Address::new(self.address.as_str())
    }
}

/// How long a share lasts. Indefinite when neither flag is given.
#[derive(Args, Clone)]
pub struct ExpiryArgs {
    /// Lifetime in seconds from now.
    #[arg(long, conflicts_with = "expires_at")]
    pub expires_in: Option<i64>,

    /// Calendar date (YYYY-MM-DD, midnight UTC) the share expires on.
    #[arg(long)]
    pub expires_at: Option<NaiveDate>,

    /// Grant write access instead of read.
    #[arg(long)]
    pub write: bool,
}

impl ExpiryArgs {
    /// Convert to a lifetime relative to `now`. A date in the past yields a
    /// negative lifetime, which the center refuses.
    pub fn lifetime(&self, now: Timestamp) -> Lifetime {
        if let Some(secs) = self.expires_in {
            return Lifetime::Seconds(secs);
        }
        match self.expires_at {
            Some(date) => {
                let at = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
                Lifetime::Seconds(at - now.as_secs() as i64)
            }
            None => Lifetime::Indefinite,
        }
    }

    pub fn access(&self) -> AccessLevel {
        if self.write {
            AccessLevel::Write
        } else {
            AccessLevel::Read
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the systems allowed to call the center.
    System {
        #[command(subcommand)]
        action: SystemAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    Share {
        #[command(subcommand)]
        action: ShareAction,
    },
    /// Join requests, invitations and share offers.
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    Whitelist {
        #[command(subcommand)]
        action: WhitelistAction,
    },
    /// Print the persisted event log.
    Events {
        /// First sequence number to print.
        #[arg(long, default_value_t = 1)]
        from: u64,

        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Keep polling for new events until interrupted.
        #[arg(long)]
        follow: bool,
    },
    /// Verify every database of the data directory can be read.
    Check,
    /// Print ledger counts.
    Stats,
}

#[derive(Subcommand)]
pub enum SystemAction {
    /// Authorize a system. Only the registry owner may.
    Add {
        #[command(flatten)]
        owner: OwnerArgs,
        address: String,
    },
    /// Whether a system is authorized.
    Check { address: String },
    List,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user under a system.
    Create {
        #[arg(long, env = "SHARECENTER_SYSTEM")]
        system: String,
        address: String,
    },
    Show { address: String },
}

#[derive(Subcommand)]
pub enum GroupAction {
    Create {
        #[command(flatten)]
        caller: CallerArgs,
    },
    AddUser {
        #[command(flatten)]
        caller: CallerArgs,
        group: GroupId,
        user: String,
    },
    RemoveUser {
        #[command(flatten)]
        caller: CallerArgs,
        group: GroupId,
        user: String,
    },
    AddWriter {
        #[command(flatten)]
        caller: CallerArgs,
        group: GroupId,
        user: String,
    },
    RevokeWriter {
        #[command(flatten)]
        caller: CallerArgs,
        group: GroupId,
        user: String,
    },
    /// Place `child` under `parent` directly. Requires owning both.
    Link {
        #[command(flatten)]
        caller: CallerArgs,
        parent: GroupId,
        child: GroupId,
    },
    Unlink {
        #[command(flatten)]
        caller: CallerArgs,
        parent: GroupId,
        child: GroupId,
    },
    /// Let `peer` see the shares of `group`.
    ShareWith {
        #[command(flatten)]
        caller: CallerArgs,
        group: GroupId,
        peer: GroupId,
    },
    Unshare {
        #[command(flatten)]
        caller: CallerArgs,
        group: GroupId,
        peer: GroupId,
    },
    Show { group: GroupId },
    /// Groups a user owns or belongs to.
    List { user: String },
}

#[derive(Subcommand)]
pub enum ShareAction {
    Add {
        #[command(flatten)]
        caller: CallerArgs,
        uri: String,
        /// Target groups; one share is created per group.
        #[arg(long = "group", required = true)]
        groups: Vec<GroupId>,
        #[command(flatten)]
        expiry: ExpiryArgs,
    },
    Delete {
        #[command(flatten)]
        caller: CallerArgs,
        share: ShareId,
    },
    /// Unexpired shares owned by one group.
    List { group: GroupId },
    /// Every share visible to a user, by owning group.
    All { user: String },
    /// Delete expired share records. Only the registry owner may.
    Purge {
        #[command(flatten)]
        owner: OwnerArgs,
    },
}

#[derive(Subcommand)]
pub enum RequestAction {
    /// Ask for `child` to join `parent`.
    Join {
        #[command(flatten)]
        caller: CallerArgs,
        child: GroupId,
        parent: GroupId,
    },
    /// Invite `child` into `parent`.
    Invite {
        #[command(flatten)]
        caller: CallerArgs,
        parent: GroupId,
        child: GroupId,
    },
    /// Offer a share to another user.
    Share {
        #[command(flatten)]
        caller: CallerArgs,
        from_group: GroupId,
        to_user: String,
        uri: String,
        #[command(flatten)]
        expiry: ExpiryArgs,
    },
    /// Accept a request. Share offers land in `--group` targets or the
    /// personal group.
    Accept {
        #[command(flatten)]
        caller: CallerArgs,
        request: RequestId,
        #[arg(long = "group")]
        groups: Vec<GroupId>,
    },
    Reject {
        #[command(flatten)]
        caller: CallerArgs,
        request: RequestId,
    },
    Withdraw {
        #[command(flatten)]
        caller: CallerArgs,
        request: RequestId,
    },
    /// Incoming and outgoing requests of a user.
    List { user: String },
}

#[derive(Subcommand)]
pub enum BlacklistAction {
    Add {
        #[command(flatten)]
        caller: CallerArgs,
        #[command(flatten)]
        target: BlacklistTarget,
    },
    Remove {
        #[command(flatten)]
        caller: CallerArgs,
        #[command(flatten)]
        target: BlacklistTarget,
    },
}

#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
pub struct BlacklistTarget {
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub group: Option<GroupId>,
}

#[derive(Subcommand)]
pub enum WhitelistAction {
    Add {
        #[command(flatten)]
        caller: CallerArgs,
        user: String,
    },
    Remove {
        #[command(flatten)]
        caller: CallerArgs,
        user: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_in_wins_over_default() {
        let args = ExpiryArgs {
            expires_in: Some(30),
            expires_at: None,
            write: false,
        };
        assert_eq!(args.lifetime(Timestamp::new(100)), Lifetime::Seconds(30));
        assert_eq!(args.access(), AccessLevel::Read);
    }

    #[test]
    fn expires_at_is_relative_to_now() {
        let args = ExpiryArgs {
            expires_in: None,
            expires_at: NaiveDate::from_ymd_opt(1970, 1, 2),
            write: true,
        };
        assert_eq!(args.lifetime(Timestamp::new(86_000)), Lifetime::Seconds(400));
        assert_eq!(args.access(), AccessLevel::Write);
    }

    #[test]
    fn no_expiry_is_indefinite() {
        let args = ExpiryArgs {
            expires_in: None,
            expires_at: None,
            write: false,
        };
        assert_eq!(args.lifetime(Timestamp::new(5)), Lifetime::Indefinite);
    }

    #[test]
    fn parses_share_add() {
        let cli = Cli::try_parse_from([
            "sharecenter",
            "share",
            "add",
            "--system",
            "0xsys",
            "--as",
            "0xalice",
            "ipfs://doc",
            "--group",
            "3",
            "--group",
            "g4",
            "--expires-in",
            "60",
        ])
        .unwrap();
        let Command::Share {
            action: ShareAction::Add { caller, groups, expiry, .. },
        } = cli.command
        else {
            panic!("expected share add");
        };
        assert_eq!(caller.caller(), Caller::new("0xsys", "0xalice"));
        assert_eq!(groups, vec![GroupId::new(3), GroupId::new(4)]);
        assert_eq!(expiry.expires_in, Some(60));
    }

    #[test]
    fn owner_commands_need_an_owner_address() {
        assert!(Cli::try_parse_from(["sharecenter", "share", "purge"]).is_err());

        let cli = Cli::try_parse_from([
            "sharecenter",
            "system",
            "add",
            "--as-owner",
            "0xmallory",
            "0xsys",
        ])
        .unwrap();
        let Command::System {
            action: SystemAction::Add { owner, address },
        } = cli.command
        else {
            panic!("expected system add");
        };
        assert_eq!(owner.address(), Address::new("0xmallory"));
        assert_eq!(address, "0xsys");
    }

    #[test]
    fn expiry_flags_conflict() {
        let result = Cli::try_parse_from([
            "sharecenter",
            "share",
            "add",
            "--system",
            "s",
            "--as",
            "u",
            "ipfs://x",
            "--group",
            "1",
            "--expires-in",
            "5",
            "--expires-at",
            "2030-01-01",
        ]);
        assert!(result.is_err());
    }
}
