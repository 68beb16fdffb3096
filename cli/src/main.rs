//! ShareCenter command line: runs one operation against an LMDB-backed center.
//!
//! A data directory should have one writing process at a time; each
//! invocation loads the ledger, applies its operation and exits.

mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use sharecenter_center::{Accepted, CenterConfig, Receipt, ShareCenter};
use sharecenter_store::ShareRecord;
use sharecenter_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};
use sharecenter_types::{Address, CenterError, EventRecord, Expiry, SystemClock, Timestamp};
use sharecenter_utils::format_duration;

use args::{
    BlacklistAction, BlacklistTarget, Cli, Command, GroupAction, RequestAction, ShareAction,
    SystemAction, UserAction, WhitelistAction,
};

type Center = ShareCenter<LmdbEnvironment>;

/// Events fetched per poll when following the log.
const FOLLOW_PAGE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    sharecenter_utils::init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::debug!(path = %path.display(), "loaded config file");
    }

    check_data_dir(&config.data_dir)?;
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let center = ShareCenter::open_with_config(env, &config, Arc::new(SystemClock))?;
    let out = Output { json: cli.json };

    dispatch(&center, cli.command, &out).await.map_err(|err| {
        match err.downcast_ref::<CenterError>().map(CenterError::kind) {
            Some(kind) => err.context(kind.to_string()),
            None => err,
        }
    })
}

/// File settings first, then flags and env vars on top.
fn load_config(cli: &Cli) -> anyhow::Result<CenterConfig> {
    let mut config = match &cli.config {
        Some(path) => CenterConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CenterConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(owner) = &cli.owner {
        config.owner = Address::new(owner.as_str());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

async fn dispatch(center: &Center, command: Command, out: &Output) -> anyhow::Result<()> {
    let now = center.now();
    match command {
        Command::System { action } => match action {
            SystemAction::Add { owner, address } => {
                let receipt = center.add_system(&owner.address(), Address::new(address))?;
                out.receipt(&receipt, |added| {
                    let text = if *added { "system added" } else { "system already added" };
                    text.to_string()
                })
            }
            SystemAction::Check { address } => {
                let added = center.is_added_system(&Address::new(address));
                out.value(&added, || added.to_string())
            }
            SystemAction::List => {
                let systems = center.systems();
                out.value(&systems, || {
                    lines(systems.iter().map(|s| format!("{} added {}", s.address, s.added_at)))
                })
            }
        },

        Command::User { action } => match action {
            UserAction::Create { system, address } => {
                let receipt = center.create_user(&Address::new(system), Address::new(address))?;
                out.receipt(&receipt, |group| format!("personal group {group}"))
            }
            UserAction::Show { address } => {
                let user = center.get_user(&Address::new(address))?;
                out.value(&user, || {
                    format!(
                        "{} (system {}, personal group {}, {} blacklisted, {} whitelisted)",
                        user.address,
                        user.system,
                        user.personal_group,
                        user.blacklist.len(),
                        user.whitelist.len()
                    )
                })
            }
        },

        Command::Group { action } => group(center, action, out),
        Command::Share { action } => share(center, action, now, out),
        Command::Request { action } => request(center, action, now, out),

        Command::Blacklist { action } => {
            let receipt = match action {
                BlacklistAction::Add { caller, target } => match target {
                    BlacklistTarget { user: Some(user), .. } => {
                        center.blacklist_user(&caller.caller(), &Address::new(user))?
                    }
                    BlacklistTarget { group: Some(group), .. } => {
                        center.blacklist_group(&caller.caller(), group)?
                    }
                    BlacklistTarget { .. } => anyhow::bail!("pass --user or --group"),
                },
                BlacklistAction::Remove { caller, target } => match target {
                    BlacklistTarget { user: Some(user), .. } => {
                        center.unblacklist_user(&caller.caller(), &Address::new(user))?
                    }
                    BlacklistTarget { group: Some(group), .. } => {
                        center.unblacklist_group(&caller.caller(), group)?
                    }
                    BlacklistTarget { .. } => anyhow::bail!("pass --user or --group"),
                },
            };
            out.receipt(&receipt, changed)
        }

        Command::Whitelist { action } => {
            let receipt = match action {
                WhitelistAction::Add { caller, user } => {
                    center.whitelist_user(&caller.caller(), &Address::new(user))?
                }
                WhitelistAction::Remove { caller, user } => {
                    center.unwhitelist_user(&caller.caller(), &Address::new(user))?
                }
            };
            out.receipt(&receipt, changed)
        }

        Command::Events { from, limit, follow } => {
            let mut next = from;
            for record in center.events_from(from, limit)? {
                next = record.seq + 1;
                out.event(&record)?;
            }
            if follow {
                follow_events(center, next, out).await?;
            }
            Ok(())
        }

        Command::Check => {
            let report = check_integrity(center.store().env())?;
            if !report.is_healthy() {
                tracing::warn!(errors = report.errors.len(), "integrity check found problems");
            }
            out.value(&report, || {
                let mut text = format!(
                    "{} databases, {} entries",
                    report.databases_checked, report.total_entries
                );
                for error in &report.errors {
                    text.push_str(&format!("\nerror: {error}"));
                }
                text
            })
        }

        Command::Stats => {
            let stats = center.stats()?;
            out.value(&stats, || {
                format!(
                    "owner {}\nsystems {}\nusers {}\ngroups {}\nshares {}\nrequests {}\nlast event {}",
                    stats.owner,
                    stats.systems,
                    stats.users,
                    stats.groups,
                    stats.shares,
                    stats.requests,
                    stats.last_event_seq
                )
            })
        }
    }
}

fn group(center: &Center, action: GroupAction, out: &Output) -> anyhow::Result<()> {
    match action {
        GroupAction::Create { caller } => {
            let receipt = center.create_group(&caller.caller())?;
            out.receipt(&receipt, |group| format!("group {group}"))
        }
        GroupAction::AddUser { caller, group, user } => {
            let receipt = center.add_user_to_group(&caller.caller(), group, &Address::new(user))?;
            out.receipt(&receipt, changed)
        }
        GroupAction::RemoveUser { caller, group, user } => {
            let receipt =
                center.remove_user_from_group(&caller.caller(), group, &Address::new(user))?;
            out.receipt(&receipt, done)
        }
        GroupAction::AddWriter { caller, group, user } => {
            let receipt = center.add_writer(&caller.caller(), group, &Address::new(user))?;
            out.receipt(&receipt, changed)
        }
        GroupAction::RevokeWriter { caller, group, user } => {
            let receipt = center.revoke_writer(&caller.caller(), group, &Address::new(user))?;
            out.receipt(&receipt, done)
        }
        GroupAction::Link { caller, parent, child } => {
            let receipt = center.add_group_to_group(&caller.caller(), parent, child)?;
            out.receipt(&receipt, done)
        }
        GroupAction::Unlink { caller, parent, child } => {
            let receipt = center.remove_group_from_group(&caller.caller(), parent, child)?;
            out.receipt(&receipt, done)
        }
        GroupAction::ShareWith { caller, group, peer } => {
            let receipt = center.add_share_group(&caller.caller(), group, peer)?;
            out.receipt(&receipt, changed)
        }
        GroupAction::Unshare { caller, group, peer } => {
            let receipt = center.remove_share_group(&caller.caller(), group, peer)?;
            out.receipt(&receipt, done)
        }
        GroupAction::Show { group } => {
            let record = center.get_group(group)?;
            out.value(&record, || {
                format!(
                    "group {} owned by {}{}\nmembers {:?}\nwriters {:?}\nparents {:?}\nsubgroups {:?}\nshare groups {:?}\npending parents {:?}\npending subgroups {:?}",
                    record.id,
                    record.owner,
                    if record.personal { " (personal)" } else { "" },
                    record.members,
                    record.writers,
                    record.parents,
                    record.subgroups,
                    record.share_groups(),
                    record.pending_parents,
                    record.pending_subgroups
                )
            })
        }
        GroupAction::List { user } => {
            let groups = center.get_group_ids(&Address::new(user))?;
            out.value(&groups, || lines(groups.iter().map(|g| format!("group {g}"))))
        }
    }
}

fn share(center: &Center, action: ShareAction, now: Timestamp, out: &Output) -> anyhow::Result<()> {
    match action {
        ShareAction::Add {
            caller,
            uri,
            groups,
            expiry,
        } => {
            let receipt = center.create_share(
                &caller.caller(),
                &uri,
                &groups,
                expiry.lifetime(now),
                expiry.access(),
            )?;
            out.receipt(&receipt, |ids| {
                lines(ids.iter().map(|id| format!("share {id}")))
            })
        }
        ShareAction::Delete { caller, share } => {
            let receipt = center.delete_share(&caller.caller(), share)?;
            out.receipt(&receipt, done)
        }
        ShareAction::List { group } => {
            let shares = center.get_shares(group)?;
            out.value(&shares, || lines(shares.iter().map(|s| share_line(s, now))))
        }
        ShareAction::All { user } => {
            let visible = center.get_all_shares(&Address::new(user))?;
            out.value(&visible, || {
                lines(visible.iter().map(|(group, shares)| {
                    let body = lines(shares.iter().map(|s| format!("  {}", share_line(s, now))));
                    format!("group {group}\n{body}")
                }))
            })
        }
        ShareAction::Purge { owner } => {
            let receipt = center.purge_expired(&owner.address())?;
            out.receipt(&receipt, |ids| format!("purged {} expired shares", ids.len()))
        }
    }
}

fn request(
    center: &Center,
    action: RequestAction,
    now: Timestamp,
    out: &Output,
) -> anyhow::Result<()> {
    match action {
        RequestAction::Join { caller, child, parent } => {
            let receipt = center.request_join(&caller.caller(), child, parent)?;
            out.receipt(&receipt, proposed)
        }
        RequestAction::Invite { caller, parent, child } => {
            let receipt = center.invite_group(&caller.caller(), parent, child)?;
            out.receipt(&receipt, proposed)
        }
        RequestAction::Share {
            caller,
            from_group,
            to_user,
            uri,
            expiry,
        } => {
            let receipt = center.request_share(
                &caller.caller(),
                from_group,
                &Address::new(to_user),
                &uri,
                expiry.lifetime(now),
                expiry.access(),
            )?;
            out.receipt(&receipt, proposed)
        }
        RequestAction::Accept {
            caller,
            request,
            groups,
        } => {
            let caller = caller.caller();
            let receipt = if groups.is_empty() {
                center.accept_request(&caller, request)?
            } else {
                center
                    .accept_share_request(&caller, request, &groups)?
                    .map(Accepted::Shares)
            };
            out.receipt(&receipt, |accepted| match accepted {
                Accepted::Linked { parent, child } => format!("group {child} is now under {parent}"),
                Accepted::Shares(ids) => lines(ids.iter().map(|id| format!("share {id}"))),
            })
        }
        RequestAction::Reject { caller, request } => {
            let receipt = center.reject_request(&caller.caller(), request)?;
            out.receipt(&receipt, done)
        }
        RequestAction::Withdraw { caller, request } => {
            let receipt = center.withdraw_request(&caller.caller(), request)?;
            out.receipt(&receipt, done)
        }
        RequestAction::List { user } => {
            let user = Address::new(user);
            let incoming = center.get_incoming_requests(&user)?;
            let outgoing = center.get_outgoing_requests(&user)?;
            let listing = json!({ "incoming": incoming, "outgoing": outgoing });
            out.value(&listing, || {
                let describe = |r: &sharecenter_store::RequestRecord| {
                    format!("  request {} {} from {}", r.id, r.kind.request_type(), r.proposer)
                };
                format!(
                    "incoming\n{}\noutgoing\n{}",
                    lines(incoming.iter().map(describe)),
                    lines(outgoing.iter().map(describe))
                )
            })
        }
    }
}

/// Poll the log for new events until interrupted.
async fn follow_events(center: &Center, mut next: u64, out: &Output) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for record in center.events_from(next, FOLLOW_PAGE)? {
                    next = record.seq + 1;
                    out.event(&record)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(next, "stopped following events");
                return Ok(());
            }
        }
    }
}

fn share_line(share: &ShareRecord, now: Timestamp) -> String {
    let lifetime = match share.expiry {
        Expiry::Indefinite => "indefinite".to_string(),
        Expiry::At(_) if share.expiry.is_expired(now) => "expired".to_string(),
        expiry => match expiry.remaining(now) {
            Some(secs) => format!("expires in {}", format_duration(secs)),
            None => "indefinite".to_string(),
        },
    };
    format!(
        "share {} {} {} ({lifetime})",
        share.id, share.uri, share.access
    )
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}

fn changed(changed: &bool) -> String {
    let text = if *changed { "ok" } else { "unchanged" };
    text.to_string()
}

fn done(_: &()) -> String {
    "ok".to_string()
}

fn proposed(id: &Option<sharecenter_types::RequestId>) -> String {
    match id {
        Some(id) => format!("request {id}"),
        None => "blocked".to_string(),
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn value<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human());
        }
        Ok(())
    }

    fn receipt<T: Serialize>(
        &self,
        receipt: &Receipt<T>,
        human: impl FnOnce(&T) -> String,
    ) -> anyhow::Result<()> {
        if self.json {
            let body = json!({ "value": receipt.value, "events": receipt.events });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            println!("{}", human(&receipt.value));
            for record in &receipt.events {
                println!("  event {} {}", record.seq, record.event.name());
            }
        }
        Ok(())
    }

    fn event(&self, record: &EventRecord) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!(
                "{} {} {} {}",
                record.seq,
                record.at,
                record.event.name(),
                serde_json::to_string(&record.event)?
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &std::path::Path) -> Center {
        let env = LmdbEnvironment::open(dir, 16 * 1024 * 1024).unwrap();
        ShareCenter::open(env, Address::new("0xowner")).unwrap()
    }

    fn run(center: &Center, argv: &[&str]) -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(argv).unwrap();
        let out = Output { json: true };
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(dispatch(center, cli.command, &out))
    }

    #[test]
    fn owner_commands_refuse_other_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let center = open(dir.path());

        let err = run(&center, &["sharecenter", "system", "add", "--as-owner", "0xmallory", "0xsys"])
            .unwrap_err();
        let kind = err.downcast_ref::<CenterError>().map(CenterError::kind);
        assert_eq!(kind, Some(sharecenter_types::ErrorKind::IsNotOwner));
        assert!(!center.is_added_system(&Address::new("0xsys")));

        let err = run(&center, &["sharecenter", "share", "purge", "--as-owner", "0xmallory"])
            .unwrap_err();
        let kind = err.downcast_ref::<CenterError>().map(CenterError::kind);
        assert_eq!(kind, Some(sharecenter_types::ErrorKind::IsNotOwner));

        run(&center, &["sharecenter", "system", "add", "--as-owner", "0xowner", "0xsys"]).unwrap();
        assert!(center.is_added_system(&Address::new("0xsys")));
    }
}
