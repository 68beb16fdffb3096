//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use sharecenter_store::{CenterStore, ChangeSet, StoreError};

use crate::migration::Migrator;
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Names of every database in a ShareCenter environment.
pub const DATABASE_NAMES: &[&str] = &[
    "systems", "users", "groups", "shares", "requests", "events", "meta",
];

/// Number of named databases the environment must allow.
const MAX_DBS: u32 = 16;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    pub(crate) systems_db: Database<Bytes, Bytes>,
    pub(crate) users_db: Database<Bytes, Bytes>,
    pub(crate) groups_db: Database<Bytes, Bytes>,
    pub(crate) shares_db: Database<Bytes, Bytes>,
    pub(crate) requests_db: Database<Bytes, Bytes>,
    pub(crate) events_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, creates missing databases and runs
    /// schema migrations.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never modified outside of heed transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let systems_db = env.create_database(&mut wtxn, Some("systems"))?;
        let users_db = env.create_database(&mut wtxn, Some("users"))?;
        let groups_db = env.create_database(&mut wtxn, Some("groups"))?;
        let shares_db = env.create_database(&mut wtxn, Some("shares"))?;
        let requests_db = env.create_database(&mut wtxn, Some("requests"))?;
        let events_db = env.create_database(&mut wtxn, Some("events"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            systems_db,
            users_db,
            groups_db,
            shares_db,
            requests_db,
            events_db,
            meta_db,
        };
        Migrator::run(&environment)?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    /// The underlying heed environment.
    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Begin a write batch; nothing is visible until [`WriteBatch::commit`].
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }
}

impl CenterStore for LmdbEnvironment {
    fn commit(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.apply(changes)?;
        batch.commit()
    }
}
