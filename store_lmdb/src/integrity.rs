//! LMDB database integrity checks.
//!
//! Used by the `check` command to spot a damaged data directory before a
//! center loads its ledger from it.

use std::path::Path;
use std::sync::Arc;

use heed::Env;
use serde::Serialize;

use crate::environment::DATABASE_NAMES;
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Opens each expected database and attempts to count entries. Read
/// failures are recorded in the report rather than causing a hard error.
pub fn check_integrity(env: &Arc<Env>) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport {
        databases_checked: 0,
        total_entries: 0,
        errors: Vec::new(),
    };

    let rtxn = env.read_txn()?;

    for &db_name in DATABASE_NAMES {
        match env.open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    Ok(report)
}

/// Check that `path` is either fresh (missing or empty) or holds an LMDB
/// data file.
pub fn check_data_dir(path: &Path) -> Result<(), LmdbError> {
    if !path.exists() || path.read_dir()?.next().is_none() {
        return Ok(());
    }
    if !path.join("data.mdb").exists() {
        return Err(LmdbError::NotFound(format!(
            "data.mdb in non-empty directory {}",
            path.display()
        )));
    }
    Ok(())
}
