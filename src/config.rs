use anyhow::{Context, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::indexer::{ScanLimits, default_staging_root};

pub const DB_ENV_VAR: &str = "JAR_INDEX_DB";
const DB_FILE_NAME: &str = "index.lmdb";

pub fn resolve_db_path(cli: &Cli) -> Result<PathBuf> {
    resolve_db_path_from(cli.db.clone(), env::var_os(DB_ENV_VAR))
}

/// `--db` wins over `JAR_INDEX_DB`, which wins over the per-user default.
pub fn resolve_db_path_from(flag: Option<PathBuf>, env_value: Option<OsString>) -> Result<PathBuf> {
    if let Some(p) = flag {
        return Ok(p);
    }
    if let Some(p) = env_value.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(p));
    }
    Ok(jar_index_home()?.join(DB_FILE_NAME))
}

pub fn resolve_staging_root(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(default_staging_root)
}

pub fn scan_limits(max_depth: usize, max_entry_mb: u64) -> ScanLimits {
    ScanLimits {
        max_depth,
        max_entry_bytes: max_entry_mb.saturating_mul(1024 * 1024),
    }
}

pub fn clear_db(db_path: &Path) -> Result<()> {
    remove_file_if_exists(db_path, "db")?;
    remove_file_if_exists(&lmdb_lock_path(db_path), "db lock")?;
    Ok(())
}

fn jar_index_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("jar-index"))
}

fn lmdb_lock_path(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_os_string();
    os.push("-lock");
    PathBuf::from(os)
}

fn remove_file_if_exists(path: &Path, kind: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {kind} file: {}", path.display()))?;
    }
    Ok(())
}
