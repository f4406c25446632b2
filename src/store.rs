//! Persistent index of archives and the classes they contain.
//!
//! Uses LMDB (via heed) with one environment file holding four named
//! databases:
//!
//! - `archives`: zero-padded archive id -> JSON [`ArchiveRecord`]
//! - `archive_paths`: canonical archive path -> archive id
//! - `classes`: `name \0 id` -> class name (one row per class per archive, name ordered)
//! - `archive_classes`: `id \0 name` -> class name (per-archive view used for clearing)
//!
//! LMDB keys are capped at 511 bytes. A name or path that would not fit is
//! keyed by a truncated prefix plus its SHA-256 digest; the full text always
//! lives in the value (or the archive record).
//!
//! Every public mutation runs in its own write transaction and commits before
//! returning.

use heed::types::Str;
use heed::{Database, Env, EnvFlags, EnvOpenOptions, RoTxn, RwTxn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IndexError, Result};

pub const ARCHIVES_DB: &str = "archives";
pub const ARCHIVE_PATHS_DB: &str = "archive_paths";
pub const CLASSES_DB: &str = "classes";
pub const ARCHIVE_CLASSES_DB: &str = "archive_classes";

const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;
const DEFAULT_MAX_DBS: u32 = 8;
const KEY_SEPARATOR: char = '\0';
const DIGEST_SEPARATOR: char = '\u{1}';
const MAX_KEY_BYTES: usize = 511;
const ID_KEY_BYTES: usize = 20;
const DIGEST_PREFIX_BYTES: usize = 400;

type StrDb = Database<Str, Str>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: u64,
    pub path: String,
    pub filename: String,
    pub parent_id: Option<u64>,
    pub last_modified: i64,
}

/// One (archive, matching class) row of a class lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub archive_id: u64,
    pub path: String,
    pub filename: String,
    pub class_name: String,
    pub parent_id: Option<u64>,
    pub parent_filename: Option<String>,
    pub parent_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub db_path: String,
    pub archives: u64,
    pub nested_archives: u64,
    pub classes: u64,
    pub distinct_classes: u64,
}

#[derive(Debug, Clone)]
pub struct IndexStore {
    env: Arc<Env>,
    db_path: PathBuf,
    archives: StrDb,
    archive_paths: StrDb,
    classes: StrDb,
    archive_classes: StrDb,
}

impl IndexStore {
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| IndexError::StoreOpen {
                path: db_path.clone(),
                source,
            })?;
        }

        let env = open_env(&db_path).map_err(|err| IndexError::StoreOpen {
            path: db_path.clone(),
            source: into_io(err),
        })?;
        let env = Arc::new(env);

        let mut wtxn = env.write_txn()?;
        let archives = env.create_database::<Str, Str>(&mut wtxn, Some(ARCHIVES_DB))?;
        let archive_paths = env.create_database::<Str, Str>(&mut wtxn, Some(ARCHIVE_PATHS_DB))?;
        let classes = env.create_database::<Str, Str>(&mut wtxn, Some(CLASSES_DB))?;
        let archive_classes =
            env.create_database::<Str, Str>(&mut wtxn, Some(ARCHIVE_CLASSES_DB))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            db_path,
            archives,
            archive_paths,
            classes,
            archive_classes,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates or refreshes the record for `path` and returns its id.
    ///
    /// The path is canonicalized first, so different spellings of the same
    /// file share one record. An existing record keeps its id and takes the
    /// new `last_modified` and `parent_id`.
    pub fn upsert_archive(
        &self,
        path: &Path,
        last_modified: i64,
        parent_id: Option<u64>,
    ) -> Result<u64> {
        let path = normalize_path(path)?;
        let path_key = path.to_string_lossy().to_string();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_key.clone());

        let mut wtxn = self.env.write_txn()?;
        if let Some(parent) = parent_id
            && self.archives.get(&wtxn, &id_key(parent))?.is_none()
        {
            return Err(IndexError::UnknownArchive(parent));
        }

        let existing = self
            .archive_paths
            .get(&wtxn, &path_key_for(&path_key))?
            .and_then(parse_id);
        let id = match existing {
            Some(id) => id,
            None => self.next_archive_id(&wtxn)?,
        };

        let record = ArchiveRecord {
            id,
            path: path_key,
            filename,
            parent_id,
            last_modified,
        };
        let payload = serde_json::to_string(&record)?;
        let key = id_key(id);
        self.archives.put(&mut wtxn, &key, &payload)?;
        self.archive_paths
            .put(&mut wtxn, &path_key_for(&record.path), &key)?;
        wtxn.commit()?;
        Ok(id)
    }

    /// Records that `archive_id` contains `name`. Returns `false` when the
    /// pair was already present, in which case nothing is written.
    pub fn register_class(&self, name: &str, archive_id: u64) -> Result<bool> {
        let archive_key = id_key(archive_id);
        let stem = class_stem(name);
        let key = class_key(&stem, &archive_key);

        let mut wtxn = self.env.write_txn()?;
        if self.archives.get(&wtxn, &archive_key)?.is_none() {
            return Err(IndexError::UnknownArchive(archive_id));
        }
        if self.classes.get(&wtxn, &key)?.is_some() {
            return Ok(false);
        }

        self.classes.put(&mut wtxn, &key, name)?;
        self.archive_classes
            .put(&mut wtxn, &owned_class_key(&archive_key, &stem), name)?;
        wtxn.commit()?;
        Ok(true)
    }

    pub fn clear_classes(&self, archive_id: u64) -> Result<usize> {
        let mut wtxn = self.env.write_txn()?;
        let removed = self.clear_classes_in(&mut wtxn, archive_id)?;
        wtxn.commit()?;
        Ok(removed)
    }

    /// Every (archive, class) pair whose class name contains `pattern`,
    /// ignoring ASCII case. Sorted by archive filename.
    pub fn find_archives_for_class(&self, pattern: &str) -> Result<Vec<ArchiveInfo>> {
        let rtxn = self.env.read_txn()?;
        let mut records: HashMap<u64, Option<ArchiveRecord>> = HashMap::new();
        let mut hits = Vec::new();

        for item in self.classes.iter(&rtxn)? {
            let (key, name) = item?;
            let Some(archive_id) = class_key_archive(key) else {
                continue;
            };
            if !contains_ignore_ascii_case(name, pattern) {
                continue;
            }

            let Some(archive) = self.cached_record(&rtxn, &mut records, archive_id)? else {
                continue;
            };
            let parent = match archive.parent_id {
                Some(parent_id) => self.cached_record(&rtxn, &mut records, parent_id)?,
                None => None,
            };

            hits.push(ArchiveInfo {
                archive_id,
                path: archive.path,
                filename: archive.filename,
                class_name: name.to_string(),
                parent_id: archive.parent_id,
                parent_filename: parent.as_ref().map(|p| p.filename.clone()),
                parent_path: parent.map(|p| p.path),
            });
        }

        hits.sort_by(|a, b| {
            a.filename
                .cmp(&b.filename)
                .then_with(|| a.class_name.cmp(&b.class_name))
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(hits)
    }

    /// Distinct class names containing `pattern` (ASCII case-insensitive),
    /// in ascending order.
    pub fn find_class_names(&self, pattern: &str) -> Result<Vec<String>> {
        let rtxn = self.env.read_txn()?;
        let mut names: Vec<String> = Vec::new();

        // Keys sort by name first, so duplicates across archives are adjacent.
        for item in self.classes.iter(&rtxn)? {
            let (_, name) = item?;
            if !contains_ignore_ascii_case(name, pattern) {
                continue;
            }
            if names.last().is_some_and(|last| last == name) {
                continue;
            }
            names.push(name.to_string());
        }
        // Digest-keyed names can sort apart from their full spelling.
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Removes an archive record with its classes and, recursively, every
    /// archive embedded in it.
    pub fn delete_archive(&self, archive_id: u64) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let removed = self.delete_archive_in(&mut wtxn, archive_id)?;
        wtxn.commit()?;
        Ok(removed)
    }

    pub fn archive(&self, archive_id: u64) -> Result<Option<ArchiveRecord>> {
        let rtxn = self.env.read_txn()?;
        self.read_record(&rtxn, archive_id)
    }

    pub fn archive_id_for_path(&self, path: &Path) -> Result<Option<u64>> {
        let path = normalize_path(path)?;
        let rtxn = self.env.read_txn()?;
        Ok(self
            .archive_paths
            .get(&rtxn, &path_key_for(&path.to_string_lossy()))?
            .and_then(parse_id))
    }

    /// Ids of the archives recorded as embedded directly in `archive_id`.
    pub fn child_archive_ids(&self, archive_id: u64) -> Result<Vec<u64>> {
        let rtxn = self.env.read_txn()?;
        self.children_of(&rtxn, archive_id)
    }

    pub fn classes_in_archive(&self, archive_id: u64) -> Result<Vec<String>> {
        let prefix = format!("{}{KEY_SEPARATOR}", id_key(archive_id));
        let rtxn = self.env.read_txn()?;
        let mut names = Vec::new();
        for item in self.archive_classes.prefix_iter(&rtxn, &prefix)? {
            let (_, name) = item?;
            names.push(name.to_string());
        }
        names.sort();
        Ok(names)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let rtxn = self.env.read_txn()?;

        let mut archives = 0u64;
        let mut nested_archives = 0u64;
        for item in self.archives.iter(&rtxn)? {
            let (_, payload) = item?;
            let record: ArchiveRecord = serde_json::from_str(payload)?;
            archives += 1;
            if record.parent_id.is_some() {
                nested_archives += 1;
            }
        }

        let mut classes = 0u64;
        let mut distinct_classes = 0u64;
        let mut previous: Option<String> = None;
        for item in self.classes.iter(&rtxn)? {
            let (_, name) = item?;
            classes += 1;
            if previous.as_deref() != Some(name) {
                distinct_classes += 1;
                previous = Some(name.to_string());
            }
        }

        Ok(IndexStats {
            db_path: self.db_path.to_string_lossy().to_string(),
            archives,
            nested_archives,
            classes,
            distinct_classes,
        })
    }

    fn next_archive_id(&self, txn: &RoTxn<'_>) -> Result<u64> {
        Ok(self
            .archives
            .last(txn)?
            .and_then(|(key, _)| parse_id(key))
            .map_or(1, |id| id + 1))
    }

    fn read_record(&self, txn: &RoTxn<'_>, archive_id: u64) -> Result<Option<ArchiveRecord>> {
        match self.archives.get(txn, &id_key(archive_id))? {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }

    fn cached_record(
        &self,
        txn: &RoTxn<'_>,
        cache: &mut HashMap<u64, Option<ArchiveRecord>>,
        archive_id: u64,
    ) -> Result<Option<ArchiveRecord>> {
        if let Some(hit) = cache.get(&archive_id) {
            return Ok(hit.clone());
        }
        let record = self.read_record(txn, archive_id)?;
        cache.insert(archive_id, record.clone());
        Ok(record)
    }

    fn clear_classes_in(&self, wtxn: &mut RwTxn<'_>, archive_id: u64) -> Result<usize> {
        let archive_key = id_key(archive_id);
        let prefix = format!("{archive_key}{KEY_SEPARATOR}");

        let mut stems = Vec::new();
        for item in self.archive_classes.prefix_iter(wtxn, &prefix)? {
            let (key, _) = item?;
            stems.push(key[prefix.len()..].to_string());
        }

        for stem in stems.iter() {
            self.classes.delete(wtxn, &class_key(stem, &archive_key))?;
            self.archive_classes
                .delete(wtxn, &owned_class_key(&archive_key, stem))?;
        }
        Ok(stems.len())
    }

    fn delete_archive_in(&self, wtxn: &mut RwTxn<'_>, archive_id: u64) -> Result<bool> {
        let Some(record) = self.read_record(wtxn, archive_id)? else {
            return Ok(false);
        };

        // The record goes first so a parent cycle ends at the missing row.
        self.clear_classes_in(wtxn, archive_id)?;
        self.archive_paths.delete(wtxn, &path_key_for(&record.path))?;
        self.archives.delete(wtxn, &id_key(archive_id))?;

        for child in self.children_of(wtxn, archive_id)? {
            self.delete_archive_in(wtxn, child)?;
        }
        Ok(true)
    }

    fn children_of(&self, txn: &RoTxn<'_>, archive_id: u64) -> Result<Vec<u64>> {
        let mut children = Vec::new();
        for item in self.archives.iter(txn)? {
            let (_, payload) = item?;
            let child: ArchiveRecord = serde_json::from_str(payload)?;
            if child.parent_id == Some(archive_id) {
                children.push(child.id);
            }
        }
        Ok(children)
    }
}

/// Absolute canonical form of `path`; paths that do not exist (yet) are
/// made absolute without resolving symlinks.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(p) => Ok(p),
        Err(_) => std::path::absolute(path).map_err(|e| IndexError::io(path, e)),
    }
}

fn open_env(db_path: &Path) -> heed::Result<Env> {
    let mut options = EnvOpenOptions::new();
    options.map_size(DEFAULT_MAP_SIZE);
    options.max_dbs(DEFAULT_MAX_DBS);
    // SAFETY: We do not use NO_LOCK and keep default LMDB locking guarantees.
    // NO_SUB_DIR keeps the store a single file at the --db path.
    unsafe {
        options.flags(EnvFlags::NO_SUB_DIR);
        options.open(db_path)
    }
}

fn into_io(err: heed::Error) -> std::io::Error {
    match err {
        heed::Error::Io(io) => io,
        other => std::io::Error::other(other),
    }
}

fn id_key(id: u64) -> String {
    format!("{id:020}")
}

fn parse_id(key: &str) -> Option<u64> {
    key.parse().ok()
}

/// `value` itself when `reserved` more bytes still fit in a key, otherwise
/// a prefix of it followed by the hex SHA-256 of the whole value.
fn key_stem(value: &str, reserved: usize) -> Cow<'_, str> {
    if value.len() + reserved <= MAX_KEY_BYTES {
        return Cow::Borrowed(value);
    }
    let mut cut = DIGEST_PREFIX_BYTES;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let digest = hex::encode(Sha256::digest(value.as_bytes()));
    Cow::Owned(format!("{}{DIGEST_SEPARATOR}{digest}", &value[..cut]))
}

fn class_stem(name: &str) -> Cow<'_, str> {
    key_stem(name, ID_KEY_BYTES + KEY_SEPARATOR.len_utf8())
}

fn path_key_for(path: &str) -> Cow<'_, str> {
    key_stem(path, 0)
}

fn class_key(stem: &str, archive_key: &str) -> String {
    format!("{stem}{KEY_SEPARATOR}{archive_key}")
}

fn owned_class_key(archive_key: &str, stem: &str) -> String {
    format!("{archive_key}{KEY_SEPARATOR}{stem}")
}

fn class_key_archive(key: &str) -> Option<u64> {
    let (_, archive_key) = key.rsplit_once(KEY_SEPARATOR)?;
    parse_id(archive_key)
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}
