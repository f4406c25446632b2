//! Recursive archive scanning.
//!
//! An [`Indexer`] walks a directory for `.jar`/`.war` files and scans each
//! one: it refreshes the archive record, drops the classes recorded by the
//! previous scan, registers every top-level class entry and recurses into
//! nested archives. Nested archives are written to a staging directory for
//! the duration of their own scan and get their own record, linked to the
//! containing archive through `parent_id`. Nested records the new scan did
//! not reach are deleted along with their classes.

use memmap2::Mmap;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::catalog::{class_file_to_name, classify_entry, entry_base_name};
use crate::error::{IndexError, Result};
use crate::scan::find_archives;
use crate::store::IndexStore;

pub const DEFAULT_MAX_DEPTH: usize = 16;
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 512 * 1024 * 1024;

type JarArchive = ZipArchive<Cursor<Mmap>>;

/// Bounds applied to nested archives. A nested entry past either bound is
/// skipped with a warning; its parent is still indexed.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub max_depth: usize,
    pub max_entry_bytes: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct IndexSummary {
    pub root: String,
    pub discovered: usize,
    pub processed: usize,
    pub failed: usize,
    pub classes: usize,
}

/// Receives directory scan progress. Every method defaults to a no-op.
pub trait ScanProgress {
    fn on_start(&self, _total: usize) {}

    /// Called once per top-level archive, after its scan finished.
    fn on_archive(&self, _path: &Path, _outcome: &Result<usize>) {}

    fn on_finish(&self, _summary: &IndexSummary) {}
}

impl ScanProgress for () {}

pub struct Indexer<'a> {
    store: &'a IndexStore,
    limits: ScanLimits,
    staging_root: PathBuf,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a IndexStore) -> Self {
        Self {
            store,
            limits: ScanLimits::default(),
            staging_root: default_staging_root(),
        }
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_staging_root(mut self, staging_root: PathBuf) -> Self {
        self.staging_root = staging_root;
        self
    }

    pub fn scan_directory(&self, root: &Path, recursive: bool) -> Result<IndexSummary> {
        self.scan_directory_with(root, recursive, &())
    }

    /// Scans every archive under `root`. A failing archive is logged and
    /// counted in `failed`; only a missing root aborts the walk.
    pub fn scan_directory_with(
        &self,
        root: &Path,
        recursive: bool,
        progress: &dyn ScanProgress,
    ) -> Result<IndexSummary> {
        let archives = find_archives(root, recursive)?;
        let mut summary = IndexSummary {
            root: root.to_string_lossy().to_string(),
            discovered: archives.len(),
            ..IndexSummary::default()
        };
        progress.on_start(archives.len());

        for path in archives.iter() {
            let outcome = self.scan_at_depth(path, None, 0);
            match &outcome {
                Ok(classes) => {
                    summary.processed += 1;
                    summary.classes += classes;
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(path = %path.display(), error = %err, "failed to index archive");
                }
            }
            progress.on_archive(path, &outcome);
        }

        progress.on_finish(&summary);
        Ok(summary)
    }

    /// Scans one archive and everything nested in it, returning the number
    /// of classes registered. A file that is not a zip container yields 0.
    pub fn scan_archive(&self, path: &Path, parent_id: Option<u64>) -> Result<usize> {
        match self.scan_at_depth(path, parent_id, 0) {
            Err(err @ IndexError::MalformedArchive { .. }) => {
                tracing::warn!(path = %path.display(), error = %err, "not a valid zip container");
                Ok(0)
            }
            outcome => outcome,
        }
    }

    fn scan_at_depth(&self, path: &Path, parent_id: Option<u64>, depth: usize) -> Result<usize> {
        let (archive_id, metadata) = self.record_archive(path, parent_id)?;
        self.scan_contents(path, &metadata, archive_id, depth)
    }

    fn record_archive(&self, path: &Path, parent_id: Option<u64>) -> Result<(u64, fs::Metadata)> {
        let metadata = fs::metadata(path).map_err(|err| not_found_or_io(path, err))?;
        let archive_id =
            self.store
                .upsert_archive(path, modified_epoch_secs(&metadata), parent_id)?;
        Ok((archive_id, metadata))
    }

    /// Re-populates `archive_id` from the file at `path`, then deletes the
    /// nested records left over from the previous scan.
    fn scan_contents(
        &self,
        path: &Path,
        metadata: &fs::Metadata,
        archive_id: u64,
        depth: usize,
    ) -> Result<usize> {
        self.store.clear_classes(archive_id)?;
        let previous_children = self.store.child_archive_ids(archive_id)?;

        let mut seen_children = Vec::new();
        let outcome = self.scan_entries(path, metadata, archive_id, depth, &mut seen_children);

        for stale in previous_children
            .into_iter()
            .filter(|id| !seen_children.contains(id))
        {
            tracing::debug!(archive_id, stale, "dropping nested archive no longer present");
            self.store.delete_archive(stale)?;
        }
        outcome
    }

    fn scan_entries(
        &self,
        path: &Path,
        metadata: &fs::Metadata,
        archive_id: u64,
        depth: usize,
        seen_children: &mut Vec<u64>,
    ) -> Result<usize> {
        let mut archive = open_archive(path, metadata)?;
        tracing::debug!(
            path = %path.display(),
            archive_id,
            depth,
            entries = archive.len(),
            "scanning archive"
        );

        let mut class_count = 0usize;
        for index in 0..archive.len() {
            let name = archive
                .by_index_raw(index)
                .map_err(|source| malformed(path, source))?
                .name()
                .to_string();
            let kind = classify_entry(&name);

            if kind.class {
                self.store
                    .register_class(&class_file_to_name(&name), archive_id)?;
                class_count += 1;
            }
            if kind.nested_archive {
                let (count, child) =
                    self.scan_nested(&mut archive, index, &name, archive_id, depth + 1)?;
                class_count += count;
                seen_children.extend(child);
            }
        }

        Ok(class_count)
    }

    /// Scans one nested entry. Returns its class count and, once a record
    /// exists for it, the nested archive id.
    fn scan_nested(
        &self,
        archive: &mut JarArchive,
        index: usize,
        entry_name: &str,
        parent_id: u64,
        depth: usize,
    ) -> Result<(usize, Option<u64>)> {
        if depth > self.limits.max_depth {
            let err = IndexError::NestingTooDeep {
                path: PathBuf::from(entry_name),
                limit: self.limits.max_depth,
            };
            tracing::warn!(parent_id, error = %err, "skipping nested archive");
            return Ok((0, None));
        }

        let staged = StagedArchive::create(
            &self.staging_root,
            parent_id,
            index,
            entry_base_name(entry_name),
        )?;
        if let Err(err) = self.materialize(archive, index, entry_name, staged.path()) {
            return skip_recoverable(err, parent_id, entry_name).map(|count| (count, None));
        }

        let (child_id, metadata) = self.record_archive(staged.path(), Some(parent_id))?;
        let count = match self.scan_contents(staged.path(), &metadata, child_id, depth) {
            Ok(count) => count,
            Err(err) => skip_recoverable(err, parent_id, entry_name)?,
        };
        Ok((count, Some(child_id)))
    }

    fn materialize(
        &self,
        archive: &mut JarArchive,
        index: usize,
        entry_name: &str,
        target: &Path,
    ) -> Result<()> {
        let limit = self.limits.max_entry_bytes;
        let mut entry = archive
            .by_index(index)
            .map_err(|source| malformed(Path::new(entry_name), source))?;
        let mut file = File::create(target).map_err(|err| IndexError::io(target, err))?;

        let written = io::copy(&mut entry.by_ref().take(limit.saturating_add(1)), &mut file)
            .map_err(|err| IndexError::io(target, err))?;
        if written > limit {
            return Err(IndexError::EntryTooLarge {
                entry: entry_name.to_string(),
                limit,
            });
        }
        Ok(())
    }
}

fn skip_recoverable(err: IndexError, parent_id: u64, entry_name: &str) -> Result<usize> {
    if !err.is_recoverable() {
        return Err(err);
    }
    tracing::warn!(parent_id, entry = entry_name, error = %err, "skipping nested archive");
    Ok(0)
}

pub fn default_staging_root() -> PathBuf {
    std::env::temp_dir().join("jar-index-staging")
}

/// Nested archive bytes on disk, removed when dropped.
///
/// The location is `<root>/<parent id>/<entry index>/<entry file name>`, so
/// the same nested entry lands on the same path (and the same archive record)
/// every time its parent is scanned.
struct StagedArchive {
    dir: PathBuf,
    path: PathBuf,
}

impl StagedArchive {
    fn create(root: &Path, parent_id: u64, index: usize, file_name: &str) -> Result<Self> {
        let dir = root.join(parent_id.to_string()).join(index.to_string());
        if dir.exists()
            && let Err(err) = fs::remove_dir_all(&dir)
        {
            tracing::debug!(
                dir = %dir.display(),
                error = %err,
                "failed to clear stale staging directory"
            );
        }
        fs::create_dir_all(&dir).map_err(|err| IndexError::io(&dir, err))?;
        let path = dir.join(file_name);
        Ok(Self { dir, path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedArchive {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.dir) {
            tracing::debug!(dir = %self.dir.display(), error = %err, "failed to remove staged archive");
        }
        if let Some(parent) = self.dir.parent() {
            let _ = fs::remove_dir(parent);
        }
    }
}

fn open_archive(path: &Path, metadata: &fs::Metadata) -> Result<JarArchive> {
    if metadata.len() == 0 {
        return Err(malformed(path, ZipError::InvalidArchive("empty file")));
    }
    let file = File::open(path).map_err(|err| not_found_or_io(path, err))?;
    // SAFETY: The file is opened read-only and the mapping is owned by the
    // returned archive, so it cannot outlive the file handle's data.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|err| IndexError::io(path, err))?;
    ZipArchive::new(Cursor::new(mmap)).map_err(|source| malformed(path, source))
}

fn malformed(path: &Path, source: ZipError) -> IndexError {
    IndexError::MalformedArchive {
        path: path.to_path_buf(),
        source,
    }
}

fn not_found_or_io(path: &Path, err: io::Error) -> IndexError {
    if err.kind() == io::ErrorKind::NotFound {
        IndexError::NotFound(path.to_path_buf())
    } else {
        IndexError::io(path, err)
    }
}

fn modified_epoch_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, jar_bytes(entries)).unwrap();
    }

    struct Fixture {
        dir: TempDir,
        store: IndexStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = IndexStore::open(dir.path().join("index.lmdb")).unwrap();
            Self { dir, store }
        }

        fn staging(&self) -> PathBuf {
            self.dir.path().join("staging")
        }

        fn indexer(&self) -> Indexer<'_> {
            Indexer::new(&self.store).with_staging_root(self.staging())
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn id(&self, path: &Path) -> u64 {
            self.store.archive_id_for_path(path).unwrap().unwrap()
        }
    }

    #[test]
    fn rescanning_unchanged_archive_is_idempotent() -> Result<()> {
        let fx = Fixture::new();
        let jar = fx.path("lib/demo.jar");
        write_jar(
            &jar,
            &[
                ("org/example/A.class", b""),
                ("org/example/B.class", b""),
                ("org/example/A$1.class", b""),
                ("META-INF/MANIFEST.MF", b""),
            ],
        );

        let indexer = fx.indexer();
        assert_eq!(indexer.scan_archive(&jar, None)?, 2);
        let id = fx.id(&jar);
        assert_eq!(indexer.scan_archive(&jar, None)?, 2);
        assert_eq!(fx.id(&jar), id);
        assert_eq!(
            fx.store.classes_in_archive(id)?,
            vec!["org.example.A", "org.example.B"]
        );
        assert_eq!(fx.store.stats()?.archives, 1);
        Ok(())
    }

    #[test]
    fn rescanning_shrunken_archive_drops_stale_classes() -> Result<()> {
        let fx = Fixture::new();
        let jar = fx.path("demo.jar");
        write_jar(&jar, &[("a/Keep.class", b""), ("a/Gone.class", b"")]);
        let indexer = fx.indexer();
        indexer.scan_archive(&jar, None)?;

        write_jar(&jar, &[("a/Keep.class", b"")]);
        assert_eq!(indexer.scan_archive(&jar, None)?, 1);
        assert_eq!(fx.store.classes_in_archive(fx.id(&jar))?, vec!["a.Keep"]);
        assert!(fx.store.find_archives_for_class("Gone")?.is_empty());
        Ok(())
    }

    #[test]
    fn war_with_embedded_jar_links_nested_record_to_parent() -> Result<()> {
        let fx = Fixture::new();
        let war = fx.path("shop.war");
        let inner = jar_bytes(&[("p/Q.class", b"")]);
        write_jar(
            &war,
            &[
                ("com/shop/Web.class", b""),
                ("WEB-INF/lib/x.jar", inner.as_slice()),
            ],
        );

        assert_eq!(fx.indexer().scan_archive(&war, None)?, 2);

        let war_id = fx.id(&war);
        assert_eq!(fx.store.archive(war_id)?.unwrap().parent_id, None);
        assert_eq!(fx.store.classes_in_archive(war_id)?, vec!["com.shop.Web"]);

        let hits = fx.store.find_archives_for_class("p.Q")?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "x.jar");
        assert_eq!(hits[0].class_name, "p.Q");
        assert_eq!(hits[0].parent_id, Some(war_id));
        assert_eq!(hits[0].parent_filename.as_deref(), Some("shop.war"));
        assert_eq!(fx.store.classes_in_archive(hits[0].archive_id)?, vec!["p.Q"]);
        Ok(())
    }

    #[test]
    fn rescanning_war_without_its_nested_jar_drops_the_nested_record() -> Result<()> {
        let fx = Fixture::new();
        let war = fx.path("shop.war");
        let inner = jar_bytes(&[("p/Gone.class", b"")]);
        write_jar(
            &war,
            &[
                ("w/Web.class", b""),
                ("WEB-INF/lib/a.jar", inner.as_slice()),
            ],
        );
        let indexer = fx.indexer();
        assert_eq!(indexer.scan_archive(&war, None)?, 2);
        assert_eq!(fx.store.stats()?.nested_archives, 1);

        write_jar(&war, &[("w/Web.class", b"")]);
        assert_eq!(indexer.scan_archive(&war, None)?, 1);
        assert!(fx.store.find_archives_for_class("Gone")?.is_empty());
        assert!(fx.store.child_archive_ids(fx.id(&war))?.is_empty());
        let stats = fx.store.stats()?;
        assert_eq!(stats.archives, 1);
        assert_eq!(stats.classes, 1);
        Ok(())
    }

    #[test]
    fn moved_nested_jar_leaves_a_single_record() -> Result<()> {
        let fx = Fixture::new();
        let war = fx.path("shop.war");
        let inner = jar_bytes(&[("p/Q.class", b"")]);
        write_jar(&war, &[("WEB-INF/lib/x.jar", inner.as_slice())]);
        let indexer = fx.indexer();
        indexer.scan_archive(&war, None)?;

        write_jar(
            &war,
            &[
                ("w/A.class", b""),
                ("w/B.class", b""),
                ("WEB-INF/lib/x.jar", inner.as_slice()),
            ],
        );
        assert_eq!(indexer.scan_archive(&war, None)?, 3);
        let hits = fx.store.find_archives_for_class("p.Q")?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].parent_id, Some(fx.id(&war)));
        assert_eq!(fx.store.stats()?.nested_archives, 1);
        Ok(())
    }

    #[test]
    fn corrupt_rescan_of_a_war_drops_its_nested_records() -> Result<()> {
        let fx = Fixture::new();
        let war = fx.path("shop.war");
        let inner = jar_bytes(&[("p/Q.class", b"")]);
        write_jar(&war, &[("WEB-INF/lib/x.jar", inner.as_slice())]);
        let indexer = fx.indexer();
        indexer.scan_archive(&war, None)?;

        fs::write(&war, b"truncated upload").unwrap();
        assert_eq!(indexer.scan_archive(&war, None)?, 0);
        let stats = fx.store.stats()?;
        assert_eq!(stats.archives, 1);
        assert_eq!(stats.classes, 0);
        Ok(())
    }

    #[test]
    fn staged_nested_archives_are_removed_and_reused() -> Result<()> {
        let fx = Fixture::new();
        let war = fx.path("app.war");
        let inner = jar_bytes(&[("p/Q.class", b"")]);
        write_jar(&war, &[("WEB-INF/lib/x.jar", inner.as_slice())]);
        let indexer = fx.indexer();

        indexer.scan_archive(&war, None)?;
        let nested_id = fx.store.find_archives_for_class("p.Q")?[0].archive_id;
        assert_eq!(fs::read_dir(fx.staging()).unwrap().count(), 0);

        indexer.scan_archive(&war, None)?;
        let hits = fx.store.find_archives_for_class("p.Q")?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].archive_id, nested_id);
        assert_eq!(fx.store.stats()?.archives, 2);
        assert_eq!(fs::read_dir(fx.staging()).unwrap().count(), 0);
        Ok(())
    }

    #[test]
    fn nesting_beyond_depth_limit_is_skipped() -> Result<()> {
        let fx = Fixture::new();
        let innermost = jar_bytes(&[("c/C.class", b"")]);
        let middle = jar_bytes(&[("b/B.class", b""), ("lib/c.jar", innermost.as_slice())]);
        let outer = fx.path("outer.jar");
        write_jar(&outer, &[("a/A.class", b""), ("lib/b.jar", middle.as_slice())]);

        let indexer = fx.indexer().with_limits(ScanLimits {
            max_depth: 1,
            ..ScanLimits::default()
        });
        assert_eq!(indexer.scan_archive(&outer, None)?, 2);
        assert_eq!(fx.store.find_class_names("")?, vec!["a.A", "b.B"]);
        Ok(())
    }

    #[test]
    fn oversized_nested_entry_is_skipped() -> Result<()> {
        let fx = Fixture::new();
        let inner = jar_bytes(&[("big/Payload.class", b"")]);
        let outer = fx.path("outer.jar");
        write_jar(&outer, &[("a/A.class", b""), ("lib/big.jar", inner.as_slice())]);

        let indexer = fx.indexer().with_limits(ScanLimits {
            max_entry_bytes: 16,
            ..ScanLimits::default()
        });
        assert_eq!(indexer.scan_archive(&outer, None)?, 1);
        assert_eq!(fx.store.find_class_names("")?, vec!["a.A"]);
        assert_eq!(fs::read_dir(fx.staging()).unwrap().count(), 0);
        Ok(())
    }

    #[test]
    fn malformed_nested_archive_contributes_nothing() -> Result<()> {
        let fx = Fixture::new();
        let outer = fx.path("outer.jar");
        write_jar(
            &outer,
            &[("a/A.class", b""), ("lib/bad.jar", b"definitely not a zip file")],
        );

        assert_eq!(fx.indexer().scan_archive(&outer, None)?, 1);
        let stats = fx.store.stats()?;
        assert_eq!(stats.archives, 2);
        assert_eq!(stats.nested_archives, 1);
        assert_eq!(stats.classes, 1);
        Ok(())
    }

    #[test]
    fn corrupt_top_level_archive_scans_as_zero_classes() -> Result<()> {
        let fx = Fixture::new();
        let jar = fx.path("broken.jar");
        fs::write(&jar, b"this is not a zip container").unwrap();

        assert_eq!(fx.indexer().scan_archive(&jar, None)?, 0);
        assert!(fx.store.archive_id_for_path(&jar)?.is_some());
        Ok(())
    }

    #[test]
    fn missing_archive_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .indexer()
            .scan_archive(&fx.path("missing.jar"), None)
            .unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: RefCell<Vec<String>>,
    }

    impl ScanProgress for RecordingProgress {
        fn on_start(&self, total: usize) {
            self.events.borrow_mut().push(format!("start {total}"));
        }

        fn on_archive(&self, path: &Path, outcome: &Result<usize>) {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let status = if outcome.is_ok() { "ok" } else { "failed" };
            self.events.borrow_mut().push(format!("{name} {status}"));
        }

        fn on_finish(&self, summary: &IndexSummary) {
            self.events
                .borrow_mut()
                .push(format!("finish {}", summary.processed));
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn directory_scan_isolates_corrupt_archives() -> Result<()> {
        let fx = Fixture::new();
        let root = fx.path("repo");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a-corrupt.jar"), b"garbage bytes").unwrap();
        write_jar(&root.join("b-valid.jar"), &[("ok/Valid.class", b"")]);

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let progress = RecordingProgress::default();
        let summary = tracing::subscriber::with_default(subscriber, || {
            fx.indexer().scan_directory_with(&root, true, &progress)
        })?;

        let logged = logs.contents();
        assert!(logged.contains("WARN"), "logs: {logged}");
        assert!(logged.contains("failed to index archive"), "logs: {logged}");
        assert!(logged.contains("a-corrupt.jar"), "logs: {logged}");
        assert!(!logged.contains("b-valid.jar"), "logs: {logged}");
        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.classes, 1);
        assert_eq!(fx.store.find_class_names("Valid")?, vec!["ok.Valid"]);
        assert_eq!(
            progress.events.into_inner(),
            vec![
                "start 2",
                "a-corrupt.jar failed",
                "b-valid.jar ok",
                "finish 1"
            ]
        );
        Ok(())
    }

    #[test]
    fn directory_scan_respects_recursion_flag() -> Result<()> {
        let fx = Fixture::new();
        let root = fx.path("repo");
        write_jar(&root.join("top.jar"), &[("t/Top.class", b"")]);
        write_jar(&root.join("sub/deep.jar"), &[("d/Deep.class", b"")]);

        let summary = fx.indexer().scan_directory(&root, false)?;
        assert_eq!(summary.processed, 1);
        assert_eq!(fx.store.find_class_names("")?, vec!["t.Top"]);

        let summary = fx.indexer().scan_directory(&root, true)?;
        assert_eq!(summary.processed, 2);
        assert_eq!(fx.store.find_class_names("")?, vec!["d.Deep", "t.Top"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn directory_scan_follows_symlinked_archives() -> Result<()> {
        let fx = Fixture::new();
        let real = fx.path("store/real-1.0.jar");
        write_jar(&real, &[("s/Linked.class", b"")]);
        let root = fx.path("repo");
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&real, root.join("real.jar")).unwrap();

        let summary = fx.indexer().scan_directory(&root, true)?;
        assert_eq!(summary.processed, 1);
        let hits = fx.store.find_archives_for_class("Linked")?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "real-1.0.jar");
        Ok(())
    }

    #[test]
    fn directory_scan_requires_existing_root() {
        let fx = Fixture::new();
        let err = fx
            .indexer()
            .scan_directory(&fx.path("nowhere"), true)
            .unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }
}
