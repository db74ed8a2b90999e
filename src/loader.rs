//! Loading a world database directory into a [`Snapshot`].
//!
//! All tables are applied in file name order, then all logs on top, into one
//! flat key space. A later put replaces an earlier value; a later delete
//! hides it. Files that cannot be read are skipped and recorded in
//! [`LoadStats`].
//!
//! ```rust,no_run
//! use bedrockdb::{DatabaseLoader, Options};
//!
//! # fn main() -> Result<(), bedrockdb::Error> {
//! let snapshot = DatabaseLoader::for_world("worlds/abc123", Options::default()).load()?;
//! for entry in snapshot.structures() {
//!     println!("{} ({} bytes)", entry.parsed_key().display_name(), entry.value.len());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::Options;
use crate::error::{Error, Result};
use crate::key::{is_structure_key, parse_key, ParsedKey};
use crate::sstable::{TableReader, TableSource};
use crate::wal::LogReader;
use crate::write_batch::WriteOp;
use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Name of the database directory inside a world folder
pub const DB_DIR_NAME: &str = "db";

/// A live key/value pair in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Raw key bytes
    pub key: Bytes,
    /// Raw value bytes
    pub value: Bytes,
}

impl Entry {
    /// Classified view of the key
    pub fn parsed_key(&self) -> ParsedKey<'_> {
        parse_key(&self.key)
    }
}

/// Counters collected while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Tables parsed through their index
    pub tables_parsed: usize,
    /// Tables recovered by the raw structure scan
    pub tables_raw_scanned: usize,
    /// Log files replayed
    pub logs_replayed: usize,
    /// Files that could not be read at all
    pub files_skipped: usize,
    /// Data blocks skipped inside otherwise readable tables
    pub blocks_skipped: usize,
    /// Write batches that were cut short or undecodable
    pub damaged_batches: usize,
    /// Put operations applied
    pub puts_applied: usize,
    /// Delete operations applied
    pub deletes_applied: usize,
    /// One message per skipped file or damaged log
    pub warnings: Vec<String>,
}

/// Progress events emitted during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProgress {
    /// Table processing begins
    TablesStarted {
        /// Number of table files found
        total: usize,
    },
    /// One table file was processed (or skipped)
    TableFinished {
        /// One-based position of the file
        index: usize,
        /// Number of table files
        total: usize,
        /// File name
        name: String,
    },
    /// Log replay begins
    LogsStarted {
        /// Number of log files found
        total: usize,
    },
    /// One log file was replayed (or skipped)
    LogFinished {
        /// One-based position of the file
        index: usize,
        /// Number of log files
        total: usize,
        /// File name
        name: String,
    },
    /// The snapshot is complete
    Done {
        /// Live entries in the snapshot
        entries: usize,
        /// Structure template entries among them
        structures: usize,
    },
}

/// Shared flag used to cancel a load between two files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`CancelToken::cancel`] was called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final state of a database directory.
///
/// Holds every live put sorted by key, and the structure template subset.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<Entry>,
    structures: Vec<Entry>,
    stats: LoadStats,
}

impl Snapshot {
    fn from_merged(merged: HashMap<Bytes, Option<Bytes>>, stats: LoadStats) -> Self {
        let mut entries: Vec<Entry> = merged
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| Entry { key, value }))
            .collect();
        entries.sort_unstable_by(|a, b| a.key.cmp(&b.key));

        let structures = entries.iter().filter(|e| is_structure_key(&e.key)).cloned().collect();
        Self { entries, structures, stats }
    }

    /// All live entries, sorted by key bytes
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Structure template entries, sorted by key bytes
    pub fn structures(&self) -> &[Entry] {
        &self.structures
    }

    /// Look up the value of a key
    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.entries
            .binary_search_by(|e| e.key.as_ref().cmp(key))
            .ok()
            .map(|i| &self.entries[i].value)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no live entries remain
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statistics of the load that produced this snapshot
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }
}

/// Reads a database directory without a database engine.
#[derive(Debug, Clone)]
pub struct DatabaseLoader {
    db_dir: PathBuf,
    options: Options,
    cancel: CancelToken,
}

impl DatabaseLoader {
    /// Loader for the database directory itself
    pub fn new<P: AsRef<Path>>(db_dir: P, options: Options) -> Self {
        Self { db_dir: db_dir.as_ref().to_path_buf(), options, cancel: CancelToken::new() }
    }

    /// Loader for `world_dir/db`
    pub fn for_world<P: AsRef<Path>>(world_dir: P, options: Options) -> Self {
        Self::new(world_dir.as_ref().join(DB_DIR_NAME), options)
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this loader's loads
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Database directory being read
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Load the directory.
    pub fn load(&self) -> Result<Snapshot> {
        self.load_with(|_| {})
    }

    /// Load the directory, reporting progress to `observer`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the options are invalid
    /// - [`Error::DirectoryNotFound`] if the directory does not exist
    /// - [`Error::Io`] if the directory cannot be listed
    /// - [`Error::Cancelled`] if the token was cancelled before a file
    pub fn load_with<F>(&self, mut observer: F) -> Result<Snapshot>
    where
        F: FnMut(&LoadProgress),
    {
        self.options.validate()?;
        if !self.db_dir.is_dir() {
            return Err(Error::DirectoryNotFound(self.db_dir.clone()));
        }

        let (tables, logs) = list_files(&self.db_dir)?;
        log::info!(
            "Loading {}: {} tables, {} logs",
            self.db_dir.display(),
            tables.len(),
            logs.len()
        );

        let mut merged: HashMap<Bytes, Option<Bytes>> = HashMap::new();
        let mut stats = LoadStats::default();

        // Step 1: Apply tables in file name order
        observer(&LoadProgress::TablesStarted { total: tables.len() });
        for (i, path) in tables.iter().enumerate() {
            self.check_cancelled()?;
            match TableReader::open(path, &self.options).and_then(|r| r.read_entries()) {
                Ok(contents) => {
                    match contents.source {
                        TableSource::Parsed => stats.tables_parsed += 1,
                        TableSource::RawScan => stats.tables_raw_scanned += 1,
                    }
                    stats.blocks_skipped += contents.blocks_skipped;
                    apply(&mut merged, &mut stats, contents.ops);
                }
                Err(e) => skip_file(&mut stats, path, &e),
            }
            observer(&LoadProgress::TableFinished {
                index: i + 1,
                total: tables.len(),
                name: file_name(path),
            });
        }

        // Step 2: Replay logs on top
        observer(&LoadProgress::LogsStarted { total: logs.len() });
        for (i, path) in logs.iter().enumerate() {
            self.check_cancelled()?;
            match LogReader::open(path, &self.options) {
                Ok(mut reader) => {
                    let contents = reader.read_ops();
                    stats.logs_replayed += 1;
                    stats.damaged_batches += contents.damaged_batches;
                    if contents.stopped_early {
                        stats
                            .warnings
                            .push(format!("{}: log truncated by corruption", path.display()));
                    }
                    apply(&mut merged, &mut stats, contents.ops);
                }
                Err(e) => skip_file(&mut stats, path, &e),
            }
            observer(&LoadProgress::LogFinished {
                index: i + 1,
                total: logs.len(),
                name: file_name(path),
            });
        }

        let snapshot = Snapshot::from_merged(merged, stats);
        log::info!(
            "Loaded {}: {} entries, {} structures ({} files skipped)",
            self.db_dir.display(),
            snapshot.len(),
            snapshot.structures().len(),
            snapshot.stats().files_skipped
        );
        observer(&LoadProgress::Done {
            entries: snapshot.len(),
            structures: snapshot.structures().len(),
        });
        Ok(snapshot)
    }

    /// Run the load on a background thread.
    ///
    /// Progress events arrive on [`LoadHandle::progress`].
    pub fn spawn(self) -> Result<LoadHandle> {
        let (progress_tx, progress_rx) = channel::unbounded();
        let (result_tx, result_rx) = channel::bounded(1);
        let cancel = self.cancel.clone();

        let thread = thread::Builder::new().name("bedrockdb-loader".to_string()).spawn(move || {
            let result = self.load_with(|event| {
                // The receiver may have been dropped; the load still completes.
                let _ = progress_tx.send(event.clone());
            });
            let _ = result_tx.send(result);
        })?;

        Ok(LoadHandle { progress: progress_rx, result: result_rx, cancel, thread })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::info!("Load of {} cancelled", self.db_dir.display());
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Handle to a load running on a background thread.
pub struct LoadHandle {
    progress: Receiver<LoadProgress>,
    result: Receiver<Result<Snapshot>>,
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl LoadHandle {
    /// Progress events, ending with [`LoadProgress::Done`] on success
    pub fn progress(&self) -> &Receiver<LoadProgress> {
        &self.progress
    }

    /// Request cancellation at the next file boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the result for at most `timeout`.
    ///
    /// Returns `None` on timeout; the load keeps running and may be waited
    /// for again. The result is delivered once.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Snapshot>> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(loader_gone())),
        }
    }

    /// Block until the load finishes
    pub fn wait(self) -> Result<Snapshot> {
        let result = self.result.recv().unwrap_or_else(|_| Err(loader_gone()));
        if self.thread.join().is_err() {
            log::warn!("Loader thread panicked");
        }
        result
    }
}

fn loader_gone() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "loader thread exited without a result",
    ))
}

fn apply(merged: &mut HashMap<Bytes, Option<Bytes>>, stats: &mut LoadStats, ops: Vec<WriteOp>) {
    for op in ops {
        match op {
            WriteOp::Put { key, value } => {
                stats.puts_applied += 1;
                merged.insert(key, Some(value));
            }
            WriteOp::Delete { key } => {
                stats.deletes_applied += 1;
                merged.insert(key, None);
            }
        }
    }
}

fn skip_file(stats: &mut LoadStats, path: &Path, err: &Error) {
    log::warn!("Skipping {}: {}", path.display(), err);
    stats.files_skipped += 1;
    stats.warnings.push(format!("{}: {}", path.display(), err));
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Lists table files and log files, each sorted by file name.
fn list_files(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut tables = Vec::new();
    let mut logs = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ldb") | Some("sst") => tables.push(path),
            Some("log") => logs.push(path),
            _ => {}
        }
    }

    tables.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    logs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok((tables, logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{BLOCK_SIZE, HEADER_SIZE};
    use crate::write_batch::WriteBatch;
    use tempfile::TempDir;

    fn log_bytes(batches: &[WriteBatch]) -> Vec<u8> {
        let mut out = Vec::new();
        for batch in batches {
            let data = batch.encode();
            assert!(data.len() + HEADER_SIZE < BLOCK_SIZE);
            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&(data.len() as u16).to_le_bytes());
            out.push(1);
            out.extend_from_slice(&data);
        }
        out
    }

    fn scannable_table(name: &str) -> Vec<u8> {
        let mut data = vec![0xEE; 8];
        data.extend_from_slice(format!("structuretemplate_{}", name).as_bytes());
        data.push(0);
        data.extend_from_slice(&[1, 0, 0, 0, 2, 0, 0, 0, 0x0A, 0x00]);
        data.extend_from_slice(&[0u8; 64]);
        data
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let loader = DatabaseLoader::for_world(dir.path(), Options::default());
        match loader.load() {
            Err(Error::DirectoryNotFound(path)) => assert_eq!(path, dir.path().join("db")),
            other => panic!("unexpected result: {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let snapshot = DatabaseLoader::new(dir.path(), Options::default()).load().unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.structures().is_empty());
    }

    #[test]
    fn test_logs_replayed_in_name_order() {
        let dir = TempDir::new().unwrap();
        let mut first = WriteBatch::new();
        first.put(b"key", b"old");
        first.put(b"other", b"x");
        let mut second = WriteBatch::new();
        second.put(b"key", b"new");
        second.delete(b"other");

        std::fs::write(dir.path().join("000010.log"), log_bytes(&[second])).unwrap();
        std::fs::write(dir.path().join("000002.log"), log_bytes(&[first])).unwrap();

        let snapshot = DatabaseLoader::new(dir.path(), Options::default()).load().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(b"key"), Some(&Bytes::from_static(b"new")));
        assert_eq!(snapshot.get(b"other"), None);
        assert_eq!(snapshot.stats().logs_replayed, 2);
        assert_eq!(snapshot.stats().puts_applied, 3);
        assert_eq!(snapshot.stats().deletes_applied, 1);
    }

    #[test]
    fn test_log_overrides_raw_scanned_table() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("000005.ldb"), scannable_table("a:b")).unwrap();
        let mut batch = WriteBatch::new();
        batch.delete(b"structuretemplate_a:b");
        std::fs::write(dir.path().join("000006.log"), log_bytes(&[batch])).unwrap();

        let snapshot = DatabaseLoader::new(dir.path(), Options::default()).load().unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.stats().tables_raw_scanned, 1);
    }

    #[test]
    fn test_structure_subset() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("000005.ldb"), scannable_table("ns:house")).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"~local_player", b"nbt");
        std::fs::write(dir.path().join("000006.log"), log_bytes(&[batch])).unwrap();
        std::fs::write(dir.path().join("CURRENT"), b"MANIFEST-000001\n").unwrap();

        let snapshot = DatabaseLoader::new(dir.path(), Options::default()).load().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.structures().len(), 1);
        assert_eq!(
            snapshot.structures()[0].parsed_key().structure_id(),
            Some("ns:house")
        );
        assert_eq!(snapshot.structures()[0].value.len(), 10);
    }

    #[test]
    fn test_subdirectories_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("000001.ldb")).unwrap();
        std::fs::write(dir.path().join("000002.ldb"), scannable_table("x:y")).unwrap();

        let snapshot = DatabaseLoader::new(dir.path(), Options::default()).load().unwrap();
        assert_eq!(snapshot.structures().len(), 1);
        assert_eq!(snapshot.stats().files_skipped, 0);
    }

    #[test]
    fn test_cancel_before_first_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("000002.ldb"), scannable_table("x:y")).unwrap();

        let loader = DatabaseLoader::new(dir.path(), Options::default());
        loader.cancel_token().cancel();
        assert!(matches!(loader.load(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_progress_events() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("000002.ldb"), scannable_table("x:y")).unwrap();

        let mut events = Vec::new();
        DatabaseLoader::new(dir.path(), Options::default())
            .load_with(|e| events.push(e.clone()))
            .unwrap();

        assert_eq!(
            events,
            vec![
                LoadProgress::TablesStarted { total: 1 },
                LoadProgress::TableFinished { index: 1, total: 1, name: "000002.ldb".to_string() },
                LoadProgress::LogsStarted { total: 0 },
                LoadProgress::Done { entries: 1, structures: 1 },
            ]
        );
    }

    #[test]
    fn test_spawned_load() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("000002.ldb"), scannable_table("x:y")).unwrap();

        let handle = DatabaseLoader::new(dir.path(), Options::default()).spawn().unwrap();
        let snapshot = handle.wait_timeout(Duration::from_secs(60)).unwrap().unwrap();
        assert_eq!(snapshot.structures().len(), 1);

        let events: Vec<_> = handle.progress().try_iter().collect();
        assert_eq!(events.last(), Some(&LoadProgress::Done { entries: 1, structures: 1 }));
    }

    #[test]
    fn test_spawned_wait() {
        let dir = TempDir::new().unwrap();
        let handle = DatabaseLoader::for_world(dir.path(), Options::default()).spawn().unwrap();
        assert!(matches!(handle.wait(), Err(Error::DirectoryNotFound(_))));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let dir = TempDir::new().unwrap();
        let mut options = Options::default();
        options.max_decompressed_size = 0;
        let result = DatabaseLoader::new(dir.path(), options).load();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
