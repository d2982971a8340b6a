//! Hash-chained JSON-lines journal.
//!
//! One [`JournalEntry`] per line. Opening or loading a journal verifies
//! sequence numbers and the hash chain from the first line on; any break is
//! reported as [`StorageError::Corrupt`] rather than skipped.
//!
//! A store holds an exclusive lock on `<journal>.lock` for its lifetime, so
//! only one process appends to a journal at a time. An unterminated final
//! line is the remains of an interrupted append and is cut off on open.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracker_core::LedgerEvent;

use crate::error::StorageError;
use crate::record::{JournalEntry, GENESIS_HASH};
use crate::traits::LedgerStore;

/// Sequence number and hash of the last entry on disk.
#[derive(Debug)]
struct Head {
    seq: u64,
    hash: String,
}

#[derive(Debug)]
pub struct JournalStore {
    path: PathBuf,
    head: Mutex<Head>,
    /// Held for the lock; released when the store is dropped.
    _lock: File,
}

impl JournalStore {
    /// Open a journal, creating an empty one if the file does not exist.
    ///
    /// Fails with [`StorageError::Locked`] while another store has the same
    /// journal open.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let lock = acquire_lock(&path)?;
        truncate_torn_tail(&path).await?;
        let entries = read_entries(&path).await?;
        let head = match entries.last() {
            Some(last) => Head {
                seq: last.seq,
                hash: last.hash.clone(),
            },
            None => Head {
                seq: 0,
                hash: GENESIS_HASH.to_string(),
            },
        };
        tracing::debug!(path = %path.display(), entries = head.seq, "journal opened");
        Ok(JournalStore {
            path,
            head: Mutex::new(head),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and verify every entry, including chain metadata.
    pub async fn entries(&self) -> Result<Vec<JournalEntry>, StorageError> {
        read_entries(&self.path).await
    }
}

#[async_trait]
impl LedgerStore for JournalStore {
    async fn load(&self) -> Result<Vec<LedgerEvent>, StorageError> {
        let entries = read_entries(&self.path).await?;
        Ok(entries.into_iter().map(|e| e.event).collect())
    }

    async fn append(&self, event: &LedgerEvent) -> Result<(), StorageError> {
        let mut head = self.head.lock().await;
        let entry = JournalEntry::seal(head.seq + 1, &head.hash, event.clone())?;
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let prev_len = file.metadata().await?.len();
        if let Err(e) = write_line(&mut file, &line).await {
            rollback(&file, prev_len).await.map_err(|rollback_err| {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback_err,
                    "failed to roll back journal after a failed append"
                );
                StorageError::Backend(format!(
                    "append failed ({}) and the journal could not be rolled back ({})",
                    e, rollback_err
                ))
            })?;
            return Err(e.into());
        }

        head.seq = entry.seq;
        head.hash = entry.hash;
        Ok(())
    }

    async fn event_count(&self) -> Result<usize, StorageError> {
        Ok(self.head.lock().await.seq as usize)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn acquire_lock(path: &Path) -> Result<File, StorageError> {
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))?;

    use fs2::FileExt;
    match FileExt::try_lock_exclusive(&lock_file) {
        Ok(()) => Ok(lock_file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(StorageError::Locked {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_line(file: &mut tokio::fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.sync_data().await
}

/// Cut the file back to `len` bytes, dropping a partially or fully written
/// entry that was never acknowledged.
async fn rollback(file: &tokio::fs::File, len: u64) -> std::io::Result<()> {
    file.set_len(len).await?;
    file.sync_data().await
}

/// Drop bytes after the last newline. Every acknowledged entry ends with
/// one, so anything after it is an append that never completed.
async fn truncate_torn_tail(path: &Path) -> Result<(), StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if bytes.is_empty() || bytes.ends_with(b"\n") {
        return Ok(());
    }

    let keep = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    tracing::warn!(
        path = %path.display(),
        dropped_bytes = bytes.len() - keep,
        "truncating unterminated journal tail"
    );
    let file = OpenOptions::new().write(true).open(path).await?;
    rollback(&file, keep as u64).await?;
    Ok(())
}

async fn read_entries(path: &Path) -> Result<Vec<JournalEntry>, StorageError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries: Vec<JournalEntry> = Vec::new();
    let mut prev_hash = GENESIS_HASH.to_string();
    for (idx, raw) in contents.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let entry: JournalEntry =
            serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
                line,
                reason: format!("invalid entry: {}", e),
            })?;

        let expected_seq = entries.len() as u64 + 1;
        if entry.seq != expected_seq {
            return Err(StorageError::Corrupt {
                line,
                reason: format!("expected seq {}, found {}", expected_seq, entry.seq),
            });
        }
        if entry.prev_hash != prev_hash {
            return Err(StorageError::Corrupt {
                line,
                reason: "prev_hash does not match preceding entry".to_string(),
            });
        }
        if !entry.verify()? {
            return Err(StorageError::Corrupt {
                line,
                reason: "hash mismatch".to_string(),
            });
        }
        prev_hash = entry.hash.clone();
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracker_core::{Actor, ManualClock, NewProduce, NewUpdate, Registry, StageStatus};

    use super::*;
    use crate::conformance::run_conformance_suite;

    fn events() -> Vec<LedgerEvent> {
        let actor = Actor::new("farm:a").unwrap();
        let mut reg = Registry::with_clock(ManualClock::new(1_700_000_000));
        let mut out = Vec::new();
        let event = reg
            .prepare_registration(&actor, NewProduce::new("Mango", "India", 100, "12.9,77.6"))
            .unwrap();
        reg.apply(event.clone()).unwrap();
        out.push(event);
        let event = reg
            .prepare_update(&actor, 1, NewUpdate::new(StageStatus::Distributor, "shipped", "13.0,80.2"))
            .unwrap();
        reg.apply(event.clone()).unwrap();
        out.push(event);
        out
    }

    #[tokio::test]
    async fn journal_store_conformance() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicUsize::new(0);
        let report = run_conformance_suite(|| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let path = dir.path().join(format!("journal-{n}.jsonl"));
            async move { JournalStore::open(path).await.unwrap() }
        })
        .await;
        assert!(report.failed == 0, "{report}");
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JournalStore::open(dir.path().join("nested/ledger.jsonl"))
            .await
            .unwrap();
        assert_eq!(store.event_count().await.unwrap(), 0);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_are_chained() {
        let dir = tempfile::tempdir().unwrap();
        let store = JournalStore::open(dir.path().join("ledger.jsonl")).await.unwrap();
        for event in events() {
            store.append(&event).await.unwrap();
        }
        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].seq, 1);
        assert_eq!(entries[0].prev_hash, GENESIS_HASH);
        assert_eq!(entries[1].prev_hash, entries[0].hash);
        assert_eq!(entries[0].hash.len(), 64);
    }

    #[tokio::test]
    async fn reopen_continues_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut all = events();
        let second = all.pop().unwrap();

        let store = JournalStore::open(&path).await.unwrap();
        store.append(&all[0]).await.unwrap();
        drop(store);

        let store = JournalStore::open(&path).await.unwrap();
        assert_eq!(store.event_count().await.unwrap(), 1);
        store.append(&second).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![all[0].clone(), second]);
    }

    #[tokio::test]
    async fn tampered_event_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let store = JournalStore::open(&path).await.unwrap();
        for event in events() {
            store.append(&event).await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replace("shipped", "stolen")).unwrap();

        match store.load().await {
            Err(StorageError::Corrupt { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("hash mismatch"), "{reason}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
        drop(store);
        assert!(matches!(
            JournalStore::open(&path).await,
            Err(StorageError::Corrupt { line: 2, .. })
        ));
    }

    #[tokio::test]
    async fn dropped_line_breaks_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let store = JournalStore::open(&path).await.unwrap();
        for event in events() {
            store.append(&event).await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let second_only: String = contents.lines().skip(1).map(|l| format!("{l}\n")).collect();
        std::fs::write(&path, second_only).unwrap();

        match store.load().await {
            Err(StorageError::Corrupt { line: 1, reason }) => {
                assert!(reason.contains("expected seq 1"), "{reason}");
            }
            other => panic!("expected Corrupt at line 1, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_line_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "{not json\n").unwrap();
        assert!(matches!(
            JournalStore::open(&path).await,
            Err(StorageError::Corrupt { line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn second_open_of_same_journal_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let first = JournalStore::open(&path).await.unwrap();

        match JournalStore::open(&path).await {
            Err(StorageError::Locked { path: locked }) => assert_eq!(locked, path),
            other => panic!("expected Locked, got {other:?}"),
        }

        // The first store keeps a consistent chain.
        for event in events() {
            first.append(&event).await.unwrap();
        }
        drop(first);
        let reopened = JournalStore::open(&path).await.unwrap();
        assert_eq!(reopened.event_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn two_ledgers_cannot_share_a_journal() {
        use crate::Ledger;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let clock = ManualClock::new(1_700_000_000);
        let server = Ledger::open(JournalStore::open(&path).await.unwrap(), clock.clone())
            .await
            .unwrap();
        assert!(JournalStore::open(&path).await.is_err());

        let actor = Actor::new("farm:a").unwrap();
        let id = server
            .register_produce(&actor, NewProduce::new("Mango", "India", 100, ""))
            .await
            .unwrap();
        assert_eq!(id, 1);
        drop(server);

        let cli = Ledger::open(JournalStore::open(&path).await.unwrap(), clock)
            .await
            .unwrap();
        let id = cli
            .register_produce(&actor, NewProduce::new("Kiwi", "Chile", 40, ""))
            .await
            .unwrap();
        assert_eq!(id, 2);
    }

    #[tokio::test]
    async fn torn_tail_is_truncated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut all = events();
        let second = all.pop().unwrap();
        {
            let store = JournalStore::open(&path).await.unwrap();
            store.append(&all[0]).await.unwrap();
        }
        let committed = std::fs::read(&path).unwrap();
        let mut torn = committed.clone();
        torn.extend_from_slice(br#"{"seq":2,"prev_hash":"ab"#);
        std::fs::write(&path, &torn).unwrap();

        let store = JournalStore::open(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), committed);
        assert_eq!(store.event_count().await.unwrap(), 1);

        store.append(&second).await.unwrap();
        drop(store);
        let store = JournalStore::open(&path).await.unwrap();
        assert_eq!(store.load().await.unwrap(), vec![all[0].clone(), second]);
    }

    #[tokio::test]
    async fn unterminated_complete_entry_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        {
            let store = JournalStore::open(&path).await.unwrap();
            store.append(&events()[0]).await.unwrap();
        }
        // A full line whose trailing newline never reached the disk was not
        // acknowledged, so it must not be replayed.
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.trim_end_matches('\n')).unwrap();

        let store = JournalStore::open(&path).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn rollback_removes_unacknowledged_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let store = JournalStore::open(&path).await.unwrap();
        let all = events();
        store.append(&all[0]).await.unwrap();
        let prev_len = std::fs::metadata(&path).unwrap().len();

        // Simulate an append whose sync failed after the bytes landed.
        let entry = JournalEntry::seal(2, "whatever", all[1].clone()).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).await.unwrap();
        let mut line = serde_json::to_vec(&entry).unwrap();
        line.push(b'\n');
        write_line(&mut file, &line).await.unwrap();
        rollback(&file, prev_len).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![all[0].clone()]);
        store.append(&all[1]).await.unwrap();
        assert_eq!(store.entries().await.unwrap().len(), 2);
    }
}
