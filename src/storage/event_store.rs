use super::Result;
use crate::event::LogEvent;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const PENDING_EVENTS_FILE: &str = "pending_events.log";
const PENDING_EVENTS_TMP_FILE: &str = "pending_events.log.tmp";

/// Append-only durable store of pending log events, one JSON record per
/// line. A rewrite never leaves a window where the store is missing or
/// half-written: the new contents go to a sibling temp file which is then
/// renamed over the primary.
///
/// The interior mutex serializes appends, reads, and rewrites so that
/// `log()` appends interleave safely with an in-flight upload cycle.
pub struct EventStore {
    path: PathBuf,
    tmp_path: PathBuf,
    lock: Mutex<()>,
}

impl EventStore {
    /// Open (or lay out) the store under `dir`, creating the directory if
    /// needed. The backing file itself is created lazily on first append.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(PENDING_EVENTS_FILE),
            tmp_path: dir.join(PENDING_EVENTS_TMP_FILE),
            lock: Mutex::new(()),
        })
    }

    /// Append one record durably. Errors are surfaced to the caller; the
    /// record is never dropped silently.
    pub async fn append(&self, event: &LogEvent) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(event)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Read every pending record in append order.
    pub async fn read_all(&self) -> Result<Vec<LogEvent>> {
        let _guard = self.lock.lock().await;
        self.read_locked()
    }

    /// Number of parseable pending records.
    pub async fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.read_locked()?.len())
    }

    /// Atomically swap the store contents for `remaining`. Records appended
    /// after the caller's snapshot (the tail beyond `snapshot_len`) are
    /// preserved at the end of the rewritten file.
    pub async fn replace(&self, remaining: &[LogEvent], snapshot_len: usize) -> Result<()> {
        let _guard = self.lock.lock().await;

        let current = self.read_locked()?;
        let tail = current.get(snapshot_len..).unwrap_or(&[]);

        let mut tmp = File::create(&self.tmp_path)?;
        for event in remaining.iter().chain(tail.iter()) {
            let line = serde_json::to_string(event)?;
            writeln!(tmp, "{}", line)?;
        }
        tmp.sync_all()?;

        std::fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    fn read_locked(&self) -> Result<Vec<LogEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut events = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    // A corrupt line must not poison the rest of the store.
                    tracing::warn!(
                        line = line_number + 1,
                        error = %e,
                        "Skipping unparseable pending event record"
                    );
                }
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_event(n: i64) -> LogEvent {
        LogEvent::new(format!("event {}", n), n)
    }

    #[tokio::test]
    async fn test_append_then_read_all_round_trip() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        for n in 0..5 {
            store.append(&make_event(n)).await.unwrap();
        }

        let events = store.read_all().await.unwrap();
        assert_eq!(events.len(), 5);
        for (n, event) in events.iter().enumerate() {
            assert_eq!(event.timestamp_millis, n as i64);
            assert_eq!(event.message, format!("event {}", n));
        }
    }

    #[tokio::test]
    async fn test_read_all_on_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        assert!(store.read_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_swaps_contents() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        for n in 0..4 {
            store.append(&make_event(n)).await.unwrap();
        }

        // Confirm the first two, keep the rest.
        let remaining = vec![make_event(2), make_event(3)];
        store.replace(&remaining, 4).await.unwrap();

        let events = store.read_all().await.unwrap();
        assert_eq!(events, remaining);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replace_preserves_appends_after_snapshot() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        for n in 0..3 {
            store.append(&make_event(n)).await.unwrap();
        }

        // An upload cycle snapshots 3 records, then a concurrent log()
        // lands a fourth before the cycle rewrites the store.
        store.append(&make_event(99)).await.unwrap();

        store.replace(&[make_event(2)], 3).await.unwrap();

        let events = store.read_all().await.unwrap();
        assert_eq!(events, vec![make_event(2), make_event(99)]);
    }

    #[tokio::test]
    async fn test_replace_with_empty_remaining_clears_store() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        for n in 0..3 {
            store.append(&make_event(n)).await.unwrap();
        }

        store.replace(&[], 3).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        // The store file still exists and accepts appends.
        store.append(&make_event(7)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_line_is_skipped() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();

        store.append(&make_event(1)).await.unwrap();

        // Corrupt the file by hand.
        use std::io::Write;
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(PENDING_EVENTS_FILE))
            .unwrap();
        writeln!(file, "not json at all").unwrap();

        store.append(&make_event(2)).await.unwrap();

        let events = store.read_all().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp_millis, 1);
        assert_eq!(events[1].timestamp_millis, 2);
    }
}
