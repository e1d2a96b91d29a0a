//! Score persistence collaborator
//!
//! The simulation only ever calls `ScoreStore::submit` and moves on.
//! Completion is reported out-of-band through `subscribe` channels.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::highscores::{HighScoreEntry, HighScores};

/// Handle for a submitted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

/// Out-of-band completion report for a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreUpdate {
    /// Accepted; `rank` is None if it didn't make the board
    Stored { id: RecordId, rank: Option<usize> },
    /// Kept in memory but could not be made durable
    Failed { id: RecordId, reason: String },
}

/// High score storage as seen by the game
pub trait ScoreStore {
    /// Whether a score would make the board (answered from the local view)
    fn is_high_score(&self, score: u64) -> bool;

    /// Current board, best first
    fn top_scores(&self) -> Vec<HighScoreEntry>;

    /// Record a finished run. Never blocks on I/O.
    fn submit(&mut self, name: &str, score: u64, level: u32) -> RecordId;

    /// Receive completion reports for later submissions
    fn subscribe(&mut self) -> Receiver<ScoreUpdate>;
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Senders shared between the store and its writer thread
type Subscribers = Arc<Mutex<Vec<Sender<ScoreUpdate>>>>;

/// Send to every subscriber, dropping those whose receiver is gone
fn broadcast(subscribers: &Mutex<Vec<Sender<ScoreUpdate>>>, update: &ScoreUpdate) {
    subscribers.lock().retain(|s| s.send(update.clone()).is_ok());
}

struct PersistJob {
    id: RecordId,
    rank: Option<usize>,
    scores: HighScores,
}

struct Writer {
    jobs: Option<Sender<PersistJob>>,
    handle: Option<JoinHandle<()>>,
}

impl Writer {
    fn spawn(path: PathBuf, subscribers: Subscribers) -> Result<Self, StoreError> {
        let (tx, rx) = unbounded::<PersistJob>();
        let handle = thread::Builder::new()
            .name("score-writer".into())
            .spawn(move || {
                for job in rx.iter() {
                    let update = match write_scores(&path, &job.scores) {
                        Ok(()) => {
                            log::debug!("High scores saved ({} entries)", job.scores.entries.len());
                            ScoreUpdate::Stored {
                                id: job.id,
                                rank: job.rank,
                            }
                        }
                        Err(e) => {
                            log::warn!("Failed to save high scores: {e}");
                            ScoreUpdate::Failed {
                                id: job.id,
                                reason: e.to_string(),
                            }
                        }
                    };
                    broadcast(&subscribers, &update);
                }
            })
            .map_err(|source| StoreError::Io {
                path: PathBuf::from("<score-writer thread>"),
                source,
            })?;
        Ok(Self {
            jobs: Some(tx),
            handle: Some(handle),
        })
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        // Disconnecting the channel lets the thread drain and exit
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Top-10 board kept in memory, optionally mirrored to a JSON file by a
/// background writer thread
pub struct LocalScoreStore {
    scores: HighScores,
    next_id: u64,
    subscribers: Subscribers,
    writer: Option<Writer>,
}

impl LocalScoreStore {
    /// Board that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            scores: HighScores::new(),
            next_id: 1,
            subscribers: Subscribers::default(),
            writer: None,
        }
    }

    /// Load the board from `path` (empty if the file does not exist yet)
    /// and persist future submissions there
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let scores = if path.exists() { read_scores(path)? } else { HighScores::new() };
        log::info!("Loaded {} high scores from {}", scores.entries.len(), path.display());
        let subscribers = Subscribers::default();
        let writer = Writer::spawn(path.to_path_buf(), Arc::clone(&subscribers))?;
        Ok(Self {
            scores,
            next_id: 1,
            subscribers,
            writer: Some(writer),
        })
    }

    /// Like `open`, but falls back to an in-memory board on any error
    pub fn open_or_memory(path: impl AsRef<Path>) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            log::warn!("{e}; keeping high scores in memory only");
            Self::in_memory()
        })
    }

    pub fn scores(&self) -> &HighScores {
        &self.scores
    }

    /// Subscribers still listening as of the last notification
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Wipe the board (and the file, on the next write)
    pub fn clear(&mut self) {
        self.scores.clear();
        log::info!("High scores cleared");
        let id = self.allocate_id();
        self.persist(id, None);
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    fn persist(&mut self, id: RecordId, rank: Option<usize>) {
        let Some(jobs) = self.writer.as_ref().and_then(|w| w.jobs.as_ref()) else {
            self.notify(ScoreUpdate::Stored { id, rank });
            return;
        };
        let job = PersistJob {
            id,
            rank,
            scores: self.scores.clone(),
        };
        if jobs.send(job).is_err() {
            log::warn!("Score writer is gone; record {} kept in memory only", id.0);
            self.notify(ScoreUpdate::Failed {
                id,
                reason: "score writer stopped".to_string(),
            });
        }
    }

    fn notify(&self, update: ScoreUpdate) {
        broadcast(&self.subscribers, &update);
    }
}

impl Default for LocalScoreStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ScoreStore for LocalScoreStore {
    fn is_high_score(&self, score: u64) -> bool {
        self.scores.qualifies(score)
    }

    fn top_scores(&self) -> Vec<HighScoreEntry> {
        self.scores.entries.clone()
    }

    fn submit(&mut self, name: &str, score: u64, level: u32) -> RecordId {
        let id = self.allocate_id();
        let rank = self.scores.add_score(HighScoreEntry {
            name: name.to_string(),
            score,
            level,
            timestamp_ms: now_ms(),
        });
        match rank {
            Some(rank) => log::info!("New high score #{rank}: {name} {score} (level {level})"),
            None => log::debug!("Score {score} did not make the board"),
        }
        self.persist(id, rank);
        id
    }

    fn subscribe(&mut self) -> Receiver<ScoreUpdate> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}

fn read_scores(path: &Path) -> Result<HighScores, StoreError> {
    let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut scores: HighScores = serde_json::from_str(&json).map_err(StoreError::Decode)?;
    scores.normalize();
    Ok(scores)
}

/// Write via a temp file and rename so a crash never leaves a torn file
fn write_scores(path: &Path, scores: &HighScores) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(scores).map_err(StoreError::Encode)?;
    let tmp = path.with_extension("tmp");
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("asteroid-arena-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        dir.join("highscores.json")
    }

    #[test]
    fn test_in_memory_submit_reports_rank() {
        let mut store = LocalScoreStore::in_memory();
        let updates = store.subscribe();
        let id = store.submit("ace", 42, 3);
        assert_eq!(updates.try_recv(), Ok(ScoreUpdate::Stored { id, rank: Some(1) }));
        assert!(store.is_high_score(1));
        assert_eq!(store.top_scores()[0].name, "ace");
        assert_eq!(store.top_scores()[0].level, 3);
    }

    #[test]
    fn test_zero_score_is_recorded_but_not_ranked() {
        let mut store = LocalScoreStore::in_memory();
        let updates = store.subscribe();
        let id = store.submit("nobody", 0, 1);
        assert_eq!(updates.try_recv(), Ok(ScoreUpdate::Stored { id, rank: None }));
        assert!(store.top_scores().is_empty());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut store = LocalScoreStore::in_memory();
        let gone = store.subscribe();
        let kept = store.subscribe();
        drop(gone);
        assert_eq!(store.subscriber_count(), 2);

        let id = store.submit("ace", 5, 1);
        assert_eq!(kept.try_recv(), Ok(ScoreUpdate::Stored { id, rank: Some(1) }));
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let mut store = LocalScoreStore::in_memory();
        let a = store.submit("a", 1, 1);
        let b = store.submit("b", 2, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_file_backed_round_trip() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);
        {
            let mut store = LocalScoreStore::open(&path).expect("open");
            let updates = store.subscribe();
            let id = store.submit("ace", 17, 2);
            let update = updates.recv_timeout(Duration::from_secs(5)).expect("writer reply");
            assert_eq!(update, ScoreUpdate::Stored { id, rank: Some(1) });
        }
        let reopened = LocalScoreStore::open(&path).expect("reopen");
        assert_eq!(reopened.scores().top_score(), Some(17));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_writer_prunes_dropped_subscribers() {
        let path = temp_path("prune");
        let _ = fs::remove_file(&path);
        let mut store = LocalScoreStore::open(&path).expect("open");
        let kept = store.subscribe();
        for _ in 0..3 {
            drop(store.subscribe());
        }
        let id = store.submit("ace", 3, 1);
        let update = kept.recv_timeout(Duration::from_secs(5)).expect("writer reply");
        assert_eq!(update, ScoreUpdate::Stored { id, rank: Some(1) });

        // The second reply only arrives once the first broadcast is done
        let id = store.submit("bee", 2, 1);
        let update = kept.recv_timeout(Duration::from_secs(5)).expect("writer reply");
        assert_eq!(update, ScoreUpdate::Stored { id, rank: Some(2) });
        assert_eq!(store.subscriber_count(), 1);
        drop(store);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_is_a_decode_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").expect("write");
        assert!(matches!(LocalScoreStore::open(&path), Err(StoreError::Decode(_))));
        let fallback = LocalScoreStore::open_or_memory(&path);
        assert!(fallback.scores().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_write_failure_reported_not_fatal() {
        let path = temp_path("unwritable");
        let _ = fs::remove_dir_all(&path);
        let _ = fs::remove_file(&path);
        let mut store = LocalScoreStore::open(&path).expect("open");
        // A non-empty directory where the file should be makes the rename fail
        fs::create_dir_all(path.join("blocker")).expect("blocker dir");
        let updates = store.subscribe();
        let id = store.submit("ace", 9, 1);
        let update = updates.recv_timeout(Duration::from_secs(5)).expect("writer reply");
        assert!(matches!(update, ScoreUpdate::Failed { id: failed, .. } if failed == id));
        assert_eq!(store.scores().top_score(), Some(9));
        drop(store);
        let _ = fs::remove_dir_all(&path);
    }
}
