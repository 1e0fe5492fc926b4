//! Diagnostic recorder.
//!
//! Attempt records are sent over a bounded channel to a background task
//! that owns all state. `record` never waits and never fails: when the
//! channel is full or closed the record is dropped and logged. Summaries
//! are pulled by operator tooling through the same channel.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use vthumb_models::{AttemptOutcome, AttemptRecord, VideoDiagnosticSummary, VideoId};

use crate::metrics;

/// Pending messages before new records are dropped.
const CHANNEL_CAPACITY: usize = 4096;

/// Default records kept per video.
pub const DEFAULT_RETENTION: usize = 200;

enum Command {
    Record(AttemptRecord),
    Summary {
        video_id: VideoId,
        reply: oneshot::Sender<VideoDiagnosticSummary>,
    },
    SummaryAll {
        reply: oneshot::Sender<Vec<VideoDiagnosticSummary>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the recorder task. Cheap to clone.
#[derive(Clone)]
pub struct DiagnosticRecorder {
    tx: mpsc::Sender<Command>,
}

impl DiagnosticRecorder {
    /// Start the recorder task. Must be called inside a tokio runtime.
    pub fn spawn(retention: usize) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(run(rx, DiagnosticStore::new(retention)));
        Self { tx }
    }

    /// Append an attempt record without waiting.
    pub fn record(&self, record: AttemptRecord) {
        match self.tx.try_send(Command::Record(record)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::record_diagnostic_dropped();
                warn!("Diagnostic channel full, dropping attempt record");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Diagnostic recorder stopped, dropping attempt record");
            }
        }
    }

    /// Summary for one video. Empty when nothing was recorded.
    pub async fn summary_for(&self, video_id: &VideoId) -> VideoDiagnosticSummary {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::Summary {
            video_id: video_id.clone(),
            reply,
        };
        if self.tx.send(cmd).await.is_err() {
            return VideoDiagnosticSummary::empty(video_id.clone());
        }
        rx.await
            .unwrap_or_else(|_| VideoDiagnosticSummary::empty(video_id.clone()))
    }

    /// Summaries for every video with recorded attempts, ordered by id.
    pub async fn summary_all(&self) -> Vec<VideoDiagnosticSummary> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::SummaryAll { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Wait until every record sent before this call has been applied.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Flush { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

async fn run(mut rx: mpsc::Receiver<Command>, mut store: DiagnosticStore) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Record(record) => store.append(record),
            Command::Summary { video_id, reply } => {
                let _ = reply.send(store.summary(&video_id));
            }
            Command::SummaryAll { reply } => {
                let _ = reply.send(store.summaries());
            }
            Command::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }
    debug!("Diagnostic recorder stopped");
}

#[derive(Default)]
struct VideoLog {
    recent: VecDeque<AttemptRecord>,
    attempts: u64,
    successes: u64,
}

/// Recorder state, owned by the background task.
struct DiagnosticStore {
    retention: usize,
    videos: HashMap<VideoId, VideoLog>,
}

impl DiagnosticStore {
    fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            videos: HashMap::new(),
        }
    }

    fn append(&mut self, record: AttemptRecord) {
        let log = self.videos.entry(record.video_id.clone()).or_default();
        log.attempts += 1;
        if record.outcome == AttemptOutcome::Success {
            log.successes += 1;
        }
        if log.recent.len() >= self.retention {
            log.recent.pop_front();
        }
        log.recent.push_back(record);
    }

    fn summary(&self, video_id: &VideoId) -> VideoDiagnosticSummary {
        match self.videos.get(video_id) {
            Some(log) => summarize(video_id, log),
            None => VideoDiagnosticSummary::empty(video_id.clone()),
        }
    }

    fn summaries(&self) -> Vec<VideoDiagnosticSummary> {
        let mut all: Vec<_> = self
            .videos
            .iter()
            .map(|(id, log)| summarize(id, log))
            .collect();
        all.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        all
    }
}

fn summarize(video_id: &VideoId, log: &VideoLog) -> VideoDiagnosticSummary {
    let last = log.recent.back();
    VideoDiagnosticSummary {
        video_id: video_id.clone(),
        attempts: log.attempts,
        successes: log.successes,
        success_rate: if log.attempts == 0 {
            0.0
        } else {
            log.successes as f64 / log.attempts as f64
        },
        last_outcome: last.map(|r| r.outcome),
        best_brightness: log
            .recent
            .iter()
            .filter_map(|r| r.brightness)
            .max_by(|a, b| a.total_cmp(b)),
        last_observed_at: last.map(|r| r.observed_at),
        recent: log.recent.iter().cloned().collect(),
    }
}
