// submission.rs - Solution sinks and the delayed, cancellable submission task

use futures::future::{self, BoxFuture, FutureExt};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error_handling::{GameError, Result};

/// Grace period between victory and submission
pub const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_millis(300);

/// Receives the serialized solution payload
pub trait SolutionSink: Send + Sync {
    fn submit(&self, payload: String) -> BoxFuture<'static, Result<()>>;
}

/// Writes the payload to a JSON file
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory ahead of the run
    pub async fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

impl SolutionSink for FileSink {
    fn submit(&self, payload: String) -> BoxFuture<'static, Result<()>> {
        let path = self.path.clone();
        async move {
            tokio::fs::write(&path, payload.as_bytes()).await?;
            info!("Solution written to {}", path.display());
            Ok(())
        }
        .boxed()
    }
}

/// Forwards the payload to an in-process receiver
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SolutionSink for ChannelSink {
    fn submit(&self, payload: String) -> BoxFuture<'static, Result<()>> {
        let sent = self
            .tx
            .send(payload)
            .map_err(|_| GameError::Submission("solution receiver dropped".to_string()));
        future::ready(sent).boxed()
    }
}

/// Logs the payload; used when no output file is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SolutionSink for LogSink {
    fn submit(&self, payload: String) -> BoxFuture<'static, Result<()>> {
        info!("Solution: {payload}");
        future::ready(Ok(())).boxed()
    }
}

/// Handle to a submission that fires after its delay unless cancelled
#[derive(Debug)]
pub struct ScheduledSubmission {
    handle: JoinHandle<Result<()>>,
}

impl ScheduledSubmission {
    /// Aborts the task; a no-op once it has fired
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!("Cancelling pending submission");
        }
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the submission; a cancelled one yields `LoopStopped`
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(GameError::LoopStopped),
            Err(e) => Err(GameError::Submission(e.to_string())),
        }
    }
}

/// Spawns a task that sleeps `delay` and then hands `payload` to `sink`.
pub fn schedule_submission(
    sink: Arc<dyn SolutionSink>,
    payload: String,
    delay: Duration,
) -> ScheduledSubmission {
    debug!("Submission scheduled in {:?}", delay);
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        sink.submit(payload).await
    });
    ScheduledSubmission { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (sink, mut rx) = ChannelSink::new();
        let start = Instant::now();
        let pending = schedule_submission(Arc::new(sink), "{\"path\":[]}".to_string(), DEFAULT_SUBMIT_DELAY);

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());
        assert!(!pending.is_finished());

        pending.wait().await.unwrap();
        assert!(start.elapsed() >= DEFAULT_SUBMIT_DELAY);
        assert_eq!(rx.try_recv().unwrap(), "{\"path\":[]}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_delay() {
        let (sink, mut rx) = ChannelSink::new();
        let pending = schedule_submission(Arc::new(sink), "payload".to_string(), DEFAULT_SUBMIT_DELAY);

        tokio::time::advance(Duration::from_millis(100)).await;
        pending.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(rx.try_recv().is_err());
        assert!(matches!(pending.wait().await, Err(GameError::LoopStopped)));
    }

    #[tokio::test]
    async fn test_channel_sink_reports_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        let err = sink.submit("x".to_string()).await.unwrap_err();
        assert!(matches!(err, GameError::Submission(_)));
    }

    #[tokio::test]
    async fn test_file_sink_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("out").join("solution.json"));
        sink.prepare().await.unwrap();

        let pending = schedule_submission(Arc::new(sink.clone()), "{\"dimension\":11}".to_string(), Duration::ZERO);
        pending.wait().await.unwrap();

        let written = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(written, "{\"dimension\":11}");
    }
}
