//! Supervision of a running render process.
//!
//! A render moves through `spawned -> streaming -> completed | failed`. While
//! streaming, stdout is read in raw chunks, reassembled into lines, and every
//! line that parses as a progress line is forwarded in the order it was
//! written. Everything else on stdout is renderer chatter and is dropped.

use std::collections::VecDeque;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn, Instrument, Span};
use uuid::Uuid;

use super::error::RendererError;
use super::lines::LineBuffer;
use super::progress::{parse_line, ProgressRecord};

/// Size of a single stdout read.
pub(crate) const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Progress records buffered in a [`RenderHandle`] before the renderer's
/// output is throttled.
pub const PROGRESS_BUFFER_SIZE: usize = 64;

/// Stderr lines kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for stderr to close once the renderer has exited.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// A render running in the background.
///
/// Progress arrives through [`RenderHandle::next_progress`]; the outcome
/// through [`RenderHandle::wait`]. Dropping the handle detaches the render:
/// it keeps running until the renderer exits.
#[derive(Debug)]
pub struct RenderHandle {
    id: Uuid,
    pid: Option<u32>,
    progress: mpsc::Receiver<ProgressRecord>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), RendererError>>,
}

impl RenderHandle {
    pub(crate) fn start(id: Uuid, child: Child, span: Span) -> Self {
        let pid = child.id();
        let (progress_tx, progress) = mpsc::channel(PROGRESS_BUFFER_SIZE);
        let (cancel, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(child, Some(progress_tx), cancel_rx).instrument(span));

        Self {
            id,
            pid,
            progress,
            cancel: Some(cancel),
            task,
        }
    }

    /// Identifier of this render, also attached to its log span.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// OS process id of the renderer, if it was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next progress record, or `None` once the renderer's stdout is closed.
    pub async fn next_progress(&mut self) -> Option<ProgressRecord> {
        self.progress.recv().await
    }

    /// Asks the supervisor to kill the renderer.
    ///
    /// Returns `false` if the render already finished or was already cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(cancel) => cancel.send(()).is_ok(),
            None => false,
        }
    }

    /// Waits for the render to finish.
    ///
    /// Progress records not received yet are discarded.
    pub async fn wait(self) -> Result<(), RendererError> {
        let Self {
            progress,
            cancel,
            task,
            ..
        } = self;
        drop(progress);

        let result = task
            .await
            .map_err(|e| RendererError::process_failed(std::io::Error::other(e)))?;
        drop(cancel);
        result
    }
}

/// Streams a spawned render to completion.
///
/// `cancel` kills the renderer when it fires, even while progress delivery is
/// waiting on a full channel. If its sender is dropped the render simply runs
/// to the end.
pub(crate) async fn supervise(
    mut child: Child,
    mut progress_tx: Option<mpsc::Sender<ProgressRecord>>,
    cancel: oneshot::Receiver<()>,
) -> Result<(), RendererError> {
    let mut stdout = child.stdout.take().ok_or_else(|| {
        RendererError::process_failed(std::io::Error::other("renderer stdout was not captured"))
    })?;
    let stderr_tail = child.stderr.take().map(drain_stderr);

    let mut cancel = CancelSignal::new(cancel);
    let mut lines = LineBuffer::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut delivered: u64 = 0;

    debug!(pid = ?child.id(), "Streaming renderer output");

    loop {
        let batch = tokio::select! {
            biased;
            _ = cancel.requested() => return Err(abort(&mut child).await),
            read = stdout.read(&mut buf) => match read {
                Ok(0) => None,
                Ok(n) => Some(lines.push(&buf[..n])),
                Err(e) => {
                    terminate(&mut child).await;
                    return Err(RendererError::process_failed(e));
                }
            },
        };

        let Some(batch) = batch else {
            if let Some(line) = lines.finish() {
                if forward(&line, &mut progress_tx, &mut cancel, &mut delivered).await
                    == Forwarded::Cancelled
                {
                    return Err(abort(&mut child).await);
                }
            }
            break;
        };

        for line in batch {
            if forward(&line, &mut progress_tx, &mut cancel, &mut delivered).await
                == Forwarded::Cancelled
            {
                return Err(abort(&mut child).await);
            }
        }
    }

    let status = tokio::select! {
        biased;
        _ = cancel.requested() => return Err(abort(&mut child).await),
        status = child.wait() => status.map_err(RendererError::process_failed)?,
    };

    let stderr = match stderr_tail {
        Some(tail) => collect_stderr(tail).await,
        None => None,
    };

    if status.success() {
        info!(progress_records = delivered, "Render completed");
        Ok(())
    } else {
        let signal = exit_signal(&status);
        warn!(
            code = ?status.code(),
            signal = ?signal,
            progress_records = delivered,
            "Render failed"
        );
        Err(RendererError::NonZeroExit {
            code: status.code(),
            signal,
            stderr,
        })
    }
}

/// Cancellation requested through a [`RenderHandle`].
struct CancelSignal {
    rx: oneshot::Receiver<()>,
    armed: bool,
}

impl CancelSignal {
    fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx, armed: true }
    }

    /// Resolves once cancellation is requested. Never resolves if the sender
    /// was dropped without requesting it.
    async fn requested(&mut self) {
        if self.armed {
            if (&mut self.rx).await.is_ok() {
                return;
            }
            self.armed = false;
        }
        std::future::pending::<()>().await
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Forwarded {
    Done,
    Cancelled,
}

async fn forward(
    line: &str,
    progress_tx: &mut Option<mpsc::Sender<ProgressRecord>>,
    cancel: &mut CancelSignal,
    delivered: &mut u64,
) -> Forwarded {
    if line.trim().is_empty() {
        return Forwarded::Done;
    }
    let Some(record) = parse_line(line) else {
        trace!(line, "Ignoring non-progress output");
        return Forwarded::Done;
    };

    let Some(tx) = progress_tx.as_ref() else {
        *delivered += 1;
        return Forwarded::Done;
    };

    // A full channel must not hold off cancellation.
    let receiver_gone = {
        let permit = tokio::select! {
            biased;
            _ = cancel.requested() => return Forwarded::Cancelled,
            permit = tx.reserve() => permit,
        };
        match permit {
            Ok(permit) => {
                permit.send(record);
                *delivered += 1;
                false
            }
            Err(_) => true,
        }
    };

    if receiver_gone {
        debug!("Progress receiver dropped, continuing without progress");
        *progress_tx = None;
    }
    Forwarded::Done
}

async fn abort(child: &mut Child) -> RendererError {
    info!("Render cancelled, killing renderer");
    terminate(child).await;
    RendererError::Cancelled
}

/// Kills the process and reaps it.
pub(crate) async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Renderer already exited");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "Failed to reap renderer process");
    }
}

/// Last stderr lines, unless a leftover child process still holds the pipe.
pub(crate) async fn collect_stderr(tail: JoinHandle<String>) -> Option<String> {
    match tokio::time::timeout(STDERR_GRACE, tail).await {
        Ok(Ok(tail)) if !tail.is_empty() => Some(tail),
        Ok(_) => None,
        Err(_) => {
            debug!("Renderer stderr still open, not waiting for it");
            None
        }
    }
}

/// Logs stderr as it arrives and keeps the last few lines.
pub(crate) fn drain_stderr(stderr: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(
        async move {
            let mut reader = BufReader::new(stderr).split(b'\n');
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(raw)) = reader.next_segment().await {
                let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
                debug!(target: "renderer::stderr", "{}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        }
        .in_current_span(),
    )
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
