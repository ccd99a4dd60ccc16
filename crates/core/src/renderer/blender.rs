//! Blender-based renderer implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::config::{RendererConfig, Script};
use super::error::RendererError;
use super::executable::ExecutablePaths;
use super::lines::LineBuffer;
use super::progress::ProgressRecord;
use super::supervisor::{
    collect_stderr, drain_stderr, supervise, terminate, RenderHandle, READ_CHUNK_SIZE,
};
use super::traits::Renderer;
use super::types::{BlendMetadata, Device, RenderJob, RendererVariant};

/// Prefix of the stdout line carrying a probe script's JSON payload.
pub const PAYLOAD_SENTINEL: &str = "render_farm_data=";

/// Runs Blender in background mode with the farm's Python scripts.
#[derive(Debug, Clone)]
pub struct BlenderRenderer {
    executables: ExecutablePaths,
    config: RendererConfig,
}

impl BlenderRenderer {
    /// Creates a renderer from validated executables and the renderer config.
    pub fn new(executables: ExecutablePaths, config: RendererConfig) -> Self {
        Self {
            executables,
            config,
        }
    }

    /// The executables this renderer chooses from.
    pub fn executables(&self) -> &ExecutablePaths {
        &self.executables
    }

    /// Starts a render and returns a handle to follow or cancel it.
    ///
    /// Must be called from within a Tokio runtime. Spawn failures are returned
    /// here; everything after that is reported by [`RenderHandle::wait`].
    pub fn spawn_render(&self, job: &RenderJob) -> Result<RenderHandle, RendererError> {
        let id = Uuid::new_v4();
        let span = info_span!("render", render_id = %id, file = %job.file.display());
        let child = span.in_scope(|| self.start_render(job))?;
        Ok(RenderHandle::start(id, child, span))
    }

    /// Builds renderer arguments: `-b [file] [extra] -P <script> [-- <payload>]`.
    fn build_args(
        &self,
        file: Option<&Path>,
        script: Script,
        payload: Option<&str>,
    ) -> Vec<String> {
        let mut args = vec!["-b".to_string()];

        if let Some(file) = file {
            args.push(file.to_string_lossy().to_string());
        }

        args.extend(self.config.extra_args.iter().cloned());

        args.extend([
            "-P".to_string(),
            self.config.script_path(script).to_string_lossy().to_string(),
        ]);

        if let Some(payload) = payload {
            args.extend(["--".to_string(), payload.to_string()]);
        }

        args
    }

    fn command(&self, variant: RendererVariant, args: &[String]) -> Command {
        let executable = self.executables.resolve(variant);
        debug!(executable = %executable.display(), ?args, "Spawning renderer");

        let mut command = Command::new(executable);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);
        command
    }

    fn spawn_error(&self, variant: RendererVariant, source: std::io::Error) -> RendererError {
        RendererError::Spawn {
            path: self.executables.resolve(variant).to_path_buf(),
            source,
        }
    }

    fn start_render(&self, job: &RenderJob) -> Result<Child, RendererError> {
        ensure_input(&job.file)?;

        let payload = serde_json::to_string(&job.params)?;
        let args = self.build_args(Some(&job.file), Script::Render, Some(&payload));

        let child = self
            .command(job.variant, &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(job.variant, e))?;

        info!(pid = ?child.id(), mode = ?job.params.mode, "Render started");
        Ok(child)
    }

    async fn run_render(
        &self,
        job: &RenderJob,
        progress_tx: Option<mpsc::Sender<ProgressRecord>>,
    ) -> Result<(), RendererError> {
        let span = info_span!("render", render_id = %Uuid::new_v4(), file = %job.file.display());
        async {
            let child = self.start_render(job)?;
            // Nothing cancels this render; it ends with the renderer.
            let (_cancel, cancel_rx) = oneshot::channel();
            supervise(child, progress_tx, cancel_rx).await
        }
        .instrument(span)
        .await
    }
}

/// Result of scanning a probe's stdout.
enum PayloadScan {
    Found(String),
    Missing { output: String },
}

/// Reads stdout chunk by chunk until a line carries the sentinel.
///
/// Stops reading at the first match, so nothing printed afterwards is looked at.
async fn scan_for_payload(child: &mut Child) -> Result<PayloadScan, RendererError> {
    let mut stdout = child.stdout.take().ok_or_else(|| {
        RendererError::process_failed(std::io::Error::other("renderer stdout was not captured"))
    })?;

    let mut lines = LineBuffer::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut output = String::new();

    loop {
        let n = stdout
            .read(&mut buf)
            .await
            .map_err(RendererError::process_failed)?;

        let batch = if n == 0 {
            lines.finish().into_iter().collect()
        } else {
            lines.push(&buf[..n])
        };

        for line in batch {
            if let Some(payload) = line.strip_prefix(PAYLOAD_SENTINEL) {
                return Ok(PayloadScan::Found(payload.to_string()));
            }
            output.push_str(&line);
            output.push('\n');
        }

        if n == 0 {
            return Ok(PayloadScan::Missing { output });
        }
    }
}

/// Finds the sentinel line in fully captured output.
fn find_payload(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.strip_prefix(PAYLOAD_SENTINEL))
}

fn decode_payload<T: DeserializeOwned>(payload: &str) -> Result<T, RendererError> {
    serde_json::from_str(payload.trim()).map_err(|e| RendererError::payload(e.to_string()))
}

fn ensure_input(path: &Path) -> Result<(), RendererError> {
    if path.exists() {
        Ok(())
    } else {
        Err(RendererError::InputNotFound {
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl Renderer for BlenderRenderer {
    fn name(&self) -> &str {
        "blender"
    }

    async fn list_devices(&self, variant: RendererVariant) -> Result<Vec<Device>, RendererError> {
        let args = self.build_args(None, Script::GetDevices, None);

        let output = self
            .command(variant, &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(variant, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match find_payload(&stdout) {
            Some(payload) => {
                let devices: Vec<Device> = decode_payload(payload)?;
                debug!(count = devices.len(), "Devices enumerated");
                Ok(devices)
            }
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(status = ?output.status, %stderr, "Device probe printed no payload");
                Err(RendererError::InvalidOutput {
                    output: stdout.into_owned(),
                    stderr: Some(stderr).filter(|s| !s.is_empty()),
                })
            }
        }
    }

    async fn probe(
        &self,
        path: &Path,
        variant: RendererVariant,
    ) -> Result<BlendMetadata, RendererError> {
        ensure_input(path)?;

        let args = self.build_args(Some(path), Script::GetData, None);
        let mut child = self
            .command(variant, &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(variant, e))?;
        let stderr_tail = child.stderr.take().map(drain_stderr);

        match scan_for_payload(&mut child).await {
            Ok(PayloadScan::Found(payload)) => {
                terminate(&mut child).await;
                let metadata: BlendMetadata = decode_payload(&payload)?;
                debug!(
                    file = %path.display(),
                    start_frame = metadata.start_frame,
                    end_frame = metadata.end_frame,
                    "Scene probed"
                );
                Ok(metadata)
            }
            Ok(PayloadScan::Missing { output }) => {
                // Stdout is closed, so a renderer still running can no longer answer.
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "Renderer already exited");
                }
                let status = child.wait().await.map_err(RendererError::process_failed)?;
                let stderr = match stderr_tail {
                    Some(tail) => collect_stderr(tail).await,
                    None => None,
                };
                warn!(
                    file = %path.display(),
                    ?status,
                    stderr = stderr.as_deref().unwrap_or_default(),
                    "Metadata probe exited without payload"
                );
                Err(RendererError::InvalidOutput { output, stderr })
            }
            Err(e) => {
                terminate(&mut child).await;
                Err(e)
            }
        }
    }

    async fn render(&self, job: RenderJob) -> Result<(), RendererError> {
        self.run_render(&job, None).await
    }

    async fn render_with_progress(
        &self,
        job: RenderJob,
        progress_tx: mpsc::Sender<ProgressRecord>,
    ) -> Result<(), RendererError> {
        self.run_render(&job, Some(progress_tx)).await
    }
}
