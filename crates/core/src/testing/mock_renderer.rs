//! Mock renderer for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::renderer::{
    BlendMetadata, Device, ProgressRecord, RenderJob, Renderer, RendererError, RendererVariant,
};

/// A recorded render job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRender {
    /// The job that was submitted.
    pub job: RenderJob,
    /// Whether the render succeeded.
    pub success: bool,
}

/// Mock implementation of the Renderer trait.
///
/// Provides controllable behavior for testing:
/// - Track render jobs for assertions
/// - Simulate success/failure
/// - Control probe results and the device list
/// - Replay scripted progress records
///
/// # Example
///
/// ```rust,ignore
/// use renderfarm_core::testing::MockRenderer;
///
/// let renderer = MockRenderer::new();
/// renderer.set_probe_result("/jobs/shot.blend", BlendMetadata { start_frame: 1, end_frame: 48 }).await;
/// renderer.set_progress(vec![record]).await;
///
/// renderer.render_with_progress(job, tx).await?;
/// assert_eq!(renderer.render_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockRenderer {
    /// Recorded renders.
    renders: Arc<RwLock<Vec<RecordedRender>>>,
    /// Pre-configured probe results by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, BlendMetadata>>>,
    /// Devices returned by `list_devices`.
    devices: Arc<RwLock<Vec<Device>>>,
    /// Progress records replayed by every render.
    progress: Arc<RwLock<Vec<ProgressRecord>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<RendererError>>>,
    /// Simulated delay between progress records.
    progress_interval: Arc<RwLock<Duration>>,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    /// Create a new mock renderer.
    pub fn new() -> Self {
        Self {
            renders: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            devices: Arc::new(RwLock::new(vec![Device {
                id: 0,
                name: "Mock CPU".to_string(),
                device_type: "CPU".to_string(),
            }])),
            progress: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            progress_interval: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all recorded renders.
    pub async fn recorded_renders(&self) -> Vec<RecordedRender> {
        self.renders.read().await.clone()
    }

    /// Get the number of renders performed.
    pub async fn render_count(&self) -> usize {
        self.renders.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, metadata: BlendMetadata) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), metadata);
    }

    /// Set the devices returned by `list_devices`.
    pub async fn set_devices(&self, devices: Vec<Device>) {
        *self.devices.write().await = devices;
    }

    /// Set the progress records replayed by each render.
    pub async fn set_progress(&self, records: Vec<ProgressRecord>) {
        *self.progress.write().await = records;
    }

    /// Set the delay between replayed progress records.
    pub async fn set_progress_interval(&self, interval: Duration) {
        *self.progress_interval.write().await = interval;
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: RendererError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<RendererError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_devices(&self, _variant: RendererVariant) -> Result<Vec<Device>, RendererError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.devices.read().await.clone())
    }

    async fn probe(
        &self,
        path: &Path,
        _variant: RendererVariant,
    ) -> Result<BlendMetadata, RendererError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        Ok(self
            .probe_results
            .read()
            .await
            .get(path)
            .copied()
            .unwrap_or(BlendMetadata {
                start_frame: 1,
                end_frame: 250,
            }))
    }

    async fn render(&self, job: RenderJob) -> Result<(), RendererError> {
        if let Some(err) = self.take_error().await {
            self.renders.write().await.push(RecordedRender {
                job,
                success: false,
            });
            return Err(err);
        }

        self.renders.write().await.push(RecordedRender { job, success: true });
        Ok(())
    }

    async fn render_with_progress(
        &self,
        job: RenderJob,
        progress_tx: mpsc::Sender<ProgressRecord>,
    ) -> Result<(), RendererError> {
        let records = self.progress.read().await.clone();
        let interval = *self.progress_interval.read().await;

        for record in records {
            if progress_tx.send(record).await.is_err() {
                break;
            }
            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        }

        self.render(job).await
    }
}
