//! Trait definitions for the renderer module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::RendererError;
use super::progress::ProgressRecord;
use super::types::{BlendMetadata, Device, RenderJob, RendererVariant};

/// A renderer that can enumerate devices, probe scene files and render them.
///
/// Every call owns its own renderer process; calls may run concurrently.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns the name of this renderer implementation.
    fn name(&self) -> &str;

    /// Lists the compute devices the renderer can use.
    async fn list_devices(&self, variant: RendererVariant) -> Result<Vec<Device>, RendererError>;

    /// Reads the frame range of a scene file.
    async fn probe(&self, path: &Path, variant: RendererVariant)
        -> Result<BlendMetadata, RendererError>;

    /// Renders a scene, discarding progress.
    async fn render(&self, job: RenderJob) -> Result<(), RendererError>;

    /// Renders a scene, sending one record per progress line in output order.
    ///
    /// If the receiver is dropped, rendering continues without progress reporting.
    async fn render_with_progress(
        &self,
        job: RenderJob,
        progress_tx: mpsc::Sender<ProgressRecord>,
    ) -> Result<(), RendererError>;
}
