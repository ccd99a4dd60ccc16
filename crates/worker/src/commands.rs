//! Subcommand implementations.
//!
//! Each command writes its result to `out` as JSON; render progress is one
//! JSON object per line, flushed as it arrives.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use renderfarm_core::renderer::PROGRESS_BUFFER_SIZE;
use renderfarm_core::{RenderJob, Renderer, RendererVariant};
use tokio::sync::mpsc;
use tracing::info;

pub async fn devices<R, W>(renderer: &R, variant: RendererVariant, out: &mut W) -> Result<()>
where
    R: Renderer + ?Sized,
    W: Write,
{
    let devices = renderer
        .list_devices(variant)
        .await
        .context("Failed to list devices")?;
    info!("Found {} device(s)", devices.len());

    serde_json::to_writer(&mut *out, &devices)?;
    writeln!(out)?;
    Ok(())
}

pub async fn probe<R, W>(
    renderer: &R,
    file: &Path,
    variant: RendererVariant,
    out: &mut W,
) -> Result<()>
where
    R: Renderer + ?Sized,
    W: Write,
{
    let metadata = renderer
        .probe(file, variant)
        .await
        .with_context(|| format!("Failed to probe {:?}", file))?;

    serde_json::to_writer(&mut *out, &metadata)?;
    writeln!(out)?;
    Ok(())
}

pub async fn render<R, W>(renderer: &R, job: RenderJob, out: &mut W) -> Result<()>
where
    R: Renderer + ?Sized,
    W: Write,
{
    let file = job.file.clone();
    let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);

    let rendering = renderer.render_with_progress(job, progress_tx);
    let printing = async {
        while let Some(record) = progress_rx.recv().await {
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
            out.flush()?;
        }
        Ok::<_, anyhow::Error>(())
    };

    let (rendered, printed) = tokio::join!(rendering, printing);
    printed.context("Failed to write progress")?;
    rendered.with_context(|| format!("Failed to render {:?}", file))?;

    info!("Rendered {:?}", file);
    Ok(())
}
