//! Renderer module for running Blender on a render-farm worker.
//!
//! This module supervises the renderer process and turns its console output
//! into typed data:
//!
//! - Resolving which renderer build to run ([`ExecutablePaths`])
//! - Enumerating compute devices
//! - Probing scene files for their frame range
//! - Rendering with one [`ProgressRecord`] per progress line
//!
//! # Example
//!
//! ```ignore
//! use renderfarm_core::renderer::{
//!     BlenderRenderer, ExecutablePaths, RenderJob, RenderParameters, Renderer, RendererVariant,
//! };
//!
//! let executables = ExecutablePaths::from_config(&config.renderer)?;
//! let renderer = BlenderRenderer::new(executables, config.renderer.clone());
//!
//! let meta = renderer.probe(Path::new("/jobs/shot.blend"), RendererVariant::Primary).await?;
//! println!("Frames {}..={}", meta.start_frame, meta.end_frame);
//!
//! let mut handle = renderer.spawn_render(&RenderJob {
//!     file: PathBuf::from("/jobs/shot.blend"),
//!     params: RenderParameters::animation(vec![0], "/renders/shot"),
//!     variant: RendererVariant::Primary,
//! })?;
//! while let Some(progress) = handle.next_progress().await {
//!     println!("frame {} {}", progress.frame, progress.information);
//! }
//! handle.wait().await?;
//! ```

mod blender;
mod config;
mod error;
mod executable;
mod lines;
mod progress;
mod supervisor;
mod timecode;
mod traits;
mod types;

pub use blender::{BlenderRenderer, PAYLOAD_SENTINEL};
pub use config::{RendererConfig, Script};
pub use error::RendererError;
pub use executable::ExecutablePaths;
pub use lines::LineBuffer;
pub use progress::{parse_line, ProgressRecord};
pub use supervisor::{RenderHandle, PROGRESS_BUFFER_SIZE};
pub use timecode::parse_timecode;
pub use traits::Renderer;
pub use types::{
    BlendMetadata, Device, RenderJob, RenderMode, RenderParameters, RendererVariant,
};
