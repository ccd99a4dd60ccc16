//! Types for the renderer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which configured renderer build to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererVariant {
    /// The required, primary executable.
    #[default]
    Primary,
    /// The optional alternate build. Falls back to the primary when not configured.
    Secondary,
}

/// What the render script should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// A single frame.
    Still,
    /// The full frame range of the scene.
    Animation,
}

/// Job description handed to the render script as a single JSON argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParameters {
    /// Still or animation.
    pub mode: RenderMode,
    /// Compute device indices, in the renderer's own numbering.
    pub devices: Vec<u32>,
    /// Where rendered frames are written.
    pub output_dir: PathBuf,
    /// Frame to render in still mode; the scene's current frame when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<i32>,
}

impl RenderParameters {
    /// Parameters for rendering one frame.
    pub fn still(devices: Vec<u32>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: RenderMode::Still,
            devices,
            output_dir: output_dir.into(),
            frame: None,
        }
    }

    /// Parameters for rendering the whole animation.
    pub fn animation(devices: Vec<u32>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: RenderMode::Animation,
            devices,
            output_dir: output_dir.into(),
            frame: None,
        }
    }

    /// Sets the frame for a still render.
    pub fn with_frame(mut self, frame: i32) -> Self {
        self.frame = Some(frame);
        self
    }
}

/// A render invocation: which file, how, and with which renderer build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    /// Scene file to render.
    pub file: PathBuf,
    /// Parameters passed through to the render script.
    pub params: RenderParameters,
    /// Renderer build to use.
    #[serde(default)]
    pub variant: RendererVariant,
}

/// Frame range metadata read from a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendMetadata {
    pub start_frame: i32,
    pub end_frame: i32,
}

impl BlendMetadata {
    /// Number of frames in the range, zero if the range is inverted.
    pub fn frame_count(&self) -> u32 {
        if self.end_frame < self.start_frame {
            0
        } else {
            (i64::from(self.end_frame) - i64::from(self.start_frame) + 1) as u32
        }
    }
}

/// A compute device reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Index to pass back in [`RenderParameters::devices`].
    pub id: u32,
    /// Human readable device name.
    pub name: String,
    /// Backend type, e.g. `CPU`, `CUDA`, `OPTIX`.
    #[serde(rename = "type")]
    pub device_type: String,
}
