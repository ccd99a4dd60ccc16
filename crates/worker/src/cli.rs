use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use renderfarm_core::{RenderJob, RenderMode, RenderParameters, RendererVariant};

#[derive(Debug, Parser)]
#[command(
    name = "renderfarm-worker",
    about = "Runs Blender for a render farm and reports progress as JSON lines",
    version
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "RENDERFARM_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Run the secondary renderer build (falls back to the primary if not configured)
    #[arg(long, global = true)]
    pub secondary: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn variant(&self) -> RendererVariant {
        if self.secondary {
            RendererVariant::Secondary
        } else {
            RendererVariant::Primary
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the compute devices the renderer can use
    Devices,

    /// Print the frame range of a scene file
    Probe {
        /// Scene file to probe
        file: PathBuf,
    },

    /// Render a scene file
    Render(RenderArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Scene file to render
    pub file: PathBuf,

    /// Output directory for rendered frames
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Render a single frame or the whole animation
    #[arg(long, value_enum, default_value_t = ModeArg::Animation)]
    pub mode: ModeArg,

    /// Device index to render on (repeatable)
    #[arg(short = 'd', long = "device")]
    pub devices: Vec<u32>,

    /// Frame to render in still mode
    #[arg(long)]
    pub frame: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Still,
    Animation,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Still => RenderMode::Still,
            ModeArg::Animation => RenderMode::Animation,
        }
    }
}

impl RenderArgs {
    pub fn into_job(self, variant: RendererVariant) -> RenderJob {
        RenderJob {
            file: self.file,
            params: RenderParameters {
                mode: self.mode.into(),
                devices: self.devices,
                output_dir: self.output_dir,
                frame: self.frame,
            },
            variant,
        }
    }
}
