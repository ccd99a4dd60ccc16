pub mod config;
pub mod renderer;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LoggingConfig,
};
pub use renderer::{
    parse_line, parse_timecode, BlendMetadata, BlenderRenderer, Device, ExecutablePaths,
    ProgressRecord, RenderHandle, RenderJob, RenderMode, RenderParameters, Renderer,
    RendererConfig, RendererError, RendererVariant,
};
