//! Testing utilities and mock implementations.
//!
//! Lets code that drives a [`Renderer`](crate::renderer::Renderer) be tested
//! without a Blender installation.

mod mock_renderer;

pub use mock_renderer::{MockRenderer, RecordedRender};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::time::Duration;

    use crate::renderer::ProgressRecord;

    /// Create a progress record for the given frame with reasonable defaults.
    pub fn progress_record(frame: u32, information: &str) -> ProgressRecord {
        ProgressRecord {
            frame,
            memory_global: 128.0,
            render_time: Duration::from_secs(u64::from(frame)),
            remaining_time: None,
            memory_current: 64.0,
            memory_current_peak: 96.0,
            scene: "Scene".to_string(),
            render_layer: "ViewLayer".to_string(),
            information: information.to_string(),
            extra_information: None,
        }
    }
}
