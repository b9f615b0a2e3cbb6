pub mod canvas;
pub mod config;
pub mod diff;
pub mod errors;

pub use canvas::{FileRevision, TextCanvas};
pub use config::{CanvasConfig, ConfigError, LoadOptions};
pub use diff::patch::{Hunk, HunkLine, ParsedPatch};
pub use diff::unified_diff;
pub use errors::CanvasError;
