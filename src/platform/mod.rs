// ABOUTME: Container runtime detection for Docker and its compatible alternatives.
// ABOUTME: Detects once per process and caches the result.

mod detection;
mod types;

pub use detection::{PlatformDetector, classify, parse_server_version};
pub use types::{Feature, PlatformInfo, RuntimeKind};
