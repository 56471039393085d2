pub mod config;
pub mod delta;
pub mod error;
pub mod pattern;
pub mod traits;
pub mod types;

pub use config::{LoggingConfig, PipelineConfig, ServerConfig, Settings, StoreBackend, StoreConfig};
pub use delta::*;
pub use error::*;
pub use pattern::*;
pub use traits::*;
pub use types::*;
