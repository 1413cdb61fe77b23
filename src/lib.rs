pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipelines;

pub use error::ReplyError;
pub use models::deepseek::DeepSeekModel;
pub use pipelines::normalizer::{normalize, FALLBACK_MESSAGE};

