pub mod artifact;
pub mod config;
pub mod converter;
pub mod metrics;
pub mod pipeline;
pub mod process;
pub mod proxy;
pub mod scheduler;
pub mod testing;

pub use artifact::{Document, DocumentStream, ResultPayload};
pub use config::{
    load_config, load_config_from_str, validate_config, CleanupPolicy, Config, ConfigError,
};
pub use pipeline::{AnnotationPipeline, PipelineError, PipelineOutput, PipelineStatus, RunState};
pub use proxy::{ForwardingProxy, ProxyResponse, UpstreamError};
