use std::sync::Arc;
use docpipe_core::{AnnotationPipeline, Config, ForwardingProxy, UpstreamError};

/// Shared application state
pub struct AppState {
    config: Config,
    pipeline: Arc<AnnotationPipeline>,
    proxy: ForwardingProxy,
}

impl AppState {
    pub fn new(config: Config, pipeline: Arc<AnnotationPipeline>, proxy: ForwardingProxy) -> Self {
        Self {
            config,
            pipeline,
            proxy,
        }
    }

    /// Builds the pipeline and upstream client described by `config`.
    pub fn from_config(config: Config) -> Result<Self, UpstreamError> {
        let proxy = ForwardingProxy::new(&config.upstream)?;
        let pipeline = Arc::new(AnnotationPipeline::from_config(&config));
        Ok(Self::new(config, pipeline, proxy))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<AnnotationPipeline> {
        &self.pipeline
    }

    pub fn proxy(&self) -> &ForwardingProxy {
        &self.proxy
    }
}
