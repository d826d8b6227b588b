//! Testing utilities and mock implementations.
//!
//! In-process stand-ins for the scheduler and converter so the pipeline and
//! the HTTP layer can be exercised without DUCC or cTAKES installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use docpipe_core::testing::{MockScheduler, MockConverter, fixtures};
//!
//! let scheduler = Arc::new(MockScheduler::new());
//! let converter = Arc::new(MockConverter::new());
//! converter.set_output(br#"{"entities":[]}"#.to_vec()).await;
//!
//! let pipeline = AnnotationPipeline::new(
//!     fixtures::pipeline_config(temp.path()),
//!     scheduler.clone(),
//!     converter.clone(),
//! );
//! ```

mod mock_converter;
mod mock_scheduler;

pub use mock_converter::MockConverter;
pub use mock_scheduler::MockScheduler;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::{
        CleanupPolicy, Config, PipelineConfig, ServerConfig, ToolCommandConfig, UpstreamConfig,
    };
    use crate::process::CommandTemplate;

    /// Pipeline settings that keep every run directory under `buffer_dir`.
    pub fn pipeline_config(buffer_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            buffer_dir: buffer_dir.to_path_buf(),
            cleanup: CleanupPolicy::Never,
            ..PipelineConfig::default()
        }
    }

    /// A full configuration pointing at the given upstream base URL.
    pub fn config(buffer_dir: &Path, upstream_base: &str) -> Config {
        Config {
            upstream: UpstreamConfig {
                extraction_url: format!("{}/rmeta", upstream_base),
                annotation_url: format!("{}/ctakes", upstream_base),
                connect_timeout_secs: 5,
                timeout_secs: 30,
            },
            server: ServerConfig::default(),
            pipeline: pipeline_config(buffer_dir),
        }
    }

    /// A tool command that runs `script` with `sh -c`.
    ///
    /// Extra `args` are passed as `$1`, `$2`, ... and may use placeholders.
    pub fn sh_command(script: &str, args: &[&str], timeout_secs: Option<u64>) -> ToolCommandConfig {
        let mut all = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
        all.extend(args.iter().map(|a| a.to_string()));
        ToolCommandConfig {
            command: CommandTemplate::new("sh", all),
            timeout_secs,
        }
    }

    /// A small clinical note.
    pub fn clinical_note() -> &'static [u8] {
        b"Patient presents with type 2 diabetes mellitus and hypertension."
    }
}
