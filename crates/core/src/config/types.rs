use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::process::CommandTemplate;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix for the document routes (e.g. "/tika").
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Upper bound on an inbound document, in bytes.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_path: default_base_path(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_base_path() -> String {
    "/tika".to_string()
}

fn default_max_document_bytes() -> u64 {
    100 * 1024 * 1024
}

/// Upstream HTTP services
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Text-extraction service endpoint (e.g., "http://localhost:9998/rmeta")
    pub extraction_url: String,
    /// Annotation service endpoint, shown on the status page
    pub annotation_url: String,
    /// Connect timeout in seconds (default: 1000)
    #[serde(default = "default_upstream_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds (default: 1000)
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_timeout() -> u64 {
    1000
}

/// What to do with a run directory once the run is over.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Remove after every run.
    Always,
    /// Remove after successful runs, keep failed runs for diagnostics.
    #[default]
    OnSuccess,
    /// Never remove.
    Never,
}

impl CleanupPolicy {
    pub fn should_remove(&self, succeeded: bool) -> bool {
        match self {
            CleanupPolicy::Always => true,
            CleanupPolicy::OnSuccess => succeeded,
            CleanupPolicy::Never => false,
        }
    }
}

/// Annotation pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Directory under which each run gets its own sub-directory.
    #[serde(default = "default_buffer_dir")]
    pub buffer_dir: PathBuf,
    /// Scheduler job description file.
    #[serde(default = "default_job_template")]
    pub job_template: PathBuf,
    /// Installation directory of the output content handler.
    #[serde(default = "default_handler_dir")]
    pub handler_dir: PathBuf,
    /// Suffix the scheduler appends to the input path for its raw output.
    #[serde(default = "default_raw_output_suffix")]
    pub raw_output_suffix: String,
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    /// Kill in-flight subprocesses when the HTTP caller goes away.
    #[serde(default = "default_cancel_on_disconnect")]
    pub cancel_on_disconnect: bool,
    #[serde(default)]
    pub cleanup: CleanupPolicy,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default = "default_scheduler")]
    pub scheduler: ToolCommandConfig,
    #[serde(default = "default_converter")]
    pub converter: ToolCommandConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_dir: default_buffer_dir(),
            job_template: default_job_template(),
            handler_dir: default_handler_dir(),
            raw_output_suffix: default_raw_output_suffix(),
            max_concurrent_runs: default_max_concurrent_runs(),
            cancel_on_disconnect: default_cancel_on_disconnect(),
            cleanup: CleanupPolicy::default(),
            tools: ToolsConfig::default(),
            scheduler: default_scheduler(),
            converter: default_converter(),
        }
    }
}

fn default_buffer_dir() -> PathBuf {
    PathBuf::from("buffer")
}

fn default_job_template() -> PathBuf {
    PathBuf::from("ctakes.job")
}

fn default_handler_dir() -> PathBuf {
    PathBuf::from("CTAKESContentHandler")
}

fn default_raw_output_suffix() -> String {
    ".xml".to_string()
}

fn default_max_concurrent_runs() -> usize {
    4
}

fn default_cancel_on_disconnect() -> bool {
    true
}

fn default_scheduler() -> ToolCommandConfig {
    ToolCommandConfig {
        command: CommandTemplate::new(
            "java",
            [
                "-cp",
                "{scheduler_home}/lib/uima-ducc-cli.jar",
                "org.apache.uima.ducc.cli.DuccJobSubmit",
                "-f",
                "{job_template}",
                "--wait_for_completion",
            ],
        ),
        timeout_secs: Some(1000),
    }
}

fn default_converter() -> ToolCommandConfig {
    ToolCommandConfig {
        command: CommandTemplate::new(
            "java",
            [
                "-cp",
                "{handler_dir}/lib/*:{handler_dir}/config:{annotator_home}/lib/*",
                "CTAKESContentToMetadataHandler",
                "-i",
                "{raw_output}",
                "-o",
                "{output}",
            ],
        ),
        timeout_secs: Some(300),
    }
}

/// Where the external tool installations live.
///
/// Locations are resolved per request: an explicit override wins, otherwise
/// the named environment variable is read at that moment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_scheduler_home_env")]
    pub scheduler_home_env: String,
    #[serde(default = "default_annotator_home_env")]
    pub annotator_home_env: String,
    #[serde(default)]
    pub scheduler_home: Option<PathBuf>,
    #[serde(default)]
    pub annotator_home: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            scheduler_home_env: default_scheduler_home_env(),
            annotator_home_env: default_annotator_home_env(),
            scheduler_home: None,
            annotator_home: None,
        }
    }
}

impl ToolsConfig {
    /// Scheduler installation for a run starting now.
    pub fn resolve_scheduler_home(&self) -> Option<PathBuf> {
        resolve_home(self.scheduler_home.as_ref(), &self.scheduler_home_env)
    }

    /// Annotator installation for a run starting now.
    pub fn resolve_annotator_home(&self) -> Option<PathBuf> {
        resolve_home(self.annotator_home.as_ref(), &self.annotator_home_env)
    }
}

fn resolve_home(explicit: Option<&PathBuf>, env_var: &str) -> Option<PathBuf> {
    explicit.cloned().or_else(|| {
        std::env::var_os(env_var)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

fn default_scheduler_home_env() -> String {
    "DUCC_HOME".to_string()
}

fn default_annotator_home_env() -> String {
    "CTAKES_HOME".to_string()
}

/// An external tool invocation plus its deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCommandConfig {
    #[serde(flatten)]
    pub command: CommandTemplate,
    /// Deadline in seconds; absent means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
