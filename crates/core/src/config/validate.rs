use super::{types::Config, ConfigError};
use crate::process::PLACEHOLDERS;

/// Validate configuration
/// Currently validates:
/// - Upstream section exists (enforced by serde) and its URLs are http(s)
/// - Server port is not 0, base path is rooted
/// - Pipeline limits are non-zero and tool programs are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }
    if !config.server.base_path.starts_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "server.base_path must start with '/': {}",
            config.server.base_path
        )));
    }
    if config.server.base_path.len() > 1 && config.server.base_path.ends_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "server.base_path must not end with '/': {}",
            config.server.base_path
        )));
    }
    if config.server.base_path == "/" {
        return Err(ConfigError::ValidationError(
            "server.base_path cannot be '/'".to_string(),
        ));
    }
    if config.server.max_document_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_document_bytes cannot be 0".to_string(),
        ));
    }

    // Upstream validation
    for (name, url) in [
        ("upstream.extraction_url", &config.upstream.extraction_url),
        ("upstream.annotation_url", &config.upstream.annotation_url),
    ] {
        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an http(s) URL: '{}'",
                    name, url
                )))
            }
        }
    }

    // Pipeline validation
    let pipeline = &config.pipeline;
    if pipeline.max_concurrent_runs == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_runs cannot be 0".to_string(),
        ));
    }
    if pipeline.max_concurrent_runs > tokio::sync::Semaphore::MAX_PERMITS {
        return Err(ConfigError::ValidationError(format!(
            "pipeline.max_concurrent_runs cannot exceed {}",
            tokio::sync::Semaphore::MAX_PERMITS
        )));
    }
    if pipeline.scheduler.command.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "pipeline.scheduler.program cannot be empty".to_string(),
        ));
    }
    if pipeline.converter.command.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "pipeline.converter.program cannot be empty".to_string(),
        ));
    }
    for (name, tool) in [
        ("pipeline.scheduler", &pipeline.scheduler),
        ("pipeline.converter", &pipeline.converter),
    ] {
        if let Some(unknown) = tool
            .command
            .referenced()
            .into_iter()
            .find(|p| !PLACEHOLDERS.contains(&p.as_str()))
        {
            return Err(ConfigError::ValidationError(format!(
                "{} references unknown placeholder {{{}}}",
                name, unknown
            )));
        }
    }

    Ok(())
}
