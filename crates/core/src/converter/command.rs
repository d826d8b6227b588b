//! Converter that shells out to a configured command.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use super::error::ConverterError;
use super::traits::ResultConverter;
use super::types::{ConversionJob, ConversionResult};
use crate::config::{PipelineConfig, ToolCommandConfig, ToolsConfig};
use crate::process::{run_command, RenderedCommand, TemplateVars};

/// Runs a [`ToolCommandConfig`] as the converter, e.g. the cTAKES
/// `CTAKESContentToMetadataHandler -i {raw_output} -o {output}`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    config: ToolCommandConfig,
    tools: ToolsConfig,
    handler_dir: PathBuf,
    job_template: PathBuf,
}

impl CommandConverter {
    pub fn new(
        config: ToolCommandConfig,
        tools: ToolsConfig,
        handler_dir: PathBuf,
        job_template: PathBuf,
    ) -> Self {
        Self {
            config,
            tools,
            handler_dir,
            job_template,
        }
    }

    pub fn from_pipeline_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.converter.clone(),
            config.tools.clone(),
            config.handler_dir.clone(),
            config.job_template.clone(),
        )
    }

    fn deadline(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    fn render(&self, job: &ConversionJob) -> Result<RenderedCommand, ConverterError> {
        let vars = TemplateVars::new()
            .with_optional_path(
                "scheduler_home",
                self.tools.resolve_scheduler_home().as_deref(),
            )
            .with_optional_path(
                "annotator_home",
                self.tools.resolve_annotator_home().as_deref(),
            )
            .with_path("handler_dir", &self.handler_dir)
            .with_path("job_template", &self.job_template)
            .with_path("raw_output", &job.input)
            .with_path("output", &job.output)
            .with_path("run_dir", &job.run_dir)
            .with("run_id", job.run_id.clone());

        Ok(self.config.command.render(&vars)?)
    }
}

#[async_trait]
impl ResultConverter for CommandConverter {
    fn name(&self) -> &str {
        "command"
    }

    async fn convert(&self, job: &ConversionJob) -> Result<ConversionResult, ConverterError> {
        if !tokio::fs::try_exists(&job.input).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: job.input.clone(),
            });
        }

        let command = self.render(job)?;
        info!(
            run_id = %job.run_id,
            input = %job.input.display(),
            output = %job.output.display(),
            "Converting job output"
        );

        let output = run_command("converter", &command, self.deadline()).await?;

        if !output.success() {
            warn!(
                run_id = %job.run_id,
                exit_code = ?output.exit_code(),
                "Conversion failed"
            );
            return Err(ConverterError::Failed {
                exit_code: output.exit_code(),
                stdout: output.output.stdout,
                stderr: output.output.stderr,
            });
        }

        Ok(ConversionResult {
            run_id: job.run_id.clone(),
            output: job.output.clone(),
            stderr: output.output.stderr,
            duration: output.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandTemplate;

    fn converter(command: CommandTemplate) -> CommandConverter {
        CommandConverter::new(
            ToolCommandConfig {
                command,
                timeout_secs: Some(10),
            },
            ToolsConfig {
                scheduler_home_env: "DOCPIPE_TEST_UNSET_SCHEDULER_HOME".to_string(),
                annotator_home_env: "DOCPIPE_TEST_UNSET_ANNOTATOR_HOME".to_string(),
                scheduler_home: None,
                annotator_home: Some(PathBuf::from("/opt/ctakes")),
            },
            PathBuf::from("/opt/handler"),
            PathBuf::from("/etc/ctakes.job"),
        )
    }

    fn job(dir: &std::path::Path) -> ConversionJob {
        ConversionJob {
            run_id: "run-1".to_string(),
            input: dir.join("document.xml"),
            output: dir.join("document.json"),
            run_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_render_default_shape() {
        let converter = converter(CommandTemplate::new(
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
        ));

        let command = converter
            .render(&job(std::path::Path::new("/buf/run-1")))
            .unwrap();
        assert_eq!(
            command.args,
            vec![
                "-cp",
                "/opt/handler/lib/*:/opt/handler/config:/opt/ctakes/lib/*",
                "CTAKESContentToMetadataHandler",
                "-i",
                "/buf/run-1/document.xml",
                "-o",
                "/buf/run-1/document.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_launch() {
        let temp = tempfile::tempdir().unwrap();
        // Would fail with Launch if it were ever spawned.
        let converter = converter(CommandTemplate::new("/definitely/not/a/program", ["{output}"]));

        let err = converter.convert(&job(temp.path())).await.unwrap_err();
        assert!(matches!(err, ConverterError::InputNotFound { .. }));
    }
}
