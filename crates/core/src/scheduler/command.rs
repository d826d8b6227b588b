//! Scheduler client that shells out to a configured submission command.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::SchedulerError;
use super::traits::JobScheduler;
use super::types::{JobDescriptor, JobRun};
use crate::config::{PipelineConfig, ToolCommandConfig, ToolsConfig};
use crate::process::{render_text, run_command, RenderedCommand, TemplateVars};

/// Environment variables exported to the submission command.
pub const ENV_INPUT: &str = "DOCPIPE_INPUT";
pub const ENV_RAW_OUTPUT: &str = "DOCPIPE_RAW_OUTPUT";
pub const ENV_RUN_ID: &str = "DOCPIPE_RUN_ID";

/// Name of the per-run job file rendered from the configured job template.
pub const JOB_FILE_NAME: &str = "submit.job";

/// Runs a [`ToolCommandConfig`] as the job submission command, e.g. DUCC's
/// `DuccJobSubmit --wait_for_completion`.
#[derive(Debug, Clone)]
pub struct CommandScheduler {
    config: ToolCommandConfig,
    tools: ToolsConfig,
    handler_dir: PathBuf,
}

impl CommandScheduler {
    pub fn new(config: ToolCommandConfig, tools: ToolsConfig, handler_dir: PathBuf) -> Self {
        Self {
            config,
            tools,
            handler_dir,
        }
    }

    pub fn from_pipeline_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.scheduler.clone(),
            config.tools.clone(),
            config.handler_dir.clone(),
        )
    }

    fn deadline(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    fn vars(&self, descriptor: &JobDescriptor, job_file: &Path) -> TemplateVars {
        TemplateVars::new()
            .with_optional_path(
                "scheduler_home",
                self.tools.resolve_scheduler_home().as_deref(),
            )
            .with_optional_path(
                "annotator_home",
                self.tools.resolve_annotator_home().as_deref(),
            )
            .with_path("handler_dir", &self.handler_dir)
            .with_path("job_template", job_file)
            .with_path("input", &descriptor.input)
            .with_path("raw_output", &descriptor.raw_output)
            .with_path("run_dir", &descriptor.run_dir)
            .with("run_id", descriptor.run_id.clone())
    }

    /// Renders the submission command. `{job_template}` resolves to `job_file`.
    fn render(
        &self,
        descriptor: &JobDescriptor,
        job_file: &Path,
    ) -> Result<RenderedCommand, SchedulerError> {
        let vars = self.vars(descriptor, job_file);

        let command = self
            .config
            .command
            .render(&vars)?
            .with_env(ENV_INPUT, path_value(&vars, "input"))
            .with_env(ENV_RAW_OUTPUT, path_value(&vars, "raw_output"))
            .with_env(ENV_RUN_ID, descriptor.run_id.clone())
            .with_current_dir(path_value(&vars, "run_dir"));

        Ok(command)
    }

    /// Writes this run's job file into its run directory and returns the
    /// command that submits it.
    ///
    /// The job file is the configured job template with this run's paths
    /// substituted, so no two runs submit the same file.
    async fn prepare(&self, descriptor: &JobDescriptor) -> Result<RenderedCommand, SchedulerError> {
        let job_file = descriptor.run_dir.join(JOB_FILE_NAME);
        let command = self.render(descriptor, &job_file)?;

        let template = tokio::fs::read_to_string(&descriptor.job_template)
            .await
            .map_err(|e| SchedulerError::Launch {
                reason: format!(
                    "Failed to read job template {}: {}",
                    descriptor.job_template.display(),
                    e
                ),
            })?;
        let job = render_text(&template, &self.vars(descriptor, &job_file))?;

        tokio::fs::write(&job_file, job)
            .await
            .map_err(|e| SchedulerError::Launch {
                reason: format!("Failed to write job file {}: {}", job_file.display(), e),
            })?;
        debug!(run_id = %descriptor.run_id, job_file = %job_file.display(), "Rendered job file");

        Ok(command)
    }
}

fn path_value(vars: &TemplateVars, name: &str) -> String {
    vars.get(name).unwrap_or_default().to_string()
}

#[async_trait]
impl JobScheduler for CommandScheduler {
    fn name(&self) -> &str {
        "command"
    }

    async fn submit(&self, descriptor: &JobDescriptor) -> Result<JobRun, SchedulerError> {
        let command = self.prepare(descriptor).await?;
        info!(
            run_id = %descriptor.run_id,
            job_template = %descriptor.job_template.display(),
            "Submitting annotation job"
        );

        let output = run_command("scheduler", &command, self.deadline()).await?;

        if !output.success() {
            warn!(
                run_id = %descriptor.run_id,
                exit_code = ?output.exit_code(),
                "Annotation job failed"
            );
            return Err(SchedulerError::Failed {
                exit_code: output.exit_code(),
                stdout: output.output.stdout,
                stderr: output.output.stderr,
            });
        }

        Ok(JobRun {
            run_id: descriptor.run_id.clone(),
            raw_output: descriptor.raw_output.clone(),
            exit_code: output.exit_code(),
            output: output.output,
            duration: output.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandTemplate;

    fn descriptor(run_dir: &Path) -> JobDescriptor {
        JobDescriptor {
            run_id: "run-1".to_string(),
            job_template: run_dir.join("ctakes.job"),
            input: run_dir.join("document"),
            raw_output: run_dir.join("document.xml"),
            run_dir: run_dir.to_path_buf(),
        }
    }

    fn tools_without_homes() -> ToolsConfig {
        ToolsConfig {
            scheduler_home_env: "DOCPIPE_TEST_UNSET_SCHEDULER_HOME".to_string(),
            annotator_home_env: "DOCPIPE_TEST_UNSET_ANNOTATOR_HOME".to_string(),
            scheduler_home: None,
            annotator_home: None,
        }
    }

    #[test]
    fn test_render_exports_run_paths() {
        let scheduler = CommandScheduler::new(
            ToolCommandConfig {
                command: CommandTemplate::new("submit", ["-f", "{job_template}", "{run_id}"]),
                timeout_secs: Some(10),
            },
            tools_without_homes(),
            PathBuf::from("/handler"),
        );

        let run_dir = Path::new("/buf/run-1");
        let command = scheduler
            .render(&descriptor(run_dir), &run_dir.join(JOB_FILE_NAME))
            .unwrap();
        assert_eq!(command.args, vec!["-f", "/buf/run-1/submit.job", "run-1"]);
        assert!(command
            .env
            .contains(&(ENV_INPUT.to_string(), "/buf/run-1/document".to_string())));
        assert!(command
            .env
            .contains(&(ENV_RAW_OUTPUT.to_string(), "/buf/run-1/document.xml".to_string())));
        assert!(command
            .env
            .contains(&(ENV_RUN_ID.to_string(), "run-1".to_string())));
        assert_eq!(command.current_dir, Some(PathBuf::from("/buf/run-1")));
    }

    #[tokio::test]
    async fn test_default_submission_references_staged_document() {
        let temp = tempfile::tempdir().unwrap();
        let template = temp.path().join("ctakes.job");
        std::fs::write(
            &template,
            "process_descriptor_CR_overrides InputFile={input}\n\
             process_descriptor_CC_overrides OutputFile={raw_output}\n",
        )
        .unwrap();
        let run_dir = temp.path().join("r1");
        std::fs::create_dir(&run_dir).unwrap();

        let mut tools = tools_without_homes();
        tools.scheduler_home = Some(PathBuf::from("/opt/ducc"));
        let scheduler = CommandScheduler::new(
            PipelineConfig::default().scheduler,
            tools,
            PathBuf::from("/handler"),
        );
        let mut descriptor = descriptor(&run_dir);
        descriptor.job_template = template.clone();

        let command = scheduler.prepare(&descriptor).await.unwrap();

        let job_file = run_dir.join(JOB_FILE_NAME);
        let flag = command.args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(command.args[flag + 1], job_file.to_string_lossy());
        assert!(command
            .args
            .iter()
            .all(|a| a != &template.to_string_lossy()));

        let job = std::fs::read_to_string(&job_file).unwrap();
        assert!(job.contains(&format!("InputFile={}", run_dir.join("document").display())));
        assert!(job.contains(&format!(
            "OutputFile={}",
            run_dir.join("document.xml").display()
        )));
    }

    #[tokio::test]
    async fn test_missing_job_template_is_launch_error() {
        let temp = tempfile::tempdir().unwrap();
        let scheduler = CommandScheduler::new(
            ToolCommandConfig {
                command: CommandTemplate::new("submit", ["-f", "{job_template}"]),
                timeout_secs: None,
            },
            tools_without_homes(),
            PathBuf::from("/handler"),
        );

        let err = scheduler.submit(&descriptor(temp.path())).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Launch { ref reason } if reason.contains("job template")));
        assert!(!temp.path().join(JOB_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_missing_scheduler_home_is_launch_error() {
        let scheduler = CommandScheduler::new(
            ToolCommandConfig {
                command: CommandTemplate::new("java", ["-cp", "{scheduler_home}/lib/cli.jar"]),
                timeout_secs: None,
            },
            tools_without_homes(),
            PathBuf::from("/handler"),
        );

        let err = scheduler
            .submit(&descriptor(Path::new("/buf/run-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Launch { ref reason } if reason.contains("scheduler_home")));
    }
}
