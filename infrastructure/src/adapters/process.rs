//! Process backend: one child process per call
//!
//! Arguments are rendered from `{{param}}` templates, the configured
//! environment is overlaid on the inherited one, and the call is bounded by
//! the tool's timeout. Children are killed when the call is abandoned.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use argos_application::ports::tool_backend::{AdapterError, ToolBackendAdapter};
use argos_domain::tool::{
    entities::{ExecutionContext, Parameters, ProcessConfig, ToolDefinition, TransportConfig, TransportType},
    template::render_args,
    value_objects::ToolExecutionResult,
};
use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, info};

use super::{DEFAULT_TIMEOUT_MS, timeout_for};

pub struct ProcessAdapter {
    initialized: AtomicBool,
    default_timeout_ms: u64,
}

impl ProcessAdapter {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    fn command(config: &ProcessConfig, params: &Parameters) -> Command {
        let mut cmd = Command::new(&config.command);
        cmd.args(render_args(&config.args, params))
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }

        // Linux: the kernel terminates the child if we die without running Drop.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        cmd
    }

    async fn run(&self, tool: &ToolDefinition, config: &ProcessConfig, params: &Parameters) -> ToolExecutionResult {
        let timeout = timeout_for(config.timeout_ms, self.default_timeout_ms);
        let mut cmd = Self::command(config, params);
        debug!(tool = %tool.name, command = %config.command, "Spawning tool process");

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ToolExecutionResult::error(
                    &tool.name,
                    TransportType::Process,
                    format!("Failed to execute command: {}", e),
                );
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ToolExecutionResult::error(
                    &tool.name,
                    TransportType::Process,
                    format!("Failed to execute command: {}", e),
                );
            }
            Err(_) => {
                return ToolExecutionResult::timeout(
                    &tool.name,
                    TransportType::Process,
                    format!("Command timed out after {}ms", timeout.as_millis()),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code().unwrap_or(-1);

        if output.status.success() {
            ToolExecutionResult::success(
                &tool.name,
                TransportType::Process,
                json!({ "stdout": stdout, "stderr": stderr, "exit_code": exit_code }),
            )
        } else {
            ToolExecutionResult::error(
                &tool.name,
                TransportType::Process,
                format!(
                    "Command exited with code {}\nstdout: {}\nstderr: {}",
                    exit_code, stdout, stderr
                ),
            )
            .with_details(json!({ "stdout": stdout, "stderr": stderr, "exit_code": exit_code }))
        }
    }
}

impl Default for ProcessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolBackendAdapter for ProcessAdapter {
    fn transport(&self) -> TransportType {
        TransportType::Process
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        info!("Process adapter ready");
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(
        &self,
        tool: &ToolDefinition,
        params: &Parameters,
        _context: Option<&ExecutionContext>,
    ) -> ToolExecutionResult {
        let started = Instant::now();
        let result = match &tool.transport {
            TransportConfig::Process(config) => self.run(tool, config, params).await,
            other => ToolExecutionResult::error(
                &tool.name,
                TransportType::Process,
                format!("Tool {} is not a process tool ({})", tool.name, other.transport_type()),
            ),
        };
        result.with_duration(started.elapsed())
    }

    async fn health_check(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_domain::tool::value_objects::ExecutionStatus;
    use serde_json::Value;

    fn shell_tool(script: &str, timeout_ms: Option<u64>) -> ToolDefinition {
        ToolDefinition::new(
            "test.shell",
            "test",
            "Run a shell snippet",
            TransportConfig::Process(ProcessConfig {
                command: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                timeout_ms,
                ..Default::default()
            }),
        )
    }

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_substitutes_arguments_and_captures_output() {
        let adapter = ProcessAdapter::new();
        let tool = ToolDefinition::new(
            "test.echo",
            "test",
            "Echo",
            TransportConfig::Process(ProcessConfig {
                command: "echo".to_string(),
                args: vec!["--freq={{freq}}".to_string(), "{{label}}".to_string()],
                ..Default::default()
            }),
        );

        let result = adapter
            .execute(&tool, &params(json!({"freq": 915, "label": "ism"})), None)
            .await;

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.backend, TransportType::Process);
        let data = result.data.unwrap();
        assert_eq!(data["stdout"], "--freq=915 ism\n");
        assert_eq!(data["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_environment_overlay() {
        let adapter = ProcessAdapter::new();
        let mut config = ProcessConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "printf %s \"$ARGOS_TEST_VAR\"".to_string()],
            ..Default::default()
        };
        config.env.insert("ARGOS_TEST_VAR".to_string(), "overlaid".to_string());
        let tool = ToolDefinition::new("test.env", "test", "Env", TransportConfig::Process(config));

        let result = adapter.execute(&tool, &Parameters::new(), None).await;

        assert_eq!(result.data.unwrap()["stdout"], "overlaid");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error_with_both_streams() {
        let adapter = ProcessAdapter::new();
        let tool = shell_tool("echo out; echo err >&2; exit 3", None);

        let result = adapter.execute(&tool, &Parameters::new(), None).await;

        assert_eq!(result.status, ExecutionStatus::Error);
        let message = result.error.unwrap();
        assert!(message.starts_with("Command exited with code 3"));
        assert!(message.contains("stdout: out"));
        assert!(message.contains("stderr: err"));
        assert_eq!(result.error_details.unwrap()["exit_code"], 3);
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let adapter = ProcessAdapter::new();
        let tool = shell_tool("sleep 5", Some(100));

        let started = Instant::now();
        let result = adapter.execute(&tool, &Parameters::new(), None).await;

        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert_eq!(result.error.as_deref(), Some("Command timed out after 100ms"));
        assert!(started.elapsed().as_secs() < 5);
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let adapter = ProcessAdapter::new();
        let tool = ToolDefinition::new(
            "test.missing",
            "test",
            "Missing",
            TransportConfig::Process(ProcessConfig {
                command: "argos-definitely-not-installed".to_string(),
                ..Default::default()
            }),
        );

        let result = adapter.execute(&tool, &Parameters::new(), None).await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.error.unwrap().starts_with("Failed to execute command"));
    }

    #[tokio::test]
    async fn test_health_follows_lifecycle() {
        let adapter = ProcessAdapter::new();
        assert!(!adapter.health_check().await);
        adapter.initialize().await.unwrap();
        assert!(adapter.health_check().await);
        adapter.cleanup().await.unwrap();
        assert!(!adapter.health_check().await);
    }
}
