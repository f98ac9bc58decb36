//! External process execution.
//!
//! Every external acquisition operation (listing, metadata lookup, caption
//! and audio download) goes through the [`ProcessRunner`] trait so that the
//! pipeline's control logic stays decoupled from any particular tool and
//! testable without one.

use crate::error::{Result, SkrybaError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a finished external process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, or -1 if the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty, whitespace-trimmed stdout lines.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/// Executes an external command with a hard timeout and captured output.
///
/// A non-zero exit is not an error at this layer; callers inspect the
/// [`ProcessOutput`] and classify failures themselves. Timeouts surface as
/// [`SkrybaError::Transient`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<ProcessOutput>;
}

/// Production runner backed by `tokio::process`.
pub struct ToolRunner;

#[async_trait]
impl ProcessRunner for ToolRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<ProcessOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SkrybaError::ToolNotFound(program.to_string()));
            }
            Err(e) => return Err(SkrybaError::Io(e)),
        };

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("{} timed out after {:?}", program, timeout);
                return Err(SkrybaError::Transient(format!(
                    "{} timed out after {}s",
                    program,
                    timeout.as_secs()
                )));
            }
        };

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`ProcessRunner`] double shared by the crate's tests.

    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// One scripted invocation result.
    pub struct Scripted {
        pub result: Result<ProcessOutput>,
        /// File to create under the parent of the path following a `-o`
        /// argument, mimicking a tool that writes output files.
        pub creates_file: Option<String>,
    }

    impl Scripted {
        pub fn ok(stdout: &str) -> Self {
            Self {
                result: Ok(ProcessOutput {
                    exit_code: 0,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                }),
                creates_file: None,
            }
        }

        pub fn fails(exit_code: i32, stderr: &str) -> Self {
            Self {
                result: Ok(ProcessOutput {
                    exit_code,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                }),
                creates_file: None,
            }
        }

        pub fn err(e: SkrybaError) -> Self {
            Self {
                result: Err(e),
                creates_file: None,
            }
        }

        pub fn with_file(mut self, name: &str) -> Self {
            self.creates_file = Some(name.to_string());
            self
        }
    }

    /// Replays scripted responses in order and records every invocation.
    pub struct MockRunner {
        script: Mutex<VecDeque<Scripted>>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl MockRunner {
        pub fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn output_dir(args: &[String]) -> Option<PathBuf> {
            let idx = args.iter().position(|a| a == "-o")?;
            let template = args.get(idx + 1)?;
            PathBuf::from(template).parent().map(|p| p.to_path_buf())
        }
    }

    #[async_trait]
    impl ProcessRunner for MockRunner {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            _timeout: Duration,
        ) -> Result<ProcessOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.lock().unwrap().push(call);

            let scripted = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected invocation: {} {:?}", program, args));

            if let Some(name) = &scripted.creates_file {
                let dir = Self::output_dir(args).expect("scripted file without -o argument");
                std::fs::write(dir.join(name), b"stub").unwrap();
            }

            scripted.result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runner_captures_output() {
        let runner = ToolRunner;
        let out = runner
            .run("echo", &["hello".to_string()], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_runner_missing_tool() {
        let runner = ToolRunner;
        let err = runner
            .run("skryba-no-such-tool", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SkrybaError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_runner_timeout_is_transient() {
        let runner = ToolRunner;
        let err = runner
            .run("sleep", &["5".to_string()], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_stdout_lines() {
        let out = ProcessOutput {
            exit_code: 0,
            stdout: "a\n\n  b \n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(out.stdout_lines(), vec!["a", "b"]);
    }
}
