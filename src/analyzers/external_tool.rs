//! Optional external analysis tools (`radon`)
//!
//! A tool that is not installed, crashes, or runs past its timeout yields a
//! [`ToolOutcome`] other than a clean exit. Callers log it and fall back to
//! the built-in estimates.

use serde_json::Value as JsonValue;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How one tool invocation ended
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The process exited; `code` is `None` when killed by a signal
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    NotInstalled,
    TimedOut(Duration),
    SpawnFailed(String),
}

impl ToolOutcome {
    /// Exit status 0.
    pub fn succeeded(&self) -> bool {
        matches!(self, ToolOutcome::Exited { code: Some(0), .. })
    }

    /// Stdout parsed as JSON, for a clean exit with non-empty output.
    pub fn json(&self) -> Option<JsonValue> {
        match self {
            ToolOutcome::Exited {
                code: Some(0),
                stdout,
                ..
            } if !stdout.trim().is_empty() => serde_json::from_str(stdout).ok(),
            _ => None,
        }
    }

    /// One-line reason for logs.
    pub fn describe(&self) -> String {
        match self {
            ToolOutcome::Exited { code, stderr, .. } => {
                let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                match stderr.trim().lines().next() {
                    Some(line) => format!("exit status {}: {}", status, line),
                    None => format!("exit status {}", status),
                }
            }
            ToolOutcome::NotInstalled => "not installed".to_string(),
            ToolOutcome::TimedOut(after) => format!("timed out after {}s", after.as_secs()),
            ToolOutcome::SpawnFailed(e) => e.clone(),
        }
    }
}

/// Builder for one tool invocation
#[derive(Debug, Clone)]
pub struct ExternalTool<'a> {
    program: &'a str,
    args: Vec<String>,
    cwd: Option<&'a Path>,
    timeout: Option<Duration>,
}

impl<'a> ExternalTool<'a> {
    pub fn new(program: &'a str) -> Self {
        Self {
            program,
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &'a Path) -> Self {
        self.cwd = Some(dir);
        self
    }

    /// Kill the process after `secs` seconds; 0 waits indefinitely.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then_some(Duration::from_secs(secs));
        self
    }

    pub fn run(&self) -> ToolOutcome {
        debug!("Running {} {:?}", self.program, self.args);
        let mut command = Command::new(self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = self.cwd {
            command.current_dir(dir);
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolOutcome::NotInstalled;
            }
            Err(e) => {
                return ToolOutcome::SpawnFailed(format!("failed to start {}: {}", self.program, e))
            }
        };

        match self.timeout {
            Some(limit) => wait_with_deadline(child, limit),
            None => match child.wait_with_output() {
                Ok(out) => ToolOutcome::Exited {
                    code: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                },
                Err(e) => ToolOutcome::SpawnFailed(format!("failed to wait for {}: {}", self.program, e)),
            },
        }
    }
}

/// Read a pipe to the end on its own thread; a full pipe buffer would
/// otherwise stall the child while we poll it.
fn collect<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_with_deadline(mut child: Child, limit: Duration) -> ToolOutcome {
    let stdout = collect(child.stdout.take());
    let stderr = collect(child.stderr.take());
    let started = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return ToolOutcome::Exited {
                    code: status.code(),
                    stdout: stdout.join().unwrap_or_default(),
                    stderr: stderr.join().unwrap_or_default(),
                };
            }
            Ok(None) if started.elapsed() > limit => {
                let _ = child.kill();
                let _ = child.wait();
                return ToolOutcome::TimedOut(limit);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return ToolOutcome::SpawnFailed(format!("failed to wait: {}", e)),
        }
    }
}

/// True if `program --version` runs and exits 0.
pub fn is_installed(program: &str) -> bool {
    ExternalTool::new(program)
        .args(["--version"])
        .timeout_secs(10)
        .run()
        .succeeded()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: Option<i32>, stdout: &str, stderr: &str) -> ToolOutcome {
        ToolOutcome::Exited {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn test_outcome_json() {
        assert_eq!(
            exited(Some(0), r#"{"a.py": []}"#, "").json().unwrap()["a.py"],
            serde_json::json!([])
        );
        assert!(exited(Some(0), "not json", "").json().is_none());
        assert!(exited(Some(0), "  \n", "").json().is_none());
        assert!(exited(Some(1), r#"{"a": 1}"#, "").json().is_none());
        assert!(ToolOutcome::NotInstalled.json().is_none());
    }

    #[test]
    fn test_outcome_describe() {
        assert!(!exited(Some(2), "", "").succeeded());
        assert_eq!(
            exited(Some(2), "", "bad flag\nusage: ...").describe(),
            "exit status 2: bad flag"
        );
        assert_eq!(exited(None, "", "").describe(), "exit status signal");
        assert_eq!(
            ToolOutcome::TimedOut(Duration::from_secs(3)).describe(),
            "timed out after 3s"
        );
    }

    #[test]
    fn test_missing_tool() {
        let outcome = ExternalTool::new("repoq-definitely-not-installed")
            .args(["cc", "-j"])
            .timeout_secs(5)
            .run();
        assert_eq!(outcome, ToolOutcome::NotInstalled);
        assert!(!is_installed("repoq-definitely-not-installed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_and_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let ok = ExternalTool::new("sh")
            .args(["-c", "pwd; echo oops >&2"])
            .current_dir(dir.path())
            .run();
        assert!(ok.succeeded());
        let ToolOutcome::Exited { stdout, stderr, .. } = &ok else {
            panic!("expected exit");
        };
        assert!(!stdout.trim().is_empty());
        assert_eq!(stderr.trim(), "oops");

        let slow = ExternalTool::new("sh")
            .args(["-c", "sleep 5"])
            .timeout_secs(1)
            .run();
        assert_eq!(slow, ToolOutcome::TimedOut(Duration::from_secs(1)));
    }
}
