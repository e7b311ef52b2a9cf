use crate::error::{WifiError, WifiResult};
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit code and trimmed output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs with an argument vector (no shell involved)
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> WifiResult<CommandOutput>;

    /// Run and return stdout, failing unless the exit code is in `expect`
    fn run_checked(&self, program: &str, args: &[&str], expect: &[i32]) -> WifiResult<String> {
        let output = self.run(program, args)?;
        if expect.contains(&output.code) {
            return Ok(output.stdout);
        }

        let detail = if output.stderr.is_empty() {
            output.stdout
        } else {
            output.stderr
        };
        Err(WifiError::CommandExit {
            command: command_line(program, args),
            code: output.code,
            output: detail,
        })
    }
}

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Kill commands still running after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    fn run_bounded(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> WifiResult<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take().map(read_pipe);
        let stderr = child.stderr.take().map(read_pipe);

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let command = command_line(program, args);
                warn!("Killing `{}` after {:?}", command, timeout);
                // Already exited between the poll and the kill
                let _ = child.kill();
                child.wait()?;
                return Err(WifiError::CommandTimeout { command, timeout });
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(CommandOutput {
            code: exit_code(status),
            stdout: normalize(&collect(stdout)),
            stderr: normalize(&collect(stderr)),
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> WifiResult<CommandOutput> {
        debug!(command = %command_line(program, args), "Running");
        if let Some(timeout) = self.timeout {
            return self.run_bounded(program, args, timeout);
        }

        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            code: exit_code(output.status),
            stdout: normalize(&output.stdout),
            stderr: normalize(&output.stderr),
        })
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    // Killed by a signal
    status.code().unwrap_or(-1)
}

fn read_pipe(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut raw = Vec::new();
        // A read error keeps whatever arrived before it
        let _ = pipe.read_to_end(&mut raw);
        raw
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn normalize(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace("\r\n", "\n")
        .trim()
        .to_string()
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(test)]
mod tests {
    use super::testing::FakeRunner;
    use super::*;

    #[test]
    fn run_checked_honours_allow_list() {
        let runner = FakeRunner::new(|_| CommandOutput {
            code: 2,
            stdout: String::new(),
            stderr: "RTNETLINK answers: File exists".to_string(),
        });

        assert_eq!(runner.run_checked("ip", &["link"], &[0, 2]).unwrap(), "");

        match runner.run_checked("ip", &["link", "add"], &[0]) {
            Err(WifiError::CommandExit {
                command,
                code,
                output,
            }) => {
                assert_eq!(command, "ip link add");
                assert_eq!(code, 2);
                assert_eq!(output, "RTNETLINK answers: File exists");
            }
            other => panic!("expected CommandExit, got {other:?}"),
        }
    }

    #[test]
    fn system_runner_captures_output() {
        let output = SystemRunner::default()
            .run("sh", &["-c", "printf ' hello \\r\\n'; exit 3"])
            .unwrap();
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout, "hello");
    }

    #[test]
    fn bounded_runner_captures_both_streams() {
        let runner = SystemRunner::with_timeout(Duration::from_secs(5));
        let output = runner
            .run("sh", &["-c", "echo out; echo err >&2; exit 1"])
            .unwrap();
        assert_eq!(
            output,
            CommandOutput {
                code: 1,
                stdout: "out".to_string(),
                stderr: "err".to_string(),
            }
        );
    }

    #[test]
    fn bounded_runner_kills_slow_commands() {
        let runner = SystemRunner::with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        match runner.run("sleep", &["5"]) {
            Err(WifiError::CommandTimeout { command, timeout }) => {
                assert_eq!(command, "sleep 5");
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected CommandTimeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
