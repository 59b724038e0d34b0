use crate::domain::{PipelineError, PipelineResult};
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program plus its arguments, rendered for logs as a shell-like line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Names the output log; follows the wrapped program under a launcher.
    log_stem: String,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let log_stem = Path::new(&program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("command")
            .to_string();
        Self {
            program,
            args: Vec::new(),
            log_stem,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Wraps the command in a process-parallel launcher (`mpirun -np N cmd`).
    pub fn under_launcher(self, launcher: &str, workers: usize) -> Self {
        let mut args = vec!["-np".to_string(), workers.to_string(), self.program];
        args.extend(self.args);
        Self {
            program: launcher.to_string(),
            args,
            log_stem: self.log_stem,
        }
    }

    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn log_name(&self) -> String {
        format!("{}.log", self.log_stem)
    }
}

/// Runs `command` in `working_dir` and blocks until it exits. Output goes to
/// a log file beside the run so a failed directory keeps the model's own
/// diagnostics. Returns the raw exit code, `None` when killed by a signal.
pub fn execute(
    command: &ExternalCommand,
    working_dir: &Path,
    timeout: Option<Duration>,
) -> PipelineResult<Option<i32>> {
    let log_path = working_dir.join(command.log_name());
    let log = File::create(&log_path).map_err(|source| {
        PipelineError::io_system(
            "IO.PROCESS_LOG",
            format!("failed to create process log '{}': {}", log_path.display(), source),
        )
    })?;
    let log_err = log.try_clone().map_err(|source| {
        PipelineError::io_system(
            "IO.PROCESS_LOG",
            format!("failed to share process log '{}': {}", log_path.display(), source),
        )
    })?;

    debug!(command = %command.display_line(), dir = %working_dir.display(), "spawning");
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()
        .map_err(|source| {
            PipelineError::external_process(
                "RUN.PROCESS_SPAWN",
                None,
                format!(
                    "failed to execute '{}': {}",
                    command.display_line(),
                    source
                ),
            )
        })?;

    let status = match timeout {
        Some(limit) => wait_with_timeout(&mut child, command, limit)?,
        None => child.wait().map_err(|source| wait_error(command, source))?,
    };
    Ok(status.code())
}

fn wait_with_timeout(
    child: &mut Child,
    command: &ExternalCommand,
    limit: Duration,
) -> PipelineResult<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(|source| wait_error(command, source))? {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PipelineError::external_process(
                "RUN.PROCESS_TIMEOUT",
                None,
                format!(
                    "'{}' did not finish within {} s and was killed",
                    command.display_line(),
                    limit.as_secs()
                ),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn wait_error(command: &ExternalCommand, source: std::io::Error) -> PipelineError {
    PipelineError::external_process(
        "RUN.PROCESS_WAIT",
        None,
        format!("failed to wait for '{}': {}", command.display_line(), source),
    )
}
