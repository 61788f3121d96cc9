//! Script execution
//!
//! Each script is written into its own temporary directory and run from
//! there. Standard output and standard error share one pipe, which is drained
//! line by line into the log while the process runs.

use std::io::{BufRead, BufReader, PipeReader};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
#[cfg(unix)]
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ScriptKind, ScriptRecord};
use crate::config::Interpreter;
use crate::{Config, ScriptError};

/// Runs resolved scripts one at a time
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    powershell: Interpreter,
    temp_prefix: String,
}

impl ScriptRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            powershell: config.powershell.clone(),
            temp_prefix: config.temp_prefix.clone(),
        }
    }

    /// Run a script and return its exit status
    ///
    /// A non-zero exit is still `Ok`; errors mean the script could not be
    /// written or started. The temporary directory is removed on return.
    pub async fn run(&self, record: &ScriptRecord) -> Result<ExitStatus, ScriptError> {
        let interpreter = match record.kind {
            ScriptKind::Ps1 => Some(&self.powershell),
            ScriptKind::Cmd | ScriptKind::Bat => None,
            ScriptKind::Url => return Err(ScriptError::Unresolved(record.key.clone())),
        };

        let dir = tempfile::Builder::new()
            .prefix(&self.temp_prefix)
            .tempdir()?;
        let path = dir
            .path()
            .join(format!("{}.{}", record.key, file_extension(record.kind)));
        write_script(&path, &record.body).await?;

        let command = match interpreter {
            Some(interpreter) => {
                let mut command = Command::new(&interpreter.program);
                command.args(&interpreter.args).arg(&path);
                command
            }
            None => Command::new(&path),
        };

        debug!("Running {} from {}", record.key, path.display());
        run_command(command, &record.key).await
    }
}

/// Extension of the temp file; both batch kinds run as `.bat`
fn file_extension(kind: ScriptKind) -> &'static str {
    match kind {
        ScriptKind::Ps1 => "ps1",
        ScriptKind::Cmd | ScriptKind::Bat | ScriptKind::Url => "bat",
    }
}

/// Write the body byte for byte; downloaded batch files may not be UTF-8
async fn write_script(path: &Path, body: &[u8]) -> Result<(), ScriptError> {
    fs::write(path, body).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}

/// Spawn `command` with both output streams on one pipe and log each line
async fn run_command(mut command: Command, name: &str) -> Result<ExitStatus, ScriptError> {
    let (reader, writer) = std::io::pipe()?;
    command
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    let mut child = spawn(&mut command).await?;
    // The command still holds the parent's write ends; the reader only sees
    // EOF once they are closed.
    drop(command);

    let label = name.to_string();
    let drain = tokio::task::spawn_blocking(move || log_lines(reader, &label));

    let status = child.wait().await?;
    if let Err(e) = drain.await {
        warn!("Output reader for {} failed: {}", name, e);
    }

    Ok(status)
}

/// Spawn, retrying while the freshly written script is still busy
///
/// Executing a file can fail with ETXTBSY if another thread forked while the
/// script's write handle was open; the handle closes once that child execs.
#[cfg(unix)]
async fn spawn(command: &mut Command) -> std::io::Result<tokio::process::Child> {
    // ETXTBSY is 26 on Linux and macOS
    const ETXTBSY: i32 = 26;
    const MAX_RETRIES: u32 = 5;

    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempts < MAX_RETRIES => {
                attempts += 1;
                debug!("Script busy, retrying spawn ({}/{})", attempts, MAX_RETRIES);
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            result => return result,
        }
    }
}

#[cfg(not(unix))]
async fn spawn(command: &mut Command) -> std::io::Result<tokio::process::Child> {
    command.spawn()
}

/// Forward every line from the pipe to the log until EOF
fn log_lines(reader: PipeReader, name: &str) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                info!("{}: {}", name, line.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                warn!("Failed to read output of {}: {}", name, e);
                break;
            }
        }
    }
}
