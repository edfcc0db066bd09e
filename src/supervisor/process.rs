//! Shard child processes
//!
//! Each shard runs as a child process of the supervisor. The child writes one
//! JSON record per line to stdout; a reader task forwards every parsed record
//! into the supervisor's channel.

use crate::record::FetchRecord;
use crate::ShardError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// How to start a shard process
///
/// The supervisor appends `--shard-id <i> --num-shards <n>` to `args`.
#[derive(Debug, Clone)]
pub struct ShardLaunch {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ShardLaunch {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn command(&self, id: u32, num_shards: u32) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--shard-id")
            .arg(id.to_string())
            .arg("--num-shards")
            .arg(num_shards.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

/// A running (or finished) shard child process
pub struct ShardProcess {
    id: u32,
    child: Child,
    reader: Option<JoinHandle<()>>,
    exit: Option<ExitStatus>,
}

impl ShardProcess {
    /// Starts shard `id` and begins forwarding its records into `records`
    pub fn spawn(
        launch: &ShardLaunch,
        id: u32,
        num_shards: u32,
        records: UnboundedSender<FetchRecord>,
    ) -> Result<Self, ShardError> {
        let mut child = launch
            .command(id, num_shards)
            .spawn()
            .map_err(|e| ShardError::Spawn {
                id,
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ShardError::Spawn {
            id,
            message: "stdout was not captured".to_string(),
        })?;
        let reader = tokio::spawn(forward_records(id, stdout, records));

        tracing::info!("Started shard {} (pid {:?})", id, child.id());

        Ok(Self {
            id,
            child,
            reader: Some(reader),
            exit: None,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Exit status, once the process has been observed to exit
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Returns true while the process runs or its output is still being read
    ///
    /// A shard whose process has exited but whose last lines have not yet been
    /// forwarded still counts as alive, so the drain loop cannot stop early.
    pub fn is_alive(&mut self) -> bool {
        if self.exit.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.log_exit(status);
                    self.exit = Some(status);
                }
                Ok(None) => return true,
                Err(e) => {
                    tracing::warn!("Failed to poll shard {}: {}", self.id, e);
                    return true;
                }
            }
        }

        self.reader
            .as_ref()
            .map_or(false, |reader| !reader.is_finished())
    }

    /// Waits for the process to exit and its output to be fully forwarded
    ///
    /// Returns `Ok(None)` if `timeout` elapses first; the process keeps running.
    pub async fn join(&mut self, timeout: Option<Duration>) -> Result<Option<ExitStatus>, ShardError> {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.wait()).await {
                Ok(status) => status.map(Some),
                Err(_) => Ok(None),
            },
            None => self.wait().await.map(Some),
        }
    }

    /// Terminates the process abruptly; buffered output may be lost
    pub async fn kill(&mut self) -> Result<(), ShardError> {
        self.child.kill().await?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<ExitStatus, ShardError> {
        let status = self.child.wait().await?;
        if self.exit.is_none() {
            self.log_exit(status);
            self.exit = Some(status);
        }

        if let Some(reader) = self.reader.as_mut() {
            if let Err(e) = reader.await {
                tracing::warn!("Record reader for shard {} failed: {}", self.id, e);
            }
        }
        self.reader = None;

        Ok(status)
    }

    fn log_exit(&self, status: ExitStatus) {
        if status.success() {
            tracing::info!("Shard {} exited", self.id);
        } else {
            tracing::warn!("Shard {} died: {}", self.id, status);
        }
    }
}

/// Parses JSON lines from a shard's stdout until it closes
async fn forward_records(id: u32, stdout: ChildStdout, records: UnboundedSender<FetchRecord>) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<FetchRecord>(&line) {
                    Ok(record) => {
                        if records.send(record).is_err() {
                            tracing::warn!("Supervisor stopped listening to shard {}", id);
                            return;
                        }
                    }
                    Err(e) => tracing::warn!("Shard {} wrote an unreadable record: {}", id, e),
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Lost output of shard {}: {}", id, e);
                return;
            }
        }
    }
}
