//! Supervisor: spawns every shard process and drains their records
//!
//! The supervisor owns the receiving end of the result channel. Its drain
//! loop keeps reading until every shard is dead *and* nothing is left to
//! read, so records written by a shard just before it died are not lost.

mod process;

pub use process::{ShardLaunch, ShardProcess};

use crate::record::FetchRecord;
use crate::ShardError;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How a shard ended
#[derive(Debug, Clone, Copy)]
pub struct ShardExit {
    pub id: u32,
    pub status: Option<ExitStatus>,
}

impl ShardExit {
    /// Returns true unless the shard exited cleanly
    pub fn failed(&self) -> bool {
        !self.status.map_or(false, |s| s.success())
    }
}

/// Spawns and watches `num_shards` shard processes
pub struct Supervisor {
    launch: ShardLaunch,
    num_shards: u32,
    shards: Vec<ShardProcess>,
    sender: Option<UnboundedSender<FetchRecord>>,
    records: UnboundedReceiver<FetchRecord>,
}

impl Supervisor {
    pub fn new(launch: ShardLaunch, num_shards: u32) -> Self {
        let (sender, records) = mpsc::unbounded_channel();
        Self {
            launch,
            num_shards,
            shards: Vec::new(),
            sender: Some(sender),
            records,
        }
    }

    /// Starts one process per shard id in `[0, num_shards)`
    ///
    /// If any spawn fails, the shards already started are killed when the
    /// supervisor is dropped.
    pub fn start(&mut self) -> Result<(), ShardError> {
        let sender = self.sender.take().ok_or_else(|| ShardError::Spawn {
            id: 0,
            message: "supervisor already started".to_string(),
        })?;

        for id in 0..self.num_shards {
            let shard = ShardProcess::spawn(&self.launch, id, self.num_shards, sender.clone())?;
            self.shards.push(shard);
        }

        tracing::info!("Started {} shards", self.num_shards);
        Ok(())
    }

    /// Returns true if shard `id` is still running or still being read
    pub fn is_alive(&mut self, id: u32) -> bool {
        self.shards
            .iter_mut()
            .find(|shard| shard.id() == id)
            .map_or(false, ShardProcess::is_alive)
    }

    /// Ids of the shards still alive
    pub fn alive(&mut self) -> Vec<u32> {
        self.shards
            .iter_mut()
            .filter_map(|shard| shard.is_alive().then(|| shard.id()))
            .collect()
    }

    /// Waits for every shard; `timeout` applies to each shard separately
    ///
    /// A shard still running when its timeout elapses reports no status.
    pub async fn join(&mut self, timeout: Option<Duration>) -> Result<Vec<ShardExit>, ShardError> {
        let mut exits = Vec::with_capacity(self.shards.len());
        for shard in &mut self.shards {
            let status = shard.join(timeout).await?;
            exits.push(ShardExit {
                id: shard.id(),
                status,
            });
        }
        Ok(exits)
    }

    /// Returns a record if one is waiting, without blocking
    pub fn try_next_record(&mut self) -> Option<FetchRecord> {
        self.records.try_recv().ok()
    }

    /// Hands every record to `on_record` until all shards are dead and drained
    ///
    /// Records are read in passes `interval` apart. Once every shard reports
    /// not alive, one more pass runs before stopping, which picks up anything
    /// that arrived between the last read and the liveness check.
    pub async fn drain<F>(&mut self, interval: Duration, mut on_record: F) -> Result<Vec<ShardExit>, ShardError>
    where
        F: FnMut(FetchRecord) -> Result<(), ShardError>,
    {
        let mut stop = false;
        loop {
            while let Some(record) = self.try_next_record() {
                on_record(record)?;
            }
            if stop {
                break;
            }
            if self.alive().is_empty() {
                stop = true;
                continue;
            }
            tokio::time::sleep(interval).await;
        }

        Ok(self
            .shards
            .iter()
            .map(|shard| ShardExit {
                id: shard.id(),
                status: shard.exit_status(),
            })
            .collect())
    }

    /// Kills every shard still running
    pub async fn kill_all(&mut self) -> Result<(), ShardError> {
        for shard in &mut self.shards {
            if shard.is_alive() {
                tracing::warn!("Killing shard {}", shard.id());
                shard.kill().await?;
            }
        }
        Ok(())
    }
}
