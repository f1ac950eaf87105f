//! Background LOD building
//!
//! Simplification runs on the rayon pool and only produces plain arrays.
//! Results travel back over a channel and are turned into GPU meshes by
//! whoever drains [`LodBuilder::poll_completed`] on the render thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::asset::AssetId;
use crate::core::Error;
use super::level::LodMeshData;
use super::simplify::{build_lod_levels, LodConfig, LodInput};

/// Shared cancellation flag checked between units of work
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One terrain to simplify
#[derive(Clone, Debug)]
pub struct LodJob {
    pub terrain: AssetId,
    pub input: LodInput,
}

/// Finished levels (1..) for one terrain
#[derive(Debug)]
pub struct LodResult {
    pub terrain: AssetId,
    /// Height revision the levels were simplified from
    pub revision: u64,
    pub levels: Vec<Vec<LodMeshData>>,
}

/// Runs LOD simplification off the render thread
pub struct LodBuilder {
    config: LodConfig,
    cancel: CancelToken,
    pending: Arc<AtomicUsize>,
    sender: UnboundedSender<LodResult>,
    receiver: UnboundedReceiver<LodResult>,
}

impl LodBuilder {
    pub fn new(config: LodConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            cancel: CancelToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            sender,
            receiver,
        }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    /// Queue a batch of terrains. The batch runs as one rayon task.
    pub fn request(&mut self, jobs: Vec<LodJob>) {
        if jobs.is_empty() {
            return;
        }

        log::info!("Building LODs for {} terrain(s)", jobs.len());
        self.pending.fetch_add(jobs.len(), Ordering::AcqRel);

        let config = self.config.clone();
        let cancel = self.cancel.clone();
        let pending = Arc::clone(&self.pending);
        let sender = self.sender.clone();

        rayon::spawn(move || run_batch(jobs, &config, &cancel, &pending, &sender));
    }

    /// Drain finished results. Call on the render thread.
    pub fn poll_completed(&mut self) -> Vec<LodResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }
        results
    }

    /// Cancel all queued and running work.
    ///
    /// Finished results stay in the channel. Later requests use a fresh token.
    pub fn cancel_all(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
    }

    /// Terrains queued or running that have not finished yet
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Build every job in order, sending finished terrains to `sender`.
///
/// Once `cancel` is set the remaining jobs are skipped and a terrain caught
/// mid-build is dropped. `pending` is decremented for every job either way.
fn run_batch(
    jobs: Vec<LodJob>,
    config: &LodConfig,
    cancel: &CancelToken,
    pending: &AtomicUsize,
    sender: &UnboundedSender<LodResult>,
) {
    let total = jobs.len();
    for (done, job) in jobs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("LOD build cancelled, {} terrain(s) skipped", total - done);
            pending.fetch_sub(total - done, Ordering::AcqRel);
            return;
        }

        match build_lod_levels(&job.input, config, cancel) {
            Ok(levels) => {
                log::debug!("LODs ready for terrain {} ({} levels)", job.terrain, levels.len());
                // The receiver only disappears with the builder itself
                let _ = sender.send(LodResult {
                    terrain: job.terrain,
                    revision: job.input.revision,
                    levels,
                });
            }
            Err(Error::Cancelled) => {
                log::debug!("Discarding partial LODs for terrain {}", job.terrain);
            }
            Err(e) => {
                log::error!("LOD build failed for terrain {}: {}", job.terrain, e);
            }
        }
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Default for LodBuilder {
    fn default() -> Self {
        Self::new(LodConfig::default())
    }
}
