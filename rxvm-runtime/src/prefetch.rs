//! Single-slot prefetch pipeline
//!
//! A background worker derives the block the execution loop will need in the
//! next iteration while the current iteration runs. Only the newest announced
//! block is ever waited for. Both channels have capacity 1, so the worker
//! holds at most one running and one queued request.
//!
//! ```text
//!   consumer                         worker
//!   prepare_block(a) ── index ──▶    derive_block(a)
//!   ... dispatch ...                      │
//!   get_block(a)     ◀── block ───────────┘
//! ```
//!
//! When `get_block` asks for a different block than the one announced, the
//! block is derived in the calling thread right away. The abandoned request
//! is still answered by the worker; its response is collected later without
//! waiting for it. The returned bytes never depend on which path served them.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::dataset::{block_index, DatasetBlock, DatasetSource};
use crate::error::Result;

/// Pipeline counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrefetchStats {
    /// Blocks announced to the worker
    pub requests: u64,
    /// Announcements dropped because the worker was still busy
    pub skipped: u64,
    /// `get_block` calls served by the worker
    pub hits: u64,
    /// `get_block` calls derived synchronously
    pub misses: u64,
    /// Announced blocks abandoned without being read
    pub discarded: u64,
}

pub struct PrefetchPipeline {
    source: Arc<dyn DatasetSource>,
    requests: Option<SyncSender<u64>>,
    responses: Receiver<(u64, DatasetBlock)>,
    /// Block index of the newest request, while still wanted
    pending: Option<u64>,
    /// Responses still owed for abandoned requests. They precede the
    /// pending response on the channel.
    abandoned: usize,
    stats: PrefetchStats,
    handle: Option<JoinHandle<()>>,
}

impl PrefetchPipeline {
    /// Start the worker thread
    pub fn new(source: Arc<dyn DatasetSource>) -> Result<Self> {
        let (request_tx, request_rx) = sync_channel(1);
        let (response_tx, response_rx) = sync_channel(1);
        let handle = spawn_worker(Arc::clone(&source), request_rx, response_tx)?;
        debug!("prefetch pipeline started");

        Ok(Self {
            source,
            requests: Some(request_tx),
            responses: response_rx,
            pending: None,
            abandoned: 0,
            stats: PrefetchStats::default(),
            handle: Some(handle),
        })
    }

    /// Announce the block containing `address`. Never waits: if the worker
    /// has not yet picked up earlier work the announcement is skipped and the
    /// block will be derived on demand.
    pub fn prepare_block(&mut self, address: u64) {
        let index = block_index(address);
        if self.pending == Some(index) {
            return;
        }
        self.abandon_pending();
        self.collect_abandoned();

        let Some(requests) = self.requests.as_ref() else {
            return;
        };
        match requests.try_send(index) {
            Ok(()) => {
                self.pending = Some(index);
                self.stats.requests += 1;
            }
            Err(TrySendError::Full(_)) => self.stats.skipped += 1,
            Err(TrySendError::Disconnected(_)) => self.worker_gone(),
        }
    }

    /// Block containing `address`. Waits for the worker only when this block
    /// was announced; any other block is derived in the calling thread.
    pub fn get_block(&mut self, address: u64) -> DatasetBlock {
        let index = block_index(address);
        if self.pending == Some(index) {
            self.pending = None;
            if let Some(block) = self.receive(index) {
                self.stats.hits += 1;
                return block;
            }
        } else {
            self.abandon_pending();
            self.collect_abandoned();
        }

        self.stats.misses += 1;
        self.source.derive_block(index)
    }

    pub fn stats(&self) -> PrefetchStats {
        self.stats
    }

    /// Block index in flight, if any
    pub fn pending(&self) -> Option<u64> {
        self.pending
    }

    /// Wait for the response to the pending request, skipping abandoned ones
    fn receive(&mut self, index: u64) -> Option<DatasetBlock> {
        loop {
            match self.responses.recv() {
                Ok(_) if self.abandoned > 0 => self.abandoned -= 1,
                Ok((ready, block)) if ready == index => return Some(block),
                Ok((ready, _)) => {
                    error!(expected = index, received = ready, "prefetch slot out of order");
                    return None;
                }
                Err(_) => {
                    self.worker_gone();
                    return None;
                }
            }
        }
    }

    fn abandon_pending(&mut self) {
        if self.pending.take().is_some() {
            self.abandoned += 1;
            self.stats.discarded += 1;
        }
    }

    /// Drop abandoned responses that are already available
    fn collect_abandoned(&mut self) {
        while self.abandoned > 0 {
            match self.responses.try_recv() {
                Ok(_) => self.abandoned -= 1,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.worker_gone();
                    break;
                }
            }
        }
    }

    fn worker_gone(&mut self) {
        if self.requests.take().is_some() {
            warn!("prefetch worker gone, deriving blocks synchronously");
        }
        self.pending = None;
        self.abandoned = 0;
    }
}

impl Drop for PrefetchPipeline {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop once queued
        // requests are answered
        self.requests.take();
        while self.responses.recv().is_ok() {}

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("prefetch worker panicked");
            } else {
                debug!(
                    hits = self.stats.hits,
                    misses = self.stats.misses,
                    "prefetch pipeline stopped"
                );
            }
        }
    }
}

impl std::fmt::Debug for PrefetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchPipeline")
            .field("pending", &self.pending)
            .field("abandoned", &self.abandoned)
            .field("stats", &self.stats)
            .finish()
    }
}

fn spawn_worker(
    source: Arc<dyn DatasetSource>,
    requests: Receiver<u64>,
    responses: SyncSender<(u64, DatasetBlock)>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rxvm-prefetch".to_string())
        .spawn(move || {
            for index in requests {
                let block = source.derive_block(index);
                if responses.send((index, block)).is_err() {
                    break;
                }
            }
        })
}
