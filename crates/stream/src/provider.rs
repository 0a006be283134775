use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use railstream_common::AssetHandle;

/// The external loader that actually brings section content in and out of
/// memory.
///
/// Requests are asynchronous: the streaming manager never assumes a load
/// succeeded until `is_ready` says so.
pub trait StreamingProvider {
    fn request_load(&mut self, asset: &AssetHandle);

    fn request_unload(&mut self, asset: &AssetHandle);

    fn is_ready(&self, asset: &AssetHandle) -> bool;

    /// Collect completions. Called once per frame before readiness is
    /// queried.
    fn poll(&mut self, _dt: f32) {}
}

impl<P: StreamingProvider + ?Sized> StreamingProvider for Box<P> {
    fn request_load(&mut self, asset: &AssetHandle) {
        (**self).request_load(asset);
    }

    fn request_unload(&mut self, asset: &AssetHandle) {
        (**self).request_unload(asset);
    }

    fn is_ready(&self, asset: &AssetHandle) -> bool {
        (**self).is_ready(asset)
    }

    fn poll(&mut self, dt: f32) {
        (**self).poll(dt);
    }
}

/// A request as seen by the provider, recorded for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderRequest {
    Load(AssetHandle),
    Unload(AssetHandle),
}

/// Deterministic provider that completes each load after a fixed amount
/// of simulated time.
///
/// A latency of zero completes loads as soon as they are requested.
/// Blocked assets never complete.
#[derive(Debug, Default)]
pub struct LatencyProvider {
    latency: f32,
    pending: BTreeMap<AssetHandle, f32>,
    ready: BTreeSet<AssetHandle>,
    blocked: BTreeSet<AssetHandle>,
    requests: Vec<ProviderRequest>,
}

impl LatencyProvider {
    pub fn new(latency_secs: f32) -> Self {
        Self {
            latency: latency_secs.max(0.0),
            ..Self::default()
        }
    }

    /// Loads complete on request.
    pub fn instant() -> Self {
        Self::new(0.0)
    }

    /// Never complete loads of this asset (until unblocked).
    pub fn block(&mut self, asset: &AssetHandle) {
        self.blocked.insert(asset.clone());
    }

    pub fn unblock(&mut self, asset: &AssetHandle) {
        self.blocked.remove(asset);
        if self.latency == 0.0 && self.pending.remove(asset).is_some() {
            self.ready.insert(asset.clone());
        }
    }

    /// Finish a pending load right now, regardless of latency or blocking.
    pub fn complete(&mut self, asset: &AssetHandle) {
        if self.pending.remove(asset).is_some() {
            self.blocked.remove(asset);
            self.ready.insert(asset.clone());
        }
    }

    pub fn requests(&self) -> &[ProviderRequest] {
        &self.requests
    }

    pub fn load_requests_for(&self, asset: &AssetHandle) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, ProviderRequest::Load(a) if a == asset))
            .count()
    }

    pub fn unload_requests_for(&self, asset: &AssetHandle) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, ProviderRequest::Unload(a) if a == asset))
            .count()
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    pub fn is_pending(&self, asset: &AssetHandle) -> bool {
        self.pending.contains_key(asset)
    }
}

impl StreamingProvider for LatencyProvider {
    fn request_load(&mut self, asset: &AssetHandle) {
        self.requests.push(ProviderRequest::Load(asset.clone()));
        if self.ready.contains(asset) || self.pending.contains_key(asset) {
            return;
        }
        if self.latency == 0.0 && !self.blocked.contains(asset) {
            self.ready.insert(asset.clone());
        } else {
            self.pending.insert(asset.clone(), self.latency);
        }
    }

    fn request_unload(&mut self, asset: &AssetHandle) {
        self.requests.push(ProviderRequest::Unload(asset.clone()));
        self.pending.remove(asset);
        self.ready.remove(asset);
    }

    fn is_ready(&self, asset: &AssetHandle) -> bool {
        self.ready.contains(asset)
    }

    fn poll(&mut self, dt: f32) {
        let mut finished = Vec::new();
        for (asset, remaining) in self.pending.iter_mut() {
            if self.blocked.contains(asset) {
                continue;
            }
            *remaining -= dt;
            if *remaining <= 0.0 {
                finished.push(asset.clone());
            }
        }
        for asset in finished {
            self.pending.remove(&asset);
            self.ready.insert(asset);
        }
    }
}

/// Errors from provider setup.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to spawn streaming worker: {0}")]
    Spawn(#[from] std::io::Error),
}

enum WorkerCommand {
    Load { asset: AssetHandle, ticket: u64 },
    /// Drop a queued load that has not started yet.
    Cancel { ticket: u64 },
    Shutdown,
}

struct Completion {
    asset: AssetHandle,
    ticket: u64,
}

/// Provider that performs loads on a dedicated worker thread.
///
/// The update thread never blocks: requests are sent over a channel and
/// completions are collected in [`StreamingProvider::poll`]. Each load is
/// tagged with a ticket so a completion that arrives after the asset was
/// unloaded (or re-requested) is discarded.
pub struct ThreadedProvider {
    commands: Sender<WorkerCommand>,
    completions: Receiver<Completion>,
    pending: BTreeMap<AssetHandle, u64>,
    ready: BTreeSet<AssetHandle>,
    next_ticket: u64,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedProvider {
    /// Spawn the worker. Every load takes `load_time` on the worker.
    pub fn spawn(load_time: Duration) -> Result<Self, ProviderError> {
        let (command_tx, command_rx) = unbounded::<WorkerCommand>();
        let (done_tx, done_rx) = unbounded::<Completion>();

        let worker = std::thread::Builder::new()
            .name("section-streaming".into())
            .spawn(move || run_worker(&command_rx, &done_tx, load_time))?;

        Ok(Self {
            commands: command_tx,
            completions: done_rx,
            pending: BTreeMap::new(),
            ready: BTreeSet::new(),
            next_ticket: 0,
            worker: Some(worker),
        })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Worker loop. Commands are drained before every load so cancellations
/// and shutdown overtake queued work.
fn run_worker(commands: &Receiver<WorkerCommand>, done: &Sender<Completion>, load_time: Duration) {
    let mut queue: VecDeque<(AssetHandle, u64)> = VecDeque::new();
    loop {
        if queue.is_empty() {
            let Ok(command) = commands.recv() else {
                return;
            };
            if !apply_command(command, &mut queue) {
                return;
            }
        }
        while let Ok(command) = commands.try_recv() {
            if !apply_command(command, &mut queue) {
                tracing::trace!(skipped = queue.len(), "streaming worker shutting down");
                return;
            }
        }

        let Some((asset, ticket)) = queue.pop_front() else {
            continue;
        };
        std::thread::sleep(load_time);
        tracing::trace!(%asset, ticket, "worker finished load");
        if done.send(Completion { asset, ticket }).is_err() {
            return;
        }
    }
}

/// Returns `false` on shutdown.
fn apply_command(command: WorkerCommand, queue: &mut VecDeque<(AssetHandle, u64)>) -> bool {
    match command {
        WorkerCommand::Load { asset, ticket } => queue.push_back((asset, ticket)),
        WorkerCommand::Cancel { ticket } => queue.retain(|&(_, queued)| queued != ticket),
        WorkerCommand::Shutdown => return false,
    }
    true
}

impl StreamingProvider for ThreadedProvider {
    fn request_load(&mut self, asset: &AssetHandle) {
        if self.ready.contains(asset) || self.pending.contains_key(asset) {
            return;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let command = WorkerCommand::Load {
            asset: asset.clone(),
            ticket,
        };
        if self.commands.send(command).is_err() {
            tracing::warn!(%asset, "streaming worker is gone; load dropped");
            return;
        }
        self.pending.insert(asset.clone(), ticket);
    }

    fn request_unload(&mut self, asset: &AssetHandle) {
        if let Some(ticket) = self.pending.remove(asset) {
            // A load already running still completes; `poll` discards it.
            let _ = self.commands.send(WorkerCommand::Cancel { ticket });
        }
        self.ready.remove(asset);
    }

    fn is_ready(&self, asset: &AssetHandle) -> bool {
        self.ready.contains(asset)
    }

    fn poll(&mut self, _dt: f32) {
        while let Ok(done) = self.completions.try_recv() {
            if self.pending.get(&done.asset) == Some(&done.ticket) {
                self.pending.remove(&done.asset);
                self.ready.insert(done.asset);
            }
        }
    }
}

impl Drop for ThreadedProvider {
    fn drop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
