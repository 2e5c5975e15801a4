//! Background index builds.
//!
//! The [`IndexBuildCoordinator`] owns one worker thread. The interactive thread hands
//! it a [`BuildRequest`] (copies of every mesh's buffers for one model) and later
//! collects exactly one [`BuildResponse`] per accepted request, either every mesh's
//! [`SpatialIndex`] or a failure message. A request never partially succeeds.
//!
//! Nothing here blocks the caller: [`IndexBuildCoordinator::submit`] uses a bounded
//! queue and rejects work when it is full, and responses are polled with
//! [`IndexBuildCoordinator::try_recv`]. A panic while building is caught on the worker
//! and reported as a failure for the requesting model.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use chisel::bvh::coordinator::{BuildRequest, BuildResponse, IndexBuildCoordinator};
//! use chisel::bvh::IndexOptions;
//! use chisel::mesh::primitives;
//!
//! let coordinator = IndexBuildCoordinator::spawn(IndexOptions::default(), 4).unwrap();
//! let mesh = primitives::grid("floor", 8, 1.0);
//! coordinator.submit(BuildRequest::new("scene", vec![mesh.snapshot()])).unwrap();
//!
//! match coordinator.recv_timeout(Duration::from_secs(10)) {
//!     Some(BuildResponse::Complete { meshes, .. }) => assert_eq!(meshes.len(), 1),
//!     other => panic!("unexpected response: {:?}", other),
//! }
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{IndexOptions, SpatialIndex};
use crate::algo::progress::Progress;
use crate::error::{Result, SculptError};
use crate::mesh::{MeshId, MeshPayload, ModelId};

/// Default bound on queued build requests.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// All meshes of one model, to be indexed together.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// The model the meshes belong to.
    pub model_id: ModelId,
    /// Caller-assigned sequence number, echoed in the response.
    pub generation: u64,
    /// Buffer copies, one per mesh.
    pub meshes: Vec<MeshPayload>,
}

impl BuildRequest {
    /// A request with generation 0.
    pub fn new(model_id: impl Into<ModelId>, meshes: Vec<MeshPayload>) -> Self {
        Self {
            model_id: model_id.into(),
            generation: 0,
            meshes,
        }
    }

    /// Set the generation echoed back in the response.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

/// A finished index together with the buffers it was built from.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    /// The snapshot, handed back so the caller can reuse its allocations.
    pub payload: MeshPayload,
    /// The index over `payload`.
    pub index: SpatialIndex,
}

impl BuiltIndex {
    /// The mesh this index belongs to.
    pub fn mesh_id(&self) -> &MeshId {
        &self.payload.mesh_id
    }
}

/// Outcome of one [`BuildRequest`].
#[derive(Debug)]
pub enum BuildResponse {
    /// Every mesh in the request was indexed.
    Complete {
        /// The requesting model.
        model_id: ModelId,
        /// Generation of the request.
        generation: u64,
        /// One entry per requested mesh, in request order.
        meshes: Vec<BuiltIndex>,
        /// Wall time spent building.
        elapsed: Duration,
    },
    /// The request failed as a whole.
    Failed {
        /// The requesting model.
        model_id: ModelId,
        /// Generation of the request.
        generation: u64,
        /// Human-readable reason.
        message: String,
    },
}

impl BuildResponse {
    /// The model the response is for.
    pub fn model_id(&self) -> &ModelId {
        match self {
            BuildResponse::Complete { model_id, .. } | BuildResponse::Failed { model_id, .. } => model_id,
        }
    }

    /// Generation of the originating request.
    pub fn generation(&self) -> u64 {
        match self {
            BuildResponse::Complete { generation, .. } | BuildResponse::Failed { generation, .. } => *generation,
        }
    }

    /// Whether the build succeeded.
    pub fn is_complete(&self) -> bool {
        matches!(self, BuildResponse::Complete { .. })
    }
}

enum WorkerCommand {
    Build(BuildRequest),
    Shutdown,
}

/// Handle to the background index builder.
///
/// Dropping it stops the worker after its current build and joins the thread; queued
/// requests that have not started are discarded.
pub struct IndexBuildCoordinator {
    tx_cmd: SyncSender<WorkerCommand>,
    rx_evt: Receiver<BuildResponse>,
    stopping: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl IndexBuildCoordinator {
    /// Start the worker thread.
    pub fn spawn(options: IndexOptions, queue_capacity: usize) -> Result<Self> {
        Self::spawn_with_progress(options, queue_capacity, Progress::none())
    }

    /// Start the worker thread, reporting one step per finished mesh.
    pub fn spawn_with_progress(options: IndexOptions, queue_capacity: usize, progress: Progress) -> Result<Self> {
        let (tx_cmd, rx_cmd) = mpsc::sync_channel::<WorkerCommand>(queue_capacity.max(1));
        let (tx_evt, rx_evt) = mpsc::channel::<BuildResponse>();
        let stopping = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            options,
            progress,
            stopping: Arc::clone(&stopping),
        };
        let thread = thread::Builder::new()
            .name("chisel-index-builder".to_string())
            .spawn(move || worker.run(rx_cmd, tx_evt))?;

        debug!(queue_capacity, "index build worker started");
        Ok(Self {
            tx_cmd,
            rx_evt,
            stopping,
            thread: Some(thread),
        })
    }

    /// Queue a request without blocking.
    ///
    /// Fails with [`SculptError::BuildQueueFull`] when the queue is at capacity and
    /// with [`SculptError::WorkerDisconnected`] if the worker has exited.
    pub fn submit(&self, request: BuildRequest) -> Result<()> {
        let model_id = request.model_id.clone();
        let meshes = request.meshes.len();
        match self.tx_cmd.try_send(WorkerCommand::Build(request)) {
            Ok(()) => {
                debug!(model = %model_id, meshes, "index build queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(SculptError::BuildQueueFull { model: model_id }),
            Err(TrySendError::Disconnected(_)) => Err(SculptError::WorkerDisconnected),
        }
    }

    /// Take a finished response, if any.
    pub fn try_recv(&self) -> Option<BuildResponse> {
        self.rx_evt.try_recv().ok()
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<BuildResponse> {
        match self.rx_evt.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for IndexBuildCoordinator {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::Release);
        let _ = self.tx_cmd.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for IndexBuildCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuildCoordinator")
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

struct Worker {
    options: IndexOptions,
    progress: Progress,
    stopping: Arc<AtomicBool>,
}

impl Worker {
    fn run(self, rx_cmd: Receiver<WorkerCommand>, tx_evt: Sender<BuildResponse>) {
        while let Ok(cmd) = rx_cmd.recv() {
            match cmd {
                WorkerCommand::Build(request) => {
                    if self.stopping.load(Ordering::Acquire) {
                        continue;
                    }
                    let response = self.handle(request);
                    if tx_evt.send(response).is_err() {
                        break;
                    }
                }
                WorkerCommand::Shutdown => break,
            }
        }
        debug!("index build worker stopped");
    }

    fn handle(&self, request: BuildRequest) -> BuildResponse {
        let BuildRequest {
            model_id,
            generation,
            meshes,
        } = request;
        let start = Instant::now();
        let total = meshes.len();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| build_batch(meshes, &self.options, &self.progress)));
        let outcome = match outcome {
            Ok(result) => result,
            Err(payload) => Err(SculptError::BuildPanicked {
                model: model_id.clone(),
                message: panic_message(payload.as_ref()),
            }),
        };

        match outcome {
            Ok(meshes) => {
                let elapsed = start.elapsed();
                info!(
                    model = %model_id,
                    meshes = total,
                    triangles = meshes.iter().map(|m| m.index.num_triangles()).sum::<usize>(),
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "spatial index built"
                );
                BuildResponse::Complete {
                    model_id,
                    generation,
                    meshes,
                    elapsed,
                }
            }
            Err(err) => {
                warn!(model = %model_id, error = %err, "spatial index build failed");
                BuildResponse::Failed {
                    model_id,
                    generation,
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Build every mesh or none.
fn build_batch(meshes: Vec<MeshPayload>, options: &IndexOptions, progress: &Progress) -> Result<Vec<BuiltIndex>> {
    let total = meshes.len();
    let done = AtomicUsize::new(0);
    let build_one = |payload: MeshPayload| -> Result<BuiltIndex> {
        let index = SpatialIndex::build(&payload.mesh_id, &payload.positions, &payload.indices, options)?;
        let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
        progress.report(finished, total, "Building spatial index");
        Ok(BuiltIndex { payload, index })
    };

    if options.parallel {
        meshes.into_par_iter().map(build_one).collect()
    } else {
        meshes.into_iter().map(build_one).collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
