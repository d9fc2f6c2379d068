//! Bounded worker pool for raster jobs.
//!
//! Conversions block for up to two tool timeouts, so they run on dedicated
//! threads fed by a bounded queue instead of on the caller's thread.

use crate::pipeline::RasterPipeline;
use deck_core::{Error, RasterJobResult, Result};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

struct Job {
    owner_id: String,
    bytes: Vec<u8>,
    reply: mpsc::Sender<RasterJobResult>,
}

/// Handle to a submitted raster job.
pub struct RasterJobHandle {
    owner_id: String,
    receiver: Receiver<RasterJobResult>,
}

impl RasterJobHandle {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Block until the job finishes.
    pub fn wait(self) -> RasterJobResult {
        self.receiver.recv().unwrap_or_else(|_| RasterJobResult::Failed {
            error: "raster worker stopped before finishing the job".to_string(),
        })
    }

    /// The result, if the job has already finished.
    pub fn try_result(&self) -> Option<RasterJobResult> {
        self.receiver.try_recv().ok()
    }
}

/// Fixed set of worker threads draining a bounded job queue.
///
/// Jobs for the same owner are not serialized against each other; callers
/// that need single-flight per owner must coordinate above this pool.
pub struct RasterWorkerPool {
    sender: Option<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl RasterWorkerPool {
    /// Start `workers` threads (at least one) with room for `queue_capacity`
    /// waiting jobs.
    pub fn new(pipeline: RasterPipeline, workers: usize, queue_capacity: usize) -> Result<Self> {
        let pipeline = Arc::new(pipeline);
        let (sender, receiver) = mpsc::sync_channel::<Job>(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(workers.max(1));
        for id in 0..workers.max(1) {
            let pipeline = Arc::clone(&pipeline);
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("raster-worker-{}", id))
                .spawn(move || worker_loop(id, &pipeline, &receiver))?;
            handles.push(handle);
        }

        log::debug!("Started {} raster workers", handles.len());
        Ok(Self {
            sender: Some(sender),
            workers: handles,
        })
    }

    /// Queue a job, blocking while the queue is full.
    pub fn submit(&self, owner_id: &str, bytes: Vec<u8>) -> Result<RasterJobHandle> {
        let (job, handle) = job(owner_id, bytes);
        self.sender()?.send(job).map_err(|_| stopped())?;
        Ok(handle)
    }

    /// Queue a job, failing with [`Error::QueueFull`] instead of blocking.
    pub fn try_submit(&self, owner_id: &str, bytes: Vec<u8>) -> Result<RasterJobHandle> {
        let (job, handle) = job(owner_id, bytes);
        match self.sender()?.try_send(job) {
            Ok(()) => Ok(handle),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(stopped()),
        }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    fn sender(&self) -> Result<&SyncSender<Job>> {
        self.sender.as_ref().ok_or_else(stopped)
    }
}

impl Drop for RasterWorkerPool {
    fn drop(&mut self) {
        // Closing the queue lets workers finish what is queued and exit
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn job(owner_id: &str, bytes: Vec<u8>) -> (Job, RasterJobHandle) {
    let (reply, receiver) = mpsc::channel();
    let job = Job {
        owner_id: owner_id.to_string(),
        bytes,
        reply,
    };
    let handle = RasterJobHandle {
        owner_id: owner_id.to_string(),
        receiver,
    };
    (job, handle)
}

fn stopped() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "raster workers have stopped"))
}

fn worker_loop(id: usize, pipeline: &RasterPipeline, receiver: &Mutex<Receiver<Job>>) {
    loop {
        let next = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.recv()
        };
        let Ok(job) = next else {
            break;
        };

        log::info!("Worker {} rendering {} ({} bytes)", id, job.owner_id, job.bytes.len());
        let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(&job.owner_id, &job.bytes)))
            .unwrap_or_else(|_| {
                log::error!("Worker {} panicked while rendering {}", id, job.owner_id);
                RasterJobResult::Failed {
                    error: "raster job panicked".to_string(),
                }
            });

        // The submitter may have dropped its handle
        let _ = job.reply.send(result);
    }
    log::debug!("Raster worker {} exiting", id);
}
