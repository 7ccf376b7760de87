//! Background tile parsing on a worker pool.
//!
//! Jobs are raw tile container bytes; results come back over a channel in
//! completion order and are collected with [`TileLoader::drain`].
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tilesmith_chunk::{Chunk, ChunkError, ReadOptions, read_tile};

/// Per-chunk parse results of one tile container, or the container error.
pub type TileResult = Result<Vec<Result<Chunk, ChunkError>>, ChunkError>;

pub struct LoadedTile {
    pub id: u64,
    pub chunks: TileResult,
    pub bytes: usize,
    pub t_parse_ms: u32,
}

impl LoadedTile {
    pub fn ok_chunks(&self) -> usize {
        match &self.chunks {
            Ok(chunks) => chunks.iter().filter(|c| c.is_ok()).count(),
            Err(_) => 0,
        }
    }
}

#[derive(Default)]
struct Idle {
    pending: AtomicUsize,
    lock: Mutex<()>,
    signal: Condvar,
}

impl Idle {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.signal.notify_all();
        }
    }
}

pub struct TileLoader {
    pool: ThreadPool,
    res_tx: Sender<LoadedTile>,
    res_rx: Receiver<LoadedTile>,
    opts: Arc<ReadOptions>,
    idle: Arc<Idle>,
    workers: usize,
}

impl TileLoader {
    /// `workers == 0` sizes the pool from the available parallelism.
    pub fn new(workers: usize, opts: ReadOptions) -> Self {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tilesmith-load-{i}"))
            .build()
            .expect("tile loader pool");
        let (res_tx, res_rx) = unbounded();
        log::debug!("tile loader started with {workers} workers");
        Self {
            pool,
            res_tx,
            res_rx,
            opts: Arc::new(opts),
            idle: Arc::new(Idle::default()),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queues `bytes` for parsing under the caller's `id`.
    pub fn submit(&self, id: u64, bytes: Vec<u8>) {
        self.idle.pending.fetch_add(1, Ordering::AcqRel);
        let tx = self.res_tx.clone();
        let opts = self.opts.clone();
        let idle = self.idle.clone();
        self.pool.spawn(move || {
            let t0 = Instant::now();
            let chunks = read_tile(&bytes, &opts);
            let t_parse_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
            let out = LoadedTile {
                id,
                chunks,
                bytes: bytes.len(),
                t_parse_ms,
            };
            log::debug!(
                "tile {id}: {} chunks ok from {} bytes in {t_parse_ms} ms",
                out.ok_chunks(),
                out.bytes
            );
            let _ = tx.send(out);
            idle.finish_one();
        });
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.idle.pending.load(Ordering::Acquire)
    }

    /// Finished tiles collected so far, without blocking.
    pub fn drain(&self) -> Vec<LoadedTile> {
        self.res_rx.try_iter().collect()
    }

    /// Blocks until every submitted job has finished.
    pub fn wait_idle(&self) {
        let mut guard = self.idle.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.pending() > 0 {
            guard = self
                .idle
                .signal
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
