//! Background work dispatch: closures run on a worker pool, their callbacks
//! run on the single consumer that drains completions once per tick.
#![forbid(unsafe_code)]

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};

pub use rayon::ThreadPoolBuildError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkError {
    /// The work closure panicked; carries the panic message when it was a string.
    Panicked(String),
}

impl fmt::Display for WorkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkError::Panicked(msg) => write!(f, "work panicked: {msg}"),
        }
    }
}

impl std::error::Error for WorkError {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A finished unit of work waiting for the consumer to apply it.
pub struct Completion<Ctx> {
    job_id: u64,
    deliver: Box<dyn FnOnce(&mut Ctx) + Send>,
}

impl<Ctx> Completion<Ctx> {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Invokes the submitter's callback with the work's result.
    pub fn run(self, ctx: &mut Ctx) {
        (self.deliver)(ctx)
    }
}

impl<Ctx> fmt::Debug for Completion<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").field("job_id", &self.job_id).finish()
    }
}

pub struct Dispatcher<Ctx> {
    pool: ThreadPool,
    res_tx: Sender<Completion<Ctx>>,
    res_rx: Receiver<Completion<Ctx>>,
    next_job: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    workers: usize,
}

impl<Ctx: 'static> Dispatcher<Ctx> {
    /// `workers == 0` sizes the pool from available parallelism.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("terra-worker-{i}"))
            .build()?;
        let (res_tx, res_rx) = unbounded();
        log::debug!("dispatcher started with {workers} workers");
        Ok(Self {
            pool,
            res_tx,
            res_rx,
            next_job: AtomicU64::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            workers,
        })
    }

    /// Schedules `work` on the pool. Once it returns (or panics) `on_done` is
    /// queued and runs on whichever thread next drains completions.
    /// Returns the job id.
    pub fn submit<T, W, C>(&self, work: W, on_done: C) -> u64
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        C: FnOnce(&mut Ctx, Result<T, WorkError>) + Send + 'static,
    {
        let job_id = self.next_job.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let tx = self.res_tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(work))
                .map_err(|payload| WorkError::Panicked(panic_message(payload.as_ref())));
            if let Err(err) = &result {
                log::warn!("job {job_id}: {err}");
            }
            let completion = Completion {
                job_id,
                deliver: Box::new(move |ctx: &mut Ctx| on_done(ctx, result)),
            };
            // Fails only once the dispatcher is gone, leaving nobody to notify.
            let _ = tx.send(completion);
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
        job_id
    }

    /// Removes every queued completion, oldest first, without running it.
    /// Lets an owner that is itself the callback context release its borrow
    /// of the dispatcher before applying them.
    pub fn take_completed(&self) -> Vec<Completion<Ctx>> {
        self.res_rx.try_iter().collect()
    }

    /// Runs every queued completion against `ctx` in enqueue order.
    pub fn drain(&self, ctx: &mut Ctx) -> usize {
        let done = self.take_completed();
        let n = done.len();
        for completion in done {
            completion.run(ctx);
        }
        n
    }

    /// Blocks until no work is running or queued on the pool, or `timeout`
    /// elapses. Completions still need draining afterwards.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Submitted work whose completion has not been queued yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Completions waiting for the next drain.
    pub fn pending_completions(&self) -> usize {
        self.res_rx.len()
    }

    /// Total units of work ever submitted.
    pub fn submitted(&self) -> u64 {
        self.next_job.load(Ordering::Relaxed)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}
