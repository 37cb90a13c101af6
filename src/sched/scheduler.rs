use std::cell::Cell;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use std::{mem, thread};

use super::context::Context;
use super::job::{Job, JobArgs, Task};
use super::latch::{Latch, LockLatch};
use super::queue::BoundedQueue;
use super::unwind::{self, AbortIfPanic};
use crate::errors::*;
use crate::settings::JobSystemParams;

/// The shared half of the job system. It could be cloned into tasks through
/// `JobSystem::dispatcher` to dispatch nested work.
pub struct JobDispatcher {
    queue: BoundedQueue<Job>,
    watcher: Watcher,
    shutdown: AtomicBool,
}

impl JobDispatcher {
    fn new(capacity: usize) -> Self {
        JobDispatcher {
            queue: BoundedQueue::new(capacity),
            watcher: Watcher(Mutex::new(()), Condvar::new()),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Dispatches `job_count` invocations of `task`, partitioned into groups of
    /// `group_size` consecutive jobs. Every job index in `[0, job_count)` is
    /// executed exactly once. A zero `job_count` or `group_size` does nothing.
    ///
    /// When the queue is full, the calling thread executes queued groups itself
    /// until there is room again.
    pub fn dispatch<F>(&self, ctx: &Context, job_count: u32, group_size: u32, task: F)
    where
        F: Fn(JobArgs) + Send + Sync + 'static,
    {
        self.dispatch_task(ctx, job_count, group_size, Arc::new(task));
    }

    pub(crate) fn dispatch_task(
        &self,
        ctx: &Context,
        job_count: u32,
        group_size: u32,
        task: Arc<Task>,
    ) {
        if job_count == 0 || group_size == 0 {
            return;
        }

        let group_count = (job_count - 1) / group_size + 1;
        ctx.state().add(group_count as usize);

        for group_id in 0..group_count {
            let group_start = group_id * group_size;
            let group_end = group_start.saturating_add(group_size).min(job_count);

            let mut job = Job::new(
                task.clone(),
                ctx.state().clone(),
                group_id,
                group_start,
                group_end,
            );

            while let Err(rejected) = self.queue.push(job) {
                trace!("[JobSystem] queue is full, executes inline.");
                job = rejected;
                self.watcher.notify_all();
                self.execute_one();
            }
        }

        self.watcher.notify_all();
    }

    /// Blocks current thread until every group dispatched on `ctx` has been
    /// finished. The calling thread keeps busy by executing queued jobs of any
    /// context. If any of the jobs of `ctx` panicked, the first panic is
    /// resumed here.
    pub fn wait(&self, ctx: &Context) {
        self.watcher.notify_all();

        while ctx.is_busy() {
            if !self.execute_one() {
                thread::yield_now();
            }
        }

        if let Some(payload) = ctx.take_panic() {
            unwind::resume_unwinding(payload);
        }
    }

    /// Returns the number of groups waiting in the queue.
    #[inline]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Pops one group and executes it on current thread. Returns false if the
    /// queue is empty.
    pub(crate) fn execute_one(&self) -> bool {
        match self.queue.pop() {
            Some(job) => {
                job.execute();
                true
            }
            None => false,
        }
    }

    #[inline]
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn main_loop(dispatcher: Arc<JobDispatcher>, index: usize, primed: Arc<LockLatch>) {
        WORKER_INDEX.with(|v| v.set(Some(index)));
        primed.set();

        debug!("[JobSystem] worker {} starts.", index);

        let abort_guard = AbortIfPanic;
        let mut ms = 1;

        while !dispatcher.is_shutdown() {
            if dispatcher.execute_one() {
                ms = 1;
            } else {
                dispatcher
                    .watcher
                    .sleep_while(ms, || dispatcher.queue.is_empty() && !dispatcher.is_shutdown());
                ms = (ms * 2).min(48);
            }
        }

        mem::forget(abort_guard);

        debug!("[JobSystem] worker {} ends.", index);
    }
}

struct Watcher(Mutex<()>, Condvar);

impl Watcher {
    /// Sleeps for at most `ms` milliseconds if `condition` still holds after the
    /// lock has been taken.
    #[inline]
    fn sleep_while<F: Fn() -> bool>(&self, ms: u64, condition: F) {
        let guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if condition() {
            let duration = Duration::from_millis(ms);
            let _ = self.1.wait_timeout(guard, duration);
        }
    }

    #[inline]
    fn notify_all(&self) {
        let _guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        self.1.notify_all();
    }
}

thread_local! {
    static WORKER_INDEX: Cell<Option<usize>> = Cell::new(None);
}

/// Returns the index of the worker if current thread is one of the workers of
/// a `JobSystem`.
pub fn current_worker() -> Option<usize> {
    WORKER_INDEX.with(|v| v.get())
}

struct ThreadInfo {
    handle: thread::JoinHandle<()>,
    primed: Arc<LockLatch>,
}

/// The owner of the worker threads. Dropping it terminates the workers. It
/// derefs to its `JobDispatcher`.
pub struct JobSystem {
    dispatcher: Arc<JobDispatcher>,
    threads: Vec<ThreadInfo>,
    terminated: bool,
}

impl JobSystem {
    /// Spawns the worker threads described by `params`, and blocks until all of
    /// them are up.
    pub fn new(params: &JobSystemParams) -> Result<Self> {
        let num = params.num_workers();
        let mut jobs = JobSystem {
            dispatcher: Arc::new(JobDispatcher::new(params.queue_capacity)),
            threads: Vec::with_capacity(num),
            terminated: false,
        };

        for index in 0..num {
            let mut b = thread::Builder::new().name(format!("{}-{}", params.thread_name, index));
            if let Some(stack_size) = params.stack_size {
                b = b.stack_size(stack_size);
            }

            let primed = Arc::new(LockLatch::new());
            let sc = jobs.dispatcher.clone();
            let latch = primed.clone();

            // Workers spawned so far are terminated by `drop` on failure.
            let handle = b.spawn(move || JobDispatcher::main_loop(sc, index, latch))?;
            jobs.threads.push(ThreadInfo { handle, primed });
        }

        for v in &jobs.threads {
            v.primed.wait();
        }

        info!(
            "[JobSystem] setup with {} workers, queue capacity {}.",
            num,
            jobs.dispatcher.queue_capacity()
        );

        Ok(jobs)
    }

    /// Creates a job system without any worker. Every job is executed by the
    /// threads that dispatch or wait.
    pub fn headless() -> Self {
        let params = JobSystemParams {
            workers: Some(0),
            ..Default::default()
        };

        JobSystem {
            dispatcher: Arc::new(JobDispatcher::new(params.queue_capacity)),
            threads: Vec::new(),
            terminated: false,
        }
    }

    /// Returns a shared handle of the dispatcher.
    #[inline]
    pub fn dispatcher(&self) -> Arc<JobDispatcher> {
        self.dispatcher.clone()
    }

    /// Returns the number of worker threads.
    #[inline]
    pub fn workers(&self) -> usize {
        self.threads.len()
    }

    /// Stops and joins every worker. Jobs still queued are executed on current
    /// thread before this returns. Dispatches made afterwards through a shared
    /// dispatcher are only executed by the threads that wait on them.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }

        self.terminated = true;
        self.dispatcher.shutdown.store(true, Ordering::SeqCst);
        self.dispatcher.watcher.notify_all();

        for v in self.threads.drain(..) {
            if v.handle.join().is_err() {
                error!("[JobSystem] failed to join worker thread.");
            }
        }

        let mut drained = 0;
        while self.dispatcher.execute_one() {
            drained += 1;
        }

        info!("[JobSystem] terminated, {} groups drained.", drained);
    }
}

impl Deref for JobSystem {
    type Target = JobDispatcher;

    fn deref(&self) -> &Self::Target {
        &self.dispatcher
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.terminate();
    }
}
