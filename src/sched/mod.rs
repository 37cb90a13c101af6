//! A job system which executes data-parallel work on a fixed set of worker
//! threads.
//!
//! Work is dispatched as `job_count` invocations of one task, partitioned into
//! groups of consecutive job indices. Groups are the unit of scheduling: they
//! are pushed into a bounded FIFO queue and executed by whichever thread pops
//! them, including the threads that dispatch or wait. Completion is tracked by
//! a `Context`, which could be waited on independently of other contexts.
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use hearth::sched::{Context, JobSystem};
//!
//! let jobs = JobSystem::headless();
//! let counter = AtomicUsize::new(0);
//!
//! jobs.scope(|s| {
//!     s.dispatch(10, 3, |_| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     });
//! });
//!
//! assert_eq!(counter.load(Ordering::SeqCst), 10);
//!
//! let ctx = Context::new();
//! jobs.dispatch(&ctx, 4, 1, |args| assert!(args.job_index < 4));
//! jobs.wait(&ctx);
//! ```

pub mod context;
pub mod latch;
pub mod queue;
pub mod scheduler;
pub mod scope;

mod job;
mod unwind;

pub use self::context::Context;
pub use self::job::{JobArgs, Task};
pub use self::scheduler::{current_worker, JobDispatcher, JobSystem};
pub use self::scope::Scope;
