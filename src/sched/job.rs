use std::sync::Arc;

use super::context::ContextState;
use super::unwind;

/// The type-erased function shared by every job of a dispatch.
pub type Task = dyn Fn(JobArgs) + Send + Sync;

/// Arguments passed into every invocation of a dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobArgs {
    /// Index of this job in the whole dispatch, in `[0, job_count)`.
    pub job_index: u32,
    /// Index of the group this job belongs to.
    pub group_id: u32,
    /// Index of this job inside its group, in `[0, group_size)`.
    pub group_index: u32,
}

/// A group of consecutive jobs, the unit of work that is queued and executed
/// by one thread.
pub(crate) struct Job {
    task: Arc<Task>,
    ctx: Arc<ContextState>,
    group_id: u32,
    group_start: u32,
    group_end: u32,
}

impl Job {
    pub fn new(
        task: Arc<Task>,
        ctx: Arc<ContextState>,
        group_id: u32,
        group_start: u32,
        group_end: u32,
    ) -> Self {
        debug_assert!(group_start < group_end);

        Job {
            task,
            ctx,
            group_id,
            group_start,
            group_end,
        }
    }

    /// Runs every job of this group in ascending order, then marks the group as
    /// finished in its context. A panic stops the rest of the group and is kept
    /// in the context for the waiting thread. If the `Context` has been dropped
    /// already, the panic is resumed on current thread.
    pub fn execute(self) {
        let Job {
            task,
            ctx,
            group_id,
            group_start,
            group_end,
        } = self;

        let result = unwind::halt_unwinding(|| {
            for job_index in group_start..group_end {
                task(JobArgs {
                    job_index,
                    group_id,
                    group_index: job_index - group_start,
                });
            }
        });

        // Borrowed data of scoped tasks must not be touched after the context
        // is released.
        drop(task);

        if let Err(payload) = result {
            warn!(
                "[JobSystem] job group {} panicked: {}",
                group_id,
                unwind::payload_message(&*payload)
            );

            if let Some(payload) = ctx.store_panic(payload) {
                ctx.finish();
                unwind::resume_unwinding(payload);
            }
        }

        ctx.finish();
    }
}

#[cfg(test)]
mod test {
    use super::super::context::Context;
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn args() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let shadow = records.clone();
        let task: Arc<Task> = Arc::new(move |args| shadow.lock().unwrap().push(args));

        let ctx = Arc::new(ContextState::default());
        ctx.add(1);
        Job::new(task, ctx.clone(), 2, 6, 9).execute();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 3);
        for (i, v) in records.iter().enumerate() {
            assert_eq!(v.job_index, 6 + i as u32);
            assert_eq!(v.group_id, 2);
            assert_eq!(v.group_index, i as u32);
        }
    }

    #[test]
    #[should_panic(expected = "orphan")]
    fn orphaned_panic() {
        let ctx = Context::new();
        ctx.state().add(1);
        let state = ctx.state().clone();
        drop(ctx);

        let task: Arc<Task> = Arc::new(|_| panic!("orphan"));
        Job::new(task, state, 0, 0, 1).execute();
    }
}
