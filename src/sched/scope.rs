use std::convert::TryFrom;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

use super::context::Context;
use super::job::{JobArgs, Task};
use super::scheduler::JobDispatcher;
use super::unwind;
use crate::errors::*;

/// A fork-join scope. Tasks dispatched into a scope could borrow anything that
/// outlives the scope, since `JobDispatcher::scope` always waits for them
/// before returning.
pub struct Scope<'s> {
    dispatcher: &'s JobDispatcher,
    ctx: Context,
    marker: PhantomData<fn(&'s ()) -> &'s ()>,
}

impl<'s> Scope<'s> {
    /// Dispatches `job_count` invocations of `task` into this scope. See
    /// `JobDispatcher::dispatch`.
    pub fn dispatch<F>(&self, job_count: u32, group_size: u32, task: F)
    where
        F: Fn(JobArgs) + Send + Sync + 's,
    {
        let task: Arc<dyn Fn(JobArgs) + Send + Sync + 's> = Arc::new(task);

        // The scope waits for every group before 's ends, and each group drops
        // its handle of the task before it is counted as finished.
        let task: Arc<Task> = unsafe { mem::transmute(task) };
        self.dispatcher.dispatch_task(&self.ctx, job_count, group_size, task);
    }

    /// Returns the number of unfinished groups of this scope.
    #[inline]
    pub fn pending(&self) -> usize {
        self.ctx.pending()
    }
}

impl JobDispatcher {
    /// Creates a fork-join scope `s` and invokes the closure with a reference
    /// to `s`. Tasks dispatched into `s` may run asynchronously with respect to
    /// the closure. When the closure returns, or panics, it blocks until every
    /// task dispatched into `s` has finished.
    pub fn scope<'s, F, R>(&'s self, func: F) -> R
    where
        F: for<'r> FnOnce(&'r Scope<'s>) -> R,
    {
        let scope = Scope {
            dispatcher: self,
            ctx: Context::new(),
            marker: PhantomData,
        };

        let result = unwind::halt_unwinding(|| func(&scope));

        match result {
            Ok(v) => {
                self.wait(&scope.ctx);
                v
            }
            Err(payload) => {
                let _ = unwind::halt_unwinding(|| self.wait(&scope.ctx));
                unwind::resume_unwinding(payload)
            }
        }
    }

    /// Invokes `func` with every element of `items` in parallel, `group_size`
    /// elements per group. Returns after all of them have finished.
    pub fn for_each<T, F>(&self, items: &[T], group_size: u32, func: F) -> Result<()>
    where
        T: Sync,
        F: Fn(usize, &T) + Send + Sync,
    {
        let job_count = job_count(items.len())?;
        self.scope(|s| {
            s.dispatch(job_count, group_size, |args| {
                let index = args.job_index as usize;
                func(index, &items[index]);
            });
        });

        Ok(())
    }

    /// Invokes `func` with every element of `items` mutably in parallel,
    /// `group_size` elements per group. Returns after all of them have
    /// finished.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], group_size: u32, func: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        let job_count = job_count(items.len())?;
        let ptr = SendPtr(items.as_mut_ptr());

        self.scope(|s| {
            s.dispatch(job_count, group_size, move |args| {
                let index = args.job_index as usize;
                // Every job index is executed exactly once, so no two jobs
                // alias the same element.
                unsafe { func(index, &mut *ptr.0.add(index)) };
            });
        });

        Ok(())
    }
}

#[inline]
fn job_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::TooManyJobs(len))
}

struct SendPtr<T>(*mut T);

unsafe impl<T: Send> Send for SendPtr<T> {}
unsafe impl<T: Send> Sync for SendPtr<T> {}

#[cfg(test)]
mod test {
    use super::super::scheduler::JobSystem;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn borrow() {
        let jobs = JobSystem::headless();
        let counter = AtomicUsize::new(0);

        jobs.scope(|s| {
            s.dispatch(100, 7, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            assert_eq!(s.pending(), 15);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn for_each() {
        let jobs = JobSystem::headless();
        let mut items: Vec<usize> = (0..33).collect();

        jobs.for_each_mut(&mut items, 4, |i, v| *v += i).unwrap();
        for (i, v) in items.iter().enumerate() {
            assert_eq!(*v, i * 2);
        }

        let sum = AtomicUsize::new(0);
        jobs.for_each(&items, 4, |_, v| {
            sum.fetch_add(*v, Ordering::SeqCst);
        })
        .unwrap();

        assert_eq!(sum.load(Ordering::SeqCst), (0..33).map(|v| v * 2).sum::<usize>());
    }
}
