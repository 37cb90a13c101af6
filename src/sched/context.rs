use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use super::latch::{CountLatch, Latch};
use super::unwind;

/// A `Context` tracks the completion of a batch of dispatches. Every dispatch
/// adds its number of groups to the context, and every finished group removes
/// one. A context is busy as long as any of its groups have not finished yet.
///
/// Contexts are independent from each other, waiting on one does not wait for
/// work that belongs to another.
///
/// A panic of any task is handed back by `JobDispatcher::wait`. If the context
/// is dropped without taking it, the panic is resumed by `drop` instead; tasks
/// which panic after their context is gone unwind the thread executing them.
#[derive(Default)]
pub struct Context {
    state: Arc<ContextState>,
}

#[derive(Default)]
pub(crate) struct ContextState {
    latch: CountLatch,
    panic: Mutex<PanicSlot>,
}

#[derive(Default)]
struct PanicSlot {
    payload: Option<Box<dyn Any + Send>>,
    abandoned: bool,
}

impl Context {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns true if there are groups that have not finished yet.
    #[inline]
    pub fn is_busy(&self) -> bool {
        !self.state.latch.is_set()
    }

    /// Returns the number of unfinished groups.
    #[inline]
    pub fn pending(&self) -> usize {
        self.state.latch.pending()
    }

    #[inline]
    pub(crate) fn state(&self) -> &Arc<ContextState> {
        &self.state
    }

    pub(crate) fn take_panic(&self) -> Option<Box<dyn Any + Send>> {
        self.state
            .panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .payload
            .take()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let payload = {
            let mut slot = self
                .state
                .panic
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            slot.abandoned = true;
            slot.payload.take()
        };

        if let Some(payload) = payload {
            if !thread::panicking() {
                error!("[JobSystem] context dropped with a panicked job that was never waited on.");
                unwind::resume_unwinding(payload);
            }
        }
    }
}

impl ::std::fmt::Debug for Context {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Context")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ContextState {
    #[inline]
    pub fn add(&self, groups: usize) {
        self.latch.add(groups);
    }

    #[inline]
    pub fn finish(&self) {
        self.latch.set();
    }

    /// Keeps the first panic payload of this context, later ones are dropped.
    /// Returns the payload back if the `Context` is gone, so nobody could ever
    /// take it.
    pub fn store_panic(&self, payload: Box<dyn Any + Send>) -> Option<Box<dyn Any + Send>> {
        let mut slot = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.abandoned {
            return Some(payload);
        }

        if slot.payload.is_none() {
            slot.payload = Some(payload);
        }

        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counting() {
        let ctx = Context::new();
        assert!(!ctx.is_busy());

        ctx.state().add(3);
        assert!(ctx.is_busy());
        assert_eq!(ctx.pending(), 3);

        for _ in 0..3 {
            ctx.state().finish();
        }

        assert!(!ctx.is_busy());
    }

    #[test]
    fn first_panic_wins() {
        let ctx = Context::new();
        assert!(ctx.take_panic().is_none());

        assert!(ctx.state().store_panic(Box::new("first")).is_none());
        assert!(ctx.state().store_panic(Box::new("second")).is_none());

        let payload = ctx.take_panic().unwrap();
        assert_eq!(*payload.downcast_ref::<&str>().unwrap(), "first");
        assert!(ctx.take_panic().is_none());
    }

    #[test]
    #[should_panic(expected = "never waited")]
    fn drop_resumes_panic() {
        let ctx = Context::new();
        assert!(ctx.state().store_panic(Box::new("never waited")).is_none());
    }

    #[test]
    fn abandoned() {
        let ctx = Context::new();
        let state = ctx.state().clone();
        drop(ctx);

        let payload = state.store_panic(Box::new("late")).unwrap();
        assert_eq!(*payload.downcast_ref::<&str>().unwrap(), "late");
    }
}
