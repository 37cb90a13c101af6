use std::any::Any;
use std::io;
use std::io::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::thread;

/// Executes `f` and captures any panic, translating that panic into a
/// `Err` result. The assumption is that any panic will be propagated
/// later with `resume_unwinding`, and hence `f` can be treated as
/// exception safe.
pub fn halt_unwinding<F, R>(func: F) -> thread::Result<R>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(func))
}

pub fn resume_unwinding(payload: Box<dyn Any + Send>) -> ! {
    panic::resume_unwind(payload)
}

/// Aborts the process if dropped during unwinding. Forget it on the happy
/// path.
pub struct AbortIfPanic;

impl Drop for AbortIfPanic {
    fn drop(&mut self) {
        error!("detected unexpected panic; aborting");
        let _ = writeln!(&mut io::stderr(), "detected unexpected panic; aborting");
        process::abort();
    }
}

/// Extracts the message of a panic payload if it has one.
pub fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "Box<Any>"
    }
}
