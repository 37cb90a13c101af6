#[macro_use]
extern crate hearth;
extern crate env_logger;

use hearth::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn setup(workers: usize, queue_capacity: usize) -> JobSystem {
    let _ = env_logger::try_init();

    let params = JobSystemParams {
        workers: Some(workers),
        queue_capacity,
        ..Default::default()
    };

    JobSystem::new(&params).unwrap()
}

fn counters(len: usize) -> Arc<Vec<AtomicUsize>> {
    Arc::new((0..len).map(|_| AtomicUsize::new(0)).collect())
}

#[test]
fn dispatch() {
    let jobs = setup(3, 128);
    let ctx = Context::new();
    let hits = counters(10);
    let groups = Arc::new(Mutex::new(Vec::new()));

    {
        let hits = hits.clone();
        let groups = groups.clone();
        jobs.dispatch(&ctx, 10, 3, move |args| {
            hits[args.job_index as usize].fetch_add(1, Ordering::SeqCst);
            assert_eq!(args.job_index, args.group_id * 3 + args.group_index);
            assert!(args.group_index < 3);
            groups.lock().unwrap().push(args.group_id);
        });
    }

    jobs.wait(&ctx);
    assert!(!ctx.is_busy());

    for v in hits.iter() {
        assert_eq!(v.load(Ordering::SeqCst), 1);
    }

    let mut groups = groups.lock().unwrap().clone();
    groups.sort();
    groups.dedup();
    assert_eq!(groups, vec![0, 1, 2, 3]);
}

#[test]
fn noop() {
    let jobs = setup(2, 128);
    let ctx = Context::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let shadow = hits.clone();
    jobs.dispatch(&ctx, 0, 4, move |_| {
        shadow.fetch_add(1, Ordering::SeqCst);
    });

    let shadow = hits.clone();
    jobs.dispatch(&ctx, 4, 0, move |_| {
        shadow.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!ctx.is_busy());
    jobs.wait(&ctx);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn independent_contexts() {
    let jobs = JobSystem::headless();
    let (c1, c2) = (Context::new(), Context::new());
    let (h1, h2) = (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)));

    {
        let h2 = h2.clone();
        jobs.dispatch(&c2, 8, 2, move |_| {
            h2.fetch_add(1, Ordering::SeqCst);
        });
    }

    {
        let h1 = h1.clone();
        jobs.dispatch(&c1, 3, 1, move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(c2.pending(), 4);
    assert_eq!(c1.pending(), 3);

    // Groups are executed in FIFO order, the groups of `c1` are still queued
    // once `c2` is done.
    jobs.wait(&c2);
    assert_eq!(h2.load(Ordering::SeqCst), 8);
    assert_eq!(h1.load(Ordering::SeqCst), 0);
    assert_eq!(c1.pending(), 3);

    jobs.wait(&c1);
    assert_eq!(h1.load(Ordering::SeqCst), 3);
    assert!(!c1.is_busy());
}

#[test]
fn shared_pool() {
    let jobs = setup(3, 4);
    let mut handles = Vec::new();

    for _ in 0..4 {
        let dispatcher = jobs.dispatcher();
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let ctx = Context::new();
                let hits = counters(97);

                {
                    let hits = hits.clone();
                    dispatcher.dispatch(&ctx, 97, 5, move |args| {
                        hits[args.job_index as usize].fetch_add(1, Ordering::SeqCst);
                    });
                }

                dispatcher.wait(&ctx);
                assert!(!ctx.is_busy());
                for v in hits.iter() {
                    assert_eq!(v.load(Ordering::SeqCst), 1);
                }
            }
        }));
    }

    for v in handles {
        v.join().unwrap();
    }
}

#[test]
fn backpressure() {
    let jobs = setup(2, 2);
    assert_eq!(jobs.queue_capacity(), 2);

    let ctx = Context::new();
    let hits = counters(1000);

    {
        let hits = hits.clone();
        jobs.dispatch(&ctx, 1000, 1, move |args| {
            hits[args.job_index as usize].fetch_add(1, Ordering::SeqCst);
        });
    }

    jobs.wait(&ctx);
    for v in hits.iter() {
        assert_eq!(v.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn headless() {
    let jobs = JobSystem::headless();
    assert_eq!(jobs.workers(), 0);

    let ctx = Context::new();
    let hits = counters(300);

    {
        let hits = hits.clone();
        jobs.dispatch(&ctx, 300, 1, move |args| {
            assert_eq!(sched::current_worker(), None);
            hits[args.job_index as usize].fetch_add(1, Ordering::SeqCst);
        });
    }

    jobs.wait(&ctx);
    assert_eq!(hits.iter().map(|v| v.load(Ordering::SeqCst)).sum::<usize>(), 300);
}

#[test]
fn scope() {
    let jobs = setup(3, 16);
    let mut values: Vec<u64> = (0..1000).collect();
    let total = AtomicUsize::new(0);

    jobs.for_each_mut(&mut values, 16, |i, v| *v += i as u64).unwrap();

    jobs.scope(|s| {
        s.dispatch(values.len() as u32, 64, |args| {
            let v = values[args.job_index as usize];
            total.fetch_add(v as usize, Ordering::SeqCst);
        });
    });

    assert_eq!(total.load(Ordering::SeqCst), (0..1000).map(|v| v * 2).sum::<usize>());
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Velocity {
    x: f32,
}

declare_component!(Velocity);

#[test]
fn parallel_store() {
    let jobs = setup(2, 32);
    let mut world = World::new();
    world.register::<Velocity>().unwrap();

    let mut entities = Vec::new();
    for i in 0..256 {
        let e = world.create().unwrap();
        world.add(e, Velocity { x: i as f32 }).unwrap();
        entities.push(e);
    }

    {
        let mut store = world.store_mut::<Velocity>().unwrap();
        let (ents, components) = store.split_mut();
        assert_eq!(ents.len(), components.len());

        jobs.for_each_mut(components, 8, |_, v| v.x *= 2.0).unwrap();
    }

    for (i, e) in entities.iter().enumerate() {
        assert_eq!(world.get::<Velocity>(*e), Some(Velocity { x: i as f32 * 2.0 }));
    }
}

#[test]
fn nested() {
    let jobs = setup(2, 4);
    let dispatcher = jobs.dispatcher();
    let hits = Arc::new(AtomicUsize::new(0));
    let ctx = Context::new();

    {
        let hits = hits.clone();
        jobs.dispatch(&ctx, 8, 1, move |_| {
            let inner = Context::new();
            let shadow = hits.clone();
            dispatcher.dispatch(&inner, 16, 4, move |_| {
                shadow.fetch_add(1, Ordering::SeqCst);
            });

            dispatcher.wait(&inner);
        });
    }

    jobs.wait(&ctx);
    assert_eq!(hits.load(Ordering::SeqCst), 8 * 16);
}

#[test]
#[should_panic(expected = "job 7 failed")]
fn panic_propagation() {
    let jobs = setup(2, 128);
    let ctx = Context::new();

    jobs.dispatch(&ctx, 16, 4, |args| {
        if args.job_index == 7 {
            panic!("job {} failed", args.job_index);
        }
    });

    jobs.wait(&ctx);
}

#[test]
fn panic_completes_context() {
    let jobs = setup(2, 128);
    let ctx = Context::new();
    let hits = Arc::new(AtomicUsize::new(0));

    {
        let hits = hits.clone();
        jobs.dispatch(&ctx, 8, 1, move |args| {
            if args.job_index == 0 {
                panic!("boom");
            }

            hits.fetch_add(1, Ordering::SeqCst);
        });
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| jobs.wait(&ctx)));
    assert!(result.is_err());
    assert!(!ctx.is_busy());
    assert_eq!(hits.load(Ordering::SeqCst), 7);

    // The workers survive.
    let ctx = Context::new();
    jobs.dispatch(&ctx, 4, 1, |_| {});
    jobs.wait(&ctx);
}

#[test]
fn panic_without_wait() {
    let jobs = setup(2, 128);
    let ctx = Context::new();

    jobs.dispatch(&ctx, 4, 1, |args| {
        if args.job_index == 1 {
            panic!("job {} failed", args.job_index);
        }
    });

    while ctx.is_busy() {
        thread::yield_now();
    }

    let payload = panic::catch_unwind(AssertUnwindSafe(move || drop(ctx))).unwrap_err();
    assert_eq!(payload.downcast_ref::<String>().unwrap(), "job 1 failed");

    let ctx = Context::new();
    jobs.dispatch(&ctx, 4, 1, |_| {});
    jobs.wait(&ctx);
}

#[test]
fn terminate() {
    let mut jobs = setup(2, 256);
    let ctx = Context::new();
    let hits = Arc::new(AtomicUsize::new(0));

    {
        let hits = hits.clone();
        jobs.dispatch(&ctx, 200, 1, move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
    }

    jobs.terminate();
    assert_eq!(jobs.workers(), 0);
    assert!(!ctx.is_busy());
    assert_eq!(hits.load(Ordering::SeqCst), 200);

    // Work dispatched afterwards runs on the waiting thread.
    let ctx = Context::new();
    jobs.dispatch(&ctx, 3, 1, |_| {});
    jobs.wait(&ctx);
    jobs.terminate();
}
