//! Kernel-level ordering, capacity, and teardown guarantees.

use std::sync::{Arc, Mutex};

use simflow::component::Registry;
use simflow::graph::WorkflowGraph;
use simflow::log::EventLog;
use simflow::payload::GenTypeState;
use simflow::runtime::{SimCtx, World};
use simflow::scheduler::{Effect, Process, Scheduler, SchedulerError, ServerId, Step};

type Trace = Arc<Mutex<Vec<(u64, String)>>>;

fn empty_world() -> World {
    World::new(
        Registry::new(),
        WorkflowGraph::default(),
        GenTypeState::new(),
        EventLog::default(),
    )
}

/// Records its label at every resume and walks a fixed list of delays.
struct Ticker {
    label: String,
    delays: Vec<u64>,
    next: usize,
    trace: Trace,
}

impl Ticker {
    fn new(label: &str, delays: Vec<u64>, trace: &Trace) -> Box<Self> {
        Box::new(Self {
            label: label.to_string(),
            delays,
            next: 0,
            trace: Arc::clone(trace),
        })
    }
}

impl Process for Ticker {
    fn resume(&mut self, ctx: &mut SimCtx<'_>) -> Step {
        self.trace
            .lock()
            .unwrap()
            .push((ctx.now(), self.label.clone()));
        if self.next < self.delays.len() {
            let delay = self.delays[self.next];
            self.next += 1;
            Step::Yield(Effect::Timeout(delay))
        } else {
            Step::Complete
        }
    }
}

/// Seizes a server, holds it for a fixed span, releases, completes.
struct Holder {
    label: String,
    server: ServerId,
    hold: u64,
    phase: u8,
    trace: Trace,
}

impl Holder {
    fn new(label: &str, server: ServerId, hold: u64, trace: &Trace) -> Box<Self> {
        Box::new(Self {
            label: label.to_string(),
            server,
            hold,
            phase: 0,
            trace: Arc::clone(trace),
        })
    }
}

impl Process for Holder {
    fn resume(&mut self, ctx: &mut SimCtx<'_>) -> Step {
        match self.phase {
            0 => {
                self.phase = 1;
                Step::Yield(Effect::Seize(self.server))
            }
            1 => {
                self.trace
                    .lock()
                    .unwrap()
                    .push((ctx.now(), format!("{}:acquired", self.label)));
                self.phase = 2;
                Step::Yield(Effect::Timeout(self.hold))
            }
            2 => {
                self.phase = 3;
                Step::Yield(Effect::Release(self.server))
            }
            _ => {
                self.trace
                    .lock()
                    .unwrap()
                    .push((ctx.now(), format!("{}:released", self.label)));
                Step::Complete
            }
        }
    }
}

#[test]
fn same_time_events_run_in_insertion_order() {
    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Ticker::new("a", vec![5, 5], &trace));
    scheduler.spawn(Ticker::new("b", vec![5, 5], &trace));
    scheduler.run(&mut empty_world(), None).unwrap();

    let seen = trace.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (0, "a".to_string()),
            (0, "b".to_string()),
            (5, "a".to_string()),
            (5, "b".to_string()),
            (10, "a".to_string()),
            (10, "b".to_string()),
        ]
    );
}

#[test]
fn virtual_time_is_nondecreasing_and_lands_on_due_times() {
    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Ticker::new("t", vec![1, 2, 3], &trace));
    scheduler.run(&mut empty_world(), None).unwrap();

    let times: Vec<u64> = trace.lock().unwrap().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0, 1, 3, 6]);
    assert_eq!(scheduler.now(), 6);
}

#[test]
fn zero_delay_requeues_behind_events_already_due() {
    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Ticker::new("first", vec![0], &trace));
    scheduler.spawn(Ticker::new("second", vec![], &trace));
    scheduler.run(&mut empty_world(), None).unwrap();

    let seen = trace.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (0, "first".to_string()),
            (0, "second".to_string()),
            (0, "first".to_string()),
        ]
    );
}

#[test]
fn seize_grants_fifo_across_waiters() {
    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    let server = scheduler.create_server(1);
    scheduler.spawn(Holder::new("p1", server, 7, &trace));
    scheduler.spawn(Holder::new("p2", server, 3, &trace));
    scheduler.spawn(Holder::new("p3", server, 3, &trace));
    scheduler.run(&mut empty_world(), None).unwrap();

    let seen = trace.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (0, "p1:acquired".to_string()),
            (7, "p2:acquired".to_string()),
            (7, "p1:released".to_string()),
            (10, "p3:acquired".to_string()),
            (10, "p2:released".to_string()),
            (13, "p3:released".to_string()),
        ]
    );
    assert_eq!(scheduler.in_service(server), 0);
    assert_eq!(scheduler.queued(server), 0);
}

#[test]
fn in_service_never_exceeds_capacity() {
    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    let server = scheduler.create_server(2);
    for i in 0..5 {
        scheduler.spawn(Holder::new(&format!("p{i}"), server, 4, &trace));
    }
    scheduler.run(&mut empty_world(), None).unwrap();

    // acquisitions happen in waves of two
    let acquired: Vec<(u64, String)> = trace
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, l)| l.ends_with("acquired"))
        .cloned()
        .collect();
    let times: Vec<u64> = acquired.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0, 0, 4, 4, 8]);
    assert_eq!(scheduler.in_service(server), 0);
}

#[test]
fn run_until_discards_later_events_and_lands_on_the_bound() {
    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    scheduler.spawn(Ticker::new("loop", vec![1; 100], &trace));
    scheduler.run(&mut empty_world(), Some(5)).unwrap();

    assert_eq!(scheduler.now(), 5);
    assert_eq!(scheduler.pending_events(), 0);
    // resumes at 0..=4 only; the event due at 5 was discarded
    let times: Vec<u64> = trace.lock().unwrap().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0, 1, 2, 3, 4]);
}

#[test]
fn release_without_seize_is_fatal() {
    struct Rogue {
        server: ServerId,
        released: bool,
    }
    impl Process for Rogue {
        fn resume(&mut self, _ctx: &mut SimCtx<'_>) -> Step {
            if self.released {
                Step::Complete
            } else {
                self.released = true;
                Step::Yield(Effect::Release(self.server))
            }
        }
    }

    let mut scheduler = Scheduler::new();
    let server = scheduler.create_server(1);
    scheduler.spawn(Box::new(Rogue {
        server,
        released: false,
    }));
    let err = scheduler.run(&mut empty_world(), None).unwrap_err();
    assert!(matches!(err, SchedulerError::ReleaseWithoutSeize { .. }));
}

#[test]
fn units_held_at_termination_are_released_in_teardown() {
    /// Seizes and then sleeps forever without releasing.
    struct Hog {
        server: ServerId,
        phase: u8,
    }
    impl Process for Hog {
        fn resume(&mut self, _ctx: &mut SimCtx<'_>) -> Step {
            if self.phase == 0 {
                self.phase = 1;
                Step::Yield(Effect::Seize(self.server))
            } else {
                Step::Yield(Effect::Timeout(1))
            }
        }
    }

    let mut scheduler = Scheduler::new();
    let server = scheduler.create_server(1);
    scheduler.spawn(Box::new(Hog { server, phase: 0 }));
    scheduler.run(&mut empty_world(), Some(10)).unwrap();

    assert_eq!(scheduler.now(), 10);
    assert_eq!(scheduler.in_service(server), 0);
}

#[test]
fn completed_process_auto_releases_for_the_next_waiter() {
    /// Seizes and completes while still holding the unit.
    struct Quitter {
        server: ServerId,
        phase: u8,
        trace: Trace,
        label: String,
    }
    impl Process for Quitter {
        fn resume(&mut self, ctx: &mut SimCtx<'_>) -> Step {
            if self.phase == 0 {
                self.phase = 1;
                Step::Yield(Effect::Seize(self.server))
            } else {
                self.trace
                    .lock()
                    .unwrap()
                    .push((ctx.now(), format!("{}:done", self.label)));
                Step::Complete
            }
        }
    }

    let trace: Trace = Arc::default();
    let mut scheduler = Scheduler::new();
    let server = scheduler.create_server(1);
    scheduler.spawn(Box::new(Quitter {
        server,
        phase: 0,
        trace: Arc::clone(&trace),
        label: "q".to_string(),
    }));
    scheduler.spawn(Holder::new("h", server, 2, &trace));
    scheduler.run(&mut empty_world(), None).unwrap();

    let seen = trace.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (0, "q:done".to_string()),
            (0, "h:acquired".to_string()),
            (2, "h:released".to_string()),
        ]
    );
    assert_eq!(scheduler.in_service(server), 0);
}

#[test]
fn negative_delays_are_rejected_at_the_boundary() {
    assert!(matches!(
        Scheduler::delay_from(-1),
        Err(SchedulerError::InvalidDelay(-1))
    ));
    assert_eq!(Scheduler::delay_from(3).unwrap(), 3);
}
