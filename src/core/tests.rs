use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{Instant, sleep};

use crate::{
    BackoffPolicy, BoxBodyFuture, Control, Event, EventKind, JitterPolicy, Loop, LoopConfig,
    LoopError, Recoverings, Status, Subscribe, recovery::policies,
};

const SHORT: Duration = Duration::from_millis(20);
const LONG: Duration = Duration::from_millis(50);
const VERY_LONG: Duration = Duration::from_millis(200);

type BodyResult = Result<(), LoopError>;

#[derive(Clone, Default)]
struct Probe {
    done: Arc<AtomicBool>,
    count: Arc<AtomicUsize>,
}

impl Probe {
    fn enter(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    fn done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Marks the probe as done when dropped, including while unwinding.
struct Leave(Probe);

impl Drop for Leave {
    fn drop(&mut self) {
        self.0.leave();
    }
}

fn wait_for_stop(p: &Probe) -> impl Fn(Control) -> BoxBodyFuture + Send + Sync + 'static {
    let p = p.clone();
    move |ctl: Control| -> BoxBodyFuture {
        let p = p.clone();
        Box::pin(async move {
            p.enter();
            let _leave = Leave(p);
            ctl.shall_stop().await;
            Ok(())
        })
    }
}

fn time_out_after(p: &Probe, after: Duration) -> impl Fn(Control) -> BoxBodyFuture + Send + Sync + 'static {
    let p = p.clone();
    move |ctl: Control| -> BoxBodyFuture {
        let p = p.clone();
        Box::pin(async move {
            p.enter();
            let _leave = Leave(p);
            let res: BodyResult = tokio::select! {
                _ = ctl.shall_stop() => Ok(()),
                _ = sleep(after) => Err(LoopError::fail("timed out")),
            };
            res
        })
    }
}

fn panic_after(p: &Probe, after: Duration) -> impl Fn(Control) -> BoxBodyFuture + Send + Sync + 'static {
    let p = p.clone();
    move |ctl: Control| -> BoxBodyFuture {
        let p = p.clone();
        Box::pin(async move {
            p.enter();
            let _leave = Leave(p);
            let res: BodyResult = tokio::select! {
                _ = ctl.shall_stop() => Ok(()),
                _ = sleep(after) => panic!("ouch"),
            };
            res
        })
    }
}

fn too_many_panics(rs: Recoverings) -> Result<Recoverings, LoopError> {
    if rs.len() >= 5 {
        return Err(LoopError::fatal("too many panics"));
    }
    Ok(rs)
}

fn catch_timeout(rs: Recoverings) -> Result<Recoverings, LoopError> {
    if let Some(err) = rs.last().and_then(|r| r.reason.downcast_ref::<LoopError>()) {
        if err.message() == Some("timed out") {
            return Err(err.clone());
        }
    }
    Ok(Recoverings::new())
}

// ---- plain loops ----

#[tokio::test(start_paused = true)]
async fn stop_returns_clean_result() {
    let p = Probe::default();
    let l = Loop::go(wait_for_stop(&p));

    assert_eq!(l.stop().await, Ok(()));
    assert!(p.done());
    assert_eq!(l.error(), (Status::Stopped, None));
}

#[tokio::test(start_paused = true)]
async fn kill_reason_becomes_terminal_error() {
    let p = Probe::default();
    let l = Loop::go(wait_for_stop(&p));

    assert_eq!(l.kill(LoopError::fail("ouch")).await, Err(LoopError::fail("ouch")));
    assert_eq!(l.stop().await, Err(LoopError::fail("ouch")));
    assert!(p.done());
    assert_eq!(l.status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn body_error_is_terminal() {
    let p = Probe::default();
    let l = Loop::go(time_out_after(&p, SHORT));

    sleep(LONG).await;

    assert_eq!(l.status(), Status::Stopped);
    assert_eq!(l.stop().await, Err(LoopError::fail("timed out")));
    assert!(p.done());
}

#[tokio::test(start_paused = true)]
async fn body_error_beats_kill_reason() {
    let l = Loop::go(|ctl: Control| async move {
        ctl.shall_stop().await;
        Err(LoopError::fail("flush failed"))
    });

    assert_eq!(
        l.kill(LoopError::fail("ouch")).await,
        Err(LoopError::fail("flush failed"))
    );
}

#[tokio::test(start_paused = true)]
async fn cleanup_error_replaces_clean_return() {
    let p = Probe::default();
    let probe = p.clone();
    let l = Loop::go(move |ctl: Control| {
        let p = probe.clone();
        async move {
            let _leave = Leave(p);
            let res: BodyResult = async {
                ctl.shall_stop().await;
                Ok(())
            }
            .await;
            // Cleanup overrides the clean result.
            res.and(Err(LoopError::fail("deferred error")))
        }
    });

    assert_eq!(l.kill("ouch").await, Err(LoopError::fail("deferred error")));
    assert!(p.done());
    assert_eq!(l.status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn panic_without_policy_crashes_loop() {
    let p = Probe::default();
    let l = Loop::go(panic_after(&p, SHORT));

    assert_eq!(l.wait().await, Err(LoopError::Crashed));
    assert_eq!(p.count(), 1);
    assert!(p.done());
    assert_eq!(l.error(), (Status::Stopped, Some(LoopError::Crashed)));
}

#[tokio::test(start_paused = true)]
async fn stopping_is_visible_while_body_winds_down() {
    let l = Loop::go(|ctl: Control| async move {
        ctl.shall_stop().await;
        sleep(LONG).await;
        Ok(())
    });
    assert_eq!(l.error(), (Status::Running, None));

    let killer = l.clone();
    let kill = tokio::spawn(async move { killer.kill(LoopError::fail("ouch")).await });

    sleep(SHORT).await;
    assert_eq!(l.error(), (Status::Stopping, None));

    assert_eq!(kill.await.expect("join"), Err(LoopError::fail("ouch")));
    assert_eq!(l.error(), (Status::Stopped, Some(LoopError::fail("ouch"))));
}

#[tokio::test(start_paused = true)]
async fn concurrent_stops_agree() {
    let p = Probe::default();
    let l = Loop::go(wait_for_stop(&p));

    let mut callers = Vec::new();
    for i in 0..8 {
        let l = l.clone();
        callers.push(tokio::spawn(async move {
            if i % 2 == 0 {
                l.stop().await
            } else {
                l.kill(format!("reason {i}")).await
            }
        }));
    }

    let mut results = Vec::new();
    for c in callers {
        results.push(c.await.expect("join"));
    }
    let first = results[0].clone();
    assert!(results.iter().all(|r| *r == first));
    assert_eq!(l.error(), (Status::Stopped, first.err()));
}

#[tokio::test(start_paused = true)]
async fn error_is_monotonic_after_stop() {
    let l = Loop::go(time_out_after(&Probe::default(), SHORT));

    for _ in 0..3 {
        let (status, _) = l.error();
        assert_ne!(status, Status::Stopped);
        sleep(Duration::from_millis(5)).await;
    }

    let outcome = l.wait().await;
    for _ in 0..5 {
        assert_eq!(l.error(), (Status::Stopped, outcome.clone().err()));
        l.kill(LoopError::fail("late")).await.ok();
        sleep(Duration::from_millis(5)).await;
    }
}

// ---- recovering loops ----

#[tokio::test(start_paused = true)]
async fn recovering_loop_stops_cleanly() {
    let p = Probe::default();
    let l = Loop::go_recoverable(panic_after(&p, SHORT), policies::ignore());

    sleep(LONG).await;

    assert_eq!(l.status(), Status::Running);
    assert_eq!(l.stop().await, Ok(()));
    assert!(p.done());
    assert!(p.count() >= 2);
    assert_eq!(l.status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn recovering_loop_ends_on_its_own() {
    let p = Probe::default();
    let probe = p.clone();
    let l = Loop::go_recoverable(
        move |_ctl: Control| {
            let p = probe.clone();
            async move {
                p.enter();
                let _leave = Leave(p);
                sleep(SHORT).await;
                Ok(())
            }
        },
        policies::ignore(),
    );

    sleep(LONG).await;

    assert_eq!(l.error(), (Status::Stopped, None));
    assert_eq!(p.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn policy_stops_after_five_panics() {
    let p = Probe::default();
    let l = Loop::go_recoverable(panic_after(&p, SHORT), too_many_panics);

    sleep(VERY_LONG).await;

    assert_eq!(l.stop().await, Err(LoopError::fatal("too many panics")));
    assert!(p.done());
    assert_eq!(p.count(), 5);
    assert_eq!(l.status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn limit_policy_reports_count() {
    let p = Probe::default();
    let l = Loop::go_recoverable(panic_after(&p, SHORT), policies::limit(3));

    assert_eq!(
        l.wait().await,
        Err(LoopError::TooManyRecoverings { count: 3 })
    );
    assert_eq!(p.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn returned_error_bypasses_policy() {
    let p = Probe::default();
    let l = Loop::go_recoverable(time_out_after(&p, SHORT), catch_timeout);

    sleep(LONG).await;

    assert_eq!(l.stop().await, Err(LoopError::fail("timed out")));
    assert!(p.done());
    assert_eq!(p.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn returned_error_is_terminal_even_with_ignore_policy() {
    let p = Probe::default();
    let l = Loop::go_recoverable(time_out_after(&p, SHORT), policies::ignore());

    assert_eq!(l.wait().await, Err(LoopError::fail("timed out")));
    assert_eq!(p.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn raised_error_is_judged_by_policy() {
    let p = Probe::default();
    let probe = p.clone();
    let l = Loop::go_recoverable(
        move |ctl: Control| {
            let p = probe.clone();
            async move {
                p.enter();
                sleep(SHORT).await;
                if !ctl.is_stopping() {
                    std::panic::panic_any(LoopError::fail("timed out"));
                }
                Ok(())
            }
        },
        catch_timeout,
    );

    sleep(LONG).await;

    assert_eq!(l.stop().await, Err(LoopError::fail("timed out")));
    assert_eq!(p.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn panic_after_stop_request_ends_loop() {
    let p = Probe::default();
    let probe = p.clone();
    let l = Loop::go_recoverable(
        move |ctl: Control| {
            let p = probe.clone();
            async move {
                p.enter();
                ctl.shall_stop().await;
                panic!("panic while stopping");
            }
        },
        policies::ignore(),
    );

    assert_eq!(l.kill(LoopError::fail("ouch")).await, Err(LoopError::fail("ouch")));
    assert_eq!(p.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn policy_panic_is_terminal() {
    let l = Loop::go_recoverable(
        panic_after(&Probe::default(), SHORT),
        |_rs: Recoverings| -> Result<Recoverings, LoopError> { panic!("policy boom") },
    );

    assert_eq!(
        l.wait().await,
        Err(LoopError::PolicyPanicked {
            reason: "policy boom".into()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn policy_sees_growing_history() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_policy = Arc::clone(&seen);
    let l = Loop::go_recoverable(
        panic_after(&Probe::default(), SHORT),
        move |rs: Recoverings| -> Result<Recoverings, LoopError> {
            seen_by_policy.lock().unwrap().push(rs.len());
            if rs.len() == 3 {
                return Err(LoopError::fatal("enough"));
            }
            Ok(rs)
        },
    );

    assert_eq!(l.wait().await, Err(LoopError::fatal("enough")));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn stop_cuts_restart_delay_short() {
    let p = Probe::default();
    let cfg = LoopConfig {
        restart_delay: Some(BackoffPolicy::constant(Duration::from_secs(3600))),
        ..LoopConfig::named("slow-restart")
    };
    let l = Loop::builder(cfg)
        .with_recovery(policies::ignore())
        .spawn(panic_after(&p, SHORT));

    sleep(LONG).await;
    assert_eq!(p.count(), 1);

    let started = Instant::now();
    assert_eq!(l.stop().await, Ok(()));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(p.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_delay_grows_with_each_restart() {
    let p = Probe::default();
    let cfg = LoopConfig {
        restart_delay: Some(BackoffPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }),
        ..LoopConfig::named("backoff")
    };
    let started = Instant::now();
    let l = Loop::builder(cfg)
        .with_recovery(policies::limit(4))
        .spawn(panic_after(&p, SHORT));
    let mut rx = l.subscribe();

    assert_eq!(l.wait().await, Err(LoopError::TooManyRecoverings { count: 4 }));
    assert_eq!(p.count(), 4);

    let mut delays = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::RestartScheduled {
            delays.push(ev.delay_ms);
        }
    }
    assert_eq!(delays, vec![Some(10), Some(20), Some(40)]);

    // Four 20ms invocations plus 10 + 20 + 40ms of restart delay.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(150), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(200), "elapsed {elapsed:?}");
}

// ---- events ----

struct Recorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn events_trace_recovery_cycle() {
    let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
    let l = Loop::builder(LoopConfig::named("traced"))
        .with_recovery(policies::limit(2))
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .spawn(panic_after(&Probe::default(), SHORT));
    let mut rx = l.subscribe();

    assert_eq!(l.wait().await, Err(LoopError::TooManyRecoverings { count: 2 }));

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        assert_eq!(ev.name.as_deref(), Some("traced"));
        kinds.push(ev.kind);
    }
    // LoopStarting for attempt 1 may precede `subscribe()`.
    assert_eq!(
        kinds[kinds.len().saturating_sub(6)..].to_vec(),
        vec![
            EventKind::BodyPanicked,
            EventKind::RestartScheduled,
            EventKind::LoopStarting,
            EventKind::BodyPanicked,
            EventKind::RecoveryDeclined,
            EventKind::LoopStopped,
        ]
    );

    sleep(SHORT).await;
    let recorded = rec.0.lock().unwrap().clone();
    assert_eq!(recorded.first(), Some(&EventKind::LoopStarting));
    assert_eq!(recorded.last(), Some(&EventKind::LoopStopped));
    assert_eq!(
        recorded.iter().filter(|k| **k == EventKind::BodyPanicked).count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn first_stop_request_is_published_once() {
    let l = Loop::go(wait_for_stop(&Probe::default()));
    let mut rx = l.subscribe();

    let _ = l.kill(LoopError::fail("ouch")).await;
    let _ = l.stop().await;

    let mut requests = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::StopRequested {
            requests.push(ev.reason);
        }
    }
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].as_deref(), Some("execution failed: ouch"));
}

struct AlwaysPanics;

#[async_trait]
impl Subscribe for AlwaysPanics {
    async fn on_event(&self, _ev: &Event) {
        panic!("subscriber boom");
    }

    fn name(&self) -> &'static str {
        "always-panics"
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_is_reported_once_per_event() {
    let l = Loop::builder(LoopConfig::named("noisy"))
        .with_subscribers(vec![Arc::new(AlwaysPanics) as Arc<dyn Subscribe>])
        .spawn(wait_for_stop(&Probe::default()));
    let mut rx = l.subscribe();

    for _ in 0..2000 {
        tokio::task::yield_now().await;
    }

    // Only LoopStarting reached the subscriber so far.
    let mut panicked = 0;
    loop {
        match rx.try_recv() {
            Ok(ev) if ev.kind == EventKind::SubscriberPanicked => {
                assert_eq!(ev.name.as_deref(), Some("always-panics"));
                panicked += 1;
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(n)) => panic!("receiver lagged by {n} events"),
            Err(_) => break,
        }
    }
    assert_eq!(panicked, 1);
    assert_eq!(l.status(), Status::Running);
    assert_eq!(l.stop().await, Ok(()));
}

// ---- runtime shutdown ----

#[test]
fn dropped_runtime_aborts_loop() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let l = rt.block_on(async {
        let l = Loop::go(wait_for_stop(&Probe::default()));
        sleep(Duration::from_millis(1)).await;
        l
    });
    assert_eq!(l.status(), Status::Running);

    drop(rt);
    assert_eq!(l.error(), (Status::Stopped, Some(LoopError::Aborted)));
}
