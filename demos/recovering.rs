//! # Example: recovering loop with restart delay and logging
//!
//! A worker panics every few ticks. A limiting policy allows three panics
//! inside a sliding window; the LogWriter prints every lifecycle event.
//!
//! ## Run
//! ```bash
//! cargo run --example recovering --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use loopvisor::{
    BackoffPolicy, Control, JitterPolicy, LogWriter, Loop, LoopConfig, LoopError, Subscribe,
    recovery::policies,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cfg = LoopConfig {
        restart_delay: Some(BackoffPolicy {
            first: Duration::from_millis(50),
            max: Duration::from_millis(400),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }),
        ..LoopConfig::named("flaky-worker")
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let worker = Loop::builder(cfg)
        .with_subscribers(subs)
        .with_recovery(policies::limit_within(3, Duration::from_secs(10)))
        .spawn(|ctl: Control| async move {
            let mut ticks = 0u32;
            loop {
                tokio::select! {
                    _ = ctl.shall_stop() => return Ok::<_, LoopError>(()),
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        ticks += 1;
                        println!("[worker] attempt={} tick={ticks}", ctl.attempt());
                        if ticks == 3 {
                            panic!("worker lost its connection");
                        }
                    }
                }
            }
        });

    let outcome = worker.wait().await;
    println!("[main] loop finished: {outcome:?}");

    // Let the subscriber worker flush the last events.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
