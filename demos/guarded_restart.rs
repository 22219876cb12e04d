//! # Example: guarded_restart
//!
//! Demonstrates replacing a container on a node: the old container's cleanup
//! claims the resource slot, and the replacement's launch is held back until
//! teardown finishes.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► submit_cleanup (old container teardown claims the slot)
//!   ├─► spawn teardown task
//!   │     ├─► sleep 500ms (simulated teardown work)
//!   │     └─► cleanup.mark_done()
//!   │
//!   ├─► submit_launch (replacement container)
//!   └─► launch.cleared().await  ◄── resolves only after mark_done
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example guarded_restart
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use launchguard::{LaunchGuard, NoopReporter};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("=== guarded_restart example ===\n");

    let guard = LaunchGuard::new(Arc::new(NoopReporter));
    let shutdown = CancellationToken::new();

    // 1. The old container's stop path claims the slot, with a teardown
    //    budget of 30 seconds.
    let cleanup = guard
        .submit_cleanup(&shutdown, Some(Duration::from_secs(30)))
        .await;
    println!("[stop] cleanup accepted, slot claimed");

    let teardown = tokio::spawn(async move {
        println!("[stop] tearing down old container...");
        tokio::time::sleep(Duration::from_millis(500)).await;
        cleanup.mark_done();
        println!("[stop] teardown finished, slot released");
    });

    // 2. The replacement's start path queues behind the cleanup.
    let started = Instant::now();
    let launch = guard.submit_launch().await;
    println!("[start] launch accepted, waiting for clearance");

    launch.cleared().await;
    println!(
        "[start] clearance granted after {:?}, starting container",
        started.elapsed()
    );

    teardown.await.unwrap();
}
