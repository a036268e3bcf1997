use std::sync::Arc;
use std::time::Duration;

use super::gate::Gate;
use super::*;
use crate::error::Result;
use crate::test::timeout_or_fail;

#[test]
fn test_generate_crypto_random_string() {
    let s = generate_crypto_random_string(32, RUNES_ALPHA);
    assert_eq!(s.len(), 32);
    assert!(s.bytes().all(|b| RUNES_ALPHA.contains(&b)));

    let other = generate_crypto_random_string(32, RUNES_ALPHA);
    assert_ne!(s, other, "two 32 rune strings should not collide");
}

#[test]
fn test_gate_fires_once() {
    let gate = Gate::new();
    assert!(!gate.is_fired());
    assert!(gate.fire());
    assert!(gate.is_fired());
    assert!(!gate.fire(), "second fire must report the gate was already open");
}

#[tokio::test]
async fn test_gate_releases_all_waiters() -> Result<()> {
    let gate = Arc::new(Gate::new());

    let mut waiters = vec![];
    for _ in 0..3 {
        let gate2 = Arc::clone(&gate);
        waiters.push(tokio::spawn(async move { gate2.wait().await }));
    }
    tokio::task::yield_now().await;

    gate.fire();
    for w in waiters {
        timeout_or_fail(Duration::from_millis(100), w)
            .await
            .expect("waiter should not panic");
    }

    // waiting on an open gate returns immediately
    timeout_or_fail(Duration::from_millis(10), gate.wait()).await;

    Ok(())
}
