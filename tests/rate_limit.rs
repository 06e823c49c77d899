use gatehouse::rate_limit::{
    CallerTier, CounterStore, Decision, FixedWindowLimiter, OperationClass, PolicyTable,
    RateLimitPolicy, RateLimiter,
};
use gatehouse::{GateConfig, ManualClock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn limiter_with(clock: &ManualClock, policies: PolicyTable) -> FixedWindowLimiter {
    FixedWindowLimiter::with_store(Arc::new(CounterStore::new()), policies, Arc::new(clock.clone()))
}

#[test]
fn anonymous_mutations_scenario() {
    let clock = ManualClock::starting_at(0);
    let limiter = limiter_with(&clock, PolicyTable::default());

    // Calls 1-5 within the first ten seconds.
    let mut remaining = Vec::new();
    for _ in 0..5 {
        remaining.push(limiter.check("1.2.3.4", false, OperationClass::Mutations).remaining());
        clock.advance(2_000);
    }
    assert_eq!(remaining, vec![Some(4), Some(3), Some(2), Some(1), Some(0)]);

    clock.set(11_000);
    let sixth = limiter.check("1.2.3.4", false, OperationClass::Mutations);
    assert_eq!(sixth, Decision::Denied { retry_after_secs: 49, limit: 5 });
}

#[test]
fn n_plus_first_call_is_denied_for_every_cell() {
    let table = PolicyTable::default();
    for tier in [CallerTier::Unauthenticated, CallerTier::Authenticated] {
        for class in OperationClass::ALL {
            let clock = ManualClock::starting_at(500);
            let limiter = limiter_with(&clock, table);
            let n = table.resolve(tier, class).requests();
            let authed = tier == CallerTier::Authenticated;
            for i in 0..n {
                let allowed = limiter.check("k", authed, class).is_allowed();
                assert!(allowed, "{tier}/{class} call {}", i + 1);
            }
            let allowed = limiter.check("k", authed, class).is_allowed();
            assert!(!allowed, "{tier}/{class} call {}", n + 1);
        }
    }
}

#[test]
fn window_reset_behaves_like_first_request() {
    let clock = ManualClock::starting_at(0);
    let policy = RateLimitPolicy::new(2, Duration::from_secs(10)).unwrap();
    let table =
        PolicyTable::default().with(CallerTier::Authenticated, OperationClass::General, policy);
    let limiter = limiter_with(&clock, table);

    for _ in 0..5 {
        limiter.check("u42", true, OperationClass::General);
    }
    clock.advance(10_000);
    let fresh = limiter.check("u42", true, OperationClass::General);
    assert_eq!(fresh, Decision::Allowed { remaining: 1, limit: 2 });
}

#[test]
fn distinct_callers_do_not_share_quota() {
    let clock = ManualClock::starting_at(0);
    let limiter = limiter_with(&clock, PolicyTable::default());
    for _ in 0..5 {
        limiter.check("1.2.3.4", false, OperationClass::Mutations);
    }
    assert!(!limiter.check("1.2.3.4", false, OperationClass::Mutations).is_allowed());
    assert_eq!(limiter.check("5.6.7.8", false, OperationClass::Mutations).remaining(), Some(4));
    assert_eq!(limiter.check("1.2.3.4", true, OperationClass::Mutations).remaining(), Some(29));
}

#[test]
fn boundary_burst_is_bounded_by_two_windows() {
    let clock = ManualClock::starting_at(0);
    let limiter = limiter_with(&clock, PolicyTable::default());
    let mut admitted = 0;
    clock.set(59_000);
    // Window opened at 59s: spend it, then spend the next one right after it resets.
    for _ in 0..10 {
        if limiter.check("ip", false, OperationClass::Mutations).is_allowed() {
            admitted += 1;
        }
    }
    clock.set(119_000);
    for _ in 0..10 {
        if limiter.check("ip", false, OperationClass::Mutations).is_allowed() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_never_exceed_cap() {
    let clock = ManualClock::starting_at(0);
    let policy = RateLimitPolicy::new(50, Duration::from_secs(60)).unwrap();
    let table =
        PolicyTable::default().with(CallerTier::Authenticated, OperationClass::Search, policy);
    let limiter = Arc::new(limiter_with(&clock, table));
    let admitted = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let limiter = limiter.clone();
        let admitted = admitted.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                if limiter.check("hot-user", true, OperationClass::Search).is_allowed() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for h in handles {
        h.await.expect("task panicked");
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 50);
}

#[tokio::test(start_paused = true)]
async fn sweeper_bounds_store_to_active_keys() {
    let clock = ManualClock::starting_at(0);
    let limiter = limiter_with(&clock, PolicyTable::default());
    for i in 0..100 {
        limiter.check(&format!("10.0.0.{i}"), false, OperationClass::General);
    }
    assert_eq!(limiter.store().len(), 100);

    limiter.start_sweeper();
    clock.set(60_000);
    limiter.check("10.0.1.1", false, OperationClass::General);

    tokio::time::sleep(Duration::from_secs(301)).await;
    tokio::task::yield_now().await;
    assert_eq!(limiter.store().len(), 1);

    limiter.stop().await;
}

#[tokio::test(start_paused = true)]
async fn configured_sweep_interval_drives_the_sweeper() {
    let config = GateConfig::from_json_str(r#"{"sweep_interval_ms":1000}"#).unwrap();
    let clock = ManualClock::starting_at(0);
    let limiter = FixedWindowLimiter::from_config(&config).with_clock(Arc::new(clock.clone()));
    assert_eq!(limiter.sweep_interval(), Duration::from_secs(1));

    limiter.check("10.0.0.1", false, OperationClass::General);
    assert_eq!(limiter.store().len(), 1);

    limiter.start_sweeper();
    clock.set(60_000);
    tokio::time::sleep(Duration::from_millis(1_001)).await;
    tokio::task::yield_now().await;
    assert!(limiter.store().is_empty());

    limiter.stop().await;
}
