use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gatehouse::gate::{endpoints, CollaboratorError};
use gatehouse::prelude::*;

use async_trait::async_trait;
use http::HeaderMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// No sessions, no rows: every request is anonymous and every lookup misses.
struct Nobody;

#[async_trait]
impl IdentityResolver for Nobody {
    async fn resolve(&self, _headers: &HeaderMap) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }
}

#[async_trait]
impl OwnershipLookup for Nobody {
    async fn lookup(
        &self,
        _resource: ResourceType,
        _id: &str,
    ) -> Result<Option<ResourceOwnership>, CollaboratorError> {
        Ok(None)
    }
}

fn check_hot_key(c: &mut Criterion) {
    let limiter = FixedWindowLimiter::new(PolicyTable::default());

    // After the first 100 calls every check is a denial on the same shard.
    c.bench_function("fixed_window_hot_key", |b| {
        b.iter(|| black_box(limiter.check(black_box("1.2.3.4"), false, OperationClass::General)));
    });
}

fn check_distinct_keys(c: &mut Criterion) {
    let limiter = FixedWindowLimiter::new(PolicyTable::default());
    let next = AtomicU64::new(0);

    c.bench_function("fixed_window_distinct_keys", |b| {
        b.iter(|| {
            let n = next.fetch_add(1, Ordering::Relaxed);
            black_box(limiter.check(&format!("user-{}", n % 100_000), true, OperationClass::Search))
        });
    });
}

fn gate_admit_read(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = GateConfig::default();
    let limiter = FixedWindowLimiter::from_config(&config);
    let gate = RequestGate::new(&config, Arc::new(limiter), Arc::new(Nobody), Arc::new(Nobody));

    c.bench_function("gate_admit_public_read", |b| {
        b.to_async(&rt).iter(|| async {
            let req = GateRequest::new(endpoints::CLIP_READ, HeaderMap::new());
            let _ = black_box(gate.admit(black_box(&req)).await);
        });
    });
}

criterion_group!(benches, check_hot_key, check_distinct_keys, gate_admit_read);
criterion_main!(benches);
