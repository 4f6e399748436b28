use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mimicnet::{Handle, HandleConfig, HandleOption, HandlePool, NativeHandle, NetError};
use std::sync::Arc;

/// Handle with no engine behind it, so only pool overhead is measured.
struct NullHandle;

impl Handle for NullHandle {
    fn open() -> Result<Self, NetError> {
        Ok(NullHandle)
    }

    fn set_option(&mut self, option: HandleOption) -> Result<(), NetError> {
        black_box(option);
        Ok(())
    }

    async fn perform(&mut self) -> Result<(), NetError> {
        Ok(())
    }

    fn response_code(&self) -> Option<u16> {
        None
    }

    fn content_type(&self) -> Option<String> {
        None
    }

    fn reset(&mut self) {}
}

fn benchmark_pool_operations(c: &mut Criterion) {
    let config = Arc::new(HandleConfig::default().with_defaults());

    let pool: HandlePool<NullHandle> = HandlePool::new(config.clone());
    c.bench_function("pool_checkout_release", |b| {
        b.iter(|| {
            let guard = pool.checkout().unwrap();
            black_box(&guard);
        })
    });

    let pool: HandlePool<NullHandle> = HandlePool::new(config.clone());
    c.bench_function("pool_acquire_miss", |b| {
        b.iter(|| {
            // Holding every handle forces a creation on each acquire.
            let first = pool.acquire().unwrap();
            let second = pool.acquire().unwrap();
            black_box((first, second))
        })
    });

    // Real handles apply every option through the native engine.
    let pool: HandlePool<NativeHandle> = HandlePool::new(config);
    c.bench_function("pool_checkout_native", |b| {
        b.iter(|| {
            let guard = pool.checkout().unwrap();
            black_box(guard.cached_connections());
        })
    });
}

criterion_group!(benches, benchmark_pool_operations);
criterion_main!(benches);
