//! Pool semantics tests over the generic core.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::*;

/// A pool of integers with a counting factory, a configurable reset,
/// and a disposal counter.
fn int_pool(
    capacity: usize,
    discard_on_reset: Arc<AtomicBool>,
    disposed: Arc<AtomicUsize>,
) -> Pool<usize> {
    let counter = Arc::new(AtomicUsize::new(0));
    Pool::new(
        capacity,
        move || {
            let counter = counter.clone();
            Box::pin(async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) })
                as BoxFuture<Result<usize, PoolError>>
        },
        move |handle| {
            let discard = discard_on_reset.load(Ordering::SeqCst);
            Box::pin(async move { if discard { None } else { Some(handle) } })
                as BoxFuture<Option<usize>>
        },
        move |_handle| {
            disposed.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {}) as BoxFuture<()>
        },
    )
}

fn healthy_pool(capacity: usize) -> Pool<usize> {
    int_pool(
        capacity,
        Arc::new(AtomicBool::new(false)),
        Arc::new(AtomicUsize::new(0)),
    )
}

#[tokio::test]
async fn acquire_creates_up_to_capacity() {
    let pool = healthy_pool(2);
    let a = pool.acquire(None).await.unwrap();
    let b = pool.acquire(None).await.unwrap();
    assert_ne!(a, b);
    assert_eq!(pool.counts().await, (2, 0));
}

#[tokio::test]
async fn release_prefers_idle_reuse_over_creation() {
    let pool = healthy_pool(2);
    let a = pool.acquire(None).await.unwrap();
    pool.release(a).await;
    assert_eq!(pool.counts().await, (1, 1));

    let again = pool.acquire(None).await.unwrap();
    assert_eq!(again, a);
    assert_eq!(pool.counts().await, (1, 0));
}

#[tokio::test]
async fn exhausted_pool_blocks_until_release() {
    let pool = Arc::new(healthy_pool(1));
    let held = pool.acquire(None).await.unwrap();

    let waiter_pool = pool.clone();
    let waiter = tokio::spawn(async move { waiter_pool.acquire(None).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    pool.release(held).await;
    let handle = waiter.await.unwrap().unwrap();
    assert_eq!(handle, held);
}

#[tokio::test]
async fn waiters_are_served_fifo() {
    let pool = Arc::new(healthy_pool(1));
    let held = pool.acquire(None).await.unwrap();

    // Queue A strictly before B.
    let pool_a = pool.clone();
    let a = tokio::spawn(async move { pool_a.acquire(None).await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    let pool_b = pool.clone();
    let b = tokio::spawn(async move { pool_b.acquire(None).await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    pool.release(held).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    // A, the longest-queued, wins the release; B is still waiting.
    assert!(a.is_finished());
    assert!(!b.is_finished());

    let from_a = a.await.unwrap().unwrap();
    pool.release(from_a).await;
    b.await.unwrap().unwrap();
}

#[tokio::test]
async fn acquire_times_out_when_exhausted() {
    let pool = healthy_pool(1);
    let _held = pool.acquire(None).await.unwrap();

    let result = pool.acquire(Some(Duration::from_millis(100))).await;
    assert!(matches!(result, Err(PoolError::Timeout(_))));
}

#[tokio::test]
async fn timed_out_waiter_is_skipped_at_release() {
    let pool = Arc::new(healthy_pool(1));
    let held = pool.acquire(None).await.unwrap();

    // This waiter gives up before the release happens.
    let result = pool.acquire(Some(Duration::from_millis(50))).await;
    assert!(matches!(result, Err(PoolError::Timeout(_))));

    // A later waiter must still be served.
    let pool_late = pool.clone();
    let late = tokio::spawn(async move { pool_late.acquire(None).await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    pool.release(held).await;
    late.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_reset_shrinks_the_pool() {
    let discard = Arc::new(AtomicBool::new(true));
    let pool = int_pool(1, discard.clone(), Arc::new(AtomicUsize::new(0)));

    let first = pool.acquire(None).await.unwrap();
    pool.release(first).await;
    assert_eq!(pool.counts().await, (0, 0));

    // The next acquire creates a fresh handle.
    discard.store(false, Ordering::SeqCst);
    let second = pool.acquire(None).await.unwrap();
    assert_ne!(second, first);
}

#[tokio::test]
async fn close_disposes_idle_handles() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let pool = int_pool(2, Arc::new(AtomicBool::new(false)), disposed.clone());

    let held = pool.acquire(None).await.unwrap();
    pool.release(held).await;

    assert_eq!(pool.close().await, 1);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);

    let result = pool.acquire(None).await;
    assert!(matches!(result, Err(PoolError::Closed)));
}

#[tokio::test]
async fn release_into_closed_pool_disposes_the_handle() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let pool = int_pool(1, Arc::new(AtomicBool::new(false)), disposed.clone());

    let held = pool.acquire(None).await.unwrap();
    pool.close().await;

    // The checked-out handle must be torn down, not leaked.
    pool.release(held).await;
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.counts().await, (0, 0));
}

#[tokio::test]
async fn failed_create_frees_the_slot() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in = attempts.clone();
    let pool: Pool<usize> = Pool::new(
        1,
        move || {
            let n = attempts_in.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n == 0 {
                    Err(PoolError::CreateFailed("boom".to_string()))
                } else {
                    Ok(n)
                }
            }) as BoxFuture<Result<usize, PoolError>>
        },
        |handle| Box::pin(async move { Some(handle) }) as BoxFuture<Option<usize>>,
        |_handle| Box::pin(async {}) as BoxFuture<()>,
    );

    assert!(matches!(
        pool.acquire(None).await,
        Err(PoolError::CreateFailed(_))
    ));
    // The failed slot was returned; capacity one still admits a handle.
    pool.acquire(None).await.unwrap();
}
