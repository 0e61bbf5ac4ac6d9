use core::time::Duration;
use docparse_dispatch::probe::wait_until_ready;
use std::time::Instant;
use tokio::net::TcpListener;

#[tokio::test]
async fn reachable_target_succeeds_on_first_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let start = Instant::now();
    let ready = wait_until_ready("127.0.0.1", port, 3, Duration::from_millis(500)).await;

    assert!(ready);
    // First attempt succeeded, so no retry sleep was taken.
    assert!(start.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn closed_target_exhausts_the_budget() {
    // Bind then drop to get a port that refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let attempts = 3;
    let delay = Duration::from_millis(100);
    let start = Instant::now();
    let ready = wait_until_ready("127.0.0.1", port, attempts, delay).await;

    assert!(!ready);
    // Sleeps happen between attempts only: (attempts - 1) * delay.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn single_attempt_budget_never_sleeps() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let start = Instant::now();
    let ready = wait_until_ready("127.0.0.1", port, 1, Duration::from_secs(10)).await;

    assert!(!ready);
    assert!(start.elapsed() < Duration::from_secs(5));
}
