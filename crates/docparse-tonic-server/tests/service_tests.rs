//! Router-level tests against the gRPC handler, with instrumented
//! engines standing in for the external parsing operation.

use core::time::Duration;
use docparse_tonic_core::proto::ParseRequest;
use docparse_tonic_core::proto::doc_parser_server::DocParser;
use docparse_tonic_core::{Error, OptionSet, codec};
use docparse_tonic_server::server::config::{Accelerator, ServerConfig};
use docparse_tonic_server::server::engine::ParseEngine;
use docparse_tonic_server::server::service::handler::ParseService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tonic::{Code, Request};
use uuid::Uuid;

/// Shared observation point for every engine a test spawns.
#[derive(Default)]
struct Probe {
    parses: AtomicUsize,
    reclaims: AtomicUsize,
    inflight: AtomicUsize,
    overlap: AtomicBool,
    seen_options: Mutex<Vec<OptionSet>>,
}

struct TestEngine {
    probe: Arc<Probe>,
    fail: bool,
    delay: Duration,
}

impl ParseEngine for TestEngine {
    fn parse(
        &mut self,
        _document: &[u8],
        _job_id: &str,
        opts: &OptionSet,
    ) -> docparse_tonic_core::Result<()> {
        let prev = self.probe.inflight.fetch_add(1, Ordering::SeqCst);
        if prev > 0 {
            self.probe.overlap.store(true, Ordering::SeqCst);
        }
        self.probe.seen_options.lock().unwrap().push(opts.clone());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.probe.inflight.fetch_sub(1, Ordering::SeqCst);
        self.probe.parses.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(Error::Processing {
                detail: "synthetic engine failure".to_string(),
            });
        }
        Ok(())
    }

    fn reclaim(&mut self) {
        self.probe.reclaims.fetch_add(1, Ordering::SeqCst);
    }
}

fn test_config(devices: usize, workers_per_device: usize) -> ServerConfig {
    ServerConfig {
        server_addr: "127.0.0.1:0".to_string(),
        output_dir: std::env::temp_dir(),
        accelerator: Accelerator::Cpu,
        devices,
        workers_per_device,
        request_timeout: None,
        shutdown_timeout_secs: 1,
    }
}

fn service_with(
    config: ServerConfig,
    probe: &Arc<Probe>,
    fail: bool,
    delay: Duration,
) -> ParseService {
    let probe = Arc::clone(probe);
    ParseService::new(config, move |_binding| {
        Ok(TestEngine {
            probe: Arc::clone(&probe),
            fail,
            delay,
        })
    })
    .unwrap()
}

fn request(bytes: &[u8], kwargs: &[(&str, &str)]) -> Request<ParseRequest> {
    let kwargs: HashMap<String, String> = kwargs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Request::new(ParseRequest {
        file: codec::encode(bytes),
        kwargs,
    })
}

#[tokio::test]
async fn router_applies_option_defaults() {
    let probe = Arc::new(Probe::default());
    let service = service_with(test_config(1, 1), &probe, false, Duration::ZERO);

    service.parse(request(b"doc", &[])).await.unwrap();
    service
        .parse(request(b"doc", &[("parse_method", "manual"), ("table_mode", "lattice")]))
        .await
        .unwrap();

    let seen = probe.seen_options.lock().unwrap();
    assert_eq!(seen[0], OptionSet::default());
    assert_eq!(seen[1].parse_method, "manual");
    assert!(!seen[1].debug_enabled);
    assert_eq!(
        seen[1].extra.get("table_mode").map(String::as_str),
        Some("lattice")
    );
}

#[tokio::test]
async fn malformed_payload_is_a_client_error_and_touches_no_slot() {
    let probe = Arc::new(Probe::default());
    let service = service_with(test_config(1, 1), &probe, false, Duration::ZERO);

    let status = service
        .parse(Request::new(ParseRequest {
            file: "%%not-base64%%".to_string(),
            kwargs: HashMap::new(),
        }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(probe.parses.load(Ordering::SeqCst), 0);
    assert_eq!(probe.reclaims.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_job_reclaims_once_and_returns_an_output_location() {
    let probe = Arc::new(Probe::default());
    let service = service_with(test_config(1, 1), &probe, false, Duration::ZERO);

    let response = service.parse(request(b"doc", &[])).await.unwrap();
    let output_dir = response.into_inner().output_dir;

    assert!(Uuid::parse_str(&output_dir).is_ok());
    assert_eq!(probe.parses.load(Ordering::SeqCst), 1);
    assert_eq!(probe.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn engine_failure_surfaces_and_still_reclaims_once() {
    let probe = Arc::new(Probe::default());
    let service = service_with(test_config(1, 1), &probe, true, Duration::ZERO);

    let status = service.parse(request(b"doc", &[])).await.unwrap_err();

    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("synthetic engine failure"));
    assert_eq!(probe.reclaims.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_serialized_per_slot() {
    let probe = Arc::new(Probe::default());
    // A single slot must never run two jobs at once, however many
    // requests pile up in front of it.
    let service = service_with(test_config(1, 1), &probe, false, Duration::from_millis(20));

    let calls = (0..8).map(|i| {
        let service = service.clone();
        async move {
            service
                .parse(request(format!("doc-{i}").as_bytes(), &[]))
                .await
        }
    });
    let outcomes = futures::future::join_all(calls).await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert!(!probe.overlap.load(Ordering::SeqCst));
    assert_eq!(probe.parses.load(Ordering::SeqCst), 8);
    assert_eq!(probe.reclaims.load(Ordering::SeqCst), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn busy_slot_never_shadows_an_idle_one() {
    struct GatedEngine {
        probe: Arc<Probe>,
    }

    impl ParseEngine for GatedEngine {
        fn parse(
            &mut self,
            document: &[u8],
            _job_id: &str,
            _opts: &OptionSet,
        ) -> docparse_tonic_core::Result<()> {
            if document == b"slow" {
                std::thread::sleep(Duration::from_millis(400));
            }
            self.probe.parses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn reclaim(&mut self) {
            self.probe.reclaims.fetch_add(1, Ordering::SeqCst);
        }
    }

    let probe = Arc::new(Probe::default());
    let probe_for_factory = Arc::clone(&probe);
    let service = ParseService::new(test_config(2, 1), move |_binding| {
        Ok(GatedEngine {
            probe: Arc::clone(&probe_for_factory),
        })
    })
    .unwrap();

    // Occupy one slot, then submit a quick job while it is busy: the
    // quick job must run on the remaining idle slot instead of queueing
    // behind the busy one.
    let slow_service = service.clone();
    let slow = tokio::spawn(async move { slow_service.parse(request(b"slow", &[])).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = std::time::Instant::now();
    service.parse(request(b"fast", &[])).await.unwrap();
    assert!(
        start.elapsed() < Duration::from_millis(250),
        "quick job waited {:?} behind a busy slot",
        start.elapsed()
    );

    slow.await.unwrap().unwrap();
    assert_eq!(probe.parses.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_slots_are_excluded_from_routing() {
    let probe = Arc::new(Probe::default());
    let probe_for_factory = Arc::clone(&probe);

    // Device 0 fails configuration; device 1 carries the load.
    let service = ParseService::new(test_config(2, 1), move |binding| {
        if binding.device_id == 0 {
            return Err(Error::Configuration {
                detail: "device 0 is misconfigured".to_string(),
            });
        }
        Ok(TestEngine {
            probe: Arc::clone(&probe_for_factory),
            fail: false,
            delay: Duration::ZERO,
        })
    })
    .unwrap();

    for i in 0..4 {
        service
            .parse(request(format!("doc-{i}").as_bytes(), &[]))
            .await
            .unwrap();
    }
    assert_eq!(probe.parses.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn all_slots_failing_aborts_startup() {
    let result = ParseService::new(test_config(2, 2), |_binding| {
        Err::<TestEngine, _>(Error::Configuration {
            detail: "no accelerator present".to_string(),
        })
    });

    assert!(matches!(result, Err(Error::Configuration { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn request_deadline_answers_deadline_exceeded() {
    let probe = Arc::new(Probe::default());
    let mut config = test_config(1, 1);
    config.request_timeout = Some(Duration::from_millis(50));
    let service = service_with(config, &probe, false, Duration::from_millis(300));

    let status = service.parse(request(b"doc", &[])).await.unwrap_err();

    assert_eq!(status.code(), Code::DeadlineExceeded);
}
