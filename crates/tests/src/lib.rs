//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 MockProducer 的会话 e2e 测试（无需运行游戏）
//! - 真实 UDP / 文件 sink 链路测试

#[cfg(test)]
mod contract_tests {
    use contracts::{PublishStatus, SessionState, SourceId};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_identifiers_round_trip() {
        for source in SourceId::ALL {
            assert_eq!(SourceId::parse(source.as_str()), Some(source));
        }
    }

    #[test]
    fn test_state_and_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionState::Terminated).unwrap(),
            "\"terminated\""
        );
        assert_eq!(
            serde_json::to_string(&PublishStatus::PermissionDenied).unwrap(),
            "\"permission_denied\""
        );
    }
}

/// Sinks and producers shared by the e2e tests
#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{ContractError, DataFrame, FrameSink, SourceId};
    use producers::{Producer, ProducerContext};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    /// Records the arrival time of every `send`
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub sends: Arc<Mutex<Vec<Instant>>>,
        pub closed: Arc<AtomicBool>,
        pub sends_after_close: Arc<AtomicU64>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn times(&self) -> Vec<Instant> {
            self.sends.lock().unwrap().clone()
        }

        pub fn count(&self) -> u64 {
            self.sends.lock().unwrap().len() as u64
        }
    }

    impl FrameSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&mut self, _frame: &DataFrame) -> Result<(), ContractError> {
            if self.closed.load(Ordering::SeqCst) {
                self.sends_after_close.fetch_add(1, Ordering::SeqCst);
            }
            self.sends.lock().unwrap().push(Instant::now());
            if self.fail {
                return Err(ContractError::sink_write("recording", "always fails"));
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Producer whose frame sender is handed back to the test, so frames
    /// arrive exactly when the test pushes them.
    pub struct ManualProducer {
        pub source: SourceId,
        pub frames: Arc<Mutex<Option<mpsc::Sender<contracts::TelemetryFrame>>>>,
    }

    impl Producer for ManualProducer {
        fn source(&self) -> SourceId {
            self.source
        }

        fn spawn(self: Box<Self>, ctx: ProducerContext) -> JoinHandle<()> {
            *self.frames.lock().unwrap() = Some(ctx.frames.clone());
            tokio::spawn(async move {
                ctx.cancel.cancelled().await;
            })
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        SessionState, SinkConfig, SinkType, SourceId, StreamConfig, StreamerConfig,
    };
    use config_loader::{ConfigFormat, ConfigLoader};
    use producers::decoders::ACC_PHYSICS_PAGE_LEN;
    use producers::mock::synthetic_frame;
    use producers::{MockProducer, MockProducerConfig};
    use supervisor::{subscribe, subscribe_with_producer, DEFAULT_FRAME_INTERVAL};

    use crate::support::{ManualProducer, RecordingSink};

    fn mock(config: MockProducerConfig) -> Option<Box<dyn producers::Producer>> {
        Some(Box::new(MockProducer::new(config)))
    }

    /// Unknown source: streams nothing, terminates cleanly on cancel
    #[tokio::test(start_paused = true)]
    async fn test_unknown_source_lifecycle() {
        let sink = RecordingSink::default();
        let handle = subscribe("A", sink.clone(), &StreamerConfig::default()).unwrap();
        assert_eq!(handle.state(), SessionState::Streaming);

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.cancel();
        handle.terminated().await;

        let report = handle.join().await.unwrap();
        assert_eq!(report.final_state, SessionState::Terminated);
        assert!(!report.producer_started());
        assert_eq!(report.stop_directives_sent(), 0);
        assert_eq!(sink.count(), 0);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    /// 120 frames/s for one second through a 60 fps throttle
    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_at_double_rate() {
        let slot = Arc::new(Mutex::new(None));
        let producer = ManualProducer {
            source: SourceId::DirtRally2,
            frames: slot.clone(),
        };
        let sink = RecordingSink::default();
        let handle = subscribe_with_producer(
            "dirtRally2",
            Some(Box::new(producer)),
            sink.clone(),
            &StreamConfig::default(),
        )
        .unwrap();

        let frames = slot.lock().unwrap().take().unwrap();
        let step = Duration::from_secs(1) / 120;

        for i in 0..120u64 {
            if i > 0 {
                tokio::time::advance(step).await;
            }
            frames.send(synthetic_frame(SourceId::DirtRally2, i + 1)).await.unwrap();
            while handle.metrics().received <= i {
                tokio::task::yield_now().await;
            }
        }

        let report = handle.shutdown().await.unwrap();
        assert_eq!(report.metrics.received, 120);
        assert!(
            (59..=61).contains(&report.metrics.accepted),
            "forwarded {}",
            report.metrics.accepted
        );
        assert_eq!(report.metrics.throttled + report.metrics.accepted, 120);

        let times = sink.times();
        assert_eq!(times.len() as u64, report.metrics.delivered);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_FRAME_INTERVAL);
        }
    }

    /// Mock source ticking faster than the limit: spacing always holds
    #[tokio::test(start_paused = true)]
    async fn test_forwarded_frames_are_spaced() {
        let sink = RecordingSink::default();
        let handle = subscribe_with_producer(
            "forzaHorizon5",
            mock(MockProducerConfig::at_rate(SourceId::ForzaHorizon5, 120)),
            sink.clone(),
            &StreamConfig::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let report = handle.shutdown().await.unwrap();

        assert!(report.metrics.accepted > 30 && report.metrics.accepted <= 61);
        assert!(report.metrics.throttled > 0);
        for pair in sink.times().windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_FRAME_INTERVAL);
        }
    }

    /// A slow source is forwarded in full
    #[tokio::test(start_paused = true)]
    async fn test_slow_source_passes_through() {
        let sink = RecordingSink::default();
        let handle = subscribe_with_producer(
            "outgauge",
            mock(MockProducerConfig {
                max_frames: Some(20),
                ..MockProducerConfig::at_rate(SourceId::OutGauge, 20)
            }),
            sink.clone(),
            &StreamConfig::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let report = handle.shutdown().await.unwrap();

        assert_eq!(report.metrics.received, 20);
        assert_eq!(report.metrics.throttled, 0);
        assert_eq!(sink.count(), 20);
    }

    /// Every delivery fails; the session keeps streaming
    #[tokio::test(start_paused = true)]
    async fn test_failing_sink_never_ends_session() {
        let sink = RecordingSink::failing();
        let handle = subscribe_with_producer(
            "dirtRally2",
            mock(MockProducerConfig::at_rate(SourceId::DirtRally2, 60)),
            sink.clone(),
            &StreamConfig::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(handle.state(), SessionState::Streaming);

        let report = handle.shutdown().await.unwrap();
        assert!(report.metrics.accepted > 0);
        assert_eq!(report.metrics.sink_failures, report.metrics.accepted);
        assert_eq!(report.metrics.delivered, 0);
    }

    /// Cancel after termination is a no-op
    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_terminated() {
        let handle = subscribe_with_producer(
            "acc",
            mock(MockProducerConfig::at_rate(SourceId::Acc, 60)),
            RecordingSink::default(),
            &StreamConfig::default(),
        )
        .unwrap();

        handle.cancel();
        handle.terminated().await;
        handle.cancel();
        handle.cancel();
        assert_eq!(handle.state(), SessionState::Terminated);

        let report = handle.join().await.unwrap();
        assert_eq!(report.stop_directives_sent(), 1);
    }

    /// Polled sources get exactly one stop directive; listeners get none
    #[tokio::test(start_paused = true)]
    async fn test_stop_directive_only_for_polled_sources() {
        for source in SourceId::ALL {
            let producer = MockProducer::new(MockProducerConfig::at_rate(source, 60));
            let stops = producer.stop_directives();
            let handle = subscribe_with_producer(
                source.as_str(),
                Some(Box::new(producer)),
                RecordingSink::default(),
                &StreamConfig::default(),
            )
            .unwrap();

            tokio::time::sleep(Duration::from_millis(100)).await;
            let report = handle.shutdown().await.unwrap();

            let expected = u64::from(source.uses_control_channel());
            assert_eq!(stops.load(Ordering::SeqCst), expected, "{source}");
            assert_eq!(u64::from(report.stop_directives_sent()), expected, "{source}");
        }
    }

    /// A producer that ignores stop and cancel is abandoned after the deadline
    #[tokio::test(start_paused = true)]
    async fn test_stubborn_producer_bounded_shutdown() {
        let stream = StreamConfig {
            shutdown_timeout_ms: 200,
            ..StreamConfig::default()
        };
        let handle = subscribe_with_producer(
            "iRacing",
            mock(MockProducerConfig {
                ignore_shutdown: true,
                ..MockProducerConfig::at_rate(SourceId::IRacing, 60)
            }),
            RecordingSink::default(),
            &stream,
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let started = tokio::time::Instant::now();
        let report = handle.shutdown().await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(report.final_state, SessionState::Terminated);
        let producer = report.producer.unwrap();
        assert!(!producer.exited_in_time);
    }

    /// No sink calls once the session has been cancelled and closed
    #[tokio::test(start_paused = true)]
    async fn test_no_sink_calls_after_cancel() {
        let sink = RecordingSink::default();
        let handle = subscribe_with_producer(
            "forzaMotorsport2023",
            mock(MockProducerConfig::at_rate(SourceId::ForzaMotorsport2023, 240)),
            sink.clone(),
            &StreamConfig::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        let report = handle.shutdown().await.unwrap();
        let count = sink.count();
        assert_eq!(count, report.metrics.accepted);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(sink.count(), count);
        assert_eq!(sink.sends_after_close.load(Ordering::SeqCst), 0);
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    /// Producer errors are counted but never end the session
    #[tokio::test(start_paused = true)]
    async fn test_producer_errors_are_counted() {
        let handle = subscribe_with_producer(
            "acc",
            mock(MockProducerConfig {
                error_every: Some(3),
                ..MockProducerConfig::at_rate(SourceId::Acc, 30)
            }),
            RecordingSink::default(),
            &StreamConfig::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.state(), SessionState::Streaming);
        let report = handle.shutdown().await.unwrap();
        assert!(report.metrics.producer_errors >= 8);
        assert!(report.metrics.delivered >= 16);
    }

    /// A source disabled in the config file starts no producer
    #[tokio::test(start_paused = true)]
    async fn test_disabled_source_from_config_idles() {
        let config = ConfigLoader::load_from_str(
            "[sources.acc]\nenabled = false\n",
            ConfigFormat::Toml,
        )
        .unwrap();

        let sink = RecordingSink::default();
        let handle = subscribe("acc", sink.clone(), &config).unwrap();
        assert_eq!(handle.source(), Some(SourceId::Acc));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.state(), SessionState::Streaming);

        let report = handle.shutdown().await.unwrap();
        assert_eq!(report.final_state, SessionState::Terminated);
        assert!(!report.producer_started());
        assert_eq!(report.stop_directives_sent(), 0);
        assert_eq!(sink.count(), 0);
    }

    /// TOML config -> registry -> shared-memory producer -> sink
    #[tokio::test]
    async fn test_config_file_drives_shared_memory_session() {
        let dir = tempfile::tempdir().unwrap();
        let page_path = dir.path().join("acpmf_physics");
        let mut page = vec![0u8; ACC_PHYSICS_PAGE_LEN];
        page[0..4].copy_from_slice(&7i32.to_le_bytes());
        page[28..32].copy_from_slice(&140.0f32.to_le_bytes());
        std::fs::write(&page_path, page).unwrap();

        let toml = format!(
            "[stream]\ntarget_fps = 30\n\n[sources.acc]\npath = '{}'\npoll_interval_ms = 5\n",
            page_path.display()
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.stream.target_fps, 30);

        let handle = subscribe("acc", RecordingSink::default(), &config).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while handle.metrics().delivered < 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let report = handle.shutdown().await.unwrap();
        // The page never changes, so only its first sample is new.
        assert_eq!(report.metrics.delivered, 1);
        assert_eq!(report.stop_directives_sent(), 1);

        let latency: &observability::StatsSummary = &report.sink_latency_ms;
        assert_eq!(latency.count, report.metrics.delivered);
    }

    /// Real UDP listener -> supervisor -> file sink
    #[tokio::test]
    async fn test_udp_source_to_file_sink() {
        let port = std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dir = tempfile::tempdir().unwrap();

        let mut config = StreamerConfig::default();
        config.sources.outgauge.bind_addr = Some(format!("127.0.0.1:{port}"));
        config.sink = SinkConfig {
            name: "jsonl".to_string(),
            sink_type: SinkType::File,
            params: HashMap::from([(
                "base_path".to_string(),
                dir.path().display().to_string(),
            )]),
        };

        let sink = supervisor::create_sink(&config.sink).await.unwrap();
        let handle = subscribe("outgauge", sink, &config).unwrap();

        let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut packet = vec![0u8; 92];
        packet[12..16].copy_from_slice(&33.0f32.to_le_bytes());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while handle.metrics().delivered < 3 && tokio::time::Instant::now() < deadline {
            sender
                .send_to(&packet, ("127.0.0.1", port))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(40)).await;
        }

        let report = handle.shutdown().await.unwrap();
        assert!(report.metrics.delivered >= 3);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(contents.lines().count() as u64, report.metrics.delivered);

        let first: serde_json::Value =
            serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(first["name"], "outgauge");
    }
}
