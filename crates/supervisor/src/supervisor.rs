//! StreamSupervisor - per-session fan-in loop
//!
//! Waits on cancellation, producer errors and producer frames. Accepted
//! frames are converted once and handed to the sink; everything else is
//! counted and dropped.

use std::sync::Arc;
use std::time::Duration;

use contracts::{DataFrame, FrameSink, SessionState, SourceId, TelemetryFrame};
use observability::{RunningStats, StatsSummary};
use producers::{ProducerControl, ProducerError, ProducerHandle, ShutdownReport};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::rate_limiter::Throttle;

/// Final accounting of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: u64,
    /// Identifier the session was subscribed with
    pub identifier: String,
    pub source: Option<SourceId>,
    pub final_state: SessionState,
    pub metrics: MetricsSnapshot,
    /// Sink delivery latency (ms)
    pub sink_latency_ms: StatsSummary,
    /// `None` when no producer was started
    pub producer: Option<ShutdownReport>,
}

impl SessionReport {
    pub fn producer_started(&self) -> bool {
        self.producer.is_some()
    }

    /// Stop directives issued during shutdown (0 or 1)
    pub fn stop_directives_sent(&self) -> u32 {
        self.producer.map_or(0, |p| u32::from(p.stop_sent))
    }
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session {} ({}) ===", self.session_id, self.identifier)?;
        writeln!(f, "State: {:?}", self.final_state)?;
        writeln!(f, "{}", self.metrics)?;
        writeln!(f, "Sink latency (ms): {}", self.sink_latency_ms)?;
        match &self.producer {
            Some(p) => write!(
                f,
                "Producer: {} frames, {} errors, stop sent: {}, exited in time: {}",
                p.metrics.frames_emitted, p.metrics.errors, p.stop_sent, p.exited_in_time
            ),
            None => write!(f, "Producer: none"),
        }
    }
}

/// Timing knobs of one supervisor
#[derive(Debug, Clone, Copy)]
pub(crate) struct SupervisorTimings {
    pub sink_timeout: Duration,
    pub shutdown_timeout: Duration,
}

enum LoopEvent {
    Cancelled,
    Error(Option<ProducerError>),
    Frame(Option<TelemetryFrame>),
}

pub(crate) struct StreamSupervisor<S> {
    session_id: u64,
    identifier: String,
    source: Option<SourceId>,
    sink: S,
    throttle: Throttle,
    timings: SupervisorTimings,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
    metrics: Arc<SessionMetrics>,
    latency: RunningStats,
}

impl<S: FrameSink + Send + 'static> StreamSupervisor<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: u64,
        identifier: String,
        source: Option<SourceId>,
        sink: S,
        throttle: Throttle,
        timings: SupervisorTimings,
        cancel: CancellationToken,
        state: watch::Sender<SessionState>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            session_id,
            identifier,
            source,
            sink,
            throttle,
            timings,
            cancel,
            state,
            metrics,
            latency: RunningStats::default(),
        }
    }

    /// Drive the session until cancelled, then shut the producer down.
    #[instrument(
        name = "stream_supervisor",
        skip(self, producer),
        fields(session_id = self.session_id, identifier = %self.identifier)
    )]
    pub(crate) async fn run(mut self, producer: Option<ProducerHandle>) -> SessionReport {
        let (outputs, control) = match producer {
            Some(handle) => {
                let (outputs, control) = handle.into_parts();
                (Some(outputs), Some(control))
            }
            None => (None, None),
        };
        let (mut frames, mut errors) = match outputs {
            Some(o) => (o.frames, o.errors),
            None => (None, None),
        };

        info!(producer = control.is_some(), "session streaming");

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => LoopEvent::Cancelled,
                error = recv_slot(&mut errors) => LoopEvent::Error(error),
                frame = recv_slot(&mut frames) => LoopEvent::Frame(frame),
            };

            match event {
                LoopEvent::Cancelled => break,
                LoopEvent::Error(Some(e)) => self.on_producer_error(e),
                LoopEvent::Error(None) => {
                    debug!("producer error channel closed");
                    errors = None;
                }
                LoopEvent::Frame(Some(frame)) => self.on_frame(frame).await,
                LoopEvent::Frame(None) => {
                    info!("producer output closed, idling until cancelled");
                    frames = None;
                }
            }
        }

        // Anything still queued is discarded, not flushed.
        drop(frames);
        drop(errors);

        self.shutdown(control).await
    }

    async fn shutdown(mut self, control: Option<ProducerControl>) -> SessionReport {
        self.transition(SessionState::Stopping);

        let producer = match control {
            Some(control) => Some(control.shutdown(self.timings.shutdown_timeout).await),
            None => None,
        };

        let sink_name = self.sink.name().to_string();
        match tokio::time::timeout(self.timings.sink_timeout, self.sink.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(sink = %sink_name, error = %e, "sink flush failed"),
            Err(_) => warn!(sink = %sink_name, "sink flush timed out"),
        }
        match tokio::time::timeout(self.timings.sink_timeout, self.sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(sink = %sink_name, error = %e, "sink close failed"),
            Err(_) => warn!(sink = %sink_name, "sink close timed out"),
        }

        self.transition(SessionState::Terminated);
        observability::record_session_ended(source_label(self.source));

        let report = SessionReport {
            session_id: self.session_id,
            identifier: self.identifier.clone(),
            source: self.source,
            final_state: *self.state.borrow(),
            metrics: self.metrics.snapshot(),
            sink_latency_ms: StatsSummary::from(&self.latency),
            producer,
        };
        info!(
            received = report.metrics.received,
            forwarded = report.metrics.accepted,
            sink_failures = report.metrics.sink_failures,
            "session terminated"
        );
        report
    }

    fn on_producer_error(&self, err: ProducerError) {
        self.metrics.inc_producer_errors();
        observability::record_producer_error(err.source_id().as_str());
        warn!(error = %err, "producer reported an error");
    }

    async fn on_frame(&mut self, frame: TelemetryFrame) {
        let source = frame.source();
        self.metrics.inc_received();
        observability::record_frame_received(source.as_str());

        let now = Instant::now();
        if !self.throttle.is_due(now) {
            self.metrics.inc_throttled();
            observability::record_frame_throttled(source.as_str());
            trace!(source = %source, "frame dropped by throttle");
            return;
        }

        let data = match DataFrame::try_from(&frame) {
            Ok(data) => data,
            Err(e) => {
                self.metrics.inc_conversion_failures();
                observability::record_conversion_failure(source.as_str());
                debug!(source = %source, error = %e, "frame conversion failed");
                return;
            }
        };

        self.throttle.mark(now);
        self.metrics.inc_accepted();
        self.deliver(&data).await;
    }

    async fn deliver(&mut self, frame: &DataFrame) {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timings.sink_timeout, self.sink.send(frame)).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(())) => {
                self.metrics.inc_delivered();
                self.latency.push(elapsed_ms);
                observability::record_frame_forwarded(self.sink.name(), true);
                observability::record_sink_latency_ms(self.sink.name(), elapsed_ms);
                trace!(sink = %self.sink.name(), fields = frame.fields.len(), "frame delivered");
            }
            Ok(Err(e)) => {
                self.metrics.inc_sink_failures();
                observability::record_frame_forwarded(self.sink.name(), false);
                error!(sink = %self.sink.name(), error = %e, "sink delivery failed");
            }
            Err(_) => {
                self.metrics.inc_sink_failures();
                observability::record_frame_forwarded(self.sink.name(), false);
                error!(
                    sink = %self.sink.name(),
                    timeout_ms = self.timings.sink_timeout.as_millis() as u64,
                    "sink delivery timed out"
                );
            }
        }
    }

    fn transition(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                debug!(from = ?*current, to = ?next, "session state change");
                *current = next;
                true
            } else {
                false
            }
        });
    }
}

/// Metric label for a session's source
pub(crate) fn source_label(source: Option<SourceId>) -> &'static str {
    source.map_or("unknown", |s| s.as_str())
}

/// Receive from an optional channel slot; an empty slot never resolves.
async fn recv_slot<T>(slot: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match slot {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
