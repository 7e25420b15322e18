//! Producer runtime contract
//!
//! A producer owns one live feed and pushes `TelemetryFrame`s into a bounded
//! channel until it is cancelled, told to stop, or its consumer goes away.
//! The supervisor only ever sees a `ProducerHandle`.

use std::sync::Arc;
use std::time::Duration;

use contracts::{ControlDirective, SourceId, TelemetryFrame};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace, warn};

use crate::error::ProducerError;
use crate::metrics::{ProducerMetrics, ProducerMetricsSnapshot};

/// A live telemetry feed
pub trait Producer: Send + 'static {
    /// Source this producer reads
    fn source(&self) -> SourceId;

    /// Whether the producer listens on a control channel for `Stop`
    fn wants_control(&self) -> bool {
        self.source().uses_control_channel()
    }

    /// Spawn the producer task on the current runtime
    fn spawn(self: Box<Self>, ctx: ProducerContext) -> JoinHandle<()>;
}

/// Everything a running producer task gets from its supervisor
pub struct ProducerContext {
    pub source: SourceId,
    pub frames: mpsc::Sender<TelemetryFrame>,
    pub errors: mpsc::Sender<ProducerError>,
    pub control: Option<mpsc::Receiver<ControlDirective>>,
    pub cancel: CancellationToken,
    pub metrics: Arc<ProducerMetrics>,
}

impl ProducerContext {
    /// Forward a frame downstream.
    ///
    /// Returns `false` once the producer should exit: the session was
    /// cancelled while waiting for capacity, or the receiver is gone.
    pub async fn emit(&self, frame: TelemetryFrame) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.frames.send(frame) => match sent {
                Ok(()) => {
                    self.metrics.record_emitted();
                    trace!(source = %self.source, "frame emitted");
                    true
                }
                Err(_) => {
                    debug!(source = %self.source, "frame channel closed");
                    false
                }
            },
        }
    }

    /// Report a non-fatal error. Never blocks; overflow is counted and dropped.
    pub fn report(&self, err: ProducerError) {
        self.metrics.record_error();
        ::metrics::counter!(
            "simracing_producer_errors_total",
            "source" => self.source.as_str()
        )
        .increment(1);

        match self.errors.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                self.metrics.record_error_dropped();
                trace!(source = %self.source, error = %err, "error channel full, dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(source = %self.source, "error channel closed");
            }
        }
    }
}

/// Wait for the next control directive.
///
/// Pends forever when there is no control channel; yields `None` once the
/// sender side is dropped.
pub async fn next_directive(
    control: &mut Option<mpsc::Receiver<ControlDirective>>,
) -> Option<ControlDirective> {
    match control {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Channel sizing for a producer
#[derive(Debug, Clone, Copy)]
pub struct ChannelOptions {
    pub frame_capacity: usize,
    pub error_capacity: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            frame_capacity: 64,
            error_capacity: 16,
        }
    }
}

/// Receiving ends of a started producer
///
/// Each slot is emptied by the consumer once its channel closes.
pub struct ProducerOutputs {
    pub frames: Option<mpsc::Receiver<TelemetryFrame>>,
    pub errors: Option<mpsc::Receiver<ProducerError>>,
}

/// Control side of a started producer
///
/// Dropping it without calling `shutdown` still cancels the producer.
pub struct ProducerControl {
    source: SourceId,
    control: Option<mpsc::Sender<ControlDirective>>,
    cancel: DropGuard,
    task: JoinHandle<()>,
    metrics: Arc<ProducerMetrics>,
}

/// A running producer
pub struct ProducerHandle {
    outputs: ProducerOutputs,
    control: ProducerControl,
}

impl ProducerHandle {
    /// Start `producer` with fresh channels and its own cancellation token.
    pub fn start(producer: Box<dyn Producer>, options: ChannelOptions) -> Self {
        let source = producer.source();
        let (frame_tx, frame_rx) = mpsc::channel(options.frame_capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(options.error_capacity.max(1));
        let (control_tx, control_rx) = if producer.wants_control() {
            let (tx, rx) = mpsc::channel(1);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let cancel = CancellationToken::new();
        let metrics = Arc::new(ProducerMetrics::new());
        let ctx = ProducerContext {
            source,
            frames: frame_tx,
            errors: error_tx,
            control: control_rx,
            cancel: cancel.clone(),
            metrics: metrics.clone(),
        };

        let task = producer.spawn(ctx);
        info!(
            source = %source,
            control_channel = control_tx.is_some(),
            "producer started"
        );

        Self {
            outputs: ProducerOutputs {
                frames: Some(frame_rx),
                errors: Some(error_rx),
            },
            control: ProducerControl {
                source,
                control: control_tx,
                cancel: cancel.drop_guard(),
                task,
                metrics,
            },
        }
    }

    pub fn source(&self) -> SourceId {
        self.control.source
    }

    /// Split into the consuming and controlling halves
    pub fn into_parts(self) -> (ProducerOutputs, ProducerControl) {
        (self.outputs, self.control)
    }
}

/// What happened while stopping a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// A stop directive was queued on the control channel
    pub stop_sent: bool,
    /// The task finished on its own before the deadline
    pub exited_in_time: bool,
    pub metrics: ProducerMetricsSnapshot,
}

impl ProducerControl {
    /// Stop the producer.
    ///
    /// Queues at most one `Stop` without blocking, cancels the producer
    /// token, then waits up to `timeout` for the task before aborting it.
    pub async fn shutdown(self, timeout: Duration) -> ShutdownReport {
        let Self {
            source,
            control,
            cancel,
            mut task,
            metrics,
        } = self;

        let stop_sent = match control {
            Some(tx) => match tx.try_send(ControlDirective::Stop) {
                Ok(()) => {
                    debug!(source = %source, "stop directive sent");
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(source = %source, "control channel full, stop directive skipped");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(source = %source, "producer no longer listening for directives");
                    false
                }
            },
            None => false,
        };

        cancel.disarm().cancel();

        let exited_in_time = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(source = %source, error = %e, "producer task failed");
                true
            }
            Err(_) => {
                warn!(
                    source = %source,
                    timeout_ms = timeout.as_millis() as u64,
                    "producer did not exit in time, aborting"
                );
                task.abort();
                false
            }
        };

        info!(source = %source, stop_sent, exited_in_time, "producer stopped");

        ShutdownReport {
            stop_sent,
            exited_in_time,
            metrics: metrics.snapshot(),
        }
    }
}
