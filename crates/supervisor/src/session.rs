//! Session - one subscription from subscribe to terminate

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{FrameSink, PublishStatus, SessionState, SourceId, StreamConfig, StreamerConfig};
use producers::{producer_for, ChannelOptions, Producer, ProducerHandle};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

use crate::error::SupervisorError;
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::rate_limiter::{RateLimiter, Throttle};
use crate::supervisor::{source_label, SessionReport, StreamSupervisor, SupervisorTimings};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Start a session for `identifier`.
///
/// An unknown or disabled source starts no producer; the session still
/// streams (nothing) until cancelled. Fails only outside a Tokio runtime.
#[instrument(name = "session_subscribe", skip(sink, config), fields(sink = %sink.name()))]
pub fn subscribe<S>(
    identifier: &str,
    sink: S,
    config: &StreamerConfig,
) -> Result<SessionHandle, SupervisorError>
where
    S: FrameSink + Send + 'static,
{
    let source = SourceId::parse(identifier);
    let producer = match source {
        Some(source) => producer_for(source, &config.sources),
        None => {
            warn!(identifier, "unknown source, no producer started");
            None
        }
    };

    spawn_session(identifier, source, producer, sink, &config.stream)
}

/// Start a session around an already constructed producer.
pub fn subscribe_with_producer<S>(
    identifier: &str,
    producer: Option<Box<dyn Producer>>,
    sink: S,
    stream: &StreamConfig,
) -> Result<SessionHandle, SupervisorError>
where
    S: FrameSink + Send + 'static,
{
    let source = producer
        .as_ref()
        .map(|p| p.source())
        .or_else(|| SourceId::parse(identifier));
    spawn_session(identifier, source, producer, sink, stream)
}

fn spawn_session<S>(
    identifier: &str,
    source: Option<SourceId>,
    producer: Option<Box<dyn Producer>>,
    sink: S,
    stream: &StreamConfig,
) -> Result<SessionHandle, SupervisorError>
where
    S: FrameSink + Send + 'static,
{
    let runtime = Handle::try_current().map_err(|e| SupervisorError::NoRuntime(e.to_string()))?;

    let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    let cancel = CancellationToken::new();
    let metrics = Arc::new(SessionMetrics::new());
    let (state_tx, state_rx) = watch::channel(SessionState::Idle);

    let options = ChannelOptions {
        frame_capacity: stream.frame_channel_capacity,
        error_capacity: stream.error_channel_capacity,
    };
    let producer = {
        let _enter = runtime.enter();
        producer.map(|p| ProducerHandle::start(p, options))
    };

    state_tx.send_replace(SessionState::Streaming);
    let supervisor = StreamSupervisor::new(
        id,
        identifier.to_string(),
        source,
        sink,
        Throttle::new(RateLimiter::new(stream.frame_interval())),
        SupervisorTimings {
            sink_timeout: stream.sink_timeout(),
            shutdown_timeout: stream.shutdown_timeout(),
        },
        cancel.clone(),
        state_tx,
        metrics.clone(),
    );

    observability::record_session_started(source_label(source));
    info!(
        session_id = id,
        identifier,
        producer = producer.is_some(),
        "session started"
    );

    let task = runtime.spawn(supervisor.run(producer));

    Ok(SessionHandle {
        id,
        identifier: identifier.to_string(),
        source,
        cancel: cancel.clone(),
        drop_guard: cancel.drop_guard(),
        state: state_rx,
        metrics,
        task,
    })
}

/// Caller's side of a running session
///
/// Dropping the handle cancels the session.
pub struct SessionHandle {
    id: u64,
    identifier: String,
    source: Option<SourceId>,
    cancel: CancellationToken,
    drop_guard: DropGuard,
    state: watch::Receiver<SessionState>,
    metrics: Arc<SessionMetrics>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Parsed source, `None` for unknown identifiers
    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// Request shutdown. Safe to call any number of times, at any state.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!(session_id = self.id, "session cancel requested");
        }
        self.cancel.cancel();
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `Terminated`
    pub async fn terminated(&self) {
        let mut state = self.state.clone();
        // A closed channel means the supervisor task is gone, which is terminal too.
        let _ = state.wait_for(|s| *s == SessionState::Terminated).await;
    }

    /// Live counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Client-to-stream messages are never accepted.
    pub fn publish(&self, message: &[u8]) -> PublishStatus {
        debug!(session_id = self.id, len = message.len(), "publish rejected");
        PublishStatus::PermissionDenied
    }

    /// Wait for the session task without cancelling it.
    pub async fn join(self) -> Result<SessionReport, SupervisorError> {
        let Self {
            drop_guard, task, ..
        } = self;
        // Joining must not cancel the session; only `cancel` does.
        let _token = drop_guard.disarm();
        task.await.map_err(|e| SupervisorError::Join(e.to_string()))
    }

    /// Cancel and wait for the final report
    pub async fn shutdown(self) -> Result<SessionReport, SupervisorError> {
        self.cancel();
        self.join().await
    }
}
