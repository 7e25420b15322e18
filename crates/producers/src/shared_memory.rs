//! Polled shared-memory producer
//!
//! Games that publish telemetry through a mapped page (ACC, iRacing) are
//! read on a fixed interval. The page is opened lazily and reopened after a
//! read failure, so a producer can be started before the game is running.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use contracts::{ControlDirective, SourceId, TelemetryFrame};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::ProducerError;
use crate::producer::{next_directive, Producer, ProducerContext};

/// Random access into a mapped page
pub trait Page {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl<T: Read + Seek> Page for T {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }
}

/// Turns one page snapshot into at most one frame
pub trait PageDecoder: Send + 'static {
    fn source(&self) -> SourceId;

    /// Sample the page.
    ///
    /// `Ok(None)` means there is nothing new since the previous sample. An
    /// `io::Error` makes the producer drop and reopen the page.
    fn poll(&mut self, page: &mut dyn Page) -> io::Result<Option<TelemetryFrame>>;
}

pub struct SharedMemoryProducer<D> {
    path: PathBuf,
    poll_interval: Duration,
    decoder: D,
}

impl<D: PageDecoder> SharedMemoryProducer<D> {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, decoder: D) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            decoder,
        }
    }

    #[instrument(
        name = "shared_memory_producer",
        skip(self, ctx),
        fields(source = %self.decoder.source(), path = %self.path.display())
    )]
    async fn run(mut self, mut ctx: ProducerContext) {
        let source = ctx.source;
        let mut control = ctx.control.take();

        let mut ticker = tokio::time::interval(self.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut page: Option<File> = None;
        let mut unavailable_reported = false;

        debug!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "shared memory producer started"
        );

        loop {
            tokio::select! {
                biased;
                directive = next_directive(&mut control) => {
                    match directive {
                        Some(ControlDirective::Stop) => info!("stop directive received"),
                        None => debug!("control channel closed"),
                    }
                    break;
                }
                _ = ctx.cancel.cancelled() => {
                    debug!("cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if page.is_none() {
                        match File::open(&self.path) {
                            Ok(file) => {
                                info!("shared memory page opened");
                                unavailable_reported = false;
                                page = Some(file);
                            }
                            Err(e) => {
                                if !unavailable_reported {
                                    ctx.report(ProducerError::unavailable(
                                        source,
                                        self.path.display().to_string(),
                                        e.to_string(),
                                    ));
                                    unavailable_reported = true;
                                }
                                continue;
                            }
                        }
                    }

                    let Some(file) = page.as_mut() else { continue };
                    match self.decoder.poll(file) {
                        Ok(Some(frame)) => {
                            ctx.metrics.record_packet();
                            if !ctx.emit(frame).await {
                                break;
                            }
                        }
                        Ok(None) => trace!("no new sample"),
                        Err(e) => {
                            warn!(error = %e, "shared memory read failed, reopening");
                            ctx.report(ProducerError::decode(source, e.to_string()));
                            page = None;
                        }
                    }
                }
            }
        }

        // Page handle is released here, before the task completes.
        drop(page);
        debug!("shared memory producer stopped");
    }
}

impl<D: PageDecoder> Producer for SharedMemoryProducer<D> {
    fn source(&self) -> SourceId {
        self.decoder.source()
    }

    fn spawn(self: Box<Self>, ctx: ProducerContext) -> JoinHandle<()> {
        tokio::spawn((*self).run(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::{AccPhysicsDecoder, ACC_PHYSICS_PAGE_LEN};
    use crate::producer::{ChannelOptions, ProducerHandle};

    fn write_acc_page(path: &std::path::Path, packet_id: i32, speed: f32) {
        let mut page = vec![0u8; ACC_PHYSICS_PAGE_LEN];
        page[0..4].copy_from_slice(&packet_id.to_le_bytes());
        page[28..32].copy_from_slice(&speed.to_le_bytes());
        std::fs::write(path, page).unwrap();
    }

    #[tokio::test]
    async fn test_polls_page_and_stops_on_directive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acpmf_physics");
        write_acc_page(&path, 10, 120.0);

        let producer = SharedMemoryProducer::new(
            &path,
            Duration::from_millis(5),
            AccPhysicsDecoder::default(),
        );
        let handle = ProducerHandle::start(Box::new(producer), ChannelOptions::default());
        let (mut outputs, control) = handle.into_parts();
        let frames = outputs.frames.as_mut().unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), frames.recv())
            .await
            .unwrap()
            .unwrap();
        let TelemetryFrame::Acc(t) = first else {
            panic!("unexpected frame variant");
        };
        assert_eq!(t.packet_id, 10);
        assert_eq!(t.speed_kmh, 120.0);

        write_acc_page(&path, 11, 121.0);
        let second = tokio::time::timeout(Duration::from_secs(2), frames.recv())
            .await
            .unwrap()
            .unwrap();
        let TelemetryFrame::Acc(t) = second else {
            panic!("unexpected frame variant");
        };
        assert_eq!(t.packet_id, 11);

        let report = control.shutdown(Duration::from_millis(500)).await;
        assert!(report.stop_sent);
        assert!(report.exited_in_time);
    }

    #[tokio::test]
    async fn test_missing_page_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let producer = SharedMemoryProducer::new(
            dir.path().join("absent"),
            Duration::from_millis(2),
            AccPhysicsDecoder::default(),
        );
        let handle = ProducerHandle::start(Box::new(producer), ChannelOptions::default());
        let (mut outputs, control) = handle.into_parts();
        let errors = outputs.errors.as_mut().unwrap();

        let err = tokio::time::timeout(Duration::from_secs(2), errors.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(err, ProducerError::ResourceUnavailable { .. }));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(errors.try_recv().is_err());

        let report = control.shutdown(Duration::from_millis(500)).await;
        assert_eq!(report.metrics.errors, 1);
    }
}
