//! UDP listener producer
//!
//! Games that push telemetry datagrams (DiRT Rally 2.0, Forza, OutGauge)
//! share one runtime; only the decoder differs.

use contracts::{SourceId, TelemetryFrame};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::ProducerError;
use crate::producer::{Producer, ProducerContext};

/// Largest datagram a game is expected to send
const MAX_DATAGRAM: usize = 2048;

/// Decodes one datagram into a frame
pub trait PacketDecoder: Send + 'static {
    fn source(&self) -> SourceId;

    fn decode(&mut self, packet: &[u8]) -> Result<TelemetryFrame, ProducerError>;
}

pub struct UdpProducer<D> {
    bind_addr: String,
    decoder: D,
}

impl<D: PacketDecoder> UdpProducer<D> {
    pub fn new(bind_addr: impl Into<String>, decoder: D) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            decoder,
        }
    }

    #[instrument(
        name = "udp_producer",
        skip(self, ctx),
        fields(source = %self.decoder.source(), addr = %self.bind_addr)
    )]
    async fn run(mut self, ctx: ProducerContext) {
        let socket = match UdpSocket::bind(&self.bind_addr).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(error = %e, "failed to bind telemetry listener");
                ctx.report(ProducerError::bind(
                    ctx.source,
                    self.bind_addr.clone(),
                    e.to_string(),
                ));
                return;
            }
        };
        info!("listening for telemetry");

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    debug!("cancelled");
                    break;
                }
                received = socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            // ICMP port-unreachable and friends; the socket stays usable.
                            debug!(error = %e, "recv failed");
                            continue;
                        }
                    };
                    ctx.metrics.record_packet();
                    trace!(%peer, len, "datagram received");

                    match self.decoder.decode(&buf[..len]) {
                        Ok(frame) => {
                            if !ctx.emit(frame).await {
                                break;
                            }
                        }
                        Err(e) => ctx.report(e),
                    }
                }
            }
        }

        debug!("udp producer stopped");
    }
}

impl<D: PacketDecoder> Producer for UdpProducer<D> {
    fn source(&self) -> SourceId {
        self.decoder.source()
    }

    fn spawn(self: Box<Self>, ctx: ProducerContext) -> JoinHandle<()> {
        tokio::spawn((*self).run(ctx))
    }
}
