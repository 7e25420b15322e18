//! Source -> producer lookup

use contracts::{SourceId, SourcesConfig};
use tracing::debug;

use crate::decoders::{
    AccPhysicsDecoder, DirtRallyDecoder, ForzaDecoder, IRacingDecoder, OutGaugeDecoder,
};
use crate::producer::Producer;
use crate::shared_memory::{PageDecoder, SharedMemoryProducer};
use crate::udp::{PacketDecoder, UdpProducer};

/// Build the producer for `source`, or `None` when the source is disabled.
pub fn producer_for(source: SourceId, sources: &SourcesConfig) -> Option<Box<dyn Producer>> {
    if !sources.is_enabled(source) {
        debug!(source = %source, "source disabled in config");
        return None;
    }

    match source {
        SourceId::DirtRally2 => udp(source, sources, DirtRallyDecoder),
        SourceId::ForzaHorizon5 => udp(source, sources, ForzaDecoder::horizon5()),
        SourceId::ForzaMotorsport2023 => udp(source, sources, ForzaDecoder::motorsport2023()),
        SourceId::OutGauge => udp(source, sources, OutGaugeDecoder),
        SourceId::Acc => shared_memory(source, sources, AccPhysicsDecoder::default()),
        SourceId::IRacing => shared_memory(source, sources, IRacingDecoder::default()),
    }
}

fn udp<D: PacketDecoder>(
    source: SourceId,
    sources: &SourcesConfig,
    decoder: D,
) -> Option<Box<dyn Producer>> {
    let addr = sources.udp(source)?.resolve_bind_addr(source);
    Some(Box::new(UdpProducer::new(addr, decoder)))
}

fn shared_memory<D: PageDecoder>(
    source: SourceId,
    sources: &SourcesConfig,
    decoder: D,
) -> Option<Box<dyn Producer>> {
    let config = sources.shared_memory(source)?;
    Some(Box::new(SharedMemoryProducer::new(
        config.resolve_path(source),
        config.poll_interval(),
        decoder,
    )))
}
