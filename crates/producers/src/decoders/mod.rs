//! Wire decoders, one per game format

mod acc;
mod common;
mod dirt_rally;
mod forza;
mod iracing;
mod outgauge;

pub use acc::{AccPhysicsDecoder, ACC_PHYSICS_PAGE_LEN};
pub use dirt_rally::{DirtRallyDecoder, DIRT_RALLY_PACKET_LEN};
pub use forza::{ForzaDecoder, ForzaLayout};
pub use iracing::IRacingDecoder;
pub use outgauge::OutGaugeDecoder;
