//! SourceId - closed set of supported telemetry sources
//!
//! The wire identifier is the stream path a client subscribes with.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// How a source delivers its live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Passive UDP listener, the game pushes packets.
    Udp,
    /// Polled shared-memory page, needs an explicit stop.
    SharedMemory,
}

/// Supported racing-simulator telemetry source.
///
/// # Examples
/// ```
/// use contracts::SourceId;
///
/// assert_eq!(SourceId::parse("acc"), Some(SourceId::Acc));
/// assert_eq!(SourceId::parse("beamng"), Some(SourceId::OutGauge));
/// assert_eq!(SourceId::parse("A"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    DirtRally2,
    ForzaHorizon5,
    ForzaMotorsport2023,
    OutGauge,
    Acc,
    IRacing,
}

impl SourceId {
    /// All sources, in display order.
    pub const ALL: [SourceId; 6] = [
        SourceId::DirtRally2,
        SourceId::ForzaHorizon5,
        SourceId::ForzaMotorsport2023,
        SourceId::Acc,
        SourceId::IRacing,
        SourceId::OutGauge,
    ];

    /// Parse a wire identifier. Matching is case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dirtRally2" => Some(Self::DirtRally2),
            "forzaHorizon5" => Some(Self::ForzaHorizon5),
            "forzaMotorsport2023" => Some(Self::ForzaMotorsport2023),
            "outgauge" | "beamng" => Some(Self::OutGauge),
            "acc" => Some(Self::Acc),
            "iRacing" => Some(Self::IRacing),
            _ => None,
        }
    }

    /// Canonical wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirtRally2 => "dirtRally2",
            Self::ForzaHorizon5 => "forzaHorizon5",
            Self::ForzaMotorsport2023 => "forzaMotorsport2023",
            Self::OutGauge => "outgauge",
            Self::Acc => "acc",
            Self::IRacing => "iRacing",
        }
    }

    /// Human readable game name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DirtRally2 => "DiRT Rally 2.0",
            Self::ForzaHorizon5 => "Forza Horizon 5",
            Self::ForzaMotorsport2023 => "Forza Motorsport 2023",
            Self::OutGauge => "OutGauge (LFS / BeamNG.drive)",
            Self::Acc => "Assetto Corsa Competizione",
            Self::IRacing => "iRacing",
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Self::Acc | Self::IRacing => Transport::SharedMemory,
            _ => Transport::Udp,
        }
    }

    /// True for sources whose producer holds a polled resource and takes a stop directive.
    pub fn uses_control_channel(&self) -> bool {
        self.transport() == Transport::SharedMemory
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown telemetry source '{0}'")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownSource(s.to_string()))
    }
}

// Serde support
impl Serialize for SourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
