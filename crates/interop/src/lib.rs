pub mod config;
pub mod entity_type;
pub mod error;
pub mod net;
pub mod netio;
pub mod nib;
pub mod ntm;
pub mod player;

pub use config::{
    ClassEntry, DrLimits, LimitOverride, LoadReport, MappingEntry, NetIoConfig, NtmTables,
    TemplateEntry,
};
pub use entity_type::{match_code, EntityTypeCode, MatchQuality, WILDCARD};
pub use error::{CodecError, ConfigError, InteropError, RegistryError};
pub use net::{
    Appearance, Datagram, EntityCodec, EntityStateRecord, NetIoStats, RkyvCodec, TransportStats,
    UdpTransport, MAX_PDU_SIZE,
};
pub use netio::NetIo;
pub use nib::{
    DeadReckoning, DeadReckoningModel, IoType, KinematicState, Nib, NibKey, NibRegistry,
    NibState, SendReason, UpdateOutcome,
};
pub use ntm::{Ntm, NtmInputTree, NtmOutputTree, NtmRef};
pub use player::{
    ClassRegistry, NetworkOrigin, Player, PlayerClass, PlayerId, PlayerMode, PlayerTemplate,
    TemplatePlayerRef, World, BASE_CLASS,
};
