mod protocol;
mod stats;
mod transport;

pub use protocol::{
    Appearance, ArchivedEntityStatePdu, EntityCodec, EntityStatePdu, EntityStateRecord, PduHeader,
    RkyvCodec, MAX_PDU_SIZE, PDU_MAGIC, PDU_VERSION,
};
pub use stats::NetIoStats;
pub use transport::{Datagram, TransportStats, UdpTransport};
