use crate::entity_type::EntityTypeCode;
use crate::nib::IoType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("entity type field `{field}` = {value} exceeds {max}")]
    FieldOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("entity type field `{field}` is set after a wildcard field")]
    NonTrailingWildcard { field: &'static str },
    #[error("unknown player class `{0}`")]
    UnknownClass(String),
    #[error("player class `{0}` is already registered")]
    DuplicateClass(String),
    #[error("unknown player template `{0}`")]
    UnknownTemplate(String),
    #[error("player template `{0}` is already defined")]
    DuplicateTemplate(String),
    #[error("duplicate output mapping for class `{class}` type `{type_string}`")]
    DuplicateOutputMapping { class: String, type_string: String },
    #[error("duplicate input mapping for entity type {0}")]
    DuplicateInputMapping(EntityTypeCode),
    #[error("template class `{class}` is not a player class")]
    NotAPlayerClass { class: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{io:?} nib for player {player_id} of `{federate}` already exists")]
    DuplicateKey {
        player_id: u32,
        federate: String,
        io: IoType,
    },
    #[error("{io:?} nib list full ({capacity} entries)")]
    ListFull { capacity: usize, io: IoType },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("serialization failed: {0}")]
    Serialize(rkyv::rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rkyv::rancor::Error),
    #[error("bad pdu header (magic {magic:#010x}, version {version})")]
    BadHeader { magic: u32, version: u32 },
    #[error("pdu of {0} bytes exceeds the maximum size")]
    TooLarge(usize),
    #[error("bad entity type in pdu: {0}")]
    BadEntityType(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum InteropError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no output mapping for player {0}")]
    Unmatched(u32),
    #[error("player {0} is excluded by the output filter")]
    Filtered(u32),
    #[error("player {0} is a network proxy")]
    ProxyPlayer(u32),
    #[error("output is disabled on this network")]
    OutputDisabled,
    #[error("player {0} is not in the world")]
    NoSuchPlayer(u32),
}
