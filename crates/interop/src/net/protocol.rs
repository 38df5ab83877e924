use bitflags::bitflags;
use glam::DVec3;
use rkyv::util::AlignedVec;
use rkyv::{rancor, Archive, Deserialize, Serialize};

use crate::entity_type::{EntityTypeCode, FIELD_COUNT};
use crate::error::CodecError;
use crate::nib::{DeadReckoningModel, KinematicState};

pub const MAX_PDU_SIZE: usize = 1200;
pub const PDU_VERSION: u32 = 1;
pub const PDU_MAGIC: u32 = 0x4E49_4231;

bitflags! {
    /// Subset of the DIS platform appearance bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Appearance: u32 {
        const DAMAGED = 1 << 3;
        const DESTROYED = 1 << 4;
        const SMOKING = 1 << 5;
        const FLAMING = 1 << 15;
        const FROZEN = 1 << 21;
        const DEACTIVATED = 1 << 23;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PduHeader {
    pub magic: u32,
    pub version: u32,
}

impl Default for PduHeader {
    fn default() -> Self {
        Self {
            magic: PDU_MAGIC,
            version: PDU_VERSION,
        }
    }
}

impl PduHeader {
    pub fn is_valid(&self) -> bool {
        self.magic == PDU_MAGIC && self.version == PDU_VERSION
    }
}

#[derive(Debug, Clone, PartialEq, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntityStateRecord {
    pub remote_id: u32,
    pub federate: String,
    pub entity_type: [u16; FIELD_COUNT],
    pub dead_reckoning: u8,
    pub appearance: u32,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
    pub orientation: [f64; 3],
    pub angular_velocity: [f64; 3],
    /// Sender simulation time in seconds.
    pub timestamp: f64,
}

impl EntityStateRecord {
    pub fn new(remote_id: u32, federate: &str) -> Self {
        Self {
            remote_id,
            federate: federate.to_string(),
            ..Default::default()
        }
    }

    pub fn entity_type(&self) -> Result<EntityTypeCode, CodecError> {
        let raw = self.entity_type.map(u32::from);
        Ok(EntityTypeCode::from_fields(raw)?)
    }

    pub fn set_entity_type(&mut self, code: &EntityTypeCode) {
        self.entity_type = code.fields();
    }

    pub fn dead_reckoning(&self) -> DeadReckoningModel {
        DeadReckoningModel::from(self.dead_reckoning)
    }

    pub fn appearance(&self) -> Appearance {
        Appearance::from_bits_truncate(self.appearance)
    }

    pub fn is_deactivated(&self) -> bool {
        self.appearance().contains(Appearance::DEACTIVATED)
    }

    pub fn kinematics(&self) -> KinematicState {
        KinematicState {
            position: DVec3::from_array(self.position),
            velocity: DVec3::from_array(self.velocity),
            acceleration: DVec3::from_array(self.acceleration),
            orientation: DVec3::from_array(self.orientation),
            angular_velocity: DVec3::from_array(self.angular_velocity),
        }
    }

    pub fn set_kinematics(&mut self, state: &KinematicState) {
        self.position = state.position.to_array();
        self.velocity = state.velocity.to_array();
        self.acceleration = state.acceleration.to_array();
        self.orientation = state.orientation.to_array();
        self.angular_velocity = state.angular_velocity.to_array();
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntityStatePdu {
    pub header: PduHeader,
    pub record: EntityStateRecord,
}

pub trait EntityCodec: Send {
    fn encode(&self, record: &EntityStateRecord) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, data: &[u8]) -> Result<EntityStateRecord, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RkyvCodec;

impl EntityCodec for RkyvCodec {
    fn encode(&self, record: &EntityStateRecord) -> Result<Vec<u8>, CodecError> {
        let pdu = EntityStatePdu {
            header: PduHeader::default(),
            record: record.clone(),
        };
        let data = rkyv::to_bytes::<rancor::Error>(&pdu)
            .map(|aligned| aligned.into_vec())
            .map_err(CodecError::Serialize)?;

        if data.len() > MAX_PDU_SIZE {
            return Err(CodecError::TooLarge(data.len()));
        }
        Ok(data)
    }

    fn decode(&self, data: &[u8]) -> Result<EntityStateRecord, CodecError> {
        if data.len() > MAX_PDU_SIZE {
            return Err(CodecError::TooLarge(data.len()));
        }

        // Datagram buffers carry no alignment guarantee.
        let mut aligned: AlignedVec = AlignedVec::with_capacity(data.len());
        aligned.extend_from_slice(data);

        let pdu = rkyv::from_bytes::<EntityStatePdu, rancor::Error>(&aligned)
            .map_err(CodecError::Deserialize)?;
        if !pdu.header.is_valid() {
            return Err(CodecError::BadHeader {
                magic: pdu.header.magic,
                version: pdu.header.version,
            });
        }
        Ok(pdu.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntityStateRecord {
        let mut record = EntityStateRecord::new(17, "bravo");
        record.set_entity_type(&EntityTypeCode::new(1, 2, 225, 1, 3, 0, 0));
        record.dead_reckoning = DeadReckoningModel::Rvw as u8;
        record.appearance = (Appearance::SMOKING | Appearance::DAMAGED).bits();
        record.position = [10.0, 20.0, 30.0];
        record.velocity = [1.0, 0.0, -1.0];
        record.timestamp = 4.5;
        record
    }

    #[test]
    fn test_record_through_codec() {
        let codec = RkyvCodec;
        let bytes = codec.encode(&sample()).unwrap();
        assert!(bytes.len() <= MAX_PDU_SIZE);

        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
        assert_eq!(decoded.dead_reckoning(), DeadReckoningModel::Rvw);
        assert!(decoded.appearance().contains(Appearance::SMOKING));
        assert!(!decoded.is_deactivated());
    }

    #[test]
    fn test_decode_from_unaligned_buffer() {
        let codec = RkyvCodec;
        let bytes = codec.encode(&sample()).unwrap();

        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        assert_eq!(codec.decode(&shifted[1..]).unwrap(), sample());
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let pdu = EntityStatePdu {
            header: PduHeader {
                magic: 0xDEAD_BEEF,
                version: PDU_VERSION,
            },
            record: sample(),
        };
        let bytes = rkyv::to_bytes::<rancor::Error>(&pdu).unwrap().into_vec();

        assert!(matches!(
            RkyvCodec.decode(&bytes),
            Err(CodecError::BadHeader {
                magic: 0xDEAD_BEEF,
                ..
            })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(RkyvCodec.decode(&[1, 2, 3, 4, 5, 6, 7]).is_err());
        assert!(matches!(
            RkyvCodec.decode(&vec![0u8; MAX_PDU_SIZE + 1]),
            Err(CodecError::TooLarge(_))
        ));
    }

    #[test]
    fn test_entity_type_out_of_range() {
        let mut record = sample();
        record.entity_type[0] = 12;
        assert!(matches!(
            record.entity_type(),
            Err(CodecError::BadEntityType(_))
        ));
        assert_eq!(
            sample().entity_type().unwrap(),
            EntityTypeCode::new(1, 2, 225, 1, 3, 0, 0)
        );
    }

    #[test]
    fn test_kinematics_copy() {
        let record = sample();
        let state = record.kinematics();
        assert_eq!(state.position, DVec3::new(10.0, 20.0, 30.0));

        let mut copy = EntityStateRecord::new(1, "x");
        copy.set_kinematics(&state);
        assert_eq!(copy.position, record.position);
        assert_eq!(copy.velocity, record.velocity);
    }
}
