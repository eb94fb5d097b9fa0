use bytes::{Buf, BufMut, Bytes, BytesMut};
use glam::Vec3;

pub const PROTOCOL_ID: u32 = 0x9832_5423;
pub const DEFAULT_PORT: u16 = 27001;
pub const DEFAULT_TICK_RATE: u32 = 30;
pub const MAX_CLIENTS: usize = 32;

pub const HEADER_SIZE: usize = 12;
pub const LENGTH_PREFIX_SIZE: usize = 4;
pub const MAX_PACKET_DATA_SIZE: usize = 1024;
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + LENGTH_PREFIX_SIZE + MAX_PACKET_DATA_SIZE;

const SEQUENCE_HALF_RANGE: u16 = 32768;

/// Wraparound-safe ordering on the 16-bit sequence ring.
#[inline]
pub fn is_newer(id: u16, reference: u16) -> bool {
    ((id > reference) && (id - reference <= SEQUENCE_HALF_RANGE))
        || ((id < reference) && (reference - id > SEQUENCE_HALF_RANGE))
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet truncated: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("foreign protocol id {0:#010x}")]
    ProtocolMismatch(u32),
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("body declares {declared} bytes but {actual} follow the header")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("malformed {kind} payload ({len} bytes)")]
    MalformedPayload { kind: &'static str, len: usize },
    #[error("snapshot cannot carry {0} entities")]
    TooManyEntities(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub protocol_id: u32,
    pub sequence_id: u16,
    pub ack: u16,
    pub ack_bitfield: u32,
}

impl PacketHeader {
    pub fn new(sequence_id: u16, ack: u16, ack_bitfield: u32) -> Self {
        Self {
            protocol_id: PROTOCOL_ID,
            sequence_id,
            ack,
            ack_bitfield,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.protocol_id == PROTOCOL_ID
    }

    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.protocol_id);
        buf.put_u16(self.sequence_id);
        buf.put_u16(self.ack);
        buf.put_u32(self.ack_bitfield);
    }

    fn read(buf: &mut impl Buf) -> Self {
        Self {
            protocol_id: buf.get_u32(),
            sequence_id: buf.get_u16(),
            ack: buf.get_u16(),
            ack_bitfield: buf.get_u32(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub data: Bytes,
}

impl Packet {
    pub fn new(header: PacketHeader, data: Bytes) -> Self {
        Self { header, data }
    }

    /// A packet with an empty body. Sent by a client that is leaving.
    pub fn goodbye(header: PacketHeader) -> Self {
        Self::new(header, Bytes::new())
    }

    pub fn is_goodbye(&self) -> bool {
        self.data.is_empty()
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + LENGTH_PREFIX_SIZE + self.data.len()
    }

    pub fn encode(&self) -> Result<Bytes, PacketError> {
        if self.data.len() > MAX_PACKET_DATA_SIZE {
            return Err(PacketError::PayloadTooLarge {
                len: self.data.len(),
                max: MAX_PACKET_DATA_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.header.write(&mut buf);
        buf.put_u32(self.data.len() as u32);
        buf.put_slice(&self.data);
        Ok(buf.freeze())
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Self, PacketError> {
        let fixed = HEADER_SIZE + LENGTH_PREFIX_SIZE;
        if bytes.len() < fixed {
            return Err(PacketError::Truncated {
                needed: fixed,
                available: bytes.len(),
            });
        }

        let header = PacketHeader::read(&mut bytes);
        if !header.is_valid() {
            return Err(PacketError::ProtocolMismatch(header.protocol_id));
        }

        let data_len = bytes.get_u32() as usize;
        if data_len > MAX_PACKET_DATA_SIZE {
            return Err(PacketError::PayloadTooLarge {
                len: data_len,
                max: MAX_PACKET_DATA_SIZE,
            });
        }
        if bytes.remaining() < data_len {
            return Err(PacketError::Truncated {
                needed: fixed + data_len,
                available: fixed + bytes.remaining(),
            });
        }
        if bytes.remaining() > data_len {
            return Err(PacketError::LengthMismatch {
                declared: data_len,
                actual: bytes.remaining(),
            });
        }

        Ok(Self {
            header,
            data: Bytes::copy_from_slice(&bytes[..data_len]),
        })
    }
}

/// Field-by-field body encoding in network byte order.
pub trait Payload: Sized {
    const KIND: &'static str;

    fn write(&self, buf: &mut BytesMut);

    fn read(buf: &mut &[u8]) -> Option<Self>;

    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write(&mut buf);
        buf.freeze()
    }

    fn from_bytes(data: &[u8]) -> Result<Self, PacketError> {
        let malformed = PacketError::MalformedPayload {
            kind: Self::KIND,
            len: data.len(),
        };
        let mut cursor = data;
        let value = Self::read(&mut cursor).ok_or_else(|| malformed.clone())?;
        if cursor.has_remaining() {
            return Err(malformed);
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityState {
    pub position: Vec3,
    pub angle_h: f32,
    pub angle_v: f32,
}

impl EntityState {
    pub const WIRE_SIZE: usize = 20;

    pub fn new(position: Vec3, angle_h: f32, angle_v: f32) -> Self {
        Self {
            position,
            angle_h,
            angle_v,
        }
    }
}

impl Payload for EntityState {
    const KIND: &'static str = "entity state";

    fn write(&self, buf: &mut BytesMut) {
        buf.put_f32(self.position.x);
        buf.put_f32(self.position.y);
        buf.put_f32(self.position.z);
        buf.put_f32(self.angle_h);
        buf.put_f32(self.angle_v);
    }

    fn read(buf: &mut &[u8]) -> Option<Self> {
        if buf.remaining() < Self::WIRE_SIZE {
            return None;
        }
        let position = Vec3::new(buf.get_f32(), buf.get_f32(), buf.get_f32());
        Some(Self {
            position,
            angle_h: buf.get_f32(),
            angle_v: buf.get_f32(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    pub ignore_id: u16,
    pub entities: Vec<EntityState>,
}

impl WorldSnapshot {
    /// `ignore_id` value meaning the recipient was already left out.
    pub const NO_IGNORE: u16 = u16::MAX;
    pub const HEADER_SIZE: usize = 4;
    pub const MAX_ENTITIES: usize =
        (MAX_PACKET_DATA_SIZE - Self::HEADER_SIZE) / EntityState::WIRE_SIZE;

    pub fn new(entities: Vec<EntityState>) -> Self {
        Self {
            ignore_id: Self::NO_IGNORE,
            entities,
        }
    }

    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    /// Entities the recipient should render, honouring an in-range `ignore_id`.
    pub fn remote_entities(&self) -> impl Iterator<Item = &EntityState> + '_ {
        let ignore = self.ignore_id as usize;
        self.entities
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != ignore)
            .map(|(_, e)| e)
    }

    pub fn encode(&self) -> Result<Bytes, PacketError> {
        if self.entities.len() > Self::MAX_ENTITIES {
            return Err(PacketError::TooManyEntities(self.entities.len()));
        }
        Ok(self.to_bytes())
    }
}

impl Payload for WorldSnapshot {
    const KIND: &'static str = "world snapshot";

    fn write(&self, buf: &mut BytesMut) {
        buf.reserve(Self::HEADER_SIZE + self.entities.len() * EntityState::WIRE_SIZE);
        buf.put_u16(self.entities.len() as u16);
        buf.put_u16(self.ignore_id);
        for entity in &self.entities {
            entity.write(buf);
        }
    }

    fn read(buf: &mut &[u8]) -> Option<Self> {
        if buf.remaining() < Self::HEADER_SIZE {
            return None;
        }
        let num_entities = buf.get_u16() as usize;
        let ignore_id = buf.get_u16();
        if num_entities > Self::MAX_ENTITIES
            || buf.remaining() < num_entities * EntityState::WIRE_SIZE
        {
            return None;
        }

        let mut entities = Vec::with_capacity(num_entities);
        for _ in 0..num_entities {
            entities.push(EntityState::read(buf)?);
        }

        Some(Self {
            ignore_id,
            entities,
        })
    }
}
