//! `ReadProperty` / `WriteProperty`.

use crate::address::ObjectId;
use crate::codec::composite::{encode_closing, encode_opening, expect_closing, expect_opening};
use crate::codec::primitive;
use crate::codec::tag::TagClass;
use crate::codec::value::AppValue;
use crate::error::CodecError;

/// `ReadProperty-Request`: object(0), property(1), optional array-index(2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    /// The object to read from.
    pub object: ObjectId,
    /// Which property.
    pub property: u32,
    /// Array index, if a single element of an array property is wanted.
    pub array_index: Option<u32>,
}

impl ReadPropertyRequest {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::wrap_context(out, 0, |b| primitive::encode_object_id(b, self.object))?;
        i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_enumerated(b, self.property))?;
        if let Some(idx) = self.array_index {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_unsigned(b, u64::from(idx)))?;
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if object or property is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (object, mut i) = primitive::decode_context_object_id(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        let (property, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("property-identifier"))?;
        i += c;
        let mut array_index = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 2 {
                let (idx, c) = primitive::decode_context_unsigned(&buf[i..], 2)?;
                array_index = Some(idx as u32);
                i += c;
            }
        }
        Ok((Self { object, property: property as u32, array_index }, i))
    }
}

/// `ReadProperty-Ack`: request fields plus `property-value`(3), a
/// constructed list of application-tagged values (a single-element list
/// for scalar properties).
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck {
    /// Echoes the request.
    pub object: ObjectId,
    /// Echoes the request.
    pub property: u32,
    /// Echoes the request.
    pub array_index: Option<u32>,
    /// The property's value(s).
    pub property_value: Vec<AppValue>,
}

impl ReadPropertyAck {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::wrap_context(out, 0, |b| primitive::encode_object_id(b, self.object))?;
        i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_enumerated(b, self.property))?;
        if let Some(idx) = self.array_index {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_unsigned(b, u64::from(idx)))?;
        }
        i += encode_opening(&mut out[i..], 3)?;
        for v in &self.property_value {
            i += v.encode(&mut out[i..])?;
        }
        i += encode_closing(&mut out[i..], 3)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if a required field is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (object, mut i) = primitive::decode_context_object_id(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        let (property, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("property-identifier"))?;
        i += c;
        let mut array_index = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 2 {
                let (idx, c) = primitive::decode_context_unsigned(&buf[i..], 2)?;
                array_index = Some(idx as u32);
                i += c;
            }
        }
        i += expect_opening(&buf[i..], 3)?;
        let mut property_value = Vec::new();
        loop {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.is_closing(3) {
                i += expect_closing(&buf[i..], 3)?;
                break;
            }
            let (v, c) = AppValue::decode(&buf[i..])?;
            property_value.push(v);
            i += c;
        }
        Ok((Self { object, property: property as u32, array_index, property_value }, i))
    }
}

/// `WriteProperty-Request`: `ReadPropertyRequest` fields plus value(3)
/// and optional priority(4).
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    /// The object to write to.
    pub object: ObjectId,
    /// Which property.
    pub property: u32,
    /// Array index, if writing a single element of an array property.
    pub array_index: Option<u32>,
    /// The value(s) to write.
    pub value: Vec<AppValue>,
    /// Write priority, 1..16. `None` means "no priority given" (relinquish
    /// uses a `Null` value in `value` at the desired priority instead).
    pub priority: Option<u8>,
}

impl WritePropertyRequest {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`], or [`CodecError::ValueOutOfRange`]
    /// if `priority` is outside 1..=16.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        if let Some(p) = self.priority {
            if !(1..=16).contains(&p) {
                return Err(CodecError::ValueOutOfRange { what: "write priority must be 1..=16" });
            }
        }
        let mut i = primitive::wrap_context(out, 0, |b| primitive::encode_object_id(b, self.object))?;
        i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_enumerated(b, self.property))?;
        if let Some(idx) = self.array_index {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_unsigned(b, u64::from(idx)))?;
        }
        i += encode_opening(&mut out[i..], 3)?;
        for v in &self.value {
            i += v.encode(&mut out[i..])?;
        }
        i += encode_closing(&mut out[i..], 3)?;
        if let Some(p) = self.priority {
            i += primitive::wrap_context(&mut out[i..], 4, |b| primitive::encode_unsigned(b, u64::from(p)))?;
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if a required field is absent,
    /// [`CodecError::ValueOutOfRange`] if the decoded priority is outside 1..=16.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (object, mut i) = primitive::decode_context_object_id(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        let (property, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("property-identifier"))?;
        i += c;
        let mut array_index = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 2 {
                let (idx, c) = primitive::decode_context_unsigned(&buf[i..], 2)?;
                array_index = Some(idx as u32);
                i += c;
            }
        }
        i += expect_opening(&buf[i..], 3)?;
        let mut value = Vec::new();
        loop {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.is_closing(3) {
                i += expect_closing(&buf[i..], 3)?;
                break;
            }
            let (v, c) = AppValue::decode(&buf[i..])?;
            value.push(v);
            i += c;
        }
        let mut priority = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 4 {
                let (p, c) = primitive::decode_context_unsigned(&buf[i..], 4)?;
                if !(1..=16).contains(&p) {
                    return Err(CodecError::ValueOutOfRange { what: "write priority must be 1..=16" });
                }
                priority = Some(p as u8);
                i += c;
            }
        }
        Ok((Self { object, property: property as u32, array_index, value, priority }, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_property_request_round_trips() {
        let r = ReadPropertyRequest { object: ObjectId::new(8, 1), property: 77, array_index: None };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ReadPropertyRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn read_property_ack_round_trips_object_id_value() {
        let ack = ReadPropertyAck {
            object: ObjectId::new(8, 1),
            property: 77,
            array_index: None,
            property_value: vec![AppValue::ObjectId(ObjectId::new(8, 1))],
        };
        let mut buf = [0u8; 32];
        let n = ack.encode(&mut buf).unwrap();
        let (got, consumed) = ReadPropertyAck::decode(&buf[..n]).unwrap();
        assert_eq!(got, ack);
        assert_eq!(consumed, n);
    }

    #[test]
    fn write_property_round_trips_with_priority() {
        let r = WritePropertyRequest {
            object: ObjectId::new(0, 1),
            property: 85,
            array_index: None,
            value: vec![AppValue::Real(21.5)],
            priority: Some(8),
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = WritePropertyRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn write_property_rejects_out_of_range_priority() {
        let r = WritePropertyRequest {
            object: ObjectId::new(0, 1),
            property: 85,
            array_index: None,
            value: vec![AppValue::Null],
            priority: Some(17),
        };
        let mut buf = [0u8; 32];
        assert!(r.encode(&mut buf).is_err());
    }
}
