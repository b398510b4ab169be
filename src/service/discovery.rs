//! Device discovery: `Who-Is` / `I-Am` / `Who-Has` / `I-Have`.
//! Unlike most services these carry only application-tagged fields (no
//! context wrapping), matching the standard's original encoding.

use crate::address::ObjectId;
use crate::codec::primitive;
use crate::codec::tag::TagClass;
use crate::error::CodecError;

/// `BACnetSegmentation` (clause 21), carried in `I-Am`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segmentation {
    /// Can both transmit and receive segmented messages.
    Both,
    /// Can only transmit segmented messages.
    Transmit,
    /// Can only receive segmented messages.
    Receive,
    /// No segmentation support.
    None,
}

impl Segmentation {
    fn to_wire(self) -> u32 {
        match self {
            Segmentation::Both => 0,
            Segmentation::Transmit => 1,
            Segmentation::Receive => 2,
            Segmentation::None => 3,
        }
    }

    fn from_wire(v: u32) -> Result<Self, CodecError> {
        match v {
            0 => Ok(Segmentation::Both),
            1 => Ok(Segmentation::Transmit),
            2 => Ok(Segmentation::Receive),
            3 => Ok(Segmentation::None),
            _ => Err(CodecError::ValueOutOfRange { what: "segmentation must be 0..=3" }),
        }
    }
}

/// `Who-Is-Request`: no fields, or a `(low, high)` instance range. Per
/// clause 16.9, if either limit is present both must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhoIs {
    /// Instance-range limits. `None` means "everybody respond".
    pub range: Option<(u32, u32)>,
}

impl WhoIs {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self.range {
            None => Ok(0),
            Some((low, high)) => {
                let mut i = primitive::wrap_context(out, 0, |b| primitive::encode_unsigned(b, u64::from(low)))?;
                i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_unsigned(b, u64::from(high)))?;
                Ok(i)
            }
        }
    }

    /// Decode. An empty `buf` decodes to `range: None`.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if only one limit is present.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        if buf.is_empty() {
            return Ok((Self { range: None }, 0));
        }
        let (low, mut i) = primitive::decode_context_unsigned(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("deviceInstanceRangeLowLimit"))?;
        let (high, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("deviceInstanceRangeHighLimit"))?;
        i += c;
        Ok((Self { range: Some((low as u32, high as u32)) }, i))
    }
}

/// `I-Am-Request`: application-tagged device id, max-APDU, segmentation,
/// vendor id, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAm {
    /// The responding device's object identifier.
    pub device: ObjectId,
    /// Largest APDU the device will accept.
    pub max_apdu: u32,
    /// Segmentation capability.
    pub segmentation: Segmentation,
    /// Vendor identifier.
    pub vendor_id: u16,
}

impl IAm {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_object_id(out, self.device)?;
        i += primitive::encode_unsigned(&mut out[i..], u64::from(self.max_apdu))?;
        i += primitive::encode_enumerated(&mut out[i..], self.segmentation.to_wire())?;
        i += primitive::encode_unsigned(&mut out[i..], u64::from(self.vendor_id))?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::Truncated`], [`CodecError::InvalidTag`],
    /// [`CodecError::ValueOutOfRange`] if segmentation isn't 0..=3.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (device, mut i) = primitive::decode_object_id(buf)?;
        let (max_apdu, c) = primitive::decode_unsigned(&buf[i..])?;
        i += c;
        let (seg, c) = primitive::decode_enumerated(&buf[i..])?;
        i += c;
        let segmentation = Segmentation::from_wire(seg)?;
        let (vendor_id, c) = primitive::decode_unsigned(&buf[i..])?;
        i += c;
        Ok((Self { device, max_apdu: max_apdu as u32, segmentation, vendor_id: vendor_id as u16 }, i))
    }
}

/// Which object a `Who-Has` is asking about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoHasSelector {
    /// By object identifier, context tag 2.
    ObjectId(ObjectId),
    /// By object name, context tag 3.
    ObjectName(Vec<u8>),
}

/// `Who-Has-Request`: optional device-instance range, then a selector
/// CHOICE of object id or object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoHas {
    /// Instance-range limits. `None` means "everybody respond".
    pub range: Option<(u32, u32)>,
    /// The object being sought.
    pub selector: WhoHasSelector,
}

impl WhoHas {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = 0;
        if let Some((low, high)) = self.range {
            i += primitive::wrap_context(&mut out[i..], 0, |b| primitive::encode_unsigned(b, u64::from(low)))?;
            i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_unsigned(b, u64::from(high)))?;
        }
        match &self.selector {
            WhoHasSelector::ObjectId(id) => {
                i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_object_id(b, *id))?;
            }
            WhoHasSelector::ObjectName(name) => {
                i += primitive::wrap_context(&mut out[i..], 3, |b| primitive::encode_character_string(b, 0, name))?;
            }
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if the selector is absent,
    /// [`CodecError::UnknownTagInSequence`] if it's neither 2 nor 3.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let mut i = 0;
        let mut range = None;
        if let Ok(t) = primitive::peek_tag(buf) {
            if t.class == TagClass::Context && t.number == 0 {
                let (low, c) = primitive::decode_context_unsigned(buf, 0)?;
                i += c;
                let (high, c) = primitive::decode_context_unsigned(&buf[i..], 1)
                    .map_err(|_| CodecError::MissingRequiredField("deviceInstanceRangeHighLimit"))?;
                i += c;
                range = Some((low as u32, high as u32));
            }
        }
        let t = primitive::peek_tag(&buf[i..]).map_err(|_| CodecError::MissingRequiredField("object"))?;
        let selector = match (t.class, t.number) {
            (TagClass::Context, 2) => {
                let (id, c) = primitive::decode_context_object_id(&buf[i..], 2)?;
                i += c;
                WhoHasSelector::ObjectId(id)
            }
            (TagClass::Context, 3) => {
                let (enc_and_bytes, c) = decode_context_character_string(&buf[i..], 3)?;
                i += c;
                WhoHasSelector::ObjectName(enc_and_bytes)
            }
            _ => return Err(CodecError::UnknownTagInSequence(t.number)),
        };
        Ok((Self { range, selector }, i))
    }
}

fn decode_context_character_string(buf: &[u8], number: u8) -> Result<(Vec<u8>, usize), CodecError> {
    let (t, tag_len) = crate::codec::tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != number {
        return Err(CodecError::InvalidTag { expected: "context", got_number: t.number, got_class: t.class });
    }
    let len = t
        .value_len()
        .ok_or(CodecError::InvalidTag { expected: "primitive", got_number: t.number, got_class: t.class })? as usize;
    if buf.len() < tag_len + len {
        return Err(CodecError::Truncated { needed: tag_len + len, available: buf.len() });
    }
    // Skip the one-byte character-set encoding prefix, matching
    // `decode_character_string`'s application-tagged counterpart.
    let bytes = buf[tag_len + 1..tag_len + len].to_vec();
    Ok((bytes, tag_len + len))
}

/// `I-Have-Request`: application-tagged device id, object id, object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IHave {
    /// The device that holds the object.
    pub device_id: ObjectId,
    /// The object found.
    pub object_id: ObjectId,
    /// The object's name.
    pub object_name: Vec<u8>,
}

impl IHave {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_object_id(out, self.device_id)?;
        i += primitive::encode_object_id(&mut out[i..], self.object_id)?;
        i += primitive::encode_character_string(&mut out[i..], 0, &self.object_name)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::Truncated`], [`CodecError::InvalidTag`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (device_id, mut i) = primitive::decode_object_id(buf)?;
        let (object_id, c) = primitive::decode_object_id(&buf[i..])?;
        i += c;
        let ((_enc, name), c) = primitive::decode_character_string(&buf[i..])?;
        let object_name = name.to_vec();
        i += c;
        Ok((Self { device_id, object_id, object_name }, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn who_is_with_no_limits_encodes_to_nothing() {
        let w = WhoIs { range: None };
        let mut buf = [0u8; 8];
        let n = w.encode(&mut buf).unwrap();
        assert_eq!(n, 0);
        let (got, consumed) = WhoIs::decode(&buf[..n]).unwrap();
        assert_eq!(got, w);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn who_is_with_range_round_trips() {
        let w = WhoIs { range: Some((10, 20)) };
        let mut buf = [0u8; 16];
        let n = w.encode(&mut buf).unwrap();
        let (got, consumed) = WhoIs::decode(&buf[..n]).unwrap();
        assert_eq!(got, w);
        assert_eq!(consumed, n);
    }

    #[test]
    fn i_am_round_trips() {
        let a = IAm {
            device: ObjectId::new(8, 4_194_303),
            max_apdu: 1476,
            segmentation: Segmentation::None,
            vendor_id: 0,
        };
        let mut buf = [0u8; 16];
        let n = a.encode(&mut buf).unwrap();
        let (got, consumed) = IAm::decode(&buf[..n]).unwrap();
        assert_eq!(got, a);
        assert_eq!(consumed, n);
    }

    #[test]
    fn who_has_by_object_id_round_trips() {
        let w = WhoHas { range: None, selector: WhoHasSelector::ObjectId(ObjectId::new(0, 1)) };
        let mut buf = [0u8; 16];
        let n = w.encode(&mut buf).unwrap();
        let (got, consumed) = WhoHas::decode(&buf[..n]).unwrap();
        assert_eq!(got, w);
        assert_eq!(consumed, n);
    }

    #[test]
    fn who_has_by_object_name_round_trips_with_range() {
        let w = WhoHas {
            range: Some((1, 100)),
            selector: WhoHasSelector::ObjectName(b"AHU-1".to_vec()),
        };
        let mut buf = [0u8; 32];
        let n = w.encode(&mut buf).unwrap();
        let (got, consumed) = WhoHas::decode(&buf[..n]).unwrap();
        assert_eq!(got, w);
        assert_eq!(consumed, n);
    }

    #[test]
    fn i_have_round_trips() {
        let h = IHave { device_id: ObjectId::new(8, 1), object_id: ObjectId::new(0, 1), object_name: b"AHU-1".to_vec() };
        let mut buf = [0u8; 32];
        let n = h.encode(&mut buf).unwrap();
        let (got, consumed) = IHave::decode(&buf[..n]).unwrap();
        assert_eq!(got, h);
        assert_eq!(consumed, n);
    }
}
