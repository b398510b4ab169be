//! Primitive value encode/decode.
//!
//! Every function here writes into a caller-supplied buffer and returns
//! the byte count, so the same code can be used to size an encode (pass
//! a buffer no decoder will overrun — see [`encoded_len`]) or to
//! serialize it (pass a real buffer). Decoders take `(bytes)` and return
//! `(value, consumed)`, never reading past `bytes.len()`.

use crate::address::ObjectId;
use crate::codec::tag::{self, Tag, TagClass, TagLength};
use crate::error::CodecError;

/// BACnet application tag numbers (ANSI/ASHRAE 135 clause 20.2.1.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApplicationTagNumber {
    /// Null.
    Null = 0,
    /// Boolean.
    Boolean = 1,
    /// Unsigned integer.
    UnsignedInt = 2,
    /// Signed integer.
    SignedInt = 3,
    /// IEEE-754 single precision.
    Real = 4,
    /// IEEE-754 double precision.
    Double = 5,
    /// Octet string.
    OctetString = 6,
    /// Character string.
    CharacterString = 7,
    /// Bit string.
    BitString = 8,
    /// Enumerated.
    Enumerated = 9,
    /// Date.
    Date = 10,
    /// Time.
    Time = 11,
    /// Object identifier.
    ObjectId = 12,
}

/// Compute how many bytes `encode_unsigned` would write, without writing.
#[must_use]
pub fn unsigned_width(value: u64) -> usize {
    let bytes = value.to_be_bytes();
    let mut i = 0;
    while i < 7 && bytes[i] == 0 {
        i += 1;
    }
    8 - i
}

/// Encode an unsigned integer in the minimum number of bytes (1..=8),
/// application-tagged. Returns bytes written.
///
/// # Errors
/// [`CodecError::BufferTooSmall`] if `out` is too small.
pub fn encode_unsigned(out: &mut [u8], value: u64) -> Result<usize, CodecError> {
    let width = unsigned_width(value);
    let tag_len = tag::encode_tag(
        out,
        ApplicationTagNumber::UnsignedInt as u8,
        TagClass::Application,
        TagLength::Value(width as u32),
    )?;
    if out.len() < tag_len + width {
        return Err(CodecError::BufferTooSmall { needed: tag_len + width, available: out.len() });
    }
    let bytes = value.to_be_bytes();
    out[tag_len..tag_len + width].copy_from_slice(&bytes[8 - width..]);
    Ok(tag_len + width)
}

/// Decode an application-tagged unsigned integer, minimum 1 byte.
///
/// # Errors
/// [`CodecError::InvalidTag`] if the tag isn't application/Unsigned.
/// [`CodecError::InvalidIntegerWidth`] if the declared width exceeds 8 bytes.
/// [`CodecError::Truncated`] if the buffer runs out mid-value.
pub fn decode_unsigned(buf: &[u8]) -> Result<(u64, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::UnsignedInt)?;
    let width = t.value_len().unwrap_or(0) as usize;
    if width > 8 {
        return Err(CodecError::InvalidIntegerWidth { width, what: "unsigned" });
    }
    if buf.len() < tag_len + width {
        return Err(CodecError::Truncated { needed: tag_len + width, available: buf.len() });
    }
    let mut bytes = [0u8; 8];
    bytes[8 - width..].copy_from_slice(&buf[tag_len..tag_len + width]);
    Ok((u64::from_be_bytes(bytes), tag_len + width))
}

/// Encode a signed integer in minimum-length two's complement,
/// application-tagged.
///
/// # Errors
/// [`CodecError::BufferTooSmall`] if `out` is too small.
pub fn encode_signed(out: &mut [u8], value: i32) -> Result<usize, CodecError> {
    let bytes = value.to_be_bytes();
    // Minimum w in 1..=4 such that value fits in w-byte two's complement,
    // i.e. -2^(8w-1) <= value < 2^(8w-1).
    let value64 = i64::from(value);
    let mut width = 4;
    for w in 1..4 {
        let bits = 8 * w;
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        if value64 >= min && value64 <= max {
            width = w;
            break;
        }
    }
    let tag_len = tag::encode_tag(
        out,
        ApplicationTagNumber::SignedInt as u8,
        TagClass::Application,
        TagLength::Value(width as u32),
    )?;
    if out.len() < tag_len + width {
        return Err(CodecError::BufferTooSmall { needed: tag_len + width, available: out.len() });
    }
    out[tag_len..tag_len + width].copy_from_slice(&bytes[4 - width..]);
    Ok(tag_len + width)
}

/// Decode an application-tagged signed integer with sign extension.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::InvalidIntegerWidth`] (width
/// outside 1..=4), or [`CodecError::Truncated`].
pub fn decode_signed(buf: &[u8]) -> Result<(i32, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::SignedInt)?;
    let width = t.value_len().unwrap_or(0) as usize;
    if width == 0 || width > 4 {
        return Err(CodecError::InvalidIntegerWidth { width, what: "signed" });
    }
    if buf.len() < tag_len + width {
        return Err(CodecError::Truncated { needed: tag_len + width, available: buf.len() });
    }
    let negative = buf[tag_len] & 0x80 != 0;
    let fill = if negative { 0xFF } else { 0x00 };
    let mut bytes = [fill; 4];
    bytes[4 - width..].copy_from_slice(&buf[tag_len..tag_len + width]);
    Ok((i32::from_be_bytes(bytes), tag_len + width))
}

/// Encode an enumerated value: same wire shape as unsigned, distinct tag number.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_enumerated(out: &mut [u8], value: u32) -> Result<usize, CodecError> {
    let width = unsigned_width(u64::from(value));
    let tag_len = tag::encode_tag(
        out,
        ApplicationTagNumber::Enumerated as u8,
        TagClass::Application,
        TagLength::Value(width as u32),
    )?;
    if out.len() < tag_len + width {
        return Err(CodecError::BufferTooSmall { needed: tag_len + width, available: out.len() });
    }
    let bytes = u64::from(value).to_be_bytes();
    out[tag_len..tag_len + width].copy_from_slice(&bytes[8 - width..]);
    Ok(tag_len + width)
}

/// Decode an application-tagged enumerated value.
///
/// # Errors
/// See [`decode_unsigned`].
pub fn decode_enumerated(buf: &[u8]) -> Result<(u32, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Enumerated)?;
    let width = t.value_len().unwrap_or(0) as usize;
    if width > 4 {
        return Err(CodecError::InvalidIntegerWidth { width, what: "enumerated" });
    }
    if buf.len() < tag_len + width {
        return Err(CodecError::Truncated { needed: tag_len + width, available: buf.len() });
    }
    let mut bytes = [0u8; 4];
    bytes[4 - width..].copy_from_slice(&buf[tag_len..tag_len + width]);
    Ok((u32::from_be_bytes(bytes), tag_len + width))
}

/// Encode a boolean, application-tagged (the value lives in the tag's length field).
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_boolean(out: &mut [u8], value: bool) -> Result<usize, CodecError> {
    tag::encode_tag(
        out,
        ApplicationTagNumber::Boolean as u8,
        TagClass::Application,
        TagLength::Value(u32::from(value)),
    )
}

/// Decode an application-tagged boolean.
///
/// # Errors
/// [`CodecError::InvalidTag`].
pub fn decode_boolean(buf: &[u8]) -> Result<(bool, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Boolean)?;
    let v = t.value_len().unwrap_or(0);
    Ok((v != 0, tag_len))
}

/// Encode a null, application-tagged.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_null(out: &mut [u8]) -> Result<usize, CodecError> {
    tag::encode_tag(out, ApplicationTagNumber::Null as u8, TagClass::Application, TagLength::Value(0))
}

/// Decode an application-tagged null.
///
/// # Errors
/// [`CodecError::InvalidTag`].
pub fn decode_null(buf: &[u8]) -> Result<((), usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Null)?;
    Ok(((), tag_len))
}

/// Encode a 4-byte IEEE-754 `Real`, application-tagged, big-endian.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_real(out: &mut [u8], value: f32) -> Result<usize, CodecError> {
    let tag_len = tag::encode_tag(out, ApplicationTagNumber::Real as u8, TagClass::Application, TagLength::Value(4))?;
    if out.len() < tag_len + 4 {
        return Err(CodecError::BufferTooSmall { needed: tag_len + 4, available: out.len() });
    }
    out[tag_len..tag_len + 4].copy_from_slice(&value.to_be_bytes());
    Ok(tag_len + 4)
}

/// Decode an application-tagged `Real`.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::ValueOutOfRange`] if the
/// declared length isn't 4, [`CodecError::Truncated`].
pub fn decode_real(buf: &[u8]) -> Result<(f32, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Real)?;
    if t.value_len() != Some(4) {
        return Err(CodecError::ValueOutOfRange { what: "real length must be 4" });
    }
    if buf.len() < tag_len + 4 {
        return Err(CodecError::Truncated { needed: tag_len + 4, available: buf.len() });
    }
    let bytes: [u8; 4] = buf[tag_len..tag_len + 4].try_into().expect("slice is exactly 4 bytes");
    Ok((f32::from_be_bytes(bytes), tag_len + 4))
}

/// Encode an 8-byte IEEE-754 `Double`, application-tagged, big-endian.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_double(out: &mut [u8], value: f64) -> Result<usize, CodecError> {
    let tag_len =
        tag::encode_tag(out, ApplicationTagNumber::Double as u8, TagClass::Application, TagLength::Value(8))?;
    if out.len() < tag_len + 8 {
        return Err(CodecError::BufferTooSmall { needed: tag_len + 8, available: out.len() });
    }
    out[tag_len..tag_len + 8].copy_from_slice(&value.to_be_bytes());
    Ok(tag_len + 8)
}

/// Decode an application-tagged `Double`.
///
/// # Errors
/// As [`decode_real`].
pub fn decode_double(buf: &[u8]) -> Result<(f64, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Double)?;
    if t.value_len() != Some(8) {
        return Err(CodecError::ValueOutOfRange { what: "double length must be 8" });
    }
    if buf.len() < tag_len + 8 {
        return Err(CodecError::Truncated { needed: tag_len + 8, available: buf.len() });
    }
    let bytes: [u8; 8] = buf[tag_len..tag_len + 8].try_into().expect("slice is exactly 8 bytes");
    Ok((f64::from_be_bytes(bytes), tag_len + 8))
}

/// Encode an octet string, application-tagged.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_octet_string(out: &mut [u8], data: &[u8]) -> Result<usize, CodecError> {
    let tag_len = tag::encode_tag(
        out,
        ApplicationTagNumber::OctetString as u8,
        TagClass::Application,
        TagLength::Value(data.len() as u32),
    )?;
    if out.len() < tag_len + data.len() {
        return Err(CodecError::BufferTooSmall { needed: tag_len + data.len(), available: out.len() });
    }
    out[tag_len..tag_len + data.len()].copy_from_slice(data);
    Ok(tag_len + data.len())
}

/// Decode an application-tagged octet string; returns a borrowed slice
/// and the bytes consumed.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::Truncated`].
pub fn decode_octet_string(buf: &[u8]) -> Result<(&[u8], usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::OctetString)?;
    let len = t.value_len().unwrap_or(0) as usize;
    if buf.len() < tag_len + len {
        return Err(CodecError::Truncated { needed: tag_len + len, available: buf.len() });
    }
    Ok((&buf[tag_len..tag_len + len], tag_len + len))
}

/// BACnet character-string encodings (clause 20.2.9).
pub const STRING_ENCODING_UTF8: u8 = 0;
/// UCS-2 (basically UTF-16 without surrogate pairs).
pub const STRING_ENCODING_UCS2: u8 = 3;
/// UCS-4.
pub const STRING_ENCODING_UCS4: u8 = 4;

/// Encode a character string: one encoding octet followed by raw bytes
/// in that encoding, application-tagged.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_character_string(out: &mut [u8], encoding: u8, text_bytes: &[u8]) -> Result<usize, CodecError> {
    let payload_len = text_bytes.len() + 1;
    let tag_len = tag::encode_tag(
        out,
        ApplicationTagNumber::CharacterString as u8,
        TagClass::Application,
        TagLength::Value(payload_len as u32),
    )?;
    if out.len() < tag_len + payload_len {
        return Err(CodecError::BufferTooSmall { needed: tag_len + payload_len, available: out.len() });
    }
    out[tag_len] = encoding;
    out[tag_len + 1..tag_len + payload_len].copy_from_slice(text_bytes);
    Ok(tag_len + payload_len)
}

/// Decode an application-tagged character string, returning
/// `(encoding, bytes, consumed)`.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::Truncated`], or
/// [`CodecError::ValueOutOfRange`] if the payload is empty (missing the
/// encoding octet).
pub fn decode_character_string(buf: &[u8]) -> Result<((u8, &[u8]), usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::CharacterString)?;
    let payload_len = t.value_len().unwrap_or(0) as usize;
    if payload_len == 0 {
        return Err(CodecError::ValueOutOfRange { what: "character string missing encoding octet" });
    }
    if buf.len() < tag_len + payload_len {
        return Err(CodecError::Truncated { needed: tag_len + payload_len, available: buf.len() });
    }
    let encoding = buf[tag_len];
    let bytes = &buf[tag_len + 1..tag_len + payload_len];
    Ok(((encoding, bytes), tag_len + payload_len))
}

/// Encode a bit string: one "unused bits" octet followed by
/// `ceil(bits_used/8)` payload bytes, application-tagged.
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_bit_string(out: &mut [u8], bits_used: u8, bytes: &[u8]) -> Result<usize, CodecError> {
    let unused = if bits_used == 0 { 0 } else { (8 - (bits_used % 8)) % 8 };
    let payload_len = bytes.len() + 1;
    let tag_len = tag::encode_tag(
        out,
        ApplicationTagNumber::BitString as u8,
        TagClass::Application,
        TagLength::Value(payload_len as u32),
    )?;
    if out.len() < tag_len + payload_len {
        return Err(CodecError::BufferTooSmall { needed: tag_len + payload_len, available: out.len() });
    }
    out[tag_len] = unused;
    out[tag_len + 1..tag_len + payload_len].copy_from_slice(bytes);
    Ok(tag_len + payload_len)
}

/// Decode an application-tagged bit string, returning
/// `(bits_used, bytes, consumed)`.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::Truncated`],
/// [`CodecError::ValueOutOfRange`] for an empty payload or an
/// unused-bits count `> 7`.
pub fn decode_bit_string(buf: &[u8]) -> Result<((u8, &[u8]), usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::BitString)?;
    let payload_len = t.value_len().unwrap_or(0) as usize;
    if payload_len == 0 {
        return Err(CodecError::ValueOutOfRange { what: "bit string missing unused-bits octet" });
    }
    if buf.len() < tag_len + payload_len {
        return Err(CodecError::Truncated { needed: tag_len + payload_len, available: buf.len() });
    }
    let unused = buf[tag_len];
    if unused > 7 {
        return Err(CodecError::ValueOutOfRange { what: "bit string unused bits > 7" });
    }
    let bytes = &buf[tag_len + 1..tag_len + payload_len];
    let bits_used = (bytes.len() as u8).saturating_mul(8).saturating_sub(unused);
    Ok(((bits_used, bytes), tag_len + payload_len))
}

/// A decoded or to-be-encoded BACnet date.
///
/// Each field may be a wildcard; `year` 0xFF means "any year" and is
/// stored here as `None` rather than the sentinel, modeling wildcards
/// as explicit `Option` fields instead of exposing the raw sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    /// Calendar year, or `None` for "any year" (wire 0xFF).
    pub year: Option<u16>,
    /// Month 1..=12, or a special value (13=odd, 14=even), or `None` for any.
    pub month: MonthField,
    /// Day of month 1..=31, 32 for "last day", or `None` for any.
    pub day: DayField,
    /// ISO weekday, Monday=1..Sunday=7, or `None` for any.
    pub weekday: Option<u8>,
}

/// Month field of a [`Date`], including the standard's odd/even sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthField {
    /// A specific month, 1..=12.
    Specific(u8),
    /// Every odd month.
    Odd,
    /// Every even month.
    Even,
    /// Any month (wire 0xFF).
    Any,
}

/// Day-of-month field of a [`Date`], including the "last day" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayField {
    /// A specific day, 1..=31.
    Specific(u8),
    /// The last day of the month.
    Last,
    /// Any day (wire 0xFF).
    Any,
}

impl MonthField {
    pub(crate) fn to_wire(self) -> u8 {
        match self {
            MonthField::Specific(m) => m,
            MonthField::Odd => 13,
            MonthField::Even => 14,
            MonthField::Any => 0xFF,
        }
    }

    pub(crate) fn from_wire(b: u8) -> Self {
        match b {
            13 => MonthField::Odd,
            14 => MonthField::Even,
            0xFF => MonthField::Any,
            m => MonthField::Specific(m),
        }
    }
}

impl DayField {
    pub(crate) fn to_wire(self) -> u8 {
        match self {
            DayField::Specific(d) => d,
            DayField::Last => 32,
            DayField::Any => 0xFF,
        }
    }

    pub(crate) fn from_wire(b: u8) -> Self {
        match b {
            32 => DayField::Last,
            0xFF => DayField::Any,
            d => DayField::Specific(d),
        }
    }
}

/// Encode an application-tagged [`Date`] (4 octets).
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_date(out: &mut [u8], date: &Date) -> Result<usize, CodecError> {
    let tag_len = tag::encode_tag(out, ApplicationTagNumber::Date as u8, TagClass::Application, TagLength::Value(4))?;
    if out.len() < tag_len + 4 {
        return Err(CodecError::BufferTooSmall { needed: tag_len + 4, available: out.len() });
    }
    out[tag_len] = date.year.map_or(0xFF, |y| (y.saturating_sub(1900)) as u8);
    out[tag_len + 1] = date.month.to_wire();
    out[tag_len + 2] = date.day.to_wire();
    out[tag_len + 3] = date.weekday.unwrap_or(0xFF);
    Ok(tag_len + 4)
}

/// Decode an application-tagged [`Date`].
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::ValueOutOfRange`] if the
/// declared length isn't 4, [`CodecError::Truncated`].
pub fn decode_date(buf: &[u8]) -> Result<(Date, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Date)?;
    if t.value_len() != Some(4) {
        return Err(CodecError::ValueOutOfRange { what: "date length must be 4" });
    }
    if buf.len() < tag_len + 4 {
        return Err(CodecError::Truncated { needed: tag_len + 4, available: buf.len() });
    }
    let raw_year = buf[tag_len];
    let date = Date {
        year: if raw_year == 0xFF { None } else { Some(1900 + u16::from(raw_year)) },
        month: MonthField::from_wire(buf[tag_len + 1]),
        day: DayField::from_wire(buf[tag_len + 2]),
        weekday: if buf[tag_len + 3] == 0xFF { None } else { Some(buf[tag_len + 3]) },
    };
    Ok((date, tag_len + 4))
}

/// A decoded or to-be-encoded BACnet time, each field
/// wildcardable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Hour, 0..=23, or `None` for any.
    pub hour: Option<u8>,
    /// Minute, 0..=59, or `None` for any.
    pub minute: Option<u8>,
    /// Second, 0..=59, or `None` for any.
    pub second: Option<u8>,
    /// Hundredths of a second, 0..=99, or `None` for any.
    pub hundredths: Option<u8>,
}

/// Encode an application-tagged [`Time`] (4 octets).
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_time(out: &mut [u8], time: &Time) -> Result<usize, CodecError> {
    let tag_len = tag::encode_tag(out, ApplicationTagNumber::Time as u8, TagClass::Application, TagLength::Value(4))?;
    if out.len() < tag_len + 4 {
        return Err(CodecError::BufferTooSmall { needed: tag_len + 4, available: out.len() });
    }
    out[tag_len] = time.hour.unwrap_or(0xFF);
    out[tag_len + 1] = time.minute.unwrap_or(0xFF);
    out[tag_len + 2] = time.second.unwrap_or(0xFF);
    out[tag_len + 3] = time.hundredths.unwrap_or(0xFF);
    Ok(tag_len + 4)
}

/// Decode an application-tagged [`Time`].
///
/// # Errors
/// As [`decode_date`].
pub fn decode_time(buf: &[u8]) -> Result<(Time, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::Time)?;
    if t.value_len() != Some(4) {
        return Err(CodecError::ValueOutOfRange { what: "time length must be 4" });
    }
    if buf.len() < tag_len + 4 {
        return Err(CodecError::Truncated { needed: tag_len + 4, available: buf.len() });
    }
    let field = |b: u8| if b == 0xFF { None } else { Some(b) };
    let time = Time {
        hour: field(buf[tag_len]),
        minute: field(buf[tag_len + 1]),
        second: field(buf[tag_len + 2]),
        hundredths: field(buf[tag_len + 3]),
    };
    Ok((time, tag_len + 4))
}

/// Encode an application-tagged [`ObjectId`] (4 octets, packed).
///
/// # Errors
/// [`CodecError::BufferTooSmall`].
pub fn encode_object_id(out: &mut [u8], id: ObjectId) -> Result<usize, CodecError> {
    let tag_len =
        tag::encode_tag(out, ApplicationTagNumber::ObjectId as u8, TagClass::Application, TagLength::Value(4))?;
    if out.len() < tag_len + 4 {
        return Err(CodecError::BufferTooSmall { needed: tag_len + 4, available: out.len() });
    }
    out[tag_len..tag_len + 4].copy_from_slice(&id.packed().to_be_bytes());
    Ok(tag_len + 4)
}

/// Decode an application-tagged [`ObjectId`].
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::ValueOutOfRange`] if the
/// declared length isn't 4, [`CodecError::Truncated`].
pub fn decode_object_id(buf: &[u8]) -> Result<(ObjectId, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    expect_application_tag(&t, ApplicationTagNumber::ObjectId)?;
    if t.value_len() != Some(4) {
        return Err(CodecError::ValueOutOfRange { what: "object id length must be 4" });
    }
    if buf.len() < tag_len + 4 {
        return Err(CodecError::Truncated { needed: tag_len + 4, available: buf.len() });
    }
    let bytes: [u8; 4] = buf[tag_len..tag_len + 4].try_into().expect("slice is exactly 4 bytes");
    Ok((ObjectId::from_packed(u32::from_be_bytes(bytes)), tag_len + 4))
}

fn expect_application_tag(t: &Tag, want: ApplicationTagNumber) -> Result<(), CodecError> {
    if t.class != TagClass::Application || t.number != want as u8 {
        return Err(CodecError::InvalidTag {
            expected: application_tag_name(want),
            got_number: t.number,
            got_class: t.class,
        });
    }
    Ok(())
}

fn application_tag_name(t: ApplicationTagNumber) -> &'static str {
    match t {
        ApplicationTagNumber::Null => "Null",
        ApplicationTagNumber::Boolean => "Boolean",
        ApplicationTagNumber::UnsignedInt => "Unsigned",
        ApplicationTagNumber::SignedInt => "Signed",
        ApplicationTagNumber::Real => "Real",
        ApplicationTagNumber::Double => "Double",
        ApplicationTagNumber::OctetString => "OctetString",
        ApplicationTagNumber::CharacterString => "CharacterString",
        ApplicationTagNumber::BitString => "BitString",
        ApplicationTagNumber::Enumerated => "Enumerated",
        ApplicationTagNumber::Date => "Date",
        ApplicationTagNumber::Time => "Time",
        ApplicationTagNumber::ObjectId => "ObjectId",
    }
}

/// Context-tagged wrapper: encode `value` using `inner_encode`, but with
/// the application tag number replaced by a context tag of `context_number`.
///
/// This is how composite fields wrap primitives: the tag's
/// class/number changes but the payload bytes are identical to the
/// application-tagged form, so we encode normally into a scratch area of
/// `out` and then patch just the tag.
///
/// # Errors
/// [`CodecError::BufferTooSmall`] if `out` can't hold the result.
pub fn wrap_context<F>(out: &mut [u8], context_number: u8, inner_encode: F) -> Result<usize, CodecError>
where
    F: FnOnce(&mut [u8]) -> Result<usize, CodecError>,
{
    let mut scratch = vec![0u8; out.len().max(16)];
    let n = inner_encode(&mut scratch)?;
    let (inner_tag, inner_tag_len) = tag::decode_tag(&scratch[..n])?;
    let value_len = inner_tag
        .value_len()
        .ok_or(CodecError::ValueOutOfRange { what: "cannot context-wrap a constructed tag" })?;
    let tag_len = tag::encode_tag(out, context_number, TagClass::Context, TagLength::Value(value_len))?;
    let payload_len = n - inner_tag_len;
    if out.len() < tag_len + payload_len {
        return Err(CodecError::BufferTooSmall { needed: tag_len + payload_len, available: out.len() });
    }
    out[tag_len..tag_len + payload_len].copy_from_slice(&scratch[inner_tag_len..n]);
    Ok(tag_len + payload_len)
}

/// Decode a context-tagged unsigned integer, verifying the tag number first.
///
/// # Errors
/// [`CodecError::InvalidTag`] if the context number doesn't match.
pub fn decode_context_unsigned(buf: &[u8], context_number: u8) -> Result<(u64, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context_number {
        return Err(CodecError::InvalidTag { expected: "context unsigned", got_number: t.number, got_class: t.class });
    }
    let width = t.value_len().unwrap_or(0) as usize;
    if width > 8 {
        return Err(CodecError::InvalidIntegerWidth { width, what: "context unsigned" });
    }
    if buf.len() < tag_len + width {
        return Err(CodecError::Truncated { needed: tag_len + width, available: buf.len() });
    }
    let mut bytes = [0u8; 8];
    bytes[8 - width..].copy_from_slice(&buf[tag_len..tag_len + width]);
    Ok((u64::from_be_bytes(bytes), tag_len + width))
}

/// Decode a context-tagged [`ObjectId`], verifying the tag number first.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::ValueOutOfRange`], [`CodecError::Truncated`].
pub fn decode_context_object_id(buf: &[u8], context_number: u8) -> Result<(ObjectId, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context_number {
        return Err(CodecError::InvalidTag { expected: "context object-id", got_number: t.number, got_class: t.class });
    }
    if t.value_len() != Some(4) {
        return Err(CodecError::ValueOutOfRange { what: "object id length must be 4" });
    }
    if buf.len() < tag_len + 4 {
        return Err(CodecError::Truncated { needed: tag_len + 4, available: buf.len() });
    }
    let bytes: [u8; 4] = buf[tag_len..tag_len + 4].try_into().expect("slice is exactly 4 bytes");
    Ok((ObjectId::from_packed(u32::from_be_bytes(bytes)), tag_len + 4))
}

/// Decode a context-tagged octet string, verifying the tag number first.
///
/// # Errors
/// [`CodecError::InvalidTag`], [`CodecError::Truncated`].
pub fn decode_context_octet_string(buf: &[u8], context_number: u8) -> Result<(&[u8], usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context_number {
        return Err(CodecError::InvalidTag { expected: "context octet string", got_number: t.number, got_class: t.class });
    }
    let len = t.value_len().unwrap_or(0) as usize;
    if buf.len() < tag_len + len {
        return Err(CodecError::Truncated { needed: tag_len + len, available: buf.len() });
    }
    Ok((&buf[tag_len..tag_len + len], tag_len + len))
}

/// Peek at the next tag without consuming it — used by decoders of
/// OPTIONAL fields to decide presence before committing to a parse.
///
/// # Errors
/// [`CodecError::Truncated`].
pub fn peek_tag(buf: &[u8]) -> Result<Tag, CodecError> {
    Ok(tag::decode_tag(buf)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_round_trips_minimum_width() {
        for v in [0u64, 1, 255, 256, 65535, 65536, u64::MAX] {
            let mut buf = [0u8; 16];
            let n = encode_unsigned(&mut buf, v).unwrap();
            let (got, consumed) = decode_unsigned(&buf[..n]).unwrap();
            assert_eq!(got, v);
            assert_eq!(consumed, n);
            assert_eq!(n, 1 + unsigned_width(v));
        }
    }

    #[test]
    fn signed_round_trips_with_sign_extension() {
        for v in [0i32, 1, -1, 127, -128, 32767, -32768, i32::MAX, i32::MIN] {
            let mut buf = [0u8; 16];
            let n = encode_signed(&mut buf, v).unwrap();
            let (got, consumed) = decode_signed(&buf[..n]).unwrap();
            assert_eq!(got, v, "failed for {v}");
            assert_eq!(consumed, n);
        }
    }

    #[test]
    fn signed_encodes_minimum_width() {
        // (value, expected data-octet count, excluding the tag byte)
        for (v, width) in [(0i32, 1), (1, 1), (63, 1), (127, 1), (128, 2), (-128, 1), (-129, 2), (32767, 2), (-32768, 2), (i32::MAX, 4), (i32::MIN, 4)] {
            let mut buf = [0u8; 16];
            let n = encode_signed(&mut buf, v).unwrap();
            assert_eq!(n, 1 + width, "wrong width for {v}");
        }
    }

    #[test]
    fn boolean_round_trips() {
        for v in [true, false] {
            let mut buf = [0u8; 4];
            let n = encode_boolean(&mut buf, v).unwrap();
            let (got, consumed) = decode_boolean(&buf[..n]).unwrap();
            assert_eq!(got, v);
            assert_eq!(consumed, n);
        }
    }

    #[test]
    fn real_and_double_round_trip() {
        let mut buf = [0u8; 16];
        let n = encode_real(&mut buf, 1.5).unwrap();
        assert_eq!(decode_real(&buf[..n]).unwrap().0, 1.5);

        let mut buf = [0u8; 16];
        let n = encode_double(&mut buf, -3.25).unwrap();
        assert_eq!(decode_double(&buf[..n]).unwrap().0, -3.25);
    }

    #[test]
    fn octet_string_round_trips() {
        let data = b"Joshua-Mary-Anna-Christopher";
        let mut buf = [0u8; 64];
        let n = encode_octet_string(&mut buf, data).unwrap();
        let (got, consumed) = decode_octet_string(&buf[..n]).unwrap();
        assert_eq!(got, data);
        assert_eq!(consumed, n);
    }

    #[test]
    fn character_string_round_trips() {
        let mut buf = [0u8; 64];
        let n = encode_character_string(&mut buf, STRING_ENCODING_UTF8, b"hello").unwrap();
        let ((enc, bytes), consumed) = decode_character_string(&buf[..n]).unwrap();
        assert_eq!(enc, STRING_ENCODING_UTF8);
        assert_eq!(bytes, b"hello");
        assert_eq!(consumed, n);
    }

    #[test]
    fn bit_string_round_trips() {
        let mut buf = [0u8; 16];
        let n = encode_bit_string(&mut buf, 10, &[0b1010_1010, 0b1100_0000]).unwrap();
        let ((bits_used, bytes), consumed) = decode_bit_string(&buf[..n]).unwrap();
        assert_eq!(bits_used, 10);
        assert_eq!(bytes, &[0b1010_1010, 0b1100_0000]);
        assert_eq!(consumed, n);
    }

    #[test]
    fn date_round_trips_with_wildcards() {
        let d = Date { year: Some(2024), month: MonthField::Specific(3), day: DayField::Last, weekday: None };
        let mut buf = [0u8; 16];
        let n = encode_date(&mut buf, &d).unwrap();
        let (got, consumed) = decode_date(&buf[..n]).unwrap();
        assert_eq!(got, d);
        assert_eq!(consumed, n);

        let any = Date { year: None, month: MonthField::Any, day: DayField::Any, weekday: None };
        let n = encode_date(&mut buf, &any).unwrap();
        assert_eq!(decode_date(&buf[..n]).unwrap().0, any);
    }

    #[test]
    fn time_round_trips_with_wildcards() {
        let t = Time { hour: Some(23), minute: Some(59), second: None, hundredths: Some(50) };
        let mut buf = [0u8; 16];
        let n = encode_time(&mut buf, &t).unwrap();
        let (got, consumed) = decode_time(&buf[..n]).unwrap();
        assert_eq!(got, t);
        assert_eq!(consumed, n);
    }

    #[test]
    fn object_id_round_trips() {
        let id = ObjectId::new(8, 4_194_303);
        let mut buf = [0u8; 16];
        let n = encode_object_id(&mut buf, id).unwrap();
        let (got, consumed) = decode_object_id(&buf[..n]).unwrap();
        assert_eq!(got, id);
        assert_eq!(consumed, n);
    }

    #[test]
    fn truncation_never_overruns() {
        let mut buf = [0u8; 16];
        let n = encode_character_string(&mut buf, STRING_ENCODING_UTF8, b"hello world").unwrap();
        for k in 0..n {
            assert!(decode_character_string(&buf[..k]).is_err());
        }
    }

    #[test]
    fn context_wrap_round_trips_unsigned() {
        let mut buf = [0u8; 16];
        let n = wrap_context(&mut buf, 2, |b| encode_unsigned(b, 300)).unwrap();
        let (v, consumed) = decode_context_unsigned(&buf[..n], 2).unwrap();
        assert_eq!(v, 300);
        assert_eq!(consumed, n);
    }

    #[test]
    fn context_wrap_round_trips_object_id() {
        let mut buf = [0u8; 16];
        let id = ObjectId::new(8, 1);
        let n = wrap_context(&mut buf, 0, |b| encode_object_id(b, id)).unwrap();
        let (got, consumed) = decode_context_object_id(&buf[..n], 0).unwrap();
        assert_eq!(got, id);
        assert_eq!(consumed, n);
    }

    #[test]
    fn wrong_context_number_is_rejected() {
        let mut buf = [0u8; 16];
        let n = wrap_context(&mut buf, 2, |b| encode_unsigned(b, 1)).unwrap();
        assert!(decode_context_unsigned(&buf[..n], 3).is_err());
    }
}
