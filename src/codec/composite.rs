//! Composite (`BACnetXxx`) structures built from tagged primitives.
//!
//! Each type exposes `encode`/`decode` pairs operating on the same
//! caller-buffer convention as [`crate::codec::primitive`]. Sequences
//! that are themselves constructed values wrap their fields in an
//! opening/closing tag pair at the context number the caller supplies,
//! matching how these structures sit inside a service's parameter list.

use crate::address::ObjectId;
use crate::codec::primitive::{self, Date, Time};
use crate::codec::tag::{self, TagClass, TagLength};
use crate::error::CodecError;

pub(crate) fn expect_opening(buf: &[u8], number: u8) -> Result<usize, CodecError> {
    let (t, n) = tag::decode_tag(buf)?;
    if !t.is_opening(number) {
        return Err(CodecError::InvalidTag { expected: "opening tag", got_number: t.number, got_class: t.class });
    }
    Ok(n)
}

pub(crate) fn expect_closing(buf: &[u8], number: u8) -> Result<usize, CodecError> {
    let (t, n) = tag::decode_tag(buf)?;
    if !t.is_closing(number) {
        return Err(CodecError::MismatchedClosingTag { opened: number, closed: t.number });
    }
    Ok(n)
}

pub(crate) fn encode_opening(out: &mut [u8], number: u8) -> Result<usize, CodecError> {
    tag::encode_tag(out, number, TagClass::Context, TagLength::Opening)
}

pub(crate) fn encode_closing(out: &mut [u8], number: u8) -> Result<usize, CodecError> {
    tag::encode_tag(out, number, TagClass::Context, TagLength::Closing)
}

/// `BACnetObjectPropertyReference` (clause 21, used by `ReadAccessSpecification`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPropertyReference {
    /// Object being referenced.
    pub object_identifier: ObjectId,
    /// Property identifier (an enumeration; stored raw since the full
    /// property-identifier enumeration is outside this crate's scope).
    pub property_identifier: u32,
    /// Array index, if the property is an array and a single element is referenced.
    pub property_array_index: Option<u32>,
}

impl ObjectPropertyReference {
    /// Encode, context-tagged 0 (object-identifier) / 1 (property-identifier)
    /// / 2 (property-array-index), not wrapped in an outer constructed tag:
    /// callers that need the wrapper apply [`encode_opening`]/[`encode_closing`]
    /// at the context number appropriate to their own field.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = 0;
        i += primitive::wrap_context(&mut out[i..], 0, |b| primitive::encode_object_id(b, self.object_identifier))?;
        i += primitive::wrap_context(&mut out[i..], 1, |b| {
            primitive::encode_enumerated(b, self.property_identifier)
        })?;
        if let Some(idx) = self.property_array_index {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_unsigned(b, u64::from(idx)))?;
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if object-identifier or
    /// property-identifier is absent; codec errors otherwise.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let mut i = 0;
        let (object_identifier, c) = primitive::decode_context_object_id(&buf[i..], 0)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        i += c;
        let (property_identifier, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("property-identifier"))?;
        i += c;
        let mut property_array_index = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 2 {
                let (idx, c) = primitive::decode_context_unsigned(&buf[i..], 2)?;
                property_array_index = Some(idx as u32);
                i += c;
            }
        }
        Ok((Self { object_identifier, property_identifier: property_identifier as u32, property_array_index }, i))
    }
}

/// `BACnetDeviceObjectPropertyReference` (clause 21): an
/// [`ObjectPropertyReference`] plus an optional owning device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceObjectPropertyReference {
    /// The referenced object/property/index.
    pub reference: ObjectPropertyReference,
    /// Device that owns the object, if this reference crosses devices.
    pub device_identifier: Option<ObjectId>,
}

impl DeviceObjectPropertyReference {
    /// Encode: object-identifier(0), property-identifier(1),
    /// property-array-index(2), device-identifier(3).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = self.reference.encode(out)?;
        if let Some(dev) = self.device_identifier {
            i += primitive::wrap_context(&mut out[i..], 3, |b| primitive::encode_object_id(b, dev))?;
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// As [`ObjectPropertyReference::decode`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (reference, mut i) = ObjectPropertyReference::decode(buf)?;
        let mut device_identifier = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 3 {
                let (dev, c) = primitive::decode_context_object_id(&buf[i..], 3)?;
                device_identifier = Some(dev);
                i += c;
            }
        }
        Ok((Self { reference, device_identifier }, i))
    }
}

/// `BACnetDeviceObjectReference` (clause 21): a device/object pair with
/// the device identifier optional (local object when absent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceObjectReference {
    /// Device that owns `object_identifier`, or `None` for "this device".
    pub device_identifier: Option<ObjectId>,
    /// The referenced object.
    pub object_identifier: ObjectId,
}

impl DeviceObjectReference {
    /// Encode: device-identifier(0, optional), object-identifier(1).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = 0;
        if let Some(dev) = self.device_identifier {
            i += primitive::wrap_context(&mut out[i..], 0, |b| primitive::encode_object_id(b, dev))?;
        }
        i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_object_id(b, self.object_identifier))?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if object-identifier is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let mut i = 0;
        let mut device_identifier = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 0 {
                let (dev, c) = primitive::decode_context_object_id(&buf[i..], 0)?;
                device_identifier = Some(dev);
                i += c;
            }
        }
        let (object_identifier, c) = primitive::decode_context_object_id(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        i += c;
        Ok((Self { device_identifier, object_identifier }, i))
    }
}

/// `BACnetTimeValue` (clause 21): a time-of-day/value pair used in
/// schedules and trend logs.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeValue {
    /// Time of day this value takes effect.
    pub time: Time,
    /// The value itself (any application-tagged primitive).
    pub value: super::value::AppValue,
}

impl TimeValue {
    /// Encode as an unwrapped sequence: application-tagged time followed
    /// by the application-tagged value (no context wrapper — `TimeValue`
    /// is itself a SEQUENCE, not a CHOICE, so both fields keep their
    /// natural application tags).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_time(out, &self.time)?;
        i += self.value.encode(&mut out[i..])?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// Any [`CodecError`] from decoding the time or value.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (time, mut i) = primitive::decode_time(buf)?;
        let (value, c) = super::value::AppValue::decode(&buf[i..])?;
        i += c;
        Ok((Self { time, value }, i))
    }
}

/// Month field of a [`CalendarEntry::WeekNDay`] day-of-week-in-month rule.
pub use crate::codec::primitive::DayField;
pub use crate::codec::primitive::MonthField;

/// `BACnetWeekNDay` (clause 21): month / week-of-month / day-of-week rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekNDay {
    /// Month 1..=12, or 13/14 for odd/even, or 0xFF for any.
    pub month: u8,
    /// Week of month: 1..=6 (6 = last 7 days), or 0xFF for any.
    pub week_of_month: u8,
    /// ISO weekday, Monday=1..Sunday=7, or 0xFF for any.
    pub day_of_week: u8,
}

impl WeekNDay {
    /// Encode as a 3-octet application-tagged octet string (clause 21
    /// represents `BACnetWeekNDay` on the wire as an OCTET STRING).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        primitive::encode_octet_string(out, &[self.month, self.week_of_month, self.day_of_week])
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::ValueOutOfRange`] if the octet string isn't exactly 3 bytes.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (bytes, consumed) = primitive::decode_octet_string(buf)?;
        if bytes.len() != 3 {
            return Err(CodecError::ValueOutOfRange { what: "week-n-day must be 3 octets" });
        }
        Ok((Self { month: bytes[0], week_of_month: bytes[1], day_of_week: bytes[2] }, consumed))
    }
}

/// `BACnetCalendarEntry` (clause 21): a choice of date, date-range, or
/// week-n-day rule, context-tagged to distinguish the choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarEntry {
    /// A single date.
    Date(Date),
    /// An inclusive date range.
    DateRange {
        /// Range start, inclusive.
        start: Date,
        /// Range end, inclusive.
        end: Date,
    },
    /// A recurring month/week/weekday rule.
    WeekNDay(WeekNDay),
}

impl CalendarEntry {
    /// Encode, context-tagged 0 (date) / 1 (date-range, constructed) / 2 (week-n-day).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            CalendarEntry::Date(d) => primitive::wrap_context(out, 0, |b| primitive::encode_date(b, d)),
            CalendarEntry::DateRange { start, end } => {
                let mut i = encode_opening(out, 1)?;
                i += primitive::encode_date(&mut out[i..], start)?;
                i += primitive::encode_date(&mut out[i..], end)?;
                i += encode_closing(&mut out[i..], 1)?;
                Ok(i)
            }
            CalendarEntry::WeekNDay(w) => primitive::wrap_context(out, 2, |b| w.encode(b)),
        }
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::UnknownTagInSequence`] if the context number is
    /// none of 0/1/2.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let t = primitive::peek_tag(buf)?;
        if t.class != TagClass::Context {
            return Err(CodecError::InvalidTag { expected: "calendar entry choice", got_number: t.number, got_class: t.class });
        }
        match t.number {
            0 => {
                let (d, c) = decode_context_date(buf, 0)?;
                Ok((CalendarEntry::Date(d), c))
            }
            1 => {
                let mut i = expect_opening(buf, 1)?;
                let (start, c) = primitive::decode_date(&buf[i..])?;
                i += c;
                let (end, c) = primitive::decode_date(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 1)?;
                Ok((CalendarEntry::DateRange { start, end }, i))
            }
            2 => {
                let mut i = expect_opening(buf, 2)?;
                let (w, c) = WeekNDay::decode(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 2)?;
                Ok((CalendarEntry::WeekNDay(w), i))
            }
            n => Err(CodecError::UnknownTagInSequence(n)),
        }
    }
}

fn decode_context_date(buf: &[u8], context_number: u8) -> Result<(Date, usize), CodecError> {
    let (t, tag_len) = tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context_number {
        return Err(CodecError::InvalidTag { expected: "context date", got_number: t.number, got_class: t.class });
    }
    if t.value_len() != Some(4) {
        return Err(CodecError::ValueOutOfRange { what: "date length must be 4" });
    }
    if buf.len() < tag_len + 4 {
        return Err(CodecError::Truncated { needed: tag_len + 4, available: buf.len() });
    }
    let raw_year = buf[tag_len];
    let date = Date {
        year: if raw_year == 0xFF { None } else { Some(1900 + u16::from(raw_year)) },
        month: primitive::MonthField::from_wire(buf[tag_len + 1]),
        day: primitive::DayField::from_wire(buf[tag_len + 2]),
        weekday: if buf[tag_len + 3] == 0xFF { None } else { Some(buf[tag_len + 3]) },
    };
    Ok((date, tag_len + 4))
}

/// `BACnetRecipient` (clause 21): either a device object identifier or a
/// raw network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A device, referenced by object identifier.
    Device(ObjectId),
    /// A raw network address (net number + MAC).
    Address(crate::address::Address),
}

impl Recipient {
    /// Encode, context-tagged 0 (device) / 1 (address, constructed:
    /// network-number then mac-address).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            Recipient::Device(id) => primitive::wrap_context(out, 0, |b| primitive::encode_object_id(b, *id)),
            Recipient::Address(addr) => {
                let mut i = encode_opening(out, 1)?;
                i += primitive::wrap_context(&mut out[i..], 0, |b| {
                    primitive::encode_unsigned(b, u64::from(addr.network))
                })?;
                i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_octet_string(b, addr.mac()))?;
                i += encode_closing(&mut out[i..], 1)?;
                Ok(i)
            }
        }
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::UnknownTagInSequence`] if the choice tag is neither 0 nor 1.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let t = primitive::peek_tag(buf)?;
        match (t.class, t.number) {
            (TagClass::Context, 0) => {
                let (id, c) = primitive::decode_context_object_id(buf, 0)?;
                Ok((Recipient::Device(id), c))
            }
            (TagClass::Context, 1) => {
                let mut i = expect_opening(buf, 1)?;
                let (net, c) = primitive::decode_context_unsigned(&buf[i..], 0)?;
                i += c;
                let (mac, c) = primitive::decode_context_octet_string(&buf[i..], 1)?;
                let mac = mac.to_vec();
                i += c;
                i += expect_closing(&buf[i..], 1)?;
                let addr = crate::address::Address::new(net as u16, &mac)
                    .map_err(|_| CodecError::ValueOutOfRange { what: "recipient mac too long" })?;
                Ok((Recipient::Address(addr), i))
            }
            _ => Err(CodecError::UnknownTagInSequence(t.number)),
        }
    }
}

/// `BACnetDestination` (clause 21): a notification-class destination entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Days of the week this destination is active (bit string, Monday..Sunday).
    pub valid_days: (u8, [u8; 1]),
    /// Window start time.
    pub from_time: Time,
    /// Window end time.
    pub to_time: Time,
    /// Who to notify.
    pub recipient: Recipient,
    /// Process identifier the recipient expects in the confirmation.
    pub process_identifier: u32,
    /// Whether confirmed notifications are requested.
    pub issue_confirmed_notifications: bool,
    /// Transition bitmask (to-offnormal/to-fault/to-normal), bit string.
    pub transitions: (u8, [u8; 1]),
}

impl Destination {
    /// Encode as an unwrapped sequence of application-tagged fields,
    /// matching how it appears inside `Recipient_List` array elements.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_bit_string(out, self.valid_days.0, &self.valid_days.1)?;
        i += primitive::encode_time(&mut out[i..], &self.from_time)?;
        i += primitive::encode_time(&mut out[i..], &self.to_time)?;
        i += self.recipient.encode(&mut out[i..])?;
        i += primitive::encode_unsigned(&mut out[i..], u64::from(self.process_identifier))?;
        i += primitive::encode_boolean(&mut out[i..], self.issue_confirmed_notifications)?;
        i += primitive::encode_bit_string(&mut out[i..], self.transitions.0, &self.transitions.1)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// Any [`CodecError`] from decoding a constituent field.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let ((bits, bytes), mut i) = primitive::decode_bit_string(buf)?;
        let mut valid_days = [0u8; 1];
        valid_days[..bytes.len().min(1)].copy_from_slice(&bytes[..bytes.len().min(1)]);
        let valid_days = (bits, valid_days);

        let (from_time, c) = primitive::decode_time(&buf[i..])?;
        i += c;
        let (to_time, c) = primitive::decode_time(&buf[i..])?;
        i += c;
        let (recipient, c) = Recipient::decode(&buf[i..])?;
        i += c;
        let (process_identifier, c) = primitive::decode_unsigned(&buf[i..])?;
        i += c;
        let (issue_confirmed_notifications, c) = primitive::decode_boolean(&buf[i..])?;
        i += c;
        let ((tbits, tbytes), c) = primitive::decode_bit_string(&buf[i..])?;
        i += c;
        let mut transitions = [0u8; 1];
        transitions[..tbytes.len().min(1)].copy_from_slice(&tbytes[..tbytes.len().min(1)]);

        Ok((
            Self {
                valid_days,
                from_time,
                to_time,
                recipient,
                process_identifier: process_identifier as u32,
                issue_confirmed_notifications,
                transitions: (tbits, transitions),
            },
            i,
        ))
    }
}

/// One property request inside a `ReadAccessSpecification` (clause 21).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    /// Which property.
    pub property_identifier: u32,
    /// Array index, if requesting a single element.
    pub property_array_index: Option<u32>,
}

/// `BACnetReadAccessSpecification` (clause 21.1): an object plus the
/// list of properties requested on it, as used by `ReadPropertyMultiple`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccessSpecification {
    /// The object being read.
    pub object_identifier: ObjectId,
    /// Properties requested.
    pub list_of_property_references: Vec<PropertyReference>,
}

impl ReadAccessSpecification {
    /// Encode: object-identifier(0), then a constructed list-of-property-references(1)
    /// containing, for each entry, property-identifier(2) and optional
    /// property-array-index(3).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = 0;
        i += primitive::wrap_context(&mut out[i..], 0, |b| primitive::encode_object_id(b, self.object_identifier))?;
        i += encode_opening(&mut out[i..], 1)?;
        for p in &self.list_of_property_references {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_enumerated(b, p.property_identifier))?;
            if let Some(idx) = p.property_array_index {
                i += primitive::wrap_context(&mut out[i..], 3, |b| primitive::encode_unsigned(b, u64::from(idx)))?;
            }
        }
        i += encode_closing(&mut out[i..], 1)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if the property list is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (object_identifier, mut i) = primitive::decode_context_object_id(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        i += expect_opening(&buf[i..], 1)?;
        let mut list_of_property_references = Vec::new();
        loop {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.is_closing(1) {
                i += expect_closing(&buf[i..], 1)?;
                break;
            }
            let (property_identifier, c) = primitive::decode_context_unsigned(&buf[i..], 2)?;
            i += c;
            let mut property_array_index = None;
            if let Ok(t) = primitive::peek_tag(&buf[i..]) {
                if t.class == TagClass::Context && t.number == 3 {
                    let (idx, c) = primitive::decode_context_unsigned(&buf[i..], 3)?;
                    property_array_index = Some(idx as u32);
                    i += c;
                }
            }
            list_of_property_references
                .push(PropertyReference { property_identifier: property_identifier as u32, property_array_index });
        }
        Ok((Self { object_identifier, list_of_property_references }, i))
    }
}

/// One property's value (or error) inside a `ReadAccessResult` (clause 21.1).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyReadResult {
    /// Successfully read value(s). A single property normally yields one
    /// `AppValue`; array/list properties may yield several.
    Value(Vec<super::value::AppValue>),
    /// The property could not be read (`BACnetError`: class/code pair).
    Error {
        /// BACnet error class.
        error_class: u32,
        /// BACnet error code.
        error_code: u32,
    },
}

/// One object's results inside a `ReadAccessResult` (clause 21.1), as
/// returned by `ReadPropertyMultiple`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult {
    /// The object that was read.
    pub object_identifier: ObjectId,
    /// Per-property results, in request order.
    pub results: Vec<(PropertyReference, PropertyReadResult)>,
}

impl ReadAccessResult {
    /// Encode: object-identifier(0), then constructed
    /// list-of-results(1) of (property-identifier(2),
    /// optional property-array-index(3), constructed
    /// property-value(4) or constructed property-access-error(5)).
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = 0;
        i += primitive::wrap_context(&mut out[i..], 0, |b| primitive::encode_object_id(b, self.object_identifier))?;
        i += encode_opening(&mut out[i..], 1)?;
        for (p, result) in &self.results {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_enumerated(b, p.property_identifier))?;
            if let Some(idx) = p.property_array_index {
                i += primitive::wrap_context(&mut out[i..], 3, |b| primitive::encode_unsigned(b, u64::from(idx)))?;
            }
            match result {
                PropertyReadResult::Value(values) => {
                    i += encode_opening(&mut out[i..], 4)?;
                    for v in values {
                        i += v.encode(&mut out[i..])?;
                    }
                    i += encode_closing(&mut out[i..], 4)?;
                }
                PropertyReadResult::Error { error_class, error_code } => {
                    i += encode_opening(&mut out[i..], 5)?;
                    i += primitive::encode_enumerated(&mut out[i..], *error_class)?;
                    i += primitive::encode_enumerated(&mut out[i..], *error_code)?;
                    i += encode_closing(&mut out[i..], 5)?;
                }
            }
        }
        i += encode_closing(&mut out[i..], 1)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`], [`CodecError::MismatchedClosingTag`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (object_identifier, mut i) = primitive::decode_context_object_id(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("object-identifier"))?;
        i += expect_opening(&buf[i..], 1)?;
        let mut results = Vec::new();
        loop {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.is_closing(1) {
                i += expect_closing(&buf[i..], 1)?;
                break;
            }
            let (property_identifier, c) = primitive::decode_context_unsigned(&buf[i..], 2)?;
            i += c;
            let mut property_array_index = None;
            if let Ok(t) = primitive::peek_tag(&buf[i..]) {
                if t.class == TagClass::Context && t.number == 3 {
                    let (idx, c) = primitive::decode_context_unsigned(&buf[i..], 3)?;
                    property_array_index = Some(idx as u32);
                    i += c;
                }
            }
            let t = primitive::peek_tag(&buf[i..])?;
            let result = if t.is_opening(4) {
                i += expect_opening(&buf[i..], 4)?;
                let mut values = Vec::new();
                loop {
                    let t = primitive::peek_tag(&buf[i..])?;
                    if t.is_closing(4) {
                        i += expect_closing(&buf[i..], 4)?;
                        break;
                    }
                    let (v, c) = super::value::AppValue::decode(&buf[i..])?;
                    values.push(v);
                    i += c;
                }
                PropertyReadResult::Value(values)
            } else if t.is_opening(5) {
                i += expect_opening(&buf[i..], 5)?;
                let (error_class, c) = primitive::decode_enumerated(&buf[i..])?;
                i += c;
                let (error_code, c) = primitive::decode_enumerated(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 5)?;
                PropertyReadResult::Error { error_class, error_code }
            } else {
                return Err(CodecError::UnknownTagInSequence(t.number));
            };
            results.push((PropertyReference { property_identifier: property_identifier as u32, property_array_index }, result));
        }
        Ok((Self { object_identifier, results }, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::value::AppValue;

    #[test]
    fn object_property_reference_round_trips_without_index() {
        let r = ObjectPropertyReference {
            object_identifier: ObjectId::new(8, 1),
            property_identifier: 85,
            property_array_index: None,
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ObjectPropertyReference::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn object_property_reference_round_trips_with_index() {
        let r = ObjectPropertyReference {
            object_identifier: ObjectId::new(0, 3),
            property_identifier: 79,
            property_array_index: Some(2),
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ObjectPropertyReference::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn device_object_reference_round_trips() {
        let r = DeviceObjectReference { device_identifier: Some(ObjectId::new(8, 99)), object_identifier: ObjectId::new(0, 1) };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = DeviceObjectReference::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn time_value_round_trips() {
        let tv = TimeValue { time: Time { hour: Some(8), minute: Some(0), second: Some(0), hundredths: Some(0) }, value: AppValue::Real(21.5) };
        let mut buf = [0u8; 32];
        let n = tv.encode(&mut buf).unwrap();
        let (got, consumed) = TimeValue::decode(&buf[..n]).unwrap();
        assert_eq!(got, tv);
        assert_eq!(consumed, n);
    }

    #[test]
    fn calendar_entry_date_round_trips() {
        let e = CalendarEntry::Date(Date { year: Some(2026), month: primitive::MonthField::Specific(1), day: primitive::DayField::Specific(1), weekday: None });
        let mut buf = [0u8; 32];
        let n = e.encode(&mut buf).unwrap();
        let (got, consumed) = CalendarEntry::decode(&buf[..n]).unwrap();
        assert_eq!(got, e);
        assert_eq!(consumed, n);
    }

    #[test]
    fn calendar_entry_date_range_round_trips() {
        let e = CalendarEntry::DateRange {
            start: Date { year: Some(2026), month: primitive::MonthField::Specific(1), day: primitive::DayField::Specific(1), weekday: None },
            end: Date { year: Some(2026), month: primitive::MonthField::Specific(12), day: primitive::DayField::Last, weekday: None },
        };
        let mut buf = [0u8; 32];
        let n = e.encode(&mut buf).unwrap();
        let (got, consumed) = CalendarEntry::decode(&buf[..n]).unwrap();
        assert_eq!(got, e);
        assert_eq!(consumed, n);
    }

    #[test]
    fn calendar_entry_week_n_day_round_trips() {
        let e = CalendarEntry::WeekNDay(WeekNDay { month: 13, week_of_month: 1, day_of_week: 1 });
        let mut buf = [0u8; 32];
        let n = e.encode(&mut buf).unwrap();
        let (got, consumed) = CalendarEntry::decode(&buf[..n]).unwrap();
        assert_eq!(got, e);
        assert_eq!(consumed, n);
    }

    #[test]
    fn recipient_device_round_trips() {
        let r = Recipient::Device(ObjectId::new(8, 1));
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = Recipient::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn recipient_address_round_trips() {
        let r = Recipient::Address(crate::address::Address::mstp(5));
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = Recipient::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn read_access_specification_round_trips() {
        let spec = ReadAccessSpecification {
            object_identifier: ObjectId::new(8, 1),
            list_of_property_references: vec![
                PropertyReference { property_identifier: 85, property_array_index: None },
                PropertyReference { property_identifier: 79, property_array_index: Some(0) },
            ],
        };
        let mut buf = [0u8; 64];
        let n = spec.encode(&mut buf).unwrap();
        let (got, consumed) = ReadAccessSpecification::decode(&buf[..n]).unwrap();
        assert_eq!(got, spec);
        assert_eq!(consumed, n);
    }

    #[test]
    fn read_access_result_round_trips_value_and_error() {
        let result = ReadAccessResult {
            object_identifier: ObjectId::new(8, 1),
            results: vec![
                (
                    PropertyReference { property_identifier: 85, property_array_index: None },
                    PropertyReadResult::Value(vec![AppValue::Real(21.0)]),
                ),
                (
                    PropertyReference { property_identifier: 28, property_array_index: None },
                    PropertyReadResult::Error { error_class: 2, error_code: 31 },
                ),
            ],
        };
        let mut buf = [0u8; 128];
        let n = result.encode(&mut buf).unwrap();
        let (got, consumed) = ReadAccessResult::decode(&buf[..n]).unwrap();
        assert_eq!(got, result);
        assert_eq!(consumed, n);
    }
}
