//! `ReadRange`: history/array slice access with three
//! selector shapes plus "read everything" when the selector is absent.

use crate::address::ObjectId;
use crate::codec::composite::{encode_closing, encode_opening, expect_closing, expect_opening};
use crate::codec::primitive::{self, Date, Time};
use crate::codec::tag::TagClass;
use crate::codec::value::AppValue;
use crate::error::CodecError;

/// Which slice of a property's history/array to return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeSelector {
    /// By 1-based array/list position. Negative `count` reads backward.
    ByPosition {
        /// 1-based starting index.
        start: u32,
        /// Number of items, negative to read backward from `start`.
        count: i32,
    },
    /// By log-record sequence number.
    BySequence {
        /// Starting sequence number.
        start: u32,
        /// Number of items, negative to read backward from `start`.
        count: i32,
    },
    /// By timestamp.
    ByTime {
        /// Reference date.
        reference_date: Date,
        /// Reference time.
        reference_time: Time,
        /// Number of items, negative to read backward from the reference.
        count: i32,
    },
    /// No selector: return everything.
    ReadAll,
}

/// `ReadRange-Request`: object(0), property(1), optional array-index(2),
/// then the range selector (by-position=3, by-sequence=6, by-time=7;
/// absent entirely means [`RangeSelector::ReadAll`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadRangeRequest {
    /// The object to read from.
    pub object: ObjectId,
    /// Which property (normally `Log_Buffer` or similar).
    pub property: u32,
    /// Array index, if the property is itself an array.
    pub array_index: Option<u32>,
    /// How much of the history/array to return.
    pub selector: RangeSelector,
}

impl ReadRangeRequest {
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
        match self.selector {
            RangeSelector::ReadAll => {}
            RangeSelector::ByPosition { start, count } => {
                i += encode_opening(&mut out[i..], 3)?;
                i += primitive::encode_unsigned(&mut out[i..], u64::from(start))?;
                i += primitive::encode_signed(&mut out[i..], count)?;
                i += encode_closing(&mut out[i..], 3)?;
            }
            RangeSelector::BySequence { start, count } => {
                i += encode_opening(&mut out[i..], 6)?;
                i += primitive::encode_unsigned(&mut out[i..], u64::from(start))?;
                i += primitive::encode_signed(&mut out[i..], count)?;
                i += encode_closing(&mut out[i..], 6)?;
            }
            RangeSelector::ByTime { reference_date, reference_time, count } => {
                i += encode_opening(&mut out[i..], 7)?;
                i += primitive::encode_date(&mut out[i..], &reference_date)?;
                i += primitive::encode_time(&mut out[i..], &reference_time)?;
                i += primitive::encode_signed(&mut out[i..], count)?;
                i += encode_closing(&mut out[i..], 7)?;
            }
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if object/property absent,
    /// [`CodecError::UnknownTagInSequence`] if the selector choice tag is
    /// none of 3/6/7.
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
        let selector = if i >= buf.len() {
            RangeSelector::ReadAll
        } else {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.class != TagClass::Context {
                RangeSelector::ReadAll
            } else {
                match t.number {
                    3 => {
                        i += expect_opening(&buf[i..], 3)?;
                        let (start, c) = primitive::decode_unsigned(&buf[i..])?;
                        i += c;
                        let (count, c) = primitive::decode_signed(&buf[i..])?;
                        i += c;
                        i += expect_closing(&buf[i..], 3)?;
                        RangeSelector::ByPosition { start: start as u32, count }
                    }
                    6 => {
                        i += expect_opening(&buf[i..], 6)?;
                        let (start, c) = primitive::decode_unsigned(&buf[i..])?;
                        i += c;
                        let (count, c) = primitive::decode_signed(&buf[i..])?;
                        i += c;
                        i += expect_closing(&buf[i..], 6)?;
                        RangeSelector::BySequence { start: start as u32, count }
                    }
                    7 => {
                        i += expect_opening(&buf[i..], 7)?;
                        let (reference_date, c) = primitive::decode_date(&buf[i..])?;
                        i += c;
                        let (reference_time, c) = primitive::decode_time(&buf[i..])?;
                        i += c;
                        let (count, c) = primitive::decode_signed(&buf[i..])?;
                        i += c;
                        i += expect_closing(&buf[i..], 7)?;
                        RangeSelector::ByTime { reference_date, reference_time, count }
                    }
                    n => return Err(CodecError::UnknownTagInSequence(n)),
                }
            }
        };
        Ok((Self { object, property: property as u32, array_index, selector }, i))
    }
}

/// `ReadRange-Ack`: header fields, result-flags(3), item-count(4),
/// item-data(5), optional first-sequence-number(6) (present only when
/// `item_count > 0` and the request was `BySequence`/`ByTime`).
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRangeAck {
    /// Echoes the request.
    pub object: ObjectId,
    /// Echoes the request.
    pub property: u32,
    /// Echoes the request.
    pub array_index: Option<u32>,
    /// `(FirstItem, LastItem, MoreItems)`.
    pub result_flags: (bool, bool, bool),
    /// Number of items in `item_data`.
    pub item_count: u32,
    /// The returned items.
    pub item_data: Vec<AppValue>,
    /// Sequence number of the first returned item.
    pub first_sequence_number: Option<u32>,
}

fn result_flags_byte(flags: (bool, bool, bool)) -> [u8; 1] {
    let mut b = 0u8;
    if flags.0 {
        b |= 0x80;
    }
    if flags.1 {
        b |= 0x40;
    }
    if flags.2 {
        b |= 0x20;
    }
    [b]
}

fn result_flags_from_byte(b: u8) -> (bool, bool, bool) {
    (b & 0x80 != 0, b & 0x40 != 0, b & 0x20 != 0)
}

impl ReadRangeAck {
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
        i += primitive::wrap_context(&mut out[i..], 3, |b| {
            primitive::encode_bit_string(b, 3, &result_flags_byte(self.result_flags))
        })?;
        i += primitive::wrap_context(&mut out[i..], 4, |b| primitive::encode_unsigned(b, u64::from(self.item_count)))?;
        i += encode_opening(&mut out[i..], 5)?;
        for v in &self.item_data {
            i += v.encode(&mut out[i..])?;
        }
        i += encode_closing(&mut out[i..], 5)?;
        if let Some(seq) = self.first_sequence_number {
            i += primitive::wrap_context(&mut out[i..], 6, |b| primitive::encode_unsigned(b, u64::from(seq)))?;
        }
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
        let (t, tl) = crate::codec::tag::decode_tag(&buf[i..])?;
        if t.class != TagClass::Context || t.number != 3 {
            return Err(CodecError::MissingRequiredField("result-flags"));
        }
        let flags_len = t.value_len().unwrap_or(0) as usize;
        let flags_byte = if flags_len > 1 { buf[i + tl + 1] } else { 0 };
        let result_flags = result_flags_from_byte(flags_byte);
        i += tl + flags_len;
        let (item_count, c) = primitive::decode_context_unsigned(&buf[i..], 4)
            .map_err(|_| CodecError::MissingRequiredField("item-count"))?;
        i += c;
        i += expect_opening(&buf[i..], 5)?;
        let mut item_data = Vec::new();
        loop {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.is_closing(5) {
                i += expect_closing(&buf[i..], 5)?;
                break;
            }
            let (v, c) = AppValue::decode(&buf[i..])?;
            item_data.push(v);
            i += c;
        }
        let mut first_sequence_number = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 6 {
                let (seq, c) = primitive::decode_context_unsigned(&buf[i..], 6)?;
                first_sequence_number = Some(seq as u32);
                i += c;
            }
        }
        Ok((Self { object, property: property as u32, array_index, result_flags, item_count: item_count as u32, item_data, first_sequence_number }, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_all_when_selector_absent() {
        let r = ReadRangeRequest { object: ObjectId::new(8, 1), property: 131, array_index: None, selector: RangeSelector::ReadAll };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ReadRangeRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn by_position_round_trips_negative_count() {
        let r = ReadRangeRequest {
            object: ObjectId::new(8, 1),
            property: 131,
            array_index: None,
            selector: RangeSelector::ByPosition { start: 10, count: -5 },
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ReadRangeRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn by_time_round_trips() {
        let r = ReadRangeRequest {
            object: ObjectId::new(8, 1),
            property: 131,
            array_index: None,
            selector: RangeSelector::ByTime {
                reference_date: Date { year: Some(2026), month: primitive::MonthField::Specific(1), day: primitive::DayField::Specific(1), weekday: None },
                reference_time: Time { hour: Some(0), minute: Some(0), second: Some(0), hundredths: Some(0) },
                count: 20,
            },
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = ReadRangeRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn result_flags_are_left_justified_in_the_data_octet() {
        assert_eq!(result_flags_byte((true, false, false)), [0x80]);
        assert_eq!(result_flags_byte((false, true, false)), [0x40]);
        assert_eq!(result_flags_byte((false, false, true)), [0x20]);
        assert_eq!(result_flags_byte((true, false, true)), [0xA0]);
        assert_eq!(result_flags_from_byte(0xA0), (true, false, true));
    }

    #[test]
    fn ack_round_trips_with_first_sequence_number() {
        let ack = ReadRangeAck {
            object: ObjectId::new(8, 1),
            property: 131,
            array_index: None,
            result_flags: (true, false, true),
            item_count: 1,
            item_data: vec![AppValue::Real(1.0)],
            first_sequence_number: Some(42),
        };
        let mut buf = [0u8; 64];
        let n = ack.encode(&mut buf).unwrap();
        let (got, consumed) = ReadRangeAck::decode(&buf[..n]).unwrap();
        assert_eq!(got, ack);
        assert_eq!(consumed, n);
    }
}
