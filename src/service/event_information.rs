//! `GetEventInformation`: the confirmed service an operator
//! workstation polls to recover in-alarm/out-of-service events a device
//! holds, without subscribing to COV/event notifications first.

use crate::address::ObjectId;
use crate::codec::composite::{encode_closing, encode_opening, expect_closing, expect_opening};
use crate::codec::primitive::{self, Date, Time};
use crate::codec::tag::TagClass;
use crate::error::CodecError;

/// `BACnetTimeStamp`: a CHOICE of time-of-day, log sequence number, or
/// full date+time, context-tagged 0/1/2 respectively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeStamp {
    /// Time-of-day only, for devices with no calendar.
    Time(Time),
    /// A monotonic log sequence number.
    Sequence(u32),
    /// Full date and time.
    DateTime {
        /// The date half.
        date: Date,
        /// The time half.
        time: Time,
    },
}

/// Decode a context-tagged [`Time`] (4 payload octets), verifying the
/// tag number first. Mirrors `primitive::decode_context_object_id`'s
/// pattern for a fixed-width field this crate doesn't otherwise need
/// context-tagged.
fn decode_context_time(buf: &[u8], context_number: u8) -> Result<(Time, usize), CodecError> {
    let (t, tag_len) = crate::codec::tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context_number {
        return Err(CodecError::InvalidTag { expected: "context time", got_number: t.number, got_class: t.class });
    }
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

impl TimeStamp {
    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            TimeStamp::Time(t) => primitive::wrap_context(out, 0, |b| primitive::encode_time(b, t)),
            TimeStamp::Sequence(n) => primitive::wrap_context(out, 1, |b| primitive::encode_unsigned(b, u64::from(*n))),
            TimeStamp::DateTime { date, time } => {
                let mut i = encode_opening(out, 2)?;
                i += primitive::encode_date(&mut out[i..], date)?;
                i += primitive::encode_time(&mut out[i..], time)?;
                i += encode_closing(&mut out[i..], 2)?;
                Ok(i)
            }
        }
    }

    fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let t = primitive::peek_tag(buf)?;
        if t.class != TagClass::Context {
            return Err(CodecError::InvalidTag { expected: "context", got_number: t.number, got_class: t.class });
        }
        match t.number {
            0 => {
                let (time, i) = decode_context_time(buf, 0)?;
                Ok((TimeStamp::Time(time), i))
            }
            1 => {
                let (n, i) = primitive::decode_context_unsigned(buf, 1)?;
                Ok((TimeStamp::Sequence(n as u32), i))
            }
            2 => {
                let mut i = expect_opening(buf, 2)?;
                let (date, c) = primitive::decode_date(&buf[i..])?;
                i += c;
                let (time, c) = primitive::decode_time(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 2)?;
                Ok((TimeStamp::DateTime { date, time }, i))
            }
            n => Err(CodecError::UnknownTagInSequence(n)),
        }
    }
}

fn encode_flags3(out: &mut [u8], context: u8, flags: [bool; 3]) -> Result<usize, CodecError> {
    let mut byte = 0u8;
    for (idx, set) in flags.iter().enumerate() {
        if *set {
            byte |= 0x80 >> idx;
        }
    }
    primitive::wrap_context(out, context, |b| primitive::encode_bit_string(b, 3, &[byte]))
}

fn decode_flags3(buf: &[u8], context: u8) -> Result<([bool; 3], usize), CodecError> {
    let (t, tag_len) = crate::codec::tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context {
        return Err(CodecError::InvalidTag { expected: "context bitstring", got_number: t.number, got_class: t.class });
    }
    let len = t.value_len().ok_or(CodecError::InvalidTag { expected: "primitive", got_number: t.number, got_class: t.class })? as usize;
    let byte = if len > 1 { buf[tag_len + 1] } else { 0 };
    let flags = [byte & 0x80 != 0, byte & 0x40 != 0, byte & 0x20 != 0];
    Ok((flags, tag_len + len))
}

/// One device's pending event, as returned by `GetEventInformation-Ack`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    /// The object that raised the event.
    pub object: ObjectId,
    /// Its current `BACnetEventState` enumerated value.
    pub event_state: u32,
    /// `[ToOffnormal, ToFault, ToNormal]` acknowledgment flags.
    pub acknowledged_transitions: [bool; 3],
    /// `[ToOffnormal, ToFault, ToNormal]` timestamps, in that order.
    pub event_timestamps: [TimeStamp; 3],
    /// `BACnetNotifyType` (Alarm or Event).
    pub notify_type: u32,
    /// `[ToOffnormal, ToFault, ToNormal]` enable flags.
    pub event_enable: [bool; 3],
    /// `[ToOffnormal, ToFault, ToNormal]` notification priorities.
    pub event_priorities: [u32; 3],
}

impl EventSummary {
    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::wrap_context(out, 0, |b| primitive::encode_object_id(b, self.object))?;
        i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_enumerated(b, self.event_state))?;
        i += encode_flags3(&mut out[i..], 2, self.acknowledged_transitions)?;
        i += encode_opening(&mut out[i..], 3)?;
        for ts in &self.event_timestamps {
            i += ts.encode(&mut out[i..])?;
        }
        i += encode_closing(&mut out[i..], 3)?;
        i += primitive::wrap_context(&mut out[i..], 4, |b| primitive::encode_enumerated(b, self.notify_type))?;
        i += encode_flags3(&mut out[i..], 5, self.event_enable)?;
        i += encode_opening(&mut out[i..], 6)?;
        for p in self.event_priorities {
            i += primitive::encode_unsigned(&mut out[i..], u64::from(p))?;
        }
        i += encode_closing(&mut out[i..], 6)?;
        Ok(i)
    }

    fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (object, mut i) = primitive::decode_context_object_id(buf, 0)
            .map_err(|_| CodecError::MissingRequiredField("objectIdentifier"))?;
        let (event_state, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("eventState"))?;
        i += c;
        let (acknowledged_transitions, c) = decode_flags3(&buf[i..], 2)?;
        i += c;
        i += expect_opening(&buf[i..], 3)?;
        let mut event_timestamps = [TimeStamp::Sequence(0); 3];
        for ts in &mut event_timestamps {
            let (v, c) = TimeStamp::decode(&buf[i..])?;
            *ts = v;
            i += c;
        }
        i += expect_closing(&buf[i..], 3)?;
        let (notify_type, c) = primitive::decode_context_unsigned(&buf[i..], 4)
            .map_err(|_| CodecError::MissingRequiredField("notifyType"))?;
        i += c;
        let (event_enable, c) = decode_flags3(&buf[i..], 5)?;
        i += c;
        i += expect_opening(&buf[i..], 6)?;
        let mut event_priorities = [0u32; 3];
        for p in &mut event_priorities {
            let (v, c) = primitive::decode_unsigned(&buf[i..])?;
            *p = v as u32;
            i += c;
        }
        i += expect_closing(&buf[i..], 6)?;
        Ok((
            Self {
                object,
                event_state: event_state as u32,
                acknowledged_transitions,
                event_timestamps,
                notify_type: notify_type as u32,
                event_enable,
                event_priorities,
            },
            i,
        ))
    }
}

/// `GetEventInformation-Request`: optional `lastReceivedObjectIdentifier`,
/// used to page through a device's event list across several calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetEventInformationRequest {
    /// Resume after this object, if this is not the first page.
    pub last_received_object_identifier: Option<ObjectId>,
}

impl GetEventInformationRequest {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self.last_received_object_identifier {
            None => Ok(0),
            Some(id) => primitive::wrap_context(out, 0, |b| primitive::encode_object_id(b, id)),
        }
    }

    /// Decode. An empty `buf` decodes to `None`.
    ///
    /// # Errors
    /// [`CodecError::InvalidTag`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        if buf.is_empty() {
            return Ok((Self { last_received_object_identifier: None }, 0));
        }
        let (id, i) = primitive::decode_context_object_id(buf, 0)?;
        Ok((Self { last_received_object_identifier: Some(id) }, i))
    }
}

/// `GetEventInformation-Ack`: opening[0], the summary list, closing[0],
/// then `more-events`[1].
#[derive(Debug, Clone, PartialEq)]
pub struct GetEventInformationAck {
    /// One entry per object currently reporting a non-normal or
    /// unacknowledged event.
    pub list_of_event_summaries: Vec<EventSummary>,
    /// True if another `GetEventInformation-Request` with
    /// `last_received_object_identifier` set to this ack's last entry
    /// would return more.
    pub more_events: bool,
}

impl GetEventInformationAck {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = encode_opening(out, 0)?;
        for summary in &self.list_of_event_summaries {
            i += summary.encode(&mut out[i..])?;
        }
        i += encode_closing(&mut out[i..], 0)?;
        i += encode_context_boolean(&mut out[i..], 1, self.more_events)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if `more-events` is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let mut i = expect_opening(buf, 0)?;
        let mut list_of_event_summaries = Vec::new();
        loop {
            let t = primitive::peek_tag(&buf[i..])?;
            if t.is_closing(0) {
                break;
            }
            let (summary, c) = EventSummary::decode(&buf[i..])?;
            list_of_event_summaries.push(summary);
            i += c;
        }
        i += expect_closing(&buf[i..], 0)?;
        let (more_events, c) =
            decode_context_boolean(&buf[i..], 1).map_err(|_| CodecError::MissingRequiredField("moreEvents"))?;
        i += c;
        Ok((Self { list_of_event_summaries, more_events }, i))
    }
}

/// Encode a context-tagged boolean as one payload octet (0 or 1), the
/// form `BACnetTimeStamp`'s sibling fields use elsewhere in this clause —
/// unlike the application-tagged form, the value isn't folded into LVT.
fn encode_context_boolean(out: &mut [u8], context_number: u8, value: bool) -> Result<usize, CodecError> {
    let tag_len =
        crate::codec::tag::encode_tag(out, context_number, TagClass::Context, crate::codec::tag::TagLength::Value(1))?;
    if out.len() < tag_len + 1 {
        return Err(CodecError::BufferTooSmall { needed: tag_len + 1, available: out.len() });
    }
    out[tag_len] = u8::from(value);
    Ok(tag_len + 1)
}

/// Decode a context-tagged boolean encoded by [`encode_context_boolean`].
fn decode_context_boolean(buf: &[u8], context_number: u8) -> Result<(bool, usize), CodecError> {
    let (t, tag_len) = crate::codec::tag::decode_tag(buf)?;
    if t.class != TagClass::Context || t.number != context_number {
        return Err(CodecError::InvalidTag { expected: "context boolean", got_number: t.number, got_class: t.class });
    }
    let len = t.value_len().unwrap_or(0) as usize;
    if buf.len() < tag_len + len {
        return Err(CodecError::Truncated { needed: tag_len + len, available: buf.len() });
    }
    let value = len > 0 && buf[tag_len] != 0;
    Ok((value, tag_len + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> EventSummary {
        EventSummary {
            object: ObjectId::new(0, 3),
            event_state: 1,
            acknowledged_transitions: [true, false, false],
            event_timestamps: [
                TimeStamp::Sequence(10),
                TimeStamp::Sequence(11),
                TimeStamp::DateTime {
                    date: Date { year: Some(2026), month: primitive::MonthField::Specific(1), day: primitive::DayField::Specific(1), weekday: None },
                    time: Time { hour: Some(12), minute: Some(0), second: Some(0), hundredths: Some(0) },
                },
            ],
            notify_type: 0,
            event_enable: [true, true, true],
            event_priorities: [100, 100, 200],
        }
    }

    #[test]
    fn request_with_no_resume_point_encodes_empty() {
        let r = GetEventInformationRequest { last_received_object_identifier: None };
        let mut buf = [0u8; 8];
        let n = r.encode(&mut buf).unwrap();
        assert_eq!(n, 0);
        let (got, consumed) = GetEventInformationRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn request_with_resume_point_round_trips() {
        let r = GetEventInformationRequest { last_received_object_identifier: Some(ObjectId::new(0, 3)) };
        let mut buf = [0u8; 16];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = GetEventInformationRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn ack_round_trips_one_summary_and_more_events() {
        let ack = GetEventInformationAck { list_of_event_summaries: vec![sample_summary()], more_events: true };
        let mut buf = [0u8; 256];
        let n = ack.encode(&mut buf).unwrap();
        let (got, consumed) = GetEventInformationAck::decode(&buf[..n]).unwrap();
        assert_eq!(got, ack);
        assert_eq!(consumed, n);
    }

    #[test]
    fn ack_round_trips_empty_list() {
        let ack = GetEventInformationAck { list_of_event_summaries: vec![], more_events: false };
        let mut buf = [0u8; 16];
        let n = ack.encode(&mut buf).unwrap();
        let (got, consumed) = GetEventInformationAck::decode(&buf[..n]).unwrap();
        assert_eq!(got, ack);
        assert_eq!(consumed, n);
    }
}
