//! ASCII textual forms for human display and configuration files.
//!
//! These are intentionally simple hand-rolled parsers, not a general
//! grammar: the wire encoders remain the single source of truth and
//! these forms exist only so a config file or log line can name a
//! [`Recipient`](super::composite::Recipient) or
//! [`Destination`](super::composite::Destination) without going through
//! binary APDU bytes.

use crate::address::{Address, ObjectId};
use crate::codec::composite::{Destination, Recipient};
use crate::codec::primitive::Time;
use crate::error::CodecError;

/// Format a [`Recipient`] as `Device(type=T,instance=I)` or
/// `Address(net=N,mac=H:H:H)`.
#[must_use]
pub fn format_recipient(r: &Recipient) -> String {
    match r {
        Recipient::Device(id) => format!("Device(type={},instance={})", id.object_type(), id.instance()),
        Recipient::Address(addr) => {
            let mac = addr.mac().iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":");
            format!("Address(net={},mac={})", addr.network, mac)
        }
    }
}

/// Parse a [`Recipient`] from its ASCII textual form.
///
/// # Errors
/// [`CodecError::MalformedAscii`] if the text doesn't match either shape.
pub fn parse_recipient(text: &str) -> Result<Recipient, CodecError> {
    let text = text.trim();
    if let Some(inner) = strip_wrapper(text, "Device") {
        let fields = parse_fields(inner)?;
        let object_type = field_u16(&fields, "type")?;
        let instance = field_u32(&fields, "instance")?;
        return Ok(Recipient::Device(ObjectId::new(object_type, instance)));
    }
    if let Some(inner) = strip_wrapper(text, "Address") {
        let fields = parse_fields(inner)?;
        let net = field_u16(&fields, "net")?;
        let mac_str = fields
            .iter()
            .find(|(k, _)| *k == "mac")
            .map(|(_, v)| *v)
            .ok_or_else(|| CodecError::MalformedAscii("missing mac= field".to_string()))?;
        let mac = parse_hex_mac(mac_str)?;
        let addr = Address::new(net, &mac)
            .map_err(|_| CodecError::MalformedAscii("mac too long for an Address".to_string()))?;
        return Ok(Recipient::Address(addr));
    }
    Err(CodecError::MalformedAscii(format!("unrecognized recipient form: {text}")))
}

/// Format a [`Destination`] as the `(ValidDays=...;FromTime=...;...)` form.
#[must_use]
pub fn format_destination(d: &Destination) -> String {
    let days: Vec<String> = (1..=7u8)
        .filter(|n| {
            let byte_idx = ((n - 1) / 8) as usize;
            let bit = 7 - ((n - 1) % 8);
            byte_idx < d.valid_days.1.len() && d.valid_days.1[byte_idx] & (1 << bit) != 0
        })
        .map(|n| n.to_string())
        .collect();
    let transitions: Vec<String> = (0..3u8)
        .filter(|n| {
            let byte_idx = (n / 8) as usize;
            let bit = 7 - (n % 8);
            byte_idx < d.transitions.1.len() && d.transitions.1[byte_idx] & (1 << bit) != 0
        })
        .map(|n| n.to_string())
        .collect();
    format!(
        "(ValidDays=[{}];FromTime={};ToTime={};Recipient={};ProcessIdentifier={};ConfirmedNotify={};Transitions=[{}])",
        days.join(","),
        format_time(&d.from_time),
        format_time(&d.to_time),
        format_recipient(&d.recipient),
        d.process_identifier,
        d.issue_confirmed_notifications,
        transitions.join(","),
    )
}

/// Parse a [`Destination`] from its ASCII textual form.
///
/// # Errors
/// [`CodecError::MalformedAscii`] if any field is missing or malformed.
pub fn parse_destination(text: &str) -> Result<Destination, CodecError> {
    let text = text.trim();
    let inner = text
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| CodecError::MalformedAscii("destination must be wrapped in ( )".to_string()))?;
    let fields = parse_fields(inner)?;
    let get = |key: &str| -> Result<&str, CodecError> {
        fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| CodecError::MalformedAscii(format!("missing {key}= field")))
    };

    let valid_days = parse_day_set(get("ValidDays")?)?;
    let from_time = parse_time(get("FromTime")?)?;
    let to_time = parse_time(get("ToTime")?)?;
    let recipient = parse_recipient(get("Recipient")?)?;
    let process_identifier: u32 = get("ProcessIdentifier")?
        .parse()
        .map_err(|_| CodecError::MalformedAscii("bad ProcessIdentifier".to_string()))?;
    let issue_confirmed_notifications: bool = get("ConfirmedNotify")?
        .parse()
        .map_err(|_| CodecError::MalformedAscii("bad ConfirmedNotify".to_string()))?;
    let transitions = parse_transition_set(get("Transitions")?)?;

    Ok(Destination {
        valid_days,
        from_time,
        to_time,
        recipient,
        process_identifier,
        issue_confirmed_notifications,
        transitions,
    })
}

fn format_time(t: &Time) -> String {
    let f = |v: Option<u8>| v.map_or("**".to_string(), |x| format!("{x:02}"));
    format!("{}:{}:{}.{}", f(t.hour), f(t.minute), f(t.second), f(t.hundredths))
}

fn parse_time(text: &str) -> Result<Time, CodecError> {
    let parts: Vec<&str> = text.splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err(CodecError::MalformedAscii(format!("bad time: {text}")));
    }
    let sec_parts: Vec<&str> = parts[2].splitn(2, '.').collect();
    let field = |s: &str| -> Result<Option<u8>, CodecError> {
        if s == "**" {
            Ok(None)
        } else {
            s.parse().map(Some).map_err(|_| CodecError::MalformedAscii(format!("bad time field: {s}")))
        }
    };
    Ok(Time {
        hour: field(parts[0])?,
        minute: field(parts[1])?,
        second: field(sec_parts[0])?,
        hundredths: if sec_parts.len() == 2 { field(sec_parts[1])? } else { None },
    })
}

fn parse_day_set(text: &str) -> Result<(u8, [u8; 1]), CodecError> {
    let days = parse_int_list(text)?;
    let mut byte = 0u8;
    let mut max_day = 0u8;
    for d in &days {
        if *d == 0 || *d > 7 {
            return Err(CodecError::MalformedAscii(format!("day out of range: {d}")));
        }
        byte |= 1 << (7 - (d - 1));
        max_day = max_day.max(*d);
    }
    Ok((max_day.max(if days.is_empty() { 0 } else { 7 }), [byte]))
}

fn parse_transition_set(text: &str) -> Result<(u8, [u8; 1]), CodecError> {
    let values = parse_int_list(text)?;
    let mut byte = 0u8;
    for v in &values {
        if *v > 2 {
            return Err(CodecError::MalformedAscii(format!("transition out of range: {v}")));
        }
        byte |= 1 << (7 - v);
    }
    Ok((3, [byte]))
}

fn parse_int_list(text: &str) -> Result<Vec<u8>, CodecError> {
    let inner = text
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| CodecError::MalformedAscii(format!("expected [..]: {text}")))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|s| s.trim().parse::<u8>().map_err(|_| CodecError::MalformedAscii(format!("bad integer: {s}"))))
        .collect()
}

fn strip_wrapper<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')
}

fn parse_fields(inner: &str) -> Result<Vec<(&str, &str)>, CodecError> {
    inner
        .split(';')
        .map(|kv| {
            let mut it = kv.splitn(2, '=');
            let k = it.next().unwrap_or("").trim();
            let v = it.next().ok_or_else(|| CodecError::MalformedAscii(format!("missing '=' in: {kv}")))?.trim();
            Ok((k, v))
        })
        .collect()
}

fn field_u16(fields: &[(&str, &str)], key: &str) -> Result<u16, CodecError> {
    fields
        .iter()
        .find(|(k, _)| *k == key)
        .ok_or_else(|| CodecError::MalformedAscii(format!("missing {key}= field")))?
        .1
        .parse()
        .map_err(|_| CodecError::MalformedAscii(format!("bad {key} value")))
}

fn field_u32(fields: &[(&str, &str)], key: &str) -> Result<u32, CodecError> {
    fields
        .iter()
        .find(|(k, _)| *k == key)
        .ok_or_else(|| CodecError::MalformedAscii(format!("missing {key}= field")))?
        .1
        .parse()
        .map_err(|_| CodecError::MalformedAscii(format!("bad {key} value")))
}

fn parse_hex_mac(text: &str) -> Result<Vec<u8>, CodecError> {
    text.split(':')
        .map(|h| u8::from_str_radix(h, 16).map_err(|_| CodecError::MalformedAscii(format!("bad hex octet: {h}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_device_round_trips_ascii() {
        let r = Recipient::Device(ObjectId::new(8, 1));
        let text = format_recipient(&r);
        assert_eq!(parse_recipient(&text).unwrap(), r);
    }

    #[test]
    fn recipient_address_round_trips_ascii() {
        let r = Recipient::Address(Address::mstp(42));
        let text = format_recipient(&r);
        assert_eq!(parse_recipient(&text).unwrap(), r);
    }

    #[test]
    fn destination_round_trips_ascii() {
        let d = Destination {
            valid_days: (7, [0b1111_1110]),
            from_time: Time { hour: Some(8), minute: Some(0), second: Some(0), hundredths: Some(0) },
            to_time: Time { hour: Some(17), minute: Some(0), second: Some(0), hundredths: Some(0) },
            recipient: Recipient::Device(ObjectId::new(8, 1)),
            process_identifier: 1,
            issue_confirmed_notifications: true,
            transitions: (3, [0b1110_0000]),
        };
        let text = format_destination(&d);
        let got = parse_destination(&text).unwrap();
        assert_eq!(got, d);
    }

    #[test]
    fn malformed_recipient_is_rejected() {
        assert!(parse_recipient("Bogus(x=1)").is_err());
    }
}
