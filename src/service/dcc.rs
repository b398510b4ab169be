//! `DeviceCommunicationControl`.

use crate::codec::primitive;
use crate::codec::tag::TagClass;
use crate::error::CodecError;

/// `BACnetEnableDisable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DccState {
    /// Resume normal communication. Duration is always 0.
    Enable,
    /// Suspend communication for the given duration (or indefinitely).
    Disable,
    /// Suspend communication but still accept `DeviceCommunicationControl` itself.
    DisableInitiation,
}

impl DccState {
    fn to_wire(self) -> u32 {
        match self {
            DccState::Enable => 0,
            DccState::Disable => 1,
            DccState::DisableInitiation => 2,
        }
    }

    fn from_wire(v: u32) -> Result<Self, CodecError> {
        match v {
            0 => Ok(DccState::Enable),
            1 => Ok(DccState::Disable),
            2 => Ok(DccState::DisableInitiation),
            _ => Err(CodecError::ValueOutOfRange { what: "DCC state must be 0..=2" }),
        }
    }
}

/// `DeviceCommunicationControl-Request`: optional duration(0), state(1),
/// optional password(2). `state == Enable` forces `time_duration` to
/// `None` on encode; the standard has no indefinite-enable concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommunicationControl {
    /// Minutes to remain disabled. `None` means indefinitely.
    pub time_duration: Option<u16>,
    /// The requested state.
    pub state: DccState,
    /// Password, 1..20 characters, required if the device has one configured.
    pub password: Option<Vec<u8>>,
}

impl DeviceCommunicationControl {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`], [`CodecError::ValueOutOfRange`] if
    /// `password` is present but not 1..=20 bytes.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        if let Some(pw) = &self.password {
            if !(1..=20).contains(&pw.len()) {
                return Err(CodecError::ValueOutOfRange { what: "DCC password must be 1..=20 characters" });
            }
        }
        let mut i = 0;
        if self.state != DccState::Enable {
            if let Some(d) = self.time_duration {
                i += primitive::wrap_context(&mut out[i..], 0, |b| primitive::encode_unsigned(b, u64::from(d)))?;
            }
        }
        i += primitive::wrap_context(&mut out[i..], 1, |b| primitive::encode_enumerated(b, self.state.to_wire()))?;
        if let Some(pw) = &self.password {
            i += primitive::wrap_context(&mut out[i..], 2, |b| primitive::encode_character_string(b, 0, pw))?;
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::MissingRequiredField`] if `state` is absent.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let mut i = 0;
        let mut time_duration = None;
        if let Ok(t) = primitive::peek_tag(buf) {
            if t.class == TagClass::Context && t.number == 0 {
                let (d, c) = primitive::decode_context_unsigned(buf, 0)?;
                time_duration = Some(d as u16);
                i += c;
            }
        }
        let (state_raw, c) = primitive::decode_context_unsigned(&buf[i..], 1)
            .map_err(|_| CodecError::MissingRequiredField("enable/disable"))?;
        i += c;
        let state = DccState::from_wire(state_raw as u32)?;
        let mut password = None;
        if let Ok(t) = primitive::peek_tag(&buf[i..]) {
            if t.class == TagClass::Context && t.number == 2 {
                let (t, tag_len) = crate::codec::tag::decode_tag(&buf[i..])?;
                let len = t.value_len().unwrap_or(0) as usize;
                let bytes = buf[i + tag_len + 1..i + tag_len + len].to_vec();
                password = Some(bytes);
                i += tag_len + len;
            }
        }
        if state == DccState::Enable {
            return Ok((Self { time_duration: None, state, password }, i));
        }
        Ok((Self { time_duration, state, password }, i))
    }
}

/// `Error-Class: security` (ANSI/ASHRAE 135 clause 21, table 21-1).
pub const ERROR_CLASS_SECURITY: u32 = 7;
/// `Error-Code: password-failure`.
pub const ERROR_CODE_PASSWORD_FAILURE: u32 = 50;

/// Check a `DeviceCommunicationControl-Request`'s optional password
/// against the locally configured one: a device
/// with no password configured accepts any request, password supplied
/// or not; a device with one configured requires an exact match.
#[must_use]
pub fn check_password(configured: Option<&[u8]>, supplied: Option<&[u8]>) -> bool {
    match configured {
        None => true,
        Some(want) => supplied == Some(want),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_checks_match_scenario_5() {
        assert!(check_password(Some(b"valid"), Some(b"valid")));
        assert!(!check_password(Some(b"valid"), Some(b"invalid")));
        assert!(check_password(None, Some(b"valid")));
        assert!(check_password(None, None));
        assert!(!check_password(Some(b"valid"), None));
    }

    #[test]
    fn disable_with_duration_and_password_round_trips() {
        let r = DeviceCommunicationControl {
            time_duration: Some(60),
            state: DccState::Disable,
            password: Some(b"valid".to_vec()),
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = DeviceCommunicationControl::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn enable_forces_duration_none() {
        let r = DeviceCommunicationControl { time_duration: Some(60), state: DccState::Enable, password: None };
        let mut buf = [0u8; 16];
        let n = r.encode(&mut buf).unwrap();
        let (got, _) = DeviceCommunicationControl::decode(&buf[..n]).unwrap();
        assert_eq!(got.time_duration, None);
        assert_eq!(got.state, DccState::Enable);
    }

    #[test]
    fn rejects_empty_password() {
        let r = DeviceCommunicationControl { time_duration: None, state: DccState::Disable, password: Some(Vec::new()) };
        let mut buf = [0u8; 16];
        assert!(r.encode(&mut buf).is_err());
    }
}
