//! `AppValue`: a tagged union over every application-tagged primitive,
//! used wherever a service carries an untyped "any primitive" field
//! (e.g. `WriteProperty`'s value, `ConfirmedPrivateTransfer`'s block).

use crate::address::ObjectId;
use crate::codec::primitive::{
    self, ApplicationTagNumber, Date, Time,
};
use crate::codec::tag::{self, TagClass};
use crate::error::CodecError;

/// One application-tagged primitive value, dispatched by tag number.
#[derive(Debug, Clone, PartialEq)]
pub enum AppValue {
    /// Null.
    Null,
    /// Boolean.
    Boolean(bool),
    /// Unsigned integer.
    Unsigned(u64),
    /// Signed integer.
    Signed(i32),
    /// IEEE-754 single precision.
    Real(f32),
    /// IEEE-754 double precision.
    Double(f64),
    /// Raw octet string.
    OctetString(Vec<u8>),
    /// Character string: encoding octet plus raw bytes.
    CharacterString(u8, Vec<u8>),
    /// Bit string: bits used plus backing bytes.
    BitString(u8, Vec<u8>),
    /// Enumerated value.
    Enumerated(u32),
    /// Calendar date.
    Date(Date),
    /// Time of day.
    Time(Time),
    /// Object identifier.
    ObjectId(ObjectId),
}

impl AppValue {
    /// Encode this value, application-tagged, into `out`.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            AppValue::Null => primitive::encode_null(out),
            AppValue::Boolean(v) => primitive::encode_boolean(out, *v),
            AppValue::Unsigned(v) => primitive::encode_unsigned(out, *v),
            AppValue::Signed(v) => primitive::encode_signed(out, *v),
            AppValue::Real(v) => primitive::encode_real(out, *v),
            AppValue::Double(v) => primitive::encode_double(out, *v),
            AppValue::OctetString(v) => primitive::encode_octet_string(out, v),
            AppValue::CharacterString(enc, v) => primitive::encode_character_string(out, *enc, v),
            AppValue::BitString(bits_used, v) => primitive::encode_bit_string(out, *bits_used, v),
            AppValue::Enumerated(v) => primitive::encode_enumerated(out, *v),
            AppValue::Date(v) => primitive::encode_date(out, v),
            AppValue::Time(v) => primitive::encode_time(out, v),
            AppValue::ObjectId(v) => primitive::encode_object_id(out, *v),
        }
    }

    /// Decode one application-tagged primitive from the front of `buf`,
    /// dispatching on its tag number.
    ///
    /// # Errors
    /// [`CodecError::Truncated`] if `buf` is empty or ends mid-value.
    /// [`CodecError::UnknownTagInSequence`] if the tag number isn't one of
    /// the twelve application types.
    pub fn decode(buf: &[u8]) -> Result<(AppValue, usize), CodecError> {
        let (t, _) = tag::decode_tag(buf)?;
        if t.class != TagClass::Application {
            return Err(CodecError::InvalidTag {
                expected: "application-tagged value",
                got_number: t.number,
                got_class: t.class,
            });
        }
        match t.number {
            n if n == ApplicationTagNumber::Null as u8 => {
                let (_, c) = primitive::decode_null(buf)?;
                Ok((AppValue::Null, c))
            }
            n if n == ApplicationTagNumber::Boolean as u8 => {
                let (v, c) = primitive::decode_boolean(buf)?;
                Ok((AppValue::Boolean(v), c))
            }
            n if n == ApplicationTagNumber::UnsignedInt as u8 => {
                let (v, c) = primitive::decode_unsigned(buf)?;
                Ok((AppValue::Unsigned(v), c))
            }
            n if n == ApplicationTagNumber::SignedInt as u8 => {
                let (v, c) = primitive::decode_signed(buf)?;
                Ok((AppValue::Signed(v), c))
            }
            n if n == ApplicationTagNumber::Real as u8 => {
                let (v, c) = primitive::decode_real(buf)?;
                Ok((AppValue::Real(v), c))
            }
            n if n == ApplicationTagNumber::Double as u8 => {
                let (v, c) = primitive::decode_double(buf)?;
                Ok((AppValue::Double(v), c))
            }
            n if n == ApplicationTagNumber::OctetString as u8 => {
                let (v, c) = primitive::decode_octet_string(buf)?;
                Ok((AppValue::OctetString(v.to_vec()), c))
            }
            n if n == ApplicationTagNumber::CharacterString as u8 => {
                let ((enc, bytes), c) = primitive::decode_character_string(buf)?;
                Ok((AppValue::CharacterString(enc, bytes.to_vec()), c))
            }
            n if n == ApplicationTagNumber::BitString as u8 => {
                let ((bits_used, bytes), c) = primitive::decode_bit_string(buf)?;
                Ok((AppValue::BitString(bits_used, bytes.to_vec()), c))
            }
            n if n == ApplicationTagNumber::Enumerated as u8 => {
                let (v, c) = primitive::decode_enumerated(buf)?;
                Ok((AppValue::Enumerated(v), c))
            }
            n if n == ApplicationTagNumber::Date as u8 => {
                let (v, c) = primitive::decode_date(buf)?;
                Ok((AppValue::Date(v), c))
            }
            n if n == ApplicationTagNumber::Time as u8 => {
                let (v, c) = primitive::decode_time(buf)?;
                Ok((AppValue::Time(v), c))
            }
            n if n == ApplicationTagNumber::ObjectId as u8 => {
                let (v, c) = primitive::decode_object_id(buf)?;
                Ok((AppValue::ObjectId(v), c))
            }
            n => Err(CodecError::UnknownTagInSequence(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: AppValue) {
        let mut buf = [0u8; 32];
        let n = v.encode(&mut buf).unwrap();
        let (got, consumed) = AppValue::decode(&buf[..n]).unwrap();
        assert_eq!(got, v);
        assert_eq!(consumed, n);
    }

    #[test]
    fn every_variant_round_trips() {
        round_trip(AppValue::Null);
        round_trip(AppValue::Boolean(true));
        round_trip(AppValue::Unsigned(70_000));
        round_trip(AppValue::Signed(-1));
        round_trip(AppValue::Real(1.25));
        round_trip(AppValue::Double(-9.5));
        round_trip(AppValue::OctetString(vec![1, 2, 3]));
        round_trip(AppValue::CharacterString(0, b"hi".to_vec()));
        round_trip(AppValue::BitString(3, vec![0b1110_0000]));
        round_trip(AppValue::Enumerated(4));
        round_trip(AppValue::ObjectId(ObjectId::new(8, 1)));
    }

    #[test]
    fn unknown_application_tag_is_reported() {
        // Tag number 15 doesn't correspond to any application type.
        let mut buf = [0u8; 4];
        let n = tag::encode_tag(&mut buf, 15, TagClass::Application, tag::TagLength::Value(0)).unwrap();
        let err = AppValue::decode(&buf[..n]).unwrap_err();
        assert_eq!(err, CodecError::UnknownTagInSequence(15));
    }
}
