//! `TimeSynchronization` / `UTCTimeSynchronization`: both
//! services share the same wire shape, application-tagged date then
//! time; only the service choice distinguishes local from UTC.

use crate::codec::primitive::{self, Date, Time};
use crate::error::CodecError;

/// A synchronization message: calendar date plus time of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSynchronization {
    /// The date to set.
    pub date: Date,
    /// The time to set.
    pub time: Time,
}

impl TimeSynchronization {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_date(out, &self.date)?;
        i += primitive::encode_time(&mut out[i..], &self.time)?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::Truncated`], [`CodecError::InvalidTag`],
    /// [`CodecError::ValueOutOfRange`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (date, mut i) = primitive::decode_date(buf)?;
        let (time, c) = primitive::decode_time(&buf[i..])?;
        i += c;
        Ok((Self { date, time }, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::primitive::{DayField, MonthField};

    #[test]
    fn round_trips() {
        let ts = TimeSynchronization {
            date: Date { year: Some(2026), month: MonthField::Specific(7), day: DayField::Specific(28), weekday: Some(2) },
            time: Time { hour: Some(13), minute: Some(30), second: Some(0), hundredths: Some(0) },
        };
        let mut buf = [0u8; 16];
        let n = ts.encode(&mut buf).unwrap();
        let (got, consumed) = TimeSynchronization::decode(&buf[..n]).unwrap();
        assert_eq!(got, ts);
        assert_eq!(consumed, n);
    }

    #[test]
    fn wildcards_round_trip() {
        let ts = TimeSynchronization {
            date: Date { year: None, month: MonthField::Any, day: DayField::Any, weekday: None },
            time: Time { hour: Some(0), minute: Some(0), second: None, hundredths: None },
        };
        let mut buf = [0u8; 16];
        let n = ts.encode(&mut buf).unwrap();
        let (got, _) = TimeSynchronization::decode(&buf[..n]).unwrap();
        assert_eq!(got, ts);
    }
}
