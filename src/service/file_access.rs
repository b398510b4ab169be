//! `AtomicReadFile` / `AtomicWriteFile`: stream- or
//! record-access to a File object, chosen by a CHOICE tag rather than a
//! flag, since stream and record access carry different field shapes.

use crate::address::ObjectId;
use crate::codec::composite::{encode_closing, encode_opening, expect_closing, expect_opening};
use crate::codec::primitive;
use crate::codec::tag::TagClass;
use crate::error::CodecError;

/// Which access method a file request/ack uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAccess {
    /// Byte-offset access: context tag 0, `(start_position, requested_octet_count)`.
    Stream {
        /// Byte offset into the file.
        start_position: i32,
        /// Number of bytes requested (request) or present (ack).
        count: u32,
    },
    /// Record-number access: context tag 1, `(start_record, requested_record_count)`.
    Record {
        /// Starting record number.
        start_record: i32,
        /// Number of records requested (request) or present (ack).
        count: u32,
    },
}

impl FileAccess {
    fn encode_request(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            FileAccess::Stream { start_position, count } => {
                let mut i = encode_opening(out, 0)?;
                i += primitive::encode_signed(&mut out[i..], *start_position)?;
                i += primitive::encode_unsigned(&mut out[i..], u64::from(*count))?;
                i += encode_closing(&mut out[i..], 0)?;
                Ok(i)
            }
            FileAccess::Record { start_record, count } => {
                let mut i = encode_opening(out, 1)?;
                i += primitive::encode_signed(&mut out[i..], *start_record)?;
                i += primitive::encode_unsigned(&mut out[i..], u64::from(*count))?;
                i += encode_closing(&mut out[i..], 1)?;
                Ok(i)
            }
        }
    }

    fn decode_request(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let t = primitive::peek_tag(buf)?;
        match (t.class, t.number) {
            (TagClass::Context, 0) => {
                let mut i = expect_opening(buf, 0)?;
                let (start_position, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                let (count, c) = primitive::decode_unsigned(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 0)?;
                Ok((FileAccess::Stream { start_position, count: count as u32 }, i))
            }
            (TagClass::Context, 1) => {
                let mut i = expect_opening(buf, 1)?;
                let (start_record, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                let (count, c) = primitive::decode_unsigned(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 1)?;
                Ok((FileAccess::Record { start_record, count: count as u32 }, i))
            }
            _ => Err(CodecError::UnknownTagInSequence(t.number)),
        }
    }
}

/// `AtomicReadFile-Request`: the file object plus an access selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicReadFileRequest {
    /// The File object to read from.
    pub file: ObjectId,
    /// Stream or record access, and the requested range.
    pub access: FileAccess,
}

impl AtomicReadFileRequest {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_object_id(out, self.file)?;
        i += self.access.encode_request(&mut out[i..])?;
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::InvalidTag`], [`CodecError::UnknownTagInSequence`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (file, mut i) = primitive::decode_object_id(buf)?;
        let (access, c) = FileAccess::decode_request(&buf[i..])?;
        i += c;
        Ok((Self { file, access }, i))
    }
}

/// `AtomicReadFile-Ack` result: `end_of_file` plus the returned data,
/// shaped according to the request's access method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAccessResult {
    /// Stream result: `(file_start_position, file_data)`.
    Stream {
        /// Offset the returned data starts at.
        file_start_position: i32,
        /// The returned bytes.
        file_data: Vec<u8>,
    },
    /// Record result: `(file_start_record, record_count, file_records)`,
    /// each record a separate octet string.
    Record {
        /// Record number the returned data starts at.
        file_start_record: i32,
        /// Number of records returned.
        record_count: u32,
        /// The returned records.
        file_records: Vec<Vec<u8>>,
    },
}

/// `AtomicReadFile-Ack`: `end-of-file`(app bool) then the access result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicReadFileAck {
    /// True if the returned range reaches the end of the file.
    pub end_of_file: bool,
    /// The returned data.
    pub result: FileAccessResult,
}

impl AtomicReadFileAck {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_boolean(out, self.end_of_file)?;
        match &self.result {
            FileAccessResult::Stream { file_start_position, file_data } => {
                i += encode_opening(&mut out[i..], 0)?;
                i += primitive::encode_signed(&mut out[i..], *file_start_position)?;
                i += primitive::encode_octet_string(&mut out[i..], file_data)?;
                i += encode_closing(&mut out[i..], 0)?;
            }
            FileAccessResult::Record { file_start_record, record_count, file_records } => {
                i += encode_opening(&mut out[i..], 1)?;
                i += primitive::encode_signed(&mut out[i..], *file_start_record)?;
                i += primitive::encode_unsigned(&mut out[i..], u64::from(*record_count))?;
                for rec in file_records {
                    i += primitive::encode_octet_string(&mut out[i..], rec)?;
                }
                i += encode_closing(&mut out[i..], 1)?;
            }
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::InvalidTag`], [`CodecError::UnknownTagInSequence`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (end_of_file, mut i) = primitive::decode_boolean(buf)?;
        let t = primitive::peek_tag(&buf[i..])?;
        let result = match (t.class, t.number) {
            (TagClass::Context, 0) => {
                i += expect_opening(&buf[i..], 0)?;
                let (file_start_position, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                let (file_data, c) = primitive::decode_octet_string(&buf[i..])?;
                let file_data = file_data.to_vec();
                i += c;
                i += expect_closing(&buf[i..], 0)?;
                FileAccessResult::Stream { file_start_position, file_data }
            }
            (TagClass::Context, 1) => {
                i += expect_opening(&buf[i..], 1)?;
                let (file_start_record, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                let (record_count, c) = primitive::decode_unsigned(&buf[i..])?;
                i += c;
                let mut file_records = Vec::new();
                loop {
                    let t = primitive::peek_tag(&buf[i..])?;
                    if t.is_closing(1) {
                        break;
                    }
                    let (rec, c) = primitive::decode_octet_string(&buf[i..])?;
                    file_records.push(rec.to_vec());
                    i += c;
                }
                i += expect_closing(&buf[i..], 1)?;
                FileAccessResult::Record { file_start_record, record_count: record_count as u32, file_records }
            }
            _ => return Err(CodecError::UnknownTagInSequence(t.number)),
        };
        Ok((Self { end_of_file, result }, i))
    }
}

/// `AtomicWriteFile-Request`: the file object, an access selector, and
/// the data to write (stream: one octet string; record: a list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicWriteFileRequest {
    /// The File object to write to.
    pub file: ObjectId,
    /// Stream write: `(start_position, data)`. Record write:
    /// `(start_record, records)`.
    pub write: AtomicWrite,
}

/// The data half of an `AtomicWriteFile-Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicWrite {
    /// Stream write: `(start_position, data)`.
    Stream {
        /// Byte offset to start writing at.
        start_position: i32,
        /// The bytes to write.
        data: Vec<u8>,
    },
    /// Record write: `(start_record, records)`.
    Record {
        /// Record number to start writing at.
        start_record: i32,
        /// The records to write.
        records: Vec<Vec<u8>>,
    },
}

impl AtomicWriteFileRequest {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut i = primitive::encode_object_id(out, self.file)?;
        match &self.write {
            AtomicWrite::Stream { start_position, data } => {
                i += encode_opening(&mut out[i..], 0)?;
                i += primitive::encode_signed(&mut out[i..], *start_position)?;
                i += primitive::encode_octet_string(&mut out[i..], data)?;
                i += encode_closing(&mut out[i..], 0)?;
            }
            AtomicWrite::Record { start_record, records } => {
                i += encode_opening(&mut out[i..], 1)?;
                i += primitive::encode_signed(&mut out[i..], *start_record)?;
                i += primitive::encode_unsigned(&mut out[i..], records.len() as u64)?;
                for rec in records {
                    i += primitive::encode_octet_string(&mut out[i..], rec)?;
                }
                i += encode_closing(&mut out[i..], 1)?;
            }
        }
        Ok(i)
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::InvalidTag`], [`CodecError::UnknownTagInSequence`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let (file, mut i) = primitive::decode_object_id(buf)?;
        let t = primitive::peek_tag(&buf[i..])?;
        let write = match (t.class, t.number) {
            (TagClass::Context, 0) => {
                i += expect_opening(&buf[i..], 0)?;
                let (start_position, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                let (data, c) = primitive::decode_octet_string(&buf[i..])?;
                let data = data.to_vec();
                i += c;
                i += expect_closing(&buf[i..], 0)?;
                AtomicWrite::Stream { start_position, data }
            }
            (TagClass::Context, 1) => {
                i += expect_opening(&buf[i..], 1)?;
                let (start_record, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                let (record_count, c) = primitive::decode_unsigned(&buf[i..])?;
                i += c;
                let mut records = Vec::with_capacity(record_count as usize);
                for _ in 0..record_count {
                    let (rec, c) = primitive::decode_octet_string(&buf[i..])?;
                    records.push(rec.to_vec());
                    i += c;
                }
                i += expect_closing(&buf[i..], 1)?;
                AtomicWrite::Record { start_record, records }
            }
            _ => return Err(CodecError::UnknownTagInSequence(t.number)),
        };
        Ok((Self { file, write }, i))
    }
}

/// `AtomicWriteFile-Ack`: the resulting start position/record (mirrors
/// the request's access method so the writer learns where data landed,
/// notably for streams opened in append mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicWriteFileAck {
    /// Resulting stream start position.
    Stream(i32),
    /// Resulting start record.
    Record(i32),
}

impl AtomicWriteFileAck {
    /// Encode.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`].
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            AtomicWriteFileAck::Stream(pos) => {
                let mut i = encode_opening(out, 0)?;
                i += primitive::encode_signed(&mut out[i..], *pos)?;
                i += encode_closing(&mut out[i..], 0)?;
                Ok(i)
            }
            AtomicWriteFileAck::Record(rec) => {
                let mut i = encode_opening(out, 1)?;
                i += primitive::encode_signed(&mut out[i..], *rec)?;
                i += encode_closing(&mut out[i..], 1)?;
                Ok(i)
            }
        }
    }

    /// Decode.
    ///
    /// # Errors
    /// [`CodecError::InvalidTag`], [`CodecError::UnknownTagInSequence`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), CodecError> {
        let t = primitive::peek_tag(buf)?;
        match (t.class, t.number) {
            (TagClass::Context, 0) => {
                let mut i = expect_opening(buf, 0)?;
                let (pos, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 0)?;
                Ok((AtomicWriteFileAck::Stream(pos), i))
            }
            (TagClass::Context, 1) => {
                let mut i = expect_opening(buf, 1)?;
                let (rec, c) = primitive::decode_signed(&buf[i..])?;
                i += c;
                i += expect_closing(&buf[i..], 1)?;
                Ok((AtomicWriteFileAck::Record(rec), i))
            }
            _ => Err(CodecError::UnknownTagInSequence(t.number)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_read_request_round_trips() {
        let r = AtomicReadFileRequest {
            file: ObjectId::new(10, 1),
            access: FileAccess::Stream { start_position: 0, count: 128 },
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = AtomicReadFileRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }

    #[test]
    fn record_read_ack_round_trips_multiple_records() {
        let ack = AtomicReadFileAck {
            end_of_file: true,
            result: FileAccessResult::Record {
                file_start_record: 0,
                record_count: 2,
                file_records: vec![b"one".to_vec(), b"two".to_vec()],
            },
        };
        let mut buf = [0u8; 64];
        let n = ack.encode(&mut buf).unwrap();
        let (got, consumed) = AtomicReadFileAck::decode(&buf[..n]).unwrap();
        assert_eq!(got, ack);
        assert_eq!(consumed, n);
    }

    #[test]
    fn stream_write_request_and_ack_round_trip() {
        let r = AtomicWriteFileRequest {
            file: ObjectId::new(10, 1),
            write: AtomicWrite::Stream { start_position: -1, data: b"hello".to_vec() },
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = AtomicWriteFileRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);

        let ack = AtomicWriteFileAck::Stream(0);
        let mut buf2 = [0u8; 16];
        let n2 = ack.encode(&mut buf2).unwrap();
        let (got2, consumed2) = AtomicWriteFileAck::decode(&buf2[..n2]).unwrap();
        assert_eq!(got2, ack);
        assert_eq!(consumed2, n2);
    }

    #[test]
    fn record_write_request_round_trips() {
        let r = AtomicWriteFileRequest {
            file: ObjectId::new(10, 2),
            write: AtomicWrite::Record { start_record: 5, records: vec![b"a".to_vec(), b"bc".to_vec()] },
        };
        let mut buf = [0u8; 32];
        let n = r.encode(&mut buf).unwrap();
        let (got, consumed) = AtomicWriteFileRequest::decode(&buf[..n]).unwrap();
        assert_eq!(got, r);
        assert_eq!(consumed, n);
    }
}
