//! APDU header: PDU type, service choice, invoke ID, and the
//! segmentation control bits that select between the eight PDU shapes
//! ANSI/ASHRAE 135 clause 20.1 defines.

use crate::error::{AbortReason, CodecError, RejectReason};

/// The eight top-level PDU types (upper nibble of the first octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    /// Confirmed-Request-PDU.
    ConfirmedRequest,
    /// Unconfirmed-Request-PDU.
    UnconfirmedRequest,
    /// SimpleACK-PDU.
    SimpleAck,
    /// ComplexACK-PDU.
    ComplexAck,
    /// SegmentACK-PDU.
    SegmentAck,
    /// Error-PDU.
    Error,
    /// Reject-PDU.
    Reject,
    /// Abort-PDU.
    Abort,
}

impl PduType {
    fn code(self) -> u8 {
        match self {
            PduType::ConfirmedRequest => 0,
            PduType::UnconfirmedRequest => 1,
            PduType::SimpleAck => 2,
            PduType::ComplexAck => 3,
            PduType::SegmentAck => 4,
            PduType::Error => 5,
            PduType::Reject => 6,
            PduType::Abort => 7,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PduType::ConfirmedRequest),
            1 => Some(PduType::UnconfirmedRequest),
            2 => Some(PduType::SimpleAck),
            3 => Some(PduType::ComplexAck),
            4 => Some(PduType::SegmentAck),
            5 => Some(PduType::Error),
            6 => Some(PduType::Reject),
            7 => Some(PduType::Abort),
            _ => None,
        }
    }
}

/// Table of encoded `max-APDU-length-accepted` nibbles (clause 20.1.2.5).
#[must_use]
pub fn max_apdu_from_nibble(nibble: u8) -> u32 {
    match nibble {
        0 => 50,
        1 => 128,
        2 => 206,
        3 => 480,
        4 => 1024,
        _ => 1476,
    }
}

/// Encode an APDU size as the nearest non-exceeding standard nibble.
#[must_use]
pub fn max_apdu_to_nibble(size: u32) -> u8 {
    match size {
        0..=50 => 0,
        51..=128 => 1,
        129..=206 => 2,
        207..=480 => 3,
        481..=1024 => 4,
        _ => 5,
    }
}

fn reject_reason_to_code(r: RejectReason) -> u8 {
    match r {
        RejectReason::Other => 0,
        RejectReason::BufferOverflow => 1,
        RejectReason::InvalidParameterDataType => 3,
        RejectReason::InvalidTag => 4,
        RejectReason::UnrecognizedService => 9,
    }
}

fn reject_reason_from_code(code: u8) -> RejectReason {
    match code {
        1 => RejectReason::BufferOverflow,
        3 => RejectReason::InvalidParameterDataType,
        4 => RejectReason::InvalidTag,
        9 => RejectReason::UnrecognizedService,
        _ => RejectReason::Other,
    }
}

fn abort_reason_to_code(r: AbortReason) -> u8 {
    match r {
        AbortReason::Other => 0,
        AbortReason::InvalidTag => 2,
        AbortReason::SegmentationNotSupported => 4,
        AbortReason::TooManyRetries => 10,
    }
}

fn abort_reason_from_code(code: u8) -> AbortReason {
    match code {
        2 => AbortReason::InvalidTag,
        4 => AbortReason::SegmentationNotSupported,
        10 => AbortReason::TooManyRetries,
        _ => AbortReason::Other,
    }
}

/// A fully-parsed BACnet APDU. `service_data` is always the
/// remaining, un-interpreted tail of the buffer: service codecs in
/// [`crate::service`] decode it further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Apdu {
    /// A confirmed service request.
    ConfirmedRequest {
        /// True if this request is segmented.
        segmented: bool,
        /// True if more segments follow this one.
        more_follows: bool,
        /// True if the requester will accept a segmented response.
        segmented_response_accepted: bool,
        /// Encoded max-segments-accepted nibble.
        max_segments: u8,
        /// Encoded max-APDU-size-accepted nibble.
        max_apdu: u8,
        /// The invoke ID the requester chose.
        invoke_id: u8,
        /// Present only when `segmented`.
        sequence_number: Option<u8>,
        /// Present only when `segmented`.
        proposed_window_size: Option<u8>,
        /// Confirmed service choice.
        service_choice: u8,
        /// Remaining, undecoded service-request bytes.
        service_data: Vec<u8>,
    },
    /// An unconfirmed service request.
    UnconfirmedRequest {
        /// Unconfirmed service choice.
        service_choice: u8,
        /// Remaining, undecoded service-request bytes.
        service_data: Vec<u8>,
    },
    /// A SimpleACK: acknowledges a confirmed request with no return data.
    SimpleAck {
        /// The invoke ID being acknowledged.
        invoke_id: u8,
        /// The service choice being acknowledged.
        service_choice: u8,
    },
    /// A ComplexACK: acknowledges a confirmed request and carries data.
    ComplexAck {
        /// True if this ack is segmented.
        segmented: bool,
        /// True if more segments follow this one.
        more_follows: bool,
        /// The invoke ID being acknowledged.
        invoke_id: u8,
        /// Present only when `segmented`.
        sequence_number: Option<u8>,
        /// Present only when `segmented`.
        proposed_window_size: Option<u8>,
        /// The service choice being acknowledged.
        service_choice: u8,
        /// Remaining, undecoded service-ack bytes.
        service_data: Vec<u8>,
    },
    /// Acknowledges receipt of a window of segments.
    SegmentAck {
        /// True if this is a negative acknowledgement.
        negative: bool,
        /// True if sent by the server side of the transaction.
        server: bool,
        /// The invoke ID of the segmented transaction.
        invoke_id: u8,
        /// The last sequence number received.
        sequence_number: u8,
        /// The window size the receiver will now accept.
        actual_window_size: u8,
    },
    /// A BACnet-Error response.
    Error {
        /// The invoke ID that errored.
        invoke_id: u8,
        /// The service choice that errored.
        service_choice: u8,
        /// BACnet error class.
        error_class: u32,
        /// BACnet error code.
        error_code: u32,
    },
    /// A BACnet-Reject response.
    Reject {
        /// The invoke ID being rejected.
        invoke_id: u8,
        /// Why.
        reason: RejectReason,
    },
    /// A BACnet-Abort response.
    Abort {
        /// True if sent by the server side of the transaction.
        server: bool,
        /// The invoke ID being aborted.
        invoke_id: u8,
        /// Why.
        reason: AbortReason,
    },
}

impl Apdu {
    /// This APDU's PDU type.
    #[must_use]
    pub fn pdu_type(&self) -> PduType {
        match self {
            Apdu::ConfirmedRequest { .. } => PduType::ConfirmedRequest,
            Apdu::UnconfirmedRequest { .. } => PduType::UnconfirmedRequest,
            Apdu::SimpleAck { .. } => PduType::SimpleAck,
            Apdu::ComplexAck { .. } => PduType::ComplexAck,
            Apdu::SegmentAck { .. } => PduType::SegmentAck,
            Apdu::Error { .. } => PduType::Error,
            Apdu::Reject { .. } => PduType::Reject,
            Apdu::Abort { .. } => PduType::Abort,
        }
    }

    /// Encode this APDU into `out`, returning the bytes written.
    ///
    /// # Errors
    /// [`CodecError::BufferTooSmall`] if `out` cannot hold the result.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        match self {
            Apdu::ConfirmedRequest {
                segmented,
                more_follows,
                segmented_response_accepted,
                max_segments,
                max_apdu,
                invoke_id,
                sequence_number,
                proposed_window_size,
                service_choice,
                service_data,
            } => {
                let mut i = 0;
                let byte0 = (PduType::ConfirmedRequest.code() << 4)
                    | (u8::from(*segmented) << 3)
                    | (u8::from(*more_follows) << 2)
                    | (u8::from(*segmented_response_accepted) << 1);
                let needed = 3 + usize::from(*segmented) * 2 + 1 + service_data.len();
                if out.len() < needed {
                    return Err(CodecError::BufferTooSmall { needed, available: out.len() });
                }
                out[i] = byte0;
                i += 1;
                out[i] = (max_segments << 4) | (max_apdu & 0x0F);
                i += 1;
                out[i] = *invoke_id;
                i += 1;
                if *segmented {
                    out[i] = sequence_number.unwrap_or(0);
                    i += 1;
                    out[i] = proposed_window_size.unwrap_or(0);
                    i += 1;
                }
                out[i] = *service_choice;
                i += 1;
                out[i..i + service_data.len()].copy_from_slice(service_data);
                i += service_data.len();
                Ok(i)
            }
            Apdu::UnconfirmedRequest { service_choice, service_data } => {
                let needed = 2 + service_data.len();
                if out.len() < needed {
                    return Err(CodecError::BufferTooSmall { needed, available: out.len() });
                }
                out[0] = PduType::UnconfirmedRequest.code() << 4;
                out[1] = *service_choice;
                out[2..2 + service_data.len()].copy_from_slice(service_data);
                Ok(needed)
            }
            Apdu::SimpleAck { invoke_id, service_choice } => {
                if out.len() < 3 {
                    return Err(CodecError::BufferTooSmall { needed: 3, available: out.len() });
                }
                out[0] = PduType::SimpleAck.code() << 4;
                out[1] = *invoke_id;
                out[2] = *service_choice;
                Ok(3)
            }
            Apdu::ComplexAck {
                segmented,
                more_follows,
                invoke_id,
                sequence_number,
                proposed_window_size,
                service_choice,
                service_data,
            } => {
                let mut i = 0;
                let needed = 2 + usize::from(*segmented) * 2 + 1 + service_data.len();
                if out.len() < needed {
                    return Err(CodecError::BufferTooSmall { needed, available: out.len() });
                }
                out[i] =
                    (PduType::ComplexAck.code() << 4) | (u8::from(*segmented) << 3) | (u8::from(*more_follows) << 2);
                i += 1;
                out[i] = *invoke_id;
                i += 1;
                if *segmented {
                    out[i] = sequence_number.unwrap_or(0);
                    i += 1;
                    out[i] = proposed_window_size.unwrap_or(0);
                    i += 1;
                }
                out[i] = *service_choice;
                i += 1;
                out[i..i + service_data.len()].copy_from_slice(service_data);
                i += service_data.len();
                Ok(i)
            }
            Apdu::SegmentAck { negative, server, invoke_id, sequence_number, actual_window_size } => {
                if out.len() < 4 {
                    return Err(CodecError::BufferTooSmall { needed: 4, available: out.len() });
                }
                out[0] = (PduType::SegmentAck.code() << 4) | (u8::from(*negative) << 1) | u8::from(*server);
                out[1] = *invoke_id;
                out[2] = *sequence_number;
                out[3] = *actual_window_size;
                Ok(4)
            }
            Apdu::Error { invoke_id, service_choice, error_class, error_code } => {
                let mut buf = [0u8; 16];
                let class_n = crate::codec::primitive::encode_enumerated(&mut buf, *error_class)?;
                let mut code_buf = [0u8; 16];
                let code_n = crate::codec::primitive::encode_enumerated(&mut code_buf, *error_code)?;
                let needed = 3 + class_n + code_n;
                if out.len() < needed {
                    return Err(CodecError::BufferTooSmall { needed, available: out.len() });
                }
                out[0] = PduType::Error.code() << 4;
                out[1] = *invoke_id;
                out[2] = *service_choice;
                out[3..3 + class_n].copy_from_slice(&buf[..class_n]);
                out[3 + class_n..3 + class_n + code_n].copy_from_slice(&code_buf[..code_n]);
                Ok(needed)
            }
            Apdu::Reject { invoke_id, reason } => {
                if out.len() < 3 {
                    return Err(CodecError::BufferTooSmall { needed: 3, available: out.len() });
                }
                out[0] = PduType::Reject.code() << 4;
                out[1] = *invoke_id;
                out[2] = reject_reason_to_code(*reason);
                Ok(3)
            }
            Apdu::Abort { server, invoke_id, reason } => {
                if out.len() < 3 {
                    return Err(CodecError::BufferTooSmall { needed: 3, available: out.len() });
                }
                out[0] = (PduType::Abort.code() << 4) | u8::from(*server);
                out[1] = *invoke_id;
                out[2] = abort_reason_to_code(*reason);
                Ok(3)
            }
        }
    }

    /// Decode an APDU from `buf` (the whole remaining NPDU payload).
    ///
    /// # Errors
    /// [`CodecError::Truncated`] if `buf` ends before a fixed-size header
    /// field, or [`CodecError::InvalidTag`] if the PDU type nibble is
    /// outside 0..=7.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.is_empty() {
            return Err(CodecError::Truncated { needed: 1, available: 0 });
        }
        let byte0 = buf[0];
        let pdu_type = PduType::from_code(byte0 >> 4).ok_or(CodecError::ValueOutOfRange { what: "pdu type nibble" })?;
        match pdu_type {
            PduType::ConfirmedRequest => {
                let segmented = byte0 & 0x08 != 0;
                let more_follows = byte0 & 0x04 != 0;
                let segmented_response_accepted = byte0 & 0x02 != 0;
                if buf.len() < 3 {
                    return Err(CodecError::Truncated { needed: 3, available: buf.len() });
                }
                let max_segments = buf[1] >> 4;
                let max_apdu = buf[1] & 0x0F;
                let invoke_id = buf[2];
                let mut i = 3;
                let (sequence_number, proposed_window_size) = if segmented {
                    if buf.len() < i + 2 {
                        return Err(CodecError::Truncated { needed: i + 2, available: buf.len() });
                    }
                    let s = buf[i];
                    let w = buf[i + 1];
                    i += 2;
                    (Some(s), Some(w))
                } else {
                    (None, None)
                };
                if buf.len() < i + 1 {
                    return Err(CodecError::Truncated { needed: i + 1, available: buf.len() });
                }
                let service_choice = buf[i];
                i += 1;
                Ok(Apdu::ConfirmedRequest {
                    segmented,
                    more_follows,
                    segmented_response_accepted,
                    max_segments,
                    max_apdu,
                    invoke_id,
                    sequence_number,
                    proposed_window_size,
                    service_choice,
                    service_data: buf[i..].to_vec(),
                })
            }
            PduType::UnconfirmedRequest => {
                if buf.len() < 2 {
                    return Err(CodecError::Truncated { needed: 2, available: buf.len() });
                }
                Ok(Apdu::UnconfirmedRequest { service_choice: buf[1], service_data: buf[2..].to_vec() })
            }
            PduType::SimpleAck => {
                if buf.len() < 3 {
                    return Err(CodecError::Truncated { needed: 3, available: buf.len() });
                }
                Ok(Apdu::SimpleAck { invoke_id: buf[1], service_choice: buf[2] })
            }
            PduType::ComplexAck => {
                let segmented = byte0 & 0x08 != 0;
                let more_follows = byte0 & 0x04 != 0;
                if buf.len() < 2 {
                    return Err(CodecError::Truncated { needed: 2, available: buf.len() });
                }
                let invoke_id = buf[1];
                let mut i = 2;
                let (sequence_number, proposed_window_size) = if segmented {
                    if buf.len() < i + 2 {
                        return Err(CodecError::Truncated { needed: i + 2, available: buf.len() });
                    }
                    let s = buf[i];
                    let w = buf[i + 1];
                    i += 2;
                    (Some(s), Some(w))
                } else {
                    (None, None)
                };
                if buf.len() < i + 1 {
                    return Err(CodecError::Truncated { needed: i + 1, available: buf.len() });
                }
                let service_choice = buf[i];
                i += 1;
                Ok(Apdu::ComplexAck {
                    segmented,
                    more_follows,
                    invoke_id,
                    sequence_number,
                    proposed_window_size,
                    service_choice,
                    service_data: buf[i..].to_vec(),
                })
            }
            PduType::SegmentAck => {
                if buf.len() < 4 {
                    return Err(CodecError::Truncated { needed: 4, available: buf.len() });
                }
                Ok(Apdu::SegmentAck {
                    negative: byte0 & 0x02 != 0,
                    server: byte0 & 0x01 != 0,
                    invoke_id: buf[1],
                    sequence_number: buf[2],
                    actual_window_size: buf[3],
                })
            }
            PduType::Error => {
                if buf.len() < 3 {
                    return Err(CodecError::Truncated { needed: 3, available: buf.len() });
                }
                let invoke_id = buf[1];
                let service_choice = buf[2];
                let (error_class, n1) = crate::codec::primitive::decode_enumerated(&buf[3..])?;
                let (error_code, _n2) = crate::codec::primitive::decode_enumerated(&buf[3 + n1..])?;
                Ok(Apdu::Error { invoke_id, service_choice, error_class, error_code })
            }
            PduType::Reject => {
                if buf.len() < 3 {
                    return Err(CodecError::Truncated { needed: 3, available: buf.len() });
                }
                Ok(Apdu::Reject { invoke_id: buf[1], reason: reject_reason_from_code(buf[2]) })
            }
            PduType::Abort => {
                if buf.len() < 3 {
                    return Err(CodecError::Truncated { needed: 3, available: buf.len() });
                }
                Ok(Apdu::Abort { server: byte0 & 0x01 != 0, invoke_id: buf[1], reason: abort_reason_from_code(buf[2]) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_request_round_trips_unsegmented() {
        let apdu = Apdu::ConfirmedRequest {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: true,
            max_segments: 0,
            max_apdu: 5,
            invoke_id: 42,
            sequence_number: None,
            proposed_window_size: None,
            service_choice: 12,
            service_data: vec![1, 2, 3],
        };
        let mut buf = [0u8; 32];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn confirmed_request_round_trips_segmented() {
        let apdu = Apdu::ConfirmedRequest {
            segmented: true,
            more_follows: true,
            segmented_response_accepted: true,
            max_segments: 3,
            max_apdu: 5,
            invoke_id: 7,
            sequence_number: Some(2),
            proposed_window_size: Some(8),
            service_choice: 12,
            service_data: vec![9, 9],
        };
        let mut buf = [0u8; 32];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn unconfirmed_request_round_trips() {
        let apdu = Apdu::UnconfirmedRequest { service_choice: 8, service_data: vec![1, 2] };
        let mut buf = [0u8; 16];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn simple_ack_round_trips() {
        let apdu = Apdu::SimpleAck { invoke_id: 3, service_choice: 15 };
        let mut buf = [0u8; 8];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn complex_ack_round_trips() {
        let apdu = Apdu::ComplexAck {
            segmented: false,
            more_follows: false,
            invoke_id: 9,
            sequence_number: None,
            proposed_window_size: None,
            service_choice: 12,
            service_data: vec![5, 6, 7],
        };
        let mut buf = [0u8; 16];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn segment_ack_round_trips() {
        let apdu = Apdu::SegmentAck { negative: false, server: true, invoke_id: 1, sequence_number: 4, actual_window_size: 6 };
        let mut buf = [0u8; 8];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn error_round_trips() {
        let apdu = Apdu::Error { invoke_id: 2, service_choice: 12, error_class: 1, error_code: 31 };
        let mut buf = [0u8; 16];
        let n = apdu.encode(&mut buf).unwrap();
        assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
    }

    #[test]
    fn reject_round_trips_every_reason() {
        for reason in [
            RejectReason::UnrecognizedService,
            RejectReason::InvalidTag,
            RejectReason::InvalidParameterDataType,
            RejectReason::BufferOverflow,
            RejectReason::Other,
        ] {
            let apdu = Apdu::Reject { invoke_id: 1, reason };
            let mut buf = [0u8; 8];
            let n = apdu.encode(&mut buf).unwrap();
            assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
        }
    }

    #[test]
    fn abort_round_trips_every_reason() {
        for reason in
            [AbortReason::SegmentationNotSupported, AbortReason::InvalidTag, AbortReason::TooManyRetries, AbortReason::Other]
        {
            let apdu = Apdu::Abort { server: true, invoke_id: 1, reason };
            let mut buf = [0u8; 8];
            let n = apdu.encode(&mut buf).unwrap();
            assert_eq!(Apdu::decode(&buf[..n]).unwrap(), apdu);
        }
    }

    #[test]
    fn max_apdu_nibble_round_trips_standard_sizes() {
        assert_eq!(max_apdu_from_nibble(max_apdu_to_nibble(206)), 206);
        assert_eq!(max_apdu_from_nibble(max_apdu_to_nibble(1476)), 1476);
    }
}
