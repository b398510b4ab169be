//! MS/TP frame header encode/decode.
//!
//! `Preamble(0x55,0xFF) || FrameType || Destination || Source ||
//! Length(BE u16) || HeaderCRC8 || [Data(Length) || DataCRC16]?`

use super::crc;
use crate::error::LinkError;

/// Preamble octets that open every MS/TP frame.
pub const PREAMBLE: [u8; 2] = [0x55, 0xFF];

/// MS/TP frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// 0: Token.
    Token,
    /// 1: Poll For Master.
    PollForMaster,
    /// 2: Reply To Poll For Master.
    ReplyToPollForMaster,
    /// 3: Test_Request.
    TestRequest,
    /// 4: Test_Response.
    TestResponse,
    /// 5: BACnet Data Expecting Reply.
    DataExpectingReply,
    /// 6: BACnet Data Not Expecting Reply.
    DataNotExpectingReply,
    /// 7: Reply Postponed.
    ReplyPostponed,
    /// 32: BACnet Extended Data Expecting Reply (COBS + CRC-32K body).
    ExtendedDataExpectingReply,
    /// 33: BACnet Extended Data Not Expecting Reply (COBS + CRC-32K body).
    ExtendedDataNotExpectingReply,
    /// Anything else: vendor-proprietary or reserved, carried opaquely.
    Other(u8),
}

impl FrameType {
    /// The wire octet for this frame type.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            FrameType::Token => 0,
            FrameType::PollForMaster => 1,
            FrameType::ReplyToPollForMaster => 2,
            FrameType::TestRequest => 3,
            FrameType::TestResponse => 4,
            FrameType::DataExpectingReply => 5,
            FrameType::DataNotExpectingReply => 6,
            FrameType::ReplyPostponed => 7,
            FrameType::ExtendedDataExpectingReply => 32,
            FrameType::ExtendedDataNotExpectingReply => 33,
            FrameType::Other(c) => c,
        }
    }

    /// Decode from the wire octet.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => FrameType::Token,
            1 => FrameType::PollForMaster,
            2 => FrameType::ReplyToPollForMaster,
            3 => FrameType::TestRequest,
            4 => FrameType::TestResponse,
            5 => FrameType::DataExpectingReply,
            6 => FrameType::DataNotExpectingReply,
            7 => FrameType::ReplyPostponed,
            32 => FrameType::ExtendedDataExpectingReply,
            33 => FrameType::ExtendedDataNotExpectingReply,
            other => FrameType::Other(other),
        }
    }

    /// True for the two "BACnet-Data-*" frame types that carry an NPDU.
    #[must_use]
    pub fn carries_npdu(self) -> bool {
        matches!(
            self,
            FrameType::DataExpectingReply
                | FrameType::DataNotExpectingReply
                | FrameType::ExtendedDataExpectingReply
                | FrameType::ExtendedDataNotExpectingReply
        )
    }

    /// True if this frame type expects an immediate reply.
    #[must_use]
    pub fn expects_reply(self) -> bool {
        matches!(self, FrameType::DataExpectingReply | FrameType::ExtendedDataExpectingReply)
    }
}

/// Broadcast destination/source MAC for MS/TP.
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// A decoded MS/TP header (everything except the data payload and its CRC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Frame type octet.
    pub frame_type: FrameType,
    /// Destination station address.
    pub destination: u8,
    /// Source station address.
    pub source: u8,
    /// Declared data length (0 for frames with no payload).
    pub length: u16,
}

/// Size in bytes of the fixed header fields (FrameType+Dest+Src+Length),
/// not counting the preamble or the HeaderCRC octet.
pub const HEADER_FIELDS_LEN: usize = 5;

impl Header {
    /// Encode preamble + header + HeaderCRC into `out`. Returns bytes written (8).
    ///
    /// # Errors
    /// [`LinkError::FrameTooLarge`] if `out` is shorter than 8 bytes.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, LinkError> {
        if out.len() < 8 {
            return Err(LinkError::FrameTooLarge { len: 8, capacity: out.len() });
        }
        out[0] = PREAMBLE[0];
        out[1] = PREAMBLE[1];
        out[2] = self.frame_type.code();
        out[3] = self.destination;
        out[4] = self.source;
        out[5..7].copy_from_slice(&self.length.to_be_bytes());
        out[7] = crc::header_crc8(&out[2..7]);
        Ok(8)
    }

    /// Decode the five header-field octets (post-preamble, pre-CRC) and
    /// validate against the supplied HeaderCRC octet.
    ///
    /// # Errors
    /// [`LinkError::HeaderCrc`] if the CRC does not validate.
    pub fn decode(fields: &[u8; HEADER_FIELDS_LEN], header_crc: u8) -> Result<Self, LinkError> {
        if !crc::verify_header_crc8(fields, header_crc) {
            return Err(LinkError::HeaderCrc);
        }
        Ok(Header {
            frame_type: FrameType::from_code(fields[0]),
            destination: fields[1],
            source: fields[2],
            length: u16::from_be_bytes([fields[3], fields[4]]),
        })
    }
}
