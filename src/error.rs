//! Crate-wide error taxonomy.
//!
//! Each layer (codec, service, MS/TP link, TSM) gets its own
//! `thiserror`-derived enum so callers can match on the failure without
//! string-parsing. `Error` is the top-level union used by code that
//! crosses layers (the APDU dispatcher, the datalink adapter).

use thiserror::Error;

/// Errors produced while decoding or encoding a single tagged value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Ran out of input before the value was fully decoded.
    #[error("truncated: needed {needed} bytes, had {available}")]
    Truncated {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// Tag class/number did not match what the decoder expected.
    #[error("invalid tag: expected {expected}, got number={got_number} class={got_class:?}")]
    InvalidTag {
        /// Human description of what was expected.
        expected: &'static str,
        /// Tag number actually read.
        got_number: u8,
        /// Tag class actually read.
        got_class: super::codec::tag::TagClass,
    },

    /// An opening tag's matching closing tag had the wrong number.
    #[error("mismatched closing tag: opened {opened}, closed {closed}")]
    MismatchedClosingTag {
        /// Tag number of the opening tag.
        opened: u8,
        /// Tag number of the closing tag actually seen.
        closed: u8,
    },

    /// A decoded numeric value fell outside the field's legal range.
    #[error("value out of range: {what}")]
    ValueOutOfRange {
        /// Which field/value was out of range.
        what: &'static str,
    },

    /// An integer tag declared a length this decoder cannot represent.
    #[error("invalid integer width: {width} bytes for {what}")]
    InvalidIntegerWidth {
        /// Width read from the tag.
        width: usize,
        /// Which value kind was being decoded.
        what: &'static str,
    },

    /// A required field of a composite/sequence was absent.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// A sequence carried a context tag number the decoder doesn't recognize.
    #[error("unknown tag {0} in sequence")]
    UnknownTagInSequence(u8),

    /// The caller-supplied output buffer was too small.
    #[error("output buffer too small: needed {needed}, had {available}")]
    BufferTooSmall {
        /// Bytes required to encode the value.
        needed: usize,
        /// Bytes actually available in the caller's buffer.
        available: usize,
    },

    /// The ASCII textual form (§6.3) could not be parsed.
    #[error("malformed ascii encoding: {0}")]
    MalformedAscii(String),
}

/// Errors surfaced by a service codec's request/ack encode or decode.
///
/// This is the taxonomy: decoders report one of these
/// four kinds, never retrying on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The APDU was structurally invalid (bad tag nesting, wrong type).
    #[error("malformed apdu: {0}")]
    MalformedApdu(String),

    /// A tag didn't match what this service expects at this position.
    #[error("invalid tag: {0}")]
    InvalidTag(String),

    /// A value decoded fine but failed a range/semantic check.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    /// A required field was missing from the APDU.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

impl From<CodecError> for ServiceError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Truncated { .. } => ServiceError::MalformedApdu(e.to_string()),
            CodecError::InvalidTag { .. } | CodecError::MismatchedClosingTag { .. } => {
                ServiceError::InvalidTag(e.to_string())
            }
            CodecError::ValueOutOfRange { .. } | CodecError::InvalidIntegerWidth { .. } => {
                ServiceError::ValueOutOfRange(e.to_string())
            }
            CodecError::MissingRequiredField(f) => ServiceError::MissingRequiredField(f),
            CodecError::UnknownTagInSequence(_) | CodecError::MalformedAscii(_) => {
                ServiceError::MalformedApdu(e.to_string())
            }
            CodecError::BufferTooSmall { .. } => ServiceError::MalformedApdu(e.to_string()),
        }
    }
}

/// Reject reason, per ANSI/ASHRAE 135 clause 135.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Service choice this node does not implement.
    UnrecognizedService,
    /// A tag in the APDU was malformed.
    InvalidTag,
    /// Wrong number or type of arguments for this service.
    InvalidParameterDataType,
    /// Segmentation was required but isn't supported.
    BufferOverflow,
    /// Catch-all for anything else a decoder reports.
    Other,
}

/// Abort reason, per ANSI/ASHRAE 135 clause 135.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Peer requested segmented communication but we don't support it.
    SegmentationNotSupported,
    /// A tag was invalid in a way that can't be rejected cleanly.
    InvalidTag,
    /// Too many APDU retries/timeouts.
    TooManyRetries,
    /// Catch-all.
    Other,
}

impl ServiceError {
    /// Map a decode error onto a reject reason for a Reject-PDU reply.
    #[must_use]
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            ServiceError::InvalidTag(_) => RejectReason::InvalidTag,
            ServiceError::ValueOutOfRange(_) | ServiceError::MissingRequiredField(_) => {
                RejectReason::InvalidParameterDataType
            }
            ServiceError::MalformedApdu(_) => RejectReason::Other,
        }
    }
}

/// Errors from the MS/TP link layer (FSMs, CRC, framing).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Header CRC-8 did not validate.
    #[error("header crc mismatch")]
    HeaderCrc,

    /// Data CRC-16 did not validate.
    #[error("data crc mismatch")]
    DataCrc,

    /// Declared frame `Length` exceeded the input buffer's capacity.
    #[error("frame too large: {len} bytes, buffer holds {capacity}")]
    FrameTooLarge {
        /// Declared frame length.
        len: usize,
        /// Input buffer capacity.
        capacity: usize,
    },

    /// Silence threshold exceeded mid-frame.
    #[error("silence timeout while receiving")]
    SilenceTimeout,
}

/// Errors from the datalink adapter (§4.9).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatalinkError {
    /// The outbound NPDU did not fit in the link's maximum frame size.
    #[error("npdu too large for link: {len} bytes, max {max}")]
    TooLarge {
        /// NPDU length.
        len: usize,
        /// Link's maximum payload.
        max: usize,
    },

    /// The underlying MS/TP port reported a link error.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Device communication is currently disabled (DCC).
    #[error("communication disabled by DeviceCommunicationControl")]
    CommunicationDisabled,
}

/// Errors from the transaction state machine (§4.7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsmError {
    /// No reply arrived within `APDU_Timeout * (Number_Of_APDU_Retries + 1)`.
    #[error("transaction timed out")]
    Timeout,

    /// Peer sent a BACnet-Abort.
    #[error("aborted: {0:?}")]
    Abort(AbortReason),

    /// Peer sent a BACnet-Reject.
    #[error("rejected: {0:?}")]
    Reject(RejectReason),

    /// Peer sent a BACnet-Error.
    #[error("service error: class={error_class} code={error_code}")]
    Error {
        /// BACnet error class.
        error_class: u32,
        /// BACnet error code.
        error_code: u32,
    },

    /// Segmentation bookkeeping failed (window overflow, out-of-order).
    #[error("segmentation error: {0}")]
    Segmentation(String),

    /// No free invoke ID was available (256 transactions already in flight).
    #[error("invoke id pool exhausted")]
    PoolExhausted,

    /// The caller cancelled this transaction.
    #[error("transaction cancelled")]
    Cancelled,
}

/// Top-level error, used where code crosses layer boundaries (dispatch,
/// datalink adapter, demo binaries).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Wraps a [`CodecError`].
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Wraps a [`ServiceError`].
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Wraps a [`LinkError`].
    #[error(transparent)]
    Link(#[from] LinkError),
    /// Wraps a [`DatalinkError`].
    #[error(transparent)]
    Datalink(#[from] DatalinkError),
    /// Wraps a [`TsmError`].
    #[error(transparent)]
    Tsm(#[from] TsmError),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
