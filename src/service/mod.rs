//! Service codecs: request/ack encode and decode for every
//! confirmed and unconfirmed service this engine understands. Service
//! choice numbers are the ANSI/ASHRAE 135 clause 20.1.2.41/20.1.2.12
//! assignments.

pub mod dcc;
pub mod discovery;
pub mod event_information;
pub mod file_access;
pub mod private_transfer;
pub mod read_property;
pub mod read_range;
pub mod time_sync;

pub use dcc::{DccState, DeviceCommunicationControl};
pub use discovery::{IAm, IHave, Segmentation, WhoHas, WhoHasSelector, WhoIs};
pub use event_information::{EventSummary, GetEventInformationAck, GetEventInformationRequest};
pub use file_access::{
    AtomicReadFileAck, AtomicReadFileRequest, AtomicWrite, AtomicWriteFileAck, AtomicWriteFileRequest, FileAccess,
    FileAccessResult,
};
pub use private_transfer::ConfirmedPrivateTransfer;
pub use read_property::{ReadPropertyAck, ReadPropertyRequest, WritePropertyRequest};
pub use read_range::{RangeSelector, ReadRangeAck, ReadRangeRequest};
pub use time_sync::TimeSynchronization;

/// Confirmed service choice numbers this engine implements.
pub mod confirmed {
    /// `AtomicReadFile`.
    pub const ATOMIC_READ_FILE: u8 = 6;
    /// `AtomicWriteFile`.
    pub const ATOMIC_WRITE_FILE: u8 = 7;
    /// `ReadProperty`.
    pub const READ_PROPERTY: u8 = 12;
    /// `WriteProperty`.
    pub const WRITE_PROPERTY: u8 = 15;
    /// `DeviceCommunicationControl`.
    pub const DEVICE_COMMUNICATION_CONTROL: u8 = 17;
    /// `ConfirmedPrivateTransfer`.
    pub const CONFIRMED_PRIVATE_TRANSFER: u8 = 18;
    /// `ReadRange`.
    pub const READ_RANGE: u8 = 26;
    /// `GetEventInformation`.
    pub const GET_EVENT_INFORMATION: u8 = 29;
}

/// Unconfirmed service choice numbers this engine implements.
pub mod unconfirmed {
    /// `I-Am`.
    pub const I_AM: u8 = 0;
    /// `I-Have`.
    pub const I_HAVE: u8 = 1;
    /// `TimeSynchronization`.
    pub const TIME_SYNCHRONIZATION: u8 = 6;
    /// `Who-Has`.
    pub const WHO_HAS: u8 = 7;
    /// `Who-Is`.
    pub const WHO_IS: u8 = 8;
    /// `UTCTimeSynchronization`.
    pub const UTC_TIME_SYNCHRONIZATION: u8 = 9;
}
