//! MS/TP datalink: receive-frame FSM, master-node FSM, zero-config
//! auto-MAC, and the framing/CRC they share.

pub mod automac;
pub mod crc;
pub mod frame;
pub mod master;
pub mod receive;

pub use automac::AutoMac;
pub use frame::{FrameType, Header};
pub use master::{Action as MasterAction, MasterNodeFsm, MasterState};
pub use receive::{ReceiveEvent, ReceiveFsm};

/// ANSI/ASHRAE 135 default timing, milliseconds unless noted.
pub mod timing {
    /// Maximum time a master waits for a reply to a frame it sent.
    pub const TREPLY_TIMEOUT_MS: u32 = 295;
    /// Maximum time to wait for evidence the token was used after passing it.
    pub const TUSAGE_TIMEOUT_MS: u32 = 95;
    /// Maximum time, with no token seen, before a node assumes it must
    /// generate one.
    pub const TNO_TOKEN_MS: u32 = 500;
    /// One bit-time slot used to stagger simultaneous timeouts.
    pub const TSLOT_MS: u32 = 10;
    /// Minimum silence (bit-times) that ends a frame in the receive FSM.
    pub const MIN_SILENCE_BITS: u16 = 35;
    /// Maximum silence (bit-times) that ends a frame in the receive FSM.
    pub const MAX_SILENCE_BITS: u16 = 75;
}

/// Aggregate per-port state, tying the master-node FSM and the optional
/// auto-MAC helper to one addressable station.
pub struct MstpPortState {
    /// Our station address (`This_Station`).
    pub this_station: u8,
    /// `Nmax_master`: highest master address in the ring.
    pub nmax_master: u8,
    /// `Nmax_info_frames`: frames sent per token hold.
    pub nmax_info_frames: u8,
    /// The master-node token-passing FSM.
    pub master: MasterNodeFsm,
    /// Auto-MAC observation table, `Some` only while unconfigured.
    pub auto_mac: Option<AutoMac>,
}

impl MstpPortState {
    /// A statically-addressed port (no auto-MAC).
    #[must_use]
    pub fn fixed(this_station: u8, nmax_master: u8, nmax_info_frames: u8) -> Self {
        Self {
            this_station,
            nmax_master,
            nmax_info_frames,
            master: MasterNodeFsm::new(this_station, nmax_master, nmax_info_frames),
            auto_mac: None,
        }
    }

    /// A port that starts in zero-config observation mode. Call
    /// [`MstpPortState::finish_auto_mac`] once [`AutoMac::cycle_complete`]
    /// reports readiness.
    #[must_use]
    pub fn zero_config(nmax_master: u8, nmax_info_frames: u8) -> Self {
        Self {
            this_station: 0,
            nmax_master,
            nmax_info_frames,
            master: MasterNodeFsm::new(0, nmax_master, nmax_info_frames),
            auto_mac: Some(AutoMac::new()),
        }
    }

    /// Commit to the given auto-chosen address and switch to normal
    /// token-passing operation.
    pub fn finish_auto_mac(&mut self, chosen: u8) {
        self.this_station = chosen;
        self.master = MasterNodeFsm::new(chosen, self.nmax_master, self.nmax_info_frames);
        self.auto_mac = None;
    }
}
