//! MS/TP datalink adapter: the single entry/exit point the
//! TSM and APDU dispatcher use to reach a physical port. Replaces
//! ad-hoc global FSM state with one `PortContext` passed explicitly to
//! every datalink entry point.
//!
//! This module owns the byte-level plumbing around the FSMs in
//! [`crate::mstp`]: it doesn't know how to talk to a UART itself
//! (that's a physical driver, out of scope), but it does
//! know how to turn `send_npdu`/received octets into the right FSM
//! calls and back into wire bytes.

use log::{debug, trace, warn};

use crate::address::Address;
use crate::error::DatalinkError;
use crate::mstp::frame::{FrameType, Header, BROADCAST_ADDRESS};
use crate::mstp::master::Action as MasterAction;
use crate::mstp::receive::ReceiveEvent;
use crate::mstp::{MstpPortState, ReceiveFsm};

/// Maximum NPDU (header + APDU) this port will carry in one MS/TP frame.
/// ANSI/ASHRAE 135 clause 9.3 sets 501 as the largest `Max_APDU` for
/// MS/TP at 9600..115200 baud with one frame per APDU.
pub const MAX_NPDU_LEN: usize = 501;

/// One queued outbound NPDU, addressed to a station.
struct Outbound {
    destination: u8,
    expecting_reply: bool,
    npdu: Vec<u8>,
}

/// Owns one MS/TP port: the master-node FSM, the receive FSM, and the
/// byte-level queues between them and the (unmodeled) physical link.
///
/// The embedding event loop is responsible for:
/// - calling [`PortContext::receive_byte`] for every octet read off the wire,
/// - calling [`PortContext::silence_elapsed`] when the silence timer fires,
/// - calling [`PortContext::poll`] once per loop tick with the elapsed
///   monotonic time, which both advances token-passing and returns the
///   next inbound NPDU (if any) to hand to the APDU dispatcher,
/// - draining [`PortContext::take_tx_bytes`] to whatever actually writes
///   to the wire.
pub struct PortContext<const N: usize = MAX_NPDU_LEN> {
    port: MstpPortState,
    receive: ReceiveFsm<N>,
    tx: Vec<u8>,
    out_queue: std::collections::VecDeque<Outbound>,
    in_queue: std::collections::VecDeque<(Address, Vec<u8>)>,
    since_last_byte_ms: u32,
    reply_wait_ms: u32,
    usage_wait_ms: u32,
    no_token_wait_ms: u32,
    waiting_reply_from: Option<u8>,
    communication_disabled: bool,
}

impl<const N: usize> PortContext<N> {
    /// Build a port context around an already-addressed [`MstpPortState`].
    #[must_use]
    pub fn new(port: MstpPortState) -> Self {
        let this_station = port.this_station;
        Self {
            receive: ReceiveFsm::new(this_station, crate::mstp::timing::MIN_SILENCE_BITS),
            port,
            tx: Vec::new(),
            out_queue: std::collections::VecDeque::new(),
            in_queue: std::collections::VecDeque::new(),
            since_last_byte_ms: 0,
            reply_wait_ms: 0,
            usage_wait_ms: 0,
            no_token_wait_ms: 0,
            waiting_reply_from: None,
            communication_disabled: false,
        }
    }

    /// Disable (or re-enable) outbound traffic, per `DeviceCommunicationControl`.
    /// Received frames are still processed so token-passing keeps working;
    /// only [`PortContext::send_npdu`] is refused.
    pub fn set_communication_disabled(&mut self, disabled: bool) {
        self.communication_disabled = disabled;
    }

    /// Queue an NPDU (already encoded, including its NPDU prefix) for
    /// transmission to `dst`. Actual transmission happens when this
    /// node next holds the token; bytes appear via [`PortContext::take_tx_bytes`].
    ///
    /// # Errors
    /// [`DatalinkError::TooLarge`] if `npdu` exceeds [`MAX_NPDU_LEN`].
    /// [`DatalinkError::CommunicationDisabled`] if DCC currently forbids it.
    pub fn send_npdu(&mut self, dst: &Address, npdu: &[u8], expecting_reply: bool) -> Result<(), DatalinkError> {
        if self.communication_disabled {
            return Err(DatalinkError::CommunicationDisabled);
        }
        if npdu.len() > N {
            return Err(DatalinkError::TooLarge { len: npdu.len(), max: N });
        }
        let destination = if dst.is_broadcast() { BROADCAST_ADDRESS } else { dst.mstp_station().unwrap_or(BROADCAST_ADDRESS) };
        self.out_queue.push_back(Outbound { destination, expecting_reply, npdu: npdu.to_vec() });
        Ok(())
    }

    /// Feed one octet read off the wire.
    pub fn receive_byte(&mut self, byte: u8) {
        self.since_last_byte_ms = 0;
        match self.receive.step(byte) {
            ReceiveEvent::None => {}
            ReceiveEvent::ReceiveError => {
                warn!("mstp: frame dropped (crc mismatch)");
            }
            ReceiveEvent::FrameComplete { frame_type, destination, source, len } => {
                trace!("mstp: received {frame_type:?} from {source} to {destination} ({len} bytes)");
                self.handle_frame(frame_type, destination, source);
            }
        }
    }

    /// The silence timer elapsed with no further octet; abandon any
    /// in-progress frame reception.
    pub fn silence_elapsed(&mut self) {
        self.receive.timeout();
    }

    fn handle_frame(&mut self, frame_type: FrameType, destination: u8, source: u8) {
        let action = match frame_type {
            FrameType::Token if destination == self.port.this_station => {
                self.waiting_reply_from = None;
                self.port.master.on_token_received(source)
            }
            FrameType::Token => {
                self.port.master.on_overheard_token(source, destination);
                MasterAction::None
            }
            FrameType::PollForMaster => self.port.master.on_poll_for_master_received(destination),
            FrameType::ReplyToPollForMaster => self.port.master.on_reply_to_poll_received(source),
            FrameType::DataExpectingReply | FrameType::DataNotExpectingReply => {
                if self.waiting_reply_from == Some(source) {
                    self.waiting_reply_from = None;
                    self.port.master.on_reply_received();
                }
                if destination == self.port.this_station || destination == BROADCAST_ADDRESS {
                    let payload = self.receive.payload();
                    if !payload.is_empty() {
                        self.in_queue.push_back((Address::mstp(source), payload.to_vec()));
                    }
                }
                MasterAction::None
            }
            FrameType::ReplyPostponed => MasterAction::None,
            _ => MasterAction::None,
        };
        self.apply_action(action);
    }

    fn apply_action(&mut self, action: MasterAction) {
        match action {
            MasterAction::None => {}
            MasterAction::SendData { expecting_reply } => {
                if let Some(ob) = self.out_queue.pop_front() {
                    self.emit_frame(
                        if expecting_reply { FrameType::DataExpectingReply } else { FrameType::DataNotExpectingReply },
                        ob.destination,
                        &ob.npdu,
                    );
                    if expecting_reply {
                        self.waiting_reply_from = Some(ob.destination);
                        self.reply_wait_ms = 0;
                    }
                }
            }
            MasterAction::SendReplyPostponed { destination } => {
                self.emit_frame(FrameType::ReplyPostponed, destination, &[]);
            }
            MasterAction::SendToken { destination } => {
                debug!("mstp: passing token to {destination}");
                self.emit_frame(FrameType::Token, destination, &[]);
                self.usage_wait_ms = 0;
            }
            MasterAction::SendPollForMaster { destination } => {
                self.emit_frame(FrameType::PollForMaster, destination, &[]);
                self.usage_wait_ms = 0;
            }
            MasterAction::SendReplyToPollForMaster { destination } => {
                self.emit_frame(FrameType::ReplyToPollForMaster, destination, &[]);
            }
            MasterAction::GenerateToken => {
                debug!("mstp: generating token (sole master or no-token timeout)");
                self.port.master.on_token_received(self.port.this_station);
            }
        }
    }

    fn emit_frame(&mut self, frame_type: FrameType, destination: u8, data: &[u8]) {
        let header = Header { frame_type, destination, source: self.port.this_station, length: data.len() as u16 };
        let mut buf = [0u8; 8];
        match header.encode(&mut buf) {
            Ok(n) => self.tx.extend_from_slice(&buf[..n]),
            Err(e) => {
                warn!("mstp: failed to encode header: {e}");
                return;
            }
        }
        if !data.is_empty() {
            self.tx.extend_from_slice(data);
            self.tx.extend_from_slice(&crate::mstp::crc::data_crc16(data));
        }
    }

    /// Drain and return any bytes queued for transmission since the last call.
    pub fn take_tx_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Advance time-driven FSM behavior by `elapsed_ms` and report the
    /// next completed inbound NPDU, if one is ready.
    ///
    /// `now_ms` is unused directly (kept for API parity with the TSM's
    /// `poll`, which does need an absolute clock for retry deadlines);
    /// callers that only have a monotonic elapsed delta may pass any
    /// strictly-increasing value.
    pub fn poll(&mut self, now_ms: u64) -> Option<(Address, Vec<u8>)> {
        let _ = now_ms;
        self.since_last_byte_ms += 1;
        if self.since_last_byte_ms >= u32::from(self.receive.silence_threshold_bits()) {
            self.silence_elapsed();
        }

        if self.waiting_reply_from.is_some() {
            self.reply_wait_ms += 1;
            if self.reply_wait_ms >= crate::mstp::timing::TREPLY_TIMEOUT_MS {
                let peer = self.waiting_reply_from.take().unwrap();
                let action = self.port.master.on_reply_timeout(peer);
                self.apply_action(action);
            }
        }

        use crate::mstp::master::MasterState;
        match self.port.master.state() {
            MasterState::UseToken => {
                let has_data = !self.out_queue.is_empty();
                let expecting_reply = self.out_queue.front().is_some_and(|o| o.expecting_reply);
                let action = self.port.master.use_token(has_data, expecting_reply);
                self.apply_action(action);
            }
            MasterState::DoneWithToken => {
                let action = self.port.master.use_token(false, false);
                self.apply_action(action);
            }
            MasterState::PassToken | MasterState::PollForMaster => {
                self.usage_wait_ms += 1;
                if self.usage_wait_ms >= crate::mstp::timing::TUSAGE_TIMEOUT_MS {
                    self.usage_wait_ms = 0;
                    let action = self.port.master.on_usage_timeout();
                    self.apply_action(action);
                }
            }
            MasterState::Idle | MasterState::NoToken => {
                self.no_token_wait_ms += 1;
                if self.no_token_wait_ms >= crate::mstp::timing::TNO_TOKEN_MS {
                    self.no_token_wait_ms = 0;
                    let action = self.port.master.on_no_token_timeout();
                    self.apply_action(action);
                }
            }
            _ => {}
        }

        self.in_queue.pop_front()
    }

    /// The underlying FSM counters, for diagnostics.
    #[must_use]
    pub fn counters(&self) -> &crate::mstp::master::FsmCounters {
        &self.port.master.counters
    }
}

#[cfg(feature = "async")]
impl<const N: usize> PortContext<N> {
    /// Drive this port context from its own `tokio` task, for a
    /// multi-threaded embedding alongside the default single-threaded
    /// poll loop: `tick` is the polling period, `write`
    /// pushes queued TX bytes to the real link, and `on_receive` gets
    /// each completed inbound NPDU. Runs until `write` returns an error.
    pub async fn run_async<W, F>(mut self, tick: std::time::Duration, mut write: W, mut on_receive: F) -> std::io::Result<()>
    where
        W: FnMut(&[u8]) -> std::io::Result<()>,
        F: FnMut(Address, Vec<u8>),
    {
        let mut interval = tokio::time::interval(tick);
        let mut now_ms: u64 = 0;
        loop {
            interval.tick().await;
            now_ms = now_ms.saturating_add(tick.as_millis() as u64);
            if let Some((source, npdu)) = self.poll(now_ms) {
                on_receive(source, npdu);
            }
            let bytes = self.take_tx_bytes();
            if !bytes.is_empty() {
                write(&bytes)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(port: &mut PortContext<64>, bytes: &[u8]) {
        for &b in bytes {
            port.receive_byte(b);
        }
    }

    #[test]
    fn sole_master_generates_its_own_token_after_timeout() {
        let mut port: PortContext<64> = PortContext::new(MstpPortState::fixed(5, 5, 1));
        for _ in 0..crate::mstp::timing::TNO_TOKEN_MS + 1 {
            port.poll(0);
        }
        assert!(port.port.master.is_sole_master());
    }

    #[test]
    fn send_npdu_is_transmitted_once_token_is_held() {
        let mut port: PortContext<64> = PortContext::new(MstpPortState::fixed(5, 5, 1));
        let dst = Address::mstp(9);
        port.send_npdu(&dst, &[1, 2, 3], false).unwrap();
        for _ in 0..crate::mstp::timing::TNO_TOKEN_MS + 1 {
            port.poll(0);
        }
        // Sole master generates its own token, enters UseToken, and the
        // next poll() drains the queued NPDU as a data frame.
        port.poll(0);
        let tx = port.take_tx_bytes();
        assert!(!tx.is_empty());
        assert_eq!(tx[2], FrameType::DataNotExpectingReply.code());
    }

    #[test]
    fn disabled_communication_rejects_send() {
        let mut port: PortContext<64> = PortContext::new(MstpPortState::fixed(5, 5, 1));
        port.set_communication_disabled(true);
        let dst = Address::mstp(9);
        assert!(matches!(port.send_npdu(&dst, &[1], false), Err(DatalinkError::CommunicationDisabled)));
    }

    #[test]
    fn oversized_npdu_is_rejected() {
        let mut port: PortContext<16> = PortContext::new(MstpPortState::fixed(5, 5, 1));
        let dst = Address::mstp(9);
        let big = vec![0u8; 17];
        assert!(matches!(port.send_npdu(&dst, &big, false), Err(DatalinkError::TooLarge { .. })));
    }

    #[test]
    fn received_data_frame_addressed_to_us_surfaces_via_poll() {
        let mut port: PortContext<64> = PortContext::new(MstpPortState::fixed(5, 10, 1));
        let header =
            Header { frame_type: FrameType::DataNotExpectingReply, destination: 5, source: 9, length: 3 };
        let mut buf = [0u8; 8];
        header.encode(&mut buf).unwrap();
        feed(&mut port, &buf);
        feed(&mut port, &[0xAA, 0xBB, 0xCC]);
        feed(&mut port, &crate::mstp::crc::data_crc16(&[0xAA, 0xBB, 0xCC]));
        let got = port.poll(0);
        assert_eq!(got, Some((Address::mstp(9), vec![0xAA, 0xBB, 0xCC])));
    }
}
