//! MS/TP master-node FSM: token passing, poll-for-master,
//! reply-postponed, and the sole-master optimization.
//!
//! This FSM decides *when* to send a Token, Poll-For-Master,
//! Reply-To-Poll-For-Master, Reply-Postponed, or a queued data frame; it
//! never constructs wire bytes itself — that's [`super::frame::Header`]'s
//! job, driven from the [`Action`]s this FSM emits. Time is caller-driven:
//! the embedding event loop calls [`MasterNodeFsm::tick`] with the
//! elapsed milliseconds since the last call, and delivers received
//! frames via the `on_*` methods.

/// Master-node FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    /// Waiting to receive the token.
    Idle,
    /// Holding the token, sending queued data frames.
    UseToken,
    /// Sent a frame expecting a reply; waiting for it.
    WaitForReply,
    /// Finished sending data frames for this token hold.
    DoneWithToken,
    /// Token has been handed to `Next_Station`; awaiting confirmation of use.
    PassToken,
    /// Token pass failed twice; searching for a new successor.
    PollForMaster,
    /// Don't currently hold the token and none has been seen recently.
    NoToken,
    /// Answering a data-expecting-reply frame within our own token hold.
    AnswerDataRequest,
}

/// An action the embedding adapter must perform as a result of a
/// [`MasterNodeFsm`] transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,
    /// Send a queued data frame (expecting reply or not) to `Next_Station`
    /// — the caller supplies the actual NPDU bytes.
    SendData { expecting_reply: bool },
    /// Send Reply-Postponed to the station we didn't answer in time.
    SendReplyPostponed { destination: u8 },
    /// Pass the token to this destination.
    SendToken { destination: u8 },
    /// Send Poll-For-Master to this destination.
    SendPollForMaster { destination: u8 },
    /// Reply to a Poll-For-Master addressed to us.
    SendReplyToPollForMaster { destination: u8 },
    /// Generate a token for ourselves (sole-master bootstrap: nobody
    /// answered, so we assume we're alone on the segment).
    GenerateToken,
}

/// Counters read by the application for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsmCounters {
    /// Frames transmitted by this node.
    pub transmit_frame_counter: u64,
    /// Valid frames received.
    pub receive_valid_frame_counter: u64,
    /// Invalid (CRC failure) frames received.
    pub receive_invalid_frame_counter: u64,
    /// Valid frames addressed to neither us nor broadcast.
    pub receive_valid_frame_not_for_us_counter: u64,
    /// PDUs (NPDUs) handed to the datalink for transmission.
    pub transmit_pdu_counter: u64,
    /// PDUs handed up from the datalink to the application.
    pub receive_pdu_counter: u64,
}

/// The MS/TP master-node FSM.
pub struct MasterNodeFsm {
    /// Our own station address.
    pub this_station: u8,
    /// Highest possible master address on this segment.
    pub nmax_master: u8,
    /// Max data frames sent per token hold.
    pub nmax_info_frames: u8,
    /// How many Poll-For-Master cycles between sole-master re-checks.
    pub npoll: u32,

    state: MasterState,
    next_station: u8,
    poll_station: u8,
    sole_master: bool,
    frames_sent_this_hold: u8,
    pass_retry: u8,
    poll_cycles_since_check: u32,
    poll_swept_any: bool,

    pub counters: FsmCounters,
}

impl MasterNodeFsm {
    /// Create a new FSM. Initially in `Idle`, assuming the immediate
    /// successor is ourselves until a token pass or poll discovers a peer.
    #[must_use]
    pub fn new(this_station: u8, nmax_master: u8, nmax_info_frames: u8) -> Self {
        Self {
            this_station,
            nmax_master,
            nmax_info_frames,
            npoll: 50,
            state: MasterState::Idle,
            next_station: this_station,
            poll_station: this_station,
            sole_master: false,
            frames_sent_this_hold: 0,
            pass_retry: 0,
            poll_cycles_since_check: 0,
            poll_swept_any: false,
            counters: FsmCounters::default(),
        }
    }

    /// Current state, for tests/diagnostics.
    #[must_use]
    pub fn state(&self) -> MasterState {
        self.state
    }

    /// Whether we currently believe we're the only master on the segment.
    #[must_use]
    pub fn is_sole_master(&self) -> bool {
        self.sole_master
    }

    /// The station we currently believe is our token-passing successor.
    #[must_use]
    pub fn next_station(&self) -> u8 {
        self.next_station
    }

    fn next_candidate(&self, after: u8) -> u8 {
        if after >= self.nmax_master { 0 } else { after + 1 }
    }

    /// We received the token addressed to us.
    pub fn on_token_received(&mut self, src: u8) -> Action {
        self.counters.receive_valid_frame_counter += 1;
        let _ = src;
        self.state = MasterState::UseToken;
        self.frames_sent_this_hold = 0;
        Action::None
    }

    /// While holding the token: caller reports whether there's data
    /// queued for transmission and whether it expects a reply.
    /// Returns the action to take next.
    pub fn use_token(&mut self, has_queued_data: bool, expecting_reply: bool) -> Action {
        debug_assert_eq!(self.state, MasterState::UseToken);
        if has_queued_data && self.frames_sent_this_hold < self.nmax_info_frames {
            self.frames_sent_this_hold += 1;
            self.counters.transmit_frame_counter += 1;
            self.counters.transmit_pdu_counter += 1;
            if expecting_reply {
                self.state = MasterState::WaitForReply;
            }
            return Action::SendData { expecting_reply };
        }
        self.state = MasterState::DoneWithToken;
        self.pass_token()
    }

    /// A reply to our data-expecting-reply frame arrived.
    pub fn on_reply_received(&mut self) -> Action {
        debug_assert_eq!(self.state, MasterState::WaitForReply);
        self.counters.receive_valid_frame_counter += 1;
        self.counters.receive_pdu_counter += 1;
        self.state = MasterState::UseToken;
        Action::None
    }

    /// `Treply_timeout` elapsed with no reply: send Reply-Postponed and
    /// resume using the token.
    pub fn on_reply_timeout(&mut self, peer: u8) -> Action {
        debug_assert_eq!(self.state, MasterState::WaitForReply);
        self.state = MasterState::UseToken;
        Action::SendReplyPostponed { destination: peer }
    }

    fn pass_token(&mut self) -> Action {
        self.pass_retry = 0;
        self.counters.transmit_frame_counter += 1;
        self.state = MasterState::PassToken;
        Action::SendToken { destination: self.next_station }
    }

    /// `Tusage_timeout` elapsed after passing the token with no sign the
    /// successor took it (no frame at all heard from it).
    pub fn on_usage_timeout(&mut self) -> Action {
        debug_assert!(matches!(self.state, MasterState::PassToken | MasterState::PollForMaster));
        match self.state {
            MasterState::PassToken if self.pass_retry == 0 => {
                self.pass_retry = 1;
                self.counters.transmit_frame_counter += 1;
                Action::SendToken { destination: self.next_station }
            }
            MasterState::PassToken => {
                // Two failures: start (or resume) hunting for a successor.
                self.begin_poll_for_master()
            }
            MasterState::PollForMaster => self.advance_poll(),
            _ => Action::None,
        }
    }

    fn begin_poll_for_master(&mut self) -> Action {
        self.state = MasterState::PollForMaster;
        self.poll_station = self.next_candidate(self.this_station);
        self.poll_swept_any = false;
        self.counters.transmit_frame_counter += 1;
        Action::SendPollForMaster { destination: self.poll_station }
    }

    fn advance_poll(&mut self) -> Action {
        let swept_back_to_self = self.poll_station == self.this_station;
        if swept_back_to_self {
            // Completed a full cycle with no replies: we're alone.
            self.poll_cycles_since_check = 0;
            if !self.poll_swept_any {
                self.sole_master = true;
            }
            self.next_station = self.this_station;
            self.state = MasterState::NoToken;
            return Action::GenerateToken;
        }
        self.poll_station = self.next_candidate(self.poll_station);
        self.counters.transmit_frame_counter += 1;
        Action::SendPollForMaster { destination: self.poll_station }
    }

    /// A peer answered our Poll-For-Master: it becomes our new successor.
    pub fn on_reply_to_poll_received(&mut self, src: u8) -> Action {
        debug_assert_eq!(self.state, MasterState::PollForMaster);
        self.counters.receive_valid_frame_counter += 1;
        self.sole_master = false;
        self.poll_swept_any = true;
        self.next_station = src;
        self.pass_token()
    }

    /// A Poll-For-Master addressed to us while we hold no token: answer it.
    pub fn on_poll_for_master_received(&mut self, dest: u8) -> Action {
        self.counters.receive_valid_frame_counter += 1;
        if dest != self.this_station {
            self.counters.receive_valid_frame_not_for_us_counter += 1;
            return Action::None;
        }
        self.state = MasterState::AnswerDataRequest;
        Action::SendReplyToPollForMaster { destination: dest }
    }

    /// We're in `NoToken` and no traffic was heard for `Tno_token`: claim
    /// sole mastership and generate our own token,
    pub fn on_no_token_timeout(&mut self) -> Action {
        self.sole_master = true;
        self.next_station = self.this_station;
        self.state = MasterState::Idle;
        Action::GenerateToken
    }

    /// We overheard token traffic not addressed to us: stay `Idle`/`NoToken`.
    pub fn on_overheard_token(&mut self, src: u8, dest: u8) {
        self.counters.receive_valid_frame_counter += 1;
        if dest != self.this_station {
            self.counters.receive_valid_frame_not_for_us_counter += 1;
        }
        let _ = src;
        if self.state == MasterState::Idle {
            self.state = MasterState::NoToken;
        }
    }

    /// Sole-master periodic re-check: after `npoll` frame-holds as sole
    /// master, run one more poll cycle in case a peer joined.
    pub fn maybe_recheck_sole_master(&mut self) -> Action {
        if !self.sole_master {
            return Action::None;
        }
        self.poll_cycles_since_check += 1;
        if self.poll_cycles_since_check < self.npoll {
            return Action::None;
        }
        self.begin_poll_for_master()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hold_sends_queued_frames_up_to_nmax_then_passes() {
        let mut fsm = MasterNodeFsm::new(1, 3, 2);
        fsm.next_station = 2;
        assert_eq!(fsm.on_token_received(4), Action::None);
        assert_eq!(fsm.use_token(true, false), Action::SendData { expecting_reply: false });
        assert_eq!(fsm.use_token(true, false), Action::SendData { expecting_reply: false });
        // nmax_info_frames == 2, so the third attempt passes the token.
        assert_eq!(fsm.use_token(true, false), Action::SendToken { destination: 2 });
        assert_eq!(fsm.state(), MasterState::PassToken);
    }

    #[test]
    fn no_queued_data_passes_token_immediately() {
        let mut fsm = MasterNodeFsm::new(1, 3, 2);
        fsm.next_station = 2;
        fsm.on_token_received(0);
        assert_eq!(fsm.use_token(false, false), Action::SendToken { destination: 2 });
    }

    #[test]
    fn reply_timeout_sends_postponed_and_resumes_use_token() {
        let mut fsm = MasterNodeFsm::new(1, 3, 4);
        fsm.on_token_received(0);
        assert_eq!(fsm.use_token(true, true), Action::SendData { expecting_reply: true });
        assert_eq!(fsm.state(), MasterState::WaitForReply);
        assert_eq!(fsm.on_reply_timeout(9), Action::SendReplyPostponed { destination: 9 });
        assert_eq!(fsm.state(), MasterState::UseToken);
    }

    #[test]
    fn double_usage_timeout_starts_poll_for_master() {
        let mut fsm = MasterNodeFsm::new(1, 3, 1);
        fsm.next_station = 2;
        fsm.on_token_received(0);
        fsm.use_token(false, false); // passes token, enters PassToken
        assert_eq!(fsm.on_usage_timeout(), Action::SendToken { destination: 2 }); // retry
        match fsm.on_usage_timeout() {
            Action::SendPollForMaster { .. } => {}
            other => panic!("expected poll for master, got {other:?}"),
        }
        assert_eq!(fsm.state(), MasterState::PollForMaster);
    }

    #[test]
    fn poll_for_master_finds_successor_and_passes_token() {
        let mut fsm = MasterNodeFsm::new(1, 3, 1);
        fsm.next_station = 2;
        fsm.on_token_received(0);
        fsm.use_token(false, false);
        fsm.on_usage_timeout();
        fsm.on_usage_timeout(); // now polling, poll_station == 2
        let action = fsm.on_reply_to_poll_received(2);
        assert_eq!(action, Action::SendToken { destination: 2 });
        assert_eq!(fsm.next_station(), 2);
        assert!(!fsm.is_sole_master());
    }

    #[test]
    fn full_poll_cycle_with_no_replies_declares_sole_master() {
        let mut fsm = MasterNodeFsm::new(1, 2, 1);
        fsm.next_station = 2;
        fsm.on_token_received(0);
        fsm.use_token(false, false);
        fsm.on_usage_timeout(); // retry pass
        fsm.on_usage_timeout(); // begin poll, poll_station = 2
        fsm.on_usage_timeout(); // advance poll, poll_station = 0
        let action = fsm.on_usage_timeout(); // advance poll, poll_station = 1 == this_station
        assert_eq!(action, Action::GenerateToken);
        assert!(fsm.is_sole_master());
    }

    #[test]
    fn poll_for_master_answers_when_addressed_to_us() {
        let mut fsm = MasterNodeFsm::new(5, 10, 1);
        let action = fsm.on_poll_for_master_received(5);
        assert_eq!(action, Action::SendReplyToPollForMaster { destination: 5 });
    }

    #[test]
    fn poll_for_master_ignores_when_not_addressed_to_us() {
        let mut fsm = MasterNodeFsm::new(5, 10, 1);
        assert_eq!(fsm.on_poll_for_master_received(6), Action::None);
        assert_eq!(fsm.counters.receive_valid_frame_not_for_us_counter, 1);
    }

    #[test]
    fn no_token_timeout_generates_token_and_claims_sole_master() {
        let mut fsm = MasterNodeFsm::new(3, 10, 1);
        let action = fsm.on_no_token_timeout();
        assert_eq!(action, Action::GenerateToken);
        assert!(fsm.is_sole_master());
    }
}
