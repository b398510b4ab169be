//! Transaction State Machine: pairs outgoing confirmed
//! requests with their invoke IDs, retries on silence, and matches
//! incoming acks/errors/aborts/rejects/segments back to the originator.

use crate::address::Address;
use crate::error::{AbortReason, RejectReason, TsmError};

/// TSM entry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsmState {
    /// Slot is free.
    Idle,
    /// Waiting for the peer's final reply to a non-segmented request.
    AwaitConfirmation,
    /// We're the segment-receiving side, waiting for the next segment
    /// of a response we're still assembling.
    AwaitResponse,
    /// We're sending a segmented request and tracking the send window.
    SegmentedRequest,
    /// We're receiving a segmented confirmation and tracking reassembly.
    SegmentedConfirmation,
}

/// Segmentation window bookkeeping (SPEC_FULL §4.7): tracks which
/// sequence numbers have arrived so out-of-order segments within a
/// window can be reordered before being handed to the service decoder.
#[derive(Debug, Clone, Default)]
pub struct SegmentWindow {
    /// Negotiated window size (segments the peer may send unacknowledged).
    pub window_size: u8,
    /// Next sequence number we expect to hand to the decoder.
    pub next_sequence: u8,
    /// Segments received out of order, buffered until `next_sequence` catches up.
    pub buffered: Vec<(u8, Vec<u8>)>,
}

impl SegmentWindow {
    /// Accept a newly-arrived segment, returning any segments now ready
    /// to deliver in order (possibly including `segment` itself).
    pub fn accept(&mut self, sequence: u8, data: Vec<u8>) -> Vec<Vec<u8>> {
        if sequence == self.next_sequence {
            let mut ready = vec![data];
            self.next_sequence = self.next_sequence.wrapping_add(1);
            loop {
                let pos = self.buffered.iter().position(|(s, _)| *s == self.next_sequence);
                match pos {
                    Some(idx) => {
                        let (_, d) = self.buffered.remove(idx);
                        ready.push(d);
                        self.next_sequence = self.next_sequence.wrapping_add(1);
                    }
                    None => break,
                }
            }
            ready
        } else {
            if !self.buffered.iter().any(|(s, _)| *s == sequence) {
                self.buffered.push((sequence, data));
            }
            Vec::new()
        }
    }
}

/// One transaction. Indexed by `invoke_id` within [`Tsm`].
#[derive(Debug, Clone)]
pub struct TsmEntry {
    /// Current state.
    pub state: TsmState,
    /// Invoke ID this entry owns.
    pub invoke_id: u8,
    /// The peer this transaction is with.
    pub peer: Address,
    /// Number of retries sent so far.
    pub retry_count: u8,
    /// Milliseconds remaining until the next retry/timeout.
    pub timer_ms: u32,
    /// The original request APDU, kept for retransmission.
    pub pdu: Vec<u8>,
    /// Segmentation bookkeeping, present only in the two segmented states.
    pub segment_window: Option<SegmentWindow>,
}

/// Outcome of a timer tick for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Timer hasn't expired yet.
    Pending,
    /// Expired with retries remaining: caller must retransmit `pdu`.
    Retransmit(Vec<u8>),
    /// Expired with no retries remaining: the transaction is over.
    TimedOut,
}

/// Number of invoke IDs in the rotating pool: at most 256 concurrent
/// outstanding transactions.
pub const MAX_TRANSACTIONS: usize = 256;

/// The transaction state machine. One instance typically serves one
/// datalink/NPDU peer population; invoke IDs are a flat 0..256 pool
/// shared across all peers the TSM currently knows about, exactly as
/// this spec's data model (§3.7) describes it.
pub struct Tsm {
    entries: Vec<Option<TsmEntry>>,
    next_invoke_id: u8,
    apdu_timeout_ms: u32,
    max_retries: u8,
}

impl Tsm {
    /// Create a TSM with the given per-retry timeout and retry budget
    /// (defaults live in [`crate::config::BacnetConfig`]).
    #[must_use]
    pub fn new(apdu_timeout_ms: u32, max_retries: u8) -> Self {
        Self {
            entries: vec![None; MAX_TRANSACTIONS],
            next_invoke_id: 0,
            apdu_timeout_ms,
            max_retries,
        }
    }

    /// Number of transactions currently in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    fn find_free_slot(&self) -> Option<u8> {
        for offset in 0..MAX_TRANSACTIONS {
            let id = self.next_invoke_id.wrapping_add(offset as u8);
            if self.entries[id as usize].is_none() {
                return Some(id);
            }
        }
        None
    }

    /// Begin a new confirmed-request transaction, allocating an invoke
    /// ID and arming the retry timer.
    ///
    /// # Errors
    /// [`TsmError::PoolExhausted`] if all 256 invoke IDs are in use.
    pub fn begin(&mut self, peer: Address, pdu: Vec<u8>) -> Result<u8, TsmError> {
        let id = self.find_free_slot().ok_or(TsmError::PoolExhausted)?;
        self.entries[id as usize] = Some(TsmEntry {
            state: TsmState::AwaitConfirmation,
            invoke_id: id,
            peer,
            retry_count: 0,
            timer_ms: self.apdu_timeout_ms,
            pdu,
            segment_window: None,
        });
        self.next_invoke_id = id.wrapping_add(1);
        Ok(id)
    }

    /// Begin a segmented-request transaction with the given window size.
    ///
    /// # Errors
    /// [`TsmError::PoolExhausted`] if all 256 invoke IDs are in use.
    pub fn begin_segmented(&mut self, peer: Address, pdu: Vec<u8>, window_size: u8) -> Result<u8, TsmError> {
        let id = self.begin(peer, pdu)?;
        if let Some(e) = &mut self.entries[id as usize] {
            e.state = TsmState::SegmentedRequest;
            e.segment_window = Some(SegmentWindow { window_size, next_sequence: 0, buffered: Vec::new() });
        }
        Ok(id)
    }

    /// Look up an entry by invoke ID.
    #[must_use]
    pub fn get(&self, invoke_id: u8) -> Option<&TsmEntry> {
        self.entries[invoke_id as usize].as_ref()
    }

    fn take(&mut self, invoke_id: u8) -> Option<TsmEntry> {
        self.entries[invoke_id as usize].take()
    }

    /// A SimpleAck, ComplexAck (final segment), or BACnet-Error arrived:
    /// release the invoke ID.
    pub fn on_final_reply(&mut self, invoke_id: u8) {
        self.take(invoke_id);
    }

    /// A BACnet-Abort arrived: release the invoke ID immediately, no retry.
    ///
    /// # Errors
    /// [`TsmError::Abort`] describing why, if the invoke ID was known.
    pub fn on_abort(&mut self, invoke_id: u8, reason: AbortReason) -> Result<(), TsmError> {
        if self.take(invoke_id).is_some() {
            Err(TsmError::Abort(reason))
        } else {
            Ok(())
        }
    }

    /// A BACnet-Reject arrived: release the invoke ID immediately, no retry.
    ///
    /// # Errors
    /// [`TsmError::Reject`] describing why, if the invoke ID was known.
    pub fn on_reject(&mut self, invoke_id: u8, reason: RejectReason) -> Result<(), TsmError> {
        if self.take(invoke_id).is_some() {
            Err(TsmError::Reject(reason))
        } else {
            Ok(())
        }
    }

    /// A non-final segment of a segmented response arrived: reorder it
    /// within the window and reset the timer, but keep the transaction open.
    pub fn on_segment(&mut self, invoke_id: u8, sequence: u8, data: Vec<u8>) -> Vec<Vec<u8>> {
        let timeout = self.apdu_timeout_ms;
        if let Some(e) = &mut self.entries[invoke_id as usize] {
            e.timer_ms = timeout;
            e.state = TsmState::SegmentedConfirmation;
            let window = e.segment_window.get_or_insert_with(SegmentWindow::default);
            return window.accept(sequence, data);
        }
        Vec::new()
    }

    /// The caller cancels an in-flight transaction: free the slot and
    /// silently drop any subsequent matching reply.
    pub fn cancel(&mut self, invoke_id: u8) {
        self.take(invoke_id);
    }

    /// Advance every active entry's timer by `elapsed_ms`, returning the
    /// `(invoke_id, outcome)` pairs for entries whose timer expired.
    /// `Retransmit` entries remain active with their retry counter
    /// incremented; `TimedOut` entries are freed.
    pub fn tick(&mut self, elapsed_ms: u32) -> Vec<(u8, TimerOutcome)> {
        let mut out = Vec::new();
        for id in 0..MAX_TRANSACTIONS {
            let expired = match &mut self.entries[id] {
                Some(e) if matches!(e.state, TsmState::AwaitConfirmation | TsmState::SegmentedRequest) => {
                    if e.timer_ms <= elapsed_ms {
                        true
                    } else {
                        e.timer_ms -= elapsed_ms;
                        false
                    }
                }
                _ => continue,
            };
            if !expired {
                continue;
            }
            let max_retries = self.max_retries;
            let timeout_ms = self.apdu_timeout_ms;
            let e = self.entries[id].as_mut().unwrap();
            if e.retry_count < max_retries {
                e.retry_count += 1;
                e.timer_ms = timeout_ms;
                out.push((id as u8, TimerOutcome::Retransmit(e.pdu.clone())));
            } else {
                self.entries[id] = None;
                out.push((id as u8, TimerOutcome::TimedOut));
            }
        }
        out
    }
}
