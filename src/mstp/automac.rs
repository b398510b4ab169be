//! Zero-config MS/TP auto-MAC.
//!
//! A newly attached station with no configured address observes a full
//! poll-for-master cycle before picking a random unused slot, grounded in
//! `original_source/src/bacnet/datalink/automac.c`: per-slot flags track
//! whether a Poll-For-Master has ever targeted a slot, whether a token
//! has ever touched it, and whether anything was ever emitted from it.
//! A slot is free iff PFM has been seen there and nothing else has.

use rand::Rng;

/// Total addressable MS/TP station slots (0..=127 masters, 128..=254 are
/// slave-only; auto-MAC only ever assigns master addresses).
pub const MAC_SLOTS_MAX: usize = 128;

#[derive(Debug, Clone, Copy, Default)]
struct SlotFlags {
    pfm_seen: bool,
    token_seen: bool,
    emitter_seen: bool,
    reserved: bool,
}

/// Tracks per-slot observations during the auto-MAC learning phase and
/// picks a free address once the observation cycle completes.
pub struct AutoMac {
    slots: [SlotFlags; MAC_SLOTS_MAX],
    cycle_complete: bool,
}

impl Default for AutoMac {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoMac {
    /// Start a fresh observation table with no reserved slots.
    #[must_use]
    pub fn new() -> Self {
        Self { slots: [SlotFlags::default(); MAC_SLOTS_MAX], cycle_complete: false }
    }

    /// Mark station addresses below `count` as reserved (unavailable for
    /// auto-assignment), e.g. fixed-address devices on the segment.
    pub fn reserve_range(&mut self, addresses: impl IntoIterator<Item = u8>) {
        for a in addresses {
            if let Some(s) = self.slots.get_mut(a as usize) {
                s.reserved = true;
            }
        }
    }

    fn address_used(&self, mac: u8) -> bool {
        let s = &self.slots[mac as usize];
        s.emitter_seen || s.reserved || s.token_seen
    }

    /// A slot is free iff a PFM was seen there and nothing else was.
    fn free_address_valid(&self, mac: u8) -> bool {
        (mac as usize) < MAC_SLOTS_MAX && self.slots[mac as usize].pfm_seen && !self.address_used(mac)
    }

    /// Observe a Poll-For-Master frame destined for `dest`.
    pub fn observe_pfm(&mut self, dest: u8) {
        if (dest as usize) >= MAC_SLOTS_MAX {
            return;
        }
        if self.slots[dest as usize].pfm_seen && self.free_address_count() > 0 {
            self.cycle_complete = true;
        }
        self.slots[dest as usize].pfm_seen = true;
    }

    /// Observe a token passed from `src` to `dest`.
    pub fn observe_token(&mut self, src: u8, dest: u8) {
        if (src as usize) < MAC_SLOTS_MAX {
            self.slots[src as usize].token_seen = true;
        }
        if (dest as usize) < MAC_SLOTS_MAX {
            self.slots[dest as usize].token_seen = true;
        }
    }

    /// Observe any other frame emitted by `src`.
    pub fn observe_other(&mut self, src: u8) {
        if (src as usize) < MAC_SLOTS_MAX {
            self.slots[src as usize].emitter_seen = true;
        }
    }

    /// True once a full PFM sweep has completed with at least one free
    /// slot, or the caller's own timeout-based completion has been
    /// recorded via [`AutoMac::force_cycle_complete`].
    #[must_use]
    pub fn cycle_complete(&self) -> bool {
        self.cycle_complete
    }

    /// Record that the observation timeout elapsed, regardless of PFM
    /// sweep completeness.
    pub fn force_cycle_complete(&mut self) {
        self.cycle_complete = true;
    }

    /// Number of currently-free slots.
    #[must_use]
    pub fn free_address_count(&self) -> usize {
        (0..MAC_SLOTS_MAX as u8).filter(|&m| self.free_address_valid(m)).count()
    }

    /// The `index`-th free slot in ascending order, or `None` if there
    /// are fewer than `index + 1` free slots.
    #[must_use]
    pub fn free_address_mac(&self, index: usize) -> Option<u8> {
        (0..MAC_SLOTS_MAX as u8).filter(|&m| self.free_address_valid(m)).nth(index)
    }

    /// Choose a free address uniformly at random, or `None` if none free
    /// (the caller should remain silent and continue observing).
    pub fn choose_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u8> {
        let count = self.free_address_count();
        if count == 0 {
            return None;
        }
        self.free_address_mac(rng.random_range(0..count))
    }
}

/// `Tno_token` silence timeout for a station at `address`, extended by
/// `address * Tslot` to break symmetry between zero-config nodes that
/// pick addresses simultaneously.
#[must_use]
pub fn no_token_timeout_ms(base_tno_token_ms: u32, address: u8, tslot_ms: u32) -> u32 {
    base_tno_token_ms + u32::from(address) * tslot_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn full_pfm_sweep_except_65_leaves_65_free() {
        let mut am = AutoMac::new();
        for dest in 32u8..127 {
            if dest == 65 {
                continue;
            }
            am.observe_pfm(dest);
            am.observe_other(dest);
        }
        am.observe_pfm(65);
        assert!(am.free_address_count() > 0);
        assert_eq!(am.free_address_mac(0), Some(65));
    }

    #[test]
    fn used_slot_is_not_free_even_with_pfm() {
        let mut am = AutoMac::new();
        am.observe_pfm(10);
        am.observe_other(10);
        assert!(!am.free_address_valid(10));
    }

    #[test]
    fn token_seen_marks_slot_used() {
        let mut am = AutoMac::new();
        am.observe_pfm(20);
        am.observe_token(20, 21);
        assert!(!am.free_address_valid(20));
        am.observe_pfm(21);
        assert!(!am.free_address_valid(21));
    }

    #[test]
    fn reserved_slots_are_never_free() {
        let mut am = AutoMac::new();
        am.reserve_range([5]);
        am.observe_pfm(5);
        assert!(!am.free_address_valid(5));
    }

    #[test]
    fn no_free_slots_returns_none() {
        let am = AutoMac::new();
        assert_eq!(am.free_address_count(), 0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(am.choose_random(&mut rng), None);
    }

    #[test]
    fn choose_random_picks_a_free_slot() {
        let mut am = AutoMac::new();
        am.observe_pfm(3);
        am.observe_pfm(4);
        let mut rng = StdRng::seed_from_u64(42);
        let chosen = am.choose_random(&mut rng).unwrap();
        assert!(chosen == 3 || chosen == 4);
    }

    #[test]
    fn time_slot_breaks_symmetry_by_address() {
        assert!(no_token_timeout_ms(500, 10, 10) > no_token_timeout_ms(500, 1, 10));
    }
}
