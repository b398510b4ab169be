//! Network addresses and packed object identifiers.

use crate::error::CodecError;

/// Maximum length of a raw MAC address we store inline.
pub const MAX_MAC_LEN: usize = 7;

/// A BACnet address: a 16-bit net number plus up to 7 bytes of opaque MAC.
///
/// A zero-length `mac` denotes local broadcast. `network == 0` is local,
/// `network == 0xFFFF` is global broadcast. An address may additionally
/// carry a routed source/destination tuple, used when the NPDU crossed a
/// BACnet router; `route` is `None` for directly-connected peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Net number, or 0 for local / 0xFFFF for global broadcast.
    pub network: u16,
    /// Opaque MAC bytes (1 for MS/TP, 6 for IPv4+port, 6 for Ethernet, 3 for IPv6 VMAC).
    mac: [u8; MAX_MAC_LEN],
    /// Number of valid bytes in `mac`.
    mac_len: u8,
    /// Routed source/destination, if this address was reached via a router.
    pub route: Option<RouteSpec>,
}

/// The optional routed source/destination carried by a multi-hop NPDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteSpec {
    /// Remote network number.
    pub net: u16,
    /// Remote MAC, opaque.
    mac: [u8; MAX_MAC_LEN],
    /// Number of valid bytes in `mac`.
    mac_len: u8,
}

impl RouteSpec {
    /// Build a route spec from a net number and MAC slice.
    ///
    /// # Errors
    /// Returns [`CodecError::ValueOutOfRange`] if `mac` is longer than
    /// [`MAX_MAC_LEN`].
    pub fn new(net: u16, mac: &[u8]) -> Result<Self, CodecError> {
        if mac.len() > MAX_MAC_LEN {
            return Err(CodecError::ValueOutOfRange { what: "route mac too long" });
        }
        let mut buf = [0u8; MAX_MAC_LEN];
        buf[..mac.len()].copy_from_slice(mac);
        Ok(Self { net, mac: buf, mac_len: mac.len() as u8 })
    }

    /// The MAC bytes.
    #[must_use]
    pub fn mac(&self) -> &[u8] {
        &self.mac[..self.mac_len as usize]
    }
}

impl Address {
    /// Local broadcast address (network 0, empty MAC).
    #[must_use]
    pub fn local_broadcast() -> Self {
        Self { network: 0, mac: [0; MAX_MAC_LEN], mac_len: 0, route: None }
    }

    /// Global broadcast address (network 0xFFFF, empty MAC).
    #[must_use]
    pub fn global_broadcast() -> Self {
        Self { network: 0xFFFF, mac: [0; MAX_MAC_LEN], mac_len: 0, route: None }
    }

    /// Build an address from a net number and MAC slice.
    ///
    /// # Errors
    /// Returns [`CodecError::ValueOutOfRange`] if `mac` is longer than
    /// [`MAX_MAC_LEN`].
    pub fn new(network: u16, mac: &[u8]) -> Result<Self, CodecError> {
        if mac.len() > MAX_MAC_LEN {
            return Err(CodecError::ValueOutOfRange { what: "mac too long" });
        }
        let mut buf = [0u8; MAX_MAC_LEN];
        buf[..mac.len()].copy_from_slice(mac);
        Ok(Self { network, mac: buf, mac_len: mac.len() as u8, route: None })
    }

    /// Build a single-byte MS/TP address.
    #[must_use]
    pub fn mstp(station: u8) -> Self {
        Self { network: 0, mac: [station, 0, 0, 0, 0, 0, 0], mac_len: 1, route: None }
    }

    /// The MAC bytes.
    #[must_use]
    pub fn mac(&self) -> &[u8] {
        &self.mac[..self.mac_len as usize]
    }

    /// True if `mac` is empty, i.e. this address denotes a broadcast.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.mac_len == 0
    }

    /// The MS/TP station byte, if this is a one-byte MS/TP address.
    #[must_use]
    pub fn mstp_station(&self) -> Option<u8> {
        if self.mac_len == 1 { Some(self.mac[0]) } else { None }
    }
}

/// BACnet object type, the upper 10 bits of an [`ObjectId`].
pub type ObjectType = u16;

/// Instance number, the wildcard sentinel for "this device".
pub const INSTANCE_WILDCARD: u32 = 0x3F_FFFF;

/// Maximum representable instance number (22 bits).
pub const MAX_INSTANCE: u32 = 0x3F_FFFF;

/// A packed 32-bit BACnet object identifier.
///
/// `(object_type << 22) | instance`, with `object_type` in `0..1024` and
/// `instance` in `0..=4_194_303`. `instance == 4_194_303` is the
/// "wildcard: this device" sentinel, modeled here as the same packed
/// value but exposed separately via [`ObjectId::is_wildcard_instance`]
/// rather than as an `Option`, since the wildcard is itself a valid wire
/// value that round-trips like any other instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    packed: u32,
}

impl ObjectId {
    /// Build an object identifier, masking `object_type` to 10 bits and
    /// `instance` to 22 bits (the wire layout is authoritative; values
    /// that don't fit are truncated, matching minimum-width integer
    /// encode elsewhere in the codec).
    #[must_use]
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        let packed = (u32::from(object_type) & 0x3FF) << 22 | (instance & MAX_INSTANCE);
        Self { packed }
    }

    /// Build directly from the packed 32-bit wire representation.
    #[must_use]
    pub fn from_packed(packed: u32) -> Self {
        Self { packed }
    }

    /// The packed 32-bit wire representation.
    #[must_use]
    pub fn packed(&self) -> u32 {
        self.packed
    }

    /// The object type (upper 10 bits).
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        ((self.packed >> 22) & 0x3FF) as ObjectType
    }

    /// The instance number (lower 22 bits).
    #[must_use]
    pub fn instance(&self) -> u32 {
        self.packed & MAX_INSTANCE
    }

    /// True if the instance is the "this device" wildcard (4 194 303).
    #[must_use]
    pub fn is_wildcard_instance(&self) -> bool {
        self.instance() == INSTANCE_WILDCARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_round_trips_fields() {
        let id = ObjectId::new(8, 12345);
        assert_eq!(id.object_type(), 8);
        assert_eq!(id.instance(), 12345);
        assert!(!id.is_wildcard_instance());
    }

    #[test]
    fn object_id_wildcard_instance() {
        let id = ObjectId::new(8, INSTANCE_WILDCARD);
        assert!(id.is_wildcard_instance());
    }

    #[test]
    fn object_id_packed_matches_wire_layout() {
        let id = ObjectId::new(8, 0);
        assert_eq!(id.packed(), 8u32 << 22);
    }

    #[test]
    fn object_id_truncates_oversized_type() {
        // object_type only has 10 bits on the wire.
        let id = ObjectId::new(0xFFFF, 0);
        assert_eq!(id.object_type(), 0x3FF);
    }

    #[test]
    fn address_mstp_round_trips_station() {
        let a = Address::mstp(42);
        assert_eq!(a.mstp_station(), Some(42));
        assert!(!a.is_broadcast());
    }

    #[test]
    fn address_broadcast_has_empty_mac() {
        assert!(Address::local_broadcast().is_broadcast());
        assert!(Address::global_broadcast().is_broadcast());
    }

    #[test]
    fn address_rejects_oversized_mac() {
        let mac = [0u8; MAX_MAC_LEN + 1];
        assert!(Address::new(0, &mac).is_err());
    }
}
