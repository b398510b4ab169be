//! Runtime configuration.
//!
//! The core has no required environment variables; these four are
//! optional tunables read by the boundary (demo binaries, datalink
//! adapter setup), never by the codec or service layers themselves.
//! Defaults come from ANSI/ASHRAE 135's suggested values. A malformed
//! value never panics: it's logged and the default is kept.

use std::time::Duration;

/// `APDU_Timeout`, ANSI/ASHRAE 135 default: 6000 ms.
pub const DEFAULT_APDU_TIMEOUT_MS: u32 = 6000;
/// `Number_Of_APDU_Retries`, ANSI/ASHRAE 135 default: 3.
pub const DEFAULT_APDU_RETRIES: u8 = 3;
/// `Nmax_info_frames`, ANSI/ASHRAE 135 default: 1.
pub const DEFAULT_MAX_INFO_FRAMES: u8 = 1;

/// Typed, defaulted view of the environment tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacnetConfig {
    /// `BACNET_IFACE`: datalink interface name, if any.
    pub iface: Option<String>,
    /// `BACNET_APDU_TIMEOUT`, milliseconds.
    pub apdu_timeout_ms: u32,
    /// `BACNET_RETRIES`.
    pub retries: u8,
    /// `BACNET_MAX_INFO_FRAMES`.
    pub max_info_frames: u8,
}

impl Default for BacnetConfig {
    fn default() -> Self {
        Self {
            iface: None,
            apdu_timeout_ms: DEFAULT_APDU_TIMEOUT_MS,
            retries: DEFAULT_APDU_RETRIES,
            max_info_frames: DEFAULT_MAX_INFO_FRAMES,
        }
    }
}

impl BacnetConfig {
    /// The configured APDU timeout as a [`Duration`].
    #[must_use]
    pub fn apdu_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.apdu_timeout_ms))
    }

    /// Read from the process environment, falling back to defaults (and
    /// logging a warning) for any variable that's present but malformed.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.iface = std::env::var("BACNET_IFACE").ok();
        if let Ok(s) = std::env::var("BACNET_APDU_TIMEOUT") {
            match s.parse() {
                Ok(v) => cfg.apdu_timeout_ms = v,
                Err(e) => log::warn!("BACNET_APDU_TIMEOUT={s:?} invalid ({e}), using default"),
            }
        }
        if let Ok(s) = std::env::var("BACNET_RETRIES") {
            match s.parse() {
                Ok(v) => cfg.retries = v,
                Err(e) => log::warn!("BACNET_RETRIES={s:?} invalid ({e}), using default"),
            }
        }
        if let Ok(s) = std::env::var("BACNET_MAX_INFO_FRAMES") {
            match s.parse() {
                Ok(v) => cfg.max_info_frames = v,
                Err(e) => log::warn!("BACNET_MAX_INFO_FRAMES={s:?} invalid ({e}), using default"),
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_suggested_values() {
        let cfg = BacnetConfig::default();
        assert_eq!(cfg.apdu_timeout_ms, 6000);
        assert_eq!(cfg.retries, 3);
        assert_eq!(cfg.max_info_frames, 1);
        assert_eq!(cfg.iface, None);
    }

    #[test]
    fn apdu_timeout_converts_to_duration() {
        let cfg = BacnetConfig::default();
        assert_eq!(cfg.apdu_timeout(), Duration::from_millis(6000));
    }
}
