//! Shared types used across the receiver firmware
//!
//! Domain types for band classification, demodulation modes, gain control
//! and signal quality. These enforce the valid-value invariants at compile
//! time wherever the persisted byte encodings allow it.

use core::fmt;

/// Band class of a receivable band
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandKind {
    /// FM broadcast (87.5 - 108 MHz)
    Fm,
    /// Medium wave
    Mw,
    /// Shortwave
    Sw,
    /// Long wave
    Lw,
}

impl BandKind {
    /// Stored byte value (stable, part of the persisted layout)
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Fm => 0,
            Self::Mw => 1,
            Self::Sw => 2,
            Self::Lw => 3,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BandKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Fm => defmt::write!(f, "FM"),
            Self::Mw => defmt::write!(f, "MW"),
            Self::Sw => defmt::write!(f, "SW"),
            Self::Lw => defmt::write!(f, "LW"),
        }
    }
}

/// Demodulation scheme
///
/// The discriminants match the persisted byte encoding; `0` doubles as the
/// unset sentinel in stored band data (FM only ever legitimately appears on
/// the FM band, whose preferred mode is FM, so the ambiguity is harmless).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DemodMode {
    /// Frequency modulation
    #[default]
    Fm,
    /// Lower sideband
    Lsb,
    /// Upper sideband
    Usb,
    /// Amplitude modulation
    Am,
    /// Continuous wave (received as USB plus a tone-frequency BFO offset)
    Cw,
}

impl DemodMode {
    /// Stored byte value (stable, part of the persisted layout)
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Fm => 0,
            Self::Lsb => 1,
            Self::Usb => 2,
            Self::Am => 3,
            Self::Cw => 4,
        }
    }

    /// Decode a stored byte value, out-of-range input degrades to FM
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Lsb,
            2 => Self::Usb,
            3 => Self::Am,
            4 => Self::Cw,
            _ => Self::Fm,
        }
    }

    /// Short display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fm => "FM",
            Self::Lsb => "LSB",
            Self::Usb => "USB",
            Self::Am => "AM",
            Self::Cw => "CW",
        }
    }

    /// True for LSB, USB and CW (everything that needs the SSB patch)
    #[must_use]
    pub const fn is_ssb_or_cw(self) -> bool {
        matches!(self, Self::Lsb | Self::Usb | Self::Cw)
    }

    /// The sideband the chip demodulates in this mode.
    ///
    /// CW maps to USB: CW signals come through better in the upper
    /// sideband with a positive frequency offset.
    #[must_use]
    pub const fn sideband(self) -> Option<Sideband> {
        match self {
            Self::Lsb => Some(Sideband::Lower),
            Self::Usb | Self::Cw => Some(Sideband::Upper),
            Self::Fm | Self::Am => None,
        }
    }
}

impl fmt::Display for DemodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DemodMode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.label());
    }
}

/// Demodulation modes selectable on the non-FM bands
pub const AM_DEMOD_MODES: [DemodMode; 4] = [
    DemodMode::Lsb,
    DemodMode::Usb,
    DemodMode::Am,
    DemodMode::Cw,
];

/// Sideband selection for the chip's SSB mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sideband {
    /// Lower sideband
    Lower,
    /// Upper sideband
    Upper,
}

/// AGC operating mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AgcMode {
    /// AGC disabled, zero attenuation
    Off,
    /// Fully automatic gain control
    #[default]
    Automatic,
    /// AGC disabled, explicit attenuation index from configuration
    Manual,
}

impl AgcMode {
    /// Stored byte value (stable, part of the persisted layout)
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Automatic => 1,
            Self::Manual => 2,
        }
    }

    /// Decode a stored byte value, out-of-range input degrades to automatic
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Off,
            2 => Self::Manual,
            _ => Self::Automatic,
        }
    }

    /// Short display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Automatic => "Auto",
            Self::Manual => "Manual",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AgcMode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.label());
    }
}

/// Which signal quality metric the squelch threshold is compared against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SquelchBasis {
    /// Signal-to-noise ratio (default)
    #[default]
    Snr,
    /// Received signal strength
    Rssi,
}

impl SquelchBasis {
    /// Short display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Snr => "SNR",
            Self::Rssi => "RSSI",
        }
    }
}

/// One RSSI/SNR reading pulled from the chip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalQualitySample {
    /// RSSI in dBuV (0-127)
    pub rssi: u8,
    /// SNR in dB (0-127)
    pub snr: u8,
    /// Control-loop timestamp of the read
    pub timestamp_ms: u32,
    /// False until the first successful chip read
    pub valid: bool,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SignalQualitySample {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "RSSI {} SNR {}", self.rssi, self.snr);
    }
}

/// Chip-side AGC state as reported by the receiver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgcState {
    /// AGC currently enabled on the chip
    pub enabled: bool,
    /// Attenuation index currently applied
    pub index: u8,
}

/// RDS synchronisation status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RdsStatus {
    /// A group was received since the last status read
    pub received: bool,
    /// Decoder is currently synchronised
    pub sync: bool,
    /// Synchronisation was found
    pub sync_found: bool,
}

impl RdsStatus {
    /// True when the decoder has usable reception
    #[must_use]
    pub const fn usable(self) -> bool {
        self.received && self.sync && self.sync_found
    }
}

/// Clock-time broadcast in RDS group 4A
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RdsDateTime {
    /// Four-digit year
    pub year: u16,
    /// Month 1-12
    pub month: u8,
    /// Day 1-31
    pub day: u8,
    /// Hour 0-23
    pub hour: u8,
    /// Minute 0-59
    pub minute: u8,
}

/// Millisecond timeout check with wrap protection.
///
/// A `now` behind `since` means the millisecond counter wrapped; the
/// timeout is then reported as elapsed so no timer can stall for a full
/// wrap period.
#[must_use]
pub fn timeout_elapsed(now_ms: u32, since_ms: u32, interval_ms: u32) -> bool {
    now_ms < since_ms || now_ms - since_ms >= interval_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demod_round_trips_through_byte_encoding() {
        for mode in [
            DemodMode::Fm,
            DemodMode::Lsb,
            DemodMode::Usb,
            DemodMode::Am,
            DemodMode::Cw,
        ] {
            assert_eq!(DemodMode::from_u8(mode.as_u8()), mode);
        }
    }

    #[test]
    fn invalid_demod_byte_degrades_to_fm() {
        assert_eq!(DemodMode::from_u8(200), DemodMode::Fm);
    }

    #[test]
    fn cw_demodulates_as_upper_sideband() {
        assert_eq!(DemodMode::Cw.sideband(), Some(Sideband::Upper));
    }

    #[test]
    fn timeout_handles_counter_wrap() {
        assert!(timeout_elapsed(10, u32::MAX - 5, 1000));
        assert!(!timeout_elapsed(500, 0, 1000));
        assert!(timeout_elapsed(1000, 0, 1000));
    }
}
