//! Receiver chip interface
//!
//! The register-level Si4735 surface the policy layer drives, expressed as
//! a trait so the tuning runtime stays independent of the bus transport.
//! The concrete I2C implementation lives in [`crate::drivers::si4735`]; the
//! simulation harness in [`crate::sim`] provides a scripted stand-in for
//! host tests.
//!
//! Only the command policy is specified here. Register numbers, property
//! words and patch framing are the driver's business.

use core::fmt;

use heapless::String;

use crate::types::{AgcState, RdsDateTime, RdsStatus, Sideband};

/// Error from a chip transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipError {
    /// I2C transfer failed
    Bus,
    /// The chip did not raise clear-to-send in time
    Timeout,
}

impl fmt::Display for ChipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => f.write_str("chip bus transfer failed"),
            Self::Timeout => f.write_str("chip command timed out"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChipError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Bus => defmt::write!(f, "bus"),
            Self::Timeout => defmt::write!(f, "timeout"),
        }
    }
}

/// Command surface of the receiver chip.
///
/// Every method maps to one conventional tuning/mode/quality command; the
/// components in [`crate::radio`] decide when and with what arguments to
/// invoke them. Frequencies are in the chip's native units (10 kHz for FM,
/// kHz for AM/SSB), matching the band table.
pub trait ReceiverChip {
    /// Power the chip up (or re-power it) for FM or AM-class reception.
    ///
    /// This is the low-level setup call: it performs a hardware reset,
    /// which always clears a previously downloaded SSB patch. Callers must
    /// re-arm their patch-loaded bookkeeping after calling this.
    fn power_up(&mut self, fm: bool) -> Result<(), ChipError>;

    /// Download the SSB patch into chip RAM
    fn load_ssb_patch(&mut self) -> Result<(), ChipError>;

    /// Apply the SSB mode configuration (audio bandwidth index plus the
    /// fixed cutoff/AVC/soft-mute/AFC settings that go with it)
    fn set_ssb_config(&mut self, bandwidth_index: u8) -> Result<(), ChipError>;

    /// Enter FM mode with band limits, starting frequency and step
    fn set_fm(&mut self, min: u16, max: u16, freq: u16, step: u8) -> Result<(), ChipError>;

    /// Enter AM mode with band limits, starting frequency and step
    fn set_am(&mut self, min: u16, max: u16, freq: u16, step: u8) -> Result<(), ChipError>;

    /// Enter SSB mode with band limits, starting frequency, step and sideband
    fn set_ssb(
        &mut self,
        min: u16,
        max: u16,
        freq: u16,
        step: u8,
        sideband: Sideband,
    ) -> Result<(), ChipError>;

    /// Program the BFO offset in Hz (SSB/CW only)
    fn set_ssb_bfo(&mut self, offset_hz: i16) -> Result<(), ChipError>;

    /// Tune to a frequency in the current mode
    fn set_frequency(&mut self, freq: u16) -> Result<(), ChipError>;

    /// Read back the frequency the chip actually landed on
    fn frequency(&mut self) -> Result<u16, ChipError>;

    /// Set the tuning step used by the chip's own seek/step logic
    fn set_frequency_step(&mut self, step: u8) -> Result<(), ChipError>;

    /// Set the antenna tuning capacitor
    fn set_antenna_capacitor(&mut self, cap: u16) -> Result<(), ChipError>;

    /// Set output volume (0-63)
    fn set_volume(&mut self, volume: u8) -> Result<(), ChipError>;

    /// Soft audio mute
    fn set_audio_mute(&mut self, mute: bool) -> Result<(), ChipError>;

    /// Hardware audio mute (external mute circuit)
    fn set_hardware_mute(&mut self, mute: bool) -> Result<(), ChipError>;

    /// FM de-emphasis: true selects 50 us (Europe), false 75 us (USA)
    fn set_fm_deemphasis(&mut self, europe: bool) -> Result<(), ChipError>;

    /// Enable the RDS decoder with a block-error tolerance threshold
    fn set_rds_config(&mut self, enabled: bool, block_error_threshold: u8)
        -> Result<(), ChipError>;

    /// SSB audio bandwidth index (0-5)
    fn set_ssb_audio_bandwidth(&mut self, index: u8) -> Result<(), ChipError>;

    /// SSB sideband cutoff filter: 0 selects the band-pass filter, 1 the
    /// low-pass filter
    fn set_ssb_cutoff_filter(&mut self, mode: u8) -> Result<(), ChipError>;

    /// AM channel filter index (0-6)
    fn set_am_bandwidth(&mut self, index: u8) -> Result<(), ChipError>;

    /// FM channel filter index (0 = automatic)
    fn set_fm_bandwidth(&mut self, index: u8) -> Result<(), ChipError>;

    /// Read received signal quality, returns (RSSI, SNR)
    fn read_signal_quality(&mut self) -> Result<(u8, u8), ChipError>;

    /// Program the AGC: `disabled` plus an attenuation index
    fn set_agc(&mut self, disabled: bool, index: u8) -> Result<(), ChipError>;

    /// Query the chip's current AGC enablement and attenuation index
    fn agc_state(&mut self) -> Result<AgcState, ChipError>;

    /// Refresh and read the RDS decoder status
    fn rds_status(&mut self) -> Result<RdsStatus, ChipError>;

    /// Current program service (station) name, raw as assembled
    fn rds_station_name(&mut self) -> Result<String<8>, ChipError>;

    /// Current program type code (0-31)
    fn rds_program_type(&mut self) -> Result<u8, ChipError>;

    /// Current radio text, raw as assembled
    fn rds_radio_text(&mut self) -> Result<String<64>, ChipError>;

    /// Most recent clock-time group, if one was received
    fn rds_date_time(&mut self) -> Result<Option<RdsDateTime>, ChipError>;

    /// Block for a hardware settle interval.
    ///
    /// Patch loading, antenna capacitor changes and SSB chip-frequency
    /// rollovers need fixed settle times; the driver supplies the delay so
    /// the policy layer stays free of platform timers.
    fn settle_ms(&mut self, ms: u32);
}
