//! System configuration and constants
//!
//! Compile-time parameters of the receiver runtime plus the persisted
//! configuration record. The record's compiled-in defaults are what the
//! storage layer falls back to whenever the stored image fails its CRC
//! check.

use crate::store::persist::{ByteReader, ByteWriter, Persist};
use crate::types::{AgcMode, SquelchBasis};

/// Emulated EEPROM size in bytes
pub const EEPROM_SIZE: usize = 4096;

/// Signal quality cache window
pub const SIGNAL_CACHE_TIMEOUT_MS: u32 = 1_000;

/// Squelch must stay below threshold this long before muting engages
pub const SQUELCH_DECAY_MS: u32 = 500;

/// Squelch threshold range; 0 disables squelch entirely
pub const SQUELCH_MAX: u8 = 50;

/// RDS poll interval while data is unstable
pub const RDS_UPDATE_INTERVAL_FAST_MS: u32 = 1_000;

/// RDS poll interval once a valid station has been confirmed
pub const RDS_UPDATE_INTERVAL_SLOW_MS: u32 = 3_000;

/// An RDS record with no valid update for this long counts as no reception
pub const RDS_DATA_TIMEOUT_MS: u32 = 120_000;

/// Fixed settle time after a pipeline stop before the next configure; DMA
/// teardown on the sampling core needs this, it is not a polled handshake
pub const PIPELINE_STOP_SETTLE_MS: u32 = 20;

/// Hardware mute hold time during SSB retunes
pub const SSB_MUTE_HOLD_MS: u32 = 5;

/// Volume range of the receiver chip
pub const VOLUME_MAX: u8 = 63;

/// On-chip frequency step in SSB/CW; fine movement happens via the BFO
pub const SSB_CHIP_STEP: u8 = 1;

/// Accumulated BFO travel that rolls over into a 16-unit chip retune
pub const SSB_FINE_ROLLOVER_HZ: i16 = 16_000;

/// Manual BFO offset limit in Hz
pub const BFO_MANUAL_LIMIT_HZ: i16 = 999;

/// Maximum AGC attenuation index on FM (LNA range)
pub const AGC_MAX_ATTENUATION_FM: u8 = 26;

/// Maximum AGC attenuation index on AM/SSB
pub const AGC_MAX_ATTENUATION_AM: u8 = 37;

/// Persisted receiver configuration.
///
/// One flat record at a fixed storage address; every field the tuning
/// runtime needs to survive a power cycle, nothing the view layer can
/// derive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadioConfig {
    /// Currently selected band (index into the band catalog)
    pub current_band_idx: u8,

    /// AM channel filter index
    pub bw_idx_am: u8,
    /// FM channel filter index
    pub bw_idx_fm: u8,
    /// SSB/CW audio bandwidth index
    pub bw_idx_ssb: u8,

    /// Step table index for MW/LW bands
    pub step_idx_mw: u8,
    /// Step table index for SW bands
    pub step_idx_am: u8,
    /// Step table index for FM
    pub step_idx_fm: u8,

    /// Squelch threshold; 0 disables squelch
    pub squelch_level: u8,
    /// Metric the squelch threshold applies to
    pub squelch_basis: SquelchBasis,

    /// RDS decoding enabled
    pub rds_enabled: bool,

    /// Output volume (0-63)
    pub volume: u8,

    /// AGC operating mode
    pub agc_mode: AgcMode,
    /// Attenuation index applied in manual AGC mode
    pub agc_manual_index: u8,

    /// CW receive tone offset in Hz (BFO base offset in CW mode)
    pub cw_tone_freq_hz: u16,
    /// RTTY mark frequency handed to the audio pipeline
    pub rtty_mark_freq_hz: u16,
    /// RTTY shift handed to the audio pipeline
    pub rtty_shift_hz: u16,

    /// Audio FFT gain on AM screens: -1.0 disabled, 0.0 auto, >0 manual
    pub audio_gain_am: f32,
    /// Audio FFT gain on FM screens: -1.0 disabled, 0.0 auto, >0 manual
    pub audio_gain_fm: f32,

    /// Last audio visualisation mode on AM screens
    pub audio_mode_am: u8,
    /// Last audio visualisation mode on FM screens
    pub audio_mode_fm: u8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            current_band_idx: 0, // FM

            bw_idx_am: 0,  // 6.0 kHz
            bw_idx_fm: 0,  // automatic
            bw_idx_ssb: 0, // 1.2 kHz

            step_idx_mw: 2, // 9 kHz
            step_idx_am: 1, // 5 kHz
            step_idx_fm: 1, // 100 kHz

            squelch_level: 0,
            squelch_basis: SquelchBasis::Snr,

            rds_enabled: true,

            volume: 50,

            agc_mode: AgcMode::Automatic,
            agc_manual_index: 1,

            cw_tone_freq_hz: 850,
            rtty_mark_freq_hz: 1000,
            rtty_shift_hz: 170,

            audio_gain_am: 0.0,
            audio_gain_fm: 0.0,

            audio_mode_am: 1,
            audio_mode_fm: 1,
        }
    }
}

impl Persist for RadioConfig {
    const ENCODED_LEN: usize = 29;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = ByteWriter::new(buf);
        w.put_u8(self.current_band_idx);
        w.put_u8(self.bw_idx_am);
        w.put_u8(self.bw_idx_fm);
        w.put_u8(self.bw_idx_ssb);
        w.put_u8(self.step_idx_mw);
        w.put_u8(self.step_idx_am);
        w.put_u8(self.step_idx_fm);
        w.put_u8(self.squelch_level);
        w.put_bool(matches!(self.squelch_basis, SquelchBasis::Rssi));
        w.put_bool(self.rds_enabled);
        w.put_u8(self.volume);
        w.put_u8(self.agc_mode.as_u8());
        w.put_u8(self.agc_manual_index);
        w.put_u16(self.cw_tone_freq_hz);
        w.put_u16(self.rtty_mark_freq_hz);
        w.put_u16(self.rtty_shift_hz);
        w.put_f32(self.audio_gain_am);
        w.put_f32(self.audio_gain_fm);
        w.put_u8(self.audio_mode_am);
        w.put_u8(self.audio_mode_fm);
    }

    fn decode(buf: &[u8]) -> Self {
        let mut r = ByteReader::new(buf);
        Self {
            current_band_idx: r.take_u8(),
            bw_idx_am: r.take_u8(),
            bw_idx_fm: r.take_u8(),
            bw_idx_ssb: r.take_u8(),
            step_idx_mw: r.take_u8(),
            step_idx_am: r.take_u8(),
            step_idx_fm: r.take_u8(),
            squelch_level: r.take_u8(),
            squelch_basis: if r.take_bool() {
                SquelchBasis::Rssi
            } else {
                SquelchBasis::Snr
            },
            rds_enabled: r.take_bool(),
            volume: r.take_u8(),
            agc_mode: AgcMode::from_u8(r.take_u8()),
            agc_manual_index: r.take_u8(),
            cw_tone_freq_hz: r.take_u16(),
            rtty_mark_freq_hz: r.take_u16(),
            rtty_shift_hz: r.take_u16(),
            audio_gain_am: r.take_f32(),
            audio_gain_fm: r.take_f32(),
            audio_mode_am: r.take_u8(),
            audio_mode_fm: r.take_u8(),
        }
    }
}
