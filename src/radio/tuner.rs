//! Tuning state machine
//!
//! Orchestrates band and demodulation switches: one-time SSB patch
//! loading, BFO base-offset selection (CW tone vs. zero), frequency-step
//! bookkeeping, antenna-capacitor defaulting and the final commit to the
//! receiver chip. Every invalid persisted index is clamped to 0 and the
//! correction written back; nothing in this component is a fatal
//! condition.
//!
//! In SSB/CW the on-chip step is pinned to 1 kHz and all fine movement
//! happens through the BFO offset; the net BFO committed to the chip is
//! always `base + coarse + manual`.

use log::{debug, warn};

use crate::band::{default_ant_cap, BandCatalog, STEP_AM, STEP_FM};
use crate::chip::{ChipError, ReceiverChip};
use crate::config::{
    RadioConfig, BFO_MANUAL_LIMIT_HZ, SSB_CHIP_STEP, SSB_FINE_ROLLOVER_HZ,
};
use crate::radio::runtime::RuntimeContext;
use crate::radio::signal::SignalQualityCache;
use crate::store::stations::StationEntry;
use crate::types::{BandKind, DemodMode, Sideband};

/// RDS block-error tolerance programmed on FM entry
const RDS_BLOCK_ERROR_THRESHOLD: u8 = 2;

/// Settle after the antenna capacitor is set
const ANT_CAP_SETTLE_MS: u32 = 100;

/// Settle after an SSB chip-frequency rollover
const SSB_ROLLOVER_SETTLE_MS: u32 = 10;

/// Band/demodulation commit engine.
///
/// The only state held here is the sticky patch-loaded flag: once the SSB
/// patch is downloaded it survives until the next hardware reset, which is
/// detected by re-running the chip power-up (power-up always clears the
/// patch, so it must re-arm the flag).
#[derive(Clone, Copy, Debug, Default)]
pub struct TuningStateMachine {
    ssb_loaded: bool,
}

impl TuningStateMachine {
    /// Fresh state machine; no patch loaded
    #[must_use]
    pub const fn new() -> Self {
        Self { ssb_loaded: false }
    }

    /// True while the SSB patch is resident in chip RAM
    #[must_use]
    pub const fn ssb_patch_loaded(&self) -> bool {
        self.ssb_loaded
    }

    /// Power the chip up for the current band's class.
    ///
    /// The hardware reset inside power-up clears any downloaded patch, so
    /// the patch flag is re-armed here unconditionally.
    pub fn power_up<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &BandCatalog,
        config: &RadioConfig,
    ) -> Result<(), ChipError> {
        let band = catalog.get(config.current_band_idx);
        debug!("tuner: power up for {} band", band.name);
        chip.power_up(band.kind == BandKind::Fm)?;
        self.ssb_loaded = false;
        Ok(())
    }

    /// Commit the current band and demodulation mode to the chip.
    ///
    /// With `use_defaults` the antenna capacitor is refreshed from the
    /// band-class default instead of the stored value.
    pub fn band_set<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &mut BandCatalog,
        config: &mut RadioConfig,
        rt: &mut RuntimeContext,
        use_defaults: bool,
    ) -> Result<(), ChipError> {
        let band = catalog.get(config.current_band_idx);
        let demod = band.curr_demod;
        debug!(
            "tuner: band set {} freq {} demod {} antCap {}",
            band.name, band.curr_freq, demod, band.ant_cap
        );

        match demod {
            DemodMode::Fm | DemodMode::Am => self.ssb_loaded = false,
            DemodMode::Lsb | DemodMode::Usb | DemodMode::Cw => {
                if !self.ssb_loaded {
                    self.load_ssb(chip, config)?;
                }
            }
        }

        // Entering CW with a bandwidth that is not one of the CW band-pass
        // filters: correct to the 1.0 kHz band-pass (index 5)
        if demod == DemodMode::Cw && config.bw_idx_ssb != 4 && config.bw_idx_ssb != 5 {
            config.bw_idx_ssb = 5;
            rt.config_dirty = true;
        }

        self.use_band(chip, catalog, config, rt, use_defaults)?;
        self.set_af_bandwidth(chip, catalog, config)
    }

    /// One-time SSB patch download; a no-op while the flag is sticky
    fn load_ssb<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        config: &RadioConfig,
    ) -> Result<(), ChipError> {
        if self.ssb_loaded {
            return Ok(());
        }
        debug!("tuner: downloading SSB patch");
        chip.load_ssb_patch()?;
        chip.set_ssb_config(config.bw_idx_ssb)?;
        self.ssb_loaded = true;
        Ok(())
    }

    /// Program band limits, frequency, step and mode into the chip
    fn use_band<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &mut BandCatalog,
        config: &mut RadioConfig,
        rt: &mut RuntimeContext,
        use_defaults: bool,
    ) -> Result<(), ChipError> {
        let band_idx = config.current_band_idx;
        let kind = catalog.get(band_idx).kind;

        // Validate the persisted step index for the band class; an
        // out-of-range index is clamped to 0 and the correction persisted
        let step = match kind {
            BandKind::Mw | BandKind::Lw => {
                if usize::from(config.step_idx_mw) >= STEP_AM.len() {
                    warn!("tuner: invalid MW step index {}, using default", config.step_idx_mw);
                    config.step_idx_mw = 0;
                    rt.config_dirty = true;
                }
                STEP_AM[usize::from(config.step_idx_mw)].value
            }
            BandKind::Sw => {
                if usize::from(config.step_idx_am) >= STEP_AM.len() {
                    warn!("tuner: invalid AM step index {}, using default", config.step_idx_am);
                    config.step_idx_am = 0;
                    rt.config_dirty = true;
                }
                STEP_AM[usize::from(config.step_idx_am)].value
            }
            BandKind::Fm => {
                if usize::from(config.step_idx_fm) >= STEP_FM.len() {
                    warn!("tuner: invalid FM step index {}, using default", config.step_idx_fm);
                    config.step_idx_fm = 0;
                    rt.config_dirty = true;
                }
                STEP_FM[usize::from(config.step_idx_fm)].value
            }
        };

        let Some(band) = catalog.get_mut(band_idx) else {
            return Ok(());
        };
        band.curr_step = step;

        if kind == BandKind::Fm {
            self.ssb_loaded = false;
            rt.bfo_enabled = false;

            chip.set_fm(band.minimum_freq, band.maximum_freq, band.curr_freq, band.curr_step)?;
            chip.set_fm_deemphasis(true)?;
            chip.set_rds_config(config.rds_enabled, RDS_BLOCK_ERROR_THRESHOLD)?;
        } else if self.ssb_loaded {
            let is_cw = band.curr_demod == DemodMode::Cw;
            let sideband = band.curr_demod.sideband().unwrap_or(Sideband::Upper);

            chip.set_ssb(
                band.minimum_freq,
                band.maximum_freq,
                band.curr_freq,
                SSB_CHIP_STEP,
                sideband,
            )?;

            // CW: fixed tone offset plus manual fine tuning
            let base = if is_cw { config.cw_tone_freq_hz as i16 } else { 0 };
            chip.set_ssb_bfo(base + rt.bfo_coarse_hz + rt.bfo_manual_hz)?;
            rt.cw_shift = is_cw;

            // Fine movement happens through the BFO, the chip step stays 1
            band.curr_step = SSB_CHIP_STEP;
            chip.set_frequency_step(SSB_CHIP_STEP)?;
        } else {
            chip.set_am(band.minimum_freq, band.maximum_freq, band.curr_freq, band.curr_step)?;
            rt.bfo_enabled = false;
            rt.cw_shift = false;
        }

        if use_defaults {
            band.ant_cap = default_ant_cap(kind);
        }
        chip.set_antenna_capacitor(band.ant_cap)?;
        chip.settle_ms(ANT_CAP_SETTLE_MS);

        // Mode entry lifts the chip's own mute; re-assert the requested
        // state so a muted radio stays muted across a band switch
        chip.set_hardware_mute(rt.muted)?;
        chip.set_audio_mute(rt.muted)?;

        Ok(())
    }

    /// Program the audio bandwidth for the current demodulation mode
    pub fn set_af_bandwidth<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &BandCatalog,
        config: &RadioConfig,
    ) -> Result<(), ChipError> {
        let band = catalog.get(config.current_band_idx);
        match band.curr_demod {
            DemodMode::Lsb | DemodMode::Usb | DemodMode::Cw => {
                let bw = config.bw_idx_ssb;
                chip.set_ssb_audio_bandwidth(bw)?;
                // At 2 kHz or below the band-pass filter gives better
                // high-cut performance on the wanted sideband
                if bw == 0 || bw == 4 || bw == 5 {
                    chip.set_ssb_cutoff_filter(0)?;
                } else {
                    chip.set_ssb_cutoff_filter(1)?;
                }
            }
            DemodMode::Am => chip.set_am_bandwidth(config.bw_idx_am)?,
            DemodMode::Fm => chip.set_fm_bandwidth(config.bw_idx_fm)?,
        }
        Ok(())
    }

    /// Tune to a stored memory entry.
    ///
    /// Transactional: the target band index, demodulation, frequency and
    /// bandwidth are written into the catalog and config *before* the band
    /// commit, so every read inside the commit sees the requested target.
    /// Afterwards the chip frequency is read back (the chip may not land
    /// exactly on the request) and the BFO is recomputed for the new mode.
    pub fn tune_memory_entry<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &mut BandCatalog,
        config: &mut RadioConfig,
        rt: &mut RuntimeContext,
        entry: &StationEntry,
    ) -> Result<(), ChipError> {
        debug!(
            "tuner: memory tune band {} freq {} demod {}",
            entry.band_index, entry.frequency, entry.demod
        );

        config.current_band_idx = entry.band_index;

        if entry.demod != DemodMode::Cw && rt.cw_shift {
            rt.cw_shift = false;
        }

        if let Some(band) = catalog.get_mut(entry.band_index) {
            band.curr_demod = entry.demod;
            // The commit below reads this frequency; it must be in place first
            band.curr_freq = entry.frequency;
        }

        match entry.demod {
            DemodMode::Fm => config.bw_idx_fm = entry.bandwidth_index,
            DemodMode::Am => config.bw_idx_am = entry.bandwidth_index,
            DemodMode::Lsb | DemodMode::Usb | DemodMode::Cw => {
                config.bw_idx_ssb = entry.bandwidth_index;
            }
        }
        rt.config_dirty = true;

        self.band_set(chip, catalog, config, rt, false)?;

        // The chip may have clamped or re-spaced the request
        let actual = chip.frequency()?;
        if let Some(band) = catalog.get_mut(entry.band_index) {
            band.curr_freq = actual;
        }

        if entry.demod.is_ssb_or_cw() {
            let base = if entry.demod == DemodMode::Cw {
                config.cw_tone_freq_hz as i16
            } else {
                0
            };
            chip.set_ssb_bfo(base)?;
            rt.cw_shift = entry.demod == DemodMode::Cw;
        } else {
            rt.bfo_last_hz = 0;
            rt.bfo_coarse_hz = 0;
            rt.ssb_fine_accum_hz = 0;
            rt.cw_shift = false;
        }

        chip.set_volume(config.volume)
    }

    /// Step the frequency by `delta` steps of the band's configured step
    /// size, clamped to the band limits. FM/AM only; SSB/CW stepping goes
    /// through [`Self::step_ssb_fine`].
    ///
    /// Returns the frequency the chip actually landed on.
    pub fn step_frequency<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &mut BandCatalog,
        config: &RadioConfig,
        rt: &mut RuntimeContext,
        signal: &mut SignalQualityCache,
        delta: i16,
    ) -> Result<u16, ChipError> {
        let Some(band) = catalog.get_mut(config.current_band_idx) else {
            return Ok(0);
        };

        let step = i32::from(delta) * i32::from(band.curr_step);
        let target = (i32::from(band.curr_freq) + step)
            .clamp(i32::from(band.minimum_freq), i32::from(band.maximum_freq))
            as u16;

        if target != band.curr_freq {
            chip.set_frequency(target)?;
            band.curr_freq = chip.frequency()?;
            rt.band_data_dirty = true;
            // The S-meter must not show the previous station's level
            signal.invalidate();
        }

        Ok(band.curr_freq)
    }

    /// Fine-tune in SSB/CW.
    ///
    /// With BFO mode engaged the manual offset moves by the BFO step,
    /// clamped to ±999 Hz. Otherwise the coarse offset accumulates the
    /// configured fine step and every 16 kHz of travel rolls over into a
    /// 16-unit chip retune, clamped to the band limits. Either way the net
    /// BFO `base + coarse + manual` is committed at the end.
    ///
    /// Returns the chip's current coarse frequency.
    pub fn step_ssb_fine<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        catalog: &BandCatalog,
        config: &RadioConfig,
        rt: &mut RuntimeContext,
        up: bool,
    ) -> Result<u16, ChipError> {
        let band = catalog.get(config.current_band_idx);
        let curr_freq = band.curr_freq;

        if rt.bfo_enabled {
            let step = i16::from(rt.bfo_step_hz);
            let delta = if up { step } else { -step };
            rt.bfo_manual_hz =
                (rt.bfo_manual_hz + delta).clamp(-BFO_MANUAL_LIMIT_HZ, BFO_MANUAL_LIMIT_HZ);
        } else {
            let fine = rt.ssb_fine_step_hz as i16;
            if up {
                rt.ssb_fine_accum_hz -= fine;
                let total_hz =
                    i64::from(curr_freq) * 1000 - i64::from(rt.ssb_fine_accum_hz);
                if total_hz > i64::from(band.maximum_freq) * 1000 {
                    chip.set_frequency(band.maximum_freq)?;
                    rt.ssb_fine_accum_hz = 0;
                }
                if rt.ssb_fine_accum_hz <= -SSB_FINE_ROLLOVER_HZ {
                    rt.ssb_fine_accum_hz += SSB_FINE_ROLLOVER_HZ;
                    chip.set_frequency(curr_freq + 16)?;
                    chip.settle_ms(SSB_ROLLOVER_SETTLE_MS);
                }
            } else {
                rt.ssb_fine_accum_hz += fine;
                let total_hz =
                    i64::from(curr_freq) * 1000 - i64::from(rt.ssb_fine_accum_hz);
                if total_hz < i64::from(band.minimum_freq) * 1000 {
                    chip.set_frequency(band.minimum_freq)?;
                    rt.ssb_fine_accum_hz = 0;
                }
                if rt.ssb_fine_accum_hz >= SSB_FINE_ROLLOVER_HZ {
                    rt.ssb_fine_accum_hz -= SSB_FINE_ROLLOVER_HZ;
                    chip.set_frequency(curr_freq - 16)?;
                    chip.settle_ms(SSB_ROLLOVER_SETTLE_MS);
                }
            }
            rt.bfo_coarse_hz = rt.ssb_fine_accum_hz;
            rt.bfo_last_hz = rt.bfo_coarse_hz;
        }

        let chip_freq = chip.frequency()?;

        let base = if band.curr_demod == DemodMode::Cw {
            config.cw_tone_freq_hz as i16
        } else {
            0
        };
        chip.set_ssb_bfo(base + rt.bfo_coarse_hz + rt.bfo_manual_hz)?;

        Ok(chip_freq)
    }
}
