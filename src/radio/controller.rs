//! Receiver controller
//!
//! Composition root of the tuning runtime: one struct owning the band
//! catalog, the persisted configuration, the runtime context and the
//! policy components, generic over the chip interface. The view layer
//! reads snapshots through the accessors and mutates only through the
//! operations here; the control loop calls [`ReceiverController::tick`]
//! once per cycle and [`ReceiverController::persist_if_dirty`] at its
//! leisure.

use core::fmt::Write as _;

use heapless::String;
use log::warn;

use crate::band::{
    bandwidth_label, step_label, BandCatalog, BandRecord, BANDWIDTH_AM, BANDWIDTH_FM,
    BANDWIDTH_SSB, BAND_COUNT, STEP_AM, STEP_FM,
};
use crate::chip::{ChipError, ReceiverChip};
use crate::config::{
    RadioConfig, AGC_MAX_ATTENUATION_AM, AGC_MAX_ATTENUATION_FM, SQUELCH_MAX, SSB_MUTE_HOLD_MS,
    VOLUME_MAX,
};
use crate::radio::agc::AgcController;
use crate::radio::rds::RdsCache;
use crate::radio::runtime::RuntimeContext;
use crate::radio::signal::SignalQualityCache;
use crate::radio::squelch::SquelchController;
use crate::radio::tuner::TuningStateMachine;
use crate::store::guard::SamplingControl;
use crate::store::layout::CONFIG_ADDR;
use crate::store::persist::{EepromBackend, PersistentStore, StoreError};
use crate::store::stations::StationEntry;
use crate::types::{
    timeout_elapsed, AgcMode, BandKind, DemodMode, SignalQualitySample, SquelchBasis,
};

/// Timed hardware mute used to suppress tuning noise in SSB/CW
#[derive(Clone, Copy, Debug, Default)]
struct SsbMuteTimer {
    active: bool,
    since_ms: u32,
}

/// The tuning and signal-state runtime, composed.
pub struct ReceiverController<C: ReceiverChip> {
    chip: C,
    catalog: BandCatalog,
    config: RadioConfig,
    rt: RuntimeContext,
    tuner: TuningStateMachine,
    squelch: SquelchController,
    agc: AgcController,
    signal: SignalQualityCache,
    rds: RdsCache,
    ssb_mute: SsbMuteTimer,
}

impl<C: ReceiverChip> ReceiverController<C> {
    /// Build the controller around a chip and a (typically just-loaded)
    /// configuration
    pub fn new(chip: C, config: RadioConfig) -> Self {
        Self {
            chip,
            catalog: BandCatalog::new(),
            config,
            rt: RuntimeContext::new(),
            tuner: TuningStateMachine::new(),
            squelch: SquelchController::new(),
            agc: AgcController::new(),
            signal: SignalQualityCache::new(),
            rds: RdsCache::new(),
            ssb_mute: SsbMuteTimer::default(),
        }
    }

    /// Bring the receiver up.
    ///
    /// On a system start the persisted band runtime fields are restored
    /// first (corrupt storage degrades to the compiled-in defaults); the
    /// catalog is then initialised, the chip powered up and the current
    /// band committed with volume and AGC applied.
    pub fn init<E: EepromBackend, S: SamplingControl>(
        &mut self,
        store: &mut PersistentStore<E>,
        sampling: &mut S,
        sys_start: bool,
    ) -> Result<(), ChipError> {
        if sys_start {
            self.catalog.load_runtime_fields(store, sampling);
            self.rt.ssb_fine_step_hz = 1000;
            self.rt.ssb_fine_accum_hz = self.rt.bfo_coarse_hz;
        }
        self.catalog.initialize(false);

        self.tuner.power_up(&mut self.chip, &self.catalog, &self.config)?;
        self.tuner.band_set(
            &mut self.chip,
            &mut self.catalog,
            &mut self.config,
            &mut self.rt,
            sys_start,
        )?;
        self.chip.set_volume(self.config.volume)?;
        self.agc.apply(&mut self.chip, &self.config)
    }

    /// One control-loop cycle: squelch, the SSB mute timer, the signal
    /// cache refresh and the RDS poll
    pub fn tick(&mut self, now_ms: u32) -> Result<(), ChipError> {
        self.squelch.evaluate(
            &mut self.chip,
            &self.config,
            &mut self.rt,
            &mut self.signal,
            now_ms,
        )?;

        self.manage_ssb_mute(now_ms)?;

        self.signal.get(&mut self.chip, now_ms)?;

        if self.config.rds_enabled {
            let fm = self.current_band().kind == BandKind::Fm;
            self.rds.refresh(&mut self.chip, fm, now_ms)?;
        }

        self.agc.apply(&mut self.chip, &self.config)
    }

    /// Release the timed SSB hardware mute once the hold interval passed
    fn manage_ssb_mute(&mut self, now_ms: u32) -> Result<(), ChipError> {
        if self.rt.muted {
            return Ok(());
        }
        if self.ssb_mute.active && timeout_elapsed(now_ms, self.ssb_mute.since_ms, SSB_MUTE_HOLD_MS)
        {
            self.ssb_mute.active = false;
            self.chip.set_hardware_mute(false)?;
        }
        Ok(())
    }

    /// Engage the hardware mute briefly around an SSB retune
    pub fn ssb_mute_pulse(&mut self, now_ms: u32) -> Result<(), ChipError> {
        self.chip.set_hardware_mute(true)?;
        self.ssb_mute.active = true;
        self.ssb_mute.since_ms = now_ms;
        Ok(())
    }

    // --- mutations -------------------------------------------------------

    /// Switch to another band; the band keeps its stored frequency, step
    /// and demodulation. An out-of-range index degrades to band 0.
    pub fn switch_band(&mut self, index: u8) -> Result<(), ChipError> {
        let index = if usize::from(index) < BAND_COUNT {
            index
        } else {
            warn!("controller: band index {} out of range, using 0", index);
            0
        };
        self.config.current_band_idx = index;
        self.rt.config_dirty = true;
        self.rds.clear();
        self.signal.invalidate();
        self.tuner.band_set(
            &mut self.chip,
            &mut self.catalog,
            &mut self.config,
            &mut self.rt,
            false,
        )
    }

    /// Step the frequency. FM/AM moves by the band's step size; SSB/CW
    /// routes through the BFO fine-tuning path instead.
    pub fn step_frequency(&mut self, delta: i16) -> Result<u16, ChipError> {
        let demod = self.current_band().curr_demod;
        let freq = if demod.is_ssb_or_cw() {
            let up = delta >= 0;
            let mut freq = self.current_band().curr_freq;
            for _ in 0..delta.unsigned_abs() {
                freq = self.tuner.step_ssb_fine(
                    &mut self.chip,
                    &self.catalog,
                    &self.config,
                    &mut self.rt,
                    up,
                )?;
            }
            freq
        } else {
            let freq = self.tuner.step_frequency(
                &mut self.chip,
                &mut self.catalog,
                &self.config,
                &mut self.rt,
                &mut self.signal,
                delta,
            )?;
            if self.current_band().kind == BandKind::Fm {
                self.rds.clear();
            }
            freq
        };
        Ok(freq)
    }

    /// Change the demodulation mode of the current band.
    ///
    /// FM is only valid on the FM band and the FM band accepts nothing
    /// else; invalid requests are ignored with a warning.
    pub fn set_demod(&mut self, demod: DemodMode) -> Result<(), ChipError> {
        let fm_band = self.current_band().kind == BandKind::Fm;
        if fm_band != (demod == DemodMode::Fm) {
            warn!("controller: demod {} not valid on this band", demod);
            return Ok(());
        }
        if let Some(band) = self.catalog.get_mut(self.config.current_band_idx) {
            band.curr_demod = demod;
        }
        self.rt.band_data_dirty = true;
        self.tuner.band_set(
            &mut self.chip,
            &mut self.catalog,
            &mut self.config,
            &mut self.rt,
            false,
        )
    }

    /// Select a bandwidth for the current demodulation mode; out-of-table
    /// indices clamp to the first entry
    pub fn set_bandwidth_index(&mut self, index: u8) -> Result<(), ChipError> {
        let demod = self.current_band().curr_demod;
        let (table_len, slot) = match demod {
            DemodMode::Fm => (BANDWIDTH_FM.len(), &mut self.config.bw_idx_fm),
            DemodMode::Am => (BANDWIDTH_AM.len(), &mut self.config.bw_idx_am),
            DemodMode::Lsb | DemodMode::Usb | DemodMode::Cw => {
                (BANDWIDTH_SSB.len(), &mut self.config.bw_idx_ssb)
            }
        };
        *slot = if usize::from(index) < table_len {
            index
        } else {
            warn!("controller: bandwidth index {} out of range, using 0", index);
            0
        };
        self.rt.config_dirty = true;
        self.tuner
            .set_af_bandwidth(&mut self.chip, &self.catalog, &self.config)
    }

    /// Tune to a stored memory entry
    pub fn tune_memory_entry(&mut self, entry: &StationEntry) -> Result<(), ChipError> {
        self.rds.clear();
        self.signal.invalidate();
        self.tuner.tune_memory_entry(
            &mut self.chip,
            &mut self.catalog,
            &mut self.config,
            &mut self.rt,
            entry,
        )
    }

    /// Select the AGC mode, with an optional manual attenuation index.
    ///
    /// The manual index is clamped to the chip's range for the current
    /// band class.
    pub fn set_agc_mode(&mut self, mode: AgcMode, manual_index: Option<u8>) -> Result<(), ChipError> {
        self.config.agc_mode = mode;
        if let Some(index) = manual_index {
            let max = if self.current_band().kind == BandKind::Fm {
                AGC_MAX_ATTENUATION_FM
            } else {
                AGC_MAX_ATTENUATION_AM
            };
            self.config.agc_manual_index = index.min(max);
        }
        self.rt.config_dirty = true;
        self.agc.apply(&mut self.chip, &self.config)
    }

    /// Set the squelch threshold (0 disables), clamped to the valid range
    pub fn set_squelch_level(&mut self, level: u8) {
        self.config.squelch_level = level.min(SQUELCH_MAX);
        self.rt.config_dirty = true;
    }

    /// Choose the metric the squelch threshold applies to
    pub fn set_squelch_basis(&mut self, basis: SquelchBasis) {
        self.config.squelch_basis = basis;
        self.rt.config_dirty = true;
    }

    /// Set the output volume
    pub fn set_volume(&mut self, volume: u8) -> Result<(), ChipError> {
        self.config.volume = volume.min(VOLUME_MAX);
        self.rt.config_dirty = true;
        self.chip.set_volume(self.config.volume)
    }

    /// Engage or release the global audio mute (hardware and soft)
    pub fn set_global_mute(&mut self, mute: bool) -> Result<(), ChipError> {
        self.rt.muted = mute;
        self.chip.set_hardware_mute(mute)?;
        self.chip.set_audio_mute(mute)
    }

    // --- persistence -----------------------------------------------------

    /// Write back whatever changed since the last call: band runtime
    /// fields and/or the configuration record
    pub fn persist_if_dirty<E: EepromBackend, S: SamplingControl>(
        &mut self,
        store: &mut PersistentStore<E>,
        sampling: &mut S,
    ) -> Result<(), StoreError> {
        if self.rt.band_data_dirty {
            self.catalog.save_runtime_fields(store, sampling)?;
            self.rt.band_data_dirty = false;
        }
        if self.rt.config_dirty {
            store.save(&self.config, CONFIG_ADDR, sampling)?;
            self.rt.config_dirty = false;
        }
        Ok(())
    }

    // --- read-only surface for the view layer ----------------------------

    /// The currently selected band record
    #[must_use]
    pub fn current_band(&self) -> &BandRecord {
        self.catalog.get(self.config.current_band_idx)
    }

    /// Current frequency in chip units
    #[must_use]
    pub fn current_frequency(&self) -> u16 {
        self.current_band().curr_freq
    }

    /// Current demodulation mode
    #[must_use]
    pub fn current_demod(&self) -> DemodMode {
        self.current_band().curr_demod
    }

    /// The band catalog (read-only)
    #[must_use]
    pub fn catalog(&self) -> &BandCatalog {
        &self.catalog
    }

    /// The active configuration (read-only; mutate through the operations)
    #[must_use]
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// The runtime context (read-only)
    #[must_use]
    pub fn runtime(&self) -> &RuntimeContext {
        &self.rt
    }

    /// True while squelch holds the audio muted
    #[must_use]
    pub fn squelch_muted(&self) -> bool {
        self.squelch.is_muted()
    }

    /// Label of the active AGC mode
    #[must_use]
    pub fn agc_label(&self) -> &'static str {
        self.config.agc_mode.label()
    }

    /// Label of the active frequency step for the status line.
    ///
    /// In BFO mode the label is the manual BFO step; in SSB/CW it is the
    /// fine-tuning step; otherwise it comes from the band class's step
    /// table.
    #[must_use]
    pub fn step_label(&self) -> String<8> {
        let mut out = String::new();
        if self.rt.bfo_enabled {
            let _ = write!(out, "{}Hz", self.rt.bfo_step_hz);
            return out;
        }

        let band = self.current_band();
        let label = if band.kind == BandKind::Fm {
            step_label(&STEP_FM, self.config.step_idx_fm)
        } else if band.curr_demod.is_ssb_or_cw() {
            Some(match self.rt.ssb_fine_step_sel {
                1 => "100Hz",
                2 => "10Hz",
                _ => "1kHz",
            })
        } else if matches!(band.kind, BandKind::Mw | BandKind::Lw) {
            step_label(&STEP_AM, self.config.step_idx_mw)
        } else {
            step_label(&STEP_AM, self.config.step_idx_am)
        };
        let _ = out.push_str(label.unwrap_or(""));
        out
    }

    /// Label of the active bandwidth for the status line
    #[must_use]
    pub fn bandwidth_label(&self) -> Option<&'static str> {
        match self.current_band().curr_demod {
            DemodMode::Fm => bandwidth_label(&BANDWIDTH_FM, self.config.bw_idx_fm),
            DemodMode::Am => bandwidth_label(&BANDWIDTH_AM, self.config.bw_idx_am),
            DemodMode::Lsb | DemodMode::Usb | DemodMode::Cw => {
                bandwidth_label(&BANDWIDTH_SSB, self.config.bw_idx_ssb)
            }
        }
    }

    /// Cached signal quality, refreshed when older than the cache window
    pub fn signal_quality(&mut self, now_ms: u32) -> Result<SignalQualitySample, ChipError> {
        self.signal.get(&mut self.chip, now_ms)
    }

    /// Signal quality straight from the chip
    pub fn signal_quality_realtime(
        &mut self,
        now_ms: u32,
    ) -> Result<SignalQualitySample, ChipError> {
        self.signal.get_realtime(&mut self.chip, now_ms)
    }

    /// The RDS cache (read-only)
    #[must_use]
    pub fn rds(&self) -> &RdsCache {
        &self.rds
    }

    /// True while the SSB patch is resident on the chip
    #[must_use]
    pub fn ssb_patch_loaded(&self) -> bool {
        self.tuner.ssb_patch_loaded()
    }

    /// Direct chip access for diagnostics screens
    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }
}
