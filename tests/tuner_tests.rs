//! Tests for the tuning state machine and the receiver controller
//!
//! SSB patch lifecycle, index clamping, BFO composition, frequency
//! stepping and the memory-tune transaction.

use si4735_firmware::band::BandCatalog;
use si4735_firmware::config::{RadioConfig, EEPROM_SIZE};
use si4735_firmware::radio::controller::ReceiverController;
use si4735_firmware::radio::runtime::RuntimeContext;
use si4735_firmware::radio::signal::SignalQualityCache;
use si4735_firmware::radio::tuner::TuningStateMachine;
use si4735_firmware::sim::{SimChip, SimEeprom, SimMode, SimSampling};
use si4735_firmware::store::persist::PersistentStore;
use si4735_firmware::store::stations::StationEntry;
use si4735_firmware::types::{DemodMode, Sideband};

struct Fixture {
    chip: SimChip,
    catalog: BandCatalog,
    config: RadioConfig,
    rt: RuntimeContext,
    tuner: TuningStateMachine,
}

fn fixture() -> Fixture {
    let mut catalog = BandCatalog::new();
    catalog.initialize(false);
    Fixture {
        chip: SimChip::new(),
        catalog,
        config: RadioConfig::default(),
        rt: RuntimeContext::new(),
        tuner: TuningStateMachine::new(),
    }
}

impl Fixture {
    fn select_band(&mut self, index: u8) {
        self.config.current_band_idx = index;
    }

    fn set_demod(&mut self, demod: DemodMode) {
        let idx = self.config.current_band_idx;
        let snapshot = self.catalog.runtime_snapshot();
        let mut data = snapshot;
        data.bands[usize::from(idx)].curr_demod = demod.as_u8();
        self.catalog.restore_runtime(&data);
    }

    fn band_set(&mut self) {
        self.tuner
            .band_set(
                &mut self.chip,
                &mut self.catalog,
                &mut self.config,
                &mut self.rt,
                false,
            )
            .unwrap();
    }
}

// ============================================================================
// SSB patch lifecycle
// ============================================================================

#[test]
fn patch_downloads_once_and_stays_sticky() {
    let mut f = fixture();
    f.select_band(12); // 40m, LSB preferred

    f.band_set();
    assert!(f.tuner.ssb_patch_loaded());
    assert_eq!(f.chip.patch_downloads, 1);

    f.band_set();
    f.band_set();
    assert_eq!(f.chip.patch_downloads, 1, "patch must not be re-downloaded");
}

#[test]
fn power_up_rearms_the_patch_flag() {
    let mut f = fixture();
    f.select_band(12);
    f.band_set();
    assert_eq!(f.chip.patch_downloads, 1);

    // A hardware reset clears the patch from chip RAM
    f.tuner
        .power_up(&mut f.chip, &f.catalog, &f.config)
        .unwrap();
    assert!(!f.tuner.ssb_patch_loaded());

    f.band_set();
    assert_eq!(f.chip.patch_downloads, 2);
}

#[test]
fn switching_into_fm_clears_the_patch_flag_and_bfo_mode() {
    let mut f = fixture();
    f.select_band(12);
    f.band_set();
    assert!(f.tuner.ssb_patch_loaded());

    f.rt.bfo_enabled = true;
    f.select_band(0); // FM
    f.band_set();

    assert!(!f.tuner.ssb_patch_loaded());
    assert!(!f.rt.bfo_enabled);
    assert_eq!(f.chip.mode, SimMode::Fm);
}

#[test]
fn am_band_never_touches_the_patch() {
    let mut f = fixture();
    f.select_band(2); // MW
    f.band_set();
    assert_eq!(f.chip.patch_downloads, 0);
    assert_eq!(f.chip.mode, SimMode::Am);
}

// ============================================================================
// Index clamping
// ============================================================================

#[test]
fn invalid_step_index_clamps_to_zero_and_stays_there() {
    let mut f = fixture();
    f.select_band(29); // SW band uses the AM step table
    f.config.step_idx_am = 99;

    f.band_set();
    assert_eq!(f.config.step_idx_am, 0);
    assert_eq!(f.catalog.get(29).curr_step, 1); // first AM table entry
    assert!(f.rt.config_dirty, "the correction must be persisted");

    f.rt.config_dirty = false;
    f.band_set();
    assert_eq!(f.config.step_idx_am, 0, "clamping is idempotent");
}

#[test]
fn cw_entry_corrects_a_non_cw_bandwidth() {
    let mut f = fixture();
    f.select_band(12);
    f.set_demod(DemodMode::Cw);
    f.config.bw_idx_ssb = 2; // 3.0 kHz low-pass, not a CW filter

    f.band_set();
    assert_eq!(f.config.bw_idx_ssb, 5, "corrected to the 1.0 kHz band-pass");

    f.band_set();
    assert_eq!(f.config.bw_idx_ssb, 5, "already-corrected value is kept");
}

#[test]
fn cw_entry_keeps_an_already_cw_bandwidth() {
    let mut f = fixture();
    f.select_band(12);
    f.set_demod(DemodMode::Cw);
    f.config.bw_idx_ssb = 4; // 0.5 kHz band-pass

    f.band_set();
    assert_eq!(f.config.bw_idx_ssb, 4);
}

// ============================================================================
// BFO composition
// ============================================================================

#[test]
fn cw_bfo_is_tone_plus_coarse_plus_manual() {
    let mut f = fixture();
    f.select_band(12);
    f.set_demod(DemodMode::Cw);
    f.config.cw_tone_freq_hz = 850;
    f.rt.bfo_coarse_hz = -300;
    f.rt.bfo_manual_hz = 40;

    f.band_set();

    assert_eq!(f.chip.bfo, 850 - 300 + 40);
    assert!(f.rt.cw_shift);
    // CW demodulates as USB under the hood
    assert_eq!(f.chip.mode, SimMode::Ssb(Sideband::Upper));
}

#[test]
fn lsb_bfo_omits_the_tone_offset() {
    let mut f = fixture();
    f.select_band(12);
    f.set_demod(DemodMode::Lsb);
    f.rt.bfo_coarse_hz = -300;
    f.rt.bfo_manual_hz = 40;

    f.band_set();

    assert_eq!(f.chip.bfo, -300 + 40);
    assert!(!f.rt.cw_shift);
    assert_eq!(f.chip.mode, SimMode::Ssb(Sideband::Lower));
}

#[test]
fn ssb_pins_the_chip_step_to_one() {
    let mut f = fixture();
    f.select_band(12);
    f.band_set();

    assert_eq!(f.catalog.get(12).curr_step, 1);
    assert_eq!(f.chip.explicit_step, Some(1));
}

// ============================================================================
// Frequency stepping
// ============================================================================

#[test]
fn step_scales_by_band_step_and_clamps_to_limits() {
    let mut f = fixture();
    f.select_band(2); // MW: 514..=1800, 9 kHz step
    f.band_set();
    let mut signal = SignalQualityCache::new();

    let freq = f
        .tuner
        .step_frequency(
            &mut f.chip,
            &mut f.catalog,
            &f.config,
            &mut f.rt,
            &mut signal,
            2,
        )
        .unwrap();
    assert_eq!(freq, 540 + 2 * 9);

    // A huge downward step pins to the band minimum
    let freq = f
        .tuner
        .step_frequency(
            &mut f.chip,
            &mut f.catalog,
            &f.config,
            &mut f.rt,
            &mut signal,
            -1000,
        )
        .unwrap();
    assert_eq!(freq, 514);
    assert!(f.rt.band_data_dirty);
}

#[test]
fn stepping_at_the_limit_issues_no_chip_write() {
    let mut f = fixture();
    f.select_band(2);
    f.band_set();
    let mut signal = SignalQualityCache::new();

    f.tuner
        .step_frequency(&mut f.chip, &mut f.catalog, &f.config, &mut f.rt, &mut signal, -1000)
        .unwrap();
    let writes = f.chip.frequency_writes;

    // Already at the minimum: the target equals the current frequency
    f.tuner
        .step_frequency(&mut f.chip, &mut f.catalog, &f.config, &mut f.rt, &mut signal, -1)
        .unwrap();
    assert_eq!(f.chip.frequency_writes, writes);
}

#[test]
fn step_reads_back_the_frequency_the_chip_landed_on() {
    let mut f = fixture();
    f.select_band(2);
    f.band_set();
    f.chip.tune_offset = 1;
    let mut signal = SignalQualityCache::new();

    let freq = f
        .tuner
        .step_frequency(&mut f.chip, &mut f.catalog, &f.config, &mut f.rt, &mut signal, 1)
        .unwrap();

    // The catalog reflects the chip readback, not the request
    assert_eq!(freq, f.chip.freq);
    assert_eq!(f.catalog.get(2).curr_freq, f.chip.freq);
}

#[test]
fn ssb_fine_stepping_moves_the_bfo_not_the_chip() {
    let mut f = fixture();
    f.select_band(12);
    f.band_set();
    let writes = f.chip.frequency_writes;

    let chip_freq = f
        .tuner
        .step_ssb_fine(&mut f.chip, &f.catalog, &f.config, &mut f.rt, true)
        .unwrap();

    assert_eq!(f.chip.frequency_writes, writes, "no chip retune yet");
    assert_eq!(f.rt.bfo_coarse_hz, -1000);
    assert_eq!(f.chip.bfo, -1000);
    assert_eq!(chip_freq, f.chip.freq);
}

#[test]
fn ssb_fine_travel_rolls_over_into_a_chip_retune() {
    let mut f = fixture();
    f.select_band(12);
    f.band_set();
    let start_freq = f.chip.freq;

    // 16 fine steps of 1 kHz exhaust the BFO travel budget
    for _ in 0..16 {
        f.tuner
            .step_ssb_fine(&mut f.chip, &f.catalog, &f.config, &mut f.rt, true)
            .unwrap();
    }

    assert_eq!(f.chip.freq, start_freq + 16);
    assert_eq!(f.rt.bfo_coarse_hz, 0, "travel consumed by the rollover");
    assert_eq!(f.chip.bfo, 0);
}

#[test]
fn bfo_mode_moves_the_manual_offset_with_clamping() {
    let mut f = fixture();
    f.select_band(12);
    f.band_set();
    f.rt.bfo_enabled = true;
    f.rt.bfo_step_hz = 25;

    f.tuner
        .step_ssb_fine(&mut f.chip, &f.catalog, &f.config, &mut f.rt, true)
        .unwrap();
    assert_eq!(f.rt.bfo_manual_hz, 25);
    assert_eq!(f.chip.bfo, 25);

    // Clamp at +999
    for _ in 0..100 {
        f.tuner
            .step_ssb_fine(&mut f.chip, &f.catalog, &f.config, &mut f.rt, true)
            .unwrap();
    }
    assert_eq!(f.rt.bfo_manual_hz, 999);
}

// ============================================================================
// Memory tune
// ============================================================================

#[test]
fn memory_tune_lands_on_the_stored_mw_station() {
    let mut f = fixture();
    let entry = StationEntry::new(2, 540, DemodMode::Am, 0, "Kossuth");

    f.tuner
        .tune_memory_entry(&mut f.chip, &mut f.catalog, &mut f.config, &mut f.rt, &entry)
        .unwrap();

    assert_eq!(f.config.current_band_idx, 2);
    assert_eq!(f.catalog.get(2).curr_freq, 540);
    assert_eq!(f.catalog.get(2).curr_demod, DemodMode::Am);
    assert_eq!(f.config.bw_idx_am, 0);
    assert_eq!(f.chip.mode, SimMode::Am);
    assert_eq!(f.chip.volume, f.config.volume);
}

#[test]
fn memory_tune_reads_back_the_actual_chip_frequency() {
    let mut f = fixture();
    f.chip.tune_offset = 2;
    let entry = StationEntry::new(2, 540, DemodMode::Am, 0, "Kossuth");

    f.tuner
        .tune_memory_entry(&mut f.chip, &mut f.catalog, &mut f.config, &mut f.rt, &entry)
        .unwrap();

    assert_eq!(f.catalog.get(2).curr_freq, 542);
}

#[test]
fn memory_tune_to_cw_programs_the_tone_base_offset() {
    let mut f = fixture();
    f.rt.bfo_coarse_hz = -500; // leftover from manual tuning elsewhere
    let entry = StationEntry::new(12, 7030, DemodMode::Cw, 5, "beacon");

    f.tuner
        .tune_memory_entry(&mut f.chip, &mut f.catalog, &mut f.config, &mut f.rt, &entry)
        .unwrap();

    // A fresh memory tune starts from the bare tone offset
    assert_eq!(f.chip.bfo, 850);
    assert!(f.rt.cw_shift);
    assert_eq!(f.config.bw_idx_ssb, 5);
}

#[test]
fn memory_tune_to_fm_zeroes_the_bfo_state() {
    let mut f = fixture();
    f.rt.bfo_coarse_hz = -300;
    f.rt.ssb_fine_accum_hz = -300;
    let entry = StationEntry::new(0, 9390, DemodMode::Fm, 0, "Petofi");

    f.tuner
        .tune_memory_entry(&mut f.chip, &mut f.catalog, &mut f.config, &mut f.rt, &entry)
        .unwrap();

    assert_eq!(f.rt.bfo_coarse_hz, 0);
    assert_eq!(f.rt.ssb_fine_accum_hz, 0);
    assert!(!f.rt.cw_shift);
}

// ============================================================================
// Controller
// ============================================================================

#[test]
fn controller_init_restores_persisted_state_and_applies_agc() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut controller = ReceiverController::new(SimChip::new(), RadioConfig::default());
    controller.init(&mut store, &mut sampling, true).unwrap();

    assert_eq!(controller.current_band().name, "FM");
    assert_eq!(controller.current_frequency(), 9390);
    assert_eq!(controller.chip_mut().volume, 50);
    // Default mode is automatic and the sim chip starts enabled: no command
    assert_eq!(controller.chip_mut().agc_commands, 0);
}

#[test]
fn controller_switch_band_keeps_each_bands_own_state() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut controller = ReceiverController::new(SimChip::new(), RadioConfig::default());
    controller.init(&mut store, &mut sampling, true).unwrap();

    controller.switch_band(2).unwrap();
    assert_eq!(controller.current_band().name, "MW");
    assert_eq!(controller.current_frequency(), 540);

    controller.step_frequency(1).unwrap();
    let mw_freq = controller.current_frequency();

    controller.switch_band(0).unwrap();
    assert_eq!(controller.current_band().name, "FM");

    controller.switch_band(2).unwrap();
    assert_eq!(controller.current_frequency(), mw_freq);
}

#[test]
fn controller_out_of_range_band_degrades_to_band_zero() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut controller = ReceiverController::new(SimChip::new(), RadioConfig::default());
    controller.init(&mut store, &mut sampling, true).unwrap();

    controller.switch_band(77).unwrap();
    assert_eq!(controller.config().current_band_idx, 0);
}

#[test]
fn controller_persists_dirty_state_once() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut controller = ReceiverController::new(SimChip::new(), RadioConfig::default());
    controller.init(&mut store, &mut sampling, true).unwrap();

    controller.switch_band(2).unwrap();
    controller.step_frequency(1).unwrap();
    assert!(controller.runtime().band_data_dirty);
    assert!(controller.runtime().config_dirty);

    controller.persist_if_dirty(&mut store, &mut sampling).unwrap();
    assert!(!controller.runtime().band_data_dirty);
    assert!(!controller.runtime().config_dirty);

    let commits = store.backend_mut().commits;
    controller.persist_if_dirty(&mut store, &mut sampling).unwrap();
    assert_eq!(store.backend_mut().commits, commits, "nothing left to write");
}

#[test]
fn controller_rejects_demod_invalid_for_the_band_class() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut controller = ReceiverController::new(SimChip::new(), RadioConfig::default());
    controller.init(&mut store, &mut sampling, true).unwrap();

    // FM band accepts only FM
    controller.set_demod(DemodMode::Am).unwrap();
    assert_eq!(controller.current_demod(), DemodMode::Fm);

    controller.switch_band(12).unwrap();
    controller.set_demod(DemodMode::Usb).unwrap();
    assert_eq!(controller.current_demod(), DemodMode::Usb);

    controller.set_demod(DemodMode::Fm).unwrap();
    assert_eq!(controller.current_demod(), DemodMode::Usb);
}
