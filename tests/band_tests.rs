//! Tests for the band catalog
//!
//! Descriptor defaults, the out-of-range sentinel, HAM filtering and the
//! initialise/restore interplay.

use si4735_firmware::band::{
    default_ant_cap, BandCatalog, BandRuntimeEntry, BandStoreData, BAND_COUNT,
};
use si4735_firmware::config::EEPROM_SIZE;
use si4735_firmware::sim::{SimEeprom, SimSampling};
use si4735_firmware::store::persist::PersistentStore;
use si4735_firmware::types::{BandKind, DemodMode};

// ============================================================================
// Initialisation
// ============================================================================

#[test]
fn initialize_fills_runtime_fields_from_descriptors() {
    let mut catalog = BandCatalog::new();
    catalog.initialize(false);

    let fm = catalog.get(0);
    assert_eq!(fm.curr_freq, 9390);
    assert_eq!(fm.curr_step, 10);
    assert_eq!(fm.curr_demod, DemodMode::Fm);
    assert_eq!(fm.ant_cap, 0);

    let b40m = catalog.get(12);
    assert_eq!(b40m.curr_freq, 7070);
    assert_eq!(b40m.curr_step, 1);
    assert_eq!(b40m.curr_demod, DemodMode::Lsb);
    assert_eq!(b40m.ant_cap, 1);
}

#[test]
fn shortwave_gets_the_antenna_capacitor_default_others_do_not() {
    assert_eq!(default_ant_cap(BandKind::Sw), 1);
    assert_eq!(default_ant_cap(BandKind::Fm), 0);
    assert_eq!(default_ant_cap(BandKind::Mw), 0);
    assert_eq!(default_ant_cap(BandKind::Lw), 0);

    let mut catalog = BandCatalog::new();
    catalog.initialize(false);
    assert_eq!(catalog.get(2).ant_cap, 0); // MW
    assert_eq!(catalog.get(29).ant_cap, 1); // SW
}

#[test]
fn force_reinit_fills_gaps_without_clobbering_restored_fields() {
    let mut catalog = BandCatalog::new();

    // A partially restored record: frequency and demod survive, step lost
    let mut data = BandStoreData::default();
    data.bands[12] = BandRuntimeEntry {
        curr_freq: 7100,
        curr_step: 0,
        curr_demod: DemodMode::Lsb.as_u8(),
        ant_cap: 1,
    };
    catalog.restore_runtime(&data);
    catalog.initialize(true);

    let band = catalog.get(12);
    assert_eq!(band.curr_freq, 7100, "restored frequency must survive");
    assert_eq!(band.curr_step, 1, "missing step falls back to the default");
    assert_eq!(band.curr_demod, DemodMode::Lsb);
}

#[test]
fn initialize_without_force_skips_initialised_bands() {
    let mut catalog = BandCatalog::new();
    catalog.initialize(false);

    let mut data = catalog.runtime_snapshot();
    data.bands[12].curr_freq = 7200;
    catalog.restore_runtime(&data);

    catalog.initialize(false);
    assert_eq!(catalog.get(12).curr_freq, 7200);
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn out_of_range_index_returns_the_empty_sentinel() {
    let catalog = BandCatalog::new();
    let empty = catalog.get(200);
    assert_eq!(empty.name, "");
    assert_eq!(empty.minimum_freq, 0);
    assert_eq!(empty.maximum_freq, 0);
}

#[test]
fn find_index_by_name() {
    let catalog = BandCatalog::new();
    assert_eq!(catalog.find_index("FM"), Some(0));
    assert_eq!(catalog.find_index("MW"), Some(2));
    assert_eq!(catalog.find_index("40m"), Some(12));
    assert_eq!(catalog.find_index("2m"), None);
}

#[test]
fn ham_filter_partitions_the_table() {
    let catalog = BandCatalog::new();
    let ham = catalog.filtered_count(true);
    let broadcast = catalog.filtered_count(false);

    assert_eq!(ham, 12);
    assert_eq!(usize::from(ham) + usize::from(broadcast), BAND_COUNT);

    let ham_names = catalog.filtered_names(true);
    assert_eq!(usize::from(ham), ham_names.len());
    assert!(ham_names.contains(&"40m"));
    assert!(!ham_names.contains(&"FM"));

    let broadcast_names = catalog.filtered_names(false);
    assert!(broadcast_names.contains(&"FM"));
    assert!(broadcast_names.contains(&"MW"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn runtime_fields_survive_a_store_round_trip() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut catalog = BandCatalog::new();
    catalog.initialize(false);

    let mut data = catalog.runtime_snapshot();
    data.bands[18].curr_freq = 14200;
    data.bands[18].curr_demod = DemodMode::Usb.as_u8();
    catalog.restore_runtime(&data);

    catalog.save_runtime_fields(&mut store, &mut sampling).unwrap();

    let mut restored = BandCatalog::new();
    restored.load_runtime_fields(&mut store, &mut sampling);
    restored.initialize(false);

    assert_eq!(restored.get(18).curr_freq, 14200);
    assert_eq!(restored.get(18).curr_demod, DemodMode::Usb);
    // Untouched bands restored intact too
    assert_eq!(restored.get(0).curr_freq, 9390);
}

#[test]
fn corrupt_band_store_degrades_to_descriptor_defaults() {
    let mut store = PersistentStore::new(SimEeprom::new(EEPROM_SIZE));
    let mut sampling = SimSampling::new(false);

    let mut catalog = BandCatalog::new();
    catalog.initialize(false);
    catalog.save_runtime_fields(&mut store, &mut sampling).unwrap();

    // Trash the stored band image
    for byte in store.backend_mut().bytes.iter_mut().skip(40).take(20) {
        *byte ^= 0xA5;
    }

    let mut restored = BandCatalog::new();
    restored.load_runtime_fields(&mut store, &mut sampling);
    restored.initialize(false);

    assert_eq!(restored.get(12).curr_freq, 7070);
    assert_eq!(restored.get(12).curr_demod, DemodMode::Lsb);
}
