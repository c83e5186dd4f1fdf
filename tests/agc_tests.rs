//! Tests for the idempotent AGC application

use si4735_firmware::config::RadioConfig;
use si4735_firmware::radio::agc::AgcController;
use si4735_firmware::sim::SimChip;
use si4735_firmware::types::{AgcMode, AgcState};

fn chip_with(enabled: bool, index: u8) -> SimChip {
    let mut chip = SimChip::new();
    chip.agc = Some(AgcState { enabled, index });
    chip
}

#[test]
fn automatic_mode_with_agc_already_enabled_is_a_no_op() {
    let mut chip = chip_with(true, 0);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Automatic;

    AgcController::new().apply(&mut chip, &config).unwrap();

    assert_eq!(chip.agc_commands, 0);
    assert_eq!(chip.agc_queries, 1, "only the initial state query");
}

#[test]
fn automatic_mode_enables_a_disabled_agc() {
    let mut chip = chip_with(false, 5);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Automatic;

    AgcController::new().apply(&mut chip, &config).unwrap();

    assert_eq!(chip.agc_commands, 1);
    assert_eq!(chip.agc.unwrap(), AgcState { enabled: true, index: 0 });
    assert_eq!(chip.agc_queries, 2, "state re-queried after the command");
}

#[test]
fn off_mode_disables_an_enabled_agc_with_zero_attenuation() {
    let mut chip = chip_with(true, 0);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Off;

    AgcController::new().apply(&mut chip, &config).unwrap();

    assert_eq!(chip.agc_commands, 1);
    assert_eq!(chip.agc.unwrap(), AgcState { enabled: false, index: 0 });
}

#[test]
fn off_mode_with_agc_already_disabled_is_a_no_op() {
    let mut chip = chip_with(false, 0);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Off;

    AgcController::new().apply(&mut chip, &config).unwrap();

    assert_eq!(chip.agc_commands, 0);
}

#[test]
fn manual_mode_applies_the_configured_attenuation() {
    let mut chip = chip_with(false, 3);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Manual;
    config.agc_manual_index = 12;

    AgcController::new().apply(&mut chip, &config).unwrap();

    assert_eq!(chip.agc_commands, 1);
    assert_eq!(chip.agc.unwrap(), AgcState { enabled: false, index: 12 });
}

#[test]
fn manual_mode_with_matching_index_is_a_no_op() {
    let mut chip = chip_with(false, 12);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Manual;
    config.agc_manual_index = 12;

    AgcController::new().apply(&mut chip, &config).unwrap();

    assert_eq!(chip.agc_commands, 0);
}

#[test]
fn repeated_application_converges_after_one_command() {
    let mut chip = chip_with(true, 0);
    let mut config = RadioConfig::default();
    config.agc_mode = AgcMode::Manual;
    config.agc_manual_index = 7;
    let mut agc = AgcController::new();

    agc.apply(&mut chip, &config).unwrap();
    assert_eq!(chip.agc_commands, 1);

    agc.apply(&mut chip, &config).unwrap();
    agc.apply(&mut chip, &config).unwrap();
    assert_eq!(chip.agc_commands, 1, "steady state issues no further commands");
}
