//! Gain control policy
//!
//! Applies the configured AGC mode to the chip idempotently: the chip's
//! current state is queried first and a command is only issued when
//! something actually has to change. After any command the state is
//! re-queried so the chip-side mirror stays accurate.

use log::debug;

use crate::chip::{ChipError, ReceiverChip};
use crate::config::RadioConfig;
use crate::types::AgcMode;

/// Idempotent AGC application
#[derive(Clone, Copy, Debug, Default)]
pub struct AgcController;

impl AgcController {
    /// New controller
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Bring the chip's AGC in line with the configured mode
    pub fn apply<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        config: &RadioConfig,
    ) -> Result<(), ChipError> {
        let state = chip.agc_state()?;
        let mut changed = false;

        match config.agc_mode {
            AgcMode::Off => {
                if state.enabled {
                    debug!("agc: off");
                    chip.set_agc(true, 0)?;
                    changed = true;
                }
            }
            AgcMode::Automatic => {
                if !state.enabled {
                    debug!("agc: automatic");
                    chip.set_agc(false, 0)?;
                    changed = true;
                }
            }
            AgcMode::Manual => {
                if config.agc_manual_index != state.index {
                    debug!("agc: manual, attenuation {}", config.agc_manual_index);
                    chip.set_agc(true, config.agc_manual_index)?;
                    changed = true;
                }
            }
        }

        if changed {
            chip.agc_state()?;
        }

        Ok(())
    }
}
