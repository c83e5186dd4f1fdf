//! Squelch
//!
//! Hysteresis-based audio mute driven by realtime signal quality.
//! Unmuting is immediate on a good sample (while scan is paused, see
//! [`crate::radio::runtime::RuntimeContext::scan_paused`]); muting only
//! engages after the signal has stayed below threshold for the full decay
//! interval. Exactly one hardware mute command is issued per transition.

use log::debug;

use crate::chip::{ChipError, ReceiverChip};
use crate::config::{RadioConfig, SQUELCH_DECAY_MS};
use crate::radio::runtime::RuntimeContext;
use crate::radio::signal::SignalQualityCache;
use crate::types::SquelchBasis;

/// Squelch mute state machine, evaluated every control-loop tick
#[derive(Clone, Copy, Debug, Default)]
pub struct SquelchController {
    muted: bool,
}

impl SquelchController {
    /// Squelch starts unmuted
    #[must_use]
    pub const fn new() -> Self {
        Self { muted: false }
    }

    /// True while audio is muted by squelch (not by the global mute)
    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    /// Evaluate one tick.
    ///
    /// A threshold of 0 disables squelch entirely. While the global mute
    /// is engaged the internal state is forced muted and the decay timer
    /// re-armed, so releasing the global mute cannot unmute squelch before
    /// a fresh evaluation.
    pub fn evaluate<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        config: &RadioConfig,
        rt: &mut RuntimeContext,
        signal: &mut SignalQualityCache,
        now_ms: u32,
    ) -> Result<(), ChipError> {
        if config.squelch_level == 0 {
            return Ok(());
        }

        if rt.muted {
            // Already silent globally; just keep the internal state in
            // sync without sending a redundant mute command.
            self.muted = true;
            rt.squelch_decay_ms = now_ms;
            return Ok(());
        }

        let sample = signal.get_realtime(chip, now_ms)?;
        let quality = match config.squelch_basis {
            SquelchBasis::Rssi => sample.rssi,
            SquelchBasis::Snr => sample.snr,
        };

        if quality >= config.squelch_level {
            if rt.scan_paused {
                if self.muted {
                    debug!("squelch: signal {} >= {}, unmuting", quality, config.squelch_level);
                    chip.set_audio_mute(false)?;
                    self.muted = false;
                }
                rt.squelch_decay_ms = now_ms;
            }
        } else if decay_expired(now_ms, rt.squelch_decay_ms) && !self.muted {
            debug!("squelch: signal {} < {}, muting", quality, config.squelch_level);
            chip.set_audio_mute(true)?;
            self.muted = true;
        }

        Ok(())
    }
}

/// The decay interval must elapse strictly before muting: a signal below
/// threshold for exactly the interval mutes on the following tick. A `now`
/// behind the timer start means the counter wrapped.
fn decay_expired(now_ms: u32, since_ms: u32) -> bool {
    now_ms < since_ms || now_ms - since_ms > SQUELCH_DECAY_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_is_strictly_after_the_interval() {
        assert!(!decay_expired(500, 0));
        assert!(decay_expired(501, 0));
    }

    #[test]
    fn decay_fires_on_counter_wrap() {
        assert!(decay_expired(3, u32::MAX - 100));
    }
}
