//! Signal quality cache
//!
//! Time-bounded cache of the chip's RSSI/SNR readings. Passive readers
//! (S-meter, status line) get a sample at most one cache window old; the
//! squelch uses the realtime path, which always re-queries the chip and
//! refreshes the cache as a side effect.

use crate::chip::{ChipError, ReceiverChip};
use crate::config::SIGNAL_CACHE_TIMEOUT_MS;
use crate::types::{timeout_elapsed, SignalQualitySample};

/// Cached RSSI/SNR with explicit invalidation
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalQualityCache {
    sample: SignalQualitySample,
}

impl SignalQualityCache {
    /// Empty cache; the first `get` always reads the chip
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sample: SignalQualitySample {
                rssi: 0,
                snr: 0,
                timestamp_ms: 0,
                valid: false,
            },
        }
    }

    /// Cached sample, refreshed from the chip when invalid or older than
    /// the cache window
    pub fn get<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        now_ms: u32,
    ) -> Result<SignalQualitySample, ChipError> {
        if !self.sample.valid
            || timeout_elapsed(now_ms, self.sample.timestamp_ms, SIGNAL_CACHE_TIMEOUT_MS)
        {
            self.refresh(chip, now_ms)?;
        }
        Ok(self.sample)
    }

    /// Fresh sample straight from the chip; also refreshes the cache
    pub fn get_realtime<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        now_ms: u32,
    ) -> Result<SignalQualitySample, ChipError> {
        self.refresh(chip, now_ms)?;
        Ok(self.sample)
    }

    /// Force the next `get` to re-read the chip.
    ///
    /// Called on frequency change, where a stale RSSI would be visibly
    /// wrong on the S-meter.
    pub fn invalidate(&mut self) {
        self.sample.valid = false;
        self.sample.timestamp_ms = 0;
    }

    /// Last sample without touching the chip (may be invalid or stale)
    #[must_use]
    pub const fn cached(&self) -> SignalQualitySample {
        self.sample
    }

    fn refresh<C: ReceiverChip>(&mut self, chip: &mut C, now_ms: u32) -> Result<(), ChipError> {
        let (rssi, snr) = chip.read_signal_quality()?;
        self.sample = SignalQualitySample {
            rssi,
            snr,
            timestamp_ms: now_ms,
            valid: true,
        };
        Ok(())
    }
}
