//! Cross-core sensor cells
//!
//! The sampling core owns the ADC and periodically publishes CPU
//! temperature and supply voltage; the control core only reads. With a
//! single writer and a single reader per cell, a relaxed atomic word is
//! all the synchronisation required. Reads are deliberately rate-limited
//! by the producer (tens of seconds) so they never interleave with active
//! audio sampling on the shared bus.

use core::sync::atomic::{AtomicU32, Ordering};

/// Single-writer/single-reader published f32 value
pub struct SensorCell(AtomicU32);

impl SensorCell {
    /// New cell holding 0.0
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Publish a new value (sampling core only)
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Read the most recently published value
    #[must_use]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for SensorCell {
    fn default() -> Self {
        Self::new()
    }
}

/// CPU temperature in Celsius, measured on the sampling core
pub static CPU_TEMPERATURE: SensorCell = SensorCell::new();

/// Supply (VBUS) voltage in volts, measured on the sampling core
pub static SUPPLY_VOLTAGE: SensorCell = SensorCell::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_round_trips_a_value() {
        let cell = SensorCell::new();
        cell.store(36.75);
        assert!((cell.load() - 36.75).abs() < f32::EPSILON);
    }
}
