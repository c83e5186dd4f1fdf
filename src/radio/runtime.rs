//! Control-loop runtime state
//!
//! The mutable flags and offsets the components share within one control
//! context. Owned by the control loop and passed by reference into every
//! component call; there is no global mutable state in this crate.

/// Runtime state shared across the tuning components.
///
/// BFO fields: the net offset committed to the chip is always
/// `base + coarse + manual`, where the base is the CW tone frequency in CW
/// mode and zero otherwise.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeContext {
    /// Global audio mute requested by the operator
    pub muted: bool,

    /// Timestamp of the last above-threshold squelch sample
    pub squelch_decay_ms: u32,

    /// Scan mode engaged
    pub scan_active: bool,
    /// Scan currently paused on a station.
    ///
    /// The squelch unmute path is gated on this flag. The coupling looks
    /// unrelated to squelch semantics but is load-bearing observable
    /// behavior; it must initialise to true or squelch never unmutes.
    pub scan_paused: bool,
    /// Seek in progress
    pub seek_active: bool,

    /// Manual BFO adjustment mode engaged
    pub bfo_enabled: bool,
    /// Coarse BFO offset in Hz, driven by SSB/CW fine stepping
    pub bfo_coarse_hz: i16,
    /// Previous coarse BFO offset
    pub bfo_last_hz: i16,
    /// Manual BFO offset in Hz (-999..=999)
    pub bfo_manual_hz: i16,
    /// Step applied to the manual BFO offset
    pub bfo_step_hz: u8,

    /// SSB/CW fine tuning step in Hz (selected via `ssb_fine_step_sel`)
    pub ssb_fine_step_hz: u16,
    /// Fine step selector: 0 = 1 kHz, 1 = 100 Hz, 2 = 10 Hz
    pub ssb_fine_step_sel: u8,
    /// Accumulated fine-tuning offset awaiting the next chip rollover
    pub ssb_fine_accum_hz: i16,

    /// CW tone shift active (drives the frequency display)
    pub cw_shift: bool,

    /// Band runtime fields changed since the last persist
    pub band_data_dirty: bool,
    /// Configuration changed since the last persist
    pub config_dirty: bool,
}

impl RuntimeContext {
    /// Runtime state at power-on
    #[must_use]
    pub const fn new() -> Self {
        Self {
            muted: false,
            squelch_decay_ms: 0,
            scan_active: false,
            scan_paused: true,
            seek_active: false,
            bfo_enabled: false,
            bfo_coarse_hz: 0,
            bfo_last_hz: 0,
            bfo_manual_hz: 0,
            bfo_step_hz: 25,
            ssb_fine_step_hz: 1000,
            ssb_fine_step_sel: 0,
            ssb_fine_accum_hz: 0,
            cw_shift: false,
            band_data_dirty: false,
            config_dirty: false,
        }
    }

    /// Reset every BFO-related field (leaving AM/FM-class modes)
    pub fn clear_bfo(&mut self) {
        self.bfo_enabled = false;
        self.bfo_coarse_hz = 0;
        self.bfo_last_hz = 0;
        self.ssb_fine_accum_hz = 0;
        self.cw_shift = false;
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}
