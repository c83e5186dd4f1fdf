//! Simulation harness
//!
//! Scripted stand-ins for the receiver chip, the EEPROM, the cross-core
//! FIFO and the sampling control, used by the host test suite. Each fake
//! records the commands it receives so tests can assert on command
//! counts, not just end state.

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::audio::channel::FifoPort;
use crate::chip::{ChipError, ReceiverChip};
use crate::store::guard::SamplingControl;
use crate::store::persist::EepromBackend;
use crate::types::{AgcState, RdsDateTime, RdsStatus, Sideband};

/// Mode most recently committed to the simulated chip
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SimMode {
    /// No mode committed yet
    #[default]
    None,
    /// FM mode
    Fm,
    /// AM mode
    Am,
    /// SSB mode with the selected sideband
    Ssb(Sideband),
}

/// Scripted receiver chip
#[derive(Debug, Default)]
pub struct SimChip {
    /// Chip frequency register
    pub freq: u16,
    /// Offset the chip applies when landing on a requested frequency
    pub tune_offset: i16,
    /// Mode last committed
    pub mode: SimMode,
    /// Band limits last committed
    pub limits: (u16, u16),
    /// Step last committed via a mode entry
    pub step: u8,
    /// Step last committed via the step command
    pub explicit_step: Option<u8>,
    /// BFO offset last committed
    pub bfo: i16,
    /// Antenna capacitor last committed
    pub ant_cap: u16,
    /// Volume last committed
    pub volume: u8,
    /// Soft mute state
    pub audio_muted: bool,
    /// Hardware mute state
    pub hardware_muted: bool,
    /// AGC state mirrored on the chip
    pub agc: Option<AgcState>,
    /// Scripted RSSI
    pub rssi: u8,
    /// Scripted SNR
    pub snr: u8,
    /// Scripted RDS availability
    pub rds_usable: bool,
    /// Scripted station name
    pub station_name: std::string::String,
    /// Scripted program type
    pub pty: u8,
    /// Scripted radio text
    pub radio_text: std::string::String,
    /// Scripted clock time
    pub clock: Option<RdsDateTime>,
    /// SSB audio bandwidth last committed
    pub ssb_bandwidth: Option<u8>,
    /// SSB cutoff filter last committed
    pub ssb_cutoff: Option<u8>,
    /// AM bandwidth last committed
    pub am_bandwidth: Option<u8>,
    /// FM bandwidth last committed
    pub fm_bandwidth: Option<u8>,

    /// Power-up count (each clears the patch)
    pub power_ups: u32,
    /// Patch download count
    pub patch_downloads: u32,
    /// Explicit frequency writes
    pub frequency_writes: u32,
    /// Soft mute commands issued
    pub audio_mute_commands: u32,
    /// AGC override commands issued
    pub agc_commands: u32,
    /// AGC status queries issued
    pub agc_queries: u32,
    /// RSQ reads issued
    pub signal_reads: u32,
    /// Milliseconds spent in settle delays
    pub settled_ms: u32,
}

impl SimChip {
    /// Fresh chip with a usable default AGC state
    #[must_use]
    pub fn new() -> Self {
        Self {
            agc: Some(AgcState {
                enabled: true,
                index: 0,
            }),
            ..Self::default()
        }
    }

    fn land(&mut self, freq: u16) {
        self.freq = freq.saturating_add_signed(self.tune_offset);
    }
}

impl ReceiverChip for SimChip {
    fn power_up(&mut self, fm: bool) -> Result<(), ChipError> {
        self.power_ups += 1;
        self.mode = if fm { SimMode::Fm } else { SimMode::Am };
        Ok(())
    }

    fn load_ssb_patch(&mut self) -> Result<(), ChipError> {
        self.patch_downloads += 1;
        Ok(())
    }

    fn set_ssb_config(&mut self, bandwidth_index: u8) -> Result<(), ChipError> {
        self.ssb_bandwidth = Some(bandwidth_index);
        Ok(())
    }

    fn set_fm(&mut self, min: u16, max: u16, freq: u16, step: u8) -> Result<(), ChipError> {
        self.mode = SimMode::Fm;
        self.limits = (min, max);
        self.step = step;
        self.land(freq);
        // Mode entry lifts the chip's own mute
        self.audio_muted = false;
        Ok(())
    }

    fn set_am(&mut self, min: u16, max: u16, freq: u16, step: u8) -> Result<(), ChipError> {
        self.mode = SimMode::Am;
        self.limits = (min, max);
        self.step = step;
        self.land(freq);
        self.audio_muted = false;
        Ok(())
    }

    fn set_ssb(
        &mut self,
        min: u16,
        max: u16,
        freq: u16,
        step: u8,
        sideband: Sideband,
    ) -> Result<(), ChipError> {
        self.mode = SimMode::Ssb(sideband);
        self.limits = (min, max);
        self.step = step;
        self.land(freq);
        self.audio_muted = false;
        Ok(())
    }

    fn set_ssb_bfo(&mut self, offset_hz: i16) -> Result<(), ChipError> {
        self.bfo = offset_hz;
        Ok(())
    }

    fn set_frequency(&mut self, freq: u16) -> Result<(), ChipError> {
        self.frequency_writes += 1;
        self.land(freq);
        Ok(())
    }

    fn frequency(&mut self) -> Result<u16, ChipError> {
        Ok(self.freq)
    }

    fn set_frequency_step(&mut self, step: u8) -> Result<(), ChipError> {
        self.explicit_step = Some(step);
        Ok(())
    }

    fn set_antenna_capacitor(&mut self, cap: u16) -> Result<(), ChipError> {
        self.ant_cap = cap;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), ChipError> {
        self.volume = volume;
        Ok(())
    }

    fn set_audio_mute(&mut self, mute: bool) -> Result<(), ChipError> {
        self.audio_mute_commands += 1;
        self.audio_muted = mute;
        Ok(())
    }

    fn set_hardware_mute(&mut self, mute: bool) -> Result<(), ChipError> {
        self.hardware_muted = mute;
        Ok(())
    }

    fn set_fm_deemphasis(&mut self, _europe: bool) -> Result<(), ChipError> {
        Ok(())
    }

    fn set_rds_config(&mut self, _enabled: bool, _threshold: u8) -> Result<(), ChipError> {
        Ok(())
    }

    fn set_ssb_audio_bandwidth(&mut self, index: u8) -> Result<(), ChipError> {
        self.ssb_bandwidth = Some(index);
        Ok(())
    }

    fn set_ssb_cutoff_filter(&mut self, mode: u8) -> Result<(), ChipError> {
        self.ssb_cutoff = Some(mode);
        Ok(())
    }

    fn set_am_bandwidth(&mut self, index: u8) -> Result<(), ChipError> {
        self.am_bandwidth = Some(index);
        Ok(())
    }

    fn set_fm_bandwidth(&mut self, index: u8) -> Result<(), ChipError> {
        self.fm_bandwidth = Some(index);
        Ok(())
    }

    fn read_signal_quality(&mut self) -> Result<(u8, u8), ChipError> {
        self.signal_reads += 1;
        Ok((self.rssi, self.snr))
    }

    fn set_agc(&mut self, disabled: bool, index: u8) -> Result<(), ChipError> {
        self.agc_commands += 1;
        self.agc = Some(AgcState {
            enabled: !disabled,
            index,
        });
        Ok(())
    }

    fn agc_state(&mut self) -> Result<AgcState, ChipError> {
        self.agc_queries += 1;
        self.agc.ok_or(ChipError::Timeout)
    }

    fn rds_status(&mut self) -> Result<RdsStatus, ChipError> {
        Ok(RdsStatus {
            received: self.rds_usable,
            sync: self.rds_usable,
            sync_found: self.rds_usable,
        })
    }

    fn rds_station_name(&mut self) -> Result<String<8>, ChipError> {
        let mut name = String::new();
        for c in self.station_name.chars().take(8) {
            let _ = name.push(c);
        }
        Ok(name)
    }

    fn rds_program_type(&mut self) -> Result<u8, ChipError> {
        Ok(self.pty)
    }

    fn rds_radio_text(&mut self) -> Result<String<64>, ChipError> {
        let mut text = String::new();
        for c in self.radio_text.chars().take(64) {
            let _ = text.push(c);
        }
        Ok(text)
    }

    fn rds_date_time(&mut self) -> Result<Option<RdsDateTime>, ChipError> {
        Ok(self.clock)
    }

    fn settle_ms(&mut self, ms: u32) {
        self.settled_ms += ms;
    }
}

/// In-memory EEPROM with a scriptable commit failure
pub struct SimEeprom {
    /// Raw storage content
    pub bytes: Vec<u8>,
    /// When true, commits report failure
    pub fail_commit: bool,
    /// Confirmed commits
    pub commits: u32,
}

impl SimEeprom {
    /// Zero-filled EEPROM of `size` bytes
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            fail_commit: false,
            commits: 0,
        }
    }
}

impl EepromBackend for SimEeprom {
    fn read(&mut self, addr: u16, buf: &mut [u8]) {
        let start = usize::from(addr);
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
    }

    fn write(&mut self, addr: u16, data: &[u8]) {
        let start = usize::from(addr);
        self.bytes[start..start + data.len()].copy_from_slice(data);
    }

    fn commit(&mut self) -> bool {
        if self.fail_commit {
            false
        } else {
            self.commits += 1;
            true
        }
    }
}

/// Scripted word FIFO: records everything pushed, answers from a queue.
///
/// An unscripted pop returns 0, which the channel treats as a framing
/// failure.
#[derive(Debug, Default)]
pub struct SimFifo {
    /// Words pushed toward the other core
    pub sent: Vec<u32>,
    /// Scripted response words
    pub replies: VecDeque<u32>,
}

impl SimFifo {
    /// Empty FIFO
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response word
    pub fn script(&mut self, word: u32) {
        self.replies.push_back(word);
    }
}

impl FifoPort for SimFifo {
    fn push(&mut self, word: u32) {
        self.sent.push(word);
    }

    fn pop(&mut self) -> u32 {
        self.replies.pop_front().unwrap_or(0)
    }

    fn available(&self) -> bool {
        !self.replies.is_empty()
    }
}

/// Recording sampling control
#[derive(Clone, Copy, Debug, Default)]
pub struct SimSampling {
    /// Sampling loop currently active
    pub running: bool,
    /// Stop calls observed
    pub stops: u32,
    /// Start calls observed
    pub starts: u32,
}

impl SimSampling {
    /// Sampling control in the given initial state
    #[must_use]
    pub fn new(running: bool) -> Self {
        Self {
            running,
            stops: 0,
            starts: 0,
        }
    }
}

impl SamplingControl for SimSampling {
    fn is_sampling(&self) -> bool {
        self.running
    }

    fn stop_sampling(&mut self) {
        self.running = false;
        self.stops += 1;
    }

    fn start_sampling(&mut self) {
        self.running = true;
        self.starts += 1;
    }
}

/// Delay provider that only accumulates the requested time.
///
/// Clones share the counter, so a test can keep a handle while the
/// pipeline owns the provider.
#[derive(Clone, Debug, Default)]
pub struct SimDelay {
    total: std::rc::Rc<std::cell::Cell<u64>>,
}

impl SimDelay {
    /// Nanoseconds requested so far
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.total.get()
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total.set(self.total.get() + u64::from(ns));
    }
}
