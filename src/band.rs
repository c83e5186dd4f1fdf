//! Band catalog
//!
//! Static descriptors for every receivable band plus the mutable per-band
//! runtime fields (current frequency, step, demodulation mode, antenna
//! capacitance). Descriptors are compiled-in constants; the runtime fields
//! are zero-initialised, then either defaulted from the descriptor or
//! restored from persisted storage exactly once at startup, and updated
//! thereafter by the tuning state machine.
//!
//! FM frequencies are in 10 kHz units, AM/SSB frequencies in kHz — the
//! chip's native tuning units.

use heapless::Vec;
use log::debug;

use crate::store::guard::SamplingControl;
use crate::store::layout::BAND_DATA_ADDR;
use crate::store::persist::{
    ByteReader, ByteWriter, EepromBackend, Persist, PersistentStore, StoreError,
};
use crate::types::{BandKind, DemodMode};

/// Number of entries in the band table
pub const BAND_COUNT: usize = 30;

/// Immutable descriptor of one receivable band
pub struct BandDescriptor {
    /// Band name shown in selection lists
    pub name: &'static str,
    /// Band class
    pub kind: BandKind,
    /// Preferred demodulation mode
    pub preferred_demod: DemodMode,
    /// Lower band limit
    pub minimum_freq: u16,
    /// Upper band limit
    pub maximum_freq: u16,
    /// Default tuning frequency
    pub default_freq: u16,
    /// Default step size
    pub default_step: u8,
    /// Amateur radio band
    pub is_ham: bool,
}

/// The compiled-in band table
pub static BAND_TABLE: [BandDescriptor; BAND_COUNT] = [
    band("FM", BandKind::Fm, DemodMode::Fm, 8750, 10800, 9390, 10, false),
    band("LW", BandKind::Lw, DemodMode::Am, 100, 514, 198, 9, false),
    band("MW", BandKind::Mw, DemodMode::Am, 514, 1800, 540, 9, false),
    band("800m", BandKind::Sw, DemodMode::Am, 280, 470, 284, 1, true),
    band("630m", BandKind::Sw, DemodMode::Lsb, 470, 480, 475, 1, true),
    band("160m", BandKind::Sw, DemodMode::Lsb, 1800, 2000, 1850, 1, true),
    band("120m", BandKind::Sw, DemodMode::Am, 2000, 3200, 2400, 5, false),
    band("90m", BandKind::Sw, DemodMode::Am, 3200, 3500, 3300, 5, false),
    band("80m", BandKind::Sw, DemodMode::Lsb, 3500, 3900, 3630, 1, true),
    band("75m", BandKind::Sw, DemodMode::Am, 3900, 5300, 3950, 5, false),
    band("60m", BandKind::Sw, DemodMode::Usb, 5300, 5900, 5375, 1, true),
    band("49m", BandKind::Sw, DemodMode::Am, 5900, 7000, 6000, 5, false),
    band("40m", BandKind::Sw, DemodMode::Lsb, 7000, 7500, 7070, 1, true),
    band("41m", BandKind::Sw, DemodMode::Am, 7200, 9000, 7210, 5, false),
    band("31m", BandKind::Sw, DemodMode::Am, 9000, 10000, 9600, 5, false),
    band("30m", BandKind::Sw, DemodMode::Usb, 10000, 10100, 10100, 1, true),
    band("25m", BandKind::Sw, DemodMode::Am, 10200, 13500, 11700, 5, false),
    band("22m", BandKind::Sw, DemodMode::Am, 13500, 14000, 13700, 5, false),
    band("20m", BandKind::Sw, DemodMode::Usb, 14000, 14500, 14074, 1, true),
    band("19m", BandKind::Sw, DemodMode::Am, 14500, 17500, 15700, 5, false),
    band("17m", BandKind::Sw, DemodMode::Am, 17500, 18000, 17600, 5, false),
    band("16m", BandKind::Sw, DemodMode::Usb, 18000, 18500, 18100, 1, true),
    band("15m", BandKind::Sw, DemodMode::Am, 18500, 21000, 18950, 5, false),
    band("14m", BandKind::Sw, DemodMode::Usb, 21000, 21500, 21074, 1, true),
    band("13m", BandKind::Sw, DemodMode::Am, 21500, 24000, 21500, 5, false),
    band("12m", BandKind::Sw, DemodMode::Usb, 24000, 25500, 24940, 1, true),
    band("11m", BandKind::Sw, DemodMode::Am, 25500, 26100, 25800, 5, false),
    band("CB", BandKind::Sw, DemodMode::Am, 26100, 28000, 27200, 1, false),
    band("10m", BandKind::Sw, DemodMode::Usb, 28000, 30000, 28500, 1, true),
    band("SW", BandKind::Sw, DemodMode::Am, 100, 30000, 15500, 5, false),
];

#[allow(clippy::too_many_arguments)]
const fn band(
    name: &'static str,
    kind: BandKind,
    preferred_demod: DemodMode,
    minimum_freq: u16,
    maximum_freq: u16,
    default_freq: u16,
    default_step: u8,
    is_ham: bool,
) -> BandDescriptor {
    BandDescriptor {
        name,
        kind,
        preferred_demod,
        minimum_freq,
        maximum_freq,
        default_freq,
        default_step,
        is_ham,
    }
}

/// One band entry: descriptor fields plus the mutable runtime fields.
///
/// Runtime fields use 0 as the "never initialised" sentinel; they stay
/// within the descriptor's frequency bounds once initialised.
#[derive(Clone, Copy, Debug)]
pub struct BandRecord {
    /// Band name
    pub name: &'static str,
    /// Band class
    pub kind: BandKind,
    /// Preferred demodulation mode
    pub preferred_demod: DemodMode,
    /// Lower band limit
    pub minimum_freq: u16,
    /// Upper band limit
    pub maximum_freq: u16,
    /// Default tuning frequency
    pub default_freq: u16,
    /// Default step size
    pub default_step: u8,
    /// Amateur radio band
    pub is_ham: bool,

    /// Current frequency (0 until initialised)
    pub curr_freq: u16,
    /// Current step size
    pub curr_step: u8,
    /// Current demodulation mode
    pub curr_demod: DemodMode,
    /// Antenna tuning capacitor value
    pub ant_cap: u16,
}

impl BandRecord {
    const fn from_descriptor(desc: &BandDescriptor) -> Self {
        Self {
            name: desc.name,
            kind: desc.kind,
            preferred_demod: desc.preferred_demod,
            minimum_freq: desc.minimum_freq,
            maximum_freq: desc.maximum_freq,
            default_freq: desc.default_freq,
            default_step: desc.default_step,
            is_ham: desc.is_ham,
            curr_freq: 0,
            curr_step: 0,
            curr_demod: DemodMode::Fm,
            ant_cap: 0,
        }
    }
}

/// Sentinel returned for out-of-range catalog indices; callers always get
/// a valid (if meaningless) record to read
static EMPTY_BAND: BandRecord = BandRecord {
    name: "",
    kind: BandKind::Fm,
    preferred_demod: DemodMode::Fm,
    minimum_freq: 0,
    maximum_freq: 0,
    default_freq: 0,
    default_step: 0,
    is_ham: false,
    curr_freq: 0,
    curr_step: 0,
    curr_demod: DemodMode::Fm,
    ant_cap: 0,
};

/// Default antenna tuning capacitor for a band class: shortwave needs the
/// tuning capacitor, FM/MW/LW do not
#[must_use]
pub const fn default_ant_cap(kind: BandKind) -> u16 {
    match kind {
        BandKind::Sw => 1,
        BandKind::Fm | BandKind::Mw | BandKind::Lw => 0,
    }
}

/// The band table with its mutable runtime state.
///
/// Exclusively owned by the tuning runtime; the view layer only ever
/// receives `&BandRecord` snapshots.
pub struct BandCatalog {
    bands: [BandRecord; BAND_COUNT],
}

impl BandCatalog {
    /// Build the catalog with zeroed runtime fields
    #[must_use]
    pub fn new() -> Self {
        let mut bands = [BandRecord::from_descriptor(&BAND_TABLE[0]); BAND_COUNT];
        let mut i = 1;
        while i < BAND_COUNT {
            bands[i] = BandRecord::from_descriptor(&BAND_TABLE[i]);
            i += 1;
        }
        Self { bands }
    }

    /// Record for `index`, or the sentinel empty record when out of range
    #[must_use]
    pub fn get(&self, index: u8) -> &BandRecord {
        self.bands.get(usize::from(index)).unwrap_or(&EMPTY_BAND)
    }

    /// Mutable record access for the tuning runtime
    pub(crate) fn get_mut(&mut self, index: u8) -> Option<&mut BandRecord> {
        self.bands.get_mut(usize::from(index))
    }

    /// Index of the band named `name`
    #[must_use]
    pub fn find_index(&self, name: &str) -> Option<u8> {
        self.bands
            .iter()
            .position(|b| b.name == name)
            .map(|i| i as u8)
    }

    /// Number of bands matching the HAM filter
    #[must_use]
    pub fn filtered_count(&self, is_ham: bool) -> u8 {
        self.bands.iter().filter(|b| b.is_ham == is_ham).count() as u8
    }

    /// Names of the bands matching the HAM filter
    #[must_use]
    pub fn filtered_names(&self, is_ham: bool) -> Vec<&'static str, BAND_COUNT> {
        let mut names = Vec::new();
        for record in self.bands.iter().filter(|b| b.is_ham == is_ham) {
            let _ = names.push(record.name);
        }
        names
    }

    /// One-time initialisation of the runtime fields.
    ///
    /// Fills unset fields from the descriptor defaults. With `force`, every
    /// band is revisited, but a field is only overwritten while it still
    /// holds its sentinel — a partially restored record is never clobbered.
    pub fn initialize(&mut self, force: bool) {
        debug!("band catalog: initialize(force={})", force);
        for record in &mut self.bands {
            if record.curr_freq == 0 || force {
                if record.curr_freq == 0 {
                    record.curr_freq = record.default_freq;
                }
                if record.curr_step == 0 {
                    record.curr_step = record.default_step;
                }
                // 0 decodes as FM, which doubles as the unset sentinel;
                // the FM band's preferred mode is FM so this is lossless
                if record.curr_demod == DemodMode::Fm {
                    record.curr_demod = record.preferred_demod;
                }
                if record.ant_cap == 0 {
                    record.ant_cap = default_ant_cap(record.kind);
                }
            }
        }
    }

    /// Copy the runtime fields out for persistence
    #[must_use]
    pub fn runtime_snapshot(&self) -> BandStoreData {
        let mut data = BandStoreData::default();
        for (entry, record) in data.bands.iter_mut().zip(self.bands.iter()) {
            entry.curr_freq = record.curr_freq;
            entry.curr_step = record.curr_step;
            entry.curr_demod = record.curr_demod.as_u8();
            entry.ant_cap = record.ant_cap;
        }
        data
    }

    /// Copy persisted runtime fields back into the table
    pub fn restore_runtime(&mut self, data: &BandStoreData) {
        for (record, entry) in self.bands.iter_mut().zip(data.bands.iter()) {
            record.curr_freq = entry.curr_freq;
            record.curr_step = entry.curr_step;
            record.curr_demod = DemodMode::from_u8(entry.curr_demod);
            record.ant_cap = entry.ant_cap;
        }
    }

    /// Persist the runtime fields
    pub fn save_runtime_fields<E: EepromBackend, S: SamplingControl>(
        &self,
        store: &mut PersistentStore<E>,
        sampling: &mut S,
    ) -> Result<u16, StoreError> {
        store.save(&self.runtime_snapshot(), BAND_DATA_ADDR, sampling)
    }

    /// Restore the runtime fields from storage; corrupt content leaves the
    /// zeroed defaults in place (and re-persists them), to be filled by
    /// [`Self::initialize`]
    pub fn load_runtime_fields<E: EepromBackend, S: SamplingControl>(
        &mut self,
        store: &mut PersistentStore<E>,
        sampling: &mut S,
    ) {
        let mut data = BandStoreData::default();
        store.load(&mut data, BAND_DATA_ADDR, sampling);
        self.restore_runtime(&data);
    }
}

impl Default for BandCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted runtime fields of one band
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BandRuntimeEntry {
    /// Current frequency
    pub curr_freq: u16,
    /// Current step size
    pub curr_step: u8,
    /// Current demodulation mode (raw byte; 0 doubles as unset)
    pub curr_demod: u8,
    /// Antenna tuning capacitor
    pub ant_cap: u16,
}

const BAND_ENTRY_LEN: usize = 6;

/// Persisted runtime fields for the whole band table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandStoreData {
    /// One entry per band, table order
    pub bands: [BandRuntimeEntry; BAND_COUNT],
}

impl Default for BandStoreData {
    fn default() -> Self {
        Self {
            bands: [BandRuntimeEntry::default(); BAND_COUNT],
        }
    }
}

impl Persist for BandStoreData {
    const ENCODED_LEN: usize = BAND_COUNT * BAND_ENTRY_LEN;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = ByteWriter::new(buf);
        for entry in &self.bands {
            w.put_u16(entry.curr_freq);
            w.put_u8(entry.curr_step);
            w.put_u8(entry.curr_demod);
            w.put_u16(entry.ant_cap);
        }
    }

    fn decode(buf: &[u8]) -> Self {
        let mut r = ByteReader::new(buf);
        let mut data = Self::default();
        for entry in &mut data.bands {
            entry.curr_freq = r.take_u16();
            entry.curr_step = r.take_u8();
            entry.curr_demod = r.take_u8();
            entry.ant_cap = r.take_u16();
        }
        data
    }
}

/// Bandwidth selection entry: display label plus the index handed to the
/// chip
pub struct BandwidthOption {
    /// Display label (kHz, or a filter name)
    pub label: &'static str,
    /// Index passed to the chip's bandwidth command
    pub index: u8,
}

/// FM channel filter choices
pub static BANDWIDTH_FM: [BandwidthOption; 5] = [
    BandwidthOption { label: "AUTO", index: 0 },
    BandwidthOption { label: "110", index: 1 },
    BandwidthOption { label: "84", index: 2 },
    BandwidthOption { label: "60", index: 3 },
    BandwidthOption { label: "40", index: 4 },
];

/// AM channel filter choices
pub static BANDWIDTH_AM: [BandwidthOption; 7] = [
    BandwidthOption { label: "1.0", index: 4 },
    BandwidthOption { label: "1.8", index: 5 },
    BandwidthOption { label: "2.0", index: 3 },
    BandwidthOption { label: "2.5", index: 6 },
    BandwidthOption { label: "3.0", index: 2 },
    BandwidthOption { label: "4.0", index: 1 },
    BandwidthOption { label: "6.0", index: 0 },
];

/// SSB/CW audio bandwidth choices
pub static BANDWIDTH_SSB: [BandwidthOption; 6] = [
    BandwidthOption { label: "0.5", index: 4 },
    BandwidthOption { label: "1.0", index: 5 },
    BandwidthOption { label: "1.2", index: 0 },
    BandwidthOption { label: "2.2", index: 1 },
    BandwidthOption { label: "3.0", index: 2 },
    BandwidthOption { label: "4.0", index: 3 },
];

/// Frequency step entry: display label plus the chip step value
pub struct StepOption {
    /// Display label
    pub label: &'static str,
    /// Step value in chip units
    pub value: u8,
}

/// Step choices for AM-class bands
pub static STEP_AM: [StepOption; 4] = [
    StepOption { label: "1kHz", value: 1 },
    StepOption { label: "5kHz", value: 5 },
    StepOption { label: "9kHz", value: 9 },
    StepOption { label: "10kHz", value: 10 },
];

/// Step choices for FM
pub static STEP_FM: [StepOption; 3] = [
    StepOption { label: "50kHz", value: 5 },
    StepOption { label: "100kHz", value: 10 },
    StepOption { label: "1MHz", value: 100 },
];

/// Step choices for the manual BFO offset
pub static STEP_BFO: [StepOption; 4] = [
    StepOption { label: "1Hz", value: 1 },
    StepOption { label: "5Hz", value: 5 },
    StepOption { label: "10Hz", value: 10 },
    StepOption { label: "25Hz", value: 25 },
];

/// Label for a chip bandwidth index, if the table contains it
#[must_use]
pub fn bandwidth_label(table: &'static [BandwidthOption], index: u8) -> Option<&'static str> {
    table.iter().find(|o| o.index == index).map(|o| o.label)
}

/// Chip bandwidth index for a display label
#[must_use]
pub fn bandwidth_index(table: &'static [BandwidthOption], label: &str) -> Option<u8> {
    table.iter().find(|o| o.label == label).map(|o| o.index)
}

/// Step value for a table position; 0 when the position is out of range
#[must_use]
pub fn step_value(table: &'static [StepOption], position: u8) -> u8 {
    table.get(usize::from(position)).map_or(0, |o| o.value)
}

/// Step label for a table position
#[must_use]
pub fn step_label(table: &'static [StepOption], position: u8) -> Option<&'static str> {
    table.get(usize::from(position)).map(|o| o.label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_indices_match_the_layout_the_memories_reference() {
        assert_eq!(BAND_TABLE[0].name, "FM");
        assert_eq!(BAND_TABLE[2].name, "MW");
        assert_eq!(BAND_TABLE[12].name, "40m");
        assert_eq!(BAND_TABLE[29].name, "SW");
    }

    #[test]
    fn band_store_round_trips() {
        let mut catalog = BandCatalog::new();
        catalog.initialize(false);
        let snapshot = catalog.runtime_snapshot();

        let mut buf = [0u8; BandStoreData::ENCODED_LEN];
        snapshot.encode(&mut buf);
        assert_eq!(BandStoreData::decode(&buf), snapshot);
    }

    #[test]
    fn bandwidth_lookup_by_label_and_index() {
        assert_eq!(bandwidth_label(&BANDWIDTH_SSB, 5), Some("1.0"));
        assert_eq!(bandwidth_index(&BANDWIDTH_AM, "6.0"), Some(0));
        assert_eq!(bandwidth_label(&BANDWIDTH_FM, 9), None);
    }

    #[test]
    fn step_lookup_degrades_to_zero() {
        assert_eq!(step_value(&STEP_AM, 2), 9);
        assert_eq!(step_value(&STEP_AM, 200), 0);
    }
}
