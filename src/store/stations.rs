//! Persisted station memories
//!
//! Two fixed-capacity lists (FM and AM-class) of stored stations, each a
//! band/frequency/demod/bandwidth tuple plus a short name. Tuning to a
//! stored entry goes through the tuning state machine's memory-tune
//! operation.

use crate::store::guard::SamplingControl;
use crate::store::layout::{AM_STATIONS_ADDR, FM_STATIONS_ADDR};
use crate::store::persist::{
    ByteReader, ByteWriter, EepromBackend, Persist, PersistentStore, StoreError,
};
use crate::types::DemodMode;

/// Capacity of the FM station list
pub const MAX_FM_STATIONS: usize = 40;

/// Capacity of the AM-class station list
pub const MAX_AM_STATIONS: usize = 40;

/// Maximum station name length in bytes
pub const STATION_NAME_LEN: usize = 15;

const NAME_BUF_LEN: usize = STATION_NAME_LEN + 1;

const ENTRY_LEN: usize = 1 + 2 + 1 + 1 + NAME_BUF_LEN;

/// One stored station
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationEntry {
    /// Band catalog index
    pub band_index: u8,
    /// Frequency in chip units (FM 10 kHz, AM/SSB kHz)
    pub frequency: u16,
    /// Demodulation mode
    pub demod: DemodMode,
    /// Bandwidth index for the mode's table
    pub bandwidth_index: u8,
    /// NUL-padded station name
    name: [u8; NAME_BUF_LEN],
}

impl StationEntry {
    /// Build an entry with the given tuning and name (name is truncated to
    /// the stored capacity)
    #[must_use]
    pub fn new(band_index: u8, frequency: u16, demod: DemodMode, bandwidth_index: u8, name: &str) -> Self {
        let mut entry = Self {
            band_index,
            frequency,
            demod,
            bandwidth_index,
            name: [0; NAME_BUF_LEN],
        };
        entry.set_name(name);
        entry
    }

    /// Station name
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_BUF_LEN);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Replace the station name, truncated to capacity
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; NAME_BUF_LEN];
        let len = name.len().min(STATION_NAME_LEN);
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
    }
}

impl Default for StationEntry {
    fn default() -> Self {
        Self {
            band_index: 0,
            frequency: 0,
            demod: DemodMode::Fm,
            bandwidth_index: 0,
            name: [0; NAME_BUF_LEN],
        }
    }
}

/// Fixed-capacity station list, persisted as one record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationList<const N: usize> {
    entries: [StationEntry; N],
    count: u8,
}

/// The persisted FM station list
pub type FmStationList = StationList<MAX_FM_STATIONS>;

/// The persisted AM-class station list
pub type AmStationList = StationList<MAX_AM_STATIONS>;

impl<const N: usize> StationList<N> {
    /// Empty list
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: [StationEntry::default(); N],
            count: 0,
        }
    }

    /// Number of stored stations
    #[must_use]
    pub fn count(&self) -> u8 {
        self.count
    }

    /// True when no further station fits
    #[must_use]
    pub fn is_full(&self) -> bool {
        usize::from(self.count) >= N
    }

    /// Stored station at `index`
    #[must_use]
    pub fn get(&self, index: u8) -> Option<&StationEntry> {
        if index < self.count {
            self.entries.get(usize::from(index))
        } else {
            None
        }
    }

    /// Append a station; false when the list is full
    pub fn add(&mut self, entry: StationEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[usize::from(self.count)] = entry;
        self.count += 1;
        true
    }

    /// Remove the station at `index`, compacting the tail
    pub fn remove(&mut self, index: u8) -> bool {
        if index >= self.count {
            return false;
        }
        let idx = usize::from(index);
        let last = usize::from(self.count) - 1;
        for i in idx..last {
            self.entries[i] = self.entries[i + 1];
        }
        self.entries[last] = StationEntry::default();
        self.count -= 1;
        true
    }

    /// Index of the station matching the given tuning, if stored
    #[must_use]
    pub fn find(&self, band_index: u8, frequency: u16, demod: DemodMode) -> Option<u8> {
        self.entries[..usize::from(self.count)]
            .iter()
            .position(|e| {
                e.band_index == band_index && e.frequency == frequency && e.demod == demod
            })
            .map(|i| i as u8)
    }

    /// Stored stations, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &StationEntry> {
        self.entries[..usize::from(self.count)].iter()
    }
}

impl<const N: usize> Default for StationList<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Persist for StationList<N> {
    const ENCODED_LEN: usize = 1 + N * ENTRY_LEN;

    fn encode(&self, buf: &mut [u8]) {
        let mut w = ByteWriter::new(buf);
        w.put_u8(self.count);
        for entry in &self.entries {
            w.put_u8(entry.band_index);
            w.put_u16(entry.frequency);
            w.put_u8(entry.demod.as_u8());
            w.put_u8(entry.bandwidth_index);
            w.put_bytes(&entry.name);
        }
    }

    fn decode(buf: &[u8]) -> Self {
        let mut r = ByteReader::new(buf);
        let mut list = Self::new();
        list.count = r.take_u8().min(N as u8);
        for entry in &mut list.entries {
            entry.band_index = r.take_u8();
            entry.frequency = r.take_u16();
            entry.demod = DemodMode::from_u8(r.take_u8());
            entry.bandwidth_index = r.take_u8();
            entry.name = r.take_bytes::<NAME_BUF_LEN>();
        }
        list
    }
}

/// Restore the FM station list from storage (corrupt content degrades to
/// an empty list, re-persisted on the spot)
pub fn load_fm_stations<E: EepromBackend, S: SamplingControl>(
    store: &mut PersistentStore<E>,
    sampling: &mut S,
) -> FmStationList {
    let mut list = FmStationList::new();
    store.load(&mut list, FM_STATIONS_ADDR, sampling);
    list
}

/// Persist the FM station list
pub fn save_fm_stations<E: EepromBackend, S: SamplingControl>(
    list: &FmStationList,
    store: &mut PersistentStore<E>,
    sampling: &mut S,
) -> Result<u16, StoreError> {
    store.save(list, FM_STATIONS_ADDR, sampling)
}

/// Restore the AM station list from storage
pub fn load_am_stations<E: EepromBackend, S: SamplingControl>(
    store: &mut PersistentStore<E>,
    sampling: &mut S,
) -> AmStationList {
    let mut list = AmStationList::new();
    store.load(&mut list, AM_STATIONS_ADDR, sampling);
    list
}

/// Persist the AM station list
pub fn save_am_stations<E: EepromBackend, S: SamplingControl>(
    list: &AmStationList,
    store: &mut PersistentStore<E>,
    sampling: &mut S,
) -> Result<u16, StoreError> {
    store.save(list, AM_STATIONS_ADDR, sampling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_find_remove() {
        let mut list: StationList<4> = StationList::new();
        assert!(list.add(StationEntry::new(2, 540, DemodMode::Am, 0, "Kossuth")));
        assert!(list.add(StationEntry::new(0, 9390, DemodMode::Fm, 0, "Petofi")));
        assert_eq!(list.count(), 2);

        assert_eq!(list.find(2, 540, DemodMode::Am), Some(0));
        assert_eq!(list.find(2, 541, DemodMode::Am), None);

        assert!(list.remove(0));
        assert_eq!(list.count(), 1);
        assert_eq!(list.get(0).map(StationEntry::name), Some("Petofi"));
    }

    #[test]
    fn long_names_are_truncated_not_rejected() {
        let entry = StationEntry::new(0, 10000, DemodMode::Fm, 0, "A very long station name");
        assert_eq!(entry.name(), "A very long sta");
    }

    #[test]
    fn list_encoding_round_trips() {
        let mut list: StationList<4> = StationList::new();
        list.add(StationEntry::new(12, 7070, DemodMode::Lsb, 1, "40m net"));

        let mut buf = [0u8; StationList::<4>::ENCODED_LEN];
        list.encode(&mut buf);
        assert_eq!(StationList::<4>::decode(&buf), list);
    }

    #[test]
    fn decode_clamps_an_oversized_count() {
        let list: StationList<4> = StationList::new();
        let mut buf = [0u8; StationList::<4>::ENCODED_LEN];
        list.encode(&mut buf);
        buf[0] = 200;
        assert_eq!(StationList::<4>::decode(&buf).count(), 4);
    }
}
