//! EEPROM layout
//!
//! Central address map for everything persisted. Each logical dataset
//! occupies its own non-overlapping range sized `encoded length + CRC
//! trailer`; the map is validated against the EEPROM size at compile
//! time.
//!
//! ```text
//! +------------------+----------+
//! | Config           | 0x0000   |
//! | Band runtime     | Config+  |
//! | FM stations      | Bands+   |
//! | AM stations      | FM+      |
//! +------------------+----------+
//! ```

use crate::band::BandStoreData;
use crate::config::{RadioConfig, EEPROM_SIZE};
use crate::store::persist::{required_size, Persist};
use crate::store::stations::{AmStationList, FmStationList};

/// Config record address (always first)
pub const CONFIG_ADDR: u16 = 0;

/// Config record footprint
pub const CONFIG_SIZE: usize = required_size::<RadioConfig>();

/// Band runtime data address
pub const BAND_DATA_ADDR: u16 = CONFIG_ADDR + CONFIG_SIZE as u16;

/// Band runtime data footprint
pub const BAND_DATA_SIZE: usize = required_size::<BandStoreData>();

/// FM station list address
pub const FM_STATIONS_ADDR: u16 = BAND_DATA_ADDR + BAND_DATA_SIZE as u16;

/// FM station list footprint
pub const FM_STATIONS_SIZE: usize = required_size::<FmStationList>();

/// AM station list address
pub const AM_STATIONS_ADDR: u16 = FM_STATIONS_ADDR + FM_STATIONS_SIZE as u16;

/// AM station list footprint
pub const AM_STATIONS_SIZE: usize = required_size::<AmStationList>();

/// Total EEPROM bytes in use
pub const EEPROM_TOTAL_USED: usize =
    AM_STATIONS_ADDR as usize + AM_STATIONS_SIZE;

const _: () = assert!(
    EEPROM_TOTAL_USED <= EEPROM_SIZE,
    "EEPROM layout exceeds the available space"
);

const _: () = assert!(
    crate::store::persist::MAX_RECORD_LEN >= FmStationList::ENCODED_LEN,
    "store scratch buffer is smaller than the largest record"
);
