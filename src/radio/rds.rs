//! RDS cache
//!
//! Adaptive-interval cache of the broadcast metadata: station name,
//! program type, radio text and clock time. Only active on the FM band.
//! Polling runs fast while the station is still unidentified and drops to
//! a slower cadence once a valid name has been confirmed; a record with no
//! valid update for the staleness timeout counts as "no reception" even
//! without an explicit clear. All fields are cleared together on band or
//! frequency change.

use core::fmt::Write as _;

use heapless::String;
use log::debug;

use crate::chip::{ChipError, ReceiverChip};
use crate::config::{
    RDS_DATA_TIMEOUT_MS, RDS_UPDATE_INTERVAL_FAST_MS, RDS_UPDATE_INTERVAL_SLOW_MS,
};
use crate::types::timeout_elapsed;

/// A station name shorter than this is treated as not-yet-identified
const VALID_STATION_NAME_MIN_LEN: usize = 3;

/// Program type names defined by the RDS standard (codes 0-31)
pub static PTY_NAMES: [&str; 32] = [
    "No defined",
    "News",
    "Current affairs",
    "Information",
    "Sport",
    "Education",
    "Drama",
    "Culture",
    "Science",
    "Varied",
    "Pop Music",
    "Rock Music",
    "Easy Listening",
    "Light Classical",
    "Serious Classical",
    "Other Music",
    "Weather",
    "Finance",
    "Children's Programmes",
    "Social Affairs",
    "Religion",
    "Phone-in",
    "Travel",
    "Leisure",
    "Jazz Music",
    "Country Music",
    "National Music",
    "Oldies Music",
    "Folk Music",
    "Documentary",
    "Alarm Test",
    "Alarm",
];

/// Name for a program type code
#[must_use]
pub fn pty_name(code: u8) -> &'static str {
    PTY_NAMES.get(usize::from(code)).copied().unwrap_or("Unknown")
}

/// Cached RDS record
#[derive(Clone, Debug, Default)]
pub struct RdsCache {
    station_name: String<32>,
    program_type: Option<u8>,
    radio_text: String<64>,
    date: String<16>,
    time: String<8>,
    last_update_ms: u32,
    last_valid_ms: u32,
}

impl RdsCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-read the chip's RDS data if the adaptive interval has elapsed.
    ///
    /// Returns true when any cached field changed, so the view layer can
    /// skip redraws otherwise. A no-op off the FM band.
    pub fn refresh<C: ReceiverChip>(
        &mut self,
        chip: &mut C,
        band_is_fm: bool,
        now_ms: u32,
    ) -> Result<bool, ChipError> {
        if !band_is_fm {
            return Ok(false);
        }

        // Fast polling until the station identifies itself, slow after
        let interval = if self.station_name.len() < VALID_STATION_NAME_MIN_LEN {
            RDS_UPDATE_INTERVAL_FAST_MS
        } else {
            RDS_UPDATE_INTERVAL_SLOW_MS
        };
        if !timeout_elapsed(now_ms, self.last_update_ms, interval) {
            return Ok(false);
        }
        if !chip.rds_status()?.usable() {
            return Ok(false);
        }
        self.last_update_ms = now_ms;

        let mut changed = false;
        let mut has_valid = false;

        let raw_name = chip.rds_station_name()?;
        let name = trim_text(&raw_name);
        if !name.is_empty() {
            has_valid = true;
            if name.len() >= VALID_STATION_NAME_MIN_LEN && name != self.station_name.as_str() {
                debug!("rds: station name '{}'", name);
                self.station_name = truncated(name);
                changed = true;
            }
        }

        let pty = chip.rds_program_type()?;
        if pty <= 31 {
            has_valid = true;
            if Some(pty) != self.program_type {
                debug!("rds: program type '{}'", pty_name(pty));
                self.program_type = Some(pty);
                changed = true;
            }
        }

        let raw_text = chip.rds_radio_text()?;
        let text = trim_text(&raw_text);
        if !text.is_empty() {
            has_valid = true;
            if text != self.radio_text.as_str() {
                debug!("rds: radio text '{}'", text);
                self.radio_text = truncated(text);
                changed = true;
            }
        }

        if let Some(ct) = chip.rds_date_time()? {
            let mut date: String<16> = String::new();
            let _ = write!(date, "{}.{:02}.{:02}", ct.year, ct.month, ct.day);
            if date != self.date {
                self.date = date;
                changed = true;
            }

            let mut time: String<8> = String::new();
            let _ = write!(time, "{:02}:{:02}", ct.hour, ct.minute);
            if time != self.time {
                self.time = time;
                changed = true;
            }
            has_valid = true;
        }

        if has_valid {
            self.last_valid_ms = now_ms;
        }

        // Long silence counts as a change so the view re-evaluates its
        // "no reception" presentation; the cached text itself survives
        // until an explicit clear.
        if timeout_elapsed(now_ms, self.last_valid_ms, RDS_DATA_TIMEOUT_MS)
            && !self.station_name.is_empty()
        {
            changed = true;
        }

        Ok(changed)
    }

    /// Reset all cached fields and timers, immediately and
    /// unconditionally. Called on band or frequency change.
    pub fn clear(&mut self) {
        self.station_name.clear();
        self.program_type = None;
        self.radio_text.clear();
        self.date.clear();
        self.time.clear();
        self.last_update_ms = 0;
        self.last_valid_ms = 0;
    }

    /// True while the record has seen a valid update within the staleness
    /// timeout
    #[must_use]
    pub fn has_reception(&self, now_ms: u32) -> bool {
        self.last_valid_ms != 0
            && !timeout_elapsed(now_ms, self.last_valid_ms, RDS_DATA_TIMEOUT_MS)
    }

    /// Cached station name (empty until identified)
    #[must_use]
    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    /// Cached program type code
    #[must_use]
    pub fn program_type(&self) -> Option<u8> {
        self.program_type
    }

    /// Cached program type name
    #[must_use]
    pub fn program_type_name(&self) -> Option<&'static str> {
        self.program_type.map(pty_name)
    }

    /// Cached radio text
    #[must_use]
    pub fn radio_text(&self) -> &str {
        &self.radio_text
    }

    /// Cached broadcast date, `YYYY.MM.DD`
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Cached broadcast time, `HH:MM`
    #[must_use]
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Combined date and time, whichever parts are known
    #[must_use]
    pub fn date_time(&self) -> String<25> {
        let mut out = String::new();
        if !self.date.is_empty() && !self.time.is_empty() {
            let _ = write!(out, "{} {}", self.date, self.time);
        } else if self.date.is_empty() {
            let _ = out.push_str(&self.time);
        } else {
            let _ = out.push_str(&self.date);
        }
        out
    }
}

/// Strip surrounding whitespace and control characters from raw RDS text
fn trim_text(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control() || !c.is_ascii())
}

fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pty_table_covers_the_standard_codes() {
        assert_eq!(pty_name(0), "No defined");
        assert_eq!(pty_name(10), "Pop Music");
        assert_eq!(pty_name(31), "Alarm");
        assert_eq!(pty_name(200), "Unknown");
    }

    #[test]
    fn trim_strips_padding_and_control_bytes() {
        assert_eq!(trim_text("  Kossuth \u{0}\u{0}"), "Kossuth");
        assert_eq!(trim_text("\r\n"), "");
    }
}
