//! CRC16-guarded record persistence
//!
//! Generic load/save of fixed-size records to byte-addressable
//! non-volatile storage. Every record is stored as its encoded image
//! followed immediately by a CRC16 trailer; a record is only ever accepted
//! if the stored CRC matches a recomputation over the raw bytes, otherwise
//! the compiled-in defaults are adopted and re-persisted on the spot.
//! Persisted state is therefore always either proven valid or
//! just-reset-to-default.

use core::fmt;

use crc::{Crc, CRC_16_IBM_3740};
use log::{debug, warn};

use crate::store::guard::{SafeWriteGuard, SamplingControl};

/// CRC algorithm for all persisted records (CCITT poly 0x1021, init
/// 0xFFFF, unreflected)
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Size of the CRC trailer following each record
pub const CRC_LEN: usize = 2;

/// Upper bound on a single encoded record; sized for the station lists
pub const MAX_RECORD_LEN: usize = 1024;

/// CRC16 over a raw byte image
#[must_use]
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Fixed-layout byte serialization for a persisted record.
///
/// Encodings are explicit and little-endian so the storage layout stays
/// stable across compiler versions and field reordering.
pub trait Persist: Sized {
    /// Exact length of the encoded image
    const ENCODED_LEN: usize;

    /// Write the record image into `buf` (exactly `ENCODED_LEN` bytes)
    fn encode(&self, buf: &mut [u8]);

    /// Rebuild a record from an image previously produced by `encode`
    fn decode(buf: &[u8]) -> Self;
}

/// Total storage footprint of a record including its CRC trailer
#[must_use]
pub const fn required_size<T: Persist>() -> usize {
    T::ENCODED_LEN + CRC_LEN
}

/// Byte-addressable non-volatile storage
pub trait EepromBackend {
    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, addr: u16, buf: &mut [u8]);

    /// Stage `data` for writing at `addr`
    fn write(&mut self, addr: u16, data: &[u8]);

    /// Flush staged writes to the physical medium; false when the commit
    /// could not be confirmed
    fn commit(&mut self) -> bool;
}

/// Storage failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not confirm the write; in-memory content is
    /// unchanged and no partial write may be assumed committed
    CommitFailed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommitFailed => f.write_str("storage commit not confirmed"),
        }
    }
}

/// Generic record store over an EEPROM-like backend.
///
/// Every save and load runs under exactly one [`SafeWriteGuard`] so
/// storage I/O never overlaps with real-time sampling on the shared bus.
pub struct PersistentStore<E: EepromBackend> {
    eeprom: E,
}

impl<E: EepromBackend> PersistentStore<E> {
    /// Wrap a storage backend
    pub fn new(eeprom: E) -> Self {
        Self { eeprom }
    }

    /// Persist `record` at `addr` and return the CRC written.
    ///
    /// On an unconfirmed commit the record is left as current in-memory
    /// content and [`StoreError::CommitFailed`] is returned.
    pub fn save<T: Persist, S: SamplingControl>(
        &mut self,
        record: &T,
        addr: u16,
        sampling: &mut S,
    ) -> Result<u16, StoreError> {
        let _guard = SafeWriteGuard::new(sampling);

        let mut scratch = [0u8; MAX_RECORD_LEN];
        let image = &mut scratch[..T::ENCODED_LEN];
        record.encode(image);
        let crc = crc16(image);

        self.eeprom.write(addr, image);
        self.eeprom.write(addr + T::ENCODED_LEN as u16, &crc.to_le_bytes());

        if self.eeprom.commit() {
            debug!("store: saved {} bytes at {:#06x}, crc {:#06x}", T::ENCODED_LEN, addr, crc);
            Ok(crc)
        } else {
            warn!("store: commit failed at {:#06x}", addr);
            Err(StoreError::CommitFailed)
        }
    }

    /// Load the record at `addr` into `record`, returning its CRC.
    ///
    /// `record` must arrive holding the compiled-in defaults: when the
    /// stored image fails its CRC check the defaults are kept and
    /// immediately persisted, so the caller always ends with a
    /// self-consistent, already-persisted value. The record is never left
    /// partially updated. Returns 0 when even the recovery save could not
    /// be confirmed.
    pub fn load<T: Persist, S: SamplingControl>(
        &mut self,
        record: &mut T,
        addr: u16,
        sampling: &mut S,
    ) -> u16 {
        // The guard must be released before the recovery save below takes
        // its own; nesting is not supported.
        let stored = {
            let _guard = SafeWriteGuard::new(sampling);
            self.read_if_valid::<T>(addr)
        };

        match stored {
            Some((value, crc)) => {
                *record = value;
                debug!("store: loaded {:#06x}, crc {:#06x}", addr, crc);
                crc
            }
            None => {
                warn!("store: invalid content at {:#06x}, rewriting defaults", addr);
                self.save(record, addr, sampling).unwrap_or(0)
            }
        }
    }

    /// Read and verify the record at `addr` without touching defaults
    fn read_if_valid<T: Persist>(&mut self, addr: u16) -> Option<(T, u16)> {
        let mut scratch = [0u8; MAX_RECORD_LEN];
        let image = &mut scratch[..T::ENCODED_LEN];
        self.eeprom.read(addr, image);

        let mut trailer = [0u8; CRC_LEN];
        self.eeprom.read(addr + T::ENCODED_LEN as u16, &mut trailer);
        let stored_crc = u16::from_le_bytes(trailer);

        if crc16(image) == stored_crc {
            Some((T::decode(image), stored_crc))
        } else {
            None
        }
    }

    /// Access the backend, used by diagnostics and tests
    pub fn backend_mut(&mut self) -> &mut E {
        &mut self.eeprom
    }
}

/// Sequential little-endian field writer for `Persist` encodings
pub(crate) struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf[self.pos] = value;
        self.pos += 1;
    }

    pub fn put_bool(&mut self, value: bool) {
        self.put_u8(u8::from(value));
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf[self.pos..self.pos + 2].copy_from_slice(&value.to_le_bytes());
        self.pos += 2;
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf[self.pos..self.pos + 4].copy_from_slice(&value.to_bits().to_le_bytes());
        self.pos += 4;
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

/// Sequential little-endian field reader for `Persist` decodings
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn take_u8(&mut self) -> u8 {
        let value = self.buf[self.pos];
        self.pos += 1;
        value
    }

    pub fn take_bool(&mut self) -> bool {
        self.take_u8() != 0
    }

    pub fn take_u16(&mut self) -> u16 {
        let value = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        value
    }

    pub fn take_f32(&mut self) -> f32 {
        let bits = u32::from_le_bytes([
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ]);
        self.pos += 4;
        f32::from_bits(bits)
    }

    pub fn take_bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_ccitt_false_reference() {
        // "123456789" under CRC-16/CCITT-FALSE
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn writer_and_reader_agree() {
        let mut buf = [0u8; 16];
        let mut w = ByteWriter::new(&mut buf);
        w.put_u8(7);
        w.put_bool(true);
        w.put_u16(0xBEEF);
        w.put_f32(1.5);

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.take_u8(), 7);
        assert!(r.take_bool());
        assert_eq!(r.take_u16(), 0xBEEF);
        assert!((r.take_f32() - 1.5).abs() < f32::EPSILON);
    }
}
