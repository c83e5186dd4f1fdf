//! Durable storage
//!
//! CRC16-guarded record persistence, the cross-core safe-write guard and
//! the EEPROM address layout.

pub mod guard;
pub mod layout;
pub mod persist;
pub mod stations;
