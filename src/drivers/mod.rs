//! Peripheral drivers
//!
//! Concrete implementations of the chip interface over `embedded-hal`
//! traits.

pub mod si4735;
