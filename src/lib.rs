//! Si4735 Receiver Firmware Library
//!
//! Core runtime for an RP2040-based Si4735 multiband radio. This crate
//! owns the receiver chip's operating state (band, frequency,
//! demodulation mode, antenna tuning, BFO offset), decides when audio is
//! squelched, manages gain control, keeps time-bounded caches of signal
//! quality and RDS metadata, and persists everything across power cycles
//! through a CRC-protected storage layer coordinated with the second
//! core's sampling loop.
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        VIEW LAYER (out of crate)             |
//! |   screens, widgets, rotary/touch input                       |
//! +--------------------------------------------------------------+
//! |                    RECEIVER CONTROLLER                       |
//! |  TuningStateMachine | Squelch | AGC | SignalCache | RdsCache |
//! +--------------------------------------------------------------+
//! |   BandCatalog  |  PersistentStore + SafeWriteGuard           |
//! +--------------------------------------------------------------+
//! |   ReceiverChip trait (Si4735 I2C driver)  |  CrossCoreChannel|
//! +--------------------------------------------------------------+
//! |   core 0 control loop          |   core 1 sampling + DSP     |
//! +--------------------------------------------------------------+
//! ```
//!
//! # Design principles
//!
//! - **Traits at the hardware seams**: the chip, the EEPROM, the
//!   inter-core FIFO and the sampling control are traits, so the whole
//!   policy layer runs and tests on the host.
//! - **Explicit time**: components take millisecond timestamps from the
//!   control loop instead of reading a clock.
//! - **No global mutable state**: the runtime flags live in one
//!   [`radio::runtime::RuntimeContext`] owned by the control loop.
//! - **Nothing fatal**: corrupt storage, bad indices and protocol desyncs
//!   all degrade to defined defaults or typed sentinels.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

/// Audio core control: the cross-core protocol and pipeline facade
pub mod audio;

/// Band catalog: descriptors, runtime fields, bandwidth and step tables
pub mod band;

/// Receiver chip interface
pub mod chip;

/// System configuration and constants
pub mod config;

/// Peripheral drivers
pub mod drivers;

/// Radio control logic
pub mod radio;

/// Cross-core sensor cells
pub mod sensors;

/// Durable storage
pub mod store;

/// Shared types used across modules
pub mod types;

/// Simulation harness for host tests
#[cfg(feature = "std")]
pub mod sim;

/// Millisecond tick source for the control loop on target
#[cfg(feature = "embedded")]
pub mod clock {
    //! The policy components take explicit `now_ms` timestamps; on target
    //! the control loop feeds them from the embassy monotonic.

    use embassy_time::Instant;

    /// Milliseconds since boot, truncated to the runtime's u32 domain.
    ///
    /// The wrap every ~49.7 days is handled by every consumer through
    /// [`crate::types::timeout_elapsed`].
    #[must_use]
    pub fn now_ms() -> u32 {
        Instant::now().as_millis() as u32
    }
}

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::band::{BandCatalog, BandRecord};
    pub use crate::chip::{ChipError, ReceiverChip};
    pub use crate::config::RadioConfig;
    pub use crate::radio::controller::ReceiverController;
    pub use crate::radio::runtime::RuntimeContext;
    pub use crate::store::guard::{SafeWriteGuard, SamplingControl};
    pub use crate::store::persist::{PersistentStore, StoreError};
    pub use crate::types::{
        AgcMode, BandKind, DemodMode, SignalQualitySample, SquelchBasis,
    };

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use log::{debug, error, info, trace, warn};
}
