//! Radio control logic
//!
//! The tuning state machine and the per-tick policy components, composed
//! by [`controller::ReceiverController`].

pub mod agc;
pub mod controller;
pub mod rds;
pub mod runtime;
pub mod signal;
pub mod squelch;
pub mod tuner;
