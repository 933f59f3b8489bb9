//! I/K-bus CD changer wire protocol
//!
//! This crate provides types and utilities for the CD changer traffic on the
//! automotive I/K-bus. Frames are short byte sequences with fixed field
//! offsets:
//!
//! ```text
//! +--------+--------+----------+---------+------------------+
//! | sender | length | receiver | command | payload...       |
//! +--------+--------+----------+---------+------------------+
//! ```
//!
//! Only frames with a total length of 5 to 7 bytes carry changer control
//! traffic; everything else on the bus is ignored. Outbound traffic uses
//! three fixed templates: the 11-byte status frame, the 5-byte announce
//! frame, and the 16-byte identity frame.
//!
//! Everything here is a pure function of its inputs: no I/O, no state.

mod constants;
mod error;
mod frame;

pub use constants::*;
pub use error::*;
pub use frame::*;
