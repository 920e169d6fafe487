#![no_std]
//! # BQ27427 Fuel Gauge Driver
//!
//! This crate provides an embedded driver for the TI BQ27427 single-cell
//! fuel gauge over I2C. It supports:
//! - Standard commands (voltage, current, capacity, state of charge/health, temperature)
//! - Control() subcommands (status, device type, reset, chemistry selection)
//! - Seal/unseal and full-access key handling
//! - Configuration-update sessions with bounded polling of CFGUPMODE
//! - Checksummed 32-byte data memory block reads and writes
//! - Typed parameter accessors (design capacity, terminate voltage, OpConfig, thresholds)
//!
//! ## Example
//!
//! ```no_run
//! use bq27427::{Bq27427, CurrentMeasure, Error};
//! # use embedded_hal::{delay::DelayNs, i2c::I2c};
//! # fn example<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Result<(), Error<I::Error>> {
//! let mut gauge = Bq27427::new(i2c, delay);
//!
//! // Verify the chip and learn whether it is sealed
//! gauge.init()?;
//!
//! // Program the cell in a single config-update session
//! gauge.config_session(|gauge| {
//!     gauge.set_design_capacity(1200)?;
//!     gauge.set_terminate_voltage(3200)
//! })?;
//!
//! // Single parameters can be written without an explicit session
//! gauge.set_soci_delta(5)?;
//!
//! let voltage = gauge.voltage()?;
//! let current = gauge.current(CurrentMeasure::Average)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Async Support
//!
//! When the `async` feature is enabled, the crate provides `AsyncBq27427`
//! with the same API but async/await support:
//!
//! ```no_run
//! # #[cfg(feature = "async")]
//! # async fn example<I, D>(i2c: I, delay: D) -> Result<(), bq27427::Error<I::Error>>
//! # where
//! #     I: embedded_hal_async::i2c::I2c,
//! #     D: embedded_hal_async::delay::DelayNs,
//! # {
//! use bq27427::AsyncBq27427;
//!
//! let mut gauge = AsyncBq27427::new(i2c, delay);
//! gauge.init().await?;
//! gauge.set_design_capacity(1200).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Enable either the `defmt` or the `log` feature to get trace output of
//! session transitions and checksum failures.

// Must be declared first so the logging macros are visible to other modules
mod fmt;

mod driver;
#[cfg(feature = "async")]
mod driver_async;
mod error;
mod registers;
mod types;

// Re-export main types
pub use driver::Bq27427;
#[cfg(feature = "async")]
pub use driver_async::AsyncBq27427;
pub use error::Error;
pub use registers::*;
pub use types::*;
