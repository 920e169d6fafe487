//! Error types for BQ27427 operations
//!
//! This module defines the error types that can occur when using the BQ27427 driver.

/// Error types for BQ27427 operations
///
/// Every variant leaves the driver in a well-defined state: the
/// configuration session is back in [`SessionState::Idle`] and the access
/// level is the last one observed, so the whole operation can be retried
/// from scratch. Block errors raised inside a user-managed session leave the
/// session `Active` for the caller to exit.
///
/// [`SessionState::Idle`]: crate::SessionState::Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error, propagated unchanged from the bus
    I2c(E),
    /// The unseal or full-access handshake was not confirmed by the device
    AccessDenied,
    /// CFGUPMODE did not reach the expected state within the polling budget
    ConfigSessionTimeout,
    /// Session transition requested from the wrong state
    InvalidSessionState,
    /// Block transfer attempted outside an active configuration session
    SessionRequired,
    /// Checksum read back after a block write differs from the one written
    ChecksumVerification {
        /// Checksum computed from the written bytes
        expected: u8,
        /// Checksum reported by the device
        actual: u8,
    },
    /// Invalid parameter value
    InvalidParameter,
    /// Device not found or wrong device type
    DeviceNotFound,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2c(error)
    }
}
