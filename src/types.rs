//! Type definitions and enumerations for BQ27427 configuration
//!
//! This module provides the strongly-typed access levels, session states,
//! data memory blocks and measurement selectors used by the drivers.

use crate::registers::*;

/// Device privilege level
///
/// Levels are ordered: `Sealed < Unsealed < FullAccess`. The only escalation
/// path is `Sealed -> Unsealed -> FullAccess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccessLevel {
    Sealed,
    Unsealed,
    FullAccess,
}

/// Configuration-update session lifecycle
///
/// `Idle -> Entering -> Active -> Exiting -> Idle`. Sessions never nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Idle,
    Entering,
    Active,
    Exiting,
}

/// Who opened the active configuration session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionOwner {
    /// Opened by the caller; parameter helpers reuse it and leave it open
    User,
    /// Opened by a parameter helper for a single read or write
    Driver,
}

/// Selects one 32-byte window of extended data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockAddress {
    /// Data memory subclass ID
    pub class_id: u8,
    /// Block index within the subclass (byte offset / 32)
    pub block_offset: u8,
}

impl BlockAddress {
    pub const fn new(class_id: u8, block_offset: u8) -> Self {
        Self {
            class_id,
            block_offset,
        }
    }

    /// Address of the block holding `byte_offset` of `class_id`
    pub const fn containing(class_id: u8, byte_offset: u8) -> Self {
        Self::new(class_id, byte_offset / BQ27427_BLOCK_SIZE as u8)
    }
}

/// Checksum used by the gauge for a data memory block
///
/// `255 - (sum(bytes) mod 256)`
pub fn block_checksum(bytes: &[u8; BQ27427_BLOCK_SIZE]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    255 - sum
}

/// A 32-byte data memory block and the address it belongs to
///
/// The checksum is always derived from `bytes`, never stored alongside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterBlock {
    pub address: BlockAddress,
    pub bytes: [u8; BQ27427_BLOCK_SIZE],
}

impl ParameterBlock {
    pub const fn new(address: BlockAddress, bytes: [u8; BQ27427_BLOCK_SIZE]) -> Self {
        Self { address, bytes }
    }

    /// Block of zeroes at `address`
    pub const fn zeroed(address: BlockAddress) -> Self {
        Self::new(address, [0; BQ27427_BLOCK_SIZE])
    }

    pub fn checksum(&self) -> u8 {
        block_checksum(&self.bytes)
    }

    /// Byte at an offset within the subclass
    pub(crate) fn byte_at(&self, byte_offset: u8) -> u8 {
        self.bytes[byte_offset as usize % BQ27427_BLOCK_SIZE]
    }

    pub(crate) fn set_byte_at(&mut self, byte_offset: u8, value: u8) {
        self.bytes[byte_offset as usize % BQ27427_BLOCK_SIZE] = value;
    }

    /// Big-endian word at an offset within the subclass
    ///
    /// Callers keep both bytes inside this block.
    pub(crate) fn word_at(&self, byte_offset: u8) -> u16 {
        let idx = byte_offset as usize % BQ27427_BLOCK_SIZE;
        u16::from_be_bytes([self.bytes[idx], self.bytes[idx + 1]])
    }

    pub(crate) fn set_word_at(&mut self, byte_offset: u8, value: u16) {
        let idx = byte_offset as usize % BQ27427_BLOCK_SIZE;
        self.bytes[idx..idx + 2].copy_from_slice(&value.to_be_bytes());
    }
}

/// Result of a block read: the data and the checksum reported by the device
///
/// The driver does not verify the checksum on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockRead {
    pub block: ParameterBlock,
    pub device_checksum: u8,
}

impl BlockRead {
    /// True if the device checksum matches the data
    pub fn is_valid(&self) -> bool {
        self.block.checksum() == self.device_checksum
    }
}

/// Driver configuration
///
/// The polling bounds are tunable; they are not protocol requirements. The
/// defaults give a 2 s budget for each session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit I2C address
    pub address: u8,
    /// Delay between two Flags() polls
    pub poll_interval_ms: u32,
    /// Maximum number of Flags() reads per session transition (at least one)
    pub max_poll_attempts: u16,
    /// Delay after block selection and after a checksum write
    pub block_settle_ms: u32,
    pub unseal_key: u16,
    pub full_access_key: u16,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            address: BQ27427_I2C_ADDRESS,
            poll_interval_ms: 50,
            max_poll_attempts: 40,
            block_settle_ms: 5,
            unseal_key: BQ27427_UNSEAL_KEY,
            full_access_key: BQ27427_FULL_ACCESS_KEY,
        }
    }

    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub const fn with_polling(mut self, interval_ms: u32, max_attempts: u16) -> Self {
        self.poll_interval_ms = interval_ms;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub const fn with_block_settle(mut self, settle_ms: u32) -> Self {
        self.block_settle_ms = settle_ms;
        self
    }

    pub const fn with_keys(mut self, unseal_key: u16, full_access_key: u16) -> Self {
        self.unseal_key = unseal_key;
        self.full_access_key = full_access_key;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Battery chemistry profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChemId {
    /// 4.35 V
    A4350,
    /// 4.2 V
    B4200,
    /// 4.4 V
    C4400,
    Unknown(u16),
}

impl ChemId {
    /// Control() subcommand selecting this profile
    pub(crate) fn subcommand(self) -> Option<u16> {
        match self {
            ChemId::A4350 => Some(BQ27427_CONTROL_CHEM_A),
            ChemId::B4200 => Some(BQ27427_CONTROL_CHEM_B),
            ChemId::C4400 => Some(BQ27427_CONTROL_CHEM_C),
            ChemId::Unknown(_) => None,
        }
    }
}

impl From<u16> for ChemId {
    fn from(code: u16) -> Self {
        match code {
            0x3230 => ChemId::A4350,
            0x1202 => ChemId::B4200,
            0x3142 => ChemId::C4400,
            other => ChemId::Unknown(other),
        }
    }
}

/// Current measurement selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentMeasure {
    #[default]
    Average,
    Standby,
    Max,
}

impl CurrentMeasure {
    pub(crate) fn command(self) -> u8 {
        match self {
            CurrentMeasure::Average => BQ27427_COMMAND_AVG_CURRENT,
            CurrentMeasure::Standby => BQ27427_COMMAND_STDBY_CURRENT,
            CurrentMeasure::Max => BQ27427_COMMAND_MAX_CURRENT,
        }
    }
}

/// Capacity measurement selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityMeasure {
    #[default]
    Remaining,
    Full,
    Available,
    AvailableFull,
    RemainingFiltered,
    RemainingUnfiltered,
    FullFiltered,
    FullUnfiltered,
    /// Design capacity, read from data memory
    Design,
}

impl CapacityMeasure {
    /// Standard command for this measure, `None` for data memory values
    pub(crate) fn command(self) -> Option<u8> {
        match self {
            CapacityMeasure::Remaining => Some(BQ27427_COMMAND_REM_CAPACITY),
            CapacityMeasure::Full => Some(BQ27427_COMMAND_FULL_CAPACITY),
            CapacityMeasure::Available => Some(BQ27427_COMMAND_NOM_CAPACITY),
            CapacityMeasure::AvailableFull => Some(BQ27427_COMMAND_AVAIL_CAPACITY),
            CapacityMeasure::RemainingFiltered => Some(BQ27427_COMMAND_REM_CAP_FIL),
            CapacityMeasure::RemainingUnfiltered => Some(BQ27427_COMMAND_REM_CAP_UNFL),
            CapacityMeasure::FullFiltered => Some(BQ27427_COMMAND_FULL_CAP_FIL),
            CapacityMeasure::FullUnfiltered => Some(BQ27427_COMMAND_FULL_CAP_UNFL),
            CapacityMeasure::Design => None,
        }
    }
}

/// State-of-charge selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocMeasure {
    #[default]
    Filtered,
    Unfiltered,
}

impl SocMeasure {
    pub(crate) fn command(self) -> u8 {
        match self {
            SocMeasure::Filtered => BQ27427_COMMAND_SOC,
            SocMeasure::Unfiltered => BQ27427_COMMAND_SOC_UNFL,
        }
    }
}

/// State-of-health selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SohMeasure {
    /// Percentage (low byte)
    #[default]
    Percent,
    /// Status bits (high byte)
    Status,
}

impl SohMeasure {
    pub(crate) fn extract(self, raw: u16) -> u8 {
        let [low, high] = raw.to_le_bytes();
        match self {
            SohMeasure::Percent => low,
            SohMeasure::Status => high,
        }
    }
}

/// Temperature selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempMeasure {
    #[default]
    Battery,
    Internal,
}

impl TempMeasure {
    pub(crate) fn command(self) -> u8 {
        match self {
            TempMeasure::Battery => BQ27427_COMMAND_TEMP,
            TempMeasure::Internal => BQ27427_COMMAND_INT_TEMP,
        }
    }
}

/// GPOUT pin function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpoutFunction {
    /// Pulses on state-of-charge changes
    SocInt,
    /// Asserted on low battery
    BatLow,
}
