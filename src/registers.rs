//! Register addresses and constants for BQ27427
//!
//! This module defines the standard commands, Control() subcommands,
//! extended data commands, data memory classes and bit definitions of the
//! BQ27427 fuel gauge.

use bitflags::bitflags;

/// I2C Address
pub const BQ27427_I2C_ADDRESS: u8 = 0x55;

/// Maximum I2C clock rate supported by the gauge
pub const BQ27427_I2C_FREQ_HZ: u32 = 400_000;

/// Value returned by the DEVICE_TYPE subcommand
pub const BQ27427_DEVICE_ID: u16 = 0x0421;

/// Default unseal key, written twice through Control()
pub const BQ27427_UNSEAL_KEY: u16 = 0x8000;

/// Default full-access key, written twice through Control() once unsealed
pub const BQ27427_FULL_ACCESS_KEY: u16 = 0xFFFF;

/// Size of one extended data block in bytes
pub const BQ27427_BLOCK_SIZE: usize = 32;

// ========================================
// Standard commands
// ========================================

/// Control() - Subcommand register pair (0x00/0x01)
pub const BQ27427_COMMAND_CONTROL: u8 = 0x00;
/// Temperature() - Battery temperature in 0.1 K
pub const BQ27427_COMMAND_TEMP: u8 = 0x02;
/// Voltage() - Cell voltage in mV
pub const BQ27427_COMMAND_VOLTAGE: u8 = 0x04;
/// Flags() - Gas gauging status word
pub const BQ27427_COMMAND_FLAGS: u8 = 0x06;
/// NominalAvailableCapacity()
pub const BQ27427_COMMAND_NOM_CAPACITY: u8 = 0x08;
/// FullAvailableCapacity()
pub const BQ27427_COMMAND_AVAIL_CAPACITY: u8 = 0x0A;
/// RemainingCapacity()
pub const BQ27427_COMMAND_REM_CAPACITY: u8 = 0x0C;
/// FullChargeCapacity()
pub const BQ27427_COMMAND_FULL_CAPACITY: u8 = 0x0E;
/// AverageCurrent()
pub const BQ27427_COMMAND_AVG_CURRENT: u8 = 0x10;
/// StandbyCurrent()
pub const BQ27427_COMMAND_STDBY_CURRENT: u8 = 0x12;
/// MaxLoadCurrent()
pub const BQ27427_COMMAND_MAX_CURRENT: u8 = 0x14;
/// AveragePower()
pub const BQ27427_COMMAND_AVG_POWER: u8 = 0x18;
/// StateOfCharge()
pub const BQ27427_COMMAND_SOC: u8 = 0x1C;
/// InternalTemperature()
pub const BQ27427_COMMAND_INT_TEMP: u8 = 0x1E;
/// StateOfHealth() - Low byte percentage, high byte status
pub const BQ27427_COMMAND_SOH: u8 = 0x20;
/// RemainingCapacityUnfiltered()
pub const BQ27427_COMMAND_REM_CAP_UNFL: u8 = 0x28;
/// RemainingCapacityFiltered()
pub const BQ27427_COMMAND_REM_CAP_FIL: u8 = 0x2A;
/// FullChargeCapacityUnfiltered()
pub const BQ27427_COMMAND_FULL_CAP_UNFL: u8 = 0x2C;
/// FullChargeCapacityFiltered()
pub const BQ27427_COMMAND_FULL_CAP_FIL: u8 = 0x2E;
/// StateOfChargeUnfiltered()
pub const BQ27427_COMMAND_SOC_UNFL: u8 = 0x30;

// ========================================
// Control() subcommands
// ========================================

pub const BQ27427_CONTROL_STATUS: u16 = 0x0000;
pub const BQ27427_CONTROL_DEVICE_TYPE: u16 = 0x0001;
pub const BQ27427_CONTROL_FW_VERSION: u16 = 0x0002;
pub const BQ27427_CONTROL_DM_CODE: u16 = 0x0004;
pub const BQ27427_CONTROL_PREV_MACWRITE: u16 = 0x0007;
pub const BQ27427_CONTROL_CHEM_ID: u16 = 0x0008;
pub const BQ27427_CONTROL_BAT_INSERT: u16 = 0x000C;
pub const BQ27427_CONTROL_BAT_REMOVE: u16 = 0x000D;
pub const BQ27427_CONTROL_SET_CFGUPDATE: u16 = 0x0013;
pub const BQ27427_CONTROL_SHUTDOWN_ENABLE: u16 = 0x001B;
pub const BQ27427_CONTROL_SHUTDOWN: u16 = 0x001C;
pub const BQ27427_CONTROL_SEALED: u16 = 0x0020;
pub const BQ27427_CONTROL_PULSE_SOC_INT: u16 = 0x0023;
pub const BQ27427_CONTROL_CHEM_A: u16 = 0x0030; // 4.35 V
pub const BQ27427_CONTROL_CHEM_B: u16 = 0x0031; // 4.2 V
pub const BQ27427_CONTROL_CHEM_C: u16 = 0x0032; // 4.4 V
pub const BQ27427_CONTROL_RESET: u16 = 0x0041;
pub const BQ27427_CONTROL_SOFT_RESET: u16 = 0x0042;

// ========================================
// Extended data commands
// ========================================

/// DataClass() - Selects the data memory subclass
pub const BQ27427_EXTENDED_DATACLASS: u8 = 0x3E;
/// DataBlock() - Selects the 32-byte block within the subclass
pub const BQ27427_EXTENDED_DATABLOCK: u8 = 0x3F;
/// BlockData() - Start of the 32-byte data window
pub const BQ27427_EXTENDED_BLOCKDATA: u8 = 0x40;
/// BlockDataCheckSum()
pub const BQ27427_EXTENDED_CHECKSUM: u8 = 0x60;
/// BlockDataControl() - Writing 0x00 enables data memory access
pub const BQ27427_EXTENDED_CONTROL: u8 = 0x61;

// ========================================
// Data memory subclasses
// ========================================

pub const BQ27427_ID_SAFETY: u8 = 2;
pub const BQ27427_ID_CHG_TERMINATION: u8 = 36;
pub const BQ27427_ID_DISCHARGE: u8 = 49;
pub const BQ27427_ID_REGISTERS: u8 = 64;
pub const BQ27427_ID_IT_CFG: u8 = 80;
pub const BQ27427_ID_CURRENT_THRESH: u8 = 81;
pub const BQ27427_ID_STATE: u8 = 82;
pub const BQ27427_ID_R_A_RAM: u8 = 89;
pub const BQ27427_ID_CALIB_DATA: u8 = 104;
pub const BQ27427_ID_CC_CAL: u8 = 105;
pub const BQ27427_ID_CURRENT: u8 = 107;
pub const BQ27427_ID_CHEM_DATA: u8 = 109;
pub const BQ27427_ID_CODES: u8 = 112;

// Parameter offsets within their subclass. Multi-byte values are big-endian.

/// State: Design Capacity (mAh, 2 bytes)
pub const BQ27427_STATE_DESIGN_CAPACITY: u8 = 6;
/// State: Design Energy (mWh, 2 bytes)
pub const BQ27427_STATE_DESIGN_ENERGY: u8 = 8;
/// State: Terminate Voltage (mV, 2 bytes)
pub const BQ27427_STATE_TERMINATE_VOLTAGE: u8 = 10;
/// State: SOCI Delta (%, 1 byte)
pub const BQ27427_STATE_SOCI_DELTA: u8 = 20;
/// State: Taper Rate (0.1 h, 2 bytes)
pub const BQ27427_STATE_TAPER_RATE: u8 = 21;
/// State: Taper Voltage (mV, 2 bytes)
pub const BQ27427_STATE_TAPER_VOLTAGE: u8 = 23;
/// Current Thresholds: Dsg Current Threshold (2 bytes)
pub const BQ27427_CURRENT_THRESH_DSG: u8 = 0;
/// Registers: OpConfig (2 bytes)
pub const BQ27427_REGISTERS_OPCONFIG: u8 = 0;
/// Discharge: SOC1 Set Threshold
pub const BQ27427_DISCHARGE_SOC1_SET: u8 = 0;
/// Discharge: SOC1 Clear Threshold
pub const BQ27427_DISCHARGE_SOC1_CLEAR: u8 = 1;
/// Discharge: SOCF Set Threshold
pub const BQ27427_DISCHARGE_SOCF_SET: u8 = 2;
/// Discharge: SOCF Clear Threshold
pub const BQ27427_DISCHARGE_SOCF_CLEAR: u8 = 3;
/// CC Cal: byte holding the CC Gain sign bit (bit 7)
pub const BQ27427_CC_CAL_GAIN_SIGN_BYTE: u8 = 5;

bitflags! {
    /// Contents of the Flags() standard command
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u16 {
        const OT = 1 << 15;
        const UT = 1 << 14;
        const FC = 1 << 9;
        const CHG = 1 << 8;
        const OCVTAKEN = 1 << 7;
        const DOD_CRRCT = 1 << 6;
        const ITPOR = 1 << 5;
        const CFGUPMODE = 1 << 4;
        const BAT_DET = 1 << 3;
        const SOC1 = 1 << 2;
        const SOCF = 1 << 1;
        const DSG = 1 << 0;
    }
}

bitflags! {
    /// Status word returned by the CONTROL_STATUS subcommand
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlStatus: u16 {
        const SHUTDOWNEN = 1 << 15;
        const WDRESET = 1 << 14;
        /// Device is sealed
        const SS = 1 << 13;
        const CALMODE = 1 << 12;
        const CCA = 1 << 11;
        const BCA = 1 << 10;
        const QMAX_UP = 1 << 9;
        const RES_UP = 1 << 8;
        const INITCOMP = 1 << 7;
        const SLEEP = 1 << 4;
        const LDMD = 1 << 3;
        const RUP_DIS = 1 << 2;
        const VOK = 1 << 1;
    }
}

bitflags! {
    /// OpConfig word of the Registers subclass
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpConfig: u16 {
        const BIE = 1 << 13;
        /// GPOUT is active-high when set
        const GPIOPOL = 1 << 11;
        const RS_FCT_STP = 1 << 6;
        const SLEEP = 1 << 5;
        const RMFCC = 1 << 4;
        const FASTCNV_EN = 1 << 3;
        /// GPOUT signals BAT_LOW when set, SOC_INT otherwise
        const BATLOWEN = 1 << 2;
        const TEMPS = 1 << 0;
    }
}

// Temperature conversion
pub const BQ27427_KELVIN_OFFSET: f32 = 273.15;
#[inline]
pub fn deci_kelvin_to_celsius(raw: u16) -> f32 {
    (raw as f32) * 0.1 - BQ27427_KELVIN_OFFSET
}
