//! Async BQ27427 fuel gauge driver implementation

use crate::{driver::check_word_offset, error::Error, registers::*, types::*};

#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs as AsyncDelayNs, i2c::I2c as AsyncI2c};

/// Async BQ27427 fuel gauge driver
///
/// This implementation provides async operations for all BQ27427
/// functionality when the `async` feature is enabled. All methods mirror the
/// synchronous API but return futures that can be awaited.
///
/// Session polling cannot be cancelled: dropping an `enter_config` or
/// `exit_config` future before it completes leaves the session in
/// `Entering`/`Exiting`, from which only [`reset`](Self::reset) recovers.
///
/// # Example
/// ```no_run
/// # #[cfg(feature = "async")]
/// # async fn example<I, D>(i2c: I, delay: D) -> Result<(), bq27427::Error<I::Error>>
/// # where
/// #     I: embedded_hal_async::i2c::I2c,
/// #     D: embedded_hal_async::delay::DelayNs,
/// # {
/// use bq27427::AsyncBq27427;
///
/// let mut gauge = AsyncBq27427::new(i2c, delay);
///
/// // Verify the chip
/// gauge.init().await?;
///
/// // Program the cell
/// gauge.enter_config(true).await?;
/// gauge.set_design_capacity(1200).await?;
/// gauge.set_terminate_voltage(3200).await?;
/// gauge.exit_config(true).await?;
///
/// let voltage = gauge.voltage().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "async")]
pub struct AsyncBq27427<I, D> {
    i2c: I,
    delay: D,
    config: Config,
    access: AccessLevel,
    session: SessionState,
    owner: SessionOwner,
    reseal_on_exit: bool,
}

#[cfg(feature = "async")]
impl<I, D> AsyncBq27427<I, D>
where
    I: AsyncI2c,
    D: AsyncDelayNs,
{
    /// Create a new async BQ27427 driver instance
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_config(i2c, delay, Config::default())
    }

    /// Create a new async BQ27427 driver instance with a custom configuration
    pub fn with_config(i2c: I, delay: D, config: Config) -> Self {
        Self {
            i2c,
            delay,
            config,
            access: AccessLevel::Sealed,
            session: SessionState::Idle,
            owner: SessionOwner::Driver,
            reseal_on_exit: false,
        }
    }

    /// Destroy the driver and return the bus and delay
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    /// Verify the device type and synchronise the access level
    pub async fn init(&mut self) -> Result<(), Error<I::Error>> {
        let device_type = self.device_type().await?;
        if device_type != BQ27427_DEVICE_ID {
            warn!("unexpected device type {}", device_type);
            return Err(Error::DeviceNotFound);
        }
        self.refresh_access_level().await?;
        Ok(())
    }

    // ========================================
    // Low-level I2C operations
    // ========================================

    /// Read a single register
    async fn read_register(&mut self, reg: u8) -> Result<u8, Error<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.config.address, &[reg], &mut buf)
            .await
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Write a single register
    async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.i2c
            .write(self.config.address, &[reg, value])
            .await
            .map_err(Error::I2c)
    }

    /// Read multiple registers
    async fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<I::Error>> {
        self.i2c
            .write_read(self.config.address, &[reg], buf)
            .await
            .map_err(Error::I2c)
    }

    /// Write multiple registers
    async fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<I::Error>> {
        let mut buf = [0u8; BQ27427_BLOCK_SIZE + 1]; // max: 1 reg + 32 data bytes
        if data.len() > BQ27427_BLOCK_SIZE {
            return Err(Error::InvalidParameter);
        }
        buf[0] = reg;
        buf[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(self.config.address, &buf[..=data.len()])
            .await
            .map_err(Error::I2c)
    }

    /// Read a standard command (two registers, little-endian)
    pub async fn read_word(&mut self, command: u8) -> Result<u16, Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.read_registers(command, &mut buf).await?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Issue a Control() subcommand without reading a response
    pub async fn write_control(&mut self, subcommand: u16) -> Result<(), Error<I::Error>> {
        let [low, high] = subcommand.to_le_bytes();
        self.i2c
            .write(self.config.address, &[BQ27427_COMMAND_CONTROL, low, high])
            .await
            .map_err(Error::I2c)
    }

    /// Issue a Control() subcommand and read its response from 0x00/0x01
    pub async fn read_control(&mut self, subcommand: u16) -> Result<u16, Error<I::Error>> {
        self.write_control(subcommand).await?;
        self.read_word(BQ27427_COMMAND_CONTROL).await
    }

    // ========================================
    // Access level
    // ========================================

    /// Raise the access level to at least `level`
    ///
    /// Full access is assumed after the key pair unless the device reads
    /// back sealed; see [`Bq27427::ensure_access`](crate::Bq27427::ensure_access).
    pub async fn ensure_access(&mut self, level: AccessLevel) -> Result<(), Error<I::Error>> {
        if self.access >= level {
            return Ok(());
        }

        if self.access == AccessLevel::Sealed {
            debug!("unsealing");
            self.write_key(self.config.unseal_key).await?;
            if self.is_sealed().await? {
                warn!("unseal key rejected");
                return Err(Error::AccessDenied);
            }
            self.access = AccessLevel::Unsealed;
        }

        if level == AccessLevel::FullAccess {
            debug!("requesting full access");
            self.write_key(self.config.full_access_key).await?;
            if self.is_sealed().await? {
                warn!("full access key rejected, device sealed");
                self.access = AccessLevel::Sealed;
                return Err(Error::AccessDenied);
            }
            self.access = AccessLevel::FullAccess;
        }

        Ok(())
    }

    /// Unseal the device
    pub async fn unseal(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_access(AccessLevel::Unsealed).await
    }

    /// Seal the device (unacknowledged by the device)
    pub async fn seal(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(BQ27427_CONTROL_SEALED).await?;
        self.access = AccessLevel::Sealed;
        debug!("sealed");
        Ok(())
    }

    /// Re-derive the access level from CONTROL_STATUS
    pub async fn refresh_access_level(&mut self) -> Result<AccessLevel, Error<I::Error>> {
        self.access = if self.is_sealed().await? {
            AccessLevel::Sealed
        } else if self.access == AccessLevel::FullAccess {
            AccessLevel::FullAccess
        } else {
            AccessLevel::Unsealed
        };
        Ok(self.access)
    }

    async fn write_key(&mut self, key: u16) -> Result<(), Error<I::Error>> {
        self.write_control(key).await?;
        self.write_control(key).await
    }

    async fn is_sealed(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.control_status().await?.contains(ControlStatus::SS))
    }

    // ========================================
    // Configuration-update session
    // ========================================

    /// Enter configuration-update mode
    pub async fn enter_config(&mut self, user_managed: bool) -> Result<(), Error<I::Error>> {
        if self.session != SessionState::Idle {
            return Err(Error::InvalidSessionState);
        }

        // A cached `Sealed` may be stale; only reseal what this session unseals
        if self.access == AccessLevel::Sealed {
            self.refresh_access_level().await?;
        }
        let was_sealed = self.access == AccessLevel::Sealed;
        self.ensure_access(AccessLevel::Unsealed).await?;

        self.session = SessionState::Entering;
        let result = match self.write_control(BQ27427_CONTROL_SET_CFGUPDATE).await {
            Ok(()) => self.wait_for_cfgupmode(true).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(true) => {
                self.session = SessionState::Active;
                self.owner = if user_managed {
                    SessionOwner::User
                } else {
                    SessionOwner::Driver
                };
                self.reseal_on_exit = was_sealed;
                info!("config update mode entered");
                Ok(())
            }
            Ok(false) => {
                self.session = SessionState::Idle;
                warn!("timed out entering config update mode");
                Err(Error::ConfigSessionTimeout)
            }
            Err(e) => {
                self.session = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Leave configuration-update mode
    pub async fn exit_config(&mut self, user_managed: bool) -> Result<(), Error<I::Error>> {
        if self.session != SessionState::Active {
            return Err(Error::InvalidSessionState);
        }
        if !user_managed && self.owner == SessionOwner::User {
            return Ok(());
        }

        self.session = SessionState::Exiting;
        let reseal = core::mem::take(&mut self.reseal_on_exit);
        let result = match self.write_control(BQ27427_CONTROL_SOFT_RESET).await {
            Ok(()) => self.wait_for_cfgupmode(false).await,
            Err(e) => Err(e),
        };
        self.session = SessionState::Idle;

        match result {
            Ok(true) => {
                info!("config update mode exited");
                if reseal {
                    self.seal().await?;
                }
                Ok(())
            }
            Ok(false) => {
                warn!("timed out exiting config update mode");
                Err(Error::ConfigSessionTimeout)
            }
            Err(e) => Err(e),
        }
    }

    /// Open a driver-managed session unless one is already active
    ///
    /// Returns whether a session was opened.
    async fn open_helper_session(&mut self) -> Result<bool, Error<I::Error>> {
        if self.session == SessionState::Active {
            return Ok(false);
        }
        self.enter_config(false).await?;
        Ok(true)
    }

    /// Close a session opened by `open_helper_session`
    async fn close_helper_session<T>(
        &mut self,
        opened: bool,
        result: Result<T, Error<I::Error>>,
    ) -> Result<T, Error<I::Error>> {
        if !opened {
            return result;
        }
        let exit = self.exit_config(false).await;
        let value = result?;
        exit?;
        Ok(value)
    }

    async fn wait_for_cfgupmode(&mut self, set: bool) -> Result<bool, Error<I::Error>> {
        let attempts = self.config.max_poll_attempts.max(1);
        for attempt in 1..=attempts {
            if self.flags().await?.contains(StatusFlags::CFGUPMODE) == set {
                trace!("CFGUPMODE reached {} after {} polls", set, attempt);
                return Ok(true);
            }
            if attempt < attempts {
                self.delay.delay_ms(self.config.poll_interval_ms).await;
            }
        }
        Ok(false)
    }

    // ========================================
    // Extended data blocks
    // ========================================

    async fn select_block(&mut self, address: BlockAddress) -> Result<(), Error<I::Error>> {
        trace!(
            "selecting class {} block {}",
            address.class_id,
            address.block_offset
        );
        self.write_register(BQ27427_EXTENDED_CONTROL, 0x00).await?;
        self.write_register(BQ27427_EXTENDED_DATACLASS, address.class_id)
            .await?;
        self.write_register(BQ27427_EXTENDED_DATABLOCK, address.block_offset)
            .await?;
        self.delay.delay_ms(self.config.block_settle_ms).await;
        Ok(())
    }

    /// Read a 32-byte data memory block and the checksum the device reports
    pub async fn read_block(
        &mut self,
        address: BlockAddress,
    ) -> Result<BlockRead, Error<I::Error>> {
        if self.session != SessionState::Active {
            return Err(Error::SessionRequired);
        }

        self.select_block(address).await?;
        let mut block = ParameterBlock::zeroed(address);
        self.read_registers(BQ27427_EXTENDED_BLOCKDATA, &mut block.bytes)
            .await?;
        let device_checksum = self.read_register(BQ27427_EXTENDED_CHECKSUM).await?;

        Ok(BlockRead {
            block,
            device_checksum,
        })
    }

    /// Write a 32-byte data memory block and verify its checksum
    pub async fn write_block(&mut self, block: &ParameterBlock) -> Result<(), Error<I::Error>> {
        if self.session != SessionState::Active {
            return Err(Error::SessionRequired);
        }

        self.select_block(block.address).await?;
        self.write_registers(BQ27427_EXTENDED_BLOCKDATA, &block.bytes)
            .await?;

        let expected = block.checksum();
        self.write_register(BQ27427_EXTENDED_CHECKSUM, expected)
            .await?;
        self.delay.delay_ms(self.config.block_settle_ms).await;

        let actual = self.read_register(BQ27427_EXTENDED_CHECKSUM).await?;
        if actual != expected {
            warn!(
                "block checksum mismatch: wrote {}, device has {}",
                expected,
                actual
            );
            return Err(Error::ChecksumVerification { expected, actual });
        }
        Ok(())
    }

    // ========================================
    // Data memory parameters
    // ========================================

    async fn read_verified_block(
        &mut self,
        address: BlockAddress,
    ) -> Result<ParameterBlock, Error<I::Error>> {
        let read = self.read_block(address).await?;
        if !read.is_valid() {
            return Err(Error::ChecksumVerification {
                expected: read.block.checksum(),
                actual: read.device_checksum,
            });
        }
        Ok(read.block)
    }

    async fn read_parameter_block(
        &mut self,
        class: u8,
        offset: u8,
    ) -> Result<ParameterBlock, Error<I::Error>> {
        let opened = self.open_helper_session().await?;
        let result = self
            .read_verified_block(BlockAddress::containing(class, offset))
            .await;
        self.close_helper_session(opened, result).await
    }

    async fn modify_parameter_block<F>(
        &mut self,
        class: u8,
        offset: u8,
        f: F,
    ) -> Result<(), Error<I::Error>>
    where
        F: FnOnce(&mut ParameterBlock),
    {
        let opened = self.open_helper_session().await?;
        let result = match self
            .read_verified_block(BlockAddress::containing(class, offset))
            .await
        {
            Ok(mut block) => {
                f(&mut block);
                self.write_block(&block).await
            }
            Err(e) => Err(e),
        };
        self.close_helper_session(opened, result).await
    }

    /// Read one byte of data memory
    pub async fn read_extended_byte(&mut self, class: u8, offset: u8) -> Result<u8, Error<I::Error>> {
        Ok(self.read_parameter_block(class, offset).await?.byte_at(offset))
    }

    /// Read a big-endian word of data memory
    pub async fn read_extended_word(
        &mut self,
        class: u8,
        offset: u8,
    ) -> Result<u16, Error<I::Error>> {
        check_word_offset(offset)?;
        Ok(self.read_parameter_block(class, offset).await?.word_at(offset))
    }

    /// Write one byte of data memory
    pub async fn write_extended_byte(
        &mut self,
        class: u8,
        offset: u8,
        value: u8,
    ) -> Result<(), Error<I::Error>> {
        self.modify_parameter_block(class, offset, |block| block.set_byte_at(offset, value))
            .await
    }

    /// Write a big-endian word of data memory
    pub async fn write_extended_word(
        &mut self,
        class: u8,
        offset: u8,
        value: u16,
    ) -> Result<(), Error<I::Error>> {
        check_word_offset(offset)?;
        self.modify_parameter_block(class, offset, |block| block.set_word_at(offset, value))
            .await
    }

    /// Get design capacity in mAh
    pub async fn design_capacity(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_CAPACITY)
            .await
    }

    /// Set design capacity in mAh
    pub async fn set_design_capacity(&mut self, capacity: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_CAPACITY, capacity)
            .await
    }

    /// Get design energy in mWh
    pub async fn design_energy(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_ENERGY)
            .await
    }

    /// Set design energy in mWh
    pub async fn set_design_energy(&mut self, energy: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_ENERGY, energy)
            .await
    }

    /// Get terminate voltage in mV
    pub async fn terminate_voltage(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TERMINATE_VOLTAGE)
            .await
    }

    /// Set terminate voltage in mV
    pub async fn set_terminate_voltage(&mut self, millivolt: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TERMINATE_VOLTAGE, millivolt)
            .await
    }

    /// Get taper voltage in mV
    pub async fn taper_voltage(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_VOLTAGE)
            .await
    }

    /// Set taper voltage in mV
    pub async fn set_taper_voltage(&mut self, millivolt: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_VOLTAGE, millivolt)
            .await
    }

    /// Get taper rate in 0.1 h units
    pub async fn taper_rate(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_RATE)
            .await
    }

    /// Set taper rate in 0.1 h units
    pub async fn set_taper_rate(&mut self, rate: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_RATE, rate)
            .await
    }

    /// Get discharge current threshold in 0.1 h units
    pub async fn discharge_current_threshold(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_CURRENT_THRESH, BQ27427_CURRENT_THRESH_DSG)
            .await
    }

    /// Set discharge current threshold in 0.1 h units
    pub async fn set_discharge_current_threshold(
        &mut self,
        value: u16,
    ) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_CURRENT_THRESH, BQ27427_CURRENT_THRESH_DSG, value)
            .await
    }

    /// Get the SOC_INT interval delta in percent
    pub async fn soci_delta(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_STATE, BQ27427_STATE_SOCI_DELTA)
            .await
    }

    /// Set the SOC_INT interval delta (1..=100 percent)
    pub async fn set_soci_delta(&mut self, delta: u8) -> Result<(), Error<I::Error>> {
        if !(1..=100).contains(&delta) {
            return Err(Error::InvalidParameter);
        }
        self.write_extended_byte(BQ27427_ID_STATE, BQ27427_STATE_SOCI_DELTA, delta)
            .await
    }

    /// Get the OpConfig register
    pub async fn op_config(&mut self) -> Result<OpConfig, Error<I::Error>> {
        let raw = self
            .read_extended_word(BQ27427_ID_REGISTERS, BQ27427_REGISTERS_OPCONFIG)
            .await?;
        Ok(OpConfig::from_bits_retain(raw))
    }

    /// Set the OpConfig register
    pub async fn set_op_config(&mut self, op_config: OpConfig) -> Result<(), Error<I::Error>> {
        self.write_extended_word(
            BQ27427_ID_REGISTERS,
            BQ27427_REGISTERS_OPCONFIG,
            op_config.bits(),
        )
        .await
    }

    async fn update_op_config(
        &mut self,
        flag: OpConfig,
        enable: bool,
    ) -> Result<(), Error<I::Error>> {
        self.modify_parameter_block(
            BQ27427_ID_REGISTERS,
            BQ27427_REGISTERS_OPCONFIG,
            |block| {
                let mut op_config =
                    OpConfig::from_bits_retain(block.word_at(BQ27427_REGISTERS_OPCONFIG));
                op_config.set(flag, enable);
                block.set_word_at(BQ27427_REGISTERS_OPCONFIG, op_config.bits());
            },
        )
        .await
    }

    /// Check if GPOUT is active-high
    pub async fn gpout_polarity(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.op_config().await?.contains(OpConfig::GPIOPOL))
    }

    /// Set GPOUT to active-high (`true`) or active-low (`false`)
    pub async fn set_gpout_polarity(&mut self, active_high: bool) -> Result<(), Error<I::Error>> {
        self.update_op_config(OpConfig::GPIOPOL, active_high).await
    }

    /// Get GPOUT function
    pub async fn gpout_function(&mut self) -> Result<GpoutFunction, Error<I::Error>> {
        Ok(if self.op_config().await?.contains(OpConfig::BATLOWEN) {
            GpoutFunction::BatLow
        } else {
            GpoutFunction::SocInt
        })
    }

    /// Set GPOUT function
    pub async fn set_gpout_function(
        &mut self,
        function: GpoutFunction,
    ) -> Result<(), Error<I::Error>> {
        self.update_op_config(OpConfig::BATLOWEN, function == GpoutFunction::BatLow)
            .await
    }

    /// Get SOC1 set threshold in percent
    pub async fn soc1_set_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOC1_SET)
            .await
    }

    /// Get SOC1 clear threshold in percent
    pub async fn soc1_clear_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOC1_CLEAR)
            .await
    }

    /// Set SOC1 set and clear thresholds (0..=100 percent)
    pub async fn set_soc1_thresholds(&mut self, set: u8, clear: u8) -> Result<(), Error<I::Error>> {
        self.set_threshold_pair(BQ27427_DISCHARGE_SOC1_SET, set, clear)
            .await
    }

    /// Get SOCF set threshold in percent
    pub async fn socf_set_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOCF_SET)
            .await
    }

    /// Get SOCF clear threshold in percent
    pub async fn socf_clear_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOCF_CLEAR)
            .await
    }

    /// Set SOCF set and clear thresholds (0..=100 percent)
    pub async fn set_socf_thresholds(&mut self, set: u8, clear: u8) -> Result<(), Error<I::Error>> {
        self.set_threshold_pair(BQ27427_DISCHARGE_SOCF_SET, set, clear)
            .await
    }

    async fn set_threshold_pair(
        &mut self,
        offset: u8,
        set: u8,
        clear: u8,
    ) -> Result<(), Error<I::Error>> {
        if set > 100 || clear > 100 {
            return Err(Error::InvalidParameter);
        }
        self.modify_parameter_block(BQ27427_ID_DISCHARGE, offset, |block| {
            block.set_byte_at(offset, set);
            block.set_byte_at(offset + 1, clear);
        })
        .await
    }

    /// Flip the sign of the coulomb counter gain
    pub async fn change_current_polarity(&mut self) -> Result<(), Error<I::Error>> {
        self.modify_parameter_block(BQ27427_ID_CC_CAL, BQ27427_CC_CAL_GAIN_SIGN_BYTE, |block| {
            let byte = block.byte_at(BQ27427_CC_CAL_GAIN_SIGN_BYTE);
            block.set_byte_at(BQ27427_CC_CAL_GAIN_SIGN_BYTE, byte ^ 0x80);
        })
        .await
    }

    /// Get the battery chemistry profile
    pub async fn chem_id(&mut self) -> Result<ChemId, Error<I::Error>> {
        Ok(ChemId::from(
            self.read_control(BQ27427_CONTROL_CHEM_ID).await?,
        ))
    }

    /// Select the battery chemistry profile
    pub async fn set_chem_id(&mut self, chem_id: ChemId) -> Result<(), Error<I::Error>> {
        let subcommand = chem_id.subcommand().ok_or(Error::InvalidParameter)?;
        let opened = self.open_helper_session().await?;
        let result = self.write_control(subcommand).await;
        self.close_helper_session(opened, result).await
    }

    // ========================================
    // Status and control
    // ========================================

    /// Read the DEVICE_TYPE subcommand
    pub async fn device_type(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_control(BQ27427_CONTROL_DEVICE_TYPE).await
    }

    /// Read the firmware version
    pub async fn fw_version(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_control(BQ27427_CONTROL_FW_VERSION).await
    }

    /// Read the data memory code
    pub async fn dm_code(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_control(BQ27427_CONTROL_DM_CODE).await
    }

    /// Read the CONTROL_STATUS word
    pub async fn control_status(&mut self) -> Result<ControlStatus, Error<I::Error>> {
        let raw = self.read_control(BQ27427_CONTROL_STATUS).await?;
        Ok(ControlStatus::from_bits_retain(raw))
    }

    /// Read the Flags() register
    pub async fn flags(&mut self) -> Result<StatusFlags, Error<I::Error>> {
        let raw = self.read_word(BQ27427_COMMAND_FLAGS).await?;
        Ok(StatusFlags::from_bits_retain(raw))
    }

    /// Check if the SOC1 flag is set
    pub async fn soc1_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags().await?.contains(StatusFlags::SOC1))
    }

    /// Check if the SOCF flag is set
    pub async fn socf_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags().await?.contains(StatusFlags::SOCF))
    }

    /// Check if the ITPOR flag is set
    pub async fn itpor_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags().await?.contains(StatusFlags::ITPOR))
    }

    /// Check if the full-charge flag is set
    pub async fn fc_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags().await?.contains(StatusFlags::FC))
    }

    /// Check if the charging flag is set
    pub async fn chg_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags().await?.contains(StatusFlags::CHG))
    }

    /// Check if the discharging flag is set
    pub async fn dsg_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags().await?.contains(StatusFlags::DSG))
    }

    /// Pulse GPOUT (GPOUT must be configured for SOC_INT)
    pub async fn pulse_gpout(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(BQ27427_CONTROL_PULSE_SOC_INT).await
    }

    /// Issue a full reset; the device comes back sealed with default data memory
    pub async fn reset(&mut self) -> Result<(), Error<I::Error>> {
        info!("performing hard reset");
        self.session = SessionState::Idle;
        self.reseal_on_exit = false;
        self.access = AccessLevel::Sealed;
        self.write_control(BQ27427_CONTROL_RESET).await
    }

    // ========================================
    // Measurements
    // ========================================

    /// Get cell voltage in mV
    pub async fn voltage(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_word(BQ27427_COMMAND_VOLTAGE).await
    }

    /// Get current in mA; positive while charging
    pub async fn current(&mut self, measure: CurrentMeasure) -> Result<i16, Error<I::Error>> {
        Ok(self.read_word(measure.command()).await? as i16)
    }

    /// Get capacity in mAh
    pub async fn capacity(&mut self, measure: CapacityMeasure) -> Result<u16, Error<I::Error>> {
        match measure.command() {
            Some(command) => self.read_word(command).await,
            None => self.design_capacity().await,
        }
    }

    /// Get average power in mW; positive while charging
    pub async fn power(&mut self) -> Result<i16, Error<I::Error>> {
        Ok(self.read_word(BQ27427_COMMAND_AVG_POWER).await? as i16)
    }

    /// Get state of charge in percent
    pub async fn soc(&mut self, measure: SocMeasure) -> Result<u16, Error<I::Error>> {
        self.read_word(measure.command()).await
    }

    /// Get state of health percentage or status byte
    pub async fn soh(&mut self, measure: SohMeasure) -> Result<u8, Error<I::Error>> {
        Ok(measure.extract(self.read_word(BQ27427_COMMAND_SOH).await?))
    }

    /// Get temperature in 0.1 K
    pub async fn temperature(&mut self, measure: TempMeasure) -> Result<u16, Error<I::Error>> {
        self.read_word(measure.command()).await
    }
}
