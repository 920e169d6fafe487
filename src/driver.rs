//! Synchronous BQ27427 fuel gauge driver implementation

use crate::{error::Error, registers::*, types::*};
use embedded_hal::{delay::DelayNs, i2c::I2c};

/// BQ27427 fuel gauge driver
///
/// Every compound operation (session entry, block transfers, parameter
/// read-modify-write) takes `&mut self` for its whole duration. To share a
/// gauge between threads, wrap the driver in a mutex and hold the guard
/// across the complete compound call.
pub struct Bq27427<I, D> {
    i2c: I,
    delay: D,
    config: Config,
    access: AccessLevel,
    session: SessionState,
    owner: SessionOwner,
    reseal_on_exit: bool,
}

impl<I, D> Bq27427<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Create a new BQ27427 driver instance
    ///
    /// # Arguments
    /// * `i2c` - I2C bus instance
    /// * `delay` - Delay source used while polling the device
    ///
    /// # Example
    /// ```no_run
    /// # use bq27427::Bq27427;
    /// # use embedded_hal::{delay::DelayNs, i2c::I2c};
    /// # fn example<I: I2c, D: DelayNs>(i2c: I, delay: D) {
    /// let gauge = Bq27427::new(i2c, delay);
    /// # }
    /// ```
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_config(i2c, delay, Config::default())
    }

    /// Create a new BQ27427 driver instance with a custom configuration
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

    /// Access level the driver last observed or established
    pub fn access_level(&self) -> AccessLevel {
        self.access
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    /// Verify the device type and synchronise the access level
    ///
    /// Returns `Error::DeviceNotFound` if DEVICE_TYPE doesn't match
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        let device_type = self.device_type()?;
        if device_type != BQ27427_DEVICE_ID {
            warn!("unexpected device type {}", device_type);
            return Err(Error::DeviceNotFound);
        }
        self.refresh_access_level()?;
        Ok(())
    }

    // ========================================
    // Low-level I2C operations
    // ========================================

    /// Read a single register
    fn read_register(&mut self, reg: u8) -> Result<u8, Error<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.config.address, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Write a single register
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.i2c
            .write(self.config.address, &[reg, value])
            .map_err(Error::I2c)
    }

    /// Read multiple registers
    fn read_registers(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error<I::Error>> {
        self.i2c
            .write_read(self.config.address, &[reg], buf)
            .map_err(Error::I2c)
    }

    /// Write multiple registers
    fn write_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), Error<I::Error>> {
        let mut buf = [0u8; BQ27427_BLOCK_SIZE + 1]; // max: 1 reg + 32 data bytes
        if data.len() > BQ27427_BLOCK_SIZE {
            return Err(Error::InvalidParameter);
        }
        buf[0] = reg;
        buf[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(self.config.address, &buf[..=data.len()])
            .map_err(Error::I2c)
    }

    /// Read a standard command (two registers, little-endian)
    pub fn read_word(&mut self, command: u8) -> Result<u16, Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.read_registers(command, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Issue a Control() subcommand without reading a response
    pub fn write_control(&mut self, subcommand: u16) -> Result<(), Error<I::Error>> {
        let [low, high] = subcommand.to_le_bytes();
        self.i2c
            .write(self.config.address, &[BQ27427_COMMAND_CONTROL, low, high])
            .map_err(Error::I2c)
    }

    /// Issue a Control() subcommand and read its response from 0x00/0x01
    pub fn read_control(&mut self, subcommand: u16) -> Result<u16, Error<I::Error>> {
        self.write_control(subcommand)?;
        self.read_word(BQ27427_COMMAND_CONTROL)
    }

    // ========================================
    // Access level
    // ========================================

    /// Raise the access level to at least `level`
    ///
    /// Does nothing if the driver already holds `level`. Unsealing writes the
    /// unseal key twice and confirms through CONTROL_STATUS that the SS bit
    /// cleared; a wrong key is reported as `Error::AccessDenied` and is not
    /// retried.
    ///
    /// Full access is assumed, not confirmed: the device exposes no bit for
    /// it, so after the full-access key pair only a device that reads back
    /// sealed is detected (and reported as `Error::AccessDenied`). A wrong
    /// full-access key on an unsealed device goes unnoticed.
    pub fn ensure_access(&mut self, level: AccessLevel) -> Result<(), Error<I::Error>> {
        if self.access >= level {
            return Ok(());
        }

        if self.access == AccessLevel::Sealed {
            debug!("unsealing");
            self.write_key(self.config.unseal_key)?;
            if self.is_sealed()? {
                warn!("unseal key rejected");
                return Err(Error::AccessDenied);
            }
            self.access = AccessLevel::Unsealed;
        }

        if level == AccessLevel::FullAccess {
            debug!("requesting full access");
            self.write_key(self.config.full_access_key)?;
            if self.is_sealed()? {
                warn!("full access key rejected, device sealed");
                self.access = AccessLevel::Sealed;
                return Err(Error::AccessDenied);
            }
            self.access = AccessLevel::FullAccess;
        }

        Ok(())
    }

    /// Unseal the device
    pub fn unseal(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_access(AccessLevel::Unsealed)
    }

    /// Seal the device
    ///
    /// The device does not acknowledge SEALED, so the driver assumes it took
    /// effect. Use [`refresh_access_level`](Self::refresh_access_level) to
    /// check.
    pub fn seal(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(BQ27427_CONTROL_SEALED)?;
        self.access = AccessLevel::Sealed;
        debug!("sealed");
        Ok(())
    }

    /// Re-derive the access level from CONTROL_STATUS
    ///
    /// Full access cannot be told apart from unsealed on this device; a
    /// believed `FullAccess` is kept as long as the device is unsealed.
    pub fn refresh_access_level(&mut self) -> Result<AccessLevel, Error<I::Error>> {
        self.access = if self.is_sealed()? {
            AccessLevel::Sealed
        } else if self.access == AccessLevel::FullAccess {
            AccessLevel::FullAccess
        } else {
            AccessLevel::Unsealed
        };
        Ok(self.access)
    }

    /// Two-step key handshake through Control()
    fn write_key(&mut self, key: u16) -> Result<(), Error<I::Error>> {
        self.write_control(key)?;
        self.write_control(key)
    }

    fn is_sealed(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.control_status()?.contains(ControlStatus::SS))
    }

    // ========================================
    // Configuration-update session
    // ========================================

    /// Enter configuration-update mode
    ///
    /// Unseals the device if needed, issues SET_CFGUPDATE and polls Flags()
    /// until CFGUPMODE is set. Ends either `Active` or `Idle`; on an exhausted
    /// polling budget returns `Error::ConfigSessionTimeout`. The device is
    /// resealed on exit only if this call had to unseal it.
    ///
    /// With `user_managed` set, parameter helpers called while the session is
    /// open reuse it instead of opening and closing their own.
    pub fn enter_config(&mut self, user_managed: bool) -> Result<(), Error<I::Error>> {
        if self.session != SessionState::Idle {
            return Err(Error::InvalidSessionState);
        }

        // A cached `Sealed` may be stale; only reseal what this session unseals
        if self.access == AccessLevel::Sealed {
            self.refresh_access_level()?;
        }
        let was_sealed = self.access == AccessLevel::Sealed;
        self.ensure_access(AccessLevel::Unsealed)?;

        self.session = SessionState::Entering;
        let result = self
            .write_control(BQ27427_CONTROL_SET_CFGUPDATE)
            .and_then(|()| self.wait_for_cfgupmode(true));

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
    ///
    /// Issues SOFT_RESET and polls Flags() until CFGUPMODE clears, then
    /// reseals the device if the session unsealed it. The session is `Idle`
    /// afterwards even on error; a timeout here is not fatal since the device
    /// leaves the mode on its own.
    ///
    /// Without `user_managed`, a session opened by the caller is left open:
    /// the call is then only the signal that a helper's writes are complete.
    pub fn exit_config(&mut self, user_managed: bool) -> Result<(), Error<I::Error>> {
        if self.session != SessionState::Active {
            return Err(Error::InvalidSessionState);
        }
        if !user_managed && self.owner == SessionOwner::User {
            return Ok(());
        }

        self.session = SessionState::Exiting;
        let reseal = core::mem::take(&mut self.reseal_on_exit);
        let result = self
            .write_control(BQ27427_CONTROL_SOFT_RESET)
            .and_then(|()| self.wait_for_cfgupmode(false));
        self.session = SessionState::Idle;

        match result {
            Ok(true) => {
                info!("config update mode exited");
                if reseal {
                    self.seal()?;
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

    /// Run `f` inside a configuration-update session
    ///
    /// Enters a user-managed session, runs `f` and always exits, whatever
    /// `f` returned. An error from `f` takes precedence over an exit error.
    ///
    /// # Example
    /// ```no_run
    /// # use bq27427::{Bq27427, Error};
    /// # use embedded_hal::{delay::DelayNs, i2c::I2c};
    /// # fn example<I: I2c, D: DelayNs>(gauge: &mut Bq27427<I, D>) -> Result<(), Error<I::Error>> {
    /// gauge.config_session(|gauge| {
    ///     gauge.set_design_capacity(1200)?;
    ///     gauge.set_terminate_voltage(3200)
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn config_session<T, F>(&mut self, f: F) -> Result<T, Error<I::Error>>
    where
        F: FnOnce(&mut Self) -> Result<T, Error<I::Error>>,
    {
        self.enter_config(true)?;
        let result = f(self);
        let exit = self.exit_config(true);
        let value = result?;
        exit?;
        Ok(value)
    }

    /// Run `f` in the active session, or in a driver-managed one
    fn with_session<T, F>(&mut self, f: F) -> Result<T, Error<I::Error>>
    where
        F: FnOnce(&mut Self) -> Result<T, Error<I::Error>>,
    {
        if self.session == SessionState::Active {
            return f(self);
        }

        self.enter_config(false)?;
        let result = f(self);
        let exit = self.exit_config(false);
        let value = result?;
        exit?;
        Ok(value)
    }

    /// Poll Flags() until CFGUPMODE equals `set`
    ///
    /// Returns `false` once the polling budget is exhausted.
    fn wait_for_cfgupmode(&mut self, set: bool) -> Result<bool, Error<I::Error>> {
        let attempts = self.config.max_poll_attempts.max(1);
        for attempt in 1..=attempts {
            if self.flags()?.contains(StatusFlags::CFGUPMODE) == set {
                trace!("CFGUPMODE reached {} after {} polls", set, attempt);
                return Ok(true);
            }
            if attempt < attempts {
                self.delay.delay_ms(self.config.poll_interval_ms);
            }
        }
        Ok(false)
    }

    // ========================================
    // Extended data blocks
    // ========================================

    /// Point the BlockData() window at `address`
    fn select_block(&mut self, address: BlockAddress) -> Result<(), Error<I::Error>> {
        trace!(
            "selecting class {} block {}",
            address.class_id,
            address.block_offset
        );
        self.write_register(BQ27427_EXTENDED_CONTROL, 0x00)?;
        self.write_register(BQ27427_EXTENDED_DATACLASS, address.class_id)?;
        self.write_register(BQ27427_EXTENDED_DATABLOCK, address.block_offset)?;
        self.delay.delay_ms(self.config.block_settle_ms);
        Ok(())
    }

    /// Read a 32-byte data memory block and the checksum the device reports
    ///
    /// Only valid inside an active session. The checksum is returned as-is;
    /// use [`BlockRead::is_valid`] to verify it.
    pub fn read_block(&mut self, address: BlockAddress) -> Result<BlockRead, Error<I::Error>> {
        if self.session != SessionState::Active {
            return Err(Error::SessionRequired);
        }

        self.select_block(address)?;
        let mut block = ParameterBlock::zeroed(address);
        self.read_registers(BQ27427_EXTENDED_BLOCKDATA, &mut block.bytes)?;
        let device_checksum = self.read_register(BQ27427_EXTENDED_CHECKSUM)?;

        Ok(BlockRead {
            block,
            device_checksum,
        })
    }

    /// Write a 32-byte data memory block and verify its checksum
    ///
    /// Only valid inside an active session. A checksum mismatch on read-back
    /// is reported and not retried.
    pub fn write_block(&mut self, block: &ParameterBlock) -> Result<(), Error<I::Error>> {
        if self.session != SessionState::Active {
            return Err(Error::SessionRequired);
        }

        self.select_block(block.address)?;
        self.write_registers(BQ27427_EXTENDED_BLOCKDATA, &block.bytes)?;

        let expected = block.checksum();
        self.write_register(BQ27427_EXTENDED_CHECKSUM, expected)?;
        self.delay.delay_ms(self.config.block_settle_ms);

        let actual = self.read_register(BQ27427_EXTENDED_CHECKSUM)?;
        if actual != expected {
            warn!(
                "block checksum mismatch: wrote {}, device has {}",
                expected,
                actual
            );
            return Err(Error::ChecksumVerification { expected, actual });
        }

        debug!(
            "wrote class {} block {}",
            block.address.class_id,
            block.address.block_offset
        );
        Ok(())
    }

    // ========================================
    // Data memory parameters
    // ========================================

    /// Read and verify the block holding `offset` of `class`
    fn read_parameter_block(
        &mut self,
        class: u8,
        offset: u8,
    ) -> Result<ParameterBlock, Error<I::Error>> {
        let address = BlockAddress::containing(class, offset);
        let read = self.with_session(|gauge| gauge.read_block(address))?;
        if !read.is_valid() {
            return Err(Error::ChecksumVerification {
                expected: read.block.checksum(),
                actual: read.device_checksum,
            });
        }
        Ok(read.block)
    }

    /// Read-modify-write the block holding `offset` of `class`
    fn modify_parameter_block<F>(&mut self, class: u8, offset: u8, f: F) -> Result<(), Error<I::Error>>
    where
        F: FnOnce(&mut ParameterBlock),
    {
        let address = BlockAddress::containing(class, offset);
        self.with_session(|gauge| {
            let read = gauge.read_block(address)?;
            if !read.is_valid() {
                return Err(Error::ChecksumVerification {
                    expected: read.block.checksum(),
                    actual: read.device_checksum,
                });
            }
            let mut block = read.block;
            f(&mut block);
            gauge.write_block(&block)
        })
    }

    /// Read one byte of data memory
    pub fn read_extended_byte(&mut self, class: u8, offset: u8) -> Result<u8, Error<I::Error>> {
        Ok(self.read_parameter_block(class, offset)?.byte_at(offset))
    }

    /// Read a big-endian word of data memory
    ///
    /// The word must not straddle two blocks.
    pub fn read_extended_word(&mut self, class: u8, offset: u8) -> Result<u16, Error<I::Error>> {
        check_word_offset(offset)?;
        Ok(self.read_parameter_block(class, offset)?.word_at(offset))
    }

    /// Write one byte of data memory
    pub fn write_extended_byte(
        &mut self,
        class: u8,
        offset: u8,
        value: u8,
    ) -> Result<(), Error<I::Error>> {
        self.modify_parameter_block(class, offset, |block| block.set_byte_at(offset, value))
    }

    /// Write a big-endian word of data memory
    pub fn write_extended_word(
        &mut self,
        class: u8,
        offset: u8,
        value: u16,
    ) -> Result<(), Error<I::Error>> {
        check_word_offset(offset)?;
        self.modify_parameter_block(class, offset, |block| block.set_word_at(offset, value))
    }

    /// Get design capacity in mAh
    pub fn design_capacity(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_CAPACITY)
    }

    /// Set design capacity in mAh
    pub fn set_design_capacity(&mut self, capacity: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_CAPACITY, capacity)
    }

    /// Get design energy in mWh
    pub fn design_energy(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_ENERGY)
    }

    /// Set design energy in mWh
    pub fn set_design_energy(&mut self, energy: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_DESIGN_ENERGY, energy)
    }

    /// Get terminate voltage in mV
    pub fn terminate_voltage(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TERMINATE_VOLTAGE)
    }

    /// Set terminate voltage in mV (lowest operating voltage of the system)
    pub fn set_terminate_voltage(&mut self, millivolt: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TERMINATE_VOLTAGE, millivolt)
    }

    /// Get taper voltage in mV
    pub fn taper_voltage(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_VOLTAGE)
    }

    /// Set taper voltage in mV
    pub fn set_taper_voltage(&mut self, millivolt: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_VOLTAGE, millivolt)
    }

    /// Get taper rate in 0.1 h units
    pub fn taper_rate(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_RATE)
    }

    /// Set taper rate in 0.1 h units
    pub fn set_taper_rate(&mut self, rate: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_STATE, BQ27427_STATE_TAPER_RATE, rate)
    }

    /// Get discharge current threshold in 0.1 h units
    pub fn discharge_current_threshold(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_extended_word(BQ27427_ID_CURRENT_THRESH, BQ27427_CURRENT_THRESH_DSG)
    }

    /// Set discharge current threshold in 0.1 h units
    pub fn set_discharge_current_threshold(&mut self, value: u16) -> Result<(), Error<I::Error>> {
        self.write_extended_word(BQ27427_ID_CURRENT_THRESH, BQ27427_CURRENT_THRESH_DSG, value)
    }

    /// Get the SOC_INT interval delta in percent
    pub fn soci_delta(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_STATE, BQ27427_STATE_SOCI_DELTA)
    }

    /// Set the SOC_INT interval delta (1..=100 percent)
    pub fn set_soci_delta(&mut self, delta: u8) -> Result<(), Error<I::Error>> {
        if !(1..=100).contains(&delta) {
            return Err(Error::InvalidParameter);
        }
        self.write_extended_byte(BQ27427_ID_STATE, BQ27427_STATE_SOCI_DELTA, delta)
    }

    /// Get the OpConfig register
    pub fn op_config(&mut self) -> Result<OpConfig, Error<I::Error>> {
        let raw = self.read_extended_word(BQ27427_ID_REGISTERS, BQ27427_REGISTERS_OPCONFIG)?;
        Ok(OpConfig::from_bits_retain(raw))
    }

    /// Set the OpConfig register
    pub fn set_op_config(&mut self, op_config: OpConfig) -> Result<(), Error<I::Error>> {
        self.write_extended_word(
            BQ27427_ID_REGISTERS,
            BQ27427_REGISTERS_OPCONFIG,
            op_config.bits(),
        )
    }

    fn update_op_config(&mut self, flag: OpConfig, enable: bool) -> Result<(), Error<I::Error>> {
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
    }

    /// Check if GPOUT is active-high
    pub fn gpout_polarity(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.op_config()?.contains(OpConfig::GPIOPOL))
    }

    /// Set GPOUT to active-high (`true`) or active-low (`false`)
    pub fn set_gpout_polarity(&mut self, active_high: bool) -> Result<(), Error<I::Error>> {
        self.update_op_config(OpConfig::GPIOPOL, active_high)
    }

    /// Get GPOUT function
    pub fn gpout_function(&mut self) -> Result<GpoutFunction, Error<I::Error>> {
        Ok(if self.op_config()?.contains(OpConfig::BATLOWEN) {
            GpoutFunction::BatLow
        } else {
            GpoutFunction::SocInt
        })
    }

    /// Set GPOUT function
    pub fn set_gpout_function(&mut self, function: GpoutFunction) -> Result<(), Error<I::Error>> {
        self.update_op_config(OpConfig::BATLOWEN, function == GpoutFunction::BatLow)
    }

    /// Get SOC1 set threshold in percent
    pub fn soc1_set_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOC1_SET)
    }

    /// Get SOC1 clear threshold in percent
    pub fn soc1_clear_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOC1_CLEAR)
    }

    /// Set SOC1 set and clear thresholds (0..=100 percent, clear above set)
    pub fn set_soc1_thresholds(&mut self, set: u8, clear: u8) -> Result<(), Error<I::Error>> {
        self.set_threshold_pair(BQ27427_DISCHARGE_SOC1_SET, set, clear)
    }

    /// Get SOCF set threshold in percent
    pub fn socf_set_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOCF_SET)
    }

    /// Get SOCF clear threshold in percent
    pub fn socf_clear_threshold(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_extended_byte(BQ27427_ID_DISCHARGE, BQ27427_DISCHARGE_SOCF_CLEAR)
    }

    /// Set SOCF set and clear thresholds (0..=100 percent, clear above set)
    pub fn set_socf_thresholds(&mut self, set: u8, clear: u8) -> Result<(), Error<I::Error>> {
        self.set_threshold_pair(BQ27427_DISCHARGE_SOCF_SET, set, clear)
    }

    fn set_threshold_pair(&mut self, offset: u8, set: u8, clear: u8) -> Result<(), Error<I::Error>> {
        if set > 100 || clear > 100 {
            return Err(Error::InvalidParameter);
        }
        self.modify_parameter_block(BQ27427_ID_DISCHARGE, offset, |block| {
            block.set_byte_at(offset, set);
            block.set_byte_at(offset + 1, clear);
        })
    }

    /// Flip the sign of the coulomb counter gain
    ///
    /// Some BQ27427 parts ship with a negative CC Gain, which reports
    /// charge currents as discharge.
    pub fn change_current_polarity(&mut self) -> Result<(), Error<I::Error>> {
        self.modify_parameter_block(BQ27427_ID_CC_CAL, BQ27427_CC_CAL_GAIN_SIGN_BYTE, |block| {
            let byte = block.byte_at(BQ27427_CC_CAL_GAIN_SIGN_BYTE);
            block.set_byte_at(BQ27427_CC_CAL_GAIN_SIGN_BYTE, byte ^ 0x80);
        })
    }

    /// Get the battery chemistry profile
    pub fn chem_id(&mut self) -> Result<ChemId, Error<I::Error>> {
        Ok(ChemId::from(self.read_control(BQ27427_CONTROL_CHEM_ID)?))
    }

    /// Select the battery chemistry profile
    pub fn set_chem_id(&mut self, chem_id: ChemId) -> Result<(), Error<I::Error>> {
        let subcommand = chem_id.subcommand().ok_or(Error::InvalidParameter)?;
        self.with_session(|gauge| gauge.write_control(subcommand))
    }

    // ========================================
    // Status and control
    // ========================================

    /// Read the DEVICE_TYPE subcommand (0x0421 for the BQ27427)
    pub fn device_type(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_control(BQ27427_CONTROL_DEVICE_TYPE)
    }

    /// Read the firmware version
    pub fn fw_version(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_control(BQ27427_CONTROL_FW_VERSION)
    }

    /// Read the data memory code
    pub fn dm_code(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_control(BQ27427_CONTROL_DM_CODE)
    }

    /// Read the CONTROL_STATUS word
    pub fn control_status(&mut self) -> Result<ControlStatus, Error<I::Error>> {
        let raw = self.read_control(BQ27427_CONTROL_STATUS)?;
        Ok(ControlStatus::from_bits_retain(raw))
    }

    /// Read the Flags() register
    pub fn flags(&mut self) -> Result<StatusFlags, Error<I::Error>> {
        let raw = self.read_word(BQ27427_COMMAND_FLAGS)?;
        Ok(StatusFlags::from_bits_retain(raw))
    }

    /// Check if the SOC1 flag is set
    pub fn soc1_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags()?.contains(StatusFlags::SOC1))
    }

    /// Check if the SOCF flag is set
    pub fn socf_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags()?.contains(StatusFlags::SOCF))
    }

    /// Check if the ITPOR flag is set (data memory was reset to defaults)
    pub fn itpor_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags()?.contains(StatusFlags::ITPOR))
    }

    /// Check if the full-charge flag is set
    pub fn fc_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags()?.contains(StatusFlags::FC))
    }

    /// Check if the charging flag is set
    pub fn chg_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags()?.contains(StatusFlags::CHG))
    }

    /// Check if the discharging flag is set
    pub fn dsg_flag(&mut self) -> Result<bool, Error<I::Error>> {
        Ok(self.flags()?.contains(StatusFlags::DSG))
    }

    /// Pulse GPOUT (GPOUT must be configured for SOC_INT)
    pub fn pulse_gpout(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(BQ27427_CONTROL_PULSE_SOC_INT)
    }

    /// Issue a full reset
    ///
    /// Data memory returns to its defaults and the device comes back sealed.
    /// Any open session is abandoned.
    pub fn reset(&mut self) -> Result<(), Error<I::Error>> {
        info!("performing hard reset");
        self.session = SessionState::Idle;
        self.reseal_on_exit = false;
        self.access = AccessLevel::Sealed;
        self.write_control(BQ27427_CONTROL_RESET)
    }

    // ========================================
    // Measurements
    // ========================================

    /// Get cell voltage in mV
    pub fn voltage(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_word(BQ27427_COMMAND_VOLTAGE)
    }

    /// Get current in mA; positive while charging
    pub fn current(&mut self, measure: CurrentMeasure) -> Result<i16, Error<I::Error>> {
        Ok(self.read_word(measure.command())? as i16)
    }

    /// Get capacity in mAh
    pub fn capacity(&mut self, measure: CapacityMeasure) -> Result<u16, Error<I::Error>> {
        match measure.command() {
            Some(command) => self.read_word(command),
            None => self.design_capacity(),
        }
    }

    /// Get average power in mW; positive while charging
    pub fn power(&mut self) -> Result<i16, Error<I::Error>> {
        Ok(self.read_word(BQ27427_COMMAND_AVG_POWER)? as i16)
    }

    /// Get state of charge in percent
    pub fn soc(&mut self, measure: SocMeasure) -> Result<u16, Error<I::Error>> {
        self.read_word(measure.command())
    }

    /// Get state of health percentage or status byte
    pub fn soh(&mut self, measure: SohMeasure) -> Result<u8, Error<I::Error>> {
        Ok(measure.extract(self.read_word(BQ27427_COMMAND_SOH)?))
    }

    /// Get temperature in 0.1 K
    ///
    /// See [`deci_kelvin_to_celsius`](crate::deci_kelvin_to_celsius).
    pub fn temperature(&mut self, measure: TempMeasure) -> Result<u16, Error<I::Error>> {
        self.read_word(measure.command())
    }
}

/// Words must fit inside one 32-byte block
pub(crate) fn check_word_offset<E>(offset: u8) -> Result<(), Error<E>> {
    if offset as usize % BQ27427_BLOCK_SIZE == BQ27427_BLOCK_SIZE - 1 {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}
