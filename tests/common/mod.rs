//! Register-level BQ27427 simulator shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use bq27427::*;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use embedded_hal_mock::eh1::delay::NoopDelay;

/// Simulated gauge behind an I2C bus
///
/// Models the Control() pipe, seal keys, CFGUPMODE transitions with a
/// configurable polling latency and checksummed data memory blocks. Every
/// write is recorded for test verification.
#[derive(Debug)]
pub struct SimGauge {
    pub device_type: u16,
    pub sealed: bool,
    pub full_access: bool,
    pub unseal_key: u16,
    pub full_access_key: u16,
    pub cfgupmode: bool,
    /// Flags() reads before a requested CFGUPMODE change becomes visible
    pub mode_latency: u32,
    /// Ignore SET_CFGUPDATE entirely
    pub stuck: bool,
    /// Accept block writes without committing them
    pub drop_commits: bool,
    pub chem_id: u16,
    pub words: HashMap<u8, u16>,
    pub memory: HashMap<(u8, u8), [u8; BQ27427_BLOCK_SIZE]>,
    pub writes: Vec<Vec<u8>>,
    pub flags_reads: u32,
    pending_mode: Option<(bool, u32)>,
    last_key: Option<u16>,
    control_response: u16,
    pointer: u8,
    class_id: u8,
    block_offset: u8,
    window: [u8; BQ27427_BLOCK_SIZE],
}

impl SimGauge {
    pub fn new() -> Self {
        let mut gauge = Self {
            device_type: BQ27427_DEVICE_ID,
            sealed: true,
            full_access: false,
            unseal_key: BQ27427_UNSEAL_KEY,
            full_access_key: BQ27427_FULL_ACCESS_KEY,
            cfgupmode: false,
            mode_latency: 1,
            stuck: false,
            drop_commits: false,
            chem_id: 0x3230,
            words: HashMap::new(),
            memory: HashMap::new(),
            writes: Vec::new(),
            flags_reads: 0,
            pending_mode: None,
            last_key: None,
            control_response: 0,
            pointer: 0,
            class_id: 0,
            block_offset: 0,
            window: [0; BQ27427_BLOCK_SIZE],
        };

        // Design capacity 1340 mAh, terminate voltage 3200 mV
        let mut state = [0u8; BQ27427_BLOCK_SIZE];
        state[6..8].copy_from_slice(&1340u16.to_be_bytes());
        state[10..12].copy_from_slice(&3200u16.to_be_bytes());
        gauge.memory.insert((BQ27427_ID_STATE, 0), state);

        let mut registers = [0u8; BQ27427_BLOCK_SIZE];
        registers[0..2].copy_from_slice(&0x0004u16.to_be_bytes());
        gauge.memory.insert((BQ27427_ID_REGISTERS, 0), registers);

        gauge
    }

    pub fn unsealed() -> Self {
        Self {
            sealed: false,
            ..Self::new()
        }
    }

    /// Stored data memory block
    pub fn block(&self, class_id: u8, block_offset: u8) -> [u8; BQ27427_BLOCK_SIZE] {
        self.memory
            .get(&(class_id, block_offset))
            .copied()
            .unwrap_or([0; BQ27427_BLOCK_SIZE])
    }

    /// Number of recorded writes to `register`
    pub fn writes_to(&self, register: u8) -> usize {
        self.writes.iter().filter(|w| w.first() == Some(&register)).count()
    }

    fn load_window(&mut self) {
        self.window = self.block(self.class_id, self.block_offset);
    }

    fn control(&mut self, subcommand: u16) {
        let key = self.last_key.take();

        if self.sealed {
            if subcommand == self.unseal_key {
                if key == Some(subcommand) {
                    self.sealed = false;
                } else {
                    self.last_key = Some(subcommand);
                }
                return;
            }
        } else if subcommand == self.full_access_key && !self.full_access {
            if key == Some(subcommand) {
                self.full_access = true;
            } else {
                self.last_key = Some(subcommand);
            }
            return;
        }

        match subcommand {
            BQ27427_CONTROL_STATUS => {
                let mut status = ControlStatus::INITCOMP;
                status.set(ControlStatus::SS, self.sealed);
                self.control_response = status.bits();
            }
            BQ27427_CONTROL_DEVICE_TYPE => self.control_response = self.device_type,
            BQ27427_CONTROL_FW_VERSION => self.control_response = 0x0202,
            BQ27427_CONTROL_DM_CODE => self.control_response = 0x0048,
            BQ27427_CONTROL_CHEM_ID => self.control_response = self.chem_id,
            BQ27427_CONTROL_SET_CFGUPDATE if !self.sealed && !self.stuck => {
                self.pending_mode = Some((true, self.mode_latency));
            }
            BQ27427_CONTROL_SOFT_RESET if self.cfgupmode => {
                self.pending_mode = Some((false, self.mode_latency));
            }
            BQ27427_CONTROL_SEALED => {
                self.sealed = true;
                self.full_access = false;
            }
            BQ27427_CONTROL_RESET => {
                self.sealed = true;
                self.full_access = false;
                self.cfgupmode = false;
                self.pending_mode = None;
            }
            BQ27427_CONTROL_CHEM_A if self.cfgupmode => self.chem_id = 0x3230,
            BQ27427_CONTROL_CHEM_B if self.cfgupmode => self.chem_id = 0x1202,
            BQ27427_CONTROL_CHEM_C if self.cfgupmode => self.chem_id = 0x3142,
            _ => {}
        }
    }

    fn poll_flags(&mut self) -> u16 {
        self.flags_reads += 1;
        if let Some((target, remaining)) = self.pending_mode {
            if remaining == 0 {
                self.cfgupmode = target;
                self.pending_mode = None;
            } else {
                self.pending_mode = Some((target, remaining - 1));
            }
        }

        let mut flags = StatusFlags::BAT_DET;
        flags.set(StatusFlags::CFGUPMODE, self.cfgupmode);
        flags.bits()
    }

    fn write(&mut self, data: &[u8]) {
        self.writes.push(data.to_vec());
        let Some((&register, payload)) = data.split_first() else {
            return;
        };
        self.pointer = register;

        match (register, payload) {
            (BQ27427_COMMAND_CONTROL, [low, high]) => {
                self.control(u16::from_le_bytes([*low, *high]));
            }
            (BQ27427_EXTENDED_DATACLASS, [class_id]) => {
                self.class_id = *class_id;
                self.block_offset = 0;
                self.load_window();
            }
            (BQ27427_EXTENDED_DATABLOCK, [block_offset]) => {
                self.block_offset = *block_offset;
                self.load_window();
            }
            (BQ27427_EXTENDED_CHECKSUM, [checksum]) => {
                let accepted = self.cfgupmode
                    && !self.sealed
                    && !self.drop_commits
                    && *checksum == block_checksum(&self.window);
                if accepted {
                    self.memory
                        .insert((self.class_id, self.block_offset), self.window);
                }
            }
            (0x40..=0x5F, bytes) if !bytes.is_empty() => {
                let start = usize::from(register - BQ27427_EXTENDED_BLOCKDATA);
                let end = (start + bytes.len()).min(BQ27427_BLOCK_SIZE);
                self.window[start..end].copy_from_slice(&bytes[..end - start]);
            }
            _ => {}
        }
    }

    fn read(&mut self, buf: &mut [u8]) {
        let mut image = [0u8; 0x62];
        for (&register, &value) in &self.words {
            let register = usize::from(register);
            image[register..register + 2].copy_from_slice(&value.to_le_bytes());
        }
        image[0..2].copy_from_slice(&self.control_response.to_le_bytes());
        if self.pointer == BQ27427_COMMAND_FLAGS {
            let flags = self.poll_flags();
            image[6..8].copy_from_slice(&flags.to_le_bytes());
        }
        image[0x40..0x60].copy_from_slice(&self.window);
        image[0x60] = block_checksum(&self.block(self.class_id, self.block_offset));

        let start = usize::from(self.pointer);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = image.get(start + i).copied().unwrap_or(0);
        }
    }
}

impl ErrorType for SimGauge {
    type Error = ErrorKind;
}

impl I2c for SimGauge {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != BQ27427_I2C_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(data) => self.write(data),
                Operation::Read(buf) => self.read(buf),
            }
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config::default().with_polling(1, 5).with_block_settle(0)
}

pub fn gauge(sim: SimGauge) -> Bq27427<SimGauge, NoopDelay> {
    Bq27427::with_config(sim, NoopDelay::new(), test_config())
}

pub fn sim_of(gauge: Bq27427<SimGauge, NoopDelay>) -> SimGauge {
    gauge.release().0
}
