mod common;

use bq27427::*;
use common::{gauge, sim_of, SimGauge};

#[test]
fn init_reads_device_type_and_seal_state() {
    let mut g = gauge(SimGauge::unsealed());
    assert_eq!(g.init(), Ok(()));
    assert_eq!(g.access_level(), AccessLevel::Unsealed);
    assert_eq!(g.fw_version(), Ok(0x0202));
}

#[test]
fn init_rejects_other_devices() {
    let mut sim = SimGauge::new();
    sim.device_type = 0x0426;
    let mut g = gauge(sim);
    assert_eq!(g.init(), Err(Error::DeviceNotFound));
}

#[test]
fn wrong_address_is_a_bus_error() {
    let mut g = Bq27427::with_config(
        SimGauge::new(),
        embedded_hal_mock::eh1::delay::NoopDelay::new(),
        common::test_config().with_address(0x0B),
    );
    assert!(matches!(g.voltage(), Err(Error::I2c(_))));
}

#[test]
fn block_write_then_read_reports_device_checksum() {
    let mut g = gauge(SimGauge::new());
    let address = BlockAddress::new(BQ27427_ID_STATE, 0);
    let mut bytes = [0u8; BQ27427_BLOCK_SIZE];
    bytes[0] = 0x01;

    g.enter_config(true).unwrap();
    g.write_block(&ParameterBlock::new(address, bytes)).unwrap();
    let read = g.read_block(address).unwrap();
    g.exit_config(true).unwrap();

    assert_eq!(read.block.bytes, bytes);
    assert_eq!(read.device_checksum, 0xFE);
    assert!(read.is_valid());
}

#[test]
fn setter_on_sealed_gauge_runs_a_full_session() {
    let mut g = gauge(SimGauge::new());
    assert_eq!(g.design_capacity(), Ok(1340));
    assert_eq!(g.set_design_capacity(1200), Ok(()));
    assert_eq!(g.session_state(), SessionState::Idle);
    assert_eq!(g.access_level(), AccessLevel::Sealed);
    assert_eq!(g.design_capacity(), Ok(1200));

    let sim = sim_of(g);
    assert!(sim.sealed);
    assert!(!sim.cfgupmode);
    assert_eq!(&sim.block(BQ27427_ID_STATE, 0)[6..8], &[0x04, 0xB0]);
    assert_eq!(&sim.block(BQ27427_ID_STATE, 0)[10..12], &3200u16.to_be_bytes());
}

#[test]
fn setter_on_unsealed_gauge_leaves_it_unsealed() {
    let mut g = gauge(SimGauge::unsealed());
    g.init().unwrap();
    g.set_terminate_voltage(3000).unwrap();
    assert_eq!(g.access_level(), AccessLevel::Unsealed);
    assert!(!sim_of(g).sealed);
}

#[test]
fn setter_without_init_leaves_unsealed_gauge_unsealed() {
    let mut g = gauge(SimGauge::unsealed());
    assert_eq!(g.set_design_capacity(1200), Ok(()));
    assert_eq!(g.access_level(), AccessLevel::Unsealed);

    let sim = sim_of(g);
    assert!(!sim.sealed);
    // no unseal key and no SEALED subcommand
    assert!(!sim
        .writes
        .iter()
        .any(|w| w.as_slice() == [BQ27427_COMMAND_CONTROL, 0x00, 0x80]
            || w.as_slice() == [BQ27427_COMMAND_CONTROL, 0x20, 0x00]));
    assert_eq!(&sim.block(BQ27427_ID_STATE, 0)[6..8], &1200u16.to_be_bytes());
}

#[test]
fn writes_to_two_blocks_of_one_class_reselect_each_time() {
    let mut g = gauge(SimGauge::new());
    let first = BlockAddress::new(BQ27427_ID_STATE, 0);
    let second = BlockAddress::new(BQ27427_ID_STATE, 1);
    let mut low = [0u8; BQ27427_BLOCK_SIZE];
    low[6..8].copy_from_slice(&1500u16.to_be_bytes());
    let mut high = [0u8; BQ27427_BLOCK_SIZE];
    high[0] = 0x5A;

    g.enter_config(true).unwrap();
    g.write_block(&ParameterBlock::new(first, low)).unwrap();
    g.write_block(&ParameterBlock::new(second, high)).unwrap();
    g.exit_config(true).unwrap();

    let sim = sim_of(g);
    assert_eq!(sim.writes_to(BQ27427_EXTENDED_DATACLASS), 2);
    assert_eq!(sim.writes_to(BQ27427_EXTENDED_DATABLOCK), 2);
    assert_eq!(sim.block(BQ27427_ID_STATE, 0), low);
    assert_eq!(sim.block(BQ27427_ID_STATE, 1), high);
}

#[test]
fn each_block_write_reissues_selection() {
    let mut g = gauge(SimGauge::new());
    g.enter_config(true).unwrap();
    g.set_design_capacity(2000).unwrap();
    g.set_soc1_thresholds(15, 20).unwrap();
    g.exit_config(true).unwrap();

    let sim = sim_of(g);
    // read-modify-write selects the block twice per parameter
    assert_eq!(sim.writes_to(BQ27427_EXTENDED_CONTROL), 4);
    assert_eq!(sim.writes_to(BQ27427_EXTENDED_DATACLASS), 4);
    assert_eq!(sim.writes_to(BQ27427_EXTENDED_DATABLOCK), 4);
    assert_eq!(&sim.block(BQ27427_ID_STATE, 0)[6..8], &2000u16.to_be_bytes());
    assert_eq!(&sim.block(BQ27427_ID_DISCHARGE, 0)[0..2], &[15, 20]);
}

#[test]
fn setters_inside_user_session_keep_it_open() {
    let mut g = gauge(SimGauge::new());
    g.enter_config(true).unwrap();
    g.set_taper_rate(120).unwrap();
    g.set_soci_delta(5).unwrap();
    assert_eq!(g.session_state(), SessionState::Active);
    assert_eq!(g.taper_rate(), Ok(120));
    assert_eq!(g.soci_delta(), Ok(5));
    assert_eq!(g.exit_config(true), Ok(()));

    let sim = sim_of(g);
    // one SET_CFGUPDATE and one SOFT_RESET
    let soft_resets = sim
        .writes
        .iter()
        .filter(|w| w.as_slice() == [BQ27427_COMMAND_CONTROL, 0x42, 0x00])
        .count();
    assert_eq!(soft_resets, 1);
    assert!(sim.sealed);
}

#[test]
fn config_session_ends_idle_when_closure_fails() {
    let mut g = gauge(SimGauge::new());
    let result: Result<(), _> = g.config_session(|gauge| {
        gauge.set_design_energy(4440)?;
        Err(Error::InvalidParameter)
    });
    assert_eq!(result, Err(Error::InvalidParameter));
    assert_eq!(g.session_state(), SessionState::Idle);
    assert_eq!(g.access_level(), AccessLevel::Sealed);

    let sim = sim_of(g);
    assert!(!sim.cfgupmode);
    assert!(sim.sealed);
}

#[test]
fn config_session_returns_closure_value() {
    let mut g = gauge(SimGauge::new());
    let capacity = g.config_session(|gauge| gauge.design_capacity());
    assert_eq!(capacity, Ok(1340));
    assert_eq!(g.session_state(), SessionState::Idle);
}

#[test]
fn wrong_unseal_key_is_denied() {
    let mut g = Bq27427::with_config(
        SimGauge::new(),
        embedded_hal_mock::eh1::delay::NoopDelay::new(),
        common::test_config().with_keys(0x1234, BQ27427_FULL_ACCESS_KEY),
    );
    assert_eq!(g.set_design_capacity(1200), Err(Error::AccessDenied));
    assert_eq!(g.access_level(), AccessLevel::Sealed);
    assert_eq!(g.session_state(), SessionState::Idle);
    assert_eq!(sim_of(g).writes_to(BQ27427_EXTENDED_DATACLASS), 0);
}

#[test]
fn full_access_follows_unseal() {
    let mut g = gauge(SimGauge::new());
    assert_eq!(g.ensure_access(AccessLevel::FullAccess), Ok(()));
    assert_eq!(g.access_level(), AccessLevel::FullAccess);
    assert!(sim_of(g).full_access);
}

#[test]
fn stuck_gauge_times_out_within_poll_budget() {
    let mut sim = SimGauge::new();
    sim.stuck = true;
    let mut g = gauge(sim);
    assert_eq!(g.set_design_capacity(1200), Err(Error::ConfigSessionTimeout));
    assert_eq!(g.session_state(), SessionState::Idle);
    assert_eq!(sim_of(g).flags_reads, 5);
}

#[test]
fn slow_mode_change_is_awaited() {
    let mut sim = SimGauge::new();
    sim.mode_latency = 3;
    let mut g = gauge(sim);
    assert_eq!(g.enter_config(true), Ok(()));
    assert_eq!(g.session_state(), SessionState::Active);
    assert_eq!(g.exit_config(true), Ok(()));
    assert_eq!(sim_of(g).flags_reads, 8);
}

#[test]
fn rejected_commit_fails_verification_and_exits() {
    let mut sim = SimGauge::new();
    sim.drop_commits = true;
    let mut g = gauge(sim);
    assert!(matches!(
        g.set_design_capacity(1200),
        Err(Error::ChecksumVerification { .. })
    ));
    assert_eq!(g.session_state(), SessionState::Idle);

    let sim = sim_of(g);
    assert!(!sim.cfgupmode);
    assert_eq!(&sim.block(BQ27427_ID_STATE, 0)[6..8], &1340u16.to_be_bytes());
}

#[test]
fn op_config_flags_round_trip_through_data_memory() {
    let mut g = gauge(SimGauge::unsealed());
    assert_eq!(g.gpout_function(), Ok(GpoutFunction::BatLow));
    assert_eq!(g.gpout_polarity(), Ok(false));

    g.set_gpout_polarity(true).unwrap();
    g.set_gpout_function(GpoutFunction::SocInt).unwrap();
    assert_eq!(g.op_config(), Ok(OpConfig::GPIOPOL));
    assert_eq!(
        &sim_of(g).block(BQ27427_ID_REGISTERS, 0)[0..2],
        &0x0800u16.to_be_bytes()
    );
}

#[test]
fn current_polarity_flips_cc_gain_sign() {
    let mut g = gauge(SimGauge::unsealed());
    g.change_current_polarity().unwrap();
    assert_eq!(sim_of(g).block(BQ27427_ID_CC_CAL, 0)[5], 0x80);
}

#[test]
fn chemistry_is_selected_in_session() {
    let mut g = gauge(SimGauge::new());
    assert_eq!(g.chem_id(), Ok(ChemId::A4350));
    g.set_chem_id(ChemId::B4200).unwrap();
    assert_eq!(g.chem_id(), Ok(ChemId::B4200));
    assert_eq!(
        g.set_chem_id(ChemId::Unknown(0x1234)),
        Err(Error::InvalidParameter)
    );
}

#[test]
fn threshold_setters_validate_before_touching_the_bus() {
    let mut g = gauge(SimGauge::new());
    assert_eq!(g.set_socf_thresholds(101, 10), Err(Error::InvalidParameter));
    assert_eq!(g.set_soci_delta(0), Err(Error::InvalidParameter));
    assert!(sim_of(g).writes.is_empty());
}

#[test]
fn measurements_read_standard_commands() {
    let mut sim = SimGauge::new();
    sim.words.insert(BQ27427_COMMAND_VOLTAGE, 3850);
    sim.words.insert(BQ27427_COMMAND_AVG_CURRENT, (-120i16) as u16);
    sim.words.insert(BQ27427_COMMAND_REM_CAPACITY, 800);
    sim.words.insert(BQ27427_COMMAND_SOC, 62);
    sim.words.insert(BQ27427_COMMAND_SOH, 0x0362);
    sim.words.insert(BQ27427_COMMAND_TEMP, 2982);
    let mut g = gauge(sim);

    assert_eq!(g.voltage(), Ok(3850));
    assert_eq!(g.current(CurrentMeasure::Average), Ok(-120));
    assert_eq!(g.capacity(CapacityMeasure::Remaining), Ok(800));
    assert_eq!(g.capacity(CapacityMeasure::Design), Ok(1340));
    assert_eq!(g.soc(SocMeasure::Filtered), Ok(62));
    assert_eq!(g.soh(SohMeasure::Percent), Ok(98));
    assert_eq!(g.soh(SohMeasure::Status), Ok(3));
    assert_eq!(g.temperature(TempMeasure::Battery), Ok(2982));
    assert!(g.dsg_flag().is_ok_and(|dsg| !dsg));
}

#[test]
fn reset_drops_session_and_access() {
    let mut g = gauge(SimGauge::new());
    g.enter_config(true).unwrap();
    assert_eq!(g.reset(), Ok(()));
    assert_eq!(g.session_state(), SessionState::Idle);
    assert_eq!(g.access_level(), AccessLevel::Sealed);

    let sim = sim_of(g);
    assert!(sim.sealed);
    assert!(!sim.cfgupmode);
}
