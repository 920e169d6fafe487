//! Basic BQ27427 usage example
//!
//! This example demonstrates programming a cell profile and reading the
//! gauge's measurements.
//!
//! Note: You'll need to adapt this to your specific platform's I2C and delay
//! implementations.

use bq27427::{
    Bq27427, CapacityMeasure, ChemId, CurrentMeasure, Error, GpoutFunction, SocMeasure,
    SohMeasure, TempMeasure,
};
use embedded_hal::{delay::DelayNs, i2c::I2c};

fn configure_gauge<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Result<(I, D), Error<I::Error>> {
    // Create the gauge driver
    let mut gauge = Bq27427::new(i2c, delay);

    // Verify the chip and read its seal state
    gauge.init()?;

    // Program a 1200 mAh, 4.2 V cell in one configuration session
    gauge.config_session(|gauge| {
        gauge.set_chem_id(ChemId::B4200)?;
        gauge.set_design_capacity(1200)?;
        gauge.set_design_energy(4440)?;
        gauge.set_terminate_voltage(3200)?;
        gauge.set_taper_rate(120)?;

        // Low battery warning on GPOUT, active-low
        gauge.set_gpout_function(GpoutFunction::BatLow)?;
        gauge.set_gpout_polarity(false)?;
        gauge.set_soc1_thresholds(15, 20)?;
        gauge.set_socf_thresholds(5, 10)
    })?;

    // Read measurements
    let _voltage = gauge.voltage()?;
    let _current = gauge.current(CurrentMeasure::Average)?;
    let _remaining = gauge.capacity(CapacityMeasure::Remaining)?;
    let _soc = gauge.soc(SocMeasure::Filtered)?;
    let _soh = gauge.soh(SohMeasure::Percent)?;
    let temperature = gauge.temperature(TempMeasure::Battery)?;
    let _celsius = bq27427::deci_kelvin_to_celsius(temperature);
    // Platform-specific: print or log battery status

    if gauge.socf_flag()? {
        // Handle critically low battery
    }

    Ok(gauge.release())
}

fn main() {
    // Platform-specific: create I2C bus and delay, then call configure_gauge
    let _ = configure_gauge::<NoBus, NoDelay>;
}

// Placeholders standing in for a platform HAL
struct NoBus;
struct NoDelay;

impl embedded_hal::i2c::ErrorType for NoBus {
    type Error = embedded_hal::i2c::ErrorKind;
}

impl I2c for NoBus {
    fn transaction(
        &mut self,
        _address: u8,
        _operations: &mut [embedded_hal::i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        Err(embedded_hal::i2c::ErrorKind::Other)
    }
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
