// Licensed under the Apache-2.0 license

//! Common types and constants for the TWI driver modules.
//!
//! This module provides bus speed selection, the bit-rate register calculation
//! and the driver configuration builder.

use fugit::{HertzU32, RateExtU32};

/// Capacity of every driver buffer (master, slave receive, slave transmit).
pub const BUFFER_LENGTH: usize = 32;

/// Highest 7-bit bus address.
pub const MAX_ADDRESS: u8 = 0x7f;

/// Lower bound of the default wait budget, in microseconds.
pub const MIN_DEFAULT_TIMEOUT_US: u32 = 10_000;

/// Default wait budget for `bus_frequency`: twice the time a full buffer
/// (address byte plus `BUFFER_LENGTH` data bytes, nine clocks each) takes on
/// the wire, but never below [`MIN_DEFAULT_TIMEOUT_US`].
#[must_use]
pub fn default_timeout_us(bus_frequency: HertzU32) -> u32 {
    let clocks = (BUFFER_LENGTH as u32 + 1) * 9;
    let transfer_us = clocks * 1_000_000 / bus_frequency.raw().max(1);
    transfer_us.saturating_mul(2).max(MIN_DEFAULT_TIMEOUT_US)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub fn frequency(self) -> HertzU32 {
        (self as u32).Hz()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The CPU clock is too slow to reach the requested SCL frequency.
    SpeedTooHigh,
    /// Even the largest prescaler cannot slow SCL down far enough.
    SpeedTooLow,
    /// Own slave address does not fit in 7 bits.
    InvalidAddress,
}

/// Bit-rate prescaler, as encoded in the low two status register bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Div1 = 0,
    Div4 = 1,
    Div16 = 2,
    Div64 = 3,
}

impl Prescaler {
    const ALL: [Prescaler; 4] = [
        Prescaler::Div1,
        Prescaler::Div4,
        Prescaler::Div16,
        Prescaler::Div64,
    ];

    #[must_use]
    pub fn factor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div4 => 4,
            Prescaler::Div16 => 16,
            Prescaler::Div64 => 64,
        }
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Values for the bit-rate divisor register and prescaler.
///
/// `SCL = CPU / (16 + 2 * divisor * prescaler)`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitRate {
    pub divisor: u8,
    pub prescaler: Prescaler,
}

impl BitRate {
    /// Pick the smallest prescaler whose divisor fits in the 8-bit register.
    ///
    /// # Errors
    ///
    /// `SpeedTooHigh` if `cpu / scl` is below 16, `SpeedTooLow` if no
    /// prescaler brings the divisor under 256.
    pub fn compute(cpu_clock: HertzU32, scl: HertzU32) -> Result<Self, ConfigurationError> {
        let scl = scl.raw();
        if scl == 0 {
            return Err(ConfigurationError::SpeedTooLow);
        }
        let ratio = cpu_clock.raw() / scl;
        if ratio < 16 {
            return Err(ConfigurationError::SpeedTooHigh);
        }
        for prescaler in Prescaler::ALL {
            let divisor = (ratio - 16) / (2 * prescaler.factor());
            if let Ok(divisor) = u8::try_from(divisor) {
                return Ok(Self { divisor, prescaler });
            }
        }
        Err(ConfigurationError::SpeedTooLow)
    }

    /// The SCL frequency these register values produce.
    #[must_use]
    pub fn scl_frequency(&self, cpu_clock: HertzU32) -> HertzU32 {
        let denominator = 16 + 2 * u32::from(self.divisor) * self.prescaler.factor();
        (cpu_clock.raw() / denominator).Hz()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    pub bus_frequency: HertzU32,
    pub cpu_clock: HertzU32,
    pub own_address: Option<u8>,
    pub general_call: bool,
    /// Upper bound for every foreground wait, in microseconds.
    pub timeout_us: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

impl I2cConfig {
    /// # Errors
    ///
    /// See [`BitRate::compute`].
    pub fn bit_rate(&self) -> Result<BitRate, ConfigurationError> {
        BitRate::compute(self.cpu_clock, self.bus_frequency)
    }

    /// # Errors
    ///
    /// `InvalidAddress` when the configured own address is wider than 7 bits.
    pub fn validate(&self) -> Result<BitRate, ConfigurationError> {
        if let Some(address) = self.own_address {
            if address > MAX_ADDRESS {
                return Err(ConfigurationError::InvalidAddress);
            }
        }
        self.bit_rate()
    }
}

pub struct I2cConfigBuilder {
    bus_frequency: HertzU32,
    cpu_clock: HertzU32,
    own_address: Option<u8>,
    general_call: bool,
    timeout_us: Option<u32>,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus_frequency: I2cSpeed::Standard.frequency(),
            cpu_clock: 8.MHz(),
            own_address: None,
            general_call: false,
            timeout_us: None,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.bus_frequency = speed.frequency();
        self
    }
    #[must_use]
    pub fn bus_frequency(mut self, frequency: HertzU32) -> Self {
        self.bus_frequency = frequency;
        self
    }
    #[must_use]
    pub fn cpu_clock(mut self, clock: HertzU32) -> Self {
        self.cpu_clock = clock;
        self
    }
    #[must_use]
    pub fn own_address(mut self, address: u8) -> Self {
        self.own_address = Some(address);
        self
    }
    #[must_use]
    pub fn general_call(mut self, enabled: bool) -> Self {
        self.general_call = enabled;
        self
    }
    /// Override the wait budget. Without this the budget follows
    /// [`default_timeout_us`] for the configured bus frequency; a fixed value
    /// shorter than a full transfer at that frequency makes long transfers
    /// fail with `Timeout`.
    #[must_use]
    pub fn timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeout_us = Some(timeout_us);
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            bus_frequency: self.bus_frequency,
            cpu_clock: self.cpu_clock,
            own_address: self.own_address,
            general_call: self.general_call,
            timeout_us: self
                .timeout_us
                .unwrap_or_else(|| default_timeout_us(self.bus_frequency)),
        }
    }
}
