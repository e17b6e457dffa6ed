// Licensed under the Apache-2.0 license

//! Interrupt-driven two-wire bus driver.
//!
//! The driver is split in two halves sharing one [`BusContext`]:
//! [`I2cController`] runs in the foreground and starts transactions,
//! [`I2cInterrupt`] runs from the peripheral interrupt and walks the bus
//! protocol one status code at a time. Register access goes through
//! [`TwiHardware`], so the same code runs against a simulated peripheral in
//! tests.

pub mod buffer;
pub mod common;
pub mod error;
pub mod i2c_controller;
pub mod interrupt;
pub mod register;
pub mod state_machine;
pub mod status;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use common::{I2cConfig, I2cConfigBuilder, I2cSpeed, BUFFER_LENGTH};
pub use error::TransactionError;
pub use i2c_controller::I2cController;
pub use interrupt::I2cInterrupt;
pub use register::{RegisterDevice, RTC_ADDRESS};
pub use state_machine::{BusContext, BusState};
pub use traits::{Control, NoSlaveHandler, SlaveHandler, TwiHardware};
