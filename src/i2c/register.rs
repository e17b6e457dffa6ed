// Licensed under the Apache-2.0 license

//! Single-register access to a peripheral behind the bus, in the style of a
//! real-time clock: write the register index, then read one byte back.

use crate::common::Logger;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::traits::TwiHardware;
use embedded_hal::delay::DelayNs;

/// Address of the on-board real-time clock.
pub const RTC_ADDRESS: u8 = 0x6f;

pub struct RegisterDevice<'c, 'a, H: TwiHardware, D: DelayNs, L: Logger> {
    bus: &'c mut I2cController<'a, H, D, L>,
    address: u8,
}

impl<'c, 'a, H: TwiHardware, D: DelayNs, L: Logger> RegisterDevice<'c, 'a, H, D, L> {
    pub fn new(bus: &'c mut I2cController<'a, H, D, L>, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn rtc(bus: &'c mut I2cController<'a, H, D, L>) -> Self {
        Self::new(bus, RTC_ADDRESS)
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Read one register. A failed transfer reads as `0`.
    pub fn read_register(&mut self, register: u8) -> u8 {
        if self.bus.begin_write(self.address).is_err() {
            return 0;
        }
        let _ = self.bus.queue_byte(register);
        // A failed pointer write shows up again as a short read below.
        let _ = self.bus.end_write(true);
        if self.bus.request_read(self.address, 1) == 0 {
            return 0;
        }
        self.bus.next_byte()
    }

    /// Write one register. The outcome is not reported; the controller logs
    /// failures and keeps the error in `last_error`.
    pub fn write_register(&mut self, register: u8, value: u8) {
        if self.bus.begin_write(self.address).is_err() {
            return;
        }
        let _ = self.bus.queue_byte(register);
        let _ = self.bus.queue_byte(value);
        let _ = self.bus.end_write(true);
    }
}
