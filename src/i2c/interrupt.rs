// Licensed under the Apache-2.0 license

//! Interrupt-side half of the driver.
//!
//! Call [`I2cInterrupt::handle_interrupt`] from the peripheral's interrupt
//! vector. Each call services exactly one bus event and returns.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::state_machine::{BusContext, BusState, Transition};
use crate::i2c::status::BusEvent;
use crate::i2c::traits::{SlaveHandler, TwiHardware};

pub struct I2cInterrupt<'a, H: TwiHardware, S: SlaveHandler, L: Logger = NoOpLogger> {
    context: &'a BusContext,
    hardware: &'a H,
    slave: S,
    logger: L,
}

impl<'a, H: TwiHardware, S: SlaveHandler> I2cInterrupt<'a, H, S, NoOpLogger> {
    pub fn new(context: &'a BusContext, hardware: &'a H, slave: S) -> Self {
        Self::with_logger(context, hardware, slave, NoOpLogger)
    }
}

impl<'a, H: TwiHardware, S: SlaveHandler, L: Logger> I2cInterrupt<'a, H, S, L> {
    pub fn with_logger(context: &'a BusContext, hardware: &'a H, slave: S, logger: L) -> Self {
        Self {
            context,
            hardware,
            slave,
            logger,
        }
    }

    pub fn slave(&self) -> &S {
        &self.slave
    }

    pub fn slave_mut(&mut self) -> &mut S {
        &mut self.slave
    }

    /// Service one bus event.
    pub fn handle_interrupt(&mut self) {
        let status = self.hardware.status();
        let data = self.hardware.read_data();
        let Some(event) = BusEvent::decode(status, data) else {
            self.logger
                .debug(format_args!("i2c: ignoring status 0x{status:02x}"));
            return;
        };
        let state = self.context.state();
        let transition = self.context.step(state, event, &mut self.slave);
        self.apply(state, &transition);
    }

    // The new state is published last: once the foreground sees READY the
    // hardware has already been told to stop or release.
    fn apply(&mut self, from: BusState, transition: &Transition) {
        if let Some(byte) = transition.load {
            self.hardware.write_data(byte);
        }
        if let Some(control) = transition.control {
            self.hardware.signal(control);
        }
        if !self.context.commit(from, transition) {
            self.logger.debug(format_args!(
                "i2c: {:?} -> {:?} superseded by foreground",
                from, transition.next
            ));
        }
    }
}
