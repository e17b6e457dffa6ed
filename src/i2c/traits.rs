// Licensed under the Apache-2.0 license

//! # TWI Hardware Abstraction Traits
//!
//! This module defines the two seams the driver is built around:
//!
//! ```text
//! TwiHardware   (register-level access to the two-wire peripheral)
//! SlaveHandler  (application callbacks for the slave role)
//! ```
//!
//! The driver itself never touches registers directly. Everything it needs from
//! the peripheral goes through [`TwiHardware`], which keeps the protocol engine
//! testable on the host against simulated hardware.

use crate::i2c::common::{BitRate, BUFFER_LENGTH};

/// Bus signal requested when the interrupt flag is cleared.
///
/// Each variant corresponds to one write of the control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// Generate a start condition.
    Start,
    /// Continue; acknowledge the next received byte.
    Ack,
    /// Continue; do not acknowledge the next received byte.
    Nack,
    /// Generate a stop condition and give up bus ownership.
    Stop,
    /// Return to the unaddressed state without a stop condition.
    Release,
}

/// Register-level interface to a two-wire serial peripheral.
///
/// All methods take `&self`: the same peripheral is driven from the foreground
/// (start, configuration) and from the interrupt handler (everything else), and
/// register writes are single volatile stores on real hardware.
///
/// # Examples
///
/// ```rust,no_run
/// use twi_ddk::i2c::traits::{Control, TwiHardware};
///
/// fn kick<T: TwiHardware>(hw: &T, sla_w: u8) {
///     hw.signal(Control::Start);
///     // ...later, from the interrupt handler:
///     hw.write_data(sla_w);
///     hw.signal(Control::Ack);
/// }
/// ```
pub trait TwiHardware {
    /// Program the bit-rate divisor and prescaler.
    fn configure(&self, bit_rate: BitRate);

    /// Program the own slave address.
    ///
    /// # Arguments
    ///
    /// * `address` - 7-bit address this device answers to
    /// * `general_call` - Also answer to the general call address
    fn set_own_address(&self, address: u8, general_call: bool);

    /// Enable the peripheral, its interrupt and address acknowledgement.
    fn enable(&self);

    /// Raw status register value. The prescaler bits are not masked.
    fn status(&self) -> u8;

    /// Current data register contents.
    fn read_data(&self) -> u8;

    /// Load the data register for the next transmitted byte.
    fn write_data(&self, byte: u8);

    /// Clear the interrupt flag and request the given bus signal.
    ///
    /// Must not block. In particular, completion of a stop condition is not
    /// awaited here.
    fn signal(&self, control: Control);
}

/// Application side of the slave role.
///
/// Injected when the interrupt handler is created. Both callbacks run in
/// interrupt context and must return quickly.
pub trait SlaveHandler {
    /// A master finished writing to us. `data` is everything received since
    /// we were addressed, up to buffer capacity.
    fn on_receive(&mut self, data: &[u8]);

    /// A master wants to read from us. Returned bytes are shifted out in order;
    /// an empty response sends a single `0x00`.
    fn on_transmit_request(&mut self) -> heapless::Vec<u8, BUFFER_LENGTH>;
}

/// Slave handler for master-only systems.
///
/// Received data is discarded and read requests are answered with `0x00`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSlaveHandler;

impl SlaveHandler for NoSlaveHandler {
    fn on_receive(&mut self, _data: &[u8]) {}

    fn on_transmit_request(&mut self) -> heapless::Vec<u8, BUFFER_LENGTH> {
        heapless::Vec::new()
    }
}
