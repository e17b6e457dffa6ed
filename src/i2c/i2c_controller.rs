// Licensed under the Apache-2.0 license

//! Foreground half of the driver: the blocking transaction API.
//!
//! Every call here prepares the shared [`BusContext`], kicks the bus with a
//! start condition and then spins until the interrupt handler brings the state
//! back to READY. Spinning is bounded by [`I2cConfig::timeout_us`]; on expiry the
//! bus is stopped and the call reports [`TransactionError::Timeout`].

use crate::common::{Logger, NoOpLogger};
use crate::i2c::buffer::BufferFull;
use crate::i2c::common::{ConfigurationError, I2cConfig, BUFFER_LENGTH, MAX_ADDRESS};
use crate::i2c::error::TransactionError;
use crate::i2c::state_machine::{BusContext, BusState};
use crate::i2c::traits::{Control, TwiHardware};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct I2cController<'a, H: TwiHardware, D: DelayNs, L: Logger = NoOpLogger> {
    context: &'a BusContext,
    hardware: &'a H,
    delay: D,
    pub config: I2cConfig,
    pub logger: L,
    target: Option<u8>,
    overflowed: bool,
    rx: heapless::Vec<u8, BUFFER_LENGTH>,
    rx_index: usize,
}

impl<'a, H: TwiHardware, D: DelayNs> I2cController<'a, H, D, NoOpLogger> {
    pub fn new(context: &'a BusContext, hardware: &'a H, delay: D, config: I2cConfig) -> Self {
        Self::with_logger(context, hardware, delay, config, NoOpLogger)
    }
}

impl<'a, H: TwiHardware, D: DelayNs, L: Logger> I2cController<'a, H, D, L> {
    pub fn with_logger(
        context: &'a BusContext,
        hardware: &'a H,
        delay: D,
        config: I2cConfig,
        logger: L,
    ) -> Self {
        Self {
            context,
            hardware,
            delay,
            config,
            logger,
            target: None,
            overflowed: false,
            rx: heapless::Vec::new(),
            rx_index: 0,
        }
    }

    /// Reset the shared state, program the bit rate and own address, and
    /// enable the peripheral with its interrupt.
    ///
    /// # Errors
    ///
    /// Returns the configuration problem if the bit rate or own address cannot
    /// be programmed. The hardware is left untouched in that case.
    pub fn start_bus(&mut self) -> Result<(), ConfigurationError> {
        let bit_rate = self.config.validate()?;
        self.context.reset();
        self.rx.clear();
        self.rx_index = 0;
        self.hardware.configure(bit_rate);
        if let Some(address) = self.config.own_address {
            self.hardware
                .set_own_address(address, self.config.general_call);
        }
        self.hardware.enable();
        self.logger.debug(format_args!(
            "i2c: bus started, divisor={} prescaler={} scl={}Hz",
            bit_rate.divisor,
            bit_rate.prescaler.factor(),
            bit_rate.scl_frequency(self.config.cpu_clock).to_Hz()
        ));
        Ok(())
    }

    /// Wait for the bus to become idle, then start staging a write to `address`.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for addresses wider than 7 bits, `Timeout` if a
    /// previous transaction never finished.
    pub fn begin_write(&mut self, address: SevenBitAddress) -> Result<(), TransactionError> {
        self.target = None;
        self.check_address(address)?;
        self.spin(|ctx| (ctx.state() == BusState::Ready).then_some(()))?;
        self.context.master().reset();
        self.target = Some(address);
        self.overflowed = false;
        Ok(())
    }

    /// Stage one byte. Bytes beyond buffer capacity are dropped.
    ///
    /// # Errors
    ///
    /// `BufferFull` when the byte was dropped; also latches [`Self::overflowed`].
    pub fn queue_byte(&mut self, byte: u8) -> Result<(), BufferFull> {
        let result = self.context.master().write(byte);
        if result.is_err() {
            self.overflowed = true;
        }
        result
    }

    /// Stage several bytes; returns how many fit.
    pub fn queue_bytes(&mut self, bytes: &[u8]) -> usize {
        bytes
            .iter()
            .take_while(|&&byte| self.queue_byte(byte).is_ok())
            .count()
    }

    /// Whether a byte was dropped since the last [`Self::begin_write`].
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Send the staged bytes.
    ///
    /// With `wait` the call blocks until the transaction finished and returns
    /// its outcome. Without it the call returns `Ok(())` as soon as the start
    /// condition is requested; the outcome can be collected later through
    /// [`Self::poll_transaction`].
    ///
    /// # Errors
    ///
    /// Whatever the interrupt handler latched, or `Timeout`. `InvalidAddress`
    /// without bus activity when the preceding [`Self::begin_write`] failed.
    pub fn end_write(&mut self, wait: bool) -> Result<(), TransactionError> {
        let Some(target) = self.target else {
            return Err(TransactionError::InvalidAddress);
        };
        self.spin(|ctx| {
            ctx.arm(BusState::MasterTransmit, target, 0)
                .then_some(())
        })?;
        self.hardware.signal(Control::Start);
        if !wait {
            return Ok(());
        }
        let result = self.wait_complete();
        if let Err(error) = result {
            self.logger
                .error(format_args!("i2c: write to 0x{target:02x} failed: {error}"));
        }
        result
    }

    /// Read up to `count` bytes from `address` into the receive buffer.
    ///
    /// `count` is clamped to buffer capacity. Returns the number of bytes
    /// captured, which falls short only when the transfer failed; the reason is
    /// available from [`Self::last_error`]. Addresses wider than 7 bits capture
    /// nothing and never reach the bus.
    pub fn request_read(&mut self, address: SevenBitAddress, count: usize) -> usize {
        let count = count.min(BUFFER_LENGTH);
        self.rx.clear();
        self.rx_index = 0;
        if count == 0 || self.check_address(address).is_err() {
            return 0;
        }
        if self
            .spin(|ctx| ctx.arm(BusState::MasterReceive, address, count).then_some(()))
            .is_err()
        {
            return 0;
        }
        self.context.master().reset();
        self.hardware.signal(Control::Start);
        match self.wait_complete() {
            Ok(()) => {}
            Err(TransactionError::Timeout) => return 0,
            Err(error) => self
                .logger
                .error(format_args!("i2c: read from 0x{address:02x} failed: {error}")),
        }
        self.rx = self
            .context
            .master()
            .snapshot()
            .into_iter()
            .take(count)
            .collect();
        self.rx.len()
    }

    /// Bytes of the last [`Self::request_read`] not yet taken.
    #[must_use]
    pub fn available(&self) -> usize {
        self.rx.len().saturating_sub(self.rx_index)
    }

    /// Next received byte, `0` once drained.
    pub fn next_byte(&mut self) -> u8 {
        match self.rx.get(self.rx_index) {
            Some(&byte) => {
                self.rx_index += 1;
                byte
            }
            None => 0,
        }
    }

    /// Completion check for a transaction started with `end_write(false)`.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while the bus is busy, otherwise the latched error.
    pub fn poll_transaction(&self) -> nb::Result<(), TransactionError> {
        poll(self.context)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<TransactionError> {
        self.context.last_error()
    }

    #[must_use]
    pub fn state(&self) -> BusState {
        self.context.state()
    }

    fn check_address(&mut self, address: SevenBitAddress) -> Result<(), TransactionError> {
        if address > MAX_ADDRESS {
            self.logger.error(format_args!(
                "i2c: address 0x{address:02x} does not fit in 7 bits"
            ));
            return Err(TransactionError::InvalidAddress);
        }
        Ok(())
    }

    fn wait_complete(&mut self) -> Result<(), TransactionError> {
        self.spin(|ctx| match poll(ctx) {
            Ok(()) => Some(Ok(())),
            Err(nb::Error::Other(error)) => Some(Err(error)),
            Err(nb::Error::WouldBlock) => None,
        })?
    }

    fn spin<T>(
        &mut self,
        mut ready: impl FnMut(&BusContext) -> Option<T>,
    ) -> Result<T, TransactionError> {
        let mut waited_us: u32 = 0;
        loop {
            if let Some(value) = ready(self.context) {
                return Ok(value);
            }
            if waited_us >= self.config.timeout_us {
                return Err(self.recover());
            }
            self.delay.delay_us(1);
            waited_us += 1;
        }
    }

    fn recover(&mut self) -> TransactionError {
        self.logger.error(format_args!(
            "i2c: no progress in {}us (state {:?}), forcing stop",
            self.config.timeout_us,
            self.context.state()
        ));
        self.hardware.signal(Control::Stop);
        self.context.abort(TransactionError::Timeout);
        TransactionError::Timeout
    }
}

fn poll(context: &BusContext) -> nb::Result<(), TransactionError> {
    if context.state() != BusState::Ready {
        return Err(nb::Error::WouldBlock);
    }
    match context.last_error() {
        Some(error) => Err(nb::Error::Other(error)),
        None => Ok(()),
    }
}

impl<H: TwiHardware, D: DelayNs, L: Logger> embedded_hal::i2c::ErrorType
    for I2cController<'_, H, D, L>
{
    type Error = TransactionError;
}

/// Each call frames its own start/stop; `write_read` and `transaction` issue a
/// stop between operations rather than a repeated start.
impl<H: TwiHardware, D: DelayNs, L: Logger> embedded_hal::i2c::I2c
    for I2cController<'_, H, D, L>
{
    fn read(&mut self, address: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        if buffer.len() > BUFFER_LENGTH {
            return Err(TransactionError::LengthTooLong);
        }
        self.check_address(address)?;
        let count = self.request_read(address, buffer.len());
        if count < buffer.len() {
            return Err(self
                .context
                .last_error()
                .unwrap_or(TransactionError::DataNack));
        }
        for slot in buffer.iter_mut() {
            *slot = self.next_byte();
        }
        Ok(())
    }

    fn write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        if bytes.len() > BUFFER_LENGTH {
            return Err(TransactionError::LengthTooLong);
        }
        self.begin_write(address)?;
        self.queue_bytes(bytes);
        self.end_write(true)
    }

    fn write_read(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write(address, bytes)?;
        self.read(address, buffer)
    }

    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Read(buffer) => self.read(address, buffer)?,
                Operation::Write(bytes) => self.write(address, bytes)?,
            }
        }
        Ok(())
    }
}
