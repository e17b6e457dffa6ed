// Licensed under the Apache-2.0 license

//! Bus protocol engine.
//!
//! [`BusContext`] holds everything shared between the interrupt handler and
//! the foreground: the bus state, the latched error, the assembled address byte
//! and the three buffers. [`BusContext::step`] is the transition function: given
//! the current state and one decoded hardware event it updates the buffers and
//! returns the [`Transition`] to apply to the hardware. It never blocks and never
//! touches registers, so it can be driven with synthetic events.
//!
//! State and latched error share one atomic word (state in the low nibble,
//! error code in the high nibble) so they are always published together.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::i2c::buffer::ByteBuffer;
use crate::i2c::common::BUFFER_LENGTH;
use crate::i2c::error::TransactionError;
use crate::i2c::status::BusEvent;
use crate::i2c::traits::{Control, SlaveHandler};

const STATE_MASK: u8 = 0x0f;
const ERROR_SHIFT: u8 = 4;

fn pack(state: BusState, error: u8) -> u8 {
    (error << ERROR_SHIFT) | state as u8
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BusState {
    Ready = 0,
    MasterTransmit = 1,
    MasterReceive = 2,
    SlaveTransmit = 3,
    SlaveReceive = 4,
}

impl BusState {
    fn from_raw(raw: u8) -> Self {
        match raw & STATE_MASK {
            1 => BusState::MasterTransmit,
            2 => BusState::MasterReceive,
            3 => BusState::SlaveTransmit,
            4 => BusState::SlaveReceive,
            _ => BusState::Ready,
        }
    }

    #[must_use]
    pub fn is_master(self) -> bool {
        matches!(self, BusState::MasterTransmit | BusState::MasterReceive)
    }
}

/// Outcome of one bus event.
///
/// Applied in field order: `load` goes to the data register, `control` is
/// signalled, then `error` and `next` are published.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: BusState,
    pub load: Option<u8>,
    pub control: Option<Control>,
    pub error: Option<TransactionError>,
}

impl Transition {
    fn to(next: BusState) -> Self {
        Self {
            next,
            load: None,
            control: None,
            error: None,
        }
    }

    fn control(mut self, control: Control) -> Self {
        self.control = Some(control);
        self
    }

    fn load(mut self, byte: u8) -> Self {
        self.load = Some(byte);
        self
    }

    fn error(mut self, error: TransactionError) -> Self {
        self.error = Some(error);
        self
    }

    fn error_if(mut self, error: Option<TransactionError>) -> Self {
        self.error = error;
        self
    }

    fn finish(error: TransactionError, control: Control) -> Self {
        Self::to(BusState::Ready).control(control).error(error)
    }
}

/// Driver state shared by the interrupt handler and the foreground.
///
/// Meant to live in a `static`:
///
/// ```rust
/// use twi_ddk::i2c::state_machine::{BusContext, BusState};
///
/// static BUS: BusContext = BusContext::new();
/// assert_eq!(BUS.state(), BusState::Ready);
/// ```
pub struct BusContext {
    status: AtomicU8,
    sla_rw: AtomicU8,
    expected: AtomicUsize,
    master: ByteBuffer<BUFFER_LENGTH>,
    slave_rx: ByteBuffer<BUFFER_LENGTH>,
    slave_tx: ByteBuffer<BUFFER_LENGTH>,
}

impl Default for BusContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BusContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(BusState::Ready as u8),
            sla_rw: AtomicU8::new(0),
            expected: AtomicUsize::new(0),
            master: ByteBuffer::new(),
            slave_rx: ByteBuffer::new(),
            slave_tx: ByteBuffer::new(),
        }
    }

    /// Back to power-on state: READY, no error, all cursors zero.
    pub fn reset(&self) {
        self.master.reset();
        self.slave_rx.reset();
        self.slave_tx.reset();
        self.expected.store(0, Ordering::Relaxed);
        self.status
            .store(pack(BusState::Ready, 0), Ordering::Release);
    }

    #[must_use]
    pub fn state(&self) -> BusState {
        BusState::from_raw(self.status.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn last_error(&self) -> Option<TransactionError> {
        TransactionError::from_code(self.status.load(Ordering::Acquire) >> ERROR_SHIFT)
    }

    #[must_use]
    pub fn master(&self) -> &ByteBuffer<BUFFER_LENGTH> {
        &self.master
    }

    #[must_use]
    pub fn slave_rx(&self) -> &ByteBuffer<BUFFER_LENGTH> {
        &self.slave_rx
    }

    #[must_use]
    pub fn slave_tx(&self) -> &ByteBuffer<BUFFER_LENGTH> {
        &self.slave_tx
    }

    /// Address byte (7-bit address plus direction bit) of the current transaction.
    #[must_use]
    pub fn sla_rw(&self) -> u8 {
        self.sla_rw.load(Ordering::Acquire)
    }

    /// Claim the bus for a master transaction.
    ///
    /// Fails without side effects unless the bus is READY. On success the error
    /// is cleared and the address byte is latched; the caller must then signal a
    /// start condition.
    pub(crate) fn arm(&self, next: BusState, address: u8, expected: usize) -> bool {
        let current = self.status.load(Ordering::Acquire);
        if BusState::from_raw(current) != BusState::Ready
            || self
                .status
                .compare_exchange(current, pack(next, 0), Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return false;
        }
        let read = next == BusState::MasterReceive;
        self.sla_rw
            .store((address << 1) | u8::from(read), Ordering::Release);
        self.expected.store(expected, Ordering::Release);
        true
    }

    /// Publish the error and state of a transition computed in state `from`.
    ///
    /// Returns `false` without publishing anything if the state moved away from
    /// `from` in the meantime, e.g. because the foreground aborted.
    pub(crate) fn commit(&self, from: BusState, transition: &Transition) -> bool {
        let current = self.status.load(Ordering::Acquire);
        if BusState::from_raw(current) != from {
            return false;
        }
        let error = transition
            .error
            .map_or(current >> ERROR_SHIFT, TransactionError::code);
        self.status
            .compare_exchange(
                current,
                pack(transition.next, error),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Abandon whatever is in flight and return to READY with `error` latched.
    pub(crate) fn abort(&self, error: TransactionError) {
        self.status
            .store(pack(BusState::Ready, error.code()), Ordering::Release);
    }

    /// Compute the transition for `event` observed in `state`.
    ///
    /// Buffer cursors are advanced as a side effect; the returned transition
    /// still has to be committed.
    pub fn step<S: SlaveHandler>(
        &self,
        state: BusState,
        event: BusEvent,
        slave: &mut S,
    ) -> Transition {
        match event {
            BusEvent::StartSent => Transition::to(state)
                .load(self.sla_rw())
                .control(Control::Ack),

            // Master transmitter
            BusEvent::MtAddressAck | BusEvent::MtDataAck => {
                if self.master.remaining() > 0 {
                    Transition::to(state)
                        .load(self.master.read())
                        .control(Control::Ack)
                } else {
                    Transition::to(BusState::Ready).control(Control::Stop)
                }
            }
            BusEvent::MtAddressNack => {
                Transition::finish(TransactionError::AddressNack, Control::Stop)
            }
            BusEvent::MtDataNack => Transition::finish(TransactionError::DataNack, Control::Stop),
            BusEvent::ArbitrationLost => {
                Transition::finish(TransactionError::ArbitrationLost, Control::Release)
            }

            // Master receiver
            BusEvent::MrDataAck(byte) => {
                let _ = self.master.write(byte);
                Transition::to(state).control(self.next_read_reply())
            }
            BusEvent::MrAddressAck => Transition::to(state).control(self.next_read_reply()),
            BusEvent::MrDataNack(byte) => {
                let _ = self.master.write(byte);
                Transition::to(BusState::Ready).control(Control::Stop)
            }
            BusEvent::MrAddressNack => {
                Transition::finish(TransactionError::AddressNack, Control::Stop)
            }

            // Slave receiver
            BusEvent::SrAddressed { arbitration_lost } => {
                self.slave_rx.reset();
                Transition::to(BusState::SlaveReceive)
                    .control(Control::Ack)
                    .error_if(lost_master(state, arbitration_lost))
            }
            BusEvent::SrDataAck(byte) => {
                let reply = if self.slave_rx.write(byte).is_ok() {
                    Control::Ack
                } else {
                    Control::Nack
                };
                Transition::to(state).control(reply)
            }
            BusEvent::SrDataNack => Transition::to(state).control(Control::Nack),
            BusEvent::SrStop => {
                let received = self.slave_rx.snapshot();
                slave.on_receive(&received);
                self.slave_rx.reset();
                Transition::to(BusState::Ready).control(Control::Release)
            }

            // Slave transmitter
            BusEvent::StAddressed { arbitration_lost } => {
                self.slave_tx.reset();
                for byte in slave.on_transmit_request() {
                    let _ = self.slave_tx.write(byte);
                }
                if self.slave_tx.is_empty() {
                    let _ = self.slave_tx.write(0x00);
                }
                self.transmit_next()
                    .error_if(lost_master(state, arbitration_lost))
            }
            BusEvent::StDataAck => self.transmit_next(),
            BusEvent::StDataNack | BusEvent::StLastData => {
                Transition::to(BusState::Ready).control(Control::Release)
            }

            BusEvent::NoInfo => Transition::to(state),
            BusEvent::BusError => Transition::finish(TransactionError::BusError, Control::Stop),
        }
    }

    // The ack bit for a received byte goes out together with that byte, so the
    // reply for byte N is chosen while handling byte N-1.
    fn next_read_reply(&self) -> Control {
        let expected = self.expected.load(Ordering::Acquire);
        if self.master.len() + 1 < expected {
            Control::Ack
        } else {
            Control::Nack
        }
    }

    fn transmit_next(&self) -> Transition {
        let byte = self.slave_tx.read();
        let reply = if self.slave_tx.remaining() > 0 {
            Control::Ack
        } else {
            Control::Nack
        };
        Transition::to(BusState::SlaveTransmit)
            .load(byte)
            .control(reply)
    }
}

fn lost_master(state: BusState, arbitration_lost: bool) -> Option<TransactionError> {
    (arbitration_lost && state.is_master()).then_some(TransactionError::ArbitrationLost)
}
