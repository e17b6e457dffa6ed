// Licensed under the Apache-2.0 license

//! Host-side stand-ins for the two-wire peripheral, used by the unit tests.
//!
//! - [`ScriptedBus`]: the test sets the status and data registers by hand and
//!   inspects what the driver loaded and signalled.
//! - [`SimBus`]: a simulated peripheral with one attached peer device. Every
//!   control write advances the simulated bus and raises the interrupt flag,
//!   which [`with_interrupts`] services on a second thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::i2c::common::BitRate;
use crate::i2c::interrupt::I2cInterrupt;
use crate::i2c::state_machine::BusContext;
use crate::i2c::status;
use crate::i2c::traits::{Control, SlaveHandler, TwiHardware};

#[derive(Default)]
struct Script {
    status: u8,
    data: u8,
    loaded: Vec<u8>,
    controls: Vec<Control>,
}

pub struct ScriptedBus {
    script: RefCell<Script>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self {
            script: RefCell::new(Script {
                status: status::NO_INFO,
                ..Default::default()
            }),
        }
    }

    pub fn set_status(&self, status: u8) {
        self.script.borrow_mut().status = status;
    }

    pub fn set_data(&self, data: u8) {
        self.script.borrow_mut().data = data;
    }

    pub fn loaded(&self) -> Vec<u8> {
        self.script.borrow().loaded.clone()
    }

    pub fn controls(&self) -> Vec<Control> {
        self.script.borrow().controls.clone()
    }
}

impl TwiHardware for ScriptedBus {
    fn configure(&self, _bit_rate: BitRate) {}

    fn set_own_address(&self, _address: u8, _general_call: bool) {}

    fn enable(&self) {}

    fn status(&self) -> u8 {
        self.script.borrow().status
    }

    fn read_data(&self) -> u8 {
        self.script.borrow().data
    }

    fn write_data(&self, byte: u8) {
        let mut script = self.script.borrow_mut();
        script.data = byte;
        script.loaded.push(byte);
    }

    fn signal(&self, control: Control) {
        self.script.borrow_mut().controls.push(control);
    }
}

/// Device model attached to the simulated bus.
pub trait Peer: Send {
    /// Addressed by the master; `read` is the direction bit.
    fn start(&mut self, _read: bool) {}
    /// Master wrote a byte. Return whether it is acknowledged.
    fn receive(&mut self, byte: u8) -> bool;
    /// Master clocks a byte out of the peer.
    fn transmit(&mut self) -> u8;
    fn stop(&mut self) {}
}

/// Register file with an auto-incrementing register pointer: the first byte of
/// a write selects the register, following bytes are stored from there on.
#[derive(Default)]
pub struct RegisterPeer {
    pub registers: HashMap<u8, u8>,
    pointer: u8,
    pointer_pending: bool,
}

impl Peer for RegisterPeer {
    fn start(&mut self, read: bool) {
        self.pointer_pending = !read;
    }

    fn receive(&mut self, byte: u8) -> bool {
        if self.pointer_pending {
            self.pointer = byte;
            self.pointer_pending = false;
        } else {
            self.registers.insert(self.pointer, byte);
            self.pointer = self.pointer.wrapping_add(1);
        }
        true
    }

    fn transmit(&mut self) -> u8 {
        let value = self.registers.get(&self.pointer).copied().unwrap_or(0);
        self.pointer = self.pointer.wrapping_add(1);
        value
    }
}

/// Records written bytes; rejects everything after `accept` bytes.
pub struct RecordingPeer {
    pub written: Vec<u8>,
    pub accept: usize,
}

impl RecordingPeer {
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            accept: usize::MAX,
        }
    }
}

impl Peer for RecordingPeer {
    fn receive(&mut self, byte: u8) -> bool {
        self.written.push(byte);
        self.written.len() < self.accept
    }

    fn transmit(&mut self) -> u8 {
        0xff
    }
}

/// Supplies a fixed byte stream to reads.
pub struct StreamPeer {
    bytes: Vec<u8>,
    position: usize,
}

impl StreamPeer {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            position: 0,
        }
    }
}

impl Peer for StreamPeer {
    fn receive(&mut self, _byte: u8) -> bool {
        true
    }

    fn transmit(&mut self) -> u8 {
        let byte = self.bytes.get(self.position).copied().unwrap_or(0xff);
        self.position += 1;
        byte
    }
}

struct SimState<P> {
    status: u8,
    data: u8,
    enabled: bool,
    bit_rate: Option<BitRate>,
    own_address: Option<(u8, bool)>,
    peer: P,
    peer_address: u8,
    owns_bus: bool,
    controls: Vec<Control>,
    master_acks: Vec<bool>,
    bytes_sent: usize,
    lose_arbitration_at: Option<usize>,
    unresponsive: bool,
}

pub struct SimBus<P: Peer> {
    state: Mutex<SimState<P>>,
    interrupt: AtomicBool,
}

impl<P: Peer> SimBus<P> {
    pub fn new(peer_address: u8, peer: P) -> Self {
        Self {
            state: Mutex::new(SimState {
                status: status::NO_INFO,
                data: 0,
                enabled: false,
                bit_rate: None,
                own_address: None,
                peer,
                peer_address,
                owns_bus: false,
                controls: Vec::new(),
                master_acks: Vec::new(),
                bytes_sent: 0,
                lose_arbitration_at: None,
                unresponsive: false,
            }),
            interrupt: AtomicBool::new(false),
        }
    }

    /// Report arbitration loss instead of transferring data byte `index`, in
    /// either direction.
    pub fn lose_arbitration_at(self, index: usize) -> Self {
        self.lock().lose_arbitration_at = Some(index);
        self
    }

    /// Swallow the start condition: no interrupt ever follows.
    pub fn unresponsive(self) -> Self {
        self.lock().unresponsive = true;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState<P>> {
        self.state.lock().unwrap()
    }

    pub fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::AcqRel)
    }

    pub fn controls(&self) -> Vec<Control> {
        self.lock().controls.clone()
    }

    /// Ack bits the master sent after each byte it received.
    pub fn master_acks(&self) -> Vec<bool> {
        self.lock().master_acks.clone()
    }

    pub fn owns_bus(&self) -> bool {
        self.lock().owns_bus
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn bit_rate(&self) -> Option<BitRate> {
        self.lock().bit_rate
    }

    pub fn own_address(&self) -> Option<(u8, bool)> {
        self.lock().own_address
    }

    pub fn with_peer<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        f(&mut self.lock().peer)
    }

    fn raise(&self, state: &mut SimState<P>, status: u8) {
        state.status = status;
        self.interrupt.store(true, Ordering::Release);
    }

    fn advance(&self, state: &mut SimState<P>, control: Control) {
        match state.status {
            status::START | status::REP_START => {
                let read = state.data & 1 != 0;
                let addressed = state.data >> 1 == state.peer_address;
                if addressed {
                    state.peer.start(read);
                }
                let next = match (read, addressed) {
                    (false, true) => status::MT_SLA_ACK,
                    (false, false) => status::MT_SLA_NACK,
                    (true, true) => status::MR_SLA_ACK,
                    (true, false) => status::MR_SLA_NACK,
                };
                self.raise(state, next);
            }
            status::MT_SLA_ACK | status::MT_DATA_ACK => {
                if state.lose_arbitration_at == Some(state.bytes_sent) {
                    state.owns_bus = false;
                    self.raise(state, status::ARB_LOST);
                    return;
                }
                let byte = state.data;
                let acked = state.peer.receive(byte);
                state.bytes_sent += 1;
                self.raise(
                    state,
                    if acked {
                        status::MT_DATA_ACK
                    } else {
                        status::MT_DATA_NACK
                    },
                );
            }
            status::MR_SLA_ACK | status::MR_DATA_ACK => {
                if state.lose_arbitration_at == Some(state.bytes_sent) {
                    state.owns_bus = false;
                    self.raise(state, status::ARB_LOST);
                    return;
                }
                let ack = control == Control::Ack;
                state.master_acks.push(ack);
                state.data = state.peer.transmit();
                state.bytes_sent += 1;
                self.raise(
                    state,
                    if ack {
                        status::MR_DATA_ACK
                    } else {
                        status::MR_DATA_NACK
                    },
                );
            }
            _ => {}
        }
    }
}

impl<P: Peer> TwiHardware for SimBus<P> {
    fn configure(&self, bit_rate: BitRate) {
        self.lock().bit_rate = Some(bit_rate);
    }

    fn set_own_address(&self, address: u8, general_call: bool) {
        self.lock().own_address = Some((address, general_call));
    }

    fn enable(&self) {
        self.lock().enabled = true;
    }

    fn status(&self) -> u8 {
        self.lock().status
    }

    fn read_data(&self) -> u8 {
        self.lock().data
    }

    fn write_data(&self, byte: u8) {
        self.lock().data = byte;
    }

    fn signal(&self, control: Control) {
        let mut state = self.lock();
        state.controls.push(control);
        match control {
            Control::Start => {
                if state.unresponsive {
                    return;
                }
                state.owns_bus = true;
                state.bytes_sent = 0;
                self.raise(&mut state, status::START);
            }
            Control::Stop => {
                state.owns_bus = false;
                state.peer.stop();
                state.status = status::NO_INFO;
            }
            Control::Release => {
                state.owns_bus = false;
                state.status = status::NO_INFO;
            }
            Control::Ack | Control::Nack => self.advance(&mut state, control),
        }
    }
}

/// `DelayNs` backed by the host scheduler.
#[derive(Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Run `f` while a second thread services the simulated interrupt flag.
pub fn with_interrupts<P, S, R>(
    context: &BusContext,
    bus: &SimBus<P>,
    slave: S,
    f: impl FnOnce() -> R,
) -> R
where
    P: Peer,
    S: SlaveHandler + Send,
{
    let done = AtomicBool::new(false);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            let mut isr = I2cInterrupt::new(context, bus, slave);
            while !done.load(Ordering::Acquire) {
                if bus.take_interrupt() {
                    isr.handle_interrupt();
                } else {
                    std::thread::yield_now();
                }
            }
        });
        let result = f();
        done.store(true, Ordering::Release);
        result
    })
}
