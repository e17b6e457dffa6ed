// Licensed under the Apache-2.0 license

//! Two-wire interface status codes and their decoding into bus events.
//!
//! The hardware reports one status code per framing step, in the upper five
//! bits of the status register. The low bits carry the prescaler and are
//! masked off before decoding.

pub const STATUS_MASK: u8 = 0xf8;

// All master
pub const START: u8 = 0x08;
pub const REP_START: u8 = 0x10;
pub const ARB_LOST: u8 = 0x38;

// Master transmitter
pub const MT_SLA_ACK: u8 = 0x18;
pub const MT_SLA_NACK: u8 = 0x20;
pub const MT_DATA_ACK: u8 = 0x28;
pub const MT_DATA_NACK: u8 = 0x30;

// Master receiver
pub const MR_SLA_ACK: u8 = 0x40;
pub const MR_SLA_NACK: u8 = 0x48;
pub const MR_DATA_ACK: u8 = 0x50;
pub const MR_DATA_NACK: u8 = 0x58;

// Slave receiver
pub const SR_SLA_ACK: u8 = 0x60;
pub const SR_ARB_LOST_SLA_ACK: u8 = 0x68;
pub const SR_GCALL_ACK: u8 = 0x70;
pub const SR_ARB_LOST_GCALL_ACK: u8 = 0x78;
pub const SR_DATA_ACK: u8 = 0x80;
pub const SR_DATA_NACK: u8 = 0x88;
pub const SR_GCALL_DATA_ACK: u8 = 0x90;
pub const SR_GCALL_DATA_NACK: u8 = 0x98;
pub const SR_STOP: u8 = 0xa0;

// Slave transmitter
pub const ST_SLA_ACK: u8 = 0xa8;
pub const ST_ARB_LOST_SLA_ACK: u8 = 0xb0;
pub const ST_DATA_ACK: u8 = 0xb8;
pub const ST_DATA_NACK: u8 = 0xc0;
pub const ST_LAST_DATA: u8 = 0xc8;

// Miscellaneous
pub const NO_INFO: u8 = 0xf8;
pub const BUS_ERROR: u8 = 0x00;

/// One hardware-reported framing step.
///
/// Events that complete a byte reception carry the byte read from the data
/// register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    StartSent,
    ArbitrationLost,
    MtAddressAck,
    MtAddressNack,
    MtDataAck,
    MtDataNack,
    MrAddressAck,
    MrAddressNack,
    MrDataAck(u8),
    MrDataNack(u8),
    SrAddressed { arbitration_lost: bool },
    SrDataAck(u8),
    SrDataNack,
    SrStop,
    StAddressed { arbitration_lost: bool },
    StDataAck,
    StDataNack,
    StLastData,
    NoInfo,
    BusError,
}

impl BusEvent {
    /// Decode a raw status register value. `data` is the current data register
    /// contents and is only kept for the receive events.
    #[must_use]
    pub fn decode(status: u8, data: u8) -> Option<Self> {
        let event = match status & STATUS_MASK {
            START | REP_START => BusEvent::StartSent,
            ARB_LOST => BusEvent::ArbitrationLost,
            MT_SLA_ACK => BusEvent::MtAddressAck,
            MT_SLA_NACK => BusEvent::MtAddressNack,
            MT_DATA_ACK => BusEvent::MtDataAck,
            MT_DATA_NACK => BusEvent::MtDataNack,
            MR_SLA_ACK => BusEvent::MrAddressAck,
            MR_SLA_NACK => BusEvent::MrAddressNack,
            MR_DATA_ACK => BusEvent::MrDataAck(data),
            MR_DATA_NACK => BusEvent::MrDataNack(data),
            SR_SLA_ACK | SR_GCALL_ACK => BusEvent::SrAddressed {
                arbitration_lost: false,
            },
            SR_ARB_LOST_SLA_ACK | SR_ARB_LOST_GCALL_ACK => BusEvent::SrAddressed {
                arbitration_lost: true,
            },
            SR_DATA_ACK | SR_GCALL_DATA_ACK => BusEvent::SrDataAck(data),
            SR_DATA_NACK | SR_GCALL_DATA_NACK => BusEvent::SrDataNack,
            SR_STOP => BusEvent::SrStop,
            ST_SLA_ACK => BusEvent::StAddressed {
                arbitration_lost: false,
            },
            ST_ARB_LOST_SLA_ACK => BusEvent::StAddressed {
                arbitration_lost: true,
            },
            ST_DATA_ACK => BusEvent::StDataAck,
            ST_DATA_NACK => BusEvent::StDataNack,
            ST_LAST_DATA => BusEvent::StLastData,
            NO_INFO => BusEvent::NoInfo,
            BUS_ERROR => BusEvent::BusError,
            _ => return None,
        };
        Some(event)
    }
}
