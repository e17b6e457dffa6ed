// Licensed under the Apache-2.0 license

use core::fmt;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Why a master transaction did not complete.
///
/// The bus is back in READY whenever one of these is reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionError {
    /// The peer did not acknowledge its address.
    AddressNack,
    /// The peer rejected a data byte mid-transfer.
    DataNack,
    /// Another master won the bus.
    ArbitrationLost,
    /// Illegal start/stop sequencing was observed.
    BusError,
    /// Requested transfer exceeds buffer capacity; nothing went on the wire.
    LengthTooLong,
    /// The transaction did not finish within the configured wait budget.
    Timeout,
    /// Target address does not fit in 7 bits; nothing went on the wire.
    InvalidAddress,
}

impl TransactionError {
    // Zero is reserved for "no error" in the shared error cell.
    pub(crate) fn code(self) -> u8 {
        match self {
            TransactionError::AddressNack => 1,
            TransactionError::DataNack => 2,
            TransactionError::ArbitrationLost => 3,
            TransactionError::BusError => 4,
            TransactionError::LengthTooLong => 5,
            TransactionError::Timeout => 6,
            TransactionError::InvalidAddress => 7,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TransactionError::AddressNack),
            2 => Some(TransactionError::DataNack),
            3 => Some(TransactionError::ArbitrationLost),
            4 => Some(TransactionError::BusError),
            5 => Some(TransactionError::LengthTooLong),
            6 => Some(TransactionError::Timeout),
            7 => Some(TransactionError::InvalidAddress),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TransactionError::AddressNack => "address not acknowledged",
            TransactionError::DataNack => "data byte not acknowledged",
            TransactionError::ArbitrationLost => "bus arbitration lost",
            TransactionError::BusError => "bus error",
            TransactionError::LengthTooLong => "transfer longer than buffer",
            TransactionError::Timeout => "transaction timed out",
            TransactionError::InvalidAddress => "address out of 7-bit range",
        };
        f.write_str(text)
    }
}

impl embedded_hal::i2c::Error for TransactionError {
    fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            TransactionError::DataNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            TransactionError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            TransactionError::BusError => ErrorKind::Bus,
            TransactionError::LengthTooLong => ErrorKind::Overrun,
            TransactionError::Timeout | TransactionError::InvalidAddress => ErrorKind::Other,
        }
    }
}
