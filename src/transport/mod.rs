//! Polymorphic transport: one capability set `{open, close, tx, rx}` over
//! three concrete variants.

pub mod internal;
pub mod port;
pub mod spi;
pub mod uart;

pub use internal::InternalTransport;
pub use port::{NotSupportedPort, Port};
pub use spi::SpiTransport;
pub use uart::UartTransport;

use crate::error::Result;

/// A bound transport instance. The Engine is generic over any variant via
/// dynamic dispatch; a single known variant may instead be held directly by
/// callers who don't need the enum.
pub enum Transport {
    Spi(SpiTransport),
    Uart(UartTransport),
    Internal(InternalTransport),
}

impl Transport {
    pub fn is_open(&self) -> bool {
        match self {
            Self::Spi(t) => t.is_open(),
            Self::Uart(t) => t.is_open(),
            Self::Internal(t) => t.is_open(),
        }
    }

    pub fn open(&mut self) -> Result<()> {
        match self {
            Self::Spi(t) => t.open(),
            Self::Uart(t) => t.open(),
            Self::Internal(t) => t.open(),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match self {
            Self::Spi(t) => t.close(),
            Self::Uart(t) => t.close(),
            Self::Internal(t) => t.close(),
        }
    }

    pub fn tx(&mut self, data: &[u8], timeout_ms: u32) -> Result<()> {
        match self {
            Self::Spi(t) => t.tx(data, timeout_ms),
            Self::Uart(t) => t.tx(data, timeout_ms),
            Self::Internal(t) => t.tx(data, timeout_ms),
        }
    }

    pub fn rx(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        match self {
            Self::Spi(t) => t.rx(buf, timeout_ms),
            Self::Uart(t) => t.rx(buf, timeout_ms),
            Self::Internal(t) => t.rx(buf, timeout_ms),
        }
    }
}
