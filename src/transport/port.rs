//! The thin hardware-touching seam behind the SPI/UART transport variants.
//!
//! The original source links these against weak symbols so the firmware
//! compiles without hardware present. Re-expressed here as an explicit
//! trait: each transport variant is constructed with a boxed `Port`, and
//! [`NotSupportedPort`] reproduces the weak-symbol default (open/tx fail
//! with `NotSupported`, rx behaves like a non-blocking `EAGAIN`).

use crate::error::{Error, Result};

pub trait Port: Send {
    fn open(&mut self, mtu: usize) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn tx(&mut self, data: &[u8], timeout_ms: u32) -> Result<()>;
    fn rx(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize>;
}

#[derive(Default)]
pub struct NotSupportedPort;

impl Port for NotSupportedPort {
    fn open(&mut self, _mtu: usize) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn tx(&mut self, _data: &[u8], _timeout_ms: u32) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn rx(&mut self, _buf: &mut [u8], _timeout_ms: u32) -> Result<usize> {
        Err(Error::Retry)
    }
}
