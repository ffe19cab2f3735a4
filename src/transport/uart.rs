//! UART transport variant: device name, baud, MTU.
//!
//! The 2 ms inter-character idle gap used to terminate an rx read is a
//! property of the underlying port implementation, not this layer; this
//! layer only enforces the open/MTU/buffer-capacity contract shared by
//! every transport variant.

use crate::error::{Error, Result};
use crate::transport::port::{NotSupportedPort, Port};

pub const DEFAULT_MTU: usize = 512;
pub const DEFAULT_BAUD: u32 = 115_200;
pub const INTERCHAR_GAP_MS: u32 = 2;

pub struct UartConfig {
    pub device_name: String,
    pub baud: u32,
    pub mtu: usize,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            baud: DEFAULT_BAUD,
            mtu: DEFAULT_MTU,
        }
    }
}

pub struct UartTransport {
    config: UartConfig,
    port: Box<dyn Port>,
    is_open: bool,
}

impl UartTransport {
    pub fn new(mut config: UartConfig) -> Self {
        if config.mtu == 0 {
            config.mtu = DEFAULT_MTU;
        }
        Self {
            config,
            port: Box::new(NotSupportedPort),
            is_open: false,
        }
    }

    pub fn with_port(mut config: UartConfig, port: Box<dyn Port>) -> Self {
        if config.mtu == 0 {
            config.mtu = DEFAULT_MTU;
        }
        Self {
            config,
            port,
            is_open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open(&mut self) -> Result<()> {
        if self.is_open {
            return Ok(());
        }
        self.port.open(self.config.mtu)?;
        self.is_open = true;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        self.port.close()?;
        self.is_open = false;
        Ok(())
    }

    pub fn tx(&mut self, data: &[u8], timeout_ms: u32) -> Result<()> {
        if data.is_empty() {
            return Err(Error::invalid_argument("tx data must not be empty"));
        }
        if !self.is_open {
            return Err(Error::NotConnected);
        }
        if data.len() > self.config.mtu {
            return Err(Error::MessageTooLong);
        }
        self.port.tx(data, timeout_ms)
    }

    pub fn rx(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        if !self.is_open {
            return Err(Error::NotConnected);
        }
        if buf.len() < self.config.mtu {
            return Err(Error::BufferTooSmall);
        }
        self.port.rx(buf, timeout_ms)
    }
}
