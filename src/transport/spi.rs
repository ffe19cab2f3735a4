//! SPI transport variant: bus name, frequency, slave index, MTU.

use crate::error::{Error, Result};
use crate::transport::port::{NotSupportedPort, Port};

pub const DEFAULT_MTU: usize = 512;
pub const DEFAULT_FREQUENCY_HZ: u32 = 1_000_000;

pub struct SpiConfig {
    pub bus_name: String,
    pub frequency_hz: u32,
    pub slave_index: u8,
    pub mtu: usize,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            bus_name: String::new(),
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            slave_index: 0,
            mtu: DEFAULT_MTU,
        }
    }
}

pub struct SpiTransport {
    config: SpiConfig,
    port: Box<dyn Port>,
    is_open: bool,
}

impl SpiTransport {
    pub fn new(mut config: SpiConfig) -> Self {
        if config.mtu == 0 {
            config.mtu = DEFAULT_MTU;
        }
        Self {
            config,
            port: Box::new(NotSupportedPort),
            is_open: false,
        }
    }

    pub fn with_port(mut config: SpiConfig, port: Box<dyn Port>) -> Self {
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
