//! Internal loopback transport: the test seam.
//!
//! A single caller-supplied closure synchronously consumes the outbound
//! frame and produces the inbound frame, letting the full engine be
//! exercised without hardware.

use crate::error::{Error, Result};

pub const DEFAULT_MTU: usize = 512;
pub const STAGING_CAPACITY: usize = 1024;

/// `exchange(tx_bytes, rx_buf) -> rx_len`. Returning `Err` aborts the tx.
pub type ExchangeFn = Box<dyn FnMut(&[u8], &mut [u8]) -> Result<usize> + Send>;

pub struct InternalTransport {
    mtu: usize,
    exchange: ExchangeFn,
    staging: [u8; STAGING_CAPACITY],
    staging_len: usize,
    pending: bool,
    is_open: bool,
}

impl InternalTransport {
    pub fn new(mtu: usize, exchange: ExchangeFn) -> Self {
        Self {
            mtu: if mtu == 0 { DEFAULT_MTU } else { mtu },
            exchange,
            staging: [0u8; STAGING_CAPACITY],
            staging_len: 0,
            pending: false,
            is_open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open(&mut self) -> Result<()> {
        self.is_open = true;
        self.staging_len = 0;
        self.pending = false;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.is_open = false;
        self.pending = false;
        Ok(())
    }

    pub fn tx(&mut self, data: &[u8], _timeout_ms: u32) -> Result<()> {
        if data.is_empty() {
            return Err(Error::invalid_argument("tx data must not be empty"));
        }
        if !self.is_open {
            return Err(Error::NotConnected);
        }
        if data.len() > self.mtu {
            return Err(Error::MessageTooLong);
        }
        let mut staging = [0u8; STAGING_CAPACITY];
        let rx_len = (self.exchange)(data, &mut staging)?;
        if rx_len > STAGING_CAPACITY {
            return Err(Error::BufferTooSmall);
        }
        self.staging[..rx_len].copy_from_slice(&staging[..rx_len]);
        self.staging_len = rx_len;
        self.pending = true;
        Ok(())
    }

    /// Test-only seam: stage a frame as if it had arrived unsolicited,
    /// without going through a `tx()`/exchange round trip first.
    #[cfg(test)]
    pub fn stage_inbound(&mut self, data: &[u8]) {
        self.staging[..data.len()].copy_from_slice(data);
        self.staging_len = data.len();
        self.pending = true;
    }

    pub fn rx(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize> {
        if !self.is_open {
            return Err(Error::NotConnected);
        }
        if !self.pending {
            return Err(Error::Retry);
        }
        if buf.len() < self.staging_len {
            return Err(Error::BufferTooSmall);
        }
        buf[..self.staging_len].copy_from_slice(&self.staging[..self.staging_len]);
        self.pending = false;
        Ok(self.staging_len)
    }
}
