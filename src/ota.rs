//! OTA receive state machine.
//!
//! Only receives and accounts bytes; image write/verify is out of scope.

use crate::config::OtaConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving,
    Verifying,
    ReadyToApply,
}

pub struct OtaReceiver {
    config: OtaConfig,
    state: OtaState,
    bytes_received: u64,
}

impl OtaReceiver {
    pub fn new(config: OtaConfig) -> Self {
        Self {
            config,
            state: OtaState::Idle,
            bytes_received: 0,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.state != OtaState::Idle {
            return Err(Error::AlreadyExists);
        }
        self.bytes_received = 0;
        self.state = OtaState::Receiving;
        Ok(())
    }

    pub fn chunk(&mut self, len: usize) -> Result<()> {
        if self.state != OtaState::Receiving {
            return Err(Error::NotPermitted);
        }
        if self.config.chunk_size > 0 && len as u64 > u64::from(self.config.chunk_size) {
            return Err(Error::MessageTooLong);
        }
        self.bytes_received += len as u64;
        Ok(())
    }

    pub fn end(&mut self) -> Result<()> {
        if self.state != OtaState::Receiving {
            return Err(Error::NotPermitted);
        }
        self.state = OtaState::Verifying;
        self.state = OtaState::ReadyToApply;
        Ok(())
    }

    /// Hook point with no mandatory behavior; reserved for a future
    /// pump-timeout extension (`config.timeout_ms`).
    pub fn pump(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state = OtaState::Idle;
        self.bytes_received = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver() -> OtaReceiver {
        OtaReceiver::new(OtaConfig::default())
    }

    #[test]
    fn happy_path_accumulates_bytes() {
        let mut r = receiver();
        r.begin().unwrap();
        r.chunk(200).unwrap();
        r.chunk(400).unwrap();
        r.end().unwrap();
        assert_eq!(r.state(), OtaState::ReadyToApply);
        assert_eq!(r.bytes_received(), 600);
    }

    #[test]
    fn chunk_before_begin_is_not_permitted() {
        let mut r = receiver();
        assert_eq!(r.chunk(10), Err(Error::NotPermitted));
    }

    #[test]
    fn end_before_begin_is_not_permitted() {
        let mut r = receiver();
        assert_eq!(r.end(), Err(Error::NotPermitted));
    }

    #[test]
    fn second_begin_while_receiving_is_already_exists() {
        let mut r = receiver();
        r.begin().unwrap();
        assert_eq!(r.begin(), Err(Error::AlreadyExists));
    }

    #[test]
    fn begin_resets_bytes_received() {
        let mut r = receiver();
        r.begin().unwrap();
        r.chunk(50).unwrap();
        r.end().unwrap();
        r.reset();
        r.begin().unwrap();
        assert_eq!(r.bytes_received(), 0);
    }

    #[test]
    fn chunk_over_configured_size_is_message_too_long() {
        let mut r = OtaReceiver::new(OtaConfig {
            chunk_size: 128,
            timeout_ms: 0,
        });
        r.begin().unwrap();
        assert_eq!(r.chunk(129), Err(Error::MessageTooLong));
    }

    #[test]
    fn zero_chunk_size_disables_the_check() {
        let mut r = OtaReceiver::new(OtaConfig {
            chunk_size: 0,
            timeout_ms: 0,
        });
        r.begin().unwrap();
        assert!(r.chunk(100_000).is_ok());
    }
}
