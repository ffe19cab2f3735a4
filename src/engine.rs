//! Top-level orchestration: transport I/O, frame routing, OTA pump, cloud
//! pump, all driven by an externally-called [`Engine::step`].
//!
//! There is no internal scheduler or thread; a host loop calls `step()` on
//! whatever cadence `loop_period_ms` implies.

use log::{debug, error, info, warn};

use crate::cloud::CloudClient;
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::link::{self, Command};
use crate::ota::OtaReceiver;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Init,
    Ready,
    Running,
    Fault,
}

pub struct Engine {
    config: GatewayConfig,
    state: EngineState,
    /// Sequence number stamped on outbound frames. Starts at 1; the frame
    /// currently being sent is stamped with this value, then it advances
    /// for the next send.
    tx_seq: u16,
    cloud: Option<CloudClient>,
    ota: OtaReceiver,
}

impl Engine {
    pub fn new(config: GatewayConfig, ota: OtaReceiver) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: EngineState::Init,
            tx_seq: 1,
            cloud: None,
            ota,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn tx_seq(&self) -> u16 {
        self.tx_seq
    }

    /// Attach a connected (or connectable) cloud client. Optional: a
    /// gateway with no cloud link still moves Init → Ready.
    pub fn with_cloud(mut self, cloud: CloudClient) -> Self {
        self.cloud = Some(cloud);
        self
    }

    /// Open the transport and, if present, connect the cloud client.
    /// Rolls the transport back closed on a partial failure so a retried
    /// `start()` begins from a clean slate.
    pub fn start(&mut self, transport: &mut Transport) -> Result<()> {
        if self.state != EngineState::Init && self.state != EngineState::Ready {
            return Err(Error::NotPermitted);
        }

        info!("engine starting: device_id={}", self.config.device_id);
        transport.open()?;

        if let Some(cloud) = self.cloud.as_mut() {
            if let Err(e) = cloud.connect() {
                warn!("cloud connect failed during start: {e}");
                let _ = transport.close();
                return Err(e);
            }
        }

        self.state = EngineState::Running;
        info!("engine running");
        Ok(())
    }

    /// One non-blocking pass: drain one inbound frame (if any), route it,
    /// pump the cloud client and the OTA receiver. Any unexpected error
    /// drops the engine into `Fault` — there is no internal retry; the host
    /// loop decides whether to call `stop()`/`start()` again.
    pub fn step(&mut self, transport: &mut Transport) -> Result<()> {
        if self.state != EngineState::Running {
            return Err(Error::NotPermitted);
        }

        if let Err(e) = self.poll_transport(transport) {
            error!("transport step failed: {e}");
            self.state = EngineState::Fault;
            return Err(e);
        }

        if let Some(cloud) = self.cloud.as_mut() {
            match cloud.pump() {
                Ok(()) | Err(Error::NotConnected) => {}
                Err(e) => {
                    error!("cloud pump failed: {e}");
                    self.state = EngineState::Fault;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.ota.pump() {
            error!("ota pump failed: {e}");
            self.state = EngineState::Fault;
            return Err(e);
        }

        Ok(())
    }

    fn poll_transport(&mut self, transport: &mut Transport) -> Result<()> {
        let mut buf = [0u8; link::MAX_FRAME_LEN];
        let n = match transport.rx(&mut buf, 0) {
            Ok(n) => n,
            Err(Error::Retry) | Err(Error::NoData) => return Ok(()),
            Err(e) => return Err(e),
        };
        if n == 0 {
            return Ok(());
        }

        let view = link::decode(&buf[..n])?;
        debug!("rx frame cmd={:#04x} seq={} len={}", view.cmd, view.seq, view.payload_len());

        match Command::try_from(view.cmd) {
            Ok(Command::OtaBegin) => self.ota.begin()?,
            Ok(Command::OtaChunk) => self.ota.chunk(view.payload_len())?,
            Ok(Command::OtaEnd) => self.ota.end()?,
            Ok(_) => {}
            Err(e) => warn!("unrecognized command byte: {e}"),
        }

        Ok(())
    }

    /// Write `payload` as a `cmd` frame. Requires `Running`. The frame is
    /// encoded with the current `tx_seq` first, so an encode-time
    /// rejection (oversized payload) doesn't consume a sequence number;
    /// `tx_seq` only advances once the frame is ready to go on the wire.
    pub fn send(&mut self, transport: &mut Transport, cmd: Command, payload: &[u8]) -> Result<()> {
        if self.state != EngineState::Running {
            return Err(Error::NotPermitted);
        }

        let frame = link::encode_vec(0, cmd.as_u8(), self.tx_seq, payload)?;
        self.tx_seq = self.tx_seq.wrapping_add(1);
        transport.tx(&frame, self.config.loop_period_ms)
    }

    /// Disconnect the cloud client and close the transport. Idempotent:
    /// safe to call after a failed or partial `start()`.
    pub fn stop(&mut self, transport: &mut Transport) -> Result<()> {
        if let Some(cloud) = self.cloud.as_mut() {
            let _ = cloud.disconnect();
        }
        transport.close()?;
        self.state = EngineState::Ready;
        info!("engine stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtaConfig;
    use crate::link::Command;
    use crate::transport::{InternalTransport, Transport};

    fn engine() -> Engine {
        let config = GatewayConfig {
            device_id: "dev-1".into(),
            loop_period_ms: 20,
            ..GatewayConfig::default()
        };
        Engine::new(config, OtaReceiver::new(OtaConfig::default())).unwrap()
    }

    fn loopback_transport() -> Transport {
        Transport::Internal(InternalTransport::new(512, Box::new(|_tx, _rx| Ok(0))))
    }

    #[test]
    fn starts_without_cloud() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        engine.start(&mut transport).unwrap();
        assert_eq!(engine.state(), EngineState::Running);
    }

    #[test]
    fn step_before_start_is_not_permitted() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        assert_eq!(engine.step(&mut transport), Err(Error::NotPermitted));
    }

    #[test]
    fn send_advances_seq_after_a_successful_encode() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        engine.start(&mut transport).unwrap();
        assert_eq!(engine.tx_seq(), 1);
        engine.send(&mut transport, Command::Heartbeat, &[]).unwrap();
        assert_eq!(engine.tx_seq(), 2);
    }

    #[test]
    fn send_rejects_oversized_payload_without_consuming_a_seq() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        engine.start(&mut transport).unwrap();
        assert_eq!(engine.tx_seq(), 1);

        let oversized = vec![0u8; crate::link::MAX_PAYLOAD_LEN + 1];
        let err = engine.send(&mut transport, Command::Telemetry, &oversized).unwrap_err();
        assert_eq!(err, Error::MessageTooLong);
        assert_eq!(engine.tx_seq(), 1);
    }

    #[test]
    fn stop_is_idempotent_after_failed_start() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        engine.start(&mut transport).unwrap();
        engine.stop(&mut transport).unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        engine.stop(&mut transport).unwrap();
    }

    #[test]
    fn step_routes_ota_begin_frame() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        engine.start(&mut transport).unwrap();

        let frame = link::encode_vec(0, Command::OtaBegin.as_u8(), 1, &[]).unwrap();
        let Transport::Internal(internal) = &mut transport else {
            unreachable!()
        };
        internal.stage_inbound(&frame);

        engine.step(&mut transport).unwrap();
        assert_eq!(engine.ota.state(), crate::ota::OtaState::Receiving);
    }

    #[test]
    fn corrupt_frame_drops_engine_into_fault() {
        let mut engine = engine();
        let mut transport = loopback_transport();
        engine.start(&mut transport).unwrap();

        let mut frame = link::encode_vec(0, Command::Heartbeat.as_u8(), 1, &[1, 2]).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let Transport::Internal(internal) = &mut transport else {
            unreachable!()
        };
        internal.stage_inbound(&frame);

        assert!(engine.step(&mut transport).is_err());
        assert_eq!(engine.state(), EngineState::Fault);
    }
}
