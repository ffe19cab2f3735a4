//! MQTT session: configure → connect → publish → pump → disconnect.
//!
//! The MQTT wire format itself is consumed as an opaque library
//! (`mqttbytes`); this module only owns socket selection (plain TCP, TLS,
//! WebSocket, or TLS+WebSocket, chosen from the broker URL's scheme) and
//! the connect/publish/pump control flow around it.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mqttbytes::v4::{Connect, ConnectReturnCode, Disconnect, Packet, Publish};
use mqttbytes::QoS;
use tungstenite::{Message, WebSocket};

use crate::cloud::url::{Scheme, Url};
use crate::error::{Error, Result};

const CONNACK_SLICE_MS: u64 = 250;
const MAX_PACKET_SIZE: usize = 4096;

/// Buffer sizes mirror the process-wide runtime block described in the
/// engine's concurrency model: one active session, fixed-size scratch.
const RX_BUFFER_CAP: usize = 2048;
const TX_BUFFER_CAP: usize = 2048;

enum Socket {
    Plain(TcpStream),
    Tls(Box<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>),
    Ws(Box<WebSocket<TcpStream>>),
    WssTls(Box<WebSocket<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>>),
}

impl Socket {
    fn write_packet(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Plain(s) => s.write_all(bytes).map_err(Error::from),
            Self::Tls(s) => s.write_all(bytes).map_err(Error::from),
            Self::Ws(ws) => ws
                .send(Message::Binary(bytes.to_vec()))
                .map_err(|e| Error::Io(e.to_string())),
            Self::WssTls(ws) => ws
                .send(Message::Binary(bytes.to_vec()))
                .map_err(|e| Error::Io(e.to_string())),
        }
    }

    /// Non-blocking best-effort read; returns `Ok(0)` (not an error) when
    /// nothing is currently available.
    fn read_available(&mut self, out: &mut BytesMut) -> Result<usize> {
        let mut chunk = [0u8; 512];
        match self {
            Self::Plain(s) => match s.read(&mut chunk) {
                Ok(n) => {
                    out.extend_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(e.into()),
            },
            Self::Tls(s) => match s.read(&mut chunk) {
                Ok(n) => {
                    out.extend_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(e.into()),
            },
            Self::Ws(ws) => match ws.read() {
                Ok(Message::Binary(data)) => {
                    out.extend_from_slice(&data);
                    Ok(data.len())
                }
                Ok(_) => Ok(0),
                Err(tungstenite::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(Error::Io(e.to_string())),
            },
            Self::WssTls(ws) => match ws.read() {
                Ok(Message::Binary(data)) => {
                    out.extend_from_slice(&data);
                    Ok(data.len())
                }
                Ok(_) => Ok(0),
                Err(tungstenite::Error::Io(e)) if e.kind() == ErrorKind::WouldBlock => Ok(0),
                Err(e) => Err(Error::Io(e.to_string())),
            },
        }
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        match self {
            Self::Plain(s) => s.set_nonblocking(nonblocking).map_err(Error::from),
            Self::Tls(s) => s.get_ref().set_nonblocking(nonblocking).map_err(Error::from),
            Self::Ws(ws) => ws.get_ref().set_nonblocking(nonblocking).map_err(Error::from),
            Self::WssTls(ws) => ws
                .get_ref()
                .get_ref()
                .set_nonblocking(nonblocking)
                .map_err(Error::from),
        }
    }
}

pub struct MqttConfig {
    pub broker: Url,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub keepalive_sec: u16,
    pub connect_timeout_ms: u32,
    pub tls_sec_tag: i32,
}

pub struct MqttSession {
    socket: Socket,
    rx_buf: BytesMut,
    next_message_id: u16,
    connected: bool,
}

fn open_tls(host: &str, stream: TcpStream) -> Result<rustls::StreamOwned<rustls::ClientConnection, TcpStream>> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        let _ = roots.add(cert);
    }
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    );
    let server_name = rustls_pki_types::ServerName::try_from(host.to_string())
        .map_err(|_| Error::invalid_argument("invalid TLS server name"))?;
    let conn = rustls::ClientConnection::new(tls_config, server_name).map_err(|e| Error::Io(e.to_string()))?;
    Ok(rustls::StreamOwned::new(conn, stream))
}

fn open_socket(config: &MqttConfig) -> Result<Socket> {
    if config.broker.scheme.is_tls() && config.tls_sec_tag < 0 {
        return Err(Error::invalid_argument(
            "tls_sec_tag is required for a TLS broker scheme",
        ));
    }

    let addr = format!("{}:{}", config.broker.host, config.broker.port);
    let tcp = TcpStream::connect(&addr)?;
    tcp.set_read_timeout(Some(Duration::from_millis(u64::from(
        config.connect_timeout_ms.max(1),
    ))))?;

    Ok(match config.broker.scheme {
        Scheme::Http => Socket::Plain(tcp),
        Scheme::Https => Socket::Tls(Box::new(open_tls(&config.broker.host, tcp)?)),
        Scheme::Ws => {
            let (ws, _resp) = tungstenite::client(request_uri(config), tcp)
                .map_err(|e| Error::Io(e.to_string()))?;
            Socket::Ws(Box::new(ws))
        }
        Scheme::Wss => {
            let tls = open_tls(&config.broker.host, tcp)?;
            let (ws, _resp) =
                tungstenite::client(request_uri(config), tls).map_err(|e| Error::Io(e.to_string()))?;
            Socket::WssTls(Box::new(ws))
        }
    })
}

fn request_uri(config: &MqttConfig) -> String {
    format!(
        "{}://{}:{}{}",
        if config.broker.scheme.is_tls() { "wss" } else { "ws" },
        config.broker.host,
        config.broker.port,
        config.broker.path
    )
}

/// Start the MQTT connect, then wait up to `connect_timeout_ms`, in
/// slices of at most 250 ms, polling for a CONNACK.
pub fn connect(config: &MqttConfig) -> Result<MqttSession> {
    let mut socket = open_socket(config)?;

    let connect_packet = Connect {
        keep_alive: config.keepalive_sec,
        client_id: config.client_id.clone(),
        clean_session: true,
        last_will: None,
        login: Some(mqttbytes::v4::Login {
            username: config.username.clone(),
            password: config.password.clone(),
        }),
    };
    let mut tx = BytesMut::with_capacity(TX_BUFFER_CAP);
    connect_packet
        .write(&mut tx)
        .map_err(|e| Error::bad_message(e.to_string()))?;
    socket.write_packet(&tx)?;

    socket.set_nonblocking(true)?;

    let deadline = Instant::now() + Duration::from_millis(u64::from(config.connect_timeout_ms));
    let mut rx_buf = BytesMut::with_capacity(RX_BUFFER_CAP);

    while Instant::now() < deadline {
        let slice = Duration::from_millis(CONNACK_SLICE_MS).min(deadline - Instant::now());
        std::thread::sleep(slice.min(Duration::from_millis(5)));

        let _ = socket.read_available(&mut rx_buf)?;
        match mqttbytes::v4::read(&mut rx_buf, MAX_PACKET_SIZE) {
            Ok(Packet::ConnAck(ack)) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(MqttSession {
                        socket,
                        rx_buf,
                        next_message_id: 1,
                        connected: true,
                    })
                } else {
                    Err(Error::ConnectionRefused)
                };
            }
            Ok(_) | Err(mqttbytes::Error::InsufficientBytes(_)) => continue,
            Err(e) => return Err(Error::bad_message(e.to_string())),
        }
    }

    Err(Error::TimedOut)
}

impl MqttSession {
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if topic.is_empty() || topic.len() > 256 {
            return Err(Error::invalid_argument("topic length out of bounds"));
        }
        if payload.is_empty() {
            return Err(Error::invalid_argument("telemetry payload must not be empty"));
        }

        let mut publish = Publish::new(topic, QoS::AtMostOnce, payload.to_vec());
        publish.pkid = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1).max(1);

        let mut tx = BytesMut::with_capacity(TX_BUFFER_CAP);
        publish
            .write(&mut tx)
            .map_err(|e| Error::bad_message(e.to_string()))?;
        self.socket.write_packet(&tx)
    }

    /// Non-blocking drain of inbound MQTT traffic; `WouldBlock`/partial
    /// frames are not errors.
    pub fn pump(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.socket.read_available(&mut self.rx_buf)?;
        loop {
            match mqttbytes::v4::read(&mut self.rx_buf, MAX_PACKET_SIZE) {
                Ok(_packet) => continue,
                Err(mqttbytes::Error::InsufficientBytes(_)) => break,
                Err(e) => {
                    self.connected = false;
                    return Err(Error::bad_message(e.to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            let mut tx = BytesMut::with_capacity(16);
            let _ = Disconnect.write(&mut tx);
            let _ = self.socket.write_packet(&tx);
        }
        self.connected = false;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
