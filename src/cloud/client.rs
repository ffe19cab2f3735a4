//! Cloud Client: bootstrap → secret → MQTT-connect lifecycle, telemetry
//! publish, and I/O pump.
//!
//! There is exactly one active cloud session per process; the design
//! deliberately pins MQTT buffers as process-wide state rather than
//! multiplexing, so construction is guarded against a second concurrent
//! instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cloud::http::{HttpClient, TcpHttpClient};
use crate::cloud::json;
use crate::cloud::mqtt::{self, MqttConfig, MqttSession};
use crate::cloud::status::ClaimStatus;
use crate::cloud::url::{self, Scheme};
use crate::config::CloudConfig;
use crate::crypto::hmac::hmac_sha256_hex;
use crate::error::{Error, Result};

static INSTANCE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Wall-clock source, abstracted so tests can supply a fixed time instead
/// of depending on `SystemTime::now()`.
pub trait Clock: Send {
    /// Unix seconds, or `<= 0` when the clock has not been set.
    fn now_unix(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

enum Identity<'a> {
    HardwareId(&'a str),
    DeviceId(&'a str),
}

fn select_identity(config: &CloudConfig) -> Result<Identity<'_>> {
    if let Some(hw) = config.hardware_id.as_deref().filter(|s| !s.is_empty()) {
        return Ok(Identity::HardwareId(hw));
    }
    if let Some(dev) = config.device_id.as_deref().filter(|s| !s.is_empty()) {
        return Ok(Identity::DeviceId(dev));
    }
    if let Some(key) = config.identity_key.as_deref().filter(|s| !s.is_empty()) {
        return Ok(Identity::DeviceId(key));
    }
    Err(Error::invalid_argument(
        "one of hardware_id/device_id/identity_key must be set",
    ))
}

fn rfc3339_now(unix_secs: i64) -> Result<String> {
    if unix_secs <= 0 {
        return Err(Error::NoData);
    }
    let days = unix_secs.div_euclid(86_400);
    let secs_of_day = unix_secs.rem_euclid(86_400);
    let (y, m, d) = civil_from_days(days);
    let hh = secs_of_day / 3600;
    let mm = (secs_of_day % 3600) / 60;
    let ss = secs_of_day % 60;
    Ok(format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}Z"))
}

/// Civil calendar date from a day count since the Unix epoch. Standard
/// proleptic-Gregorian algorithm (Howard Hinnant's `civil_from_days`).
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn make_signature(manufacturing_key: &str, identity_value: &str, timestamp: &str) -> String {
    let message = format!("{identity_value}:{timestamp}");
    hmac_sha256_hex(manufacturing_key.as_bytes(), message.as_bytes())
}

fn build_api_url(explicit: Option<&str>, api_base: &str, suffix: &str) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }
    if api_base.ends_with('/') {
        format!("{}{}", &api_base[..api_base.len() - 1], suffix)
    } else {
        format!("{api_base}{suffix}")
    }
}

/// Derive the secret endpoint from the bootstrap endpoint by replacing a
/// trailing `/bootstrap` suffix with `/secret`. Only triggers when both
/// `secret_url` and `api_base_url`-derived defaults are absent, matching
/// the exact precedence of the source this was distilled from.
fn derive_secret_url(bootstrap_url: &str) -> Option<String> {
    bootstrap_url
        .strip_suffix("/bootstrap")
        .map(|prefix| format!("{prefix}/secret"))
}

#[derive(Debug, Clone, Default)]
struct ResolvedState {
    device_id: String,
    hardware_id: String,
    broker_url: String,
    mqtt_username: String,
    device_secret: String,
    topic_prefix: String,
}

pub struct CloudClient {
    config: CloudConfig,
    http: Box<dyn HttpClient>,
    clock: Box<dyn Clock>,
    mqtt: Option<MqttSession>,
    initialized: bool,
    connected: bool,
    credentials_ready: bool,
    status: ClaimStatus,
    poll_interval_s: u32,
    resolved: ResolvedState,
    next_telemetry_message_id: u32,
}

impl CloudClient {
    pub fn new(config: CloudConfig) -> Result<Self> {
        Self::with_http(config, Box::new(TcpHttpClient::new()?))
    }

    pub fn with_http(config: CloudConfig, http: Box<dyn HttpClient>) -> Result<Self> {
        Self::with_http_and_clock(config, http, Box::new(SystemClock))
    }

    pub fn with_http_and_clock(
        config: CloudConfig,
        http: Box<dyn HttpClient>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        if INSTANCE_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyExists);
        }

        let resolved = ResolvedState {
            device_id: config.device_id.clone().unwrap_or_default(),
            hardware_id: config.hardware_id.clone().unwrap_or_default(),
            mqtt_username: config.mqtt_username.clone().unwrap_or_default(),
            device_secret: config.device_secret.clone().unwrap_or_default(),
            topic_prefix: config.topic_prefix.clone().unwrap_or_default(),
            broker_url: config.broker_url.clone().unwrap_or_default(),
        };

        Ok(Self {
            config,
            http,
            clock,
            mqtt: None,
            initialized: true,
            connected: false,
            credentials_ready: false,
            status: ClaimStatus::Unknown,
            poll_interval_s: 0,
            resolved,
            next_telemetry_message_id: 0,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn status(&self) -> ClaimStatus {
        self.status
    }

    pub fn poll_interval_s(&self) -> u32 {
        self.poll_interval_s
    }

    pub fn credentials_ready(&self) -> bool {
        self.credentials_ready
    }

    fn auth_payload(&self) -> Result<String> {
        let identity = select_identity(&self.config)?;
        let timestamp = rfc3339_now(self.clock.now_unix())?;
        let (field, value) = match identity {
            Identity::HardwareId(hw) => ("hardware_id", hw),
            Identity::DeviceId(dev) => ("device_id", dev),
        };
        let signature = make_signature(&self.config.manufacturing_key, value, &timestamp);
        Ok(json::build_auth_payload(field, value, &timestamp, &signature))
    }

    fn do_bootstrap(&mut self) -> Result<()> {
        let bootstrap_url_string = build_api_url(
            self.config.bootstrap_url.as_deref(),
            &self.config.api_base_url,
            "/api/v1/devices/bootstrap",
        );
        let url = url::parse(&bootstrap_url_string, Scheme::Https)?;
        let payload = self.auth_payload()?;

        let (status, body) = self
            .http
            .post_json(&url, &payload, self.config.bootstrap_timeout_ms)?;
        if status != 200 {
            return Err(Error::bad_message(format!("bootstrap returned HTTP {status}")));
        }

        let status_str = json::get_string(&body, "status").unwrap_or("");
        self.status = ClaimStatus::from_str(status_str);

        if let Some(dev) = json::get_string(&body, "device_id") {
            self.resolved.device_id = dev.to_string();
        }
        if let Some(hw) = json::get_string(&body, "hardware_id") {
            self.resolved.hardware_id = hw.to_string();
        }
        if let Some(poll) = json::get_uint(&body, "poll_interval") {
            self.poll_interval_s = poll as u32;
        }

        Ok(())
    }

    fn do_secret(&mut self) -> Result<()> {
        // Precedence: explicit `secret_url` wins; otherwise `api_base_url`
        // (when set) builds the default `/api/v1/devices/secret` path;
        // only when *both* are absent does an explicit `bootstrap_url`
        // ending in `/bootstrap` get derived into a secret URL.
        let secret_url_string = self
            .config
            .secret_url
            .clone()
            .or_else(|| {
                if self.config.api_base_url.is_empty() {
                    self.config
                        .bootstrap_url
                        .as_deref()
                        .and_then(derive_secret_url)
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                build_api_url(None, &self.config.api_base_url, "/api/v1/devices/secret")
            });

        let url = url::parse(&secret_url_string, Scheme::Https)?;
        let payload = self.auth_payload()?;

        let (status, body) = self
            .http
            .post_json(&url, &payload, self.config.bootstrap_timeout_ms)?;
        if status != 200 {
            return Err(Error::bad_message(format!("secret returned HTTP {status}")));
        }

        let device_secret = json::get_string(&body, "device_secret").ok_or_else(|| {
            Error::bad_message("secret response missing device_secret")
        })?;
        let mqtt_username = json::get_string(&body, "mqtt_username")
            .ok_or_else(|| Error::bad_message("secret response missing mqtt_username"))?;
        let broker = json::get_string(&body, "broker")
            .ok_or_else(|| Error::bad_message("secret response missing broker"))?;
        let topic_prefix = json::get_string(&body, "topic_prefix")
            .ok_or_else(|| Error::bad_message("secret response missing topic_prefix"))?;

        self.resolved.device_secret = device_secret.to_string();
        self.resolved.mqtt_username = mqtt_username.to_string();
        self.resolved.broker_url = broker.to_string();
        self.resolved.topic_prefix = topic_prefix.to_string();
        self.credentials_ready = true;

        Ok(())
    }

    fn mqtt_configure(&self) -> Result<MqttConfig> {
        let broker_source = if !self.resolved.broker_url.is_empty() {
            self.resolved.broker_url.as_str()
        } else {
            self.config.broker_url.as_deref().unwrap_or_default()
        };
        let broker = url::parse(broker_source, Scheme::Wss)?;

        if broker.scheme.is_tls() && self.config.tls_sec_tag < 0 {
            return Err(Error::invalid_argument(
                "tls_sec_tag is required for a TLS broker scheme",
            ));
        }

        let client_id = self
            .config
            .mqtt_client_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.resolved.device_id.clone()).filter(|s| !s.is_empty()))
            .or_else(|| self.config.device_id.clone())
            .unwrap_or_default();

        Ok(MqttConfig {
            broker,
            client_id,
            username: self.resolved.mqtt_username.clone(),
            password: self.resolved.device_secret.clone(),
            keepalive_sec: self.config.mqtt_keepalive_sec,
            connect_timeout_ms: self.config.mqtt_connect_timeout_ms,
            tls_sec_tag: self.config.tls_sec_tag,
        })
    }

    /// Bootstrap → (secret, unless cached) → MQTT configure/connect.
    pub fn connect(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::invalid_argument("cloud client not initialized"));
        }

        self.do_bootstrap()?;
        if !self.status.permits_connect() {
            return Err(Error::Retry);
        }

        if self.config.has_cached_credentials() {
            self.resolved.mqtt_username = self.config.mqtt_username.clone().unwrap_or_default();
            self.resolved.device_secret = self.config.device_secret.clone().unwrap_or_default();
            self.resolved.topic_prefix = self.config.topic_prefix.clone().unwrap_or_default();
            self.credentials_ready = true;
        } else {
            self.do_secret()?;
        }

        let mqtt_config = self.mqtt_configure()?;
        let session = mqtt::connect(&mqtt_config)?;
        self.mqtt = Some(session);
        self.connected = true;
        Ok(())
    }

    pub fn publish_telemetry(&mut self, payload: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.resolved.topic_prefix.is_empty() {
            return Err(Error::invalid_argument("topic_prefix is not resolved"));
        }
        let topic = format!("{}/slot/0", self.resolved.topic_prefix);
        self.next_telemetry_message_id = self.next_telemetry_message_id.wrapping_add(1);

        let session = self.mqtt.as_mut().ok_or(Error::NotConnected)?;
        session.publish(&topic, payload)
    }

    /// Non-blocking: drive MQTT input if the socket is readable. Any
    /// failure other than `NotConnected` clears the connected flag.
    pub fn pump(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let Some(session) = self.mqtt.as_mut() else {
            self.connected = false;
            return Err(Error::NotConnected);
        };
        match session.pump() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.connected = false;
                Err(e)
            }
        }
    }

    pub fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            if let Some(mut session) = self.mqtt.take() {
                session.disconnect()?;
            }
        }
        self.connected = false;
        Ok(())
    }
}

impl Drop for CloudClient {
    fn drop(&mut self) {
        INSTANCE_ACTIVE.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::http::HttpClient;
    use crate::cloud::url::Url;
    use std::collections::VecDeque;

    struct StubClock(i64);
    impl Clock for StubClock {
        fn now_unix(&self) -> i64 {
            self.0
        }
    }

    struct StubHttp {
        responses: VecDeque<(u16, String)>,
    }
    impl HttpClient for StubHttp {
        fn post_json(&mut self, _url: &Url, _body: &str, _timeout_ms: u32) -> Result<(u16, String)> {
            self.responses
                .pop_front()
                .ok_or_else(|| Error::bad_message("no stubbed response"))
        }
    }

    fn base_config() -> CloudConfig {
        CloudConfig {
            api_base_url: "https://api.example.com".into(),
            hardware_id: Some("hw-1".into()),
            manufacturing_key: "mfg-secret".into(),
            ..CloudConfig::default()
        }
    }

    #[test]
    fn bootstrap_retry_on_unclaimed_status() {
        let http = Box::new(StubHttp {
            responses: VecDeque::from([(200, r#"{"status":"unclaimed","poll_interval":30}"#.to_string())]),
        });
        let mut client =
            CloudClient::with_http_and_clock(base_config(), http, Box::new(StubClock(1_000_000)))
                .unwrap();

        let err = client.connect().unwrap_err();
        assert_eq!(err, Error::Retry);
        assert_eq!(client.poll_interval_s(), 30);
        assert!(!client.credentials_ready());
        assert!(!client.is_connected());
    }

    #[test]
    fn credential_caching_skips_secret_call() {
        let mut config = base_config();
        config.mqtt_username = Some("user".into());
        config.device_secret = Some("secret".into());
        config.topic_prefix = Some("devices/hw-1".into());

        let http = Box::new(StubHttp {
            responses: VecDeque::from([(200, r#"{"status":"active"}"#.to_string())]),
        });
        let mut client =
            CloudClient::with_http_and_clock(config, http, Box::new(StubClock(1_000_000))).unwrap();

        // Bootstrap succeeds and status is active; connect then tries MQTT
        // configure, which fails fast on the unset broker URL, without
        // ever touching the secret endpoint — proven by there being no
        // second stubbed HTTP response to pop.
        let result = client.connect();
        assert!(result.is_err());
        assert!(client.credentials_ready());
    }

    #[test]
    fn auth_payload_uses_hardware_id_field() {
        let http = Box::new(StubHttp {
            responses: VecDeque::new(),
        });
        let client =
            CloudClient::with_http_and_clock(base_config(), http, Box::new(StubClock(1_700_000_000)))
                .unwrap();
        let payload = client.auth_payload().unwrap();
        assert!(payload.starts_with(r#"{"hardware_id":"hw-1""#));
    }

    #[test]
    fn timestamp_fails_without_wall_clock() {
        let http = Box::new(StubHttp {
            responses: VecDeque::new(),
        });
        let client = CloudClient::with_http_and_clock(base_config(), http, Box::new(StubClock(0))).unwrap();
        assert_eq!(client.auth_payload().unwrap_err(), Error::NoData);
    }

    #[test]
    fn derive_secret_url_replaces_bootstrap_suffix() {
        assert_eq!(
            derive_secret_url("https://api.example.com/api/v1/devices/bootstrap"),
            Some("https://api.example.com/api/v1/devices/secret".to_string())
        );
        assert_eq!(derive_secret_url("https://api.example.com/other"), None);
    }

    struct RecordingHttp {
        responses: VecDeque<(u16, String)>,
        requested_hosts: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }
    impl HttpClient for RecordingHttp {
        fn post_json(&mut self, url: &Url, _body: &str, _timeout_ms: u32) -> Result<(u16, String)> {
            self.requested_hosts.borrow_mut().push(url.host.clone());
            self.responses
                .pop_front()
                .ok_or_else(|| Error::bad_message("no stubbed response"))
        }
    }

    #[test]
    fn api_base_url_takes_precedence_over_bootstrap_derivation() {
        let mut config = base_config();
        config.api_base_url = "https://api.example.com".into();
        config.bootstrap_url = Some("https://bootstrap-only.example.com/v2/bootstrap".into());

        let hosts = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let http = Box::new(RecordingHttp {
            responses: VecDeque::from([
                (200, r#"{"status":"active"}"#.to_string()),
                (
                    200,
                    r#"{"device_secret":"s","mqtt_username":"u","broker":"wss://broker.example.com","topic_prefix":"devices/hw-1"}"#
                        .to_string(),
                ),
            ]),
            requested_hosts: hosts.clone(),
        });
        let mut client =
            CloudClient::with_http_and_clock(config, http, Box::new(StubClock(1_700_000_000))).unwrap();

        let _ = client.connect();

        let requested = hosts.borrow();
        assert_eq!(requested[0], "bootstrap-only.example.com");
        // The secret call goes to api_base_url's host, not the bootstrap
        // URL's host, since api_base_url is set.
        assert_eq!(requested[1], "api.example.com");
    }

    #[test]
    fn civil_date_matches_known_epoch_offset() {
        // 2026-07-30 is day 20662 since the Unix epoch.
        let (y, m, d) = civil_from_days(20_662);
        assert_eq!((y, m, d), (2026, 7, 30));
    }
}
