//! Cloud bootstrap, claim-status gating, secret exchange, and MQTT session
//! management.

pub mod client;
pub mod http;
pub mod json;
pub mod mqtt;
pub mod status;
pub mod url;

pub use client::{Clock, CloudClient, SystemClock};
pub use http::{HttpClient, TcpHttpClient};
pub use mqtt::{MqttConfig, MqttSession};
pub use status::ClaimStatus;
pub use url::{Scheme, Url};
