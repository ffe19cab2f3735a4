//! Gateway engine runtime.
//!
//! ```text
//! ┌──────────┐  frame   ┌───────────┐  decode   ┌──────────────┐
//! │ Transport│◀────────▶│ Link Codec│──────────▶│ OTA Receiver │
//! └──────────┘          └───────────┘            └──────────────┘
//!       ▲                                               ▲
//!       │                                               │
//!       └───────────────────┐           ┌────────────────┘
//!                           │           │
//!                      ┌────┴───────────┴────┐        ┌─────────────┐
//!                      │        Engine        │──────▶│ Cloud Client│
//!                      └───────────────────────┘        └─────────────┘
//! ```
//!
//! The engine is a leaf-first composition driven by a single-threaded step
//! loop. Nothing in this crate spawns a thread or an async runtime; the
//! caller owns the loop and the timing budget.

#![deny(unused_must_use)]

pub mod cloud;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod link;
pub mod ota;
pub mod profile;
pub mod transport;

pub use config::{CloudConfig, GatewayConfig, OtaConfig};
pub use engine::{Engine, EngineState};
pub use error::{Error, Result};
pub use profile::GatewayProfile;
