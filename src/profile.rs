//! Gateway deployment profile.
//!
//! Informational only: carried through configuration and logging, but no
//! component in this crate branches on its value.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayProfile {
    IiotGateway,
    GenericGateway,
    LightingGateway,
}

impl GatewayProfile {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IiotGateway => "iiot_gateway",
            Self::GenericGateway => "generic_gateway",
            Self::LightingGateway => "lighting_gateway",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "iiot_gateway" => Ok(Self::IiotGateway),
            "generic_gateway" => Ok(Self::GenericGateway),
            "lighting_gateway" => Ok(Self::LightingGateway),
            other => Err(Error::invalid_argument(format!(
                "unknown gateway profile '{other}'"
            ))),
        }
    }
}

impl Default for GatewayProfile {
    fn default() -> Self {
        Self::GenericGateway
    }
}

impl fmt::Display for GatewayProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_names() {
        for p in [
            GatewayProfile::IiotGateway,
            GatewayProfile::GenericGateway,
            GatewayProfile::LightingGateway,
        ] {
            assert_eq!(GatewayProfile::from_name(p.as_str()).unwrap(), p);
        }
    }

    #[test]
    fn rejects_unknown_name() {
        assert!(GatewayProfile::from_name("bogus_gateway").is_err());
    }

    #[test]
    fn default_is_generic() {
        assert_eq!(GatewayProfile::default(), GatewayProfile::GenericGateway);
    }
}
