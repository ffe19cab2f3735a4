//! Device claim-status lifecycle as reported by the bootstrap endpoint.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Unknown,
    NotProvisioned,
    Unclaimed,
    Claimed,
    Active,
    Suspended,
    Revoked,
}

impl ClaimStatus {
    /// Unrecognized status strings map to `Unknown` rather than failing the
    /// bootstrap call outright.
    pub fn from_str(s: &str) -> Self {
        match s {
            "not_provisioned" => Self::NotProvisioned,
            "unclaimed" => Self::Unclaimed,
            "claimed" => Self::Claimed,
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            "revoked" => Self::Revoked,
            _ => Self::Unknown,
        }
    }

    /// Only these two statuses permit the cloud client to proceed past the
    /// bootstrap step.
    pub fn permits_connect(self) -> bool {
        matches!(self, Self::Claimed | Self::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_round_trip() {
        assert_eq!(ClaimStatus::from_str("active"), ClaimStatus::Active);
        assert_eq!(ClaimStatus::from_str("claimed"), ClaimStatus::Claimed);
        assert_eq!(ClaimStatus::from_str("unclaimed"), ClaimStatus::Unclaimed);
    }

    #[test]
    fn unknown_string_maps_to_unknown() {
        assert_eq!(ClaimStatus::from_str("something_new"), ClaimStatus::Unknown);
    }

    #[test]
    fn only_claimed_and_active_permit_connect() {
        assert!(ClaimStatus::Claimed.permits_connect());
        assert!(ClaimStatus::Active.permits_connect());
        assert!(!ClaimStatus::Unclaimed.permits_connect());
        assert!(!ClaimStatus::Unknown.permits_connect());
    }
}
