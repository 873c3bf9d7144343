//! Client-side credit estimate for a verified plantation.
//!
//! The credit token contract is the authority on minted amounts; this
//! estimate decides how much the verifier mints and may drift from any
//! on-chain formula.

use std::fmt;

use crate::contracts::PlantationData;

/// Square metres per rate unit.
const AREA_DIVISOR: u64 = 1000;

/// Ecosystem types with a known credit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcosystemType {
    Mangroves,
    Seagrass,
    Saltmarsh,
    Other,
}

impl EcosystemType {
    /// Case-insensitive match; anything unknown is `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mangroves" => Self::Mangroves,
            "seagrass" => Self::Seagrass,
            "saltmarsh" => Self::Saltmarsh,
            _ => Self::Other,
        }
    }

    /// Credits per 1000 m².
    pub fn rate(self) -> u64 {
        match self {
            Self::Mangroves => 5,
            Self::Seagrass => 3,
            Self::Saltmarsh => 4,
            Self::Other => 3,
        }
    }
}

impl fmt::Display for EcosystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mangroves => "mangroves",
            Self::Seagrass => "seagrass",
            Self::Saltmarsh => "saltmarsh",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// `floor(area * rate / 1000)`.
pub fn calculate_credits(area: u64, ecosystem_type: &str) -> u64 {
    area.saturating_mul(EcosystemType::parse(ecosystem_type).rate()) / AREA_DIVISOR
}

/// Credits for a plantation record. An unparseable area counts as zero.
pub fn credits_for_plantation(plantation: &PlantationData) -> u64 {
    let area = match plantation.area.trim().parse::<u64>() {
        Ok(area) => area,
        Err(e) => {
            tracing::warn!(
                plantation_id = %plantation.id,
                area = %plantation.area,
                error = %e,
                "Unparseable plantation area, estimating zero credits"
            );
            0
        }
    };
    calculate_credits(area, &plantation.ecosystem_type)
}
