//! Domain records returned by the contract service.

use alloy::primitives::{Address, U256};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::contracts::abi::{BlueCarbonMRV, PlantationRegistry};

/// A registered plantation, with numeric fields rendered as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantationData {
    pub id: String,
    pub location: String,
    /// Area in square metres.
    pub area: String,
    pub ecosystem_type: String,
    /// ISO-8601 UTC timestamp.
    pub plantation_date: String,
    pub implementer: Address,
    pub verified: bool,
    pub ipfs_hash: String,
}

impl From<PlantationRegistry::Plantation> for PlantationData {
    fn from(p: PlantationRegistry::Plantation) -> Self {
        Self {
            id: p.id.to_string(),
            location: p.location,
            area: p.area.to_string(),
            ecosystem_type: p.ecosystemType,
            plantation_date: iso_date(p.plantationDate),
            implementer: p.implementer,
            verified: p.verified,
            ipfs_hash: p.ipfsHash,
        }
    }
}

/// A monitoring report from the MRV contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringReport {
    pub id: String,
    pub plantation_id: String,
    pub reporter: Address,
    pub report_date: String,
    pub survival_rate: String,
    pub biomass: String,
    pub carbon_sequestered: String,
    pub data_source: String,
    pub ipfs_hash: String,
    pub verified: bool,
    pub credits_generated: String,
}

impl From<BlueCarbonMRV::MonitoringReport> for MonitoringReport {
    fn from(r: BlueCarbonMRV::MonitoringReport) -> Self {
        Self {
            id: r.id.to_string(),
            plantation_id: r.plantationId.to_string(),
            reporter: r.reporter,
            report_date: iso_date(r.reportDate),
            survival_rate: r.survivalRate.to_string(),
            biomass: r.biomass.to_string(),
            carbon_sequestered: r.carbonSequestered.to_string(),
            data_source: r.dataSource,
            ipfs_hash: r.ipfsHash,
            verified: r.verified,
            credits_generated: r.creditsGenerated.to_string(),
        }
    }
}

/// Arguments of `registerPlantation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantationRegistration {
    pub location: String,
    pub area: U256,
    pub ecosystem_type: String,
    pub ipfs_hash: String,
}

/// Arguments of `submitMonitoringReport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSubmission {
    pub plantation_id: U256,
    pub survival_rate: U256,
    pub biomass: U256,
    pub data_source: String,
    pub ipfs_hash: String,
}

/// Render on-chain Unix seconds as an ISO-8601 UTC string with milliseconds.
///
/// Values beyond the representable range fall back to the epoch.
pub fn iso_date(seconds: U256) -> String {
    let secs = i64::try_from(seconds).unwrap_or(0);
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_iso_date() {
        assert_eq!(iso_date(U256::ZERO), "1970-01-01T00:00:00.000Z");
        assert_eq!(iso_date(U256::from(1_700_000_000u64)), "2023-11-14T22:13:20.000Z");
        assert_eq!(iso_date(U256::MAX), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_plantation_conversion_and_json() {
        let raw = PlantationRegistry::Plantation {
            id: U256::from(7u64),
            location: "Sundarbans".to_string(),
            area: U256::from(25_000u64),
            ecosystemType: "Mangroves".to_string(),
            plantationDate: U256::from(1_700_000_000u64),
            implementer: address!("6fcD6344267F2D7C4D09914437A06ceF3Fc2E304"),
            verified: false,
            ipfsHash: "QmHash".to_string(),
        };

        let plantation = PlantationData::from(raw);
        assert_eq!(plantation.id, "7");
        assert_eq!(plantation.area, "25000");

        let json = serde_json::to_value(&plantation).unwrap();
        assert_eq!(json["ecosystemType"], "Mangroves");
        assert_eq!(json["plantationDate"], "2023-11-14T22:13:20.000Z");
        assert_eq!(json["ipfsHash"], "QmHash");
    }
}
