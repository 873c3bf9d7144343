//! Classification of raw contract logs into application events.

use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::Log;
use serde::Serialize;

use crate::blockchain::format_address;
use crate::config::NetworkConfig;
use crate::contracts::abi::{BlueCarbonCredit, PlantationRegistry};
use crate::credits::format_ether;
use crate::observability::metrics;

/// Payload of a classified event, serialized as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum EventData {
    PlantationRegistered {
        id: String,
        implementer: Address,
        location: String,
    },
    PlantationVerified {
        id: String,
        verifier: Address,
    },
    /// `Transfer` from the zero address.
    CarbonCreditsMinted {
        to: Address,
        amount: String,
    },
    CarbonCreditsTransferred {
        from: Address,
        to: Address,
        amount: String,
    },
}

impl EventData {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlantationRegistered { .. } => "PlantationRegistered",
            Self::PlantationVerified { .. } => "PlantationVerified",
            Self::CarbonCreditsMinted { .. } => "CarbonCreditsMinted",
            Self::CarbonCreditsTransferred { .. } => "CarbonCreditsTransferred",
        }
    }
}

/// An event together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    #[serde(flatten)]
    pub data: EventData,
    pub block_number: u64,
    pub transaction_hash: TxHash,
}

/// Human-readable rendering of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub title: String,
    pub description: String,
    pub details: String,
    pub explorer_url: String,
}

impl ChainEvent {
    fn new(data: EventData, log: &Log) -> Self {
        metrics::record_event(data.kind());
        Self {
            data,
            block_number: log.block_number.unwrap_or_default(),
            transaction_hash: log.transaction_hash.unwrap_or_default(),
        }
    }

    /// Title, description and details for display, plus the explorer link.
    pub fn describe(&self, network: &NetworkConfig) -> EventSummary {
        let (title, description, details) = match &self.data {
            EventData::PlantationRegistered { id, implementer, location } => (
                "New Plantation Registered",
                format!("Plantation #{} registered at {}", id, location),
                format!("By {}", format_address(implementer)),
            ),
            EventData::PlantationVerified { id, verifier } => (
                "Plantation Verified",
                format!("Plantation #{} has been verified", id),
                format!("By {}", format_address(verifier)),
            ),
            EventData::CarbonCreditsMinted { to, amount } => (
                "Carbon Credits Minted",
                format!("{} BCC minted", two_decimals(amount)),
                format!("To {}", format_address(to)),
            ),
            EventData::CarbonCreditsTransferred { from, to, amount } => (
                "Carbon Credits Transferred",
                format!("{} BCC transferred", two_decimals(amount)),
                format!("From {} to {}", format_address(from), format_address(to)),
            ),
        };

        EventSummary {
            title: title.to_string(),
            description,
            details,
            explorer_url: network.tx_url(&self.transaction_hash.to_string()),
        }
    }
}

fn two_decimals(amount: &str) -> String {
    format!("{:.2}", amount.parse::<f64>().unwrap_or(0.0))
}

/// Classify a plantation registry log.
pub fn classify_registry_log(log: &Log) -> Option<ChainEvent> {
    if let Ok(decoded) = log.log_decode::<PlantationRegistry::PlantationRegistered>() {
        let event = decoded.inner.data;
        return Some(ChainEvent::new(
            EventData::PlantationRegistered {
                id: event.id.to_string(),
                implementer: event.implementer,
                location: event.location,
            },
            log,
        ));
    }

    if let Ok(decoded) = log.log_decode::<PlantationRegistry::PlantationVerified>() {
        let event = decoded.inner.data;
        return Some(ChainEvent::new(
            EventData::PlantationVerified {
                id: event.id.to_string(),
                verifier: event.verifier,
            },
            log,
        ));
    }

    None
}

/// Classify a credit token log. Transfers from the zero address are mints.
pub fn classify_credit_log(log: &Log) -> Option<ChainEvent> {
    let decoded = log.log_decode::<BlueCarbonCredit::Transfer>().ok()?;
    let transfer = decoded.inner.data;
    let amount = format_ether(transfer.value);

    let data = if transfer.from == Address::ZERO {
        EventData::CarbonCreditsMinted { to: transfer.to, amount }
    } else {
        EventData::CarbonCreditsTransferred {
            from: transfer.from,
            to: transfer.to,
            amount,
        }
    };
    Some(ChainEvent::new(data, log))
}

/// Classify a log from either contract.
pub fn classify_log(log: &Log) -> Option<ChainEvent> {
    classify_registry_log(log).or_else(|| classify_credit_log(log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, U256};
    use alloy::sol_types::SolEvent;

    use crate::blockchain::types::one_token;

    const USER: Address = address!("6fcD6344267F2D7C4D09914437A06ceF3Fc2E304");
    const OTHER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const TX: TxHash = b256!("1111111111111111111111111111111111111111111111111111111111111111");

    fn rpc_log<E: SolEvent>(event: &E, block: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: event.encode_log_data(),
            },
            block_number: Some(block),
            transaction_hash: Some(TX),
            ..Default::default()
        }
    }

    #[test]
    fn test_mint_vs_transfer() {
        let mint = BlueCarbonCredit::Transfer {
            from: Address::ZERO,
            to: USER,
            value: U256::from(125u64) * one_token(),
        };
        let event = classify_credit_log(&rpc_log(&mint, 10)).unwrap();
        assert_eq!(
            event.data,
            EventData::CarbonCreditsMinted {
                to: USER,
                amount: "125.0".to_string()
            }
        );
        assert_eq!(event.block_number, 10);

        let transfer = BlueCarbonCredit::Transfer {
            from: USER,
            to: OTHER,
            value: one_token(),
        };
        let event = classify_log(&rpc_log(&transfer, 11)).unwrap();
        assert_eq!(event.data.kind(), "CarbonCreditsTransferred");
    }

    #[test]
    fn test_registry_events() {
        let registered = PlantationRegistry::PlantationRegistered {
            id: U256::from(3u64),
            implementer: USER,
            location: "Sundarbans".to_string(),
        };
        let event = classify_registry_log(&rpc_log(&registered, 5)).unwrap();
        assert_eq!(event.data.kind(), "PlantationRegistered");

        let verified = PlantationRegistry::PlantationVerified {
            id: U256::from(3u64),
            verifier: OTHER,
        };
        let event = classify_log(&rpc_log(&verified, 6)).unwrap();
        assert_eq!(
            event.data,
            EventData::PlantationVerified {
                id: "3".to_string(),
                verifier: OTHER
            }
        );
    }

    #[test]
    fn test_unrelated_log_is_ignored() {
        assert!(classify_log(&Log::default()).is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let event = ChainEvent {
            data: EventData::PlantationVerified {
                id: "3".to_string(),
                verifier: OTHER,
            },
            block_number: 6,
            transaction_hash: TX,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlantationVerified");
        assert_eq!(json["data"]["id"], "3");
        assert_eq!(json["blockNumber"], 6);
        assert!(json["transactionHash"].is_string());
    }

    #[test]
    fn test_describe() {
        let event = ChainEvent {
            data: EventData::CarbonCreditsTransferred {
                from: USER,
                to: OTHER,
                amount: "12.5".to_string(),
            },
            block_number: 1,
            transaction_hash: TX,
        };
        let summary = event.describe(&NetworkConfig::default());
        assert_eq!(summary.title, "Carbon Credits Transferred");
        assert_eq!(summary.description, "12.50 BCC transferred");
        assert_eq!(summary.details, "From 0x6fcD...E304 to 0xf39F...2266");
        assert!(summary
            .explorer_url
            .starts_with("https://sepolia.etherscan.io/tx/0x1111"));
    }
}
