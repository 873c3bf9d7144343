//! Contract interaction layer.
//!
//! # Data Flow
//! ```text
//! ContractService (failure policy, logging, metrics)
//!     → ContractGateway (raw calls; AlloyGateway in production)
//!     → abi.rs bindings over the session's read client or signer
//! ```

pub mod abi;
pub mod gateway;
pub mod service;
pub mod types;

pub use gateway::{AlloyGateway, ContractGateway};
pub use service::ContractService;
pub use types::{MonitoringReport, PlantationData, PlantationRegistration, ReportSubmission};
