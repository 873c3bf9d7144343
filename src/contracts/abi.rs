//! Contract bindings for the deployed credit token, plantation registry and
//! MRV contracts. Only the functions and events this crate calls are bound.

use alloy::sol;

sol! {
    /// ERC20 carbon credit token (18 decimals).
    #[sol(rpc, all_derives)]
    contract BlueCarbonCredit {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
    }
}

sol! {
    /// Plantation registry; each plantation is a token.
    #[sol(rpc, all_derives)]
    contract PlantationRegistry {
        struct Plantation {
            uint256 id;
            string location;
            uint256 area;
            string ecosystemType;
            uint256 plantationDate;
            address implementer;
            bool verified;
            string ipfsHash;
        }

        event PlantationRegistered(uint256 indexed id, address indexed implementer, string location);

        event PlantationVerified(uint256 indexed id, address indexed verifier);

        function registerPlantation(
            string location,
            uint256 area,
            string ecosystemType,
            string ipfsHash
        ) external returns (uint256);
        function getPlantation(uint256 id) external view returns (Plantation memory);
        function verifyPlantation(uint256 id) external;
        function getImplementerPlantations(address implementer) external view returns (uint256[] memory);
    }
}

sol! {
    /// Monitoring, reporting and verification contract.
    #[sol(rpc, all_derives)]
    contract BlueCarbonMRV {
        struct MonitoringReport {
            uint256 id;
            uint256 plantationId;
            address reporter;
            uint256 reportDate;
            uint256 survivalRate;
            uint256 biomass;
            uint256 carbonSequestered;
            string dataSource;
            string ipfsHash;
            bool verified;
            uint256 creditsGenerated;
        }

        function submitMonitoringReport(
            uint256 plantationId,
            uint256 survivalRate,
            uint256 biomass,
            string dataSource,
            string ipfsHash
        ) external returns (uint256);
        function verifyMonitoringReport(uint256 reportId) external;
        function getMonitoringReport(uint256 reportId) external view returns (MonitoringReport memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolEvent;

    #[test]
    fn test_event_signatures() {
        assert_eq!(
            BlueCarbonCredit::Transfer::SIGNATURE,
            "Transfer(address,address,uint256)"
        );
        assert_eq!(
            PlantationRegistry::PlantationRegistered::SIGNATURE,
            "PlantationRegistered(uint256,address,string)"
        );
        assert_eq!(
            PlantationRegistry::PlantationVerified::SIGNATURE,
            "PlantationVerified(uint256,address)"
        );
    }
}
