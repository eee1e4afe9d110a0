/// Connectivity snapshot reported by the host platform
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellularGeneration {
    #[serde(rename = "2g")]
    G2,
    #[serde(rename = "3g")]
    G3,
    #[serde(rename = "4g")]
    G4,
    #[serde(rename = "5g")]
    G5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionType {
    #[default]
    None,
    Wifi,
    Cellular(Option<CellularGeneration>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    pub connection: ConnectionType,
    /// `None` while the platform has not finished probing
    pub is_internet_reachable: Option<bool>,
}

impl Connectivity {
    pub fn wifi() -> Self {
        Self {
            connection: ConnectionType::Wifi,
            is_internet_reachable: Some(true),
        }
    }

    pub fn cellular(generation: CellularGeneration) -> Self {
        Self {
            connection: ConnectionType::Cellular(Some(generation)),
            is_internet_reachable: Some(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            connection: ConnectionType::None,
            is_internet_reachable: Some(false),
        }
    }

    pub fn is_wifi(&self) -> bool {
        self.connection == ConnectionType::Wifi
    }

    /// Link type is usable for streaming and sync (wifi or 3G+)
    pub fn has_supported_link(&self) -> bool {
        match self.connection {
            ConnectionType::Wifi => true,
            ConnectionType::Cellular(Some(generation)) => !matches!(generation, CellularGeneration::G2),
            ConnectionType::Cellular(None) | ConnectionType::None => false,
        }
    }

    /// Supported link and confirmed reachable
    pub fn is_valid(&self) -> bool {
        self.has_supported_link() && self.is_internet_reachable == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_rules() {
        assert!(Connectivity::wifi().is_valid());
        assert!(Connectivity::cellular(CellularGeneration::G4).is_valid());
        assert!(!Connectivity::cellular(CellularGeneration::G2).is_valid());
        assert!(!Connectivity::offline().is_valid());

        let unknown = Connectivity {
            connection: ConnectionType::Wifi,
            is_internet_reachable: None,
        };
        assert!(!unknown.is_valid());

        let unreachable = Connectivity {
            connection: ConnectionType::Cellular(Some(CellularGeneration::G5)),
            is_internet_reachable: Some(false),
        };
        assert!(!unreachable.is_valid());
    }
}
