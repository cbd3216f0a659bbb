//! Organization records as read from the persistence store.

use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;

/// Postal address fields. All optional; stores are inconsistent about them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Address {
    /// Single-line rendering, skipping missing parts.
    pub fn one_line(&self) -> String {
        let locality = match (&self.city, &self.state) {
            (Some(city), Some(state)) => Some(format!("{}, {}", city, state)),
            (Some(city), None) => Some(city.clone()),
            (None, Some(state)) => Some(state.clone()),
            (None, None) => None,
        };

        [self.street.clone(), locality, self.postal_code.clone()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A healthcare organization with a fixed location.
///
/// Owned by the persistence store; the engine only reads it and shares it
/// as `Arc<Organization>` across market views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    /// Organization type (hospital, clinic, skilled nursing, ...)
    #[serde(rename = "type", default)]
    pub org_type: String,
    /// Health system / network affiliation
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub address: Address,
}

impl Organization {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        coordinate: Coordinate,
        org_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate,
            org_type: org_type.into(),
            network: None,
            address: Address::default(),
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_one_line() {
        let address = Address {
            street: Some("615 S New Ballas Rd".to_string()),
            city: Some("St. Louis".to_string()),
            state: Some("MO".to_string()),
            postal_code: Some("63141".to_string()),
        };
        assert_eq!(address.one_line(), "615 S New Ballas Rd St. Louis, MO 63141");
        assert_eq!(Address::default().one_line(), "");
    }

    #[test]
    fn test_organization_deserializes_type_field() {
        let json = r#"{
            "id": "org-1",
            "name": "Mercy Hospital",
            "coordinate": { "latitude": 38.64, "longitude": -90.44 },
            "type": "hospital"
        }"#;

        let org: Organization = serde_json::from_str(json).unwrap();
        assert_eq!(org.org_type, "hospital");
        assert!(org.network.is_none());
        assert_eq!(org.address, Address::default());
    }
}
