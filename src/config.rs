//! Schema naming configuration

use serde::{Deserialize, Serialize};

use crate::RelayError;

/// Names used when building relay types into a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelayConfig {
    /// Name of the object identification interface
    pub node_interface: String,

    /// Name of the shared page info object
    pub page_info_type: String,

    /// Name of the correlation token on mutation inputs and payloads
    pub client_mutation_id_field: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            node_interface: "Node".to_string(),
            page_info_type: "PageInfo".to_string(),
            client_mutation_id_field: "clientMutationID".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every configured name is usable in a schema
    pub fn validate(&self) -> crate::Result<()> {
        for name in [
            &self.node_interface,
            &self.page_info_type,
            &self.client_mutation_id_field,
        ] {
            if !is_graphql_name(name) {
                return Err(RelayError::Config(format!("'{name}' is not a GraphQL name")));
            }
        }
        Ok(())
    }
}

/// `/[_A-Za-z][_0-9A-Za-z]*/`
pub(crate) fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
