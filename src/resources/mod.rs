//! Resource directory
//!
//! ## Responsibilities
//!
//! - Map incident kinds to required resource categories
//! - Map resource categories to ordered receiver addresses
//! - Static configuration, loadable from a JSON file

use crate::error::{Error, Result};
use crate::incident::Incident;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Static dispatch configuration.
///
/// `incident_resources` keys are lowercase incident kinds; receiver lists
/// keep their configured order, which is also the notification order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDirectory {
    pub incident_resources: HashMap<String, Vec<String>>,
    pub resource_receivers: HashMap<String, Vec<String>>,
}

impl Default for ResourceDirectory {
    fn default() -> Self {
        let incident_resources = HashMap::from([
            ("fire".to_string(), vec!["Fire Truck".to_string()]),
            ("jam".to_string(), vec!["Police".to_string()]),
            ("person hit".to_string(), vec!["Ambulance".to_string()]),
            ("crash".to_string(), vec!["Police".to_string()]),
        ]);
        let resource_receivers = HashMap::from([
            ("Ambulance".to_string(), vec![]),
            ("Fire Truck".to_string(), vec![]),
            ("Police".to_string(), vec![]),
        ]);
        Self {
            incident_resources,
            resource_receivers,
        }
    }
}

impl ResourceDirectory {
    /// Load from a JSON file; falls back to the built-in mapping when no
    /// path is configured.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                let directory: ResourceDirectory = serde_json::from_str(&raw)?;
                tracing::info!(
                    path = %p.display(),
                    resources = directory.resource_receivers.len(),
                    "Loaded resource directory"
                );
                Ok(directory)
            }
            None => {
                tracing::warn!("RESOURCE_CONFIG not set, using built-in resource directory");
                Ok(Self::default())
            }
        }
    }

    /// Union of required resource categories over the active incidents.
    ///
    /// Lookup is case-insensitive on the incident kind; an unmapped kind
    /// (Normal Flow in particular) contributes nothing. The result is
    /// sorted for deterministic downstream iteration.
    pub fn required_resources(&self, active: &[Incident]) -> Vec<String> {
        let mut required = BTreeSet::new();
        for incident in active {
            if let Some(resources) = self.incident_resources.get(incident.kind.key()) {
                required.extend(resources.iter().cloned());
            }
        }
        required.into_iter().collect()
    }

    /// Configured receivers for one resource category, in notification order
    pub fn receivers_for(&self, resource: &str) -> &[String] {
        self.resource_receivers
            .get(resource)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, resources) in &self.incident_resources {
            for resource in resources {
                if !self.resource_receivers.contains_key(resource) {
                    return Err(Error::Config(format!(
                        "incident '{}' maps to resource '{}' with no receiver list",
                        kind, resource
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Incident;

    fn directory_with_receivers() -> ResourceDirectory {
        let mut directory = ResourceDirectory::default();
        directory
            .resource_receivers
            .insert("Police".to_string(), vec!["+10000000001".to_string()]);
        directory.resource_receivers.insert(
            "Ambulance".to_string(),
            vec!["+10000000002".to_string(), "+10000000003".to_string()],
        );
        directory
    }

    #[test]
    fn test_union_over_active_incidents() {
        let directory = directory_with_receivers();
        let active = vec![Incident::crash(), Incident::jam(), Incident::person_hit()];
        // Crash and Jam both need Police; the union holds it once
        assert_eq!(
            directory.required_resources(&active),
            vec!["Ambulance".to_string(), "Police".to_string()]
        );
    }

    #[test]
    fn test_normal_flow_needs_nothing() {
        let directory = directory_with_receivers();
        assert!(directory
            .required_resources(&[Incident::normal_flow()])
            .is_empty());
        assert!(directory.required_resources(&[]).is_empty());
    }

    #[test]
    fn test_receivers_keep_configured_order() {
        let directory = directory_with_receivers();
        assert_eq!(
            directory.receivers_for("Ambulance"),
            &["+10000000002".to_string(), "+10000000003".to_string()]
        );
        assert!(directory.receivers_for("Helicopter").is_empty());
    }

    #[test]
    fn test_validate_rejects_dangling_resource() {
        let mut directory = ResourceDirectory::default();
        directory
            .incident_resources
            .insert("flood".to_string(), vec!["Boat".to_string()]);
        assert!(directory.validate().is_err());
    }
}
