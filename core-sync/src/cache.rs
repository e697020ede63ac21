//! Read-through caches for vault lookups
//!
//! Templates and protocols are immutable once fetched; both caches live for
//! one pipeline run and are never invalidated within it.

use bridge_traits::vault::{MappingTemplate, VaultGateway};
use core_validate::Protocol;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

pub struct TemplateCache {
    vault: Arc<dyn VaultGateway>,
    templates: HashMap<String, MappingTemplate>,
}

impl TemplateCache {
    pub fn new(vault: Arc<dyn VaultGateway>) -> Self {
        Self {
            vault,
            templates: HashMap::new(),
        }
    }

    pub async fn get(&mut self, mapping_template_id: &str) -> Result<&MappingTemplate> {
        if !self.templates.contains_key(mapping_template_id) {
            debug!(mapping_template_id, "fetching mapping template");
            let template = self.vault.get_mapping_template(mapping_template_id).await?;
            self.templates
                .insert(mapping_template_id.to_string(), template);
        }
        Ok(&self.templates[mapping_template_id])
    }
}

pub struct ProtocolCache {
    vault: Arc<dyn VaultGateway>,
    protocols: HashMap<String, Protocol>,
}

impl ProtocolCache {
    pub fn new(vault: Arc<dyn VaultGateway>) -> Self {
        Self {
            vault,
            protocols: HashMap::new(),
        }
    }

    pub async fn get(&mut self, name: &str) -> Result<&Protocol> {
        if !self.protocols.contains_key(name) {
            debug!(protocol = name, "fetching protocol");
            let def = self.vault.get_protocol(name).await?;
            self.protocols.insert(name.to_string(), Protocol::from(def));
        }
        Ok(&self.protocols[name])
    }

    /// Resolve every protocol referenced by the template's readout columns
    /// and return them keyed by name, ready for the validator.
    pub async fn for_template(
        &mut self,
        template: &MappingTemplate,
    ) -> Result<HashMap<String, Protocol>> {
        let mut resolved = HashMap::new();
        for mapping in &template.header_mappings {
            if let Some(name) = mapping.definition.protocol_name.as_deref() {
                if !resolved.contains_key(name) {
                    let protocol = self.get(name).await?;
                    resolved.insert(name.to_string(), protocol.clone());
                }
            }
        }
        Ok(resolved)
    }
}
