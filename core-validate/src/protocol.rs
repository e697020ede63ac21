//! Parsed protocol with its condition ids extracted.

use bridge_traits::vault::ProtocolDef;
use std::collections::HashSet;

/// A vault protocol reduced to what validation needs: the set of readout
/// definition ids flagged as protocol conditions. Immutable once built.
#[derive(Debug, Clone)]
pub struct Protocol {
    pub id: u64,
    pub name: String,
    condition_ids: HashSet<u64>,
}

impl Protocol {
    /// True when the readout definition id identifies a condition column for
    /// this protocol.
    pub fn is_condition(&self, definition_id: u64) -> bool {
        self.condition_ids.contains(&definition_id)
    }
}

impl From<ProtocolDef> for Protocol {
    fn from(def: ProtocolDef) -> Self {
        let condition_ids = def
            .readout_definitions
            .iter()
            .filter(|r| r.protocol_condition)
            .map(|r| r.id)
            .collect();
        Self {
            id: def.id,
            name: def.name,
            condition_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::vault::ReadoutDefinition;

    #[test]
    fn test_condition_ids_extracted() {
        let def = ProtocolDef {
            id: 42,
            name: "Kinase Panel".into(),
            readout_definitions: vec![
                ReadoutDefinition {
                    id: 1,
                    name: "Plate".into(),
                    protocol_condition: true,
                },
                ReadoutDefinition {
                    id: 2,
                    name: "IC50".into(),
                    protocol_condition: false,
                },
            ],
        };

        let protocol = Protocol::from(def);
        assert!(protocol.is_condition(1));
        assert!(!protocol.is_condition(2));
        assert!(!protocol.is_condition(99));
    }
}
