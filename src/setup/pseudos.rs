//! Pseudopotential resolution.
//!
//! Every atomic kind in the structure needs a pseudopotential. They come
//! either from an explicit `pseudos` mapping or from a named family; the
//! library that stores families is an external collaborator behind
//! [`PseudoFamilyLookup`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why pseudopotentials could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PseudoError {
    #[error("you cannot specify both \"pseudos\" and \"pseudo_family\"")]
    BothPseudosAndFamily,

    #[error("you passed \"pseudos\" as a string - maybe you wanted to pass it as \"pseudo_family\" instead?")]
    PseudosAsString,

    #[error("\"pseudos\" must be a mapping from kind name to pseudopotential")]
    PseudosNotMapping,

    #[error("no pseudo available for element {0}")]
    MissingPseudo(String),

    #[error("pseudo family not found: {0}")]
    UnknownFamily(String),

    #[error("no default pseudo family for protocol: {0}")]
    UnknownProtocol(String),
}

/// Source of pseudopotential families.
pub trait PseudoFamilyLookup: Send + Sync {
    /// Pseudopotentials of `family` for each of `kinds`.
    fn family(&self, family: &str, kinds: &[String]) -> Result<Map<String, Value>, PseudoError>;

    /// Pseudopotentials a protocol uses when the caller gives none.
    fn protocol_default(&self, protocol: &str, kinds: &[String]) -> Result<Map<String, Value>, PseudoError>;
}

/// In-memory pseudopotential library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticPseudoLibrary {
    /// family name → element → pseudopotential
    pub families: HashMap<String, HashMap<String, Value>>,
    /// protocol name → family name
    pub protocols: HashMap<String, String>,
}

impl StaticPseudoLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_family(mut self, name: &str, pseudos: Vec<(&str, Value)>) -> Self {
        self.families.insert(
            name.to_string(),
            pseudos.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        );
        self
    }

    pub fn with_protocol(mut self, protocol: &str, family: &str) -> Self {
        self.protocols.insert(protocol.to_string(), family.to_string());
        self
    }
}

impl PseudoFamilyLookup for StaticPseudoLibrary {
    fn family(&self, family: &str, kinds: &[String]) -> Result<Map<String, Value>, PseudoError> {
        let members = self
            .families
            .get(family)
            .ok_or_else(|| PseudoError::UnknownFamily(family.to_string()))?;

        let mut pseudos = Map::new();
        for kind in kinds {
            let pseudo = members
                .get(element_of(kind))
                .ok_or_else(|| PseudoError::MissingPseudo(kind.clone()))?;
            pseudos.insert(kind.clone(), pseudo.clone());
        }
        Ok(pseudos)
    }

    fn protocol_default(&self, protocol: &str, kinds: &[String]) -> Result<Map<String, Value>, PseudoError> {
        let family = self
            .protocols
            .get(protocol)
            .ok_or_else(|| PseudoError::UnknownProtocol(protocol.to_string()))?;
        self.family(family, kinds)
    }
}

/// Element symbol of a kind name (`"Si1"` → `"Si"`, `"O_ghost"` → `"O"`).
fn element_of(kind: &str) -> &str {
    let end = kind
        .char_indices()
        .skip(1)
        .find(|(_, c)| !c.is_ascii_lowercase())
        .map_or(kind.len(), |(i, _)| i);
    &kind[..end]
}

/// Kind names listed in a structure's `kinds` array.
///
/// Entries may be plain strings or objects with a `name` field.
pub fn kind_names(structure: &Value) -> Vec<String> {
    structure
        .get("kinds")
        .and_then(Value::as_array)
        .map(|kinds| {
            kinds
                .iter()
                .filter_map(|k| match k {
                    Value::String(name) => Some(name.clone()),
                    other => other.get("name").and_then(Value::as_str).map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve the pseudopotential mapping for `structure`.
pub fn resolve_pseudos(
    structure: &Value,
    pseudos: Option<&Value>,
    pseudo_family: Option<&str>,
    protocol: &str,
    lookup: &dyn PseudoFamilyLookup,
) -> Result<Map<String, Value>, PseudoError> {
    let kinds = kind_names(structure);

    // An empty mapping counts as not given
    let explicit = match pseudos {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(Value::Object(map)) => Some(map),
        Some(Value::String(_)) => return Err(PseudoError::PseudosAsString),
        Some(_) => return Err(PseudoError::PseudosNotMapping),
    };

    let resolved = match (explicit, pseudo_family) {
        (Some(_), Some(_)) => return Err(PseudoError::BothPseudosAndFamily),
        (Some(map), None) => map.clone(),
        (None, Some(family)) => lookup.family(family, &kinds)?,
        (None, None) => lookup.protocol_default(protocol, &kinds)?,
    };

    if let Some(missing) = kinds.iter().find(|kind| !resolved.contains_key(kind.as_str())) {
        return Err(PseudoError::MissingPseudo(missing.clone()));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library() -> StaticPseudoLibrary {
        StaticPseudoLibrary::new()
            .with_family("sr-0.4", vec![("Si", json!("Si.psml")), ("O", json!("O.psml"))])
            .with_protocol("standard", "sr-0.4")
    }

    fn structure() -> Value {
        json!({"kinds": ["Si", {"name": "O"}]})
    }

    #[test]
    fn test_kind_names_accepts_strings_and_objects() {
        assert_eq!(kind_names(&structure()), vec!["Si", "O"]);
        assert!(kind_names(&json!({"cell": []})).is_empty());
    }

    #[test]
    fn test_element_of() {
        assert_eq!(element_of("Si"), "Si");
        assert_eq!(element_of("Si1"), "Si");
        assert_eq!(element_of("O_ghost"), "O");
        assert_eq!(element_of("H"), "H");
    }

    #[test]
    fn test_both_given_is_rejected() {
        let err = resolve_pseudos(
            &structure(),
            Some(&json!({"Si": "a", "O": "b"})),
            Some("sr-0.4"),
            "standard",
            &library(),
        )
        .unwrap_err();
        assert_eq!(err, PseudoError::BothPseudosAndFamily);
    }

    #[test]
    fn test_string_pseudos_rejected() {
        let err = resolve_pseudos(&structure(), Some(&json!("sr-0.4")), None, "standard", &library()).unwrap_err();
        assert_eq!(err, PseudoError::PseudosAsString);
    }

    #[test]
    fn test_explicit_pseudos_missing_kind() {
        let err = resolve_pseudos(&structure(), Some(&json!({"Si": "a"})), None, "standard", &library()).unwrap_err();
        assert_eq!(err, PseudoError::MissingPseudo("O".to_string()));
    }

    #[test]
    fn test_family_lookup() {
        let pseudos = resolve_pseudos(&structure(), None, Some("sr-0.4"), "standard", &library()).unwrap();
        assert_eq!(pseudos.get("O"), Some(&json!("O.psml")));
    }

    #[test]
    fn test_unknown_family() {
        let err = resolve_pseudos(&structure(), None, Some("nope"), "standard", &library()).unwrap_err();
        assert_eq!(err, PseudoError::UnknownFamily("nope".to_string()));
    }

    #[test]
    fn test_empty_mapping_falls_back_to_protocol() {
        let pseudos = resolve_pseudos(&structure(), Some(&json!({})), None, "standard", &library()).unwrap();
        assert_eq!(pseudos.len(), 2);
    }

    #[test]
    fn test_unknown_protocol() {
        let err = resolve_pseudos(&structure(), None, None, "stringent", &library()).unwrap_err();
        assert_eq!(err, PseudoError::UnknownProtocol("stringent".to_string()));
    }
}
