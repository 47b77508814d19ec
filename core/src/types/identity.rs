//! Module identities — the `TYPE-StaticIdentifier-instance` composite key.
//!
//! Identifiers are split on `-`, so none of the three parts may contain a
//! hyphen. `ModuleIdentity::parse` rejects anything that does not split into
//! exactly three non-empty parts rather than guessing where a part ends.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;


const DELIMITER: char = '-';
const INSTANCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const INSTANCE_LEN: usize = 6;

/// Static identifier of the one pane that may only run once.
pub const SUPERVISOR_PANE: &str = "SupervisorPane";


/// The fixed vocabulary of module categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleType {
    System,
    Service,
    User,
}


impl ModuleType {
    pub const ALL: [ModuleType; 3] = [ModuleType::System, ModuleType::Service, ModuleType::User];

    /// Wire form: `SYSTEM`, `SERVICE`, `USER`.
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::System => "SYSTEM",
            ModuleType::Service => "SERVICE",
            ModuleType::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<ModuleType> {
        let s = s.trim();
        ModuleType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}


impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Lowercased leading segment of any accepted identifier form.
///
/// `"SERVICE-NvidiaPane-9f3k2l"` gives `"service"`, a bare `"Supervisor"`
/// gives `"supervisor"`, and empty input gives `""`.
pub fn canonical_key(raw: &str) -> String {
    raw.trim()
        .split(DELIMITER)
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}


/// `canonical_key` for an optional identifier; `None` gives `""`.
pub fn canonical_key_opt(raw: Option<&str>) -> String {
    raw.map(canonical_key).unwrap_or_default()
}


/// One pane instance: `{moduleType, staticIdentifier, instanceId}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleIdentity {
    pub module_type: ModuleType,
    pub static_identifier: String,
    pub instance_id: String,
}


impl ModuleIdentity {
    pub fn new(
        module_type: ModuleType,
        static_identifier: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        ModuleIdentity {
            module_type,
            static_identifier: static_identifier.into(),
            instance_id: instance_id.into(),
        }
    }

    /// A new identity with a fresh random instance token.
    pub fn generate(module_type: ModuleType, static_identifier: impl Into<String>) -> Self {
        Self::new(module_type, static_identifier, new_instance_id())
    }

    /// Parse the three-part composite form.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = raw.trim().split(DELIMITER).collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(ValidationError::MalformedIdentity(raw.to_string()));
        }
        let module_type = ModuleType::parse(parts[0])
            .ok_or_else(|| ValidationError::UnknownModuleType(parts[0].to_string()))?;
        Ok(ModuleIdentity::new(module_type, parts[1], parts[2]))
    }

    /// Registry key of the component class this instance renders.
    pub fn component_key(&self) -> String {
        canonical_key(&self.static_identifier)
    }

    /// True for the SYSTEM SupervisorPane, of which only one may run.
    pub fn is_singleton(&self) -> bool {
        self.module_type == ModuleType::System && self.static_identifier == SUPERVISOR_PANE
    }
}


impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.module_type, DELIMITER, self.static_identifier, DELIMITER, self.instance_id
        )
    }
}


/// Random lowercase base-36 token, e.g. `9f3k2l`.
pub fn new_instance_id() -> String {
    let mut rng = rand::rng();
    (0..INSTANCE_LEN)
        .map(|_| INSTANCE_ALPHABET[rng.random_range(0..INSTANCE_ALPHABET.len())] as char)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_extracts_type() {
        assert_eq!(canonical_key("SERVICE-NvidiaPane-9f3k2l"), "service");
        assert_eq!(canonical_key("Supervisor"), "supervisor");
        assert_eq!(canonical_key("  USER-Notes-x  "), "user");
    }

    #[test]
    fn canonical_key_is_total() {
        assert_eq!(canonical_key(""), "");
        assert_eq!(canonical_key("-"), "");
        assert_eq!(canonical_key_opt(None), "");
        assert_eq!(canonical_key_opt(Some("SYSTEM-Status-default")), "system");
    }

    #[test]
    fn parse_and_display_agree() {
        let id = ModuleIdentity::parse("SYSTEM-SupervisorPane-abc123").unwrap();
        assert_eq!(id.module_type, ModuleType::System);
        assert_eq!(id.static_identifier, "SupervisorPane");
        assert_eq!(id.instance_id, "abc123");
        assert_eq!(id.to_string(), "SYSTEM-SupervisorPane-abc123");
    }

    #[test]
    fn parse_accepts_lowercase_type() {
        let id = ModuleIdentity::parse("service-NvidiaPane-1").unwrap();
        assert_eq!(id.module_type, ModuleType::Service);
        assert_eq!(id.to_string(), "SERVICE-NvidiaPane-1");
    }

    #[test]
    fn parse_rejects_ambiguous_hyphens() {
        assert!(matches!(
            ModuleIdentity::parse("USER-My-Pane-abc"),
            Err(ValidationError::MalformedIdentity(_))
        ));
        assert!(ModuleIdentity::parse("USER--abc").is_err());
        assert!(ModuleIdentity::parse("supervisor").is_err());
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert_eq!(
            ModuleIdentity::parse("WIDGET-Clock-1"),
            Err(ValidationError::UnknownModuleType("WIDGET".into()))
        );
    }

    #[test]
    fn generated_instances_are_short_and_distinct() {
        let a = ModuleIdentity::generate(ModuleType::User, "NotesPane");
        let b = ModuleIdentity::generate(ModuleType::User, "NotesPane");
        assert_eq!(a.instance_id.len(), INSTANCE_LEN);
        assert!(a.instance_id.bytes().all(|c| INSTANCE_ALPHABET.contains(&c)));
        assert_ne!(a, b);
    }

    #[test]
    fn only_system_supervisor_is_singleton() {
        assert!(ModuleIdentity::new(ModuleType::System, "SupervisorPane", "a").is_singleton());
        assert!(!ModuleIdentity::new(ModuleType::User, "SupervisorPane", "a").is_singleton());
        assert!(!ModuleIdentity::new(ModuleType::System, "StatusPane", "a").is_singleton());
    }

    #[test]
    fn component_key_lowercases_static_identifier() {
        let id = ModuleIdentity::new(ModuleType::Service, "NvidiaPane", "x");
        assert_eq!(id.component_key(), "nvidiapane");
    }
}
