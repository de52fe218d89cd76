use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Number dialed when no caretaker is configured.
pub const DEFAULT_EMERGENCY_NUMBER: &str = "101";

/// The number the automatic call will go to, with a label suitable for the
/// countdown alert text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    pub number: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ContactSettings {
    caretaker_number: Option<String>,
}

/// Holds the emergency-contact configuration.
///
/// Writers (a settings screen, typically) replace the value wholesale;
/// readers resolve it only at the moment a call target is needed, so an
/// update made mid-countdown is honored by the eventual call.
pub struct ContactStore {
    path: Option<PathBuf>,
    data: RwLock<ContactSettings>,
}

impl ContactStore {
    /// In-memory store with no caretaker configured.
    pub fn new() -> Self {
        Self {
            path: None,
            data: RwLock::new(ContactSettings::default()),
        }
    }

    /// File-backed store: loads existing settings (a malformed file falls
    /// back to defaults) and persists every update.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read contacts from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            ContactSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn caretaker(&self) -> Option<String> {
        self.data.read().unwrap().caretaker_number.clone()
    }

    /// Replaces the caretaker number. Whitespace is trimmed and an empty
    /// string unsets the caretaker; last writer wins.
    pub fn set_caretaker(&self, number: Option<String>) -> Result<()> {
        let normalized = number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut guard = self.data.write().unwrap();
        guard.caretaker_number = normalized;
        if self.path.is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }

    /// Picks the number the automatic call should go to. Pure read of the
    /// current configuration, no side effects.
    pub fn resolve_target(&self) -> ResolvedTarget {
        match self.caretaker() {
            Some(number) => ResolvedTarget {
                number,
                label: "your caretaker".to_string(),
            },
            None => ResolvedTarget {
                number: DEFAULT_EMERGENCY_NUMBER.to_string(),
                label: format!("emergency services ({DEFAULT_EMERGENCY_NUMBER})"),
            },
        }
    }

    fn persist(&self, data: &ContactSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write contacts to {}", path.display()))
    }
}

impl Default for ContactStore {
    fn default() -> Self {
        Self::new()
    }
}
