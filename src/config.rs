use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::normalize::key_of;
use crate::time::YearWindow;

/// Static role → permitted-class table. Role and class names are stored as
/// lowercase keys so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    /// Roles that see every row regardless of class.
    pub admin_roles: Vec<String>,
    pub classes: BTreeMap<String, Vec<String>>,
}

impl RoleTable {
    pub fn canonical() -> Self {
        let entry = |role: &str, classes: &[&str]| -> (String, Vec<String>) {
            (role.to_string(), classes.iter().map(|c| c.to_string()).collect())
        };
        RoleTable {
            admin_roles: vec!["admin".into(), "super user".into(), "superuser".into()],
            classes: BTreeMap::from([
                entry("marine_underwriter", &["Marine", "Marine Hull", "Cargo"]),
                entry("property_underwriter", &["Property", "Engineering"]),
                entry("casualty_underwriter", &["Casualty", "Motor", "Liability"]),
                entry("specialty_underwriter", &["Aviation", "Energy", "Political Risk"]),
                entry("life_underwriter", &["Life", "Medical"]),
                entry("finance", &["Property", "Marine", "Casualty", "Engineering", "Motor"]),
                // Viewer-only accounts are mapped but see nothing until granted classes.
                entry("viewer", &[]),
            ]),
        }
        .normalized()
    }

    /// Lowercase and trim every role and class name.
    pub fn normalized(self) -> Self {
        RoleTable {
            admin_roles: self.admin_roles.iter().map(|r| key_of(r)).collect(),
            classes: self
                .classes
                .into_iter()
                .map(|(role, classes)| (key_of(&role), classes.iter().map(|c| key_of(c)).collect()))
                .collect(),
        }
    }

    pub fn is_admin(&self, role: &str) -> bool {
        let role = key_of(role);
        self.admin_roles.iter().any(|r| *r == role)
    }

    /// Lowercase class keys the role may see; `None` if the role is unmapped.
    pub fn allowed_classes(&self, role: &str) -> Option<&[String]> {
        self.classes.get(&key_of(role)).map(Vec::as_slice)
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::canonical()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub roles: RoleTable,
    /// Window for period rollups; reports covering only the current book use
    /// [`YearWindow::REPORTING`].
    pub report_window: YearWindow,
    /// Rows listed per facet in breakdown tables.
    pub breakdown_limit: usize,
}

impl EngineConfig {
    pub fn canonical() -> Self {
        EngineConfig {
            roles: RoleTable::canonical(),
            report_window: YearWindow::REPORTING,
            breakdown_limit: 10,
        }
    }

    /// Canonical config overlaid with whatever fields the JSON file sets.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_json_str(&text).map_err(|source| EngineError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let mut config: EngineConfig = serde_json::from_str(text)?;
        config.roles = config.roles.normalized();
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::canonical()
    }
}
