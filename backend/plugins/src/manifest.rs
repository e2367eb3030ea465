/// External plugin manifest: describes an executable-backed plugin.
///
/// Parsed from `<name>.plugin.json` files in the plugin directories.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::sdk::CallableSchema;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub id: String,
    pub description: String,
    /// Executable to spawn; relative paths resolve against the manifest's directory.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub schema: CallableSchema,
    /// Overrides the registry-wide call timeout for this plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl PluginManifest {
    pub fn from_file(path: &Path) -> Result<Self, PluginError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PluginError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let manifest: PluginManifest =
            serde_json::from_str(&raw).map_err(|e| PluginError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        manifest.validate().map_err(|reason| PluginError::Manifest {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(manifest)
    }

    /// Validate the manifest for required fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("missing 'id'".into());
        }
        if self.command.trim().is_empty() {
            return Err("missing 'command'".into());
        }
        if self.schema.name != self.id {
            return Err(format!(
                "schema name '{}' does not match id '{}'",
                self.schema.name, self.id
            ));
        }
        if !self.schema.parameters.is_object() {
            return Err("schema 'parameters' must be a JSON object".into());
        }
        if self.timeout_secs == Some(0) {
            return Err("'timeout_secs' must be > 0".into());
        }
        Ok(())
    }

    /// Resolve `command` against `base_dir` when it looks like a path.
    pub fn resolve_command(&self, base_dir: &Path) -> PathBuf {
        let command = Path::new(&self.command);
        if command.is_absolute() || !self.is_path_like() {
            command.to_path_buf()
        } else {
            base_dir.join(command)
        }
    }

    /// Bare names like `python3` are looked up on `PATH` by the OS.
    pub fn is_path_like(&self) -> bool {
        self.command.contains('/') || self.command.contains(std::path::MAIN_SEPARATOR)
    }
}
