//! Plugin Loader
//!
//! Discovers external plugin manifests in the configured directories and wraps
//! each one in an [`ExternalPlugin`] that runs the declared executable as a
//! subprocess per call.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::sdk::{CallableSchema, Plugin, PluginContext};

/// File-name suffix that marks a plugin manifest.
pub const DEFAULT_MANIFEST_SUFFIX: &str = ".plugin.json";

/// Env var carrying the call arguments (also written to stdin).
const ARGS_ENV: &str = "CLARA_PLUGIN_ARGS";
/// Env var carrying the plugin's configured settings, when present.
const SETTINGS_ENV: &str = "CLARA_PLUGIN_SETTINGS";

/// Scan each directory (non-recursively) for manifests ending in `suffix`.
///
/// Directories that do not exist are treated as empty. Entries are returned
/// in file-name order within each directory, directories in the given order.
/// The first unreadable or invalid manifest aborts discovery.
pub fn discover(dirs: &[PathBuf], suffix: &str) -> Result<Vec<ExternalPlugin>, PluginError> {
    let mut found = Vec::new();
    for dir in dirs {
        if !dir.exists() {
            debug!(dir = %dir.display(), "Plugin directory missing; skipping");
            continue;
        }

        let entries = std::fs::read_dir(dir).map_err(|source| PluginError::Discovery {
            path: dir.clone(),
            source,
        })?;

        let mut manifests = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PluginError::Discovery {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix));
            if matches {
                manifests.push(path);
            }
        }
        manifests.sort();

        for path in manifests {
            info!(manifest = %path.display(), "Discovered plugin manifest");
            found.push(ExternalPlugin::from_manifest_path(&path)?);
        }
    }
    Ok(found)
}

/// A plugin backed by an executable declared in a manifest.
#[derive(Debug)]
pub struct ExternalPlugin {
    manifest: PluginManifest,
    manifest_path: PathBuf,
    base_dir: PathBuf,
    command: PathBuf,
    settings: Option<String>,
}

impl ExternalPlugin {
    pub fn from_manifest_path(path: &Path) -> Result<Self, PluginError> {
        let manifest = PluginManifest::from_file(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(manifest, path.to_path_buf(), base_dir))
    }

    pub fn new(manifest: PluginManifest, manifest_path: PathBuf, base_dir: PathBuf) -> Self {
        let command = manifest.resolve_command(&base_dir);
        Self {
            manifest,
            manifest_path,
            base_dir,
            command,
            settings: None,
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }
}

#[async_trait]
impl Plugin for ExternalPlugin {
    async fn init(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        if self.manifest.is_path_like() {
            if !self.command.is_file() {
                return Err(PluginError::Execution(format!(
                    "command {} does not exist",
                    self.command.display()
                )));
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = std::fs::metadata(&self.command)
                    .map(|m| m.permissions().mode())
                    .unwrap_or(0);
                if mode & 0o111 == 0 {
                    return Err(PluginError::Execution(format!(
                        "command {} is not executable",
                        self.command.display()
                    )));
                }
            }
        }

        let settings = ctx.settings_for(&self.manifest.id);
        if !settings.is_null() {
            self.settings = Some(settings.to_string());
        }
        debug!(plugin = %self.manifest.id, command = %self.command.display(), "External plugin ready");
        Ok(())
    }

    fn id(&self) -> &str {
        &self.manifest.id
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn schema(&self) -> CallableSchema {
        self.manifest.schema.clone()
    }

    async fn execute(&self, arguments: &str) -> Result<String, PluginError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.manifest.args)
            .envs(&self.manifest.env)
            .env(ARGS_ENV, arguments)
            .current_dir(&self.base_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(settings) = &self.settings {
            command.env(SETTINGS_ENV, settings);
        }

        let mut child = command.spawn().map_err(|e| {
            PluginError::Execution(format!("failed to spawn {}: {e}", self.command.display()))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // Plugins that only read the env var may exit before draining stdin.
            if let Err(e) = stdin.write_all(arguments.as_bytes()).await {
                debug!(plugin = %self.manifest.id, error = %e, "Plugin did not read stdin");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PluginError::Execution(format!("failed to wait for plugin: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(plugin = %self.manifest.id, status = %output.status, "Plugin exited with failure");
            return Err(PluginError::Execution(if stderr.is_empty() {
                format!("plugin exited with {}", output.status)
            } else {
                stderr
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn call_timeout(&self) -> Option<Duration> {
        self.manifest.timeout_secs.map(Duration::from_secs)
    }
}
