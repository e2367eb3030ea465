/// Plugin registry: loads, initializes and indexes plugins by id.
///
/// Populated once at startup and read-only afterwards; share it behind an
/// `Arc` once [`PluginRegistry::load_all`] has returned.
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::envelope::PluginResponse;
use crate::error::PluginError;
use crate::loader::discover;
use crate::sdk::{CallableSchema, Plugin, PluginContext};

/// Default upper bound for a single plugin call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PluginRegistry {
    plugins: HashMap<String, Box<dyn Plugin>>,
    /// Registration order, for reproducible prompts.
    order: Vec<String>,
    call_timeout: Duration,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            order: Vec::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Initialize and register every candidate, all or nothing.
    ///
    /// The first duplicate id or failed `init` empties the registry and is
    /// returned as the error.
    pub async fn load_all(
        &mut self,
        candidates: Vec<Box<dyn Plugin>>,
        ctx: &PluginContext,
    ) -> Result<usize, PluginError> {
        self.reset();

        for mut plugin in candidates {
            let id = plugin.id().to_string();
            if self.plugins.contains_key(&id) {
                warn!(plugin = %id, "Duplicate plugin id; aborting load");
                self.reset();
                return Err(PluginError::DuplicateId { id });
            }

            debug!(plugin = %id, "Initializing plugin");
            if let Err(e) = plugin.init(ctx).await {
                warn!(plugin = %id, error = %e, "Plugin init failed; aborting load");
                self.reset();
                return Err(PluginError::init(id, e));
            }

            info!(plugin = %id, "[Plugins] Loaded");
            self.order.push(id.clone());
            self.plugins.insert(id, plugin);
        }

        Ok(self.plugins.len())
    }

    /// Register `builtins` followed by every manifest found in `dirs`.
    pub async fn load_from_dirs(
        &mut self,
        builtins: Vec<Box<dyn Plugin>>,
        dirs: &[PathBuf],
        suffix: &str,
        ctx: &PluginContext,
    ) -> Result<usize, PluginError> {
        let external = match discover(dirs, suffix) {
            Ok(found) => found,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        let mut candidates = builtins;
        candidates.extend(
            external
                .into_iter()
                .map(|plugin| Box::new(plugin) as Box<dyn Plugin>),
        );
        self.load_all(candidates, ctx).await
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn lookup(&self, id: &str) -> Option<&dyn Plugin> {
        self.plugins.get(id).map(|p| p.as_ref())
    }

    /// Execute plugin `id` and wrap the outcome in a response envelope.
    ///
    /// Unknown ids, plugin errors, timeouts and panics all come back as
    /// `PluginResponse::Error`.
    pub async fn invoke(&self, id: &str, arguments: &str) -> PluginResponse {
        let Some(plugin) = self.plugins.get(id) else {
            warn!(plugin = %id, "Call to unknown plugin");
            return PluginResponse::Error(PluginError::NotFound(id.to_string()).to_string());
        };

        let limit = plugin.call_timeout().unwrap_or(self.call_timeout);
        let call = AssertUnwindSafe(plugin.execute(arguments)).catch_unwind();

        let outcome = match tokio::time::timeout(limit, call).await {
            Err(_) => Err(PluginError::Timeout {
                id: id.to_string(),
                after: limit,
            }),
            Ok(Err(panic)) => Err(PluginError::Panicked {
                id: id.to_string(),
                message: panic_message(panic.as_ref()),
            }),
            Ok(Ok(result)) => result,
        };

        if let Err(e) = &outcome {
            warn!(plugin = %id, error = %e, "Plugin call failed");
        } else {
            debug!(plugin = %id, "Plugin call succeeded");
        }
        PluginResponse::from(outcome)
    }

    /// Callable schemas in registration order.
    pub fn all_schemas(&self) -> Vec<CallableSchema> {
        self.iter().map(|p| p.schema()).collect()
    }

    /// `(id, description)` pairs in registration order.
    pub fn descriptors(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|p| (p.id().to_string(), p.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.order
            .iter()
            .filter_map(|id| self.plugins.get(id).map(|p| p.as_ref()))
    }

    fn reset(&mut self) {
        self.plugins.clear();
        self.order.clear();
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct TestPlugin {
        id: String,
        fail_init: bool,
        initialized: bool,
    }

    impl TestPlugin {
        fn boxed(id: &str) -> Box<dyn Plugin> {
            Box::new(Self { id: id.into(), fail_init: false, initialized: false })
        }

        fn failing(id: &str) -> Box<dyn Plugin> {
            Box::new(Self { id: id.into(), fail_init: true, initialized: false })
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        async fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            if self.fail_init {
                return Err(PluginError::Execution("missing api key".into()));
            }
            self.initialized = true;
            Ok(())
        }

        fn id(&self) -> &str {
            &self.id
        }

        fn description(&self) -> &str {
            "test plugin"
        }

        fn schema(&self) -> CallableSchema {
            CallableSchema {
                name: self.id.clone(),
                description: "test plugin".into(),
                parameters: json!({ "type": "object", "properties": {} }),
            }
        }

        async fn execute(&self, arguments: &str) -> Result<String, PluginError> {
            assert!(self.initialized);
            let args: Value = serde_json::from_str(arguments)
                .map_err(|e| PluginError::InvalidArguments(e.to_string()))?;
            match args.get("mode").and_then(Value::as_str) {
                Some("fail") => Err(PluginError::Execution("it broke".into())),
                Some("panic") => panic!("plugin exploded"),
                Some("hang") => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".into())
                }
                _ => Ok(format!("{}:{}", self.id, arguments)),
            }
        }
    }

    fn envelope_keys(response: &PluginResponse) -> Vec<String> {
        let value: Value = serde_json::from_str(&response.to_json()).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    async fn loaded(ids: &[&str]) -> PluginRegistry {
        let mut registry = PluginRegistry::new().with_call_timeout(Duration::from_millis(100));
        let candidates = ids.iter().map(|id| TestPlugin::boxed(id)).collect();
        registry.load_all(candidates, &PluginContext::default()).await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_load_and_lookup() {
        let registry = loaded(&["alpha", "beta"]).await;
        assert_eq!(registry.len(), 2);
        assert!(registry.is_loaded("alpha"));
        assert!(!registry.is_loaded("gamma"));
        assert_eq!(registry.lookup("beta").map(|p| p.id()), Some("beta"));
    }

    #[tokio::test]
    async fn test_failed_init_empties_registry() {
        let mut registry = loaded(&["old"]).await;
        let candidates = vec![
            TestPlugin::boxed("alpha"),
            TestPlugin::failing("weather"),
            TestPlugin::boxed("beta"),
        ];
        let err = registry
            .load_all(candidates, &PluginContext::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("weather"));
        assert!(registry.is_empty());
        assert!(!registry.is_loaded("alpha"));
        assert!(registry.all_schemas().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let mut registry = PluginRegistry::new();
        let candidates = vec![TestPlugin::boxed("alpha"), TestPlugin::boxed("alpha")];
        let err = registry
            .load_all(candidates, &PluginContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::DuplicateId { ref id } if id == "alpha"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_unknown_id_is_error_envelope() {
        let registry = loaded(&["alpha"]).await;
        let response = registry.invoke("nope", "{}").await;
        assert_eq!(response, PluginResponse::Error("plugin with ID nope not found".into()));
        assert_eq!(envelope_keys(&response), vec!["error"]);
    }

    #[tokio::test]
    async fn test_invoke_wraps_every_outcome() {
        let registry = loaded(&["alpha"]).await;

        let ok = registry.invoke("alpha", r#"{"x":1}"#).await;
        assert_eq!(ok, PluginResponse::Result(r#"alpha:{"x":1}"#.into()));

        let failed = registry.invoke("alpha", r#"{"mode":"fail"}"#).await;
        assert_eq!(failed, PluginResponse::Error("it broke".into()));

        let bad_json = registry.invoke("alpha", "not json").await;
        assert!(bad_json.is_error());

        for response in [ok, failed, bad_json] {
            assert_eq!(envelope_keys(&response).len(), 1);
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_error() {
        let registry = loaded(&["alpha"]).await;
        let response = registry.invoke("alpha", r#"{"mode":"panic"}"#).await;
        match response {
            PluginResponse::Error(msg) => assert!(msg.contains("plugin exploded")),
            other => panic!("expected error, got {other:?}"),
        }
        // Still usable afterwards.
        assert!(!registry.invoke("alpha", "{}").await.is_error());
    }

    #[tokio::test]
    async fn test_timeout_becomes_error() {
        let registry = loaded(&["alpha"]).await;
        let response = registry.invoke("alpha", r#"{"mode":"hang"}"#).await;
        match response {
            PluginResponse::Error(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_plugin_killed_at_manifest_timeout() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("slow.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 2\ntouch finished\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let manifest = json!({
            "id": "slow",
            "description": "Never answers in time",
            "command": "./slow.sh",
            "timeout_secs": 1,
            "schema": {
                "name": "slow",
                "description": "Never answers in time",
                "parameters": { "type": "object", "properties": {} }
            }
        });
        std::fs::write(tmp.path().join("slow.plugin.json"), manifest.to_string()).unwrap();

        // Registry default is far longer than the manifest's own limit.
        let mut registry = PluginRegistry::new().with_call_timeout(Duration::from_secs(30));
        registry
            .load_from_dirs(
                Vec::new(),
                &[tmp.path().to_path_buf()],
                crate::loader::DEFAULT_MANIFEST_SUFFIX,
                &PluginContext::default(),
            )
            .await
            .unwrap();

        let started = Instant::now();
        let response = registry.invoke("slow", "{}").await;
        let elapsed = started.elapsed();

        match response {
            PluginResponse::Error(msg) => assert_eq!(msg, "plugin 'slow' timed out after 1s"),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1800), "returned after {elapsed:?}");

        // The script was killed, so it never reaches its last line.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!tmp.path().join("finished").exists());
    }

    #[tokio::test]
    async fn test_schemas_follow_registration_order() {
        let registry = loaded(&["zulu", "alpha", "mike"]).await;
        let names: Vec<String> = registry.all_schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
        assert_eq!(registry.descriptors()[0], ("zulu".to_string(), "test plugin".to_string()));
    }

    #[tokio::test]
    async fn test_load_from_dirs_combines_builtins_and_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = json!({
            "id": "weather",
            "description": "Weather lookup",
            "command": "weather-cli",
            "schema": {
                "name": "weather",
                "description": "Weather lookup",
                "parameters": { "type": "object", "properties": {} }
            }
        });
        std::fs::write(tmp.path().join("weather.plugin.json"), manifest.to_string()).unwrap();

        let mut registry = PluginRegistry::new();
        let count = registry
            .load_from_dirs(
                vec![TestPlugin::boxed("alpha")],
                &[tmp.path().to_path_buf(), tmp.path().join("generated")],
                crate::loader::DEFAULT_MANIFEST_SUFFIX,
                &PluginContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.descriptors()[1].0, "weather");
    }
}
