//! Host-level configuration: environment and flag overrides on top of the
//! config file, plus the derived plugin directory list.

use std::path::{Path, PathBuf};

use clara_config::ClaraConfig;

const OLLAMA_DEFAULT_PORT: u16 = 11434;

/// Values that may replace what the config file says.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub model: Option<String>,
    pub plugins_dir: Option<PathBuf>,
    pub ollama_url: Option<String>,
}

impl Overrides {
    /// Read `CLARA_MODEL`, `CLARA_PLUGINS_DIR` and `OLLAMA_URL`, falling back
    /// to Ollama's own `OLLAMA_HOST` for the backend address.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            model: non_empty("CLARA_MODEL"),
            plugins_dir: non_empty("CLARA_PLUGINS_DIR").map(PathBuf::from),
            ollama_url: non_empty("OLLAMA_URL")
                .or_else(|| non_empty("OLLAMA_HOST").map(|host| ollama_host_url(&host))),
        }
    }

    /// Layer `other` on top of `self`; values set in `other` win.
    pub fn then(self, other: Overrides) -> Self {
        Self {
            model: other.model.or(self.model),
            plugins_dir: other.plugins_dir.or(self.plugins_dir),
            ollama_url: other.ollama_url.or(self.ollama_url),
        }
    }

    pub fn apply(&self, config: &mut ClaraConfig) {
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
        if let Some(dir) = &self.plugins_dir {
            config.plugins.dir = dir.display().to_string();
        }
        if let Some(url) = &self.ollama_url {
            config.model.base_url = url.clone();
        }
    }
}

/// Base URL for an `OLLAMA_HOST` value.
///
/// A value with a scheme is used as is. A bare `host[:port]` gets `http://`
/// and the default Ollama port; an empty host means the loopback address.
fn ollama_host_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        return host.to_string();
    }
    let (name, port) = match host.rsplit_once(':') {
        // `[::1]` alone has colons but no port.
        Some((name, port)) if !port.contains(']') => (name, port.to_string()),
        _ => (host, OLLAMA_DEFAULT_PORT.to_string()),
    };
    let name = if name.is_empty() { "127.0.0.1" } else { name };
    format!("http://{name}:{port}")
}

/// `--config` when given, else `config.yaml` in the config directory.
pub fn config_path(flag: Option<&Path>) -> PathBuf {
    match flag {
        Some(path) => path.to_path_buf(),
        None => clara_config::config_file_path(&clara_config::config_dir()),
    }
}

/// The primary plugin directory followed by its generated sub-directory.
pub fn plugin_dirs(config: &ClaraConfig) -> Vec<PathBuf> {
    let primary = PathBuf::from(&config.plugins.dir);
    let generated = primary.join(&config.plugins.generated_subdir);
    vec![primary, generated]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_config_file() {
        let mut config = ClaraConfig::default();
        Overrides::from_lookup(lookup(&[
            ("CLARA_MODEL", "mistral"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("CLARA_PLUGINS_DIR", ""),
        ]))
        .apply(&mut config);

        assert_eq!(config.model.name, "mistral");
        assert_eq!(config.model.base_url, "http://gpu-box:11434");
        assert_eq!(config.plugins.dir, "plugins");
    }

    #[test]
    fn ollama_host_is_a_fallback() {
        let from_host = Overrides::from_lookup(lookup(&[("OLLAMA_HOST", "gpu-box")]));
        assert_eq!(from_host.ollama_url.as_deref(), Some("http://gpu-box:11434"));

        let both = Overrides::from_lookup(lookup(&[
            ("OLLAMA_URL", "http://primary:11434"),
            ("OLLAMA_HOST", "secondary"),
        ]));
        assert_eq!(both.ollama_url.as_deref(), Some("http://primary:11434"));

        let blank_url = Overrides::from_lookup(lookup(&[("OLLAMA_URL", " "), ("OLLAMA_HOST", "secondary:8080")]));
        assert_eq!(blank_url.ollama_url.as_deref(), Some("http://secondary:8080"));
    }

    #[test]
    fn ollama_host_forms() {
        assert_eq!(ollama_host_url("0.0.0.0"), "http://0.0.0.0:11434");
        assert_eq!(ollama_host_url("127.0.0.1:9999"), "http://127.0.0.1:9999");
        assert_eq!(ollama_host_url(":11435"), "http://127.0.0.1:11435");
        assert_eq!(ollama_host_url("https://ollama.example.com/"), "https://ollama.example.com");
        assert_eq!(ollama_host_url("[::1]"), "http://[::1]:11434");
        assert_eq!(ollama_host_url("[::1]:8000"), "http://[::1]:8000");
    }

    #[test]
    fn flags_win_over_env() {
        let env = Overrides::from_lookup(lookup(&[("CLARA_MODEL", "mistral")]));
        let flags = Overrides {
            model: Some("phi3".into()),
            plugins_dir: Some(PathBuf::from("/opt/clara/plugins")),
            ..Default::default()
        };
        let mut config = ClaraConfig::default();
        env.then(flags).apply(&mut config);

        assert_eq!(config.model.name, "phi3");
        assert_eq!(config.plugins.dir, "/opt/clara/plugins");
    }

    #[test]
    fn plugin_dirs_include_generated() {
        let mut config = ClaraConfig::default();
        config.plugins.dir = "/srv/plugins".into();
        assert_eq!(
            plugin_dirs(&config),
            vec![PathBuf::from("/srv/plugins"), PathBuf::from("/srv/plugins/generated")]
        );
    }
}
