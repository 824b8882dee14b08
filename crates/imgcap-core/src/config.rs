//! Configuration module
//!
//! Credentials and endpoint settings are discovered once, when the host loads
//! the node, and resolved into an explicit [`CaptionConfig`] that is injected
//! into the node. The process environment is read but never modified.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CaptionError, CaptionResult};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const TIMEOUT_VAR: &str = "OPENAI_TIMEOUT_SECS";
pub const HOST_ROOT_VAR: &str = "IMGCAP_HOST_ROOT";
pub const PLUGIN_ROOT_VAR: &str = "IMGCAP_PLUGIN_ROOT";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const ENV_FILE_NAME: &str = ".env";

/// What to do when none of the candidate `.env` files exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvFallback {
    /// Try dotenvy's default search (working directory and its ancestors)
    #[default]
    DefaultLoader,
    /// Use the process environment only
    Disabled,
}

/// Ordered list of candidate `.env` locations. The first one that exists wins.
#[derive(Debug, Clone)]
pub struct EnvSearch {
    candidates: Vec<PathBuf>,
    fallback: EnvFallback,
}

impl EnvSearch {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            fallback: EnvFallback::default(),
        }
    }

    /// Build the standard candidate list: host application root, plugin
    /// root, current working directory, then the bare relative path.
    pub fn from_roots(host_root: Option<&Path>, plugin_root: Option<&Path>) -> Self {
        let mut candidates = Vec::with_capacity(4);
        if let Some(root) = host_root {
            candidates.push(root.join(ENV_FILE_NAME));
        }
        if let Some(root) = plugin_root {
            candidates.push(root.join(ENV_FILE_NAME));
        }
        if let Ok(cwd) = env::current_dir() {
            candidates.push(cwd.join(ENV_FILE_NAME));
        }
        candidates.push(PathBuf::from(ENV_FILE_NAME));
        Self::new(candidates)
    }

    /// Roots come from `IMGCAP_HOST_ROOT` and `IMGCAP_PLUGIN_ROOT`. Without
    /// the latter, the plugin root is the parent of the executable's directory.
    pub fn discover() -> Self {
        let host_root = env::var_os(HOST_ROOT_VAR).map(PathBuf::from);
        let plugin_root = env::var_os(PLUGIN_ROOT_VAR)
            .map(PathBuf::from)
            .or_else(executable_root);
        Self::from_roots(host_root.as_deref(), plugin_root.as_deref())
    }

    pub fn with_fallback(mut self, fallback: EnvFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn fallback(&self) -> EnvFallback {
        self.fallback
    }

    fn find(&self) -> Option<&PathBuf> {
        self.candidates.iter().find(|p| p.is_file())
    }
}

impl Default for EnvSearch {
    fn default() -> Self {
        Self::discover()
    }
}

fn executable_root() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    exe.parent()?.parent().map(Path::to_path_buf)
}

/// Resolved settings for the caption node.
///
/// The API key is optional here: its absence is only an error when a caption
/// is requested, see [`CaptionConfig::require_api_key`].
#[derive(Clone)]
pub struct CaptionConfig {
    api_key: Option<String>,
    pub base_url: String,
    /// Request timeout; `None` leaves the HTTP client default in place
    pub timeout: Option<Duration>,
    /// Every `.env` location that was considered, in search order
    pub checked: Vec<PathBuf>,
    pub loaded_from: Option<PathBuf>,
}

// Never print the key.
impl fmt::Debug for CaptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("checked", &self.checked)
            .field("loaded_from", &self.loaded_from)
            .finish()
    }
}

impl CaptionConfig {
    /// Configuration with an explicit key and default endpoint
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            checked: Vec::new(),
            loaded_from: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load from the first existing candidate of `search`, falling back to
    /// the process environment for anything the file does not set. When no
    /// candidate exists, dotenvy's default search only fills in what the
    /// process environment leaves unset.
    pub fn load(search: &EnvSearch) -> Self {
        Self::load_with(search, |key| env::var(key).ok())
    }

    /// Same as [`CaptionConfig::load`] with an injectable process-environment lookup.
    pub fn load_with<F>(search: &EnvSearch, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load_from_sources(search, lookup, default_loader_vars)
    }

    /// Precedence: candidate file, then process environment, then the
    /// default-search fallback. Only a candidate file overrides process values.
    fn load_from_sources<F, D>(search: &EnvSearch, lookup: F, default_loader: D) -> Self
    where
        F: Fn(&str) -> Option<String>,
        D: FnOnce() -> HashMap<String, String>,
    {
        let (file_vars, fallback_vars, loaded_from) = match search.find() {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loaded .env");
                (read_env_file(path), HashMap::new(), Some(path.clone()))
            }
            None => {
                tracing::warn!(
                    checked = ?search.candidates(),
                    ".env not found in any candidate location"
                );
                let fallback_vars = match search.fallback() {
                    EnvFallback::DefaultLoader => default_loader(),
                    EnvFallback::Disabled => HashMap::new(),
                };
                (HashMap::new(), fallback_vars, None)
            }
        };

        let resolve = |key: &str| {
            file_vars
                .get(key)
                .cloned()
                .or_else(|| lookup(key))
                .or_else(|| fallback_vars.get(key).cloned())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = resolve(BASE_URL_VAR)
            .map(normalize_base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = resolve(TIMEOUT_VAR)
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            api_key: resolve(API_KEY_VAR),
            base_url,
            timeout,
            checked: search.candidates().to_vec(),
            loaded_from,
        }
    }

    /// The API key, or a configuration error naming every checked location.
    pub fn require_api_key(&self) -> CaptionResult<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CaptionError::Configuration {
                checked: self.checked.clone(),
            })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn read_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => collect_vars(iter),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read .env");
            HashMap::new()
        }
    }
}

fn default_loader_vars() -> HashMap<String, String> {
    match dotenvy::dotenv_iter() {
        Ok(iter) => {
            tracing::info!("Loaded .env through default search");
            collect_vars(iter)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Default .env search found nothing");
            HashMap::new()
        }
    }
}

fn collect_vars<I>(iter: I) -> HashMap<String, String>
where
    I: Iterator<Item = dotenvy::Result<(String, String)>>,
{
    let mut vars = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping malformed .env line"),
        }
    }
    vars
}
