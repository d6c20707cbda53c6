use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::NominaError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub jail: JailConfig,
    pub shell: ShellConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `NOMINA_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("NOMINA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_env_profiled(p),
            jail: JailConfig::from_env_profiled(p),
            shell: ShellConfig::from_env_profiled(p),
            agent: AgentConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), NominaError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(NominaError::Config(format!(
                "LLM_TEMPERATURE must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.shell.timeout_secs == 0 {
            return Err(NominaError::Config("SHELL_TIMEOUT_SECS must be positive".into()));
        }
        if self.agent.max_iterations == 0 {
            return Err(NominaError::Config("AGENT_MAX_ITERATIONS must be positive".into()));
        }
        if self.agent.notify_capacity == 0 {
            return Err(NominaError::Config("AGENT_NOTIFY_CAPACITY must be positive".into()));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  llm:    base_url={}, model={}, key={}",
            self.llm.base_url,
            self.llm.model,
            if self.llm.is_configured() { "set" } else { "(none)" }
        );
        tracing::info!("  jail:   root={}", self.jail.root.display());
        tracing::info!("  shell:  timeout={}s", self.shell.timeout_secs);
        tracing::info!("  agent:  max_iterations={}", self.agent.max_iterations);
        tracing::debug!(config = %self.redacted_summary(), "effective configuration");
    }

    /// Return a redacted view safe for display (no secrets).
    fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "llm": {
                "base_url": self.llm.base_url,
                "model": self.llm.model,
                "temperature": self.llm.temperature,
                "configured": self.llm.is_configured(),
            },
            "jail": { "root": self.jail.root, "rules_file": self.jail.rules_file },
            "shell": { "timeout_secs": self.shell.timeout_secs, "extra_path": self.shell.extra_path },
            "agent": {
                "max_iterations": self.agent.max_iterations,
                "notify_capacity": self.agent.notify_capacity,
            },
        })
    }
}

// ── LLM endpoint ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// OpenAI-compatible API root; `/chat/completions` and `/models` hang off it.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Sent as `HTTP-Referer` when set.
    pub site_url: Option<String>,
    /// Sent as `X-Title` when set.
    pub site_name: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts after the first for retryable transport failures.
    pub max_retries: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            api_key: profiled_env_opt(p, "OPENROUTER_API_KEY"),
            base_url: profiled_env_or(p, "LLM_BASE_URL", "https://openrouter.ai/api/v1"),
            model: profiled_env_or(p, "LLM_MODEL", "openrouter/optimus-alpha"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 1.0),
            site_url: profiled_env_opt(p, "LLM_SITE_URL"),
            site_name: profiled_env_opt(p, "LLM_SITE_NAME"),
            timeout_secs: profiled_env_parse(p, "LLM_TIMEOUT_SECS", 120),
            max_retries: profiled_env_parse(p, "LLM_MAX_RETRIES", 2),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Sandbox root ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JailConfig {
    pub root: PathBuf,
    /// File name, relative to the root, whose text extends the system prompt.
    pub rules_file: String,
}

impl JailConfig {
    fn from_env_profiled(p: &str) -> Self {
        let root = profiled_env_opt(p, "NOMINA_JAIL_DIR")
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            root,
            rules_file: profiled_env_or(p, "NOMINA_RULES_FILE", "nomina-rules.txt"),
        }
    }

    /// Create the root if needed and return its absolute form.
    pub fn ensure_root(&self) -> Result<PathBuf, NominaError> {
        std::fs::create_dir_all(&self.root)?;
        Ok(std::fs::canonicalize(&self.root)?)
    }
}

// ── Shell ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    pub timeout_secs: u64,
    /// Prepended to the inherited `PATH` for every command.
    pub extra_path: Option<String>,
}

impl ShellConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            timeout_secs: profiled_env_parse(p, "SHELL_TIMEOUT_SECS", 30),
            extra_path: Some(profiled_env_or(p, "SHELL_EXTRA_PATH", "/usr/local/bin:/usr/bin")),
        }
    }
}

// ── Agent loop ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: usize,
    /// Queue depth between the worker and the notification observer.
    pub notify_capacity: usize,
}

impl AgentConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_iterations: profiled_env_parse(p, "AGENT_MAX_ITERATIONS", 25),
            notify_capacity: profiled_env_parse(p, "AGENT_NOTIFY_CAPACITY", 256),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests share process state; each uses its own profile prefix.

    #[test]
    fn test_defaults() {
        let config = Config::for_profile("NOMINA_TEST_DEFAULTS_UNUSED");
        assert_eq!(config.shell.timeout_secs, 30);
        assert_eq!(config.agent.max_iterations, 25);
        assert_eq!(config.jail.rules_file, "nomina-rules.txt");
        assert!(config.llm.base_url.starts_with("https://"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_profile_override() {
        env::set_var("CFGTESTA_SHELL_TIMEOUT_SECS", "5");
        env::set_var("CFGTESTA_LLM_MODEL", "test/model");
        let config = Config::for_profile("cfgtesta");
        assert_eq!(config.profile, "CFGTESTA");
        assert_eq!(config.profile_label(), "CFGTESTA");
        assert_eq!(config.shell.timeout_secs, 5);
        assert_eq!(config.llm.model, "test/model");
    }

    #[test]
    fn test_unparseable_value_falls_back() {
        env::set_var("CFGTESTB_AGENT_MAX_ITERATIONS", "many");
        let config = Config::for_profile("CFGTESTB");
        assert_eq!(config.agent.max_iterations, 25);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::for_profile("NOMINA_TEST_VALIDATE_UNUSED");
        config.shell.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(NominaError::Config(_))));
    }

    #[test]
    fn test_redacted_summary_has_no_key() {
        let mut config = Config::for_profile("NOMINA_TEST_REDACT_UNUSED");
        config.llm.api_key = Some("sk-secret".to_string());
        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("sk-secret"));
        assert!(summary.contains("\"configured\":true"));
    }

    #[test]
    fn test_ensure_root_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let jail = JailConfig {
            root: dir.path().join("nested/jail"),
            rules_file: "nomina-rules.txt".to_string(),
        };
        let root = jail.ensure_root().unwrap();
        assert!(root.is_dir());
        assert!(root.is_absolute());
    }
}
