//! Model Router for task-based model selection
//!
//! Each advisor task (chat replies, spending analysis, conversation titles)
//! can run on its own model with its own timeout. A model that keeps failing
//! is set aside for a while and the fallback model takes over.
//!
//! ## Configuration Resolution
//!
//! 1. Override in the data dir (~/.local/share/budgee/config/models.toml)
//! 2. Embedded defaults (compiled into binary)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/models.toml");

/// Advisor tasks that can be routed to different models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Conversational replies
    Chat,
    /// Spending analysis over the whole ledger
    Analysis,
    /// Short conversation titles
    Title,
}

impl TaskType {
    /// Config key for this task type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Analysis => "analysis",
            Self::Title => "title",
        }
    }

    pub fn all() -> &'static [TaskType] {
        &[Self::Chat, Self::Analysis, Self::Title]
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "analysis" => Ok(Self::Analysis),
            "title" => Ok(Self::Title),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

/// Configuration for a specific task type
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    /// Model for this task; the default model when unset
    pub model: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Default)]
struct ModelHealth {
    failures: u32,
    unhealthy_since: Option<Instant>,
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub default_model: String,
    pub default_timeout: Duration,
    /// Used when the primary model is unhealthy
    pub fallback_model: Option<String>,
    pub tasks: HashMap<TaskType, TaskConfig>,
    /// Consecutive failures before a model is marked unhealthy
    pub failure_threshold: u32,
    /// How long an unhealthy model is skipped
    pub recovery_wait: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.2".to_string(),
            default_timeout: Duration::from_secs(60),
            fallback_model: None,
            tasks: HashMap::new(),
            failure_threshold: 3,
            recovery_wait: Duration::from_secs(300),
        }
    }
}

/// Model Router for task-based model selection
pub struct ModelRouter {
    config: RouterConfig,
    health: HashMap<String, ModelHealth>,
    config_path: Option<PathBuf>,
}

impl ModelRouter {
    /// Load the override file if present, else the embedded defaults
    pub fn new() -> Result<Self> {
        let config_path = default_config_path();
        let config = load_config(config_path.as_ref())?;
        Ok(Self {
            config,
            health: HashMap::new(),
            config_path,
        })
    }

    pub fn with_config_path(path: PathBuf) -> Result<Self> {
        let config = load_config(Some(&path))?;
        Ok(Self {
            config,
            health: HashMap::new(),
            config_path: Some(path),
        })
    }

    /// Create with an explicit configuration (for testing)
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            health: HashMap::new(),
            config_path: None,
        }
    }

    /// Use `model` as the default for every task without its own model
    pub fn set_default_model(&mut self, model: &str) {
        self.config.default_model = model.to_string();
    }

    /// Model to use for a task, skipping unhealthy models
    pub fn model_for_task(&self, task: TaskType) -> &str {
        let primary = self
            .config
            .tasks
            .get(&task)
            .and_then(|c| c.model.as_deref())
            .unwrap_or(self.config.default_model.as_str());

        if self.is_healthy(primary) {
            return primary;
        }

        if let Some(ref fallback) = self.config.fallback_model {
            if self.is_healthy(fallback) {
                return fallback;
            }
        }

        // Everything is unhealthy: let the primary fail loudly
        primary
    }

    pub fn timeout_for_task(&self, task: TaskType) -> Duration {
        self.config
            .tasks
            .get(&task)
            .map(|c| c.timeout)
            .unwrap_or(self.config.default_timeout)
    }

    pub fn record_success(&mut self, model: &str) {
        self.health.remove(model);
    }

    /// Record a failed call, returns true if the model is now unhealthy
    pub fn record_failure(&mut self, model: &str) -> bool {
        let threshold = self.config.failure_threshold;
        let health = self.health.entry(model.to_string()).or_default();
        health.failures += 1;

        if health.failures >= threshold {
            if health.unhealthy_since.is_none() {
                warn!(model, failures = health.failures, "Model marked unhealthy");
            }
            health.unhealthy_since = Some(Instant::now());
            return true;
        }
        false
    }

    pub fn is_healthy(&self, model: &str) -> bool {
        match self.health.get(model) {
            Some(health) if health.failures >= self.config.failure_threshold => health
                .unhealthy_since
                .map(|since| since.elapsed() >= self.config.recovery_wait)
                .unwrap_or(false),
            _ => true,
        }
    }

    pub fn fallback_model(&self) -> Option<&str> {
        self.config.fallback_model.as_deref()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> Result<()> {
        self.config = load_config(self.config_path.as_ref())?;
        Ok(())
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_config(RouterConfig::default()))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("budgee").join("config").join("models.toml"))
}

fn load_config(override_path: Option<&PathBuf>) -> Result<RouterConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::InvalidData(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    defaults: Option<RawDefaults>,
    models: Option<HashMap<String, RawTaskConfig>>,
    health: Option<RawHealth>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    model: Option<String>,
    timeout_secs: Option<u64>,
    fallback_model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTaskConfig {
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawHealth {
    failure_threshold: Option<u32>,
    recovery_wait_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<RouterConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = RouterConfig::default();

    if let Some(defaults) = raw.defaults {
        if let Some(model) = defaults.model {
            config.default_model = model;
        }
        if let Some(timeout) = defaults.timeout_secs {
            config.default_timeout = Duration::from_secs(timeout);
        }
        config.fallback_model = defaults.fallback_model;
    }

    for (task_name, task_config) in raw.models.unwrap_or_default() {
        let Ok(task) = task_name.parse::<TaskType>() else {
            warn!(task = %task_name, "Ignoring unknown task in model config");
            continue;
        };

        config.tasks.insert(
            task,
            TaskConfig {
                model: task_config.model,
                timeout: task_config
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(config.default_timeout),
            },
        );
    }

    if let Some(health) = raw.health {
        if let Some(threshold) = health.failure_threshold {
            config.failure_threshold = threshold;
        }
        if let Some(wait) = health.recovery_wait_secs {
            config.recovery_wait = Duration::from_secs(wait);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.default_model, "llama3.2");
        assert_eq!(config.fallback_model.as_deref(), Some("gemma3"));
        assert_eq!(config.tasks.len(), 3);
        assert_eq!(
            config.tasks[&TaskType::Analysis].timeout,
            Duration::from_secs(120)
        );
        assert!(config.tasks[&TaskType::Title].model.is_none());
    }

    #[test]
    fn test_task_type_round_trip() {
        for task in TaskType::all() {
            assert_eq!(task.as_str().parse::<TaskType>().unwrap(), *task);
        }
        assert!("vision".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_unknown_task_ignored() {
        let config = parse_config(
            r#"
            [models.vision]
            model = "llava"
            [models.chat]
            model = "mistral"
            "#,
        )
        .unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[&TaskType::Chat].model.as_deref(), Some("mistral"));
    }

    #[test]
    fn test_router_model_selection() {
        let mut tasks = HashMap::new();
        tasks.insert(
            TaskType::Title,
            TaskConfig {
                model: Some("tinyllama".to_string()),
                timeout: Duration::from_secs(10),
            },
        );

        let router = ModelRouter::with_config(RouterConfig {
            default_model: "llama3.2".to_string(),
            tasks,
            ..Default::default()
        });

        assert_eq!(router.model_for_task(TaskType::Chat), "llama3.2");
        assert_eq!(router.model_for_task(TaskType::Title), "tinyllama");

        let mut router = router;
        router.set_default_model("mistral");
        assert_eq!(router.model_for_task(TaskType::Chat), "mistral");
        assert_eq!(router.model_for_task(TaskType::Title), "tinyllama");
        assert_eq!(router.timeout_for_task(TaskType::Title), Duration::from_secs(10));
        assert_eq!(router.timeout_for_task(TaskType::Chat), Duration::from_secs(60));
    }

    #[test]
    fn test_health_tracking() {
        let mut router = ModelRouter::with_config(RouterConfig {
            failure_threshold: 2,
            ..Default::default()
        });

        assert!(router.is_healthy("test-model"));

        assert!(!router.record_failure("test-model"));
        assert!(router.is_healthy("test-model"));

        assert!(router.record_failure("test-model"));
        assert!(!router.is_healthy("test-model"));

        router.record_success("test-model");
        assert!(router.is_healthy("test-model"));
    }

    #[test]
    fn test_unhealthy_model_recovers_after_wait() {
        let mut router = ModelRouter::with_config(RouterConfig {
            failure_threshold: 1,
            recovery_wait: Duration::ZERO,
            ..Default::default()
        });

        router.record_failure("flaky");
        assert!(router.is_healthy("flaky"));
    }

    #[test]
    fn test_fallback_on_unhealthy() {
        let mut router = ModelRouter::with_config(RouterConfig {
            default_model: "primary".to_string(),
            fallback_model: Some("fallback".to_string()),
            failure_threshold: 1,
            ..Default::default()
        });

        assert_eq!(router.model_for_task(TaskType::Chat), "primary");

        router.record_failure("primary");
        assert_eq!(router.model_for_task(TaskType::Chat), "fallback");

        // Both down: stay on the primary
        router.record_failure("fallback");
        assert_eq!(router.model_for_task(TaskType::Chat), "primary");
    }
}
