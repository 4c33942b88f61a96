use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub gateways: GatewayConfig,
    pub analysis: AnalysisConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Hosted API routes the orchestration layer talks to.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub analyze_path: String,
    pub leads_path: String,
    pub score_path: String,
    pub draft_path: String,
    pub send_path: String,
    pub call_path: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub backend: AnalysisBackend,
    pub timeout_secs: u64,
    pub max_upload_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Tried in order until one answers.
    pub providers: Vec<LlmProviderConfig>,
    pub budget_secs: u64,
    pub max_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct LlmProviderConfig {
    pub kind: LlmProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub scoring_fanout: usize,
    pub auto_draft_threshold: u8,
    pub send_throttle_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisBackend {
    Remote,
    Llm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub gateway_base_url: Option<String>,
    pub analysis_backend: Option<AnalysisBackend>,
    pub analysis_timeout_secs: Option<u64>,
    pub send_throttle_ms: Option<u64>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://mission.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            gateways: GatewayConfig {
                base_url: "http://localhost:3000".to_string(),
                api_key: None,
                analyze_path: "/api/analyze".to_string(),
                leads_path: "/api/leads".to_string(),
                score_path: "/api/score".to_string(),
                draft_path: "/api/email/draft".to_string(),
                send_path: "/api/email/send".to_string(),
                call_path: "/api/call".to_string(),
                request_timeout_secs: 60,
            },
            analysis: AnalysisConfig {
                backend: AnalysisBackend::Remote,
                timeout_secs: 90,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            llm: LlmConfig {
                providers: vec![
                    LlmProviderConfig {
                        kind: LlmProvider::Anthropic,
                        model: "claude-3-5-sonnet-latest".to_string(),
                        base_url: None,
                        api_key: None,
                    },
                    LlmProviderConfig {
                        kind: LlmProvider::OpenAi,
                        model: "gpt-4o".to_string(),
                        base_url: None,
                        api_key: None,
                    },
                ],
                budget_secs: 80,
                max_tokens: 4_096,
            },
            pipeline: PipelineConfig {
                scoring_fanout: 5,
                auto_draft_threshold: 80,
                send_throttle_ms: 2_000,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for AnalysisBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "llm" => Ok(Self::Llm),
            other => Err(ConfigError::Validation(format!(
                "unsupported analysis backend `{other}` (expected remote|llm)"
            ))),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl LlmProviderConfig {
    pub fn resolved_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_else(|| self.kind.default_base_url())
    }
}

impl GatewayConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("mission.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(gateways) = patch.gateways {
            if let Some(base_url) = gateways.base_url {
                self.gateways.base_url = base_url;
            }
            if let Some(gateway_api_key_value) = gateways.api_key {
                self.gateways.api_key = Some(secret_value(gateway_api_key_value));
            }
            if let Some(path) = gateways.analyze_path {
                self.gateways.analyze_path = path;
            }
            if let Some(path) = gateways.leads_path {
                self.gateways.leads_path = path;
            }
            if let Some(path) = gateways.score_path {
                self.gateways.score_path = path;
            }
            if let Some(path) = gateways.draft_path {
                self.gateways.draft_path = path;
            }
            if let Some(path) = gateways.send_path {
                self.gateways.send_path = path;
            }
            if let Some(path) = gateways.call_path {
                self.gateways.call_path = path;
            }
            if let Some(request_timeout_secs) = gateways.request_timeout_secs {
                self.gateways.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(analysis) = patch.analysis {
            if let Some(backend) = analysis.backend {
                self.analysis.backend = backend;
            }
            if let Some(timeout_secs) = analysis.timeout_secs {
                self.analysis.timeout_secs = timeout_secs;
            }
            if let Some(max_upload_bytes) = analysis.max_upload_bytes {
                self.analysis.max_upload_bytes = max_upload_bytes;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(providers) = llm.providers {
                self.llm.providers = providers
                    .into_iter()
                    .map(|provider| LlmProviderConfig {
                        kind: provider.kind,
                        model: provider.model,
                        base_url: provider.base_url,
                        api_key: provider.api_key.map(secret_value),
                    })
                    .collect();
            }
            if let Some(budget_secs) = llm.budget_secs {
                self.llm.budget_secs = budget_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(scoring_fanout) = pipeline.scoring_fanout {
                self.pipeline.scoring_fanout = scoring_fanout;
            }
            if let Some(auto_draft_threshold) = pipeline.auto_draft_threshold {
                self.pipeline.auto_draft_threshold = auto_draft_threshold;
            }
            if let Some(send_throttle_ms) = pipeline.send_throttle_ms {
                self.pipeline.send_throttle_ms = send_throttle_ms;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MISSION_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MISSION_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("MISSION_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MISSION_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MISSION_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MISSION_GATEWAY_BASE_URL") {
            self.gateways.base_url = value;
        }
        if let Some(value) = read_env("MISSION_GATEWAY_API_KEY") {
            self.gateways.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("MISSION_GATEWAY_TIMEOUT_SECS") {
            self.gateways.request_timeout_secs =
                parse_u64("MISSION_GATEWAY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MISSION_ANALYSIS_BACKEND") {
            self.analysis.backend = value.parse()?;
        }
        if let Some(value) = read_env("MISSION_ANALYSIS_TIMEOUT_SECS") {
            self.analysis.timeout_secs = parse_u64("MISSION_ANALYSIS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MISSION_LLM_PROVIDERS") {
            let mut providers = Vec::new();
            for raw in value.split(',').filter(|raw| !raw.trim().is_empty()) {
                let kind: LlmProvider = raw.parse()?;
                let existing = self.llm.providers.iter().find(|provider| provider.kind == kind);
                providers.push(match existing {
                    Some(provider) => provider.clone(),
                    None => LlmProviderConfig {
                        kind,
                        model: default_model(kind).to_string(),
                        base_url: None,
                        api_key: None,
                    },
                });
            }
            self.llm.providers = providers;
        }
        for provider in &mut self.llm.providers {
            let prefix = format!("MISSION_LLM_{}", provider.kind.as_str().to_ascii_uppercase());
            if let Some(value) = read_env(&format!("{prefix}_API_KEY")) {
                provider.api_key = Some(secret_value(value));
            }
            if let Some(value) = read_env(&format!("{prefix}_MODEL")) {
                provider.model = value;
            }
            if let Some(value) = read_env(&format!("{prefix}_BASE_URL")) {
                provider.base_url = Some(value);
            }
        }
        if let Some(value) = read_env("MISSION_LLM_BUDGET_SECS") {
            self.llm.budget_secs = parse_u64("MISSION_LLM_BUDGET_SECS", &value)?;
        }

        if let Some(value) = read_env("MISSION_PIPELINE_SCORING_FANOUT") {
            self.pipeline.scoring_fanout = parse_u32("MISSION_PIPELINE_SCORING_FANOUT", &value)?
                as usize;
        }
        if let Some(value) = read_env("MISSION_PIPELINE_SEND_THROTTLE_MS") {
            self.pipeline.send_throttle_ms =
                parse_u64("MISSION_PIPELINE_SEND_THROTTLE_MS", &value)?;
        }

        if let Some(value) = read_env("MISSION_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MISSION_SERVER_PORT") {
            self.server.port = parse_u16("MISSION_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("MISSION_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MISSION_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("MISSION_LOGGING_LEVEL").or_else(|| read_env("MISSION_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MISSION_LOGGING_FORMAT").or_else(|| read_env("MISSION_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.gateway_base_url {
            self.gateways.base_url = base_url;
        }
        if let Some(backend) = overrides.analysis_backend {
            self.analysis.backend = backend;
        }
        if let Some(timeout_secs) = overrides.analysis_timeout_secs {
            self.analysis.timeout_secs = timeout_secs;
        }
        if let Some(send_throttle_ms) = overrides.send_throttle_ms {
            self.pipeline.send_throttle_ms = send_throttle_ms;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_gateways(&self.gateways)?;
        validate_analysis(&self.analysis)?;
        if self.analysis.backend == AnalysisBackend::Llm {
            validate_llm(&self.llm)?;
        }
        validate_pipeline(&self.pipeline)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn default_model(kind: LlmProvider) -> &'static str {
    match kind {
        LlmProvider::OpenAi => "gpt-4o",
        LlmProvider::Anthropic => "claude-3-5-sonnet-latest",
        LlmProvider::Ollama => "llama3.1",
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("mission.toml"), PathBuf::from("config/mission.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_gateways(gateways: &GatewayConfig) -> Result<(), ConfigError> {
    if !is_http_url(&gateways.base_url) {
        return Err(ConfigError::Validation(
            "gateways.base_url must start with http:// or https://".to_string(),
        ));
    }

    let paths = [
        ("gateways.analyze_path", &gateways.analyze_path),
        ("gateways.leads_path", &gateways.leads_path),
        ("gateways.score_path", &gateways.score_path),
        ("gateways.draft_path", &gateways.draft_path),
        ("gateways.send_path", &gateways.send_path),
        ("gateways.call_path", &gateways.call_path),
    ];
    if let Some((key, _)) = paths.iter().find(|(_, path)| !path.starts_with('/')) {
        return Err(ConfigError::Validation(format!("{key} must start with `/`")));
    }

    if gateways.request_timeout_secs == 0 || gateways.request_timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "gateways.request_timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    Ok(())
}

fn validate_analysis(analysis: &AnalysisConfig) -> Result<(), ConfigError> {
    if analysis.timeout_secs == 0 || analysis.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "analysis.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if analysis.max_upload_bytes == 0 {
        return Err(ConfigError::Validation(
            "analysis.max_upload_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.providers.is_empty() {
        return Err(ConfigError::Validation(
            "llm.providers must list at least one provider when analysis.backend = \"llm\""
                .to_string(),
        ));
    }

    if llm.budget_secs == 0 || llm.budget_secs > 600 {
        return Err(ConfigError::Validation(
            "llm.budget_secs must be in range 1..=600".to_string(),
        ));
    }

    for provider in &llm.providers {
        if provider.model.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "llm provider `{}` requires a model",
                provider.kind.as_str()
            )));
        }

        match provider.kind {
            LlmProvider::OpenAi | LlmProvider::Anthropic => {
                let missing = provider
                    .api_key
                    .as_ref()
                    .map(|value| value.expose_secret().trim().is_empty())
                    .unwrap_or(true);
                if missing {
                    return Err(ConfigError::Validation(format!(
                        "llm api_key is required for the `{}` provider \
                         (set MISSION_LLM_{}_API_KEY)",
                        provider.kind.as_str(),
                        provider.kind.as_str().to_ascii_uppercase()
                    )));
                }
            }
            LlmProvider::Ollama => {}
        }

        if !is_http_url(provider.resolved_base_url()) {
            return Err(ConfigError::Validation(format!(
                "llm base_url for `{}` must start with http:// or https://",
                provider.kind.as_str()
            )));
        }
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.scoring_fanout == 0 {
        return Err(ConfigError::Validation(
            "pipeline.scoring_fanout must be greater than zero".to_string(),
        ));
    }

    if pipeline.auto_draft_threshold > 100 {
        return Err(ConfigError::Validation(
            "pipeline.auto_draft_threshold must be in range 0..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    gateways: Option<GatewayPatch>,
    analysis: Option<AnalysisPatch>,
    llm: Option<LlmPatch>,
    pipeline: Option<PipelinePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    analyze_path: Option<String>,
    leads_path: Option<String>,
    score_path: Option<String>,
    draft_path: Option<String>,
    send_path: Option<String>,
    call_path: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPatch {
    backend: Option<AnalysisBackend>,
    timeout_secs: Option<u64>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    providers: Option<Vec<LlmProviderPatch>>,
    budget_secs: Option<u64>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LlmProviderPatch {
    kind: LlmProvider,
    model: String,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    scoring_fanout: Option<usize>,
    auto_draft_threshold: Option<u8>,
    send_throttle_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
