use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::ServiceOptions;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 检查服务 ---
    /// 检查服务监听的主机
    pub service_host: String,
    /// 检查服务监听的端口
    pub service_port: u16,
    /// 启动检查服务的命令
    pub service_command: String,
    /// 启动参数
    pub service_args: Vec<String>,
    /// 每个进程生命周期内最多尝试启动服务的次数
    pub max_service_launches: u32,
    /// 启动服务后等待其开始监听的时间（毫秒）
    pub launch_delay_ms: u64,

    // --- 遍历节奏 ---
    /// 没有可检查段落时的重试间隔（毫秒）
    pub idle_delay_ms: u64,
    /// 两个段落之间的间隔（毫秒）
    pub step_delay_ms: u64,
    /// 单次处理最多检查的段落数
    pub scan_budget: usize,
    /// 单轮遍历最多访问的文本单元数
    pub max_units_per_pass: usize,

    // --- 过滤 ---
    pub ignore_uppercase: bool,
    pub ignore_title_case: bool,
    pub ignored_words: Vec<String>,

    // --- 服务端规则配置 ---
    /// 启动时向服务端发送一次规则配置指令
    pub send_service_options: bool,
    pub text_language: String,
    pub mother_tongue: String,
    pub enable_grammar: bool,
    pub grammar_rules: Vec<String>,
    pub enable_false_friends: bool,
    pub false_friends_rules: Vec<String>,
    pub enable_words: bool,
    pub words_rules: Vec<String>,
    pub max_sentence_length: u32,
    pub builtin_checks: Vec<String>,

    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_host: "127.0.0.1".to_string(),
            service_port: 50100,
            service_command: "languagetool".to_string(),
            service_args: Vec::new(),
            max_service_launches: 1,
            launch_delay_ms: 2000,
            idle_delay_ms: 1000,
            step_delay_ms: 10,
            scan_budget: 512,
            max_units_per_pass: 64,
            ignore_uppercase: false,
            ignore_title_case: false,
            ignored_words: Vec::new(),
            send_service_options: false,
            text_language: "en".to_string(),
            mother_tongue: "en".to_string(),
            enable_grammar: true,
            grammar_rules: Vec::new(),
            enable_false_friends: true,
            false_friends_rules: Vec::new(),
            enable_words: true,
            words_rules: Vec::new(),
            max_sentence_length: 0,
            builtin_checks: Vec::new(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            service_host: std::env::var("BGCHECK_SERVICE_HOST").unwrap_or(self.service_host),
            service_port: env_parse("BGCHECK_SERVICE_PORT", "u16")?.unwrap_or(self.service_port),
            service_command: std::env::var("BGCHECK_SERVICE_COMMAND")
                .unwrap_or(self.service_command),
            max_service_launches: env_parse("BGCHECK_MAX_SERVICE_LAUNCHES", "u32")?
                .unwrap_or(self.max_service_launches),
            launch_delay_ms: env_parse("BGCHECK_LAUNCH_DELAY_MS", "u64")?
                .unwrap_or(self.launch_delay_ms),
            idle_delay_ms: env_parse("BGCHECK_IDLE_DELAY_MS", "u64")?.unwrap_or(self.idle_delay_ms),
            step_delay_ms: env_parse("BGCHECK_STEP_DELAY_MS", "u64")?.unwrap_or(self.step_delay_ms),
            text_language: std::env::var("BGCHECK_TEXT_LANGUAGE").unwrap_or(self.text_language),
            mother_tongue: std::env::var("BGCHECK_MOTHER_TONGUE").unwrap_or(self.mother_tongue),
            send_service_options: env_parse("BGCHECK_SEND_SERVICE_OPTIONS", "bool")?
                .unwrap_or(self.send_service_options),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            ..self
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_port == 0 {
            return Err(ConfigError::invalid("service_port", "端口不能为 0"));
        }
        if self.scan_budget == 0 {
            return Err(ConfigError::invalid("scan_budget", "必须大于 0"));
        }
        if self.max_units_per_pass == 0 {
            return Err(ConfigError::invalid("max_units_per_pass", "必须大于 0"));
        }
        Ok(())
    }

    /// 检查服务地址，形如 `127.0.0.1:50100`
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn launch_delay(&self) -> Duration {
        Duration::from_millis(self.launch_delay_ms)
    }

    /// 发送给服务端的规则配置
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            text_language: self.text_language.clone(),
            mother_tongue: self.mother_tongue.clone(),
            grammar: self.enable_grammar.then(|| self.grammar_rules.clone()),
            false_friends: self.enable_false_friends.then(|| self.false_friends_rules.clone()),
            words: self.enable_words.then(|| self.words_rules.clone()),
            max_sentence_length: self.max_sentence_length,
            builtin: self.builtin_checks.clone(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_conventions() {
        let config = Config::default();
        assert_eq!(config.endpoint(), "127.0.0.1:50100");
        assert_eq!(config.service_command, "languagetool");
        assert_eq!(config.max_service_launches, 1);
        assert_eq!(config.idle_delay(), Duration::from_secs(1));
        assert_eq!(config.step_delay(), Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            service_port = 50200
            ignored_words = ["Rustacean"]
            enable_grammar = false
            "#,
        )
        .unwrap();

        assert_eq!(config.service_port, 50200);
        assert_eq!(config.service_host, "127.0.0.1");
        assert_eq!(config.ignored_words, vec!["Rustacean".to_string()]);
        assert!(config.service_options().grammar.is_none());
        assert_eq!(config.service_options().words, Some(Vec::new()));
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = Config {
            scan_budget: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_env_overrides_defaults() {
        std::env::set_var("BGCHECK_IDLE_DELAY_MS", "250");
        let config = Config::from_env().unwrap();
        assert_eq!(config.idle_delay(), Duration::from_millis(250));
        assert_eq!(config.service_port, 50100);

        std::env::set_var("BGCHECK_IDLE_DELAY_MS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarParseFailed { ref var_name, .. } if var_name == "BGCHECK_IDLE_DELAY_MS"));
        std::env::remove_var("BGCHECK_IDLE_DELAY_MS");
    }
}
