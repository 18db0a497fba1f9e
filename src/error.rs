use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 检查服务相关错误
    #[error("检查错误: {0}")]
    Check(#[from] CheckError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 与检查服务交互时的错误
///
/// 除 `SubprocessLaunch` 外，所有错误都在本地恢复（回到 Seeking / Sleeping），
/// 不会向上传播。
#[derive(Debug, Error)]
pub enum CheckError {
    /// 服务端口拒绝连接（触发一次受监管的子进程启动）
    #[error("检查服务拒绝连接 ({endpoint})")]
    ConnectionRefused { endpoint: String },

    /// 主机无法解析或不可达（本次尝试失败，不重试）
    #[error("无法连接到检查服务主机 ({endpoint}): {source}")]
    HostUnreachable {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入请求失败
    #[error("发送段落文本失败: {source}")]
    SocketWrite {
        #[source]
        source: std::io::Error,
    },

    /// 读取响应失败
    #[error("读取检查结果失败: {source}")]
    SocketRead {
        #[source]
        source: std::io::Error,
    },

    /// 响应中无法识别的片段（逐条跳过，从不中断整个响应）
    #[error("无法解析的响应片段: {fragment}")]
    MalformedFragment { fragment: String },

    /// 响应对应的段落已被修改或删除
    #[error("段落已失效，丢弃请求 #{request_id} 的结果")]
    StaleParagraph { request_id: u64 },

    /// 启动检查服务子进程失败（唯一需要告知用户的错误）
    #[error("无法启动检查服务 '{command}'，请确认它在 $PATH 中: {source}")]
    SubprocessLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl CheckError {
    /// 根据连接阶段的 IO 错误分类
    pub fn from_connect(endpoint: impl Into<String>, err: std::io::Error) -> Self {
        let endpoint = endpoint.into();
        if err.kind() == std::io::ErrorKind::ConnectionRefused {
            CheckError::ConnectionRefused { endpoint }
        } else {
            CheckError::HostUnreachable {
                endpoint,
                source: err,
            }
        }
    }

    /// 是否需要展示给用户
    pub fn is_user_facing(&self) -> bool {
        matches!(self, CheckError::SubprocessLaunch { .. })
    }
}

impl ConfigError {
    /// 创建配置值错误
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
