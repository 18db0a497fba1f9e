//! 服务进程启动器 - 基础设施层
//!
//! 只负责"把检查服务作为子进程启动"，何时启动由 `ServiceSupervisor` 决定

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::CheckError;

/// 启动检查服务的能力
pub trait ServiceLauncher: Send {
    /// 启动服务；只报告进程能否创建，不等待服务开始监听
    fn launch(&mut self) -> Result<(), CheckError>;
}

/// 通过子进程启动检查服务
pub struct ProcessLauncher {
    command: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl ProcessLauncher {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            child: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.service_command.clone(), config.service_args.clone())
    }

    /// 已启动服务的进程号
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}

impl ServiceLauncher for ProcessLauncher {
    fn launch(&mut self) -> Result<(), CheckError> {
        debug!("尝试启动检查服务: {} {:?}", self.command, self.args);
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CheckError::SubprocessLaunch {
                command: self.command.clone(),
                source,
            })?;
        info!("✓ 检查服务已启动 (pid: {:?})", child.id());
        self.child = Some(child);
        Ok(())
    }
}
