//! 服务监管 - 业务能力层
//!
//! 连接被拒绝时按次数上限启动检查服务，并告诉协调器多久之后重试

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::CheckError;
use crate::infrastructure::ServiceLauncher;

/// 连接被拒绝后的处理结果
#[derive(Debug)]
pub enum SupervisorDecision {
    /// 服务已启动，等待后重试当前段落
    RetryAfter(Duration),
    /// 已达到启动次数上限，不再启动
    GiveUp { attempts: u32 },
    /// 启动失败，需要告知用户
    LaunchFailed(CheckError),
}

/// 服务监管器
pub struct ServiceSupervisor {
    launcher: Box<dyn ServiceLauncher>,
    launches: u32,
    max_launches: u32,
    launch_delay: Duration,
}

impl ServiceSupervisor {
    pub fn new(launcher: Box<dyn ServiceLauncher>, max_launches: u32, launch_delay: Duration) -> Self {
        Self {
            launcher,
            launches: 0,
            max_launches,
            launch_delay,
        }
    }

    pub fn from_config(config: &Config, launcher: Box<dyn ServiceLauncher>) -> Self {
        Self::new(launcher, config.max_service_launches, config.launch_delay())
    }

    /// 已尝试启动的次数
    pub fn launches(&self) -> u32 {
        self.launches
    }

    pub fn on_connection_refused(&mut self) -> SupervisorDecision {
        if self.launches >= self.max_launches {
            warn!(
                "检查服务仍然拒绝连接，已尝试启动 {} 次，不再启动",
                self.launches
            );
            return SupervisorDecision::GiveUp {
                attempts: self.launches,
            };
        }

        // 无论成功与否都计数，避免对起不来的服务反复启动
        self.launches += 1;
        match self.launcher.launch() {
            Ok(()) => {
                debug!("已启动检查服务（第 {} 次）", self.launches);
                SupervisorDecision::RetryAfter(self.launch_delay)
            }
            // 错误原样交给协调器，由通知回调统一上报
            Err(e) => SupervisorDecision::LaunchFailed(e),
        }
    }
}
