//! 服务连接 - 基础设施层
//!
//! 持有检查服务的地址和连接状态，只暴露"建立连接"的能力

use std::fmt;

use tokio::net::{lookup_host, TcpStream};
use tokio::sync::watch;
use tracing::debug;

use crate::error::CheckError;

/// 连接状态（进程级，由检查客户端持有）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// 服务端关闭了连接，表示响应已完整
    ClosedByPeer,
}

impl fmt::Display for ServiceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceConnectionState::Disconnected => "未连接",
            ServiceConnectionState::Connecting => "连接中",
            ServiceConnectionState::Connected => "已连接",
            ServiceConnectionState::ClosedByPeer => "服务端已关闭",
        };
        f.write_str(name)
    }
}

/// 检查服务连接
pub struct ServiceConnection {
    endpoint: String,
    state: watch::Sender<ServiceConnectionState>,
}

impl ServiceConnection {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ServiceConnectionState::Disconnected);
        Self {
            endpoint: endpoint.into(),
            state,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ServiceConnectionState {
        *self.state.borrow()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<ServiceConnectionState> {
        self.state.subscribe()
    }

    pub fn set_state(&self, state: ServiceConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("连接状态: {} → {}", previous, state);
        }
    }

    /// 建立新连接
    ///
    /// 拒绝连接 → `ConnectionRefused`；无法解析或其他连接错误 → `HostUnreachable`
    pub async fn connect(&self) -> Result<TcpStream, CheckError> {
        self.set_state(ServiceConnectionState::Connecting);
        match self.try_connect().await {
            Ok(stream) => {
                self.set_state(ServiceConnectionState::Connected);
                Ok(stream)
            }
            Err(e) => {
                self.set_state(ServiceConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<TcpStream, CheckError> {
        let addrs: Vec<_> = lookup_host(self.endpoint.as_str())
            .await
            .map_err(|source| CheckError::HostUnreachable {
                endpoint: self.endpoint.clone(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        let err = last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "地址解析结果为空")
        });
        Err(CheckError::from_connect(self.endpoint.clone(), err))
    }
}
