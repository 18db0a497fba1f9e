/// 检查服务客户端
///
/// 一次请求 = 一个段落：建立连接，写入一行文本，逐行累积响应直到服务端关闭连接，
/// 然后把累积的内容作为一个完整片段解析。
///
/// 协议没有长度或结束标记，服务端关闭连接即表示响应完整。
/// 关闭之前读到的部分内容绝不能被解析。
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::config::Config;
use crate::error::CheckError;
use crate::infrastructure::{ServiceConnection, ServiceConnectionState};
use crate::services::response_parser::{parse_response, ParsedResponse};
use crate::utils::truncate_text;

/// 发往服务端的一次请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub id: u64,
    /// 单行段落文本（不含换行）
    pub text: String,
    /// 配置变化后需要先发送的指令行
    pub directive: Option<String>,
}

impl CheckRequest {
    /// 线上格式：可选的指令行，随后是以换行结尾的文本行
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = String::with_capacity(self.text.len() + 1);
        if let Some(directive) = &self.directive {
            payload.push_str(directive);
            payload.push('\n');
        }
        payload.push_str(&self.text);
        payload.push('\n');
        payload.into_bytes()
    }
}

/// 检查服务客户端
pub struct CheckerClient {
    connection: ServiceConnection,
}

impl CheckerClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            connection: ServiceConnection::new(endpoint),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint())
    }

    pub fn state(&self) -> ServiceConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &ServiceConnection {
        &self.connection
    }

    /// 提交一个段落并等待完整响应
    pub async fn submit(&self, request: &CheckRequest) -> Result<ParsedResponse, CheckError> {
        let stream = self.connection.connect().await?;
        let result = self.exchange(stream, request).await;
        self.connection.set_state(ServiceConnectionState::Disconnected);
        result
    }

    /// 在已建立的连接上完成一次请求 / 响应
    pub async fn exchange<S>(&self, stream: S, request: &CheckRequest) -> Result<ParsedResponse, CheckError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(stream);

        debug!(
            "发送请求 #{}: '{}'",
            request.id,
            truncate_text(&request.text, 60)
        );
        let writer = reader.get_mut();
        writer
            .write_all(&request.payload())
            .await
            .map_err(|source| CheckError::SocketWrite { source })?;
        writer
            .flush()
            .await
            .map_err(|source| CheckError::SocketWrite { source })?;

        let mut response = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|source| CheckError::SocketRead { source })?;
            if n == 0 {
                break;
            }
            response.push_str(&String::from_utf8_lossy(&line));
        }
        self.connection
            .set_state(ServiceConnectionState::ClosedByPeer);
        debug!("请求 #{} 的响应: {}", request.id, truncate_text(response.trim(), 200));

        let parsed = parse_response(&response);
        for fragment in &parsed.skipped {
            debug!(
                "{}",
                CheckError::MalformedFragment {
                    fragment: truncate_text(fragment, 80),
                }
            );
        }
        Ok(parsed)
    }
}
