//! 检查引擎 - 编排层
//!
//! 持有协调器、检查客户端和邮箱。所有状态变化都发生在 [`Engine::run`] 这一个任务里；
//! 网络请求和定时器是短任务，只负责把结果投递回邮箱。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::clients::CheckerClient;
use crate::config::Config;
use crate::document::DocumentAdapter;
use crate::error::{AppError, AppResult, CheckError};
use crate::infrastructure::ProcessLauncher;
use crate::models::ServiceOptions;
use crate::orchestrator::coordinator::Coordinator;
use crate::orchestrator::events::{Action, Command, Event};
use crate::services::ServiceSupervisor;

/// 邮箱容量
pub const CHANNEL_BUFFER: usize = 32;

/// 用户可见错误的回调
pub type Notifier = Box<dyn Fn(&CheckError) + Send>;

/// 检查引擎
pub struct Engine<D: DocumentAdapter> {
    coordinator: Coordinator<D>,
    client: Arc<CheckerClient>,
    tx: mpsc::Sender<Event<D::Paragraph>>,
    rx: mpsc::Receiver<Event<D::Paragraph>>,
    notifier: Notifier,
}

impl<D> Engine<D>
where
    D: DocumentAdapter,
    D::Paragraph: Send + 'static,
{
    /// 按配置创建引擎，连接被拒绝时用子进程启动检查服务
    pub fn new(config: &Config, document: D) -> (Self, EngineHandle<D::Paragraph>) {
        let client = CheckerClient::from_config(config);
        let launcher = ProcessLauncher::from_config(config);
        let supervisor = ServiceSupervisor::from_config(config, Box::new(launcher));
        Self::with_parts(config, document, client, supervisor)
    }

    pub fn with_parts(
        config: &Config,
        document: D,
        client: CheckerClient,
        supervisor: ServiceSupervisor,
    ) -> (Self, EngineHandle<D::Paragraph>) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let handle = EngineHandle { tx: tx.clone() };
        let engine = Self {
            coordinator: Coordinator::new(document, supervisor, config),
            client: Arc::new(client),
            tx,
            rx,
            notifier: Box::new(|err| error!("❌ {}", err)),
        };
        (engine, handle)
    }

    /// 替换用户可见错误的回调
    pub fn with_notifier(mut self, notifier: impl Fn(&CheckError) + Send + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn handle(&self) -> EngineHandle<D::Paragraph> {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn client(&self) -> &CheckerClient {
        &self.client
    }

    pub fn coordinator(&self) -> &Coordinator<D> {
        &self.coordinator
    }

    /// 事件循环，收到 `Shutdown` 后返回
    pub async fn run(mut self) {
        info!("🚀 检查引擎启动，服务地址 {}", self.client.connection().endpoint());
        while let Some(event) = self.rx.recv().await {
            let shutdown = matches!(event, Event::Command(Command::Shutdown));
            let actions = self.coordinator.handle(event);
            if shutdown {
                break;
            }
            self.execute(actions);
        }
        info!("🛑 检查引擎已停止");
    }

    fn execute(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Submit(request) => {
                    let client = Arc::clone(&self.client);
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let outcome = client.submit(&request).await;
                        let event = Event::Exchange {
                            request_id: request.id,
                            outcome,
                        };
                        if tx.send(event).await.is_err() {
                            debug!("引擎已停止，丢弃请求 #{} 的结果", request.id);
                        }
                    });
                }
                Action::Schedule { delay, wake } => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Event::Wake(wake)).await;
                    });
                }
                Action::NotifyUser(err) => (self.notifier)(&err),
            }
        }
    }
}

/// 宿主控制引擎的句柄
pub struct EngineHandle<P> {
    tx: mpsc::Sender<Event<P>>,
}

impl<P> Clone for EngineHandle<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P> EngineHandle<P> {
    async fn send(&self, command: Command<P>) -> AppResult<()> {
        self.tx
            .send(Event::Command(command))
            .await
            .map_err(|_| AppError::Other("检查引擎已停止".to_string()))
    }

    pub async fn enable(&self, on: bool) -> AppResult<()> {
        self.send(Command::Enable(on)).await
    }

    pub async fn set_ignore_options(&self, ignore_uppercase: bool, ignore_title_case: bool) -> AppResult<()> {
        self.send(Command::SetIgnoreOptions {
            ignore_uppercase,
            ignore_title_case,
        })
        .await
    }

    pub async fn ignore_word(&self, word: impl Into<String>) -> AppResult<()> {
        self.send(Command::IgnoreWord(word.into())).await
    }

    /// 用新列表替换忽略词表
    pub async fn ignore_words(&self, words: Vec<String>) -> AppResult<()> {
        self.send(Command::IgnoreWords(words)).await
    }

    pub async fn clear_ignored(&self) -> AppResult<()> {
        self.send(Command::ClearIgnored).await
    }

    pub async fn set_service_options(&self, options: ServiceOptions) -> AppResult<()> {
        self.send(Command::SetServiceOptions(options)).await
    }

    /// 宿主删除段落后调用
    pub async fn paragraph_removed(&self, paragraph: P) -> AppResult<()> {
        self.send(Command::ParagraphRemoved(paragraph)).await
    }

    pub async fn shutdown(&self) -> AppResult<()> {
        self.send(Command::Shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::infrastructure::ServiceLauncher;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FailingLauncher(Arc<AtomicU32>);

    impl ServiceLauncher for FailingLauncher {
        fn launch(&mut self) -> Result<(), CheckError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(CheckError::SubprocessLaunch {
                command: "languagetool".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_run_loop() {
        let (doc, _) = MemoryDocument::from_paragraphs(Vec::<String>::new());
        let (engine, handle) = Engine::new(&Config::default(), doc);
        let task = tokio::spawn(engine.run());

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(handle.enable(true).await.is_err());
    }

    #[tokio::test]
    async fn test_launch_failure_reaches_notifier() {
        // 绑定后立即释放的端口，连接会被拒绝
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config {
            service_port: port,
            idle_delay_ms: 60_000,
            ..Config::default()
        };
        let (doc, _) = MemoryDocument::from_paragraphs(["Teh cat sat."]);
        let calls = Arc::new(AtomicU32::new(0));
        let supervisor = ServiceSupervisor::from_config(&config, Box::new(FailingLauncher(calls.clone())));
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();

        let (engine, handle) =
            Engine::with_parts(&config, doc, CheckerClient::from_config(&config), supervisor);
        let engine = engine.with_notifier(move |err| {
            let _ = notify_tx.send(err.to_string());
        });
        tokio::spawn(engine.run());
        handle.enable(true).await.unwrap();

        let message = tokio::time::timeout(Duration::from_secs(5), notify_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(message.contains("languagetool"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        handle.shutdown().await.unwrap();
    }
}
