//! 邮箱消息定义
//!
//! ```text
//! EngineHandle --Command--> ┐
//! 定时器任务   --Wake-----> ├─> Engine 邮箱 ─> Coordinator ─> Action
//! 请求任务     --Exchange-> ┘
//! ```

use std::time::Duration;

use crate::clients::CheckRequest;
use crate::error::CheckError;
use crate::models::ServiceOptions;
use crate::services::ParsedResponse;

/// 宿主发给引擎的控制命令
#[derive(Debug)]
pub enum Command<P> {
    Enable(bool),
    SetIgnoreOptions {
        ignore_uppercase: bool,
        ignore_title_case: bool,
    },
    IgnoreWord(String),
    /// 用新列表替换忽略词表
    IgnoreWords(Vec<String>),
    ClearIgnored,
    SetServiceOptions(ServiceOptions),
    ParagraphRemoved(P),
    Shutdown,
}

/// 定时器到期后要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeKind {
    /// 从当前文本单元开头重新开始一轮遍历
    Restart,
    /// 从游标处继续寻找下一个段落
    Continue,
    /// 服务启动后重试等待中的段落
    RetryPending,
}

/// 定时器消息，`epoch` 过期的消息会被忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub epoch: u64,
    pub kind: WakeKind,
}

/// 引擎邮箱中的消息
#[derive(Debug)]
pub enum Event<P> {
    Command(Command<P>),
    Wake(Wake),
    /// 一次请求结束（服务端关闭连接或出错）
    Exchange {
        request_id: u64,
        outcome: Result<ParsedResponse, CheckError>,
    },
}

/// 协调器要求引擎执行的副作用
#[derive(Debug)]
pub enum Action {
    Submit(CheckRequest),
    Schedule { delay: Duration, wake: Wake },
    /// 需要展示给用户的错误
    NotifyUser(CheckError),
}
