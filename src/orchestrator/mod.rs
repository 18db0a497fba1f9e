//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层决定"什么时候检查哪个段落"，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `coordinator` - 遍历协调器
//! - 维护检查会话和遍历游标
//! - 寻找需要检查的段落，保证线路上最多一个请求
//! - 校验段落身份后写入标注
//! - 处理连接失败、服务启动和空闲重试
//! - 不做任何 IO，只返回要执行的动作
//!
//! ### `engine` - 检查引擎
//! - 持有协调器和检查客户端
//! - 单任务事件循环，从邮箱读取命令、定时器和请求结果
//! - 执行协调器返回的动作（发请求、挂定时器、通知用户）
//!
//! ### `events` - 邮箱消息
//!
//! ## 层次关系
//!
//! ```text
//! engine (事件循环 + 执行动作)
//!     ↓
//! coordinator (状态机)
//!     ↓
//! services (能力层：解析 / 过滤 / 服务监管)
//!     ↓
//! clients / infrastructure (连接、子进程)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：coordinator 管状态，engine 管执行
//! 2. **单线程状态**：只有 engine 的事件循环会修改遍历状态
//! 3. **向下依赖**：编排层 → services → clients → infrastructure

pub mod coordinator;
pub mod engine;
pub mod events;

// 重新导出主要类型
pub use coordinator::{Coordinator, Phase};
pub use engine::{Engine, EngineHandle, Notifier};
pub use events::{Action, Command, Event, Wake, WakeKind};
