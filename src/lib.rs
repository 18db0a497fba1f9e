//! # bgcheck
//!
//! 后台语法 / 拼写检查协调器：逐段把文档交给本地检查服务，把返回的标注写回文档
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（TCP 连接、子进程），只暴露能力
//! - `ServiceConnection` - 连接检查服务并维护连接状态
//! - `ProcessLauncher` - 把检查服务作为子进程启动
//!
//! ### ② 客户端（Clients）
//! - `CheckerClient` - 一个段落一次请求，累积响应直到服务端关闭连接
//!
//! ### ③ 业务能力层（Services）
//! - `response_parser` - 两遍扫描响应，跳过无法识别的片段
//! - `WordFilter` - 客户端侧的忽略规则
//! - `ServiceSupervisor` - 按次数上限启动检查服务
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/coordinator` - 遍历状态机，不做 IO
//! - `orchestrator/engine` - 单任务事件循环，执行状态机返回的动作
//!
//! ### 文档适配（Document）
//! - `DocumentAdapter` - 宿主文档需要实现的接口
//! - `MemoryDocument` - 内存实现，供演示程序和测试使用
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod document;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{CheckRequest, CheckerClient};
pub use config::Config;
pub use document::{DocumentAdapter, MemoryDocument, ParagraphId, UnitId};
pub use error::{AppError, AppResult, CheckError, ConfigError};
pub use models::{AnnotationKind, AnnotationSpan, ServiceOptions};
pub use orchestrator::{Coordinator, Engine, EngineHandle, Phase};
pub use services::{parse_response, ParsedResponse};
