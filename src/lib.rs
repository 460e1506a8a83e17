//! # Exercise Extractor
//!
//! 从教材扫描页中抽取练习题和配图，并补全答案与评分标准的流水线
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `ArtifactStore` - 按 (书籍, 章节, 阶段) 存取检查点，断点续跑的唯一依据
//! - `PageCache` - 章节级页面图片临时目录
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/` - 内容加载、提示词、模型响应校验
//! - `clients/` - 外部服务接口（模型 / 版面检测 / 对象存储 / 图片工具）及其实现
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 章节流水线的各个阶段
//! - `ChapterCtx` - 上下文封装（book_id + chapter_id）
//! - 页面解析 → 题目抽取 → 配图提取 → 配图关联 → 解题 → 评分
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/book_processor` - 书籍处理器，筛选章节并汇总统计
//! - `orchestrator/chapter_processor` - 单个章节处理器，状态机与续跑
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::Collaborators;
pub use config::Config;
pub use error::{PipelineError, Result, ValidationError};
pub use infrastructure::{ArtifactKey, ArtifactStore, FsArtifactStore, MemoryArtifactStore, Stage};
pub use models::{Question, ScoredQuestion, SolvedQuestion};
pub use orchestrator::{App, BookStats, ChapterReport, ChapterState};
pub use workflow::ChapterCtx;
