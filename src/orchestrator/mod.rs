//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `book_processor` - 书籍处理器
//! - 管理应用生命周期（初始化、运行）
//! - 加载书籍和章节，按配置筛选章节
//! - 顺序处理章节，输出全局统计信息
//!
//! ### `chapter_processor` - 单个章节处理器
//! - 按顺序运行章节流水线的各阶段
//! - 维护章节状态机，处理断点续跑
//! - 持有页面缓存目录的生命周期
//!
//! ## 层次关系
//!
//! ```text
//! book_processor (处理 Vec<Chapter>)
//!     ↓
//! chapter_processor (处理单个 Chapter)
//!     ↓
//! workflow (各阶段：页面 / 抽取 / 配图 / 关联 / 解题 / 评分)
//!     ↓
//! services + clients (能力层：提示词 / 校验 / 外部服务)
//!     ↓
//! infrastructure (基础设施：检查点存储 / 页面缓存)
//! ```

pub mod book_processor;
pub mod chapter_processor;

// 重新导出主要类型
pub use book_processor::{App, BookStats};
pub use chapter_processor::{ChapterProcessor, ChapterReport, ChapterState};
