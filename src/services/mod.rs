//! 业务能力层：无状态的能力，只处理数据
//!
//! - `content_store` - 书籍 / 章节文档加载
//! - `prompts` - 各调用点的提示词
//! - `response_validation` - 模型响应解析与修复

pub mod content_store;
pub mod prompts;
pub mod response_validation;

pub use content_store::ContentStore;
pub use prompts::Prompts;
pub use response_validation::{parse_image_urls, parse_questions, parse_questions_object};
