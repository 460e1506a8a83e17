//! 内容加载 - 业务能力层
//!
//! 读取预先导出的书籍 / 章节 JSON 文档，只读、每次运行加载一次。

use crate::error::{PipelineError, Result};
use crate::models::{Book, Chapter};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// 书籍内容存储
pub struct ContentStore {
    book_file: PathBuf,
    chapters_file: PathBuf,
}

impl ContentStore {
    pub fn new(book_file: impl Into<PathBuf>, chapters_file: impl Into<PathBuf>) -> Self {
        Self {
            book_file: book_file.into(),
            chapters_file: chapters_file.into(),
        }
    }

    /// 加载书籍：文档为数组时取第一个元素，也接受单个对象
    pub async fn load_book(&self) -> Result<Book> {
        let value = read_json(&self.book_file).await?;
        let book_value = match value {
            JsonValue::Array(mut items) => {
                if items.is_empty() {
                    return Err(PipelineError::Config(format!(
                        "书籍文件为空数组: {}",
                        self.book_file.display()
                    )));
                }
                items.swap_remove(0)
            }
            other => other,
        };

        let book: Book = serde_json::from_value(book_value)?;
        info!(
            "✓ 已加载书籍 #{} 《{}》，共 {} 页",
            book.id,
            book.title,
            book.book_text.len()
        );
        Ok(book)
    }

    /// 加载章节列表
    pub async fn load_chapters(&self) -> Result<Vec<Chapter>> {
        let value = read_json(&self.chapters_file).await?;
        let chapters: Vec<Chapter> = serde_json::from_value(value)?;
        info!("✓ 已加载 {} 个章节", chapters.len());
        Ok(chapters)
    }
}

async fn read_json(path: &Path) -> Result<JsonValue> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        PipelineError::Config(format!("无法读取文件 {}: {}", path.display(), e))
    })?;
    let value = serde_json::from_str(&content)?;
    Ok(value)
}
