//! 章节处理上下文
//!
//! 封装"我正在处理哪本书的哪个章节"这一信息

use crate::infrastructure::{ArtifactKey, Stage};
use std::fmt::Display;

/// 章节处理上下文
///
/// 包含处理单个章节所需的所有上下文信息
#[derive(Debug, Clone)]
pub struct ChapterCtx {
    /// 书籍ID
    pub book_id: String,

    /// 章节ID
    pub chapter_id: String,

    /// 章节在章节文件中的下标（仅用于日志显示）
    pub chapter_index: usize,

    /// 年级学科ID
    pub grade_subject_id: String,
}

impl ChapterCtx {
    /// 创建新的章节上下文
    pub fn new(
        book_id: impl Into<String>,
        chapter_id: impl Into<String>,
        chapter_index: usize,
        grade_subject_id: impl Into<String>,
    ) -> Self {
        Self {
            book_id: book_id.into(),
            chapter_id: chapter_id.into(),
            chapter_index,
            grade_subject_id: grade_subject_id.into(),
        }
    }

    /// 本章节某阶段的检查点键
    pub fn key(&self, stage: Stage) -> ArtifactKey {
        ArtifactKey::new(&self.book_id, &self.chapter_id, stage)
    }
}

impl Display for ChapterCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[书籍 ID#{} 章节 ID#{} 序号#{}]",
            self.book_id, self.chapter_id, self.chapter_index
        )
    }
}
