use super::page_number::{string_or_int, PageNumber};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// 书籍（加载后只读）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    #[serde(deserialize_with = "string_or_int")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(deserialize_with = "string_or_int")]
    pub grade_subject_id: String,
    #[serde(default)]
    pub book_text: Vec<BookPage>,
}

/// 书籍中的一页
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_page_no: Option<PageNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_page_image_url: Option<String>,
}

impl BookPage {
    /// 同时带页码和图片 URL 时返回二者
    pub fn image_source(&self) -> Option<(&PageNumber, &str)> {
        match (&self.book_page_no, &self.pdf_page_image_url) {
            (Some(page), Some(url)) => Some((page, url.as_str())),
            _ => None,
        }
    }
}

/// 书籍章节
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(deserialize_with = "string_or_int")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chapter_text: Option<ChapterText>,
}

impl Chapter {
    /// 章节练习列表；没有 chapter_text 或没有练习时返回良性错误
    pub fn exercises(&self) -> Result<&[Exercise]> {
        let chapter_text = self
            .chapter_text
            .as_ref()
            .ok_or_else(|| PipelineError::MissingChapterText {
                chapter_id: self.id.clone(),
            })?;

        match chapter_text.exercises.as_deref() {
            Some(exercises) if !exercises.is_empty() => Ok(exercises),
            _ => Err(PipelineError::NoExercisesFound {
                chapter_id: self.id.clone(),
            }),
        }
    }

    /// 解题用的章节学习内容
    pub fn learning_content(&self) -> ChapterContent {
        match &self.chapter_text {
            Some(text) => ChapterContent {
                slos: text.slos.clone(),
                topics_content: text.topics.clone(),
            },
            None => ChapterContent::default(),
        }
    }
}

/// 章节正文
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterText {
    #[serde(default)]
    pub exercises: Option<Vec<Exercise>>,
    #[serde(default)]
    pub slos: JsonValue,
    #[serde(default)]
    pub topics: JsonValue,
}

/// 练习条目（只关心页码，其余原样保留）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub page_number: Option<PageNumber>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 章节学习内容（学习目标 + 主题正文）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChapterContent {
    #[serde(rename = "SLOs")]
    pub slos: JsonValue,
    pub topics_content: JsonValue,
}
