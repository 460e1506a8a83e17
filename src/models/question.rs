//! 题目模型
//!
//! 题目在流水线中逐步补全字段，每个阶段用不同的类型约束必需字段：
//!
//! ```text
//! Question（抽取 / 关联配图）→ SolvedQuestion（解题）→ ScoredQuestion（评分）
//! ```
//!
//! 模型返回的其他字段（选项、图片描述、答案等）通过 `extra` 原样保留。

use super::page_number::PageNumber;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// 题型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    ShortAnswer,
    LongAnswer,
    ConstructedResponse,
    TrueFalse,
    MultipleChoice,
    Other(String),
}

/// 题型别名（小写、去空白后匹配）
static QUESTION_TYPE_ALIASES: phf::Map<&'static str, QuestionType> = phf_map! {
    "short-answer" => QuestionType::ShortAnswer,
    "short_answer" => QuestionType::ShortAnswer,
    "short answer" => QuestionType::ShortAnswer,
    "saq" => QuestionType::ShortAnswer,
    "long-answer" => QuestionType::LongAnswer,
    "long_answer" => QuestionType::LongAnswer,
    "long answer" => QuestionType::LongAnswer,
    "laq" => QuestionType::LongAnswer,
    "constructed-response" => QuestionType::ConstructedResponse,
    "constructed_response" => QuestionType::ConstructedResponse,
    "constructed response" => QuestionType::ConstructedResponse,
    "crq" => QuestionType::ConstructedResponse,
    "true-false" => QuestionType::TrueFalse,
    "true_false" => QuestionType::TrueFalse,
    "true/false" => QuestionType::TrueFalse,
    "true false" => QuestionType::TrueFalse,
    "multiple-choice" => QuestionType::MultipleChoice,
    "multiple_choice" => QuestionType::MultipleChoice,
    "multiple choice" => QuestionType::MultipleChoice,
    "mcq" => QuestionType::MultipleChoice,
};

impl QuestionType {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match QUESTION_TYPE_ALIASES.get(normalized.as_str()) {
            Some(question_type) => question_type.clone(),
            None => QuestionType::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::ShortAnswer => "short-answer",
            QuestionType::LongAnswer => "long-answer",
            QuestionType::ConstructedResponse => "constructed-response",
            QuestionType::TrueFalse => "true-false",
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::Other(s) => s,
        }
    }

    /// 是否需要评分标准（简答 / 论述 / 建构反应）
    pub fn needs_marking_scheme(&self) -> bool {
        matches!(
            self,
            QuestionType::ShortAnswer | QuestionType::LongAnswer | QuestionType::ConstructedResponse
        )
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        QuestionType::parse(&s)
    }
}

impl From<QuestionType> for String {
    fn from(t: QuestionType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 抽取阶段的题目（关联配图后补上 `question_image_url`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_page_number: PageNumber,
    #[serde(default)]
    pub image_based_question: bool,
    #[serde(default)]
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Question {
    /// 对已写入的 `question_image_url` 分类
    pub fn image_link(&self, candidates: &[String]) -> Option<ImageLink> {
        self.question_image_url
            .as_deref()
            .map(|value| ImageLink::classify(value, candidates))
    }
}

/// 解题后的题目：题型必须存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedQuestion {
    pub question_page_number: PageNumber,
    #[serde(default)]
    pub image_based_question: bool,
    #[serde(default)]
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 评分后的题目：分数必须存在，评分标准可为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredQuestion {
    #[serde(flatten)]
    pub solved: SolvedQuestion,
    pub marking_scheme: Option<JsonValue>,
    pub score: f64,
}

impl ScoredQuestion {
    /// 判断 / 选择等题型：无评分标准，固定 1 分
    pub fn with_default_score(solved: SolvedQuestion) -> Self {
        Self {
            solved,
            marking_scheme: None,
            score: 1.0,
        }
    }

    pub fn question_type(&self) -> &QuestionType {
        &self.solved.question_type
    }
}

/// `question_image_url` 的取值类别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLink {
    /// 本页候选配图之一
    Candidate(String),
    /// 格式正确的 URL，但不在候选列表中
    Url(String),
    /// 匹配响应无法解析时保存的原始内容
    Raw(String),
}

impl ImageLink {
    pub fn classify(value: &str, candidates: &[String]) -> Self {
        if candidates.iter().any(|c| c == value) {
            ImageLink::Candidate(value.to_string())
        } else if reqwest::Url::parse(value)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
        {
            ImageLink::Url(value.to_string())
        } else {
            ImageLink::Raw(value.to_string())
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ImageLink::Raw(_))
    }
}
