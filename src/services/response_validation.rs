//! 模型响应校验 - 业务能力层
//!
//! 把模型返回的原始文本解析 / 修复为结构化数据：
//! - 去掉 ```json 代码块包裹
//! - 截取第一个 JSON 数组或对象
//! - 修复尾逗号
//!
//! 失败时返回 [`ValidationError`]，是否降级由调用方决定。

use crate::error::ValidationError;
use crate::models::Question;
use crate::utils::logging::truncate_text;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([\]}])").expect("valid regex"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s"'<>\)\]\},]+"#).expect("valid regex"))
}

/// 从响应中提取 JSON 值
pub fn extract_json(raw: &str) -> Result<JsonValue, ValidationError> {
    let body = code_fence_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
        .trim();

    if let Ok(value) = serde_json::from_str::<JsonValue>(body) {
        return Ok(value);
    }

    // 截取最外层的数组 / 对象
    let start = body.find(['[', '{']);
    let end = body.rfind([']', '}']);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            let candidate = &body[start..=end];
            if let Ok(value) = serde_json::from_str::<JsonValue>(candidate) {
                return Ok(value);
            }
            let repaired = trailing_comma_re().replace_all(candidate, "$1");
            if let Ok(value) = serde_json::from_str::<JsonValue>(&repaired) {
                return Ok(value);
            }
        }
    }

    Err(ValidationError::NotJson {
        preview: truncate_text(raw, 120),
    })
}

/// 解析题目数组：接受裸数组或 `{"questions": [...]}`
pub fn parse_questions(raw: &str) -> Result<Vec<Question>, ValidationError> {
    let value = extract_json(raw)?;
    let array = match value {
        JsonValue::Array(_) => value,
        JsonValue::Object(mut map) => map
            .remove("questions")
            .ok_or(ValidationError::MissingKey("questions"))?,
        _ => {
            return Err(ValidationError::UnexpectedShape {
                expected: "题目数组",
            })
        }
    };
    deserialize_array(array)
}

/// 解析 `{"questions": [...]}` 中的题目数组（解题 / 评分响应）
///
/// 缺少 `questions` 键是错误，不会退化为空列表。
pub fn parse_questions_object<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, ValidationError> {
    let value = extract_json(raw)?;
    let array = match value {
        JsonValue::Object(mut map) => map
            .remove("questions")
            .ok_or(ValidationError::MissingKey("questions"))?,
        JsonValue::Array(_) => value,
        _ => {
            return Err(ValidationError::UnexpectedShape {
                expected: "含 questions 键的对象",
            })
        }
    };
    deserialize_array(array)
}

fn deserialize_array<T: DeserializeOwned>(array: JsonValue) -> Result<Vec<T>, ValidationError> {
    if !array.is_array() {
        return Err(ValidationError::UnexpectedShape {
            expected: "questions 为数组",
        });
    }
    serde_json::from_value(array).map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// 解析配图匹配响应中的 URL 列表
///
/// 依次尝试：字符串数组、对象中的 URL 字段、正文中的 URL。
/// 解析不到任何 URL 时返回 None。
pub fn parse_image_urls(raw: &str) -> Option<Vec<String>> {
    let from_json = extract_json(raw).ok().map(|value| urls_in_json(&value));
    let urls = match from_json {
        Some(urls) if !urls.is_empty() => urls,
        _ => url_re()
            .find_iter(raw)
            .map(|m| m.as_str().trim_end_matches(['.', ';', ':']).to_string())
            .collect(),
    };

    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

fn urls_in_json(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(s) if is_http_url(s) => vec![s.clone()],
        JsonValue::Array(items) => items.iter().flat_map(urls_in_json).collect(),
        JsonValue::Object(map) => {
            for key in ["question_image_url", "image_urls", "urls", "images"] {
                if let Some(v) = map.get(key) {
                    let urls = urls_in_json(v);
                    if !urls.is_empty() {
                        return urls;
                    }
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageNumber, SolvedQuestion};

    #[test]
    fn test_parse_questions_from_fenced_array() {
        let raw = r#"Here are the questions:
```json
[
  {"question_page_number": 4, "image_based_question": false, "question_text": "Define force."},
  {"question_page_number": "5", "image_based_question": true, "question_text": "Label the figure."},
]
```"#;
        let questions = parse_questions(raw).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].question_page_number, PageNumber::from(5));
        assert!(questions[1].image_based_question);
    }

    #[test]
    fn test_parse_questions_from_object() {
        let raw = r#"{"questions": [{"question_page_number": 4, "question_text": "Q"}]}"#;
        assert_eq!(parse_questions(raw).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_questions_errors() {
        assert!(matches!(
            parse_questions("I could not read the page."),
            Err(ValidationError::NotJson { .. })
        ));
        assert_eq!(
            parse_questions(r#"{"items": []}"#),
            Err(ValidationError::MissingKey("questions"))
        );
        assert!(matches!(
            parse_questions(r#"[{"question_text": "no page"}]"#),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_questions_object_requires_key() {
        let result = parse_questions_object::<SolvedQuestion>(r#"{"answers": []}"#);
        assert_eq!(result, Err(ValidationError::MissingKey("questions")));

        let solved = parse_questions_object::<SolvedQuestion>(
            r#"{"questions": [{"question_page_number": 1, "question_type": "mcq", "answer": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(solved[0].extra["answer"], "B");
    }

    #[test]
    fn test_parse_image_urls() {
        assert_eq!(
            parse_image_urls(r#"["https://cdn/b.png"]"#),
            Some(vec!["https://cdn/b.png".to_string()])
        );
        assert_eq!(
            parse_image_urls(r#"{"question_image_url": "https://cdn/a.png"}"#),
            Some(vec!["https://cdn/a.png".to_string()])
        );
        assert_eq!(
            parse_image_urls("The matching figure is https://cdn/c.png."),
            Some(vec!["https://cdn/c.png".to_string()])
        );
        assert_eq!(parse_image_urls("[]"), None);
        assert_eq!(parse_image_urls("No figure matches this question."), None);
    }
}
