//! LLM API 客户端
//!
//! 封装所有与 OpenAI 兼容接口的调用：
//! - 视觉调用：本地页面图片编码为 data URL，远程配图直接传 URL
//! - 文本调用：解题、评分等大上下文请求
//!
//! 失败时按 `llm_max_retries` 线性退避重试。

use super::{ImageSource, ModelClient, PromptKind};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const SYSTEM_MESSAGE: &str = "You are an assistant that digitises school textbook exercises. \
Follow the output format in the instructions exactly and answer with JSON only.";

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    vision_model: String,
    text_model: String,
    vision_max_tokens: u32,
    text_max_tokens: u32,
    max_retries: usize,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            vision_model: config.vision_model_name.clone(),
            text_model: config.text_model_name.clone(),
            vision_max_tokens: config.vision_max_tokens,
            text_max_tokens: config.text_max_tokens,
            max_retries: config.llm_max_retries.max(1),
        }
    }

    /// 发送一次聊天请求（带重试）
    async fn send(
        &self,
        kind: PromptKind,
        model: &str,
        max_tokens: u32,
        user_content: ChatCompletionRequestUserMessageContent,
    ) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self
                .send_once(kind, model, max_tokens, user_content.clone())
                .await
            {
                Ok(content) => return Ok(content),
                Err(e) => {
                    warn!(
                        "LLM 调用失败 ({}) 尝试 {}/{}: {}",
                        kind, attempt, self.max_retries, e
                    );
                    last_error = e.to_string();
                    if attempt < self.max_retries {
                        sleep(Duration::from_secs(2 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(PipelineError::Model {
            kind: kind.to_string(),
            reason: last_error,
        })
    }

    async fn send_once(
        &self,
        kind: PromptKind,
        model: &str,
        max_tokens: u32,
        user_content: ChatCompletionRequestUserMessageContent,
    ) -> Result<String> {
        debug!("调用 LLM API ({})，模型: {}", kind, model);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_MESSAGE)
            .build()
            .map_err(|e| model_error(kind, e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(|e| model_error(kind, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.2)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| model_error(kind, e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| model_error(kind, e))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PipelineError::Model {
                kind: kind.to_string(),
                reason: "LLM 返回内容为空".to_string(),
            })?;

        debug!("LLM API 调用成功 ({})，响应 {} 字符", kind, content.len());
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ModelClient for LlmClient {
    async fn vision(&self, kind: PromptKind, prompt: &str, images: &ImageSource) -> Result<String> {
        debug!("视觉调用 ({})，包含 {} 张图片", kind, images.len());

        let mut parts = vec![text_part(prompt)];
        match images {
            ImageSource::LocalFiles(files) => {
                for (page_number, path) in files {
                    parts.push(text_part(&format!("Page {}:", page_number)));
                    parts.push(image_part(file_data_url(path).await?));
                }
            }
            ImageSource::Links(links) => {
                for url in links {
                    parts.push(image_part(url.clone()));
                }
            }
        }

        self.send(
            kind,
            &self.vision_model,
            self.vision_max_tokens,
            ChatCompletionRequestUserMessageContent::Array(parts),
        )
        .await
    }

    async fn complete(&self, kind: PromptKind, prompt: &str) -> Result<String> {
        self.send(
            kind,
            &self.text_model,
            self.text_max_tokens,
            ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
        )
        .await
    }
}

fn text_part(text: &str) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::Text(ChatCompletionRequestMessageContentPartText {
        text: text.to_string(),
    })
}

fn image_part(url: String) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::ImageUrl(
        ChatCompletionRequestMessageContentPartImage {
            image_url: ImageUrl {
                url,
                detail: Some(ImageDetail::High),
            },
        },
    )
}

/// 读取本地图片并编码为 data URL
async fn file_data_url(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for(path),
        STANDARD.encode(bytes)
    ))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

fn model_error(kind: PromptKind, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Model {
        kind: kind.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a/4.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a/4.png")), "image/png");
        assert_eq!(mime_for(Path::new("a/4")), "image/png");
    }

    #[tokio::test]
    async fn test_file_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("4.png");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_data_url(&path).await.unwrap(),
            "data:image/png;base64,YWJj"
        );
    }

    /// 测试视觉调用（需要真实的 API）
    ///
    /// ```bash
    /// LLM_API_KEY=... cargo test test_live_vision -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_live_vision() {
        let _ = tracing_subscriber::fmt::try_init();
        let config = Config::from_env().expect("config");
        let client = LlmClient::new(&config);

        let images = ImageSource::Links(vec![
            "https://upload.wikimedia.org/wikipedia/commons/3/3a/Cat03.jpg".to_string(),
        ]);
        let response = client
            .vision(PromptKind::LinkImages, "Describe the image in one sentence.", &images)
            .await
            .expect("vision call");
        println!("{}", response);
        assert!(!response.is_empty());
    }
}
