//! 题目抽取 - 流程层
//!
//! 对同一组页面图片做两次视觉调用：
//! 1. 标准题型 prompt
//! 2. 建构反应题 prompt
//!
//! 每次调用的校验结果单独返回，降级还是中止由 [`ExtractionOutcome::merge`] 的策略决定。
//! 两次调用的结果按顺序拼接，不去重。

use crate::clients::{Collaborators, ImageSource, ModelClient, PromptKind};
use crate::error::{PipelineError, Result, ValidationError};
use crate::infrastructure::{load_json, save_json, ArtifactStore, Stage};
use crate::models::{ExercisePages, Question};
use crate::services::{parse_questions, Prompts};
use crate::utils::logging::truncate_text;
use crate::workflow::ChapterCtx;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单次抽取调用的结果
#[derive(Debug)]
pub struct CallOutcome {
    pub kind: PromptKind,
    pub result: std::result::Result<Vec<Question>, ValidationError>,
}

/// 两次抽取调用的结果（标准题型在前）
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub calls: Vec<CallOutcome>,
}

impl ExtractionOutcome {
    /// 合并两次调用的题目
    ///
    /// `strict` 为 true 时任一调用校验失败即返回错误；否则该调用贡献空列表。
    pub fn merge(self, ctx: &ChapterCtx, strict: bool) -> Result<Vec<Question>> {
        let mut questions = Vec::new();
        for call in self.calls {
            match call.result {
                Ok(extracted) => questions.extend(extracted),
                Err(e) if strict => return Err(PipelineError::ResponseValidation(e)),
                Err(e) => {
                    warn!("{} ⚠️ {} 响应校验失败，本次调用按空结果处理: {}", ctx, call.kind, e);
                }
            }
        }
        Ok(questions)
    }

    /// 校验失败的调用数
    pub fn failures(&self) -> usize {
        self.calls.iter().filter(|c| c.result.is_err()).count()
    }
}

/// 题目抽取器
pub struct QuestionExtractor {
    model: Arc<dyn ModelClient>,
    artifacts: Arc<dyn ArtifactStore>,
    prompts: Prompts,
}

impl QuestionExtractor {
    pub fn new(collaborators: &Collaborators, prompts: Prompts) -> Self {
        Self {
            model: collaborators.model.clone(),
            artifacts: collaborators.artifacts.clone(),
            prompts,
        }
    }

    /// 读取 `exercise_pages`，抽取题目并写入 `questions` 检查点
    pub async fn run(&self, ctx: &ChapterCtx, strict: bool) -> Result<Vec<Question>> {
        info!("{} 🔍 抽取题目...", ctx);

        let pages: ExercisePages =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::ExercisePages)).await?;
        let outcome = self.extract(ctx, &pages).await?;
        let failures = outcome.failures();
        let questions = outcome.merge(ctx, strict)?;

        save_json(self.artifacts.as_ref(), &ctx.key(Stage::Questions), &questions).await?;
        info!(
            "{} ✓ 抽取到 {} 道题目（校验失败的调用: {}）",
            ctx,
            questions.len(),
            failures
        );
        Ok(questions)
    }

    /// 两次视觉调用；模型调用失败直接返回错误，校验失败记录在结果中
    pub async fn extract(&self, ctx: &ChapterCtx, pages: &ExercisePages) -> Result<ExtractionOutcome> {
        if pages.is_empty() {
            warn!("{} ⚠️ 没有可用的页面图片，跳过题目抽取", ctx);
            return Ok(ExtractionOutcome { calls: Vec::new() });
        }

        let images = ImageSource::LocalFiles(
            pages
                .iter()
                .map(|(page, path)| (page.clone(), path.clone()))
                .collect(),
        );

        let mut calls = Vec::with_capacity(2);
        for (kind, prompt) in [
            (PromptKind::ExtractExercises, self.prompts.extract_exercises()),
            (
                PromptKind::ExtractConstructedResponse,
                self.prompts.extract_constructed_response(),
            ),
        ] {
            let raw = self.model.vision(kind, &prompt, &images).await?;
            debug!("{} {} 响应: {}", ctx, kind, truncate_text(&raw, 200));
            calls.push(CallOutcome {
                kind,
                result: parse_questions(&raw),
            });
        }

        Ok(ExtractionOutcome { calls })
    }
}
