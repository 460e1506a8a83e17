//! 配图关联 - 流程层
//!
//! 含图题在本页配图中选出自己的配图：
//! - 本页没有配图：保持 `question_image_url` 为空
//! - 匹配响应解析出 URL：取第一个
//! - 解析不出 URL：保存原始响应（降级，可通过 [`ImageLink::Raw`] 识别）

use crate::clients::{Collaborators, ImageSource, ModelClient, PromptKind};
use crate::error::Result;
use crate::infrastructure::{load_json, save_json, ArtifactStore, Stage};
use crate::models::{ImageLink, PageFigures, Question};
use crate::services::{parse_image_urls, Prompts};
use crate::utils::logging::truncate_text;
use crate::workflow::ChapterCtx;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 关联结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// 选中了本页候选配图
    pub linked: usize,
    /// 保存了候选之外的 URL 或原始响应
    pub degraded: usize,
    /// 含图题但本页没有配图
    pub without_figures: usize,
}

/// 配图关联器
pub struct ImageLinker {
    model: Arc<dyn ModelClient>,
    artifacts: Arc<dyn ArtifactStore>,
    prompts: Prompts,
    max_concurrent: usize,
}

impl ImageLinker {
    pub fn new(collaborators: &Collaborators, prompts: Prompts, max_concurrent: usize) -> Self {
        Self {
            model: collaborators.model.clone(),
            artifacts: collaborators.artifacts.clone(),
            prompts,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 读取 `questions` 和 `page_wise_figures`，关联后写入 `Linked_images` 检查点
    pub async fn run(&self, ctx: &ChapterCtx) -> Result<(Vec<Question>, LinkReport)> {
        info!("{} 🔗 关联配图与题目...", ctx);

        let questions: Vec<Question> =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::Questions)).await?;
        let figures: PageFigures =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::PageWiseFigures)).await?;

        let (questions, report) = self.link(ctx, questions, &figures).await?;

        save_json(self.artifacts.as_ref(), &ctx.key(Stage::LinkedImages), &questions).await?;
        info!(
            "{} ✓ 关联完成: 成功 {}，降级 {}，本页无配图 {}",
            ctx, report.linked, report.degraded, report.without_figures
        );
        Ok((questions, report))
    }

    /// 每道含图题一个匹配任务（按题目下标标识），结果由调用方统一写回
    pub async fn link(
        &self,
        ctx: &ChapterCtx,
        mut questions: Vec<Question>,
        figures: &PageFigures,
    ) -> Result<(Vec<Question>, LinkReport)> {
        let mut report = LinkReport::default();
        let mut tasks = Vec::new();

        for (index, question) in questions.iter().enumerate() {
            if !question.image_based_question {
                continue;
            }
            match figures.get(&question.question_page_number) {
                Some(candidates) if !candidates.is_empty() => {
                    let prompt = self.prompts.link_image(question, candidates);
                    tasks.push((index, prompt, candidates.clone()));
                }
                _ => {
                    debug!(
                        "{} 第 {} 题所在第 {} 页没有配图",
                        ctx,
                        index + 1,
                        question.question_page_number
                    );
                    report.without_figures += 1;
                }
            }
        }

        let matches: Vec<(usize, String)> = stream::iter(tasks)
            .map(|(index, prompt, candidates)| self.match_one(index, prompt, candidates))
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        for (index, raw) in matches {
            let Some(question) = questions.get_mut(index) else {
                continue;
            };
            let candidates = figures
                .get(&question.question_page_number)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let value = select_image_url(&raw);
            let link = ImageLink::classify(&value, candidates);
            match &link {
                ImageLink::Candidate(url) => {
                    debug!("{} 第 {} 题配图: {}", ctx, index + 1, url);
                    report.linked += 1;
                }
                ImageLink::Url(url) => {
                    warn!("{} ⚠️ 第 {} 题配图不在本页候选中: {}", ctx, index + 1, url);
                    report.degraded += 1;
                }
                ImageLink::Raw(text) => {
                    warn!(
                        "{} ⚠️ 第 {} 题配图匹配响应无法解析，保存原始响应: {}",
                        ctx,
                        index + 1,
                        truncate_text(text, 80)
                    );
                    report.degraded += 1;
                }
            }
            question.question_image_url = Some(value);
        }

        Ok((questions, report))
    }

    async fn match_one(
        &self,
        index: usize,
        prompt: String,
        candidates: Vec<String>,
    ) -> Result<(usize, String)> {
        let images = ImageSource::Links(candidates);
        let raw = self.model.vision(PromptKind::LinkImages, &prompt, &images).await?;
        Ok((index, raw))
    }
}

/// 取第一个匹配到的 URL，解析不出时返回原始响应
fn select_image_url(raw: &str) -> String {
    parse_image_urls(raw)
        .and_then(|urls| urls.into_iter().next())
        .unwrap_or_else(|| raw.to_string())
}
