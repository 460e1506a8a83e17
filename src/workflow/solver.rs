//! 解题 - 流程层
//!
//! 整章题目 + 章节学习内容放进一次大上下文调用，模型返回全部题目的答案。
//! 响应缺少 `questions` 键视为错误，不会用空列表覆盖已有的抽取结果。

use crate::clients::{Collaborators, ModelClient, PromptKind};
use crate::error::Result;
use crate::infrastructure::{load_json, save_json, ArtifactStore, Stage};
use crate::models::{ChapterContent, Question, SolvedQuestion};
use crate::services::{parse_questions_object, Prompts};
use crate::utils::logging::truncate_text;
use crate::workflow::ChapterCtx;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 解题器
pub struct Solver {
    model: Arc<dyn ModelClient>,
    artifacts: Arc<dyn ArtifactStore>,
    prompts: Prompts,
}

impl Solver {
    pub fn new(collaborators: &Collaborators, prompts: Prompts) -> Self {
        Self {
            model: collaborators.model.clone(),
            artifacts: collaborators.artifacts.clone(),
            prompts,
        }
    }

    /// 读取 `Linked_images`，解题后写入 `solved` 检查点
    pub async fn run(&self, ctx: &ChapterCtx, content: &ChapterContent) -> Result<Vec<SolvedQuestion>> {
        info!("{} 🧮 解题...", ctx);

        let questions: Vec<Question> =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::LinkedImages)).await?;
        let solved = self.solve(ctx, &questions, content).await?;

        save_json(self.artifacts.as_ref(), &ctx.key(Stage::Solved), &solved).await?;
        info!("{} ✓ 已解答 {} 道题目", ctx, solved.len());
        Ok(solved)
    }

    pub async fn solve(
        &self,
        ctx: &ChapterCtx,
        questions: &[Question],
        content: &ChapterContent,
    ) -> Result<Vec<SolvedQuestion>> {
        if questions.is_empty() {
            warn!("{} ⚠️ 没有题目，跳过解题", ctx);
            return Ok(Vec::new());
        }

        let prompt = self.prompts.solve_questions(questions, content);
        let raw = self.model.complete(PromptKind::SolveQuestions, &prompt).await?;
        debug!("{} 解题响应: {}", ctx, truncate_text(&raw, 200));

        let solved: Vec<SolvedQuestion> = parse_questions_object(&raw)?;
        if solved.len() != questions.len() {
            warn!(
                "{} ⚠️ 解题结果数量不一致: 提交 {} 道，返回 {} 道",
                ctx,
                questions.len(),
                solved.len()
            );
        }
        Ok(solved)
    }
}
