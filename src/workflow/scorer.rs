//! 评分标准 - 流程层
//!
//! 按题型分四组：
//! 1. 简答题 → 简答评分标准调用
//! 2. 论述题 → 论述评分标准调用
//! 3. 建构反应题 → 建构反应评分标准调用
//! 4. 其他（判断、选择等）→ 不调用模型，`marking_scheme = null, score = 1`
//!
//! 输出顺序按分组拼接（1 → 2 → 3 → 4），不是抽取顺序。

use crate::clients::{Collaborators, ModelClient, PromptKind};
use crate::error::Result;
use crate::infrastructure::{load_json, save_json, ArtifactStore, Stage};
use crate::models::{QuestionType, ScoredQuestion, SolvedQuestion};
use crate::services::{parse_questions_object, Prompts};
use crate::utils::logging::truncate_text;
use crate::workflow::ChapterCtx;
use std::sync::Arc;
use tracing::{debug, info, warn};

const QUESTION_SOURCE: &str = "exercise";

/// 按题型分组的题目
#[derive(Debug, Default)]
pub struct ScoringBuckets {
    pub short_answer: Vec<SolvedQuestion>,
    pub long_answer: Vec<SolvedQuestion>,
    pub constructed: Vec<SolvedQuestion>,
    pub rest: Vec<SolvedQuestion>,
}

impl ScoringBuckets {
    pub fn partition(solved: Vec<SolvedQuestion>) -> Self {
        let mut buckets = Self::default();
        for question in solved {
            if !question.question_type.needs_marking_scheme() {
                buckets.rest.push(question);
                continue;
            }
            match question.question_type {
                QuestionType::ShortAnswer => buckets.short_answer.push(question),
                QuestionType::LongAnswer => buckets.long_answer.push(question),
                _ => buckets.constructed.push(question),
            }
        }
        buckets
    }
}

/// 评分器
pub struct Scorer {
    model: Arc<dyn ModelClient>,
    artifacts: Arc<dyn ArtifactStore>,
    prompts: Prompts,
}

impl Scorer {
    pub fn new(collaborators: &Collaborators, prompts: Prompts) -> Self {
        Self {
            model: collaborators.model.clone(),
            artifacts: collaborators.artifacts.clone(),
            prompts,
        }
    }

    /// 读取 `solved`，评分后写入 `marking_scheme` 检查点
    pub async fn run(&self, ctx: &ChapterCtx) -> Result<Vec<ScoredQuestion>> {
        info!("{} 📝 生成评分标准...", ctx);

        let solved: Vec<SolvedQuestion> =
            load_json(self.artifacts.as_ref(), &ctx.key(Stage::Solved)).await?;
        let scored = self.score(ctx, solved).await?;

        save_json(self.artifacts.as_ref(), &ctx.key(Stage::MarkingScheme), &scored).await?;
        info!("{} ✓ 已评分 {} 道题目", ctx, scored.len());
        Ok(scored)
    }

    pub async fn score(&self, ctx: &ChapterCtx, solved: Vec<SolvedQuestion>) -> Result<Vec<ScoredQuestion>> {
        let buckets = ScoringBuckets::partition(solved);
        info!(
            "{} 题型分组: 简答 {}，论述 {}，建构反应 {}，其他 {}",
            ctx,
            buckets.short_answer.len(),
            buckets.long_answer.len(),
            buckets.constructed.len(),
            buckets.rest.len()
        );

        let mut scored = Vec::new();
        for (kind, questions) in [
            (PromptKind::ShortAnswerMarking, &buckets.short_answer),
            (PromptKind::LongAnswerMarking, &buckets.long_answer),
            (PromptKind::ConstructedMarking, &buckets.constructed),
        ] {
            scored.extend(self.assign(ctx, kind, questions).await?);
        }

        scored.extend(buckets.rest.into_iter().map(ScoredQuestion::with_default_score));
        Ok(scored)
    }

    /// 一组题目的评分标准调用；空组不调用模型
    async fn assign(
        &self,
        ctx: &ChapterCtx,
        kind: PromptKind,
        questions: &[SolvedQuestion],
    ) -> Result<Vec<ScoredQuestion>> {
        if questions.is_empty() {
            debug!("{} {} 分组为空，跳过", ctx, kind);
            return Ok(Vec::new());
        }

        let prompt = match kind {
            PromptKind::ShortAnswerMarking => {
                self.prompts
                    .marking_scheme(&QuestionType::ShortAnswer, questions, QUESTION_SOURCE)
            }
            PromptKind::LongAnswerMarking => {
                self.prompts
                    .marking_scheme(&QuestionType::LongAnswer, questions, QUESTION_SOURCE)
            }
            _ => self.prompts.constructed_marking_scheme(questions),
        };
        let expected = questions.len();

        let raw = self.model.complete(kind, &prompt).await?;
        debug!("{} {} 响应: {}", ctx, kind, truncate_text(&raw, 200));

        let scored: Vec<ScoredQuestion> = parse_questions_object(&raw)?;
        if scored.len() != expected {
            warn!(
                "{} ⚠️ {} 结果数量不一致: 提交 {} 道，返回 {} 道",
                ctx,
                kind,
                expected,
                scored.len()
            );
        }
        Ok(scored)
    }
}
