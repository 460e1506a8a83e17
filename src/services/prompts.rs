//! 提示词构建 - 业务能力层
//!
//! 每个模型调用点一个方法，输出纯文本 prompt；
//! 所有 prompt 都要求模型只返回 JSON，解析见 `response_validation`。

use crate::models::{ChapterContent, Question, QuestionType, SolvedQuestion};

/// 提示词集合（按年级学科定制）
#[derive(Debug, Clone)]
pub struct Prompts {
    grade_subject_id: String,
}

impl Prompts {
    pub fn new(grade_subject_id: impl Into<String>) -> Self {
        Self {
            grade_subject_id: grade_subject_id.into(),
        }
    }

    /// 标准题型抽取
    pub fn extract_exercises(&self) -> String {
        format!(
            r#"The attached images are exercise pages of a school textbook (grade/subject id {}).
Each image is preceded by a label "Page N:" giving its book page number.

Extract every exercise question on these pages: multiple-choice, true-false,
fill-in-the-blank, short-answer and long-answer questions.

For each question return an object with:
- "question_page_number": the book page number the question is printed on
- "question_text": the full question text, including options for multiple-choice
- "question_type": one of "short-answer", "long-answer", "true-false", "multiple-choice" or another short label
- "image_based_question": true when the question refers to a figure, diagram, table image or picture
- "image_description": a detailed description of that figure when "image_based_question" is true

Skip constructed-response questions, they are extracted separately.
Return only a JSON array of these objects."#,
            self.grade_subject_id
        )
    }

    /// 建构反应题抽取
    pub fn extract_constructed_response(&self) -> String {
        format!(
            r#"The attached images are exercise pages of a school textbook (grade/subject id {}).
Each image is preceded by a label "Page N:" giving its book page number.

Extract only the constructed-response questions: questions built around a shared
stimulus (a passage, table, graph or figure) followed by parts the student answers
in their own words.

For each question return an object with:
- "question_page_number": the book page number the question is printed on
- "question_text": the stimulus text followed by all of its parts
- "question_type": "constructed-response"
- "image_based_question": true when the stimulus is a figure, diagram or picture
- "image_description": a detailed description of that figure when "image_based_question" is true

Return only a JSON array of these objects. Return [] when there are none."#,
            self.grade_subject_id
        )
    }

    /// 配图与题目匹配
    pub fn link_image(&self, question: &Question, candidate_urls: &[String]) -> String {
        let description = question
            .extra
            .get("image_description")
            .and_then(|v| v.as_str())
            .unwrap_or("(no description)");
        let candidates: Vec<String> = candidate_urls
            .iter()
            .enumerate()
            .map(|(i, url)| format!("  Image {}: {}", i + 1, url))
            .collect();

        format!(
            r#"A textbook question refers to a figure. The attached images are the figures
cropped from the same page, in this order:
{}

Question text:
{}

Description of the figure the question refers to:
{}

Pick the image that is the figure of this question.
Return only a JSON array with the URL of the matching image, for example ["{}"].
Return [] when none of the images matches."#,
            candidates.join("\n"),
            question.question_text,
            description,
            candidate_urls.first().map(String::as_str).unwrap_or("https://...")
        )
    }

    /// 解题（整章一次调用）
    pub fn solve_questions(&self, questions: &[Question], chapter_content: &ChapterContent) -> String {
        let questions_json = serde_json::to_string_pretty(questions).unwrap_or_default();
        let content_json = serde_json::to_string_pretty(chapter_content).unwrap_or_default();

        format!(
            r#"You are a subject expert (grade/subject id {}). Solve every question below
using the chapter learning content.

Chapter learning content:
{}

Questions:
{}

Return a JSON object {{"questions": [...]}} containing every question above, in the
same order, with all original fields kept and these fields added or completed:
- "question_type": one of "short-answer", "long-answer", "constructed-response", "true-false", "multiple-choice"
- "answer": the correct answer
- "solution": a short worked explanation
Do not drop any question."#,
            self.grade_subject_id, content_json, questions_json
        )
    }

    /// 简答 / 论述题评分标准
    ///
    /// `question_source` 标明题目来源（练习题为 "exercise"）。
    pub fn marking_scheme(
        &self,
        question_type: &QuestionType,
        questions: &[SolvedQuestion],
        question_source: &str,
    ) -> String {
        let label = question_type.as_str().replace('-', "_");
        let questions_json = serde_json::to_string_pretty(questions).unwrap_or_default();

        format!(
            r#"You are an examiner (grade/subject id {}). The {} questions below are {} questions
with their answers. Write a marking scheme for each one.

Questions:
{}

Return a JSON object {{"questions": [...]}} containing every question above with all
original fields kept and two fields added:
- "marking_scheme": an array of {{"point": "...", "marks": number}} items
- "score": the total marks of the question (the sum of the points)"#,
            self.grade_subject_id, question_source, label, questions_json
        )
    }

    /// 建构反应题评分标准
    pub fn constructed_marking_scheme(&self, questions: &[SolvedQuestion]) -> String {
        let questions_json = serde_json::to_string_pretty(questions).unwrap_or_default();

        format!(
            r#"You are an examiner (grade/subject id {}). The constructed-response questions below
have several parts that share one stimulus. Write a marking scheme for each question,
giving marks per part and per expected point.

Questions:
{}

Return a JSON object {{"questions": [...]}} containing every question above with all
original fields kept and two fields added:
- "marking_scheme": an array of {{"part": "...", "point": "...", "marks": number}} items
- "score": the total marks of the question"#,
            self.grade_subject_id, questions_json
        )
    }
}
