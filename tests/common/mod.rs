//! 集成测试用的脚本化外部服务替身
#![allow(dead_code)]

use async_trait::async_trait;
use exercise_extractor::clients::{
    Collaborators, ImageSource, ImageUtility, LayoutDetector, ModelClient, ObjectStorage, PromptKind,
};
use exercise_extractor::error::{PipelineError, Result};
use exercise_extractor::infrastructure::{save_json, ArtifactStore, MemoryArtifactStore, Stage};
use exercise_extractor::models::{BoundingBox, Book, Chapter};
use exercise_extractor::workflow::ChapterCtx;
use exercise_extractor::Config;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const BOOK_ID: &str = "b1";
pub const CHAPTER_ID: &str = "c1";

/// 一次模型调用的记录
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub kind: PromptKind,
    pub prompt: String,
    pub images: Option<ImageSource>,
}

/// 按调用点返回预设响应的模型；队列只剩一条时重复使用
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<HashMap<PromptKind, VecDeque<String>>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, kind: PromptKind, response: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(response.into());
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: PromptKind) -> Vec<ModelCall> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    pub fn kinds(&self) -> Vec<PromptKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }

    fn next(&self, kind: PromptKind, prompt: &str, images: Option<&ImageSource>) -> Result<String> {
        self.calls.lock().unwrap().push(ModelCall {
            kind,
            prompt: prompt.to_string(),
            images: images.cloned(),
        });

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&kind).ok_or_else(|| PipelineError::Model {
            kind: kind.to_string(),
            reason: "no scripted response".to_string(),
        })?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| PipelineError::Model {
            kind: kind.to_string(),
            reason: "no scripted response".to_string(),
        })
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn vision(&self, kind: PromptKind, prompt: &str, images: &ImageSource) -> Result<String> {
        self.next(kind, prompt, Some(images))
    }

    async fn complete(&self, kind: PromptKind, prompt: &str) -> Result<String> {
        self.next(kind, prompt, None)
    }
}

/// 按页面文件名返回预设区域的版面检测
#[derive(Default)]
pub struct FakeLayout {
    figures: HashMap<String, Vec<BoundingBox>>,
    calls: Mutex<Vec<String>>,
}

impl FakeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_figures(mut self, file_name: &str, count: usize) -> Self {
        let boxes = (0..count)
            .map(|i| BoundingBox::new(0.1 * i as f64, 0.1, 0.1, 0.1))
            .collect();
        self.figures.insert(file_name.to_string(), boxes);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LayoutDetector for FakeLayout {
    async fn detect_figures(&self, image_path: &Path) -> Result<Vec<BoundingBox>> {
        assert!(image_path.exists(), "page image must exist during detection");
        let name = file_name(image_path);
        self.calls.lock().unwrap().push(name.clone());
        Ok(self.figures.get(&name).cloned().unwrap_or_default())
    }
}

/// 记录上传键的对象存储
#[derive(Default)]
pub struct FakeStorage {
    uploads: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, _image: Vec<u8>, key: &str) -> Result<String> {
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(figure_url(key))
    }
}

/// 下载即在目标目录写文件的图片工具
#[derive(Default)]
pub struct FakeImages {
    downloads: Mutex<Vec<String>>,
    dest_dirs: Mutex<HashSet<PathBuf>>,
    failing_urls: HashSet<String>,
}

impl FakeImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn dest_dirs(&self) -> Vec<PathBuf> {
        self.dest_dirs.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl ImageUtility for FakeImages {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        self.downloads.lock().unwrap().push(url.to_string());
        self.dest_dirs.lock().unwrap().insert(dest_dir.to_path_buf());
        if self.failing_urls.contains(url) {
            return Err(PipelineError::DownloadFailure {
                url: url.to_string(),
                reason: "HTTP 404".to_string(),
            });
        }

        let name = url.rsplit('/').next().unwrap_or("page.png");
        let path = dest_dir.join(name);
        std::fs::write(&path, url.as_bytes())?;
        Ok(path)
    }

    async fn crop(&self, image_path: &Path, coordinates: &BoundingBox) -> Result<Vec<u8>> {
        Ok(format!("{}@{:?}", image_path.display(), coordinates).into_bytes())
    }
}

/// 一组替身 + 内存检查点存储
pub struct Fakes {
    pub model: Arc<ScriptedModel>,
    pub layout: Arc<FakeLayout>,
    pub storage: Arc<FakeStorage>,
    pub images: Arc<FakeImages>,
    pub store: Arc<MemoryArtifactStore>,
}

impl Fakes {
    pub fn new(model: ScriptedModel, layout: FakeLayout, images: FakeImages) -> Self {
        Self {
            model: Arc::new(model),
            layout: Arc::new(layout),
            storage: Arc::new(FakeStorage::new()),
            images: Arc::new(images),
            store: Arc::new(MemoryArtifactStore::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            model: self.model.clone(),
            layout: self.layout.clone(),
            storage: self.storage.clone(),
            images: self.images.clone(),
            artifacts: self.store.clone(),
        }
    }

    pub async fn seed<T: Serialize>(&self, stage: Stage, value: &T) {
        save_json(self.store.as_ref(), &ctx().key(stage), value)
            .await
            .unwrap();
    }

    pub fn has(&self, stage: Stage) -> bool {
        self.store.contains(&ctx().key(stage))
    }

    pub async fn load(&self, stage: Stage) -> serde_json::Value {
        let bytes = self.store.load(&ctx().key(stage)).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

pub fn ctx() -> ChapterCtx {
    ChapterCtx::new(BOOK_ID, CHAPTER_ID, 0, "g7")
}

pub fn config() -> Config {
    Config {
        max_concurrent_pages: 2,
        ..Config::default()
    }
}

pub fn page_url(page: u64) -> String {
    format!("https://pages.test/{}.png", page)
}

pub fn figure_url(key: &str) -> String {
    format!("https://cdn.test/{}.png", key)
}

/// 第 `ordinal` 张第 `page` 页配图上传后的 URL
pub fn figure_url_for(page: u64, ordinal: usize) -> String {
    figure_url(&format!("chapter_id_{}_{}.{}", CHAPTER_ID, page, ordinal))
}

/// 第 4、7 页有图片 URL，第 9 页没有
pub fn book() -> Book {
    serde_json::from_value(json!({
        "id": BOOK_ID,
        "title": "Science 7",
        "grade_subject_id": "g7",
        "book_text": [
            {"book_page_no": 3, "pdf_page_image_url": page_url(3)},
            {"book_page_no": 4, "pdf_page_image_url": page_url(4)},
            {"book_page_no": 7, "pdf_page_image_url": page_url(7)},
            {"book_page_no": 9}
        ]
    }))
    .unwrap()
}

pub fn chapter_with_pages(pages: &[u64]) -> Chapter {
    let exercises: Vec<_> = pages.iter().map(|p| json!({"page_number": p})).collect();
    serde_json::from_value(json!({
        "id": CHAPTER_ID,
        "title": "Forces",
        "chapter_text": {
            "exercises": exercises,
            "slos": ["Describe forces"],
            "topics": [{"title": "Push and pull"}]
        }
    }))
    .unwrap()
}

pub fn extracted_questions_response() -> String {
    json!([
        {
            "question_page_number": 4,
            "image_based_question": true,
            "question_text": "Label the parts of the cell.",
            "image_description": "a plant cell"
        },
        {
            "question_page_number": 7,
            "image_based_question": false,
            "question_text": "The sun is a star. True or false?"
        }
    ])
    .to_string()
}

pub fn solved_response() -> String {
    json!({"questions": [
        {
            "question_page_number": 4,
            "image_based_question": true,
            "question_text": "Label the parts of the cell.",
            "question_image_url": figure_url_for(4, 2),
            "question_type": "short-answer",
            "answer": "nucleus, wall"
        },
        {
            "question_page_number": 7,
            "image_based_question": false,
            "question_text": "The sun is a star. True or false?",
            "question_type": "true-false",
            "answer": "True"
        }
    ]})
    .to_string()
}

pub fn short_answer_marking_response() -> String {
    json!({"questions": [
        {
            "question_page_number": 4,
            "image_based_question": true,
            "question_text": "Label the parts of the cell.",
            "question_type": "short-answer",
            "answer": "nucleus, wall",
            "marking_scheme": [{"point": "nucleus", "marks": 1}, {"point": "wall", "marks": 1}],
            "score": 2
        }
    ]})
    .to_string()
}

/// 整章流水线都能跑通的脚本
pub fn happy_model() -> ScriptedModel {
    ScriptedModel::new()
        .respond(PromptKind::ExtractExercises, extracted_questions_response())
        .respond(PromptKind::ExtractConstructedResponse, "[]")
        .respond(
            PromptKind::LinkImages,
            json!([figure_url_for(4, 2)]).to_string(),
        )
        .respond(PromptKind::SolveQuestions, solved_response())
        .respond(PromptKind::ShortAnswerMarking, short_answer_marking_response())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
