//! 整章流水线集成测试：状态推进、断点续跑、失败保留检查点

mod common;

use common::*;
use exercise_extractor::clients::{Collaborators, PromptKind};
use exercise_extractor::infrastructure::{FsArtifactStore, Stage};
use exercise_extractor::models::{Chapter, PageNumber, QuestionType, ScoredQuestion};
use exercise_extractor::orchestrator::{App, ChapterProcessor, ChapterState};
use exercise_extractor::services::Prompts;
use exercise_extractor::Config;
use serde_json::json;
use std::sync::Arc;

fn processor(fakes: &Fakes, config: &Config) -> ChapterProcessor {
    ChapterProcessor::new(config, &fakes.collaborators(), Prompts::new("g7"))
}

fn happy_fakes() -> Fakes {
    Fakes::new(
        happy_model(),
        FakeLayout::new().with_figures("4.png", 2),
        FakeImages::new(),
    )
}

fn chapter_without_text(id: &str) -> Chapter {
    serde_json::from_value(json!({"id": id, "title": "Preface", "chapter_text": null})).unwrap()
}

#[tokio::test]
async fn chapter_without_exercises_is_skipped_untouched() {
    let fakes = happy_fakes();
    let empty: Chapter = serde_json::from_value(json!({
        "id": CHAPTER_ID,
        "title": "Glossary",
        "chapter_text": {"exercises": []}
    }))
    .unwrap();

    for chapter in [chapter_without_text(CHAPTER_ID), empty] {
        let report = processor(&fakes, &config()).process(&book(), &chapter, 0).await;
        assert_eq!(report.state, ChapterState::SkippedNoExercises);
        assert!(report.completed_stages.is_empty());
        assert!(report.error.is_none());
    }

    assert!(fakes.model.calls().is_empty());
    assert!(fakes.images.downloads().is_empty());
    assert!(fakes.store.keys().is_empty());
}

#[tokio::test]
async fn full_run_reaches_done_with_every_checkpoint() {
    let fakes = happy_fakes();
    let chapter = chapter_with_pages(&[4, 7, 4, 9]);

    let report = processor(&fakes, &config()).process(&book(), &chapter, 0).await;

    assert_eq!(report.state, ChapterState::Done, "{:?}", report.error);
    assert_eq!(report.completed_stages, Stage::ALL.to_vec());
    assert_eq!(report.questions, 2);
    for stage in Stage::ALL {
        assert!(fakes.has(stage), "missing checkpoint {}", stage);
    }
    assert_eq!(
        fakes.store.keys().len(),
        6,
        "only the six stage checkpoints are written"
    );

    // 页面缓存已释放
    for dir in fakes.images.dest_dirs() {
        assert!(!dir.exists());
    }

    assert_eq!(
        fakes.model.kinds(),
        vec![
            PromptKind::ExtractExercises,
            PromptKind::ExtractConstructedResponse,
            PromptKind::LinkImages,
            PromptKind::SolveQuestions,
            PromptKind::ShortAnswerMarking,
        ]
    );

    let linked = fakes.load(Stage::LinkedImages).await;
    assert_eq!(linked[0]["question_image_url"], figure_url_for(4, 2));
    assert!(linked[1].get("question_image_url").is_none());

    let figures = fakes.load(Stage::PageWiseFigures).await;
    assert_eq!(
        figures["4"],
        json!([figure_url_for(4, 1), figure_url_for(4, 2)])
    );

    let scored: Vec<ScoredQuestion> =
        serde_json::from_value(fakes.load(Stage::MarkingScheme).await).unwrap();
    assert_eq!(scored[0].question_type(), &QuestionType::ShortAnswer);
    assert_eq!(scored[0].score, 2.0);
    assert_eq!(scored[1].question_type(), &QuestionType::TrueFalse);
    assert_eq!(scored[1].score, 1.0);
    assert!(scored[1].marking_scheme.is_none());
}

#[tokio::test]
async fn resume_from_solved_uses_linked_checkpoint_only() {
    let fakes = happy_fakes();
    fakes
        .seed(
            Stage::LinkedImages,
            &json!([
                {
                    "question_page_number": 4,
                    "image_based_question": true,
                    "question_text": "Label the parts of the cell.",
                    "question_image_url": figure_url_for(4, 2)
                },
                {
                    "question_page_number": 7,
                    "image_based_question": false,
                    "question_text": "The sun is a star. True or false?"
                }
            ]),
        )
        .await;
    let config = Config {
        resume_from: Some(Stage::Solved),
        ..config()
    };

    let report = processor(&fakes, &config)
        .process(&book(), &chapter_with_pages(&[4, 7]), 0)
        .await;

    assert_eq!(report.state, ChapterState::Done, "{:?}", report.error);
    assert_eq!(
        report.completed_stages,
        vec![Stage::Solved, Stage::MarkingScheme]
    );
    assert!(fakes.images.downloads().is_empty());
    assert!(fakes.layout.calls().is_empty());
    assert_eq!(
        fakes.model.kinds(),
        vec![PromptKind::SolveQuestions, PromptKind::ShortAnswerMarking]
    );
    assert!(!fakes.has(Stage::ExercisePages));
}

#[tokio::test]
async fn resume_from_figures_downloads_pages_again_without_extracting() {
    let fakes = happy_fakes();
    fakes
        .seed(
            Stage::Questions,
            &json!([
                {"question_page_number": 4, "image_based_question": true, "question_text": "Label the parts of the cell."},
                {"question_page_number": 7, "image_based_question": false, "question_text": "The sun is a star. True or false?"}
            ]),
        )
        .await;
    let config = Config {
        resume_from: Some(Stage::PageWiseFigures),
        ..config()
    };

    let report = processor(&fakes, &config)
        .process(&book(), &chapter_with_pages(&[4, 7]), 0)
        .await;

    assert_eq!(report.state, ChapterState::Done, "{:?}", report.error);
    assert_eq!(
        report.completed_stages,
        vec![
            Stage::ExercisePages,
            Stage::PageWiseFigures,
            Stage::LinkedImages,
            Stage::Solved,
            Stage::MarkingScheme
        ]
    );
    assert_eq!(fakes.images.downloads().len(), 2);
    assert!(fakes.model.calls_of(PromptKind::ExtractExercises).is_empty());
    assert!(fakes
        .model
        .calls_of(PromptKind::ExtractConstructedResponse)
        .is_empty());
    assert_eq!(fakes.storage.uploads().len(), 2);
}

#[tokio::test]
async fn solver_failure_keeps_earlier_checkpoints() {
    let fakes = Fakes::new(
        ScriptedModel::new()
            .respond(PromptKind::ExtractExercises, extracted_questions_response())
            .respond(PromptKind::ExtractConstructedResponse, "[]")
            .respond(PromptKind::LinkImages, json!([figure_url_for(4, 1)]).to_string())
            .respond(PromptKind::SolveQuestions, r#"{"answers": []}"#),
        FakeLayout::new().with_figures("4.png", 1),
        FakeImages::new(),
    );

    let report = processor(&fakes, &config())
        .process(&book(), &chapter_with_pages(&[4, 7]), 0)
        .await;

    assert_eq!(report.state, ChapterState::Failed);
    assert!(report.error.as_deref().unwrap_or_default().contains("questions"));
    assert_eq!(
        report.completed_stages,
        vec![
            Stage::ExercisePages,
            Stage::Questions,
            Stage::PageWiseFigures,
            Stage::LinkedImages
        ]
    );
    for stage in &report.completed_stages {
        assert!(fakes.has(*stage));
    }
    assert!(!fakes.has(Stage::Solved));
    assert!(!fakes.has(Stage::MarkingScheme));
}

#[tokio::test]
async fn download_failure_fails_chapter_without_checkpoints() {
    let fakes = Fakes::new(
        happy_model(),
        FakeLayout::new(),
        FakeImages::new().failing(&page_url(7)),
    );

    let report = processor(&fakes, &config())
        .process(&book(), &chapter_with_pages(&[4, 7]), 0)
        .await;

    assert_eq!(report.state, ChapterState::Failed);
    assert!(report.completed_stages.is_empty());
    assert!(report.error.as_deref().unwrap_or_default().contains(&page_url(7)));
    assert!(fakes.store.keys().is_empty());
    assert!(fakes.model.calls().is_empty());
    for dir in fakes.images.dest_dirs() {
        assert!(!dir.exists(), "page cache must be released on failure");
    }
}

#[tokio::test]
async fn strict_validation_aborts_on_unparseable_extraction() {
    let model = ScriptedModel::new()
        .respond(PromptKind::ExtractExercises, extracted_questions_response())
        .respond(PromptKind::ExtractConstructedResponse, "Sorry, no questions here.");
    let fakes = Fakes::new(model, FakeLayout::new(), FakeImages::new());
    let config = Config {
        strict_validation: true,
        ..config()
    };

    let report = processor(&fakes, &config)
        .process(&book(), &chapter_with_pages(&[4]), 0)
        .await;

    assert_eq!(report.state, ChapterState::Failed);
    assert_eq!(report.completed_stages, vec![Stage::ExercisePages]);
    assert!(!fakes.has(Stage::Questions));
    for dir in fakes.images.dest_dirs() {
        assert!(!dir.exists());
    }
}

#[tokio::test]
async fn book_processes_selected_chapters_in_order() {
    let fakes = happy_fakes();
    let config = Config {
        chapter_indices: Some(vec![0, 1]),
        ..config()
    };
    let app = App::with_collaborators(config, fakes.collaborators());

    let mut other = chapter_with_pages(&[4]);
    other.id = "c2".to_string();
    let chapters = vec![chapter_without_text("c0"), chapter_with_pages(&[4, 7]), other];

    let stats = app.process_book(&book(), &chapters).await;

    assert_eq!(stats.total, 2);
    assert_eq!(stats.done, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.failed, 0);
    let ids: Vec<&str> = stats.reports.iter().map(|r| r.chapter_id.as_str()).collect();
    assert_eq!(ids, vec!["c0", CHAPTER_ID]);
    assert!(fakes.store.keys().iter().all(|k| k.starts_with("b1_c1_")));
}

#[tokio::test]
async fn app_run_loads_documents_and_writes_checkpoint_files() {
    let dir = tempfile::tempdir().unwrap();
    let book_file = dir.path().join("book.json");
    let chapters_file = dir.path().join("chapters.json");
    let progress_dir = dir.path().join("progress");
    std::fs::write(&book_file, serde_json::to_vec(&vec![book()]).unwrap()).unwrap();
    std::fs::write(
        &chapters_file,
        serde_json::to_vec(&vec![chapter_with_pages(&[4, 7])]).unwrap(),
    )
    .unwrap();

    let fakes = happy_fakes();
    let collaborators = Collaborators {
        artifacts: Arc::new(FsArtifactStore::new(&progress_dir)),
        ..fakes.collaborators()
    };
    let config = Config {
        book_file: book_file.to_string_lossy().to_string(),
        chapters_file: chapters_file.to_string_lossy().to_string(),
        output_progress_dir: progress_dir.to_string_lossy().to_string(),
        ..config()
    };

    let stats = App::with_collaborators(config, collaborators)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.done, 1);
    for stage in Stage::ALL {
        let path = progress_dir.join(format!("b1_c1_{}.json", stage.name()));
        assert!(path.exists(), "missing {}", path.display());
    }
    let pages: serde_json::Value = serde_json::from_slice(
        &std::fs::read(progress_dir.join("b1_c1_exercise_pages.json")).unwrap(),
    )
    .unwrap();
    assert!(pages.get(PageNumber::from(4).as_str()).is_some());
}

#[tokio::test]
async fn app_run_reports_missing_book_file() {
    let fakes = happy_fakes();
    let config = Config {
        book_file: "/nonexistent/book.json".to_string(),
        ..config()
    };
    let err = App::with_collaborators(config, fakes.collaborators())
        .run()
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/book.json"));
}
