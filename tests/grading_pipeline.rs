mod common;

use common::{png_bytes, write_png, ScriptedModel, Step};
use homework_grader::error::{AppError, ImageError};
use homework_grader::models::{Analysis, Difficulty, PageStatus};
use homework_grader::{Config, GradingOrchestrator, GradingRequest, ImageRef, PromptRevision};

const PAGE_TWO: &str = r#"```json
{
    "page_results": [
        {"question_number": 1, "score": 7, "analysis": "Torque explained correctly. Considering that the current difficulty is 5, the score should be..."}
    ],
    "image_modifications": [
        {"shape": "circle", "color": "red", "coordinates": [0.5, 0.4, 0.05], "text": "units?", "question_number": 1}
    ]
}
```"#;

const PAGE_THREE: &str = r#"{
    "page_results": [
        {"question_number": 2, "score": 5, "analysis": "Partially correct."},
        {"question_number": 3, "score": 3, "analysis": "Missing the lever arm."}
    ],
    "image_modifications": [
        {"shape": "rectangle", "coordinates": [0.1, 0.2, 0.6, 0.3], "question_number": 2},
        {"shape": "line", "coordinates": [0.1, 0.8, 0.9, 0.8], "question_number": 3}
    ]
}"#;

fn orchestrator(revision: PromptRevision) -> GradingOrchestrator {
    GradingOrchestrator::new(Config {
        prompt_revision: revision,
        ..Config::default()
    })
}

fn request(problem_pages: usize, answer_pages: usize) -> GradingRequest {
    GradingRequest::new(
        (0..problem_pages)
            .map(|_| ImageRef::InMemoryBytes(png_bytes(16, 16)))
            .collect(),
        (0..answer_pages)
            .map(|_| ImageRef::InMemoryBytes(png_bytes(20, 30)))
            .collect(),
        "Explain torque on a bicycle brake lever (10 points).",
        Difficulty::new(5),
    )
}

#[tokio::test]
async fn test_three_pages_sum_to_fifteen() {
    let model = ScriptedModel::replying(["0", PAGE_TWO, PAGE_THREE, "Good grasp of torque."]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(2, 3))
        .await
        .unwrap();

    assert_eq!(result.scores, vec![7, 5, 3]);
    assert_eq!(result.analyses.len(), 3);
    assert_eq!(result.final_score, 15);
    assert_eq!(result.feedback, "Good grasp of torque.");

    assert_eq!(result.image_modifications.len(), 3);
    assert!(result.image_modifications[0].is_empty());
    assert_eq!(result.image_modifications[1].len(), 1);
    assert_eq!(result.image_modifications[2].len(), 2);

    // 题号与标注随题目保留
    let numbers: Vec<Option<u32>> = result.questions.iter().map(|q| q.question_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
    let scores: Vec<i64> = result.questions.iter().map(|q| q.score).collect();
    assert_eq!(scores, result.scores);
    assert!(result.questions.iter().all(|q| q.annotations.len() == 1));
    assert_eq!(result.questions[0].annotations[0].text(), Some("units?"));

    assert_eq!(
        result.page_statuses,
        vec![
            PageStatus::NoAnswer,
            PageStatus::Graded { questions: 1 },
            PageStatus::Graded { questions: 2 },
        ]
    );

    // 每页: 2 张题目图 + 1 张答题图；总评不带图片
    let calls = model.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[..3].iter().all(|c| c.image_count == 3));
    assert_eq!(calls[3].image_count, 0);
    assert!(calls[1].prompt.contains("Student Answer Sheet Page 2"));
    assert!(calls[3].prompt.contains("The final score is 15."));
}

#[tokio::test]
async fn test_truncated_json_becomes_single_placeholder() {
    let model = ScriptedModel::replying([
        r#"{"page_results": [{"question_number": 1, "score": 9, "analysis": "cut o"#,
        PAGE_TWO,
        "feedback",
    ]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 2))
        .await
        .unwrap();

    assert_eq!(result.scores, vec![0, 7]);
    assert_eq!(result.final_score, 7);
    assert!(result.analyses[0].is_error());
    assert_eq!(
        result.analyses[0],
        Analysis::placeholder(
            "Failed to decode JSON for Answer Sheet Page 1. Raw response needs investigation."
        )
    );
    assert!(!result.analyses[1].is_error());
    assert_eq!(result.image_modifications.len(), 2);
    assert!(result.image_modifications[0].is_empty());
    assert_eq!(result.placeholder_count(), 1);
    assert_eq!(result.questions.len(), 2);
    assert_eq!(result.questions[0].question_number, None);
    assert_eq!(result.questions[1].question_number, Some(1));
}

#[tokio::test]
async fn test_empty_reply_keeps_graded_pages() {
    let model = ScriptedModel::from_steps([
        Step::Reply(PAGE_TWO.to_string()),
        Step::Empty,
        Step::Reply("0".to_string()),
        Step::Reply("feedback".to_string()),
    ]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 3))
        .await
        .unwrap();

    assert_eq!(result.scores, vec![7, 0]);
    assert_eq!(result.final_score, 7);
    assert!(result.analyses[1].is_error());
    assert_eq!(result.image_modifications.len(), 3);
    assert!(matches!(
        result.page_statuses[1],
        PageStatus::Placeholder { .. }
    ));
    assert_eq!(model.calls().len(), 4);
}

#[tokio::test]
async fn test_missing_page_results_becomes_placeholder() {
    let model = ScriptedModel::replying([
        r#"{"image_modifications": [{"shape": "line", "coordinates": [0, 0, 1, 1]}]}"#,
        "feedback",
    ]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(0, 1))
        .await
        .unwrap();

    assert_eq!(result.scores, vec![0]);
    assert_eq!(
        result.analyses,
        vec![Analysis::placeholder(
            "The response for Answer Sheet Page 1 did not contain 'page_results'. Invalid format."
        )]
    );
    assert_eq!(result.image_modifications, vec![Vec::new()]);
}

#[tokio::test]
async fn test_no_answer_pages_add_no_entries() {
    let model = ScriptedModel::replying(["0", "```\n0\n```", "nothing to review"]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 2))
        .await
        .unwrap();

    assert!(result.scores.is_empty());
    assert!(result.analyses.is_empty());
    assert_eq!(result.final_score, 0);
    assert_eq!(result.image_modifications.len(), 2);
    assert_eq!(result.placeholder_count(), 0);
}

#[tokio::test]
async fn test_entries_missing_fields_are_excluded() {
    let model = ScriptedModel::replying([
        r#"{"page_results": [
            {"question_number": 1, "score": 4, "analysis": "ok"},
            {"question_number": 2, "analysis": "no score"},
            {"question_number": 3, "score": 6}
        ]}"#,
        "feedback",
    ]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 1))
        .await
        .unwrap();

    assert_eq!(result.scores, vec![4]);
    assert_eq!(result.analyses.len(), 1);
    assert_eq!(result.final_score, 4);
}

#[tokio::test]
async fn test_score_points_revision_keeps_rubric_mapping() {
    let model = ScriptedModel::replying([
        r#"{"page_results": [{"question_number": 1, "score": 8, "analysis": {"score_point_1": "3/3", "score_point_2": "5/7"}}]}"#,
        "feedback",
    ]);

    let result = orchestrator(PromptRevision::ScorePoints)
        .grade_with_model(&model, &request(1, 1))
        .await
        .unwrap();

    assert!(matches!(result.analyses[0], Analysis::ScorePoints(_)));
    assert!(model.calls()[0].prompt.contains("score_point_1"));
}

#[tokio::test]
async fn test_missing_image_fails_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let present = write_png(dir.path(), "ans1.png", 10, 10);
    let model = ScriptedModel::replying(["0", "0", "feedback"]);

    let request = GradingRequest::new(
        vec![ImageRef::from(dir.path().join("testPaperB.png"))],
        vec![ImageRef::from(present)],
        "rubric",
        Difficulty::default(),
    );

    let err = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Image(ImageError::NotFound { .. }))
    ));
    assert!(model.calls().is_empty());
}

#[tokio::test]
async fn test_request_failure_aborts_run() {
    let model = ScriptedModel::new([Ok(PAGE_TWO), Err("503 Service Unavailable"), Ok("feedback")]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 3))
        .await;

    assert!(result.is_err());
    assert_eq!(model.calls().len(), 2);
}

#[tokio::test]
async fn test_feedback_failure_aborts_run() {
    let model = ScriptedModel::new([Ok("0"), Err("timeout")]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 1))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_answer_pages_rejected() {
    let model = ScriptedModel::replying(["feedback"]);

    let result = orchestrator(PromptRevision::Annotated)
        .grade_with_model(&model, &request(1, 0))
        .await;

    assert!(result.is_err());
    assert!(model.calls().is_empty());
}
