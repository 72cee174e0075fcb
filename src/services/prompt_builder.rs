//! 提示词构建 - 业务能力层
//!
//! 模型的宽严程度完全由提示词控制，分数本身不做任何事后换算。
//! 占位符按固定顺序替换，评分标准最后替换，避免其中的文字被误当作占位符。

use crate::config::PromptRevision;
use crate::models::{Analysis, Difficulty};

const PROBLEM_IMAGES_DISPLAY: &str =
    "Multiple Problem Images (specify topics in grading standards for best performance).";

const SCORE_POINTS_TEMPLATE: &str = r#"
You are an automated grader. Analyze the student's answer sheet page.
Problem Images: [PROBLEM_IMAGES]
Student Answer Sheet Page [PAGE]: [ANSWER_IMAGE]
Grading Standards: [GRADING_STANDARDS]

Review the problem images provided, then assess the *current answer sheet page* only.
Identify each question *answered on this page* and give it an integer score between 0 and 10 based on the grading standards.
For *each* question, break the analysis down by every score point mentioned in the grading standards and explain why the student received that score.

Respond with a single JSON object listing the question results for *this page*:

```json
{
    "page_results": [
        {
            "question_number": <integer>,
            "score": <integer>,
            "analysis": {
                "score_point_1": "<analysis and score for score point 1>",
                "score_point_2": "<analysis and score for score point 2>"
            }
        }
    ]
}
```

If no questions are answered on this page, or you cannot produce valid JSON, respond with just the integer 0.
"#;

const ANNOTATED_TEMPLATE: &str = r#"
You are an automated grader and image annotation instructor. Analyze the student's answer sheet page and produce instructions for marking it up.
Problem Images: [PROBLEM_IMAGES]
Student Answer Sheet Page [PAGE]: [ANSWER_IMAGE]
Grading Standards: [GRADING_STANDARDS]

The scoring_difficulty for the question is [DIFFICULTY]!!!

Identify every question *answered on this page* (a page may hold several) and grade each one. An unanswered question scores zero.

For each question on this page:
- Give an integer score from 0 to 10 based on the grading standards, taking the scoring difficulty into account.
  Scoring difficulty means:

  * **Difficulty 10:** extremely strict. A high score requires the student to cover *every* key point and detail in the grading standards, in precise terminology and with depth. Synonyms or a missing minor detail cost points.
    Example: for "reasons for the rise of the Roman Empire", full marks need military strength, geography, infrastructure, political structure, economic power, cultural assimilation and strong leadership, each discussed with specifics.
  * **Difficulty 5:** not hard. Full marks need a general understanding of the topic. The answer must be reasonably related to the key points but need not match the grading standards word for word; a single mistake or omission can be ignored. A partially correct answer can still score high.
    Example: an answer discussing only "military strength" and "geography" can score high; related ideas such as technology or culture earn some credit if not logically wrong.
  * **Difficulty 1:** very lenient. Full marks need only a general understanding, as long as nothing stated is false or logically fallacious. The answer only has to be reasonably related to the topic; mistakes or omissions can be ignored, and a correct answer that differs entirely from the standard one can still get full marks.
  * **Difficulty 2 to 9:** somewhere between these extremes. Higher numbers are stricter, lower numbers more lenient. Use your best judgement.

- Write a *concise* overall analysis of the answer's strengths and weaknesses against the grading criteria. Do not split it into score points. End it with exactly this sentence: "Considering that the current difficulty is [DIFFICULTY], the score should be..."

The scoring_difficulty for the question is [DIFFICULTY]!!!

Also give short, specific instructions for marking incorrect or incomplete areas on the answer image. Output every x,y coordinate as a ratio in [0,1] relative to the image size, and use RED.

Respond with JSON only:

```json
{
    "page_results": [
        {
            "question_number": <integer>,
            "score": <integer>,
            "analysis": "<overall analysis> Considering that the current difficulty is [DIFFICULTY], the score should be..."
        }
    ],
    "image_modifications": [
        {
            "shape": "<circle | rectangle | line>",
            "color": "red",
            "coordinates": [<x1>, <y1>, <x2>, <y2>],
            "line_width": <integer>,
            "font_size": <integer>,
            "text": "<short correction text>",
            "question_number": <integer>
        }
    ]
}
```
For circles use "coordinates": [<center_x>, <center_y>, <radius>].

If no questions are answered on this page, or you cannot produce valid JSON, respond with just 0.
"#;

const FEEDBACK_TEMPLATE: &str = r#"
You have graded a student's multi-page test paper. The final score is [FINAL_SCORE].
Provide general feedback on the student's performance, highlighting strengths and weaknesses based on the individual question analyses from all pages.
Analyses: [ANALYSES]
Grading Standards: [GRADING_STANDARDS]

Keep the response concise and helpful. Mention the strongest and weakest areas based on the score ranges.
"#;

/// 答题页描述（页码从 1 开始）
fn answer_image_display(page_number: usize) -> String {
    format!(
        "Student Answer Sheet Page {page_number} Image Data: Student's answers to questions from the problem set (this is page {page_number})."
    )
}

/// 构建单页评分提示词
pub fn build_page_prompt(
    revision: PromptRevision,
    page_number: usize,
    rubric: &str,
    difficulty: Difficulty,
) -> String {
    let template = match revision {
        PromptRevision::ScorePoints => SCORE_POINTS_TEMPLATE,
        PromptRevision::Annotated => ANNOTATED_TEMPLATE,
    };

    template
        .replace("[PROBLEM_IMAGES]", PROBLEM_IMAGES_DISPLAY)
        .replace("[ANSWER_IMAGE]", &answer_image_display(page_number))
        .replace("[PAGE]", &page_number.to_string())
        .replace("[DIFFICULTY]", &difficulty.to_string())
        .replace("[GRADING_STANDARDS]", rubric)
}

/// 构建总评提示词
pub fn build_feedback_prompt(final_score: i64, analyses: &[Analysis], rubric: &str) -> String {
    let analyses_json = serde_json::to_string(analyses).unwrap_or_else(|_| "[]".to_string());

    FEEDBACK_TEMPLATE
        .replace("[FINAL_SCORE]", &final_score.to_string())
        .replace("[ANALYSES]", &analyses_json)
        .replace("[GRADING_STANDARDS]", rubric)
}
