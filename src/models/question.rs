// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Closed set of question types.
///
/// Each variant fixes the answer shape it accepts, whether it carries an option
/// list, and its per-question point cost. Stored as snake_case TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    ShortAnswer,
    Paragraph,
    MultipleChoice,
    CheckBox,
    DropDown,
    LinearScale,
}

impl QuestionType {
    /// Per-question point cost charged into the survey's creation budget.
    pub fn point_cost(self) -> i64 {
        match self {
            QuestionType::ShortAnswer => 12,
            QuestionType::Paragraph => 20,
            QuestionType::MultipleChoice => 10,
            QuestionType::CheckBox => 15,
            QuestionType::DropDown => 12,
            QuestionType::LinearScale => 12,
        }
    }

    /// Whether this type carries an option list.
    pub fn requires_options(self) -> bool {
        !matches!(self, QuestionType::ShortAnswer | QuestionType::Paragraph)
    }

    /// Whether answers link to exactly one option.
    pub fn is_single_choice(self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::DropDown | QuestionType::LinearScale
        )
    }

    /// Whether answers are free text (aggregated as a plain list, not buckets).
    pub fn is_free_text(self) -> bool {
        matches!(self, QuestionType::ShortAnswer | QuestionType::Paragraph)
    }
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub survey_id: i64,
    pub content: String,
    pub question_type: QuestionType,
    /// Derived from `question_type` at creation time.
    pub point_cost: i64,
    pub image: Option<String>,
    /// Stable display order within the survey.
    pub position: i64,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'question_options' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub position: i64,
}

/// DTO for adding a question to a draft survey.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Question content length must be between 1 and 1000 characters."
    ))]
    pub content: String,
    pub question_type: QuestionType,
    pub image: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Validates the option list against the question type's contract.
///
/// Choice-like types need at least one option; text types must not carry any.
/// Linear Scale labels must parse as integers so they can be ordered numerically.
pub fn validate_option_set(
    question_type: QuestionType,
    options: &[String],
) -> Result<(), String> {
    if question_type.requires_options() {
        if options.is_empty() {
            return Err("this question type requires at least one option".to_string());
        }
    } else if !options.is_empty() {
        return Err("free-text question types cannot carry options".to_string());
    }

    for opt in options {
        let trimmed = opt.trim();
        if trimmed.is_empty() {
            return Err("option text cannot be empty".to_string());
        }
        if trimmed.len() > 500 {
            return Err("option text too long".to_string());
        }
        if question_type == QuestionType::LinearScale && trimmed.parse::<i64>().is_err() {
            return Err(format!("linear scale label '{}' is not an integer", trimmed));
        }
    }
    Ok(())
}

/// Orders options for display: numeric by label for Linear Scale (so "10" sorts
/// after "2"), creation position otherwise.
pub fn sort_options_for_display(question_type: QuestionType, options: &mut [QuestionOption]) {
    if question_type == QuestionType::LinearScale {
        options.sort_by_key(|o| o.content.trim().parse::<i64>().unwrap_or(i64::MAX));
    } else {
        options.sort_by_key(|o| o.position);
    }
}

/// Raw answer payload for a single question, shaped by the question's type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerInput {
    /// Short Answer / Paragraph.
    Text { value: String },
    /// Multiple Choice / Drop Down / Linear Scale.
    Choice { option_id: i64 },
    /// Check Box.
    Selection { option_ids: Vec<i64> },
}

/// Stored representation of a validated answer: a readable text snapshot plus,
/// for single-choice types, the chosen option's id. The snapshot is deliberately
/// denormalized so reports stay readable even if the option row changes later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAnswer {
    pub text: String,
    pub option_id: Option<i64>,
}

/// Validates a raw answer against the question's type contract and normalizes
/// it into the stored shape. The error string names what was wrong; the caller
/// attaches the question id.
pub fn validate_answer(
    question_type: QuestionType,
    options: &[QuestionOption],
    input: &AnswerInput,
) -> Result<NormalizedAnswer, String> {
    match (question_type, input) {
        (QuestionType::ShortAnswer | QuestionType::Paragraph, AnswerInput::Text { value }) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err("answer text cannot be empty".to_string());
            }
            Ok(NormalizedAnswer {
                text: trimmed.to_string(),
                option_id: None,
            })
        }
        (
            QuestionType::MultipleChoice | QuestionType::DropDown | QuestionType::LinearScale,
            AnswerInput::Choice { option_id },
        ) => {
            let chosen = options
                .iter()
                .find(|o| o.id == *option_id)
                .ok_or_else(|| "chosen option does not belong to this question".to_string())?;
            if question_type == QuestionType::LinearScale
                && chosen.content.trim().parse::<i64>().is_err()
            {
                return Err("linear scale option label is not numeric".to_string());
            }
            Ok(NormalizedAnswer {
                text: chosen.content.clone(),
                option_id: Some(chosen.id),
            })
        }
        (QuestionType::CheckBox, AnswerInput::Selection { option_ids }) => {
            if option_ids.is_empty() {
                return Err("at least one option must be selected".to_string());
            }
            let mut labels = Vec::with_capacity(option_ids.len());
            for id in option_ids {
                let chosen = options.iter().find(|o| o.id == *id).ok_or_else(|| {
                    "selected option does not belong to this question".to_string()
                })?;
                if !labels.contains(&chosen.content) {
                    labels.push(chosen.content.clone());
                }
            }
            // One detail row per question; the selected labels are stored as a
            // JSON array so aggregation can count each one independently.
            let text = serde_json::to_string(&labels)
                .map_err(|e| format!("failed to encode selection: {}", e))?;
            Ok(NormalizedAnswer {
                text,
                option_id: None,
            })
        }
        _ => Err("answer shape does not match the question type".to_string()),
    }
}

/// One bucket of the per-question frequency table.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AnswerCount {
    pub label: String,
    pub count: i64,
}

/// Creator-facing aggregation of one question's answers.
#[derive(Debug, Serialize)]
pub struct QuestionReport {
    pub question_id: i64,
    pub content: String,
    pub question_type: QuestionType,
    /// Frequency buckets for choice-like types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Vec<AnswerCount>>,
    /// Plain answer list for free-text types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
}

/// Builds the frequency table for a choice-like question from stored snapshots.
///
/// Check Box snapshots are JSON label arrays; each selected label contributes
/// one count per response, so a single response can feed multiple buckets.
/// Buckets keep first-seen order for stable output.
pub fn count_answer_labels(question_type: QuestionType, snapshots: &[String]) -> Vec<AnswerCount> {
    let mut buckets: Vec<AnswerCount> = Vec::new();
    let mut bump = |label: &str, buckets: &mut Vec<AnswerCount>| {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.label == label) {
            bucket.count += 1;
        } else {
            buckets.push(AnswerCount {
                label: label.to_string(),
                count: 1,
            });
        }
    };

    for snapshot in snapshots {
        if question_type == QuestionType::CheckBox {
            match serde_json::from_str::<Vec<String>>(snapshot) {
                Ok(labels) => {
                    for label in &labels {
                        bump(label, &mut buckets);
                    }
                }
                // Pre-JSON rows (or hand-edited data) count as a single label.
                Err(_) => bump(snapshot, &mut buckets),
            }
        } else {
            bump(snapshot, &mut buckets);
        }
    }
    buckets
}
