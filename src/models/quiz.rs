// src/models/quiz.rs

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A quiz as the attempt engine sees it: ordered questions with their
/// answer keys plus the rules an attempt is judged by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<QuizQuestion>,

    /// Minimum score (percent, 0-100) needed to pass.
    pub passing_score: f64,

    /// `None` or `0` means the quiz is not timed.
    pub time_limit_minutes: Option<i32>,

    pub max_attempts: i32,
}

impl QuizDefinition {
    /// The enforced time limit, if the quiz has one.
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_minutes {
            Some(minutes) if minutes > 0 => Some(Duration::minutes(i64::from(minutes))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub content: String,
    pub options: Vec<String>,

    /// Every option that must be selected, and nothing else.
    pub correct_answers: Vec<String>,
}

/// DTO for sending a quiz to a student (answer keys stripped).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: f64,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub content: String,
    pub options: Vec<String>,
}

impl From<QuizDefinition> for PublicQuiz {
    fn from(quiz: QuizDefinition) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            passing_score: quiz.passing_score,
            time_limit_minutes: quiz.time_limit_minutes,
            max_attempts: quiz.max_attempts,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    content: q.content,
                    options: q.options,
                })
                .collect(),
        }
    }
}

/// DTO for creating a new quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: Option<f64>,
    #[validate(range(min = 0, max = 1440))]
    pub time_limit_minutes: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: i32,
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for one question inside `CreateQuizRequest`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_answer_keys))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(custom(function = validate_options))]
    pub correct_answers: Vec<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Every correct answer must be one of the offered options.
fn validate_answer_keys(question: &CreateQuestionRequest) -> Result<(), validator::ValidationError> {
    let unanswerable = question
        .correct_answers
        .iter()
        .any(|answer| !question.options.contains(answer));
    if unanswerable {
        return Err(validator::ValidationError::new("correct_answer_not_in_options"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateQuizRequest {
        CreateQuizRequest {
            title: "Ownership".to_string(),
            description: None,
            passing_score: Some(70.0),
            time_limit_minutes: Some(15),
            max_attempts: 3,
            questions: vec![CreateQuestionRequest {
                content: "Which trait enables `?` conversion?".to_string(),
                options: vec!["From".to_string(), "Into".to_string()],
                correct_answers: vec!["From".to_string()],
            }],
        }
    }

    #[test]
    fn test_create_quiz_request_valid() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_create_quiz_request_rejects_bad_rules() {
        let mut req = request();
        req.max_attempts = 0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.passing_score = Some(101.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_question_needs_an_answer_key() {
        let mut req = request();
        req.questions[0].correct_answers.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_answer_key_must_be_an_option() {
        let mut req = request();
        req.questions[0].correct_answers = vec!["Deref".to_string()];
        assert!(req.validate().is_err());

        let mut req = request();
        req.questions[0].correct_answers = vec!["Into".to_string(), "From".to_string()];
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_time_limit_zero_means_untimed() {
        let quiz = QuizDefinition {
            id: 1,
            title: "t".to_string(),
            description: None,
            questions: vec![],
            passing_score: 60.0,
            time_limit_minutes: Some(0),
            max_attempts: 1,
        };
        assert!(quiz.time_limit().is_none());

        let timed = QuizDefinition {
            time_limit_minutes: Some(5),
            ..quiz
        };
        assert_eq!(timed.time_limit(), Some(Duration::minutes(5)));
    }
}
