// src/services/scoring.rs

use std::collections::HashSet;

use crate::models::{attempt::AnswerSheet, quiz::QuizDefinition};

/// Outcome of grading one answer sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCard {
    pub correct_count: usize,
    pub total_questions: usize,
    /// Percentage, 0-100.
    pub score: f64,
    pub passed: bool,
}

/// Grades `answers` against the quiz's answer keys.
///
/// A question counts only when the submitted options equal the correct
/// options as sets: order and duplicates do not matter, missing or extra
/// options make it wrong. Unanswered questions are wrong, answers to
/// questions the quiz does not contain are ignored. A quiz without
/// questions scores 0.
pub fn score_attempt(quiz: &QuizDefinition, answers: &AnswerSheet) -> ScoreCard {
    let total_questions = quiz.questions.len();

    let correct_count = quiz
        .questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .is_some_and(|submitted| same_options(&q.correct_answers, submitted))
        })
        .count();

    let score = if total_questions == 0 {
        0.0
    } else {
        (correct_count as f64 / total_questions as f64) * 100.0
    };

    ScoreCard {
        correct_count,
        total_questions,
        score,
        passed: score >= quiz.passing_score,
    }
}

fn same_options(expected: &[String], submitted: &[String]) -> bool {
    let expected: HashSet<&str> = expected.iter().map(String::as_str).collect();
    let submitted: HashSet<&str> = submitted.iter().map(String::as_str).collect();
    expected == submitted
}
