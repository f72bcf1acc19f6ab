// src/services/grading.rs

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::{error::AppError, models::student_result::AttemptSummary};

/// What the grader needs to know about a stored question.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerKey {
    pub id: i64,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_option: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    /// One entry per answer key, in key order.
    pub answers: Vec<GradedAnswer>,
    pub correct_count: usize,
    pub total_questions: usize,
    pub score: i64,
}

/// Integer percentage rounded down. An empty quiz scores 0.
pub fn percent_score(correct: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    (correct * 100 / total) as i64
}

/// Compares submitted options against the answer keys.
///
/// Matching is exact and case-sensitive. A question with no submitted option is
/// graded as wrong; submitted ids that are not in `keys` are ignored.
pub fn grade_answers(keys: &[AnswerKey], answers: &HashMap<i64, String>) -> Grade {
    let graded: Vec<GradedAnswer> = keys
        .iter()
        .map(|key| {
            let selected = answers.get(&key.id).cloned();
            let is_correct = selected.as_deref() == Some(key.correct_answer.as_str());
            GradedAnswer {
                question_id: key.id,
                selected_option: selected,
                is_correct,
            }
        })
        .collect();

    let correct_count = graded.iter().filter(|a| a.is_correct).count();
    let total_questions = graded.len();

    Grade {
        answers: graded,
        correct_count,
        total_questions,
        score: percent_score(correct_count, total_questions),
    }
}

/// Grades and records one attempt.
///
/// Always inserts: a retake adds a new result and a new set of answers
/// next to the earlier ones. The result and its answers commit together.
pub async fn submit_attempt(
    pool: &SqlitePool,
    user_id: i64,
    quiz_id: i64,
    answers: &HashMap<i64, String>,
) -> Result<AttemptSummary, AppError> {
    let quiz_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .is_some();
    if !quiz_exists {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let keys = sqlx::query_as::<_, AnswerKey>(
        "SELECT id, correct_answer FROM questions WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let grade = grade_answers(&keys, answers);
    let submitted_at = chrono::Utc::now();

    let mut tx = pool.begin().await?;

    let result_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO student_results (user_id, quiz_id, score, total_questions, submitted_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(grade.score)
    .bind(grade.total_questions as i64)
    .bind(submitted_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert student result: {:?}", e);
        AppError::from(e)
    })?;

    for answer in &grade.answers {
        sqlx::query(
            r#"
            INSERT INTO student_answers
                (result_id, user_id, quiz_id, question_id, selected_option, is_correct)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(result_id)
        .bind(user_id)
        .bind(quiz_id)
        .bind(answer.question_id)
        .bind(answer.selected_option.as_deref())
        .bind(answer.is_correct)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert student answer for result {}: {:?}", result_id, e);
            AppError::from(e)
        })?;
    }

    tx.commit().await?;

    tracing::info!(
        "User {} scored {}% on quiz {} ({}/{})",
        user_id,
        grade.score,
        quiz_id,
        grade.correct_count,
        grade.total_questions
    );

    Ok(AttemptSummary {
        result_id,
        quiz_id,
        score: grade.score,
        correct_count: grade.correct_count as i64,
        total_questions: grade.total_questions as i64,
        submitted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_quiz, create_user, memory_pool};
    use crate::utils::roles::Role;

    fn keys(answers: &[&str]) -> Vec<AnswerKey> {
        answers
            .iter()
            .enumerate()
            .map(|(i, a)| AnswerKey {
                id: i as i64 + 1,
                correct_answer: a.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_percent_score_floors() {
        assert_eq!(percent_score(2, 3), 66);
        assert_eq!(percent_score(1, 3), 33);
        assert_eq!(percent_score(3, 3), 100);
        assert_eq!(percent_score(0, 4), 0);
    }

    #[test]
    fn test_percent_score_empty_quiz() {
        assert_eq!(percent_score(0, 0), 0);
    }

    #[test]
    fn test_grade_missing_answer_is_wrong() {
        let mut submitted = HashMap::new();
        submitted.insert(1, "A".to_string());
        submitted.insert(2, "C".to_string());

        let grade = grade_answers(&keys(&["A", "C", "B"]), &submitted);

        assert_eq!(grade.correct_count, 2);
        assert_eq!(grade.total_questions, 3);
        assert_eq!(grade.score, 66);
        assert_eq!(grade.answers[2].selected_option, None);
        assert!(!grade.answers[2].is_correct);
    }

    #[test]
    fn test_grade_is_case_sensitive() {
        let mut submitted = HashMap::new();
        submitted.insert(1, "paris".to_string());

        let grade = grade_answers(&keys(&["Paris"]), &submitted);
        assert_eq!(grade.correct_count, 0);
    }

    #[test]
    fn test_grade_ignores_unknown_question_ids() {
        let mut submitted = HashMap::new();
        submitted.insert(1, "A".to_string());
        submitted.insert(99, "A".to_string());

        let grade = grade_answers(&keys(&["A"]), &submitted);
        assert_eq!(grade.answers.len(), 1);
        assert_eq!(grade.score, 100);
    }

    #[tokio::test]
    async fn test_submit_records_every_question() {
        let pool = memory_pool().await;
        let teacher = create_user(&pool, "teacher", Role::Teacher).await;
        let student = create_user(&pool, "student", Role::Student).await;
        let (quiz_id, question_ids) = create_quiz(&pool, teacher, &["A", "C", "B"]).await;

        let mut submitted = HashMap::new();
        submitted.insert(question_ids[0], "A".to_string());
        submitted.insert(question_ids[1], "C".to_string());

        let summary = submit_attempt(&pool, student, quiz_id, &submitted).await.unwrap();
        assert_eq!(summary.score, 66);
        assert_eq!(summary.correct_count, 2);
        assert_eq!(summary.total_questions, 3);

        let rows: Vec<(i64, Option<String>, bool)> = sqlx::query_as(
            "SELECT question_id, selected_option, is_correct FROM student_answers WHERE result_id = ? ORDER BY question_id",
        )
        .bind(summary.result_id)
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], (question_ids[0], Some("A".to_string()), true));
        assert_eq!(rows[1], (question_ids[1], Some("C".to_string()), true));
        assert_eq!(rows[2], (question_ids[2], None, false));
    }

    #[tokio::test]
    async fn test_resubmission_accumulates() {
        let pool = memory_pool().await;
        let teacher = create_user(&pool, "teacher", Role::Teacher).await;
        let student = create_user(&pool, "student", Role::Student).await;
        let (quiz_id, question_ids) = create_quiz(&pool, teacher, &["A"]).await;

        let mut wrong = HashMap::new();
        wrong.insert(question_ids[0], "B".to_string());
        let mut right = HashMap::new();
        right.insert(question_ids[0], "A".to_string());

        let first = submit_attempt(&pool, student, quiz_id, &wrong).await.unwrap();
        let second = submit_attempt(&pool, student, quiz_id, &right).await.unwrap();
        assert_ne!(first.result_id, second.result_id);

        let scores: Vec<i64> = sqlx::query_scalar(
            "SELECT score FROM student_results WHERE user_id = ? AND quiz_id = ? ORDER BY id",
        )
        .bind(student)
        .bind(quiz_id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(scores, vec![0, 100]);

        let answers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_answers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(answers, 2);
    }

    #[tokio::test]
    async fn test_empty_quiz_scores_zero() {
        let pool = memory_pool().await;
        let teacher = create_user(&pool, "teacher", Role::Teacher).await;
        let student = create_user(&pool, "student", Role::Student).await;
        let (quiz_id, _) = create_quiz(&pool, teacher, &[]).await;

        let summary = submit_attempt(&pool, student, quiz_id, &HashMap::new()).await.unwrap();
        assert_eq!(summary.score, 0);
        assert_eq!(summary.total_questions, 0);
    }

    #[tokio::test]
    async fn test_unknown_quiz_is_not_found() {
        let pool = memory_pool().await;
        let student = create_user(&pool, "student", Role::Student).await;

        let result = submit_attempt(&pool, student, 404, &HashMap::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_answer_insert_rolls_back_result() {
        let pool = memory_pool().await;
        let teacher = create_user(&pool, "teacher", Role::Teacher).await;
        let student = create_user(&pool, "student", Role::Student).await;
        let (quiz_id, _) = create_quiz(&pool, teacher, &["A", "B"]).await;
        sqlx::query("DROP TABLE student_answers").execute(&pool).await.unwrap();

        let result = submit_attempt(&pool, student, quiz_id, &HashMap::new()).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));

        let results: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_results")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(results, 0);
    }
}
