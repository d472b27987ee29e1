// src/store/progress.rs

//! Per-topic progress aggregation.

use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, prelude::FromRow};

use crate::{error::AppError, models::progress::UserProgress};

#[derive(FromRow)]
struct ProgressRow {
    id: i64,
    topic: String,
    total_questions: i64,
    correct_answers: i64,
    average_score: f64,
    time_spent: i64,
    last_studied: DateTime<Utc>,
    streak_days: i64,
}

impl From<ProgressRow> for UserProgress {
    fn from(row: ProgressRow) -> Self {
        UserProgress {
            id: row.id,
            topic: row.topic,
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            average_score: row.average_score,
            time_spent: row.time_spent,
            last_studied: row.last_studied,
            streak_days: row.streak_days,
        }
    }
}

/// `correct / total * 100`, or 0 before anything was answered.
pub fn average_score(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

/// Streak after studying at `now`, given the previous study day and streak.
///
/// Days are UTC calendar dates. Same day keeps the streak, the next day extends
/// it, any longer gap (or a clock that went backwards) restarts it at 1.
pub fn next_streak(previous: Option<(DateTime<Utc>, i64)>, now: DateTime<Utc>) -> i64 {
    let Some((last_studied, streak)) = previous else {
        return 1;
    };

    let gap = (now.date_naive() - last_studied.date_naive()).num_days();
    match gap {
        0 => streak.max(1),
        1 => streak.max(0) + 1,
        _ => 1,
    }
}

/// Repository for `user_progress`, one row per topic.
pub struct ProgressRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProgressRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, topic: &str) -> Result<Option<UserProgress>, AppError> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            SELECT id, topic, total_questions, correct_answers, average_score,
                   time_spent, last_studied, streak_days
            FROM user_progress
            WHERE topic = ?
            "#,
        )
        .bind(topic)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(UserProgress::from))
    }

    pub async fn all(&self) -> Result<Vec<UserProgress>, AppError> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            r#"
            SELECT id, topic, total_questions, correct_answers, average_score,
                   time_spent, last_studied, streak_days
            FROM user_progress
            ORDER BY topic
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(UserProgress::from).collect())
    }

    /// Folds one completed quiz into the topic's rollup.
    ///
    /// Reads the current row first, then writes the summed counters back, so
    /// nothing is lost within a single call. `average_score` is always
    /// recomputed from the counters.
    pub async fn record_completion(
        &self,
        topic: &str,
        correct: u32,
        total: u32,
        time_spent: u64,
        now: DateTime<Utc>,
    ) -> Result<UserProgress, AppError> {
        if correct > total {
            return Err(AppError::ValidationFailed(format!(
                "{} correct answers out of {} questions",
                correct, total
            )));
        }

        let existing = self.get(topic).await?;

        match existing {
            Some(current) => {
                let total_questions = current.total_questions + i64::from(total);
                let correct_answers = current.correct_answers + i64::from(correct);
                let time_spent = current.time_spent + time_spent as i64;
                let average = average_score(correct_answers, total_questions);
                let streak_days =
                    next_streak(Some((current.last_studied, current.streak_days)), now);

                sqlx::query(
                    r#"
                    UPDATE user_progress SET
                        total_questions = ?, correct_answers = ?, average_score = ?,
                        time_spent = ?, last_studied = ?, streak_days = ?
                    WHERE id = ?
                    "#,
                )
                .bind(total_questions)
                .bind(correct_answers)
                .bind(average)
                .bind(time_spent)
                .bind(now)
                .bind(streak_days)
                .bind(current.id)
                .execute(self.pool)
                .await?;

                Ok(UserProgress {
                    id: current.id,
                    topic: current.topic,
                    total_questions,
                    correct_answers,
                    average_score: average,
                    time_spent,
                    last_studied: now,
                    streak_days,
                })
            }
            None => {
                let total_questions = i64::from(total);
                let correct_answers = i64::from(correct);
                let average = average_score(correct_answers, total_questions);
                let streak_days = next_streak(None, now);

                let id = sqlx::query(
                    r#"
                    INSERT INTO user_progress (
                        topic, total_questions, correct_answers, average_score,
                        time_spent, last_studied, streak_days
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(topic)
                .bind(total_questions)
                .bind(correct_answers)
                .bind(average)
                .bind(time_spent as i64)
                .bind(now)
                .bind(streak_days)
                .execute(self.pool)
                .await?
                .last_insert_rowid();

                Ok(UserProgress {
                    id,
                    topic: topic.to_string(),
                    total_questions,
                    correct_answers,
                    average_score: average,
                    time_spent: time_spent as i64,
                    last_studied: now,
                    streak_days,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn first_study_starts_streak_at_one() {
        assert_eq!(next_streak(None, at(10, 9)), 1);
    }

    #[test]
    fn same_day_keeps_and_next_day_extends() {
        assert_eq!(next_streak(Some((at(10, 9), 3)), at(10, 23)), 3);
        assert_eq!(next_streak(Some((at(10, 23), 3)), at(11, 0)), 4);
    }

    #[test]
    fn gap_resets_streak() {
        assert_eq!(next_streak(Some((at(10, 9), 5)), at(13, 9)), 1);
        assert_eq!(next_streak(Some((at(13, 9), 5)), at(10, 9)), 1);
    }

    #[test]
    fn average_handles_empty_totals() {
        assert_eq!(average_score(0, 0), 0.0);
        assert_eq!(average_score(3, 5), 60.0);
    }
}
