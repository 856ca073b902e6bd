//! Poll repository: polls, their options and votes.

use crate::entities::{
    format_timestamp, new_public_id, now_rfc3339, NewPoll, Poll, PollOption, PollOptionResult, PollSummary,
};
use crate::types::{DatabaseError, DatabaseResult};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

#[derive(Clone)]
pub struct PollRepository {
    pool: SqlitePool,
}

impl PollRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a poll and its options atomically. The request is validated first.
    pub async fn create(&self, mut request: NewPoll) -> DatabaseResult<Poll> {
        request.validate().map_err(DatabaseError::Validation)?;

        let now = now_rfc3339();
        let public_id = new_public_id();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO polls (public_id, question, description, created_by, is_active, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, TRUE, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.question)
        .bind(&request.description)
        .bind(request.created_by)
        .bind(request.expires_at.map(format_timestamp))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let poll_id = result.last_insert_rowid();

        for (position, label) in request.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO poll_options (public_id, poll_id, label, position) VALUES (?, ?, ?, ?)",
            )
            .bind(new_public_id())
            .bind(poll_id)
            .bind(label)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(poll = %public_id, options = request.options.len(), "poll created");

        self.find_by_id(poll_id)
            .await?
            .ok_or(DatabaseError::NotFound("poll"))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Poll>> {
        let sql = format!("SELECT {} FROM polls WHERE id = ?", Poll::COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(Poll::from_row).transpose()?)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Poll>> {
        let sql = format!("SELECT {} FROM polls WHERE public_id = ?", Poll::COLUMNS);
        let row = sqlx::query(&sql)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Poll::from_row).transpose()?)
    }

    /// Newest first. Closed and expired polls are included only on request.
    pub async fn list(&self, include_closed: bool) -> DatabaseResult<Vec<Poll>> {
        let sql = format!("SELECT {} FROM polls ORDER BY created_at DESC, id DESC", Poll::COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let polls = rows
            .iter()
            .map(Poll::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        if include_closed {
            return Ok(polls);
        }

        let now = Utc::now();
        Ok(polls.into_iter().filter(|poll| poll.is_open_at(now)).collect())
    }

    pub async fn options(&self, poll_id: i64) -> DatabaseResult<Vec<PollOption>> {
        let rows = sqlx::query(
            "SELECT id, public_id, poll_id, label, position FROM poll_options WHERE poll_id = ? ORDER BY position",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(PollOption::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Vote tallies per option, in option order. Options without votes report zero.
    pub async fn results(&self, poll_id: i64) -> DatabaseResult<Vec<PollOptionResult>> {
        let rows = sqlx::query(
            "SELECT o.public_id, o.label, o.position, COUNT(v.id) AS votes
             FROM poll_options o
             LEFT JOIN votes v ON v.option_id = o.id
             WHERE o.poll_id = ?
             GROUP BY o.id
             ORDER BY o.position",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DatabaseResult<PollOptionResult> {
                Ok(PollOptionResult {
                    option_id: row.try_get("public_id")?,
                    label: row.try_get("label")?,
                    position: row.try_get("position")?,
                    votes: row.try_get("votes")?,
                })
            })
            .collect()
    }

    /// The option public id the user voted for, if any.
    pub async fn vote_of(&self, poll_id: i64, user_id: i64) -> DatabaseResult<Option<String>> {
        let option = sqlx::query_scalar(
            "SELECT o.public_id FROM votes v JOIN poll_options o ON o.id = v.option_id
             WHERE v.poll_id = ? AND v.user_id = ?",
        )
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(option)
    }

    pub async fn summary(&self, poll: Poll, user_id: i64) -> DatabaseResult<PollSummary> {
        let results = self.results(poll.id).await?;
        let my_vote = self.vote_of(poll.id, user_id).await?;
        let total_votes = results.iter().map(|result| result.votes).sum();

        Ok(PollSummary {
            poll,
            total_votes,
            my_vote,
            results,
        })
    }

    pub async fn list_summaries(
        &self,
        user_id: i64,
        include_closed: bool,
    ) -> DatabaseResult<Vec<PollSummary>> {
        let polls = self.list(include_closed).await?;
        let mut summaries = Vec::with_capacity(polls.len());
        for poll in polls {
            summaries.push(self.summary(poll, user_id).await?);
        }
        Ok(summaries)
    }

    /// Record a vote. The poll must be open, the option must belong to it,
    /// and the user must not have voted in it before.
    pub async fn cast_vote(
        &self,
        poll_public_id: &str,
        option_public_id: &str,
        user_id: i64,
    ) -> DatabaseResult<Poll> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM polls WHERE public_id = ?", Poll::COLUMNS);
        let poll = sqlx::query(&sql)
            .bind(poll_public_id)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(Poll::from_row)
            .transpose()?
            .ok_or(DatabaseError::NotFound("poll"))?;

        if !poll.is_open_at(Utc::now()) {
            return Err(DatabaseError::Conflict(
                "poll is no longer accepting votes".to_string(),
            ));
        }

        let option_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM poll_options WHERE public_id = ? AND poll_id = ?")
                .bind(option_public_id)
                .bind(poll.id)
                .fetch_optional(&mut *tx)
                .await?;

        let option_id = option_id.ok_or_else(|| {
            DatabaseError::Validation("option does not belong to this poll".to_string())
        })?;

        sqlx::query("INSERT INTO votes (poll_id, option_id, user_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(poll.id)
            .bind(option_id)
            .bind(user_id)
            .bind(now_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::from_unique(e, "you have already voted in this poll"))?;

        tx.commit().await?;
        Ok(poll)
    }

    pub async fn close(&self, poll_id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE polls SET is_active = FALSE, updated_at = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(poll_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("poll"));
        }
        Ok(())
    }

    pub async fn delete(&self, poll_id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM polls WHERE id = ?")
            .bind(poll_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("poll"));
        }
        Ok(())
    }
}
