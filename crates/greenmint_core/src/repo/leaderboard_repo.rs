//! Leaderboard score persistence.
//!
//! Ranking is score descending, ties broken by first-scored order (rowid).
//! Upserts keep the original rowid, so a score change never resets tie order.
//! Scores are stored as 20-digit zero-padded text; text order equals numeric
//! order across the whole `u64` range.

use crate::model::activity::ScoreEntry;
use crate::model::address::Address;
use crate::repo::{address_to_db, row_address, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

pub trait LeaderboardRepository {
    fn upsert_score(&self, board: i64, user: &Address, score: u64, now: i64) -> RepoResult<()>;
    fn get_score(&self, board: i64, user: &Address) -> RepoResult<Option<u64>>;
    fn top_scores(&self, board: i64, limit: u32) -> RepoResult<Vec<ScoreEntry>>;
    /// 1-based rank, `None` when the user has no score on the board.
    fn position(&self, board: i64, user: &Address) -> RepoResult<Option<u64>>;
}

pub struct SqliteLeaderboardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLeaderboardRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LeaderboardRepository for SqliteLeaderboardRepository<'_> {
    fn upsert_score(&self, board: i64, user: &Address, score: u64, now: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO leaderboard_scores (board, user, score, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(board, user) DO UPDATE SET
                score = excluded.score,
                updated_at = excluded.updated_at;",
            params![
                board,
                address_to_db(user),
                score_to_db(score),
                now
            ],
        )?;
        Ok(())
    }

    fn get_score(&self, board: i64, user: &Address) -> RepoResult<Option<u64>> {
        let score: Option<String> = self
            .conn
            .query_row(
                "SELECT score FROM leaderboard_scores WHERE board = ?1 AND user = ?2;",
                params![board, address_to_db(user)],
                |row| row.get(0),
            )
            .optional()?;
        score.as_deref().map(score_from_db).transpose()
    }

    fn top_scores(&self, board: i64, limit: u32) -> RepoResult<Vec<ScoreEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT user, score FROM leaderboard_scores
             WHERE board = ?1
             ORDER BY score DESC, rowid ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![board, i64::from(limit)])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(ScoreEntry {
                user: row_address(row, "user")?,
                score: score_from_db(&row.get::<_, String>("score")?)?,
            });
        }
        Ok(entries)
    }

    fn position(&self, board: i64, user: &Address) -> RepoResult<Option<u64>> {
        let position: Option<i64> = self
            .conn
            .query_row(
                "SELECT (
                    SELECT COUNT(*) FROM leaderboard_scores AS other
                    WHERE other.board = me.board
                      AND (other.score > me.score
                           OR (other.score = me.score AND other.rowid < me.rowid))
                 ) + 1
                 FROM leaderboard_scores AS me
                 WHERE me.board = ?1 AND me.user = ?2;",
                params![board, address_to_db(user)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(position.map(|value| value.max(1) as u64))
    }
}

fn score_to_db(score: u64) -> String {
    format!("{score:020}")
}

fn score_from_db(value: &str) -> RepoResult<u64> {
    value.parse::<u64>().map_err(|_| {
        RepoError::InvalidData(format!("invalid score `{value}` in leaderboard_scores"))
    })
}

#[cfg(test)]
mod tests {
    use super::{score_from_db, score_to_db};
    use crate::repo::RepoError;

    #[test]
    fn scores_keep_numeric_order_as_text() {
        let scores = [0, 9, 10, 160, i64::MAX as u64, i64::MAX as u64 + 1, u64::MAX];
        let encoded: Vec<String> = scores.iter().map(|score| score_to_db(*score)).collect();
        assert!(encoded.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(score_to_db(u64::MAX), "18446744073709551615");
        assert_eq!(score_from_db(&score_to_db(u64::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn corrupt_score_is_invalid_data() {
        assert!(matches!(
            score_from_db("-0000000000000000001"),
            Err(RepoError::InvalidData(_))
        ));
    }
}
