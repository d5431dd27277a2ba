//! Challenges and their participants.

use crate::model::address::Address;
use crate::model::challenge::{Challenge, ChallengeId, NewChallenge};
use crate::repo::{
    address_to_db, amount_to_db, row_address, row_amount, row_bool, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CHALLENGE_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    details_uri,
    reward,
    start_at,
    end_at,
    max_participants,
    participant_count,
    is_active,
    created_by
FROM challenges";

pub trait ChallengeRepository {
    fn insert_challenge(
        &self,
        challenge: &NewChallenge,
        start_at: i64,
        created_by: &Address,
    ) -> RepoResult<ChallengeId>;
    fn get_challenge(&self, id: ChallengeId) -> RepoResult<Option<Challenge>>;
    fn list_challenges(&self, active_only: bool) -> RepoResult<Vec<Challenge>>;
    /// Adds a participant and bumps `participant_count`.
    fn add_participant(&self, id: ChallengeId, user: &Address, now: i64) -> RepoResult<()>;
    fn is_participant(&self, id: ChallengeId, user: &Address) -> RepoResult<bool>;
    fn has_completed(&self, id: ChallengeId, user: &Address) -> RepoResult<bool>;
    /// Returns `false` when the user is not an open participant.
    fn mark_completed(&self, id: ChallengeId, user: &Address, now: i64) -> RepoResult<bool>;
    /// Returns `false` when the challenge is missing or already inactive.
    fn deactivate(&self, id: ChallengeId) -> RepoResult<bool>;
}

pub struct SqliteChallengeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteChallengeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ChallengeRepository for SqliteChallengeRepository<'_> {
    fn insert_challenge(
        &self,
        challenge: &NewChallenge,
        start_at: i64,
        created_by: &Address,
    ) -> RepoResult<ChallengeId> {
        let end_at = start_at.checked_add(challenge.duration_secs).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "challenge end overflows: start {start_at} + {}",
                challenge.duration_secs
            ))
        })?;
        self.conn.execute(
            "INSERT INTO challenges (
                title,
                description,
                details_uri,
                reward,
                start_at,
                end_at,
                max_participants,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                challenge.title.as_str(),
                challenge.description.as_str(),
                challenge.details_uri.as_str(),
                amount_to_db(challenge.reward),
                start_at,
                end_at,
                i64::from(challenge.max_participants),
                address_to_db(created_by),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_challenge(&self, id: ChallengeId) -> RepoResult<Option<Challenge>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHALLENGE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_challenge_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_challenges(&self, active_only: bool) -> RepoResult<Vec<Challenge>> {
        let sql = if active_only {
            format!("{CHALLENGE_SELECT_SQL} WHERE is_active = 1 ORDER BY id ASC;")
        } else {
            format!("{CHALLENGE_SELECT_SQL} ORDER BY id ASC;")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut challenges = Vec::new();
        while let Some(row) = rows.next()? {
            challenges.push(parse_challenge_row(row)?);
        }
        Ok(challenges)
    }

    fn add_participant(&self, id: ChallengeId, user: &Address, now: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO challenge_participants (challenge_id, user, joined_at)
             VALUES (?1, ?2, ?3);",
            params![id, address_to_db(user), now],
        )?;
        let changed = self.conn.execute(
            "UPDATE challenges SET participant_count = participant_count + 1 WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("challenge", id));
        }
        Ok(())
    }

    fn is_participant(&self, id: ChallengeId, user: &Address) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM challenge_participants WHERE challenge_id = ?1 AND user = ?2;",
                params![id, address_to_db(user)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn has_completed(&self, id: ChallengeId, user: &Address) -> RepoResult<bool> {
        let completed_at: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT completed_at FROM challenge_participants
                 WHERE challenge_id = ?1 AND user = ?2;",
                params![id, address_to_db(user)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(matches!(completed_at, Some(Some(_))))
    }

    fn mark_completed(&self, id: ChallengeId, user: &Address, now: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE challenge_participants SET completed_at = ?1
             WHERE challenge_id = ?2 AND user = ?3 AND completed_at IS NULL;",
            params![now, id, address_to_db(user)],
        )?;
        Ok(changed > 0)
    }

    fn deactivate(&self, id: ChallengeId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE challenges SET is_active = 0 WHERE id = ?1 AND is_active = 1;",
            [id],
        )?;
        Ok(changed > 0)
    }
}

fn parse_challenge_row(row: &Row<'_>) -> RepoResult<Challenge> {
    let max_participants: i64 = row.get("max_participants")?;
    let participant_count: i64 = row.get("participant_count")?;
    Ok(Challenge {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        details_uri: row.get("details_uri")?,
        reward: row_amount(row, "reward")?,
        start_at: row.get("start_at")?,
        end_at: row.get("end_at")?,
        max_participants: u32::try_from(max_participants).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid max_participants `{max_participants}` in challenges"
            ))
        })?,
        participant_count: u32::try_from(participant_count).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid participant_count `{participant_count}` in challenges"
            ))
        })?,
        is_active: row_bool(row, "is_active")?,
        created_by: row_address(row, "created_by")?,
    })
}
