//! Governance proposals and votes.

use crate::model::address::Address;
use crate::model::governance::{Proposal, ProposalAction, ProposalId, VoteType};
use crate::model::nft::TokenId;
use crate::repo::{address_to_db, row_address, row_bool, row_u64, u64_to_db, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROPOSAL_SELECT_SQL: &str = "SELECT
    id,
    proposer,
    description,
    actions,
    vote_start,
    vote_end,
    quorum,
    against_votes,
    for_votes,
    abstain_votes,
    canceled,
    executed,
    created_at
FROM proposals";

/// Input for a new proposal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProposal<'a> {
    pub proposer: Address,
    pub description: &'a str,
    pub actions: &'a [ProposalAction],
    pub vote_start: i64,
    pub vote_end: i64,
    pub quorum: u64,
}

pub trait GovernanceRepository {
    fn insert_proposal(&self, proposal: &NewProposal<'_>, now: i64) -> RepoResult<ProposalId>;
    fn get_proposal(&self, id: ProposalId) -> RepoResult<Option<Proposal>>;
    fn list_proposals(&self) -> RepoResult<Vec<Proposal>>;
    fn get_vote(&self, id: ProposalId, voter: &Address) -> RepoResult<Option<(VoteType, u64)>>;
    /// Stores the ballot and adds `weight` to the matching tally.
    fn record_vote(
        &self,
        id: ProposalId,
        voter: &Address,
        support: VoteType,
        weight: u64,
        now: i64,
    ) -> RepoResult<()>;
    /// Marks `tokens` as counted on proposal `id` for `voter`.
    ///
    /// Returns how many were not counted before; those carry the weight.
    fn claim_vote_tokens(
        &self,
        id: ProposalId,
        voter: &Address,
        tokens: &[TokenId],
    ) -> RepoResult<u64>;
    fn mark_canceled(&self, id: ProposalId) -> RepoResult<bool>;
    fn mark_executed(&self, id: ProposalId) -> RepoResult<bool>;
}

pub struct SqliteGovernanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGovernanceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GovernanceRepository for SqliteGovernanceRepository<'_> {
    fn insert_proposal(&self, proposal: &NewProposal<'_>, now: i64) -> RepoResult<ProposalId> {
        let actions = serde_json::to_string(proposal.actions)
            .map_err(|err| RepoError::InvalidData(format!("actions encode failed: {err}")))?;
        self.conn.execute(
            "INSERT INTO proposals (
                proposer,
                description,
                actions,
                vote_start,
                vote_end,
                quorum,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                address_to_db(&proposal.proposer),
                proposal.description,
                actions,
                proposal.vote_start,
                proposal.vote_end,
                u64_to_db(proposal.quorum, "proposals.quorum")?,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_proposal(&self, id: ProposalId) -> RepoResult<Option<Proposal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROPOSAL_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_proposal_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_proposals(&self) -> RepoResult<Vec<Proposal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROPOSAL_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut proposals = Vec::new();
        while let Some(row) = rows.next()? {
            proposals.push(parse_proposal_row(row)?);
        }
        Ok(proposals)
    }

    fn get_vote(&self, id: ProposalId, voter: &Address) -> RepoResult<Option<(VoteType, u64)>> {
        let vote = self
            .conn
            .query_row(
                "SELECT support, weight FROM proposal_votes
                 WHERE proposal_id = ?1 AND voter = ?2;",
                params![id, address_to_db(voter)],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        match vote {
            Some((support, weight)) => {
                let support = u8::try_from(support)
                    .ok()
                    .and_then(VoteType::from_u8)
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "invalid support `{support}` in proposal_votes"
                        ))
                    })?;
                Ok(Some((support, weight.max(0) as u64)))
            }
            None => Ok(None),
        }
    }

    fn record_vote(
        &self,
        id: ProposalId,
        voter: &Address,
        support: VoteType,
        weight: u64,
        now: i64,
    ) -> RepoResult<()> {
        let weight = u64_to_db(weight, "proposal_votes.weight")?;
        self.conn.execute(
            "INSERT INTO proposal_votes (proposal_id, voter, support, weight, cast_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id,
                address_to_db(voter),
                i64::from(support.as_u8()),
                weight,
                now
            ],
        )?;
        let column = match support {
            VoteType::Against => "against_votes",
            VoteType::For => "for_votes",
            VoteType::Abstain => "abstain_votes",
        };
        let changed = self.conn.execute(
            &format!("UPDATE proposals SET {column} = {column} + ?1 WHERE id = ?2;"),
            params![weight, id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("proposal", id));
        }
        Ok(())
    }

    fn claim_vote_tokens(
        &self,
        id: ProposalId,
        voter: &Address,
        tokens: &[TokenId],
    ) -> RepoResult<u64> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO proposal_vote_tokens (proposal_id, token_id, voter)
             VALUES (?1, ?2, ?3);",
        )?;
        let voter = address_to_db(voter);
        let mut claimed = 0u64;
        for token_id in tokens {
            claimed += stmt.execute(params![id, token_id, voter])? as u64;
        }
        Ok(claimed)
    }

    fn mark_canceled(&self, id: ProposalId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE proposals SET canceled = 1 WHERE id = ?1 AND canceled = 0 AND executed = 0;",
            [id],
        )?;
        Ok(changed > 0)
    }

    fn mark_executed(&self, id: ProposalId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE proposals SET executed = 1 WHERE id = ?1 AND canceled = 0 AND executed = 0;",
            [id],
        )?;
        Ok(changed > 0)
    }
}

fn parse_proposal_row(row: &Row<'_>) -> RepoResult<Proposal> {
    let actions_text: String = row.get("actions")?;
    let actions: Vec<ProposalAction> = serde_json::from_str(&actions_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid proposals.actions JSON: {err}"))
    })?;
    Ok(Proposal {
        id: row.get("id")?,
        proposer: row_address(row, "proposer")?,
        description: row.get("description")?,
        actions,
        vote_start: row.get("vote_start")?,
        vote_end: row.get("vote_end")?,
        quorum: row_u64(row, "quorum")?,
        against_votes: row_u64(row, "against_votes")?,
        for_votes: row_u64(row, "for_votes")?,
        abstain_votes: row_u64(row, "abstain_votes")?,
        canceled: row_bool(row, "canceled")?,
        executed: row_bool(row, "executed")?,
        created_at: row.get("created_at")?,
    })
}
