//! Leaderboard scores on the global board and per-challenge boards.

use crate::model::activity::{ScoreEntry, GLOBAL_BOARD};
use crate::model::address::Address;
use crate::model::event::DomainEvent;
use crate::model::registry::RegistryKind;
use crate::repo::leaderboard_repo::LeaderboardRepository;
use crate::service::access::require_backend_or_admin;
use crate::service::ledger::Ledger;
use crate::service::LedgerResult;

pub struct LeaderboardService<'l> {
    ledger: &'l Ledger,
}

impl<'l> LeaderboardService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Sets the global score of `user`.
    pub fn update_user_score(
        &self,
        caller: &Address,
        user: &Address,
        score: u64,
    ) -> LedgerResult<()> {
        self.update_score(caller, GLOBAL_BOARD, user, score)
    }

    /// Sets the score of `user` on `board`. Backend or deployer admin.
    pub fn update_score(
        &self,
        caller: &Address,
        board: i64,
        user: &Address,
        score: u64,
    ) -> LedgerResult<()> {
        self.ledger.write("leaderboard_update", |ctx| {
            require_backend_or_admin(
                ctx,
                RegistryKind::Leaderboard,
                caller,
                "Only backend can update score",
            )?;
            ctx.scores().upsert_score(board, user, score, ctx.now())?;
            ctx.emit(DomainEvent::ScoreUpdated {
                board,
                user: *user,
                score,
            })
        })
    }

    pub fn get_user_score(&self, user: &Address) -> LedgerResult<u64> {
        self.get_board_score(GLOBAL_BOARD, user)
    }

    /// Unknown users score 0.
    pub fn get_board_score(&self, board: i64, user: &Address) -> LedgerResult<u64> {
        self.ledger
            .read(|ctx| Ok(ctx.scores().get_score(board, user)?.unwrap_or(0)))
    }

    pub fn get_top_users(&self, limit: u32) -> LedgerResult<Vec<ScoreEntry>> {
        self.get_board_top(GLOBAL_BOARD, limit)
    }

    pub fn get_board_top(&self, board: i64, limit: u32) -> LedgerResult<Vec<ScoreEntry>> {
        self.ledger
            .read(|ctx| Ok(ctx.scores().top_scores(board, limit)?))
    }

    /// 1-based global rank; 0 when the user has no score.
    pub fn get_user_position(&self, user: &Address) -> LedgerResult<u64> {
        self.ledger.read(|ctx| {
            Ok(ctx
                .scores()
                .position(GLOBAL_BOARD, user)?
                .unwrap_or(0))
        })
    }
}
