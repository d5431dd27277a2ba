mod common;

use common::{account, deployed, reward};
use greenmint_core::model::activity::NewActivity;
use greenmint_core::model::challenge::NewChallenge;
use greenmint_core::model::verification::VerificationStatus;
use greenmint_core::{tokens, LedgerError};

fn challenge(reward: u64, max_participants: u32) -> NewChallenge {
    NewChallenge {
        title: "Bike to Work Week".to_string(),
        description: "Commute by bike for seven days".to_string(),
        details_uri: String::new(),
        reward: tokens(reward),
        duration_secs: 7 * 24 * 60 * 60,
        max_participants,
    }
}

fn activity(user: u8, carbon: u64, verified: bool) -> NewActivity {
    NewActivity {
        user: account(user),
        carbon_saved: tokens(carbon),
        activity_type: "biking".to_string(),
        verified,
        ipfs_hash: "QmActivityProof".to_string(),
    }
}

#[test]
fn onboarding_and_verification_rewards_add_up() {
    let (ledger, _clock) = deployed();
    let user = account(1);

    assert_eq!(ledger.profiles().onboard_user(&user).unwrap(), tokens(10));
    let id = reward(&ledger, &user, 50);

    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(60));
    let verification = ledger.verification().get_verification(id).unwrap();
    assert!(verification.is_verified());
    assert_eq!(verification.reward, tokens(50));
    assert_eq!(verification.verifier, Some(ledger.backend()));
    assert!(ledger.profiles().is_registered(&user).unwrap());
}

#[test]
fn onboarding_twice_is_rejected() {
    let (ledger, _clock) = deployed();
    let user = account(1);

    ledger.profiles().onboard_user(&user).unwrap();
    let err = ledger.profiles().onboard_user(&user).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "User already onboarded"));
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(10));
}

#[test]
fn rejected_verification_pays_nothing() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);

    ledger.profiles().onboard_user(&user).unwrap();
    let id = ledger
        .verification()
        .submit_verification(&backend, &user, 7, "QmBlurryPhoto")
        .unwrap();
    let rejected = ledger
        .verification()
        .reject_submission(&backend, id, "Insufficient evidence")
        .unwrap();

    assert!(rejected.is_rejected());
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Insufficient evidence")
    );
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(10));

    let err = ledger
        .verification()
        .verify_submission(&backend, id, tokens(50))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

#[test]
fn batch_decisions_are_all_or_nothing() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);
    let verification = ledger.verification();

    let first = verification
        .submit_verification(&backend, &user, 1, "QmFirst")
        .unwrap();
    let second = verification
        .submit_own_verification(&user, 2, "QmSecond")
        .unwrap();
    assert_eq!((first, second), (1, 2));
    assert_eq!(verification.verification_count().unwrap(), 2);
    assert_eq!(
        verification.get_user_verifications(&user).unwrap(),
        vec![first, second]
    );

    let err = verification
        .reject_verifications(&backend, &[first, second], &["Blurry".to_string()])
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Arrays length mismatch"));

    let err = verification
        .approve_verifications(&backend, &[first, 99])
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    assert_eq!(
        verification
            .list_verifications(Some(VerificationStatus::Pending))
            .unwrap()
            .len(),
        2
    );

    verification
        .approve_verifications(&backend, &[first, second])
        .unwrap();
    assert_eq!(
        verification
            .list_verifications(Some(VerificationStatus::Approved))
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn only_backend_or_verifier_may_decide() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);

    let id = ledger
        .verification()
        .submit_verification(&backend, &user, 1, "QmProof")
        .unwrap();
    let err = ledger
        .verification()
        .approve_verifications(&user, &[id])
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "Only backend can approve"));

    let deployer = ledger.deployer();
    ledger
        .verification()
        .verify_submission(&deployer, id, tokens(5))
        .unwrap();
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(5));
}

#[test]
fn leaderboard_ranks_by_score() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let (first, second) = (account(1), account(2));

    ledger
        .leaderboard()
        .update_user_score(&backend, &first, 110)
        .unwrap();
    ledger
        .leaderboard()
        .update_user_score(&backend, &second, 160)
        .unwrap();

    let top = ledger.leaderboard().get_top_users(10).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!((top[0].user, top[0].score), (second, 160));
    assert_eq!((top[1].user, top[1].score), (first, 110));
    assert_eq!(ledger.leaderboard().get_user_position(&second).unwrap(), 1);
    assert_eq!(ledger.leaderboard().get_user_position(&first).unwrap(), 2);
    assert_eq!(ledger.leaderboard().get_user_position(&account(3)).unwrap(), 0);
    assert_eq!(ledger.leaderboard().get_user_score(&first).unwrap(), 110);

    let err = ledger
        .leaderboard()
        .update_user_score(&first, &first, 999)
        .unwrap_err();
    assert!(err.is_access_denied());
}

#[test]
fn leaderboard_accepts_full_u64_scores() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let (top, middle, low) = (account(1), account(2), account(3));
    let board = ledger.leaderboard();

    board.update_user_score(&backend, &low, 9).unwrap();
    board
        .update_user_score(&backend, &middle, i64::MAX as u64 + 1)
        .unwrap();
    board.update_user_score(&backend, &top, u64::MAX).unwrap();

    assert_eq!(board.get_user_score(&top).unwrap(), u64::MAX);
    let ranked: Vec<_> = board
        .get_top_users(10)
        .unwrap()
        .into_iter()
        .map(|entry| (entry.user, entry.score))
        .collect();
    assert_eq!(
        ranked,
        vec![(top, u64::MAX), (middle, i64::MAX as u64 + 1), (low, 9)]
    );
    assert_eq!(board.get_user_position(&top).unwrap(), 1);
    assert_eq!(board.get_user_position(&low).unwrap(), 3);

    board.update_user_score(&backend, &top, 10).unwrap();
    assert_eq!(board.get_user_position(&top).unwrap(), 2);
    assert_eq!(board.get_user_position(&low).unwrap(), 3);
}

#[test]
fn tracking_totals_verified_activity_and_reductions() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let tracking = ledger.tracking();

    let ids = tracking
        .record_activities(&backend, &[activity(1, 5, true), activity(1, 3, false)])
        .unwrap();
    assert_eq!(ids.len(), 2);
    tracking
        .track_carbon_reduction(&backend, &account(2), tokens(2))
        .unwrap();

    assert_eq!(tracking.get_user_activities(&account(1)).unwrap().len(), 2);
    assert_eq!(tracking.get_user_carbon_credits(&account(1)).unwrap(), tokens(5));
    assert_eq!(tracking.get_total_carbon_reduction().unwrap(), tokens(7));

    let err = tracking
        .record_activity(&account(1), &activity(1, 1, true))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "Only backend can record"));
}

#[test]
fn completing_a_challenge_pays_its_reward() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);

    ledger.profiles().onboard_user(&user).unwrap();
    let id = ledger
        .challenges()
        .create_challenge(&backend, &challenge(500, 0))
        .unwrap();
    ledger.challenges().join_challenge(&user, id).unwrap();
    assert!(ledger.challenges().is_participant(id, &user).unwrap());

    ledger
        .challenges()
        .complete_challenge(&backend, id, &user)
        .unwrap();
    assert!(ledger.challenges().has_completed_challenge(id, &user).unwrap());
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(510));

    let err = ledger
        .challenges()
        .complete_challenge(&backend, id, &user)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Challenge already completed"));
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(510));
}

#[test]
fn challenge_joining_respects_capacity_and_deadline() {
    let (ledger, clock) = deployed();
    let backend = ledger.backend();
    let challenges = ledger.challenges();

    let id = challenges
        .create_challenge(&backend, &challenge(10, 1))
        .unwrap();
    challenges.join_challenge(&account(1), id).unwrap();

    let err = challenges.join_challenge(&account(1), id).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Already joined"));
    let err = challenges.join_challenge(&account(2), id).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Challenge is full"));

    let open = challenges
        .create_challenge(&backend, &challenge(10, 0))
        .unwrap();
    clock.advance(7 * 24 * 60 * 60);
    let err = challenges.join_challenge(&account(2), open).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Challenge has ended"));

    let err = challenges
        .complete_challenge(&backend, open, &account(2))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "User has not joined challenge"));
}

#[test]
fn deactivated_challenges_cannot_be_joined() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();

    let id = ledger
        .challenges()
        .create_challenge(&backend, &challenge(10, 0))
        .unwrap();
    ledger
        .challenges()
        .deactivate_challenge(&ledger.deployer(), id)
        .unwrap();

    assert!(!ledger.challenges().get_challenge(id).unwrap().is_active);
    assert!(ledger.challenges().list_challenges(true).unwrap().is_empty());
    let err = ledger
        .challenges()
        .join_challenge(&account(1), id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Challenge is not active"));
}
