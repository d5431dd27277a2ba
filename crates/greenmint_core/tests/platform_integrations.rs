mod common;

use common::{account, deployed, ledger_with, reward};
use greenmint_core::model::governance::{ProposalAction, ProposalState, COUNTING_MODE};
use greenmint_core::{
    parse_units, tokens, DomainEvent, EventFilter, LedgerConfig, LedgerError, PayeeConfig,
    RegistryKind, ValidationError,
};

#[test]
fn backend_maintains_profiles() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);
    let fuel = parse_units("0.15", 18).unwrap();

    let profile = ledger
        .profiles()
        .update_profile(&backend, &user, "Tesla Model 3", fuel)
        .unwrap();
    assert_eq!(profile.car_model, "Tesla Model 3");
    assert_eq!(profile.fuel_consumption, 150_000_000_000_000_000);

    assert_eq!(
        ledger.profiles().add_carbon_saved(&backend, &user, 100).unwrap(),
        100
    );
    ledger
        .profiles()
        .update_marketplace_activity(&backend, &user, true)
        .unwrap();
    ledger
        .profiles()
        .update_marketplace_activity(&backend, &user, false)
        .unwrap();

    let stored = ledger.profiles().get_profile(&user).unwrap();
    assert_eq!(stored.total_carbon_saved, 100);
    assert_eq!(stored.marketplace_items_sold, 1);
    assert_eq!(stored.marketplace_items_bought, 1);
    assert_eq!(stored.name, None);

    let err = ledger
        .profiles()
        .add_carbon_saved(&user, &user, 100)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "Only backend can update"));
}

#[test]
fn users_manage_their_own_identity() {
    let (ledger, _clock) = deployed();
    let user = account(1);

    let err = ledger
        .profiles()
        .update_own_profile(&user, "Ada", "ada@example.com")
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Profile does not exist"));

    let err = ledger
        .profiles()
        .create_profile(&user, "Ada", "not-an-email")
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::InvalidEmail)
    ));

    ledger
        .profiles()
        .create_profile(&user, "Ada", "ada@example.com")
        .unwrap();
    let err = ledger
        .profiles()
        .create_profile(&user, "Ada", "ada@example.com")
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Profile already exists"));

    let updated = ledger
        .profiles()
        .update_own_profile(&user, "Ada L.", "ada@lovelace.dev")
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("Ada L."));
    assert_eq!(updated.email.as_deref(), Some("ada@lovelace.dev"));
}

#[test]
fn backend_registers_and_authenticates_users() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);

    assert!(!ledger.profiles().authenticate_user(&backend, &user).unwrap());
    ledger.profiles().register_user(&backend, &user).unwrap();
    assert!(ledger.profiles().authenticate_user(&backend, &user).unwrap());

    let err = ledger.profiles().register_user(&backend, &user).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "User already registered"));

    // Registration alone pays nothing; onboarding pays the bonus once.
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), 0);
    ledger.profiles().onboard_user(&user).unwrap();
    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(10));
}

#[test]
fn token_mint_burn_and_transfer() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let (alice, bob) = (account(1), account(2));
    let cct = ledger.tokens();

    assert_eq!(cct.name(), "CarbonCredit");
    assert_eq!(cct.symbol(), "CCT");
    assert_eq!(cct.decimals(), 18);

    cct.mint(&backend, &alice, tokens(100)).unwrap();
    cct.burn(&backend, &alice, tokens(50)).unwrap();
    assert_eq!(cct.balance_of(&alice).unwrap(), tokens(50));

    cct.mint(&backend, &alice, tokens(50)).unwrap();
    cct.transfer(&alice, &bob, tokens(25)).unwrap();
    assert_eq!(cct.balance_of(&alice).unwrap(), tokens(75));
    assert_eq!(cct.balance_of(&bob).unwrap(), tokens(25));
    assert_eq!(cct.total_supply().unwrap(), tokens(100));
    assert_eq!(cct.holders().unwrap().len(), 2);

    let err = cct.transfer(&bob, &alice, tokens(26)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance { available, needed, .. }
            if available == tokens(25) && needed == tokens(26)
    ));
    let err = cct.burn(&alice, &bob, tokens(1)).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "Only backend can burn"));
}

#[test]
fn payments_split_by_shares() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let (customer, treasury, ops) = (account(1), account(10), account(11));
    let payment = ledger
        .registries()
        .address_of(RegistryKind::Payment)
        .unwrap();

    ledger.payments().add_payee(&backend, &treasury, 3).unwrap();
    ledger.payments().add_payee(&backend, &ops, 1).unwrap();
    let err = ledger.payments().add_payee(&backend, &ops, 1).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Account already has shares"));

    ledger.profiles().onboard_user(&customer).unwrap();
    ledger
        .payments()
        .process_payment(&customer, tokens(10), "Order #42")
        .unwrap();
    assert_eq!(ledger.tokens().balance_of(&customer).unwrap(), 0);
    assert_eq!(ledger.tokens().balance_of(&payment).unwrap(), tokens(10));
    assert_eq!(ledger.payments().list_payments().unwrap().len(), 1);

    assert_eq!(ledger.payments().total_shares().unwrap(), 4);
    assert_eq!(
        ledger.payments().pending(&treasury).unwrap(),
        tokens(75) / 10
    );
    let released = ledger.payments().release(&customer, &treasury).unwrap();
    assert_eq!(released, tokens(75) / 10);
    assert_eq!(ledger.tokens().balance_of(&treasury).unwrap(), tokens(75) / 10);
    assert_eq!(ledger.payments().pending(&treasury).unwrap(), 0);
    assert_eq!(ledger.payments().pending(&ops).unwrap(), tokens(25) / 10);
    assert_eq!(ledger.payments().total_released().unwrap(), tokens(75) / 10);

    let err = ledger.payments().release(&ops, &treasury).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Account is not due payment"));
    let err = ledger.payments().release(&ops, &customer).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Account has no shares"));
}

#[test]
fn large_share_counts_split_exactly() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let (customer, treasury, ops) = (account(1), account(10), account(11));
    let whole_share = 1_000_000_000_000_000_000;

    ledger
        .payments()
        .add_payee(&backend, &treasury, whole_share)
        .unwrap();
    ledger
        .payments()
        .add_payee(&backend, &ops, 3 * whole_share)
        .unwrap();
    reward(&ledger, &customer, 1_000);
    ledger
        .payments()
        .process_payment(&customer, tokens(1_000), "Fleet offset")
        .unwrap();

    assert_eq!(ledger.payments().pending(&treasury).unwrap(), tokens(250));
    assert_eq!(ledger.payments().pending(&ops).unwrap(), tokens(750));
    assert_eq!(
        ledger.payments().release(&backend, &ops).unwrap(),
        tokens(750)
    );
    assert_eq!(ledger.payments().pending(&treasury).unwrap(), tokens(250));
    assert_eq!(ledger.tokens().balance_of(&ops).unwrap(), tokens(750));

    let released = ledger
        .registries()
        .list_events(&EventFilter {
            registry: Some(RegistryKind::Payment),
            name: Some("PaymentReleased".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(released.len(), 1);
    assert!(matches!(
        released[0].decode().unwrap(),
        DomainEvent::PaymentReleased { account, released_by, amount }
            if account == ops && released_by == backend && amount == tokens(750)
    ));
}

#[test]
fn configured_payees_are_registered_at_deploy() {
    let treasury = account(10);
    let config = LedgerConfig {
        payees: vec![PayeeConfig {
            account: treasury,
            shares: 1,
        }],
        ..LedgerConfig::default()
    };
    let (ledger, _clock) = ledger_with(config);
    ledger.registries().deploy().unwrap();

    let payees = ledger.payments().list_payees().unwrap();
    assert_eq!(payees.len(), 1);
    assert_eq!(payees[0].account, treasury);
}

#[test]
fn oracle_rounds_and_carbon_requests() {
    let (ledger, _clock) = deployed();
    let (backend, deployer) = (ledger.backend(), ledger.deployer());
    let user = account(1);

    assert_eq!(ledger.oracle().update_answer(&deployer, 250_000_000).unwrap(), 2);
    let latest = ledger.oracle().get_latest_price().unwrap();
    assert_eq!((latest.round_id, latest.answer), (2, 250_000_000));

    let err = ledger.oracle().update_answer(&user, 1).unwrap_err();
    assert!(matches!(err, LedgerError::MissingRole { .. }));

    let request_id = ledger
        .oracle()
        .request_carbon_data(&backend, &user)
        .unwrap();
    assert_eq!(ledger.oracle().carbon_data(&user).unwrap(), None);
    assert_eq!(
        ledger.oracle().get_request(request_id).unwrap().fee,
        tokens(1) / 10
    );

    ledger
        .oracle()
        .fulfill_carbon_data(&backend, request_id, 42)
        .unwrap();
    assert_eq!(ledger.oracle().carbon_data(&user).unwrap(), Some(42));

    let err = ledger
        .oracle()
        .fulfill_carbon_data(&backend, request_id, 43)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(ref message) if message == "Request already fulfilled"));
}

#[test]
fn ipfs_hashes_and_solana_syncs_are_recorded() {
    let (ledger, _clock) = deployed();
    let (backend, deployer) = (ledger.backend(), ledger.deployer());
    let user = account(1);

    ledger.storage().store_hash(&backend, &user, "QmFirst").unwrap();
    ledger.storage().store_hash(&backend, &user, "QmSecond").unwrap();
    assert_eq!(
        ledger.storage().get_user_hashes(&user).unwrap(),
        vec!["QmFirst".to_string(), "QmSecond".to_string()]
    );
    let err = ledger.storage().store_hash(&user, &user, "QmMine").unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "Only backend can store"));

    assert_eq!(
        ledger.storage().sync_to_solana(&deployer, &user, "0x1234").unwrap(),
        "0x1234"
    );
    let syncs = ledger.storage().list_syncs(&user).unwrap();
    assert_eq!(syncs.len(), 1);
    assert_eq!(syncs[0].data, "0x1234");

    let events = ledger
        .registries()
        .list_events(&greenmint_core::EventFilter {
            registry: Some(RegistryKind::SolanaAdapter),
            name: Some("DataSyncedToSolana".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(events.len(), 1);

    let err = ledger
        .storage()
        .sync_to_solana(&deployer, &user, "0xzz")
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = ledger
        .storage()
        .sync_to_solana(&user, &user, "0x1234")
        .unwrap_err();
    assert!(err.is_access_denied());
}

#[test]
fn governance_counts_nft_votes() {
    let (ledger, clock) = deployed();
    let backend = ledger.backend();
    let (voter, proposer) = (account(1), account(2));
    ledger
        .nfts()
        .mint_nft(&backend, &voter, "QmVoterBadge")
        .unwrap();

    let governance = ledger.governance();
    assert_eq!(governance.counting_mode(), COUNTING_MODE);
    assert_eq!(governance.counting_mode(), "support=bravo&quorum=for");
    assert_eq!(governance.quorum().unwrap(), 1);

    let actions = [ProposalAction {
        target: ledger
            .registries()
            .address_of(RegistryKind::RewardPool)
            .unwrap(),
        value: 0,
        calldata: String::new(),
    }];
    let id = governance
        .propose(&proposer, &actions, "Fund community tree planting")
        .unwrap();
    assert_eq!(governance.proposal_votes(id).unwrap(), (0, 0, 0));
    assert_eq!(governance.state(id).unwrap(), ProposalState::Active);

    let err = governance.cast_vote(&voter, id, 3).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Invalid vote type"));
    assert_eq!(governance.cast_vote(&voter, id, 1).unwrap(), 1);
    assert!(governance.has_voted(id, &voter).unwrap());
    assert_eq!(governance.cast_vote(&proposer, id, 0).unwrap(), 0);
    assert_eq!(governance.proposal_votes(id).unwrap(), (0, 1, 0));

    let err = governance.cast_vote(&voter, id, 1).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Already voted"));
    let err = governance.execute(&voter, id).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Proposal not successful"));

    clock.advance(governance.voting_period());
    assert_eq!(governance.state(id).unwrap(), ProposalState::Succeeded);
    governance.execute(&voter, id).unwrap();
    assert_eq!(governance.state(id).unwrap(), ProposalState::Executed);
    let executed = ledger
        .registries()
        .list_events(&EventFilter {
            registry: Some(RegistryKind::Governance),
            name: Some("ProposalExecuted".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert!(matches!(
        executed[0].decode().unwrap(),
        DomainEvent::ProposalExecuted { id: executed_id, executor }
            if executed_id == id && executor == voter
    ));
    assert_eq!(governance.get_proposal(id).unwrap().actions, actions.to_vec());
}

#[test]
fn moved_token_is_not_counted_twice_on_a_proposal() {
    let (ledger, clock) = deployed();
    let backend = ledger.backend();
    let (first, second, proposer) = (account(1), account(2), account(3));
    let token_id = ledger
        .nfts()
        .mint_nft(&backend, &first, "QmSingleVote")
        .unwrap();

    let governance = ledger.governance();
    let id = governance
        .propose(&proposer, &[], "Plant a roadside hedge")
        .unwrap();
    assert_eq!(governance.cast_vote(&first, id, 1).unwrap(), 1);

    ledger
        .nfts()
        .transfer_from(&first, &first, &second, token_id)
        .unwrap();
    assert_eq!(ledger.nfts().get_votes(&second).unwrap(), 1);
    assert_eq!(governance.cast_vote(&second, id, 1).unwrap(), 0);
    assert_eq!(governance.proposal_votes(id).unwrap(), (0, 1, 0));
    assert_eq!(ledger.nfts().total_votes().unwrap(), 1);

    // The token still counts on a proposal opened after the move.
    let next = governance
        .propose(&proposer, &[], "Extend the hedge")
        .unwrap();
    assert_eq!(governance.cast_vote(&second, next, 0).unwrap(), 1);
    assert_eq!(governance.cast_vote(&first, next, 1).unwrap(), 0);

    clock.advance(governance.voting_period());
    assert_eq!(governance.state(id).unwrap(), ProposalState::Succeeded);
    assert_eq!(governance.state(next).unwrap(), ProposalState::Defeated);
}

#[test]
fn tokens_minted_after_vote_start_carry_no_weight() {
    let (ledger, clock) = deployed();
    let backend = ledger.backend();
    let (voter, proposer) = (account(1), account(2));
    ledger
        .nfts()
        .mint_nft(&backend, &voter, "QmEarlyBadge")
        .unwrap();

    let governance = ledger.governance();
    let id = governance
        .propose(&proposer, &[], "Add bike racks downtown")
        .unwrap();
    clock.advance(60);
    ledger
        .nfts()
        .mint_nft(&backend, &voter, "QmLateBadge")
        .unwrap();

    assert_eq!(ledger.nfts().get_votes(&voter).unwrap(), 2);
    assert_eq!(governance.cast_vote(&voter, id, 1).unwrap(), 1);
    assert_eq!(governance.proposal_votes(id).unwrap(), (0, 1, 0));
}

#[test]
fn proposer_can_cancel_active_proposal() {
    let (ledger, _clock) = deployed();
    let proposer = account(2);
    let governance = ledger.governance();

    let id = governance
        .propose(&proposer, &[], "Adopt a new logo")
        .unwrap();
    let err = governance.cancel(&account(3), id).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "Only proposer can cancel"));

    governance.cancel(&proposer, id).unwrap();
    assert_eq!(governance.state(id).unwrap(), ProposalState::Canceled);
    assert_eq!(governance.list_proposals().unwrap().len(), 1);
}

#[test]
fn rewards_accumulate_across_verifications() {
    let (ledger, _clock) = deployed();
    let user = account(4);

    reward(&ledger, &user, 20);
    reward(&ledger, &user, 30);

    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(50));
    assert_eq!(ledger.verification().verification_count().unwrap(), 2);
}
