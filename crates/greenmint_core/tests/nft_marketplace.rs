mod common;

use common::{account, deployed, reward};
use greenmint_core::model::listing::ListingStatus;
use greenmint_core::{tokens, LedgerError, RegistryKind, Role};

#[test]
fn token_uri_resolves_bare_hashes_only() {
    let (ledger, _clock) = deployed();
    let admin = ledger.deployer();
    let user = account(1);

    let bare = ledger.nfts().mint_nft(&admin, &user, "QmNFTHash123").unwrap();
    let full = ledger
        .nfts()
        .mint_nft(&admin, &user, "ipfs://QmAlreadyQualified")
        .unwrap();

    assert_eq!(
        ledger.nfts().token_uri(bare).unwrap(),
        "https://ipfs.io/ipfs/QmNFTHash123"
    );
    assert_eq!(
        ledger.nfts().token_uri(full).unwrap(),
        "ipfs://QmAlreadyQualified"
    );
    assert_eq!(ledger.nfts().balance_of(&user).unwrap(), 2);
    assert_eq!(ledger.nfts().get_user_nfts(&user).unwrap(), vec![bare, full]);
}

#[test]
fn minting_requires_administrator_role() {
    let (ledger, _clock) = deployed();
    let outsider = account(5);

    let err = ledger
        .nfts()
        .mint_nft(&outsider, &outsider, "QmNope")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with(&format!("AccessControl: account {outsider} is missing role ")));
    assert!(message.ends_with(&Role::Administrator.id()));
    assert_eq!(ledger.nfts().total_supply().unwrap(), 0);
}

#[test]
fn minting_self_delegates_voting_power() {
    let (ledger, _clock) = deployed();
    let holder = account(1);
    let delegate = account(2);

    let id = ledger
        .nfts()
        .mint_reward(&ledger.backend(), &holder, "QmBadge", "First ride", 3)
        .unwrap();
    let data = ledger.nfts().get_nft_data(id).unwrap();
    assert_eq!(data.description, "First ride");
    assert_eq!(data.achievement_type, 3);
    assert_eq!(ledger.nfts().delegates(&holder).unwrap(), Some(holder));
    assert_eq!(ledger.nfts().get_votes(&holder).unwrap(), 1);

    ledger.nfts().delegate(&holder, &delegate).unwrap();
    assert_eq!(ledger.nfts().get_votes(&holder).unwrap(), 0);
    assert_eq!(ledger.nfts().get_votes(&delegate).unwrap(), 1);
    assert_eq!(ledger.nfts().total_votes().unwrap(), 1);
}

#[test]
fn nft_sale_moves_tokens_and_credits() {
    let (ledger, _clock) = deployed();
    let (seller, buyer) = (account(1), account(2));
    for user in [&seller, &buyer] {
        ledger.profiles().onboard_user(user).unwrap();
        reward(&ledger, user, 100);
    }
    let token_id = ledger
        .nfts()
        .mint_nft(&ledger.deployer(), &seller, "QmArtwork")
        .unwrap();
    let marketplace = ledger
        .registries()
        .address_of(RegistryKind::Marketplace)
        .unwrap();

    let err = ledger
        .marketplace()
        .list_nft(&seller, token_id, tokens(50))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Marketplace not approved"));

    ledger.nfts().approve(&seller, &marketplace, token_id).unwrap();
    let listing_id = ledger
        .marketplace()
        .list_nft(&seller, token_id, tokens(50))
        .unwrap();

    let err = ledger
        .marketplace()
        .buy_nft(&seller, listing_id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Cannot buy own listing"));

    let sold = ledger.marketplace().buy_nft(&buyer, listing_id).unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.buyer, Some(buyer));

    assert_eq!(ledger.tokens().balance_of(&seller).unwrap(), tokens(160));
    assert_eq!(ledger.tokens().balance_of(&buyer).unwrap(), tokens(60));
    assert_eq!(ledger.nfts().owner_of(token_id).unwrap(), buyer);
    assert_eq!(ledger.nfts().get_approved(token_id).unwrap(), None);
    assert_eq!(
        ledger.profiles().get_profile(&seller).unwrap().marketplace_items_sold,
        1
    );
    assert_eq!(
        ledger.profiles().get_profile(&buyer).unwrap().marketplace_items_bought,
        1
    );
    assert!(ledger.marketplace().list_active_listings().unwrap().is_empty());
}

#[test]
fn buying_without_funds_fails_cleanly() {
    let (ledger, _clock) = deployed();
    let (seller, buyer) = (account(1), account(2));
    let token_id = ledger
        .nfts()
        .mint_nft(&ledger.deployer(), &seller, "QmArtwork")
        .unwrap();
    let marketplace = ledger
        .registries()
        .address_of(RegistryKind::Marketplace)
        .unwrap();
    ledger.nfts().approve(&seller, &marketplace, token_id).unwrap();
    let listing_id = ledger
        .marketplace()
        .list_nft(&seller, token_id, tokens(50))
        .unwrap();

    let err = ledger.marketplace().buy_nft(&buyer, listing_id).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { available: 0, .. }));
    assert_eq!(ledger.nfts().owner_of(token_id).unwrap(), seller);
    assert!(ledger.marketplace().get_listing(listing_id).unwrap().is_active());
}

#[test]
fn transferred_token_invalidates_listing() {
    let (ledger, _clock) = deployed();
    let (seller, buyer, friend) = (account(1), account(2), account(3));
    reward(&ledger, &buyer, 100);
    let token_id = ledger
        .nfts()
        .mint_nft(&ledger.deployer(), &seller, "QmArtwork")
        .unwrap();
    let marketplace = ledger
        .registries()
        .address_of(RegistryKind::Marketplace)
        .unwrap();
    ledger.nfts().approve(&seller, &marketplace, token_id).unwrap();
    let listing_id = ledger
        .marketplace()
        .list_nft(&seller, token_id, tokens(50))
        .unwrap();

    ledger
        .nfts()
        .transfer_from(&seller, &seller, &friend, token_id)
        .unwrap();

    let err = ledger.marketplace().buy_nft(&buyer, listing_id).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Listing is no longer valid"));
    assert_eq!(ledger.tokens().balance_of(&buyer).unwrap(), tokens(100));

    let err = ledger
        .marketplace()
        .cancel_listing(&buyer, listing_id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    ledger.marketplace().cancel_listing(&seller, listing_id).unwrap();
    assert_eq!(
        ledger.marketplace().get_listing(listing_id).unwrap().status,
        ListingStatus::Cancelled
    );
}

#[test]
fn approved_spender_transfers_once() {
    let (ledger, _clock) = deployed();
    let (owner, spender, friend) = (account(1), account(2), account(3));
    let nfts = ledger.nfts();
    let token_id = nfts
        .mint_nft(&ledger.deployer(), &owner, "QmGift")
        .unwrap();

    let err = nfts.approve(&spender, &spender, token_id).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    nfts.approve(&owner, &spender, token_id).unwrap();
    assert_eq!(nfts.get_approved(token_id).unwrap(), Some(spender));

    let err = nfts
        .transfer_from(&spender, &friend, &spender, token_id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "ERC721: transfer from incorrect owner"));

    nfts.transfer_from(&spender, &owner, &friend, token_id).unwrap();
    assert_eq!(nfts.owner_of(token_id).unwrap(), friend);
    assert_eq!(nfts.get_approved(token_id).unwrap(), None);
    assert_eq!(nfts.get_votes(&owner).unwrap(), 0);
    assert_eq!(nfts.get_votes(&friend).unwrap(), 1);

    let err = nfts
        .transfer_from(&spender, &friend, &spender, token_id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(_)));
    assert_eq!(nfts.owner_of(token_id).unwrap(), friend);
}

#[test]
fn burning_removes_token_and_its_vote() {
    let (ledger, _clock) = deployed();
    let (holder, spender, outsider) = (account(1), account(2), account(3));
    let nfts = ledger.nfts();
    let first = nfts.mint_nft(&ledger.deployer(), &holder, "QmOne").unwrap();
    let second = nfts.mint_nft(&ledger.deployer(), &holder, "QmTwo").unwrap();
    assert_eq!(nfts.get_votes(&holder).unwrap(), 2);

    let err = nfts.burn(&outsider, first).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized(ref message) if message == "ERC721: caller is not token owner or approved"));
    assert_eq!(nfts.total_supply().unwrap(), 2);

    nfts.burn(&holder, first).unwrap();
    assert!(matches!(nfts.owner_of(first).unwrap_err(), LedgerError::NotFound { .. }));
    assert_eq!(nfts.balance_of(&holder).unwrap(), 1);
    assert_eq!(nfts.get_votes(&holder).unwrap(), 1);
    assert_eq!(nfts.total_votes().unwrap(), 1);

    nfts.approve(&holder, &spender, second).unwrap();
    nfts.burn(&spender, second).unwrap();
    assert_eq!(nfts.get_user_nfts(&holder).unwrap(), Vec::<i64>::new());
    assert_eq!(nfts.get_votes(&holder).unwrap(), 0);
    assert_eq!(nfts.total_votes().unwrap(), 0);

    let third = nfts.mint_nft(&ledger.deployer(), &holder, "QmThree").unwrap();
    assert_eq!(third, second + 1);
}

#[test]
fn burned_token_invalidates_listing() {
    let (ledger, _clock) = deployed();
    let (seller, buyer) = (account(1), account(2));
    reward(&ledger, &buyer, 100);
    let token_id = ledger
        .nfts()
        .mint_nft(&ledger.deployer(), &seller, "QmArtwork")
        .unwrap();
    let marketplace = ledger
        .registries()
        .address_of(RegistryKind::Marketplace)
        .unwrap();
    ledger.nfts().approve(&seller, &marketplace, token_id).unwrap();
    let listing_id = ledger
        .marketplace()
        .list_nft(&seller, token_id, tokens(50))
        .unwrap();

    ledger.nfts().burn(&seller, token_id).unwrap();

    let err = ledger.marketplace().buy_nft(&buyer, listing_id).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Listing is no longer valid"));
    assert_eq!(ledger.tokens().balance_of(&buyer).unwrap(), tokens(100));
    assert!(ledger.marketplace().get_listing(listing_id).unwrap().is_active());
}

#[test]
fn backend_settles_item_listings_off_ledger() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let (seller, buyer) = (account(1), account(2));

    let err = ledger
        .marketplace()
        .list_items(
            &backend,
            &[seller],
            &["QmItem".to_string(), "QmOther".to_string()],
            &[tokens(5)],
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Arrays length mismatch"));

    let ids = ledger
        .marketplace()
        .list_items(&backend, &[seller], &["QmItem".to_string()], &[tokens(5)])
        .unwrap();
    let err = ledger.marketplace().buy_nft(&buyer, ids[0]).unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Listing is settled by backend"));

    ledger
        .marketplace()
        .buy_items(&backend, &ids, &[buyer])
        .unwrap();
    let listing = ledger.marketplace().get_listing(ids[0]).unwrap();
    assert_eq!(listing.status, ListingStatus::Sold);
    assert_eq!(ledger.tokens().balance_of(&buyer).unwrap(), 0);
    assert_eq!(
        ledger.profiles().get_profile(&buyer).unwrap().marketplace_items_bought,
        1
    );
}

#[test]
fn reward_pool_distributes_deposited_tokens() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);
    let pool = ledger
        .registries()
        .address_of(RegistryKind::RewardPool)
        .unwrap();

    let token_id = ledger.nfts().mint_nft(&backend, &backend, "QmPrize").unwrap();
    assert_eq!(token_id, 1);

    let err = ledger
        .reward_pool()
        .deposit_nfts(&backend, 1, &[token_id])
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Pool not approved"));

    ledger.nfts().approve(&backend, &pool, token_id).unwrap();
    ledger
        .reward_pool()
        .deposit_nfts(&backend, 1, &[token_id])
        .unwrap();
    assert_eq!(ledger.reward_pool().pool_tokens(1).unwrap(), vec![1]);
    assert_eq!(ledger.nfts().owner_of(token_id).unwrap(), pool);

    assert_eq!(
        ledger
            .reward_pool()
            .distribute_reward(&backend, 1, &user)
            .unwrap(),
        1
    );
    assert_eq!(ledger.nfts().owner_of(1).unwrap(), user);
    assert!(ledger.reward_pool().pool_tokens(1).unwrap().is_empty());

    let err = ledger
        .reward_pool()
        .distribute_reward(&backend, 1, &user)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rule(ref message) if message == "Pool is empty"));
}

#[test]
fn full_user_journey() {
    let (ledger, _clock) = deployed();
    let backend = ledger.backend();
    let user = account(1);

    ledger.profiles().onboard_user(&user).unwrap();
    reward(&ledger, &user, 100);

    let challenge_id = ledger
        .challenges()
        .create_challenge(
            &backend,
            &greenmint_core::model::challenge::NewChallenge {
                title: "Car-free month".to_string(),
                description: "Leave the car at home".to_string(),
                details_uri: String::new(),
                reward: tokens(200),
                duration_secs: 30 * 24 * 60 * 60,
                max_participants: 100,
            },
        )
        .unwrap();
    ledger.challenges().join_challenge(&user, challenge_id).unwrap();
    ledger
        .challenges()
        .complete_challenge(&backend, challenge_id, &user)
        .unwrap();
    ledger
        .nfts()
        .mint_reward(&backend, &user, "QmChampion", "Car-free champion", 1)
        .unwrap();

    assert_eq!(ledger.tokens().balance_of(&user).unwrap(), tokens(310));
    assert_eq!(ledger.nfts().balance_of(&user).unwrap(), 1);
    assert_eq!(ledger.tokens().total_supply().unwrap(), tokens(310));
}
