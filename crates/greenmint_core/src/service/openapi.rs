//! Static operation catalog and OpenAPI 3.0 rendering.
//!
//! The catalog mirrors the public registry surface: one entry per
//! operation with ledger-typed parameters, plus the events and errors each
//! registry can produce. Paths are `/<Registry>/<operation>`.

use crate::model::registry::RegistryKind;
use serde_json::{json, Map, Value};

pub const OPENAPI_VERSION: &str = "3.0.0";
pub const API_TITLE: &str = "Smart Contracts API";
pub const API_VERSION: &str = "1.0.0";
const API_DESCRIPTION: &str = "GreenMint registry operations, events and errors.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    View,
    NonPayable,
}

impl Mutability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::NonPayable => "nonpayable",
        }
    }
}

/// Named, typed slot of an operation, event or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub ty: &'static str,
}

// Struct literal keeps nested `&[..]` slices promotable in consts.
macro_rules! p {
    ($name:expr, $ty:expr) => {
        Param {
            name: $name,
            ty: $ty,
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub inputs: &'static [Param],
    pub outputs: &'static [Param],
    pub mutability: Mutability,
}

const fn view(
    name: &'static str,
    inputs: &'static [Param],
    outputs: &'static [Param],
) -> Operation {
    Operation {
        name,
        inputs,
        outputs,
        mutability: Mutability::View,
    }
}

const fn call(
    name: &'static str,
    inputs: &'static [Param],
    outputs: &'static [Param],
) -> Operation {
    Operation {
        name,
        inputs,
        outputs,
        mutability: Mutability::NonPayable,
    }
}

/// Event or error signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub name: &'static str,
    pub inputs: &'static [Param],
}

const fn sig(name: &'static str, inputs: &'static [Param]) -> Signature {
    Signature { name, inputs }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryCatalog {
    pub kind: RegistryKind,
    pub operations: &'static [Operation],
    pub events: &'static [Signature],
    pub errors: &'static [Signature],
}

const UINT: Param = p!("", "uint256");
const BOOL: Param = p!("", "bool");
const ADDR: Param = p!("", "address");
const STR: Param = p!("", "string");

const ACCESS_CONTROL_OPS: [Operation; 3] = [
    view("hasRole", &[p!("role", "bytes32"), p!("account", "address")], &[BOOL]),
    call("grantRole", &[p!("role", "bytes32"), p!("account", "address")], &[]),
    call("revokeRole", &[p!("role", "bytes32"), p!("account", "address")], &[]),
];

const ROLE_EVENTS: [Signature; 2] = [
    sig(
        "RoleGranted",
        &[p!("role", "bytes32"), p!("account", "address"), p!("sender", "address")],
    ),
    sig(
        "RoleRevoked",
        &[p!("role", "bytes32"), p!("account", "address"), p!("sender", "address")],
    ),
];

const ACCESS_ERRORS: [Signature; 2] = [
    sig(
        "AccessControlUnauthorizedAccount",
        &[p!("account", "address"), p!("neededRole", "bytes32")],
    ),
    sig("Unauthorized", &[p!("message", "string")]),
];

const ORACLE: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::Oracle,
    operations: &[
        view("decimals", &[], &[p!("", "uint8")]),
        view(
            "latestRoundData",
            &[],
            &[
                p!("roundId", "uint80"),
                p!("answer", "int256"),
                p!("startedAt", "uint256"),
                p!("updatedAt", "uint256"),
                p!("answeredInRound", "uint80"),
            ],
        ),
        call("updateAnswer", &[p!("answer", "int256")], &[]),
        call("requestCarbonData", &[p!("user", "address")], &[p!("requestId", "uint256")]),
        call(
            "fulfillCarbonData",
            &[p!("requestId", "uint256"), p!("value", "uint256")],
            &[],
        ),
        view("carbonData", &[p!("user", "address")], &[UINT]),
    ],
    events: &[
        sig("AnswerUpdated", &[p!("roundId", "uint256"), p!("answer", "int256")]),
        sig(
            "CarbonDataRequested",
            &[p!("requestId", "uint256"), p!("user", "address"), p!("fee", "uint256")],
        ),
        sig(
            "CarbonDataFulfilled",
            &[p!("requestId", "uint256"), p!("user", "address"), p!("value", "uint256")],
        ),
    ],
    errors: &[sig("RequestAlreadyFulfilled", &[p!("requestId", "uint256")])],
};

const IPFS_STORAGE: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::IpfsStorage,
    operations: &[
        call("storeHash", &[p!("user", "address"), p!("hash", "string")], &[]),
        view("getUserHashes", &[p!("user", "address")], &[p!("", "string[]")]),
    ],
    events: &[sig("HashStored", &[p!("user", "address"), p!("hash", "string")])],
    errors: &[],
};

const CARBON_CREDIT_TOKEN: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::CarbonCreditToken,
    operations: &[
        view("name", &[], &[STR]),
        view("symbol", &[], &[STR]),
        view("decimals", &[], &[p!("", "uint8")]),
        view("totalSupply", &[], &[UINT]),
        view("balanceOf", &[p!("account", "address")], &[UINT]),
        call("mint", &[p!("to", "address"), p!("amount", "uint256")], &[]),
        call("burn", &[p!("from", "address"), p!("amount", "uint256")], &[]),
        call("transfer", &[p!("to", "address"), p!("amount", "uint256")], &[BOOL]),
    ],
    events: &[sig(
        "Transfer",
        &[p!("from", "address"), p!("to", "address"), p!("value", "uint256")],
    )],
    errors: &[sig(
        "ERC20InsufficientBalance",
        &[p!("sender", "address"), p!("balance", "uint256"), p!("needed", "uint256")],
    )],
};

const USER_PROFILE: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::UserProfile,
    operations: &[
        call("createProfile", &[p!("name", "string"), p!("email", "string")], &[]),
        call("updateOwnProfile", &[p!("name", "string"), p!("email", "string")], &[]),
        call(
            "updateProfile",
            &[p!("user", "address"), p!("carModel", "string"), p!("fuelConsumption", "uint256")],
            &[],
        ),
        call("addCarbonSaved", &[p!("user", "address"), p!("amount", "uint256")], &[]),
        call(
            "updateMarketplaceActivity",
            &[p!("user", "address"), p!("sold", "bool")],
            &[],
        ),
        view(
            "getProfile",
            &[p!("user", "address")],
            &[
                p!("name", "string"),
                p!("email", "string"),
                p!("carModel", "string"),
                p!("fuelConsumption", "uint256"),
                p!("carbonSaved", "uint256"),
                p!("nftsSold", "uint256"),
                p!("nftsBought", "uint256"),
            ],
        ),
    ],
    events: &[
        sig("ProfileCreated", &[p!("user", "address")]),
        sig("ProfileUpdated", &[p!("user", "address")]),
        sig("CarbonSavedAdded", &[p!("user", "address"), p!("total", "uint256")]),
        sig(
            "MarketplaceActivityUpdated",
            &[p!("user", "address"), p!("sold", "bool")],
        ),
    ],
    errors: &[],
};

const USER_ONBOARDING: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::UserOnboarding,
    operations: &[
        call("registerUser", &[p!("user", "address")], &[]),
        call("authenticateUser", &[p!("user", "address")], &[BOOL]),
        view("isRegistered", &[p!("user", "address")], &[BOOL]),
        call("onboardUser", &[], &[UINT]),
    ],
    events: &[
        sig("UserRegistered", &[p!("user", "address")]),
        sig("UserOnboarded", &[p!("user", "address"), p!("bonus", "uint256")]),
    ],
    errors: &[],
};

const NFT_REWARD: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::NftReward,
    operations: &[
        view("name", &[], &[STR]),
        view("symbol", &[], &[STR]),
        call(
            "mintNFT",
            &[p!("to", "address"), p!("ipfsHash", "string"), p!("description", "string")],
            &[p!("tokenId", "uint256")],
        ),
        call(
            "mintReward",
            &[p!("to", "address"), p!("ipfsHash", "string")],
            &[p!("tokenId", "uint256")],
        ),
        view("tokenURI", &[p!("tokenId", "uint256")], &[STR]),
        view("ownerOf", &[p!("tokenId", "uint256")], &[ADDR]),
        view("balanceOf", &[p!("owner", "address")], &[UINT]),
        view("totalSupply", &[], &[UINT]),
        view("getUserNFTs", &[p!("user", "address")], &[p!("", "uint256[]")]),
        view("getApproved", &[p!("tokenId", "uint256")], &[ADDR]),
        call("approve", &[p!("to", "address"), p!("tokenId", "uint256")], &[]),
        call(
            "transferFrom",
            &[p!("from", "address"), p!("to", "address"), p!("tokenId", "uint256")],
            &[],
        ),
        call("burn", &[p!("tokenId", "uint256")], &[]),
        call("delegate", &[p!("delegatee", "address")], &[]),
        view("delegates", &[p!("account", "address")], &[ADDR]),
        view("getVotes", &[p!("account", "address")], &[UINT]),
    ],
    events: &[
        sig(
            "NftTransfer",
            &[p!("from", "address"), p!("to", "address"), p!("tokenId", "uint256")],
        ),
        sig("NftMinted", &[p!("to", "address"), p!("tokenId", "uint256")]),
        sig(
            "NftApproval",
            &[p!("owner", "address"), p!("approved", "address"), p!("tokenId", "uint256")],
        ),
        sig(
            "DelegateChanged",
            &[p!("delegator", "address"), p!("fromDelegate", "address"), p!("toDelegate", "address")],
        ),
    ],
    errors: &[
        sig("ERC721NonexistentToken", &[p!("tokenId", "uint256")]),
        sig(
            "ERC721IncorrectOwner",
            &[p!("sender", "address"), p!("tokenId", "uint256"), p!("owner", "address")],
        ),
    ],
};

const VERIFICATION: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::Verification,
    operations: &[
        call(
            "submitVerification",
            &[p!("user", "address"), p!("ipfsHash", "string"), p!("carbonReduction", "uint256")],
            &[p!("id", "uint256")],
        ),
        call(
            "approveVerifications",
            &[p!("ids", "uint256[]")],
            &[],
        ),
        call(
            "rejectVerifications",
            &[p!("ids", "uint256[]"), p!("reasons", "string[]")],
            &[],
        ),
        call(
            "verifySubmission",
            &[p!("id", "uint256"), p!("reward", "uint256")],
            &[],
        ),
        call(
            "rejectSubmission",
            &[p!("id", "uint256"), p!("reason", "string")],
            &[],
        ),
        view("verificationCount", &[], &[UINT]),
        view(
            "getUserVerifications",
            &[p!("user", "address")],
            &[p!("", "uint256[]")],
        ),
        view(
            "getVerification",
            &[p!("id", "uint256")],
            &[
                p!("user", "address"),
                p!("ipfsHash", "string"),
                p!("carbonReduction", "uint256"),
                p!("status", "string"),
            ],
        ),
    ],
    events: &[
        sig(
            "VerificationSubmitted",
            &[p!("id", "uint256"), p!("user", "address")],
        ),
        sig(
            "VerificationApproved",
            &[p!("id", "uint256"), p!("user", "address"), p!("reward", "uint256")],
        ),
        sig(
            "VerificationRejected",
            &[p!("id", "uint256"), p!("user", "address")],
        ),
    ],
    errors: &[sig("VerificationAlreadyProcessed", &[p!("id", "uint256")])],
};

const CARBON_TRACKING: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::CarbonTracking,
    operations: &[
        call(
            "recordActivity",
            &[
                p!("user", "address"),
                p!("activityType", "string"),
                p!("carbonAmount", "uint256"),
            ],
            &[p!("id", "uint256")],
        ),
        call(
            "trackCarbonReduction",
            &[p!("user", "address"), p!("amount", "uint256")],
            &[],
        ),
        view(
            "getUserActivities",
            &[p!("user", "address")],
            &[p!("", "uint256[]")],
        ),
        view("getUserCarbonCredits", &[p!("user", "address")], &[UINT]),
        view("getTotalCarbonReduction", &[], &[UINT]),
    ],
    events: &[
        sig(
            "ActivityRecorded",
            &[p!("id", "uint256"), p!("user", "address"), p!("carbonAmount", "uint256")],
        ),
        sig(
            "CarbonReductionTracked",
            &[p!("user", "address"), p!("amount", "uint256")],
        ),
    ],
    errors: &[],
};

const LEADERBOARD: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::Leaderboard,
    operations: &[
        call(
            "updateUserScore",
            &[p!("user", "address"), p!("score", "uint256")],
            &[],
        ),
        view("getUserScore", &[p!("user", "address")], &[UINT]),
        view(
            "getTopUsers",
            &[p!("limit", "uint256")],
            &[p!("users", "address[]"), p!("scores", "uint256[]")],
        ),
        view("getUserPosition", &[p!("user", "address")], &[UINT]),
    ],
    events: &[sig(
        "ScoreUpdated",
        &[p!("user", "address"), p!("score", "uint256")],
    )],
    errors: &[],
};

const REWARD_POOL: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::RewardPool,
    operations: &[
        call(
            "depositNFTs",
            &[p!("poolId", "uint256"), p!("tokenIds", "uint256[]")],
            &[],
        ),
        call(
            "distributeReward",
            &[p!("poolId", "uint256"), p!("user", "address")],
            &[p!("tokenId", "uint256")],
        ),
        view("poolTokens", &[p!("poolId", "uint256")], &[p!("", "uint256[]")]),
    ],
    events: &[
        sig(
            "NftDeposited",
            &[p!("poolId", "uint256"), p!("tokenId", "uint256")],
        ),
        sig(
            "RewardDistributed",
            &[p!("poolId", "uint256"), p!("tokenId", "uint256"), p!("user", "address")],
        ),
    ],
    errors: &[sig("PoolEmpty", &[p!("poolId", "uint256")])],
};

const CHALLENGE_MANAGEMENT: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::ChallengeManagement,
    operations: &[
        call(
            "createChallenge",
            &[
                p!("name", "string"),
                p!("description", "string"),
                p!("reward", "uint256"),
                p!("endTime", "uint256"),
                p!("maxParticipants", "uint256"),
            ],
            &[p!("id", "uint256")],
        ),
        call("joinChallenge", &[p!("challengeId", "uint256")], &[]),
        call(
            "completeChallenge",
            &[p!("challengeId", "uint256"), p!("user", "address")],
            &[],
        ),
        call("deactivateChallenge", &[p!("challengeId", "uint256")], &[]),
        view(
            "hasCompletedChallenge",
            &[p!("challengeId", "uint256"), p!("user", "address")],
            &[BOOL],
        ),
        view(
            "isParticipant",
            &[p!("challengeId", "uint256"), p!("user", "address")],
            &[BOOL],
        ),
    ],
    events: &[
        sig("ChallengeCreated", &[p!("id", "uint256"), p!("reward", "uint256")]),
        sig("ChallengeJoined", &[p!("id", "uint256"), p!("user", "address")]),
        sig(
            "ChallengeCompleted",
            &[p!("id", "uint256"), p!("user", "address"), p!("reward", "uint256")],
        ),
        sig("ChallengeDeactivated", &[p!("id", "uint256")]),
    ],
    errors: &[],
};

const MARKETPLACE: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::Marketplace,
    operations: &[
        call(
            "listNFT",
            &[p!("tokenId", "uint256"), p!("price", "uint256")],
            &[p!("listingId", "uint256")],
        ),
        call("buyNFT", &[p!("listingId", "uint256")], &[]),
        call("cancelListing", &[p!("listingId", "uint256")], &[]),
        call(
            "listItems",
            &[
                p!("sellers", "address[]"),
                p!("ipfsHashes", "string[]"),
                p!("prices", "uint256[]"),
            ],
            &[],
        ),
        call(
            "buyItems",
            &[p!("listingIds", "uint256[]"), p!("buyers", "address[]")],
            &[],
        ),
        view(
            "getListing",
            &[p!("listingId", "uint256")],
            &[
                p!("seller", "address"),
                p!("tokenId", "uint256"),
                p!("price", "uint256"),
                p!("status", "string"),
            ],
        ),
    ],
    events: &[
        sig(
            "ListingCreated",
            &[p!("listingId", "uint256"), p!("seller", "address"), p!("price", "uint256")],
        ),
        sig(
            "ListingSold",
            &[p!("listingId", "uint256"), p!("buyer", "address"), p!("price", "uint256")],
        ),
        sig("ListingCancelled", &[p!("listingId", "uint256")]),
    ],
    errors: &[sig("ListingNotActive", &[p!("listingId", "uint256")])],
};

const GOVERNANCE: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::Governance,
    operations: &[
        view("COUNTING_MODE", &[], &[STR]),
        view("votingPeriod", &[], &[UINT]),
        view("quorum", &[], &[UINT]),
        call(
            "propose",
            &[
                p!("targets", "address[]"),
                p!("values", "uint256[]"),
                p!("calldatas", "bytes[]"),
                p!("description", "string"),
            ],
            &[p!("proposalId", "uint256")],
        ),
        call(
            "castVote",
            &[p!("proposalId", "uint256"), p!("support", "uint8")],
            &[p!("weight", "uint256")],
        ),
        view(
            "proposalVotes",
            &[p!("proposalId", "uint256")],
            &[
                p!("againstVotes", "uint256"),
                p!("forVotes", "uint256"),
                p!("abstainVotes", "uint256"),
            ],
        ),
        view(
            "hasVoted",
            &[p!("proposalId", "uint256"), p!("account", "address")],
            &[BOOL],
        ),
        view("state", &[p!("proposalId", "uint256")], &[p!("", "uint8")]),
        call("execute", &[p!("proposalId", "uint256")], &[]),
        call("cancel", &[p!("proposalId", "uint256")], &[]),
    ],
    events: &[
        sig(
            "ProposalCreated",
            &[p!("proposalId", "uint256"), p!("proposer", "address"), p!("voteEnd", "uint256")],
        ),
        sig(
            "VoteCast",
            &[
                p!("voter", "address"),
                p!("proposalId", "uint256"),
                p!("support", "uint8"),
                p!("weight", "uint256"),
            ],
        ),
        sig("ProposalCanceled", &[p!("proposalId", "uint256")]),
        sig("ProposalExecuted", &[p!("proposalId", "uint256")]),
    ],
    errors: &[sig(
        "GovernorUnexpectedProposalState",
        &[p!("proposalId", "uint256"), p!("current", "uint8")],
    )],
};

const PAYMENT: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::Payment,
    operations: &[
        call(
            "addPayee",
            &[p!("account", "address"), p!("shares", "uint256")],
            &[],
        ),
        call(
            "processPayment",
            &[p!("amount", "uint256"), p!("memo", "string")],
            &[p!("paymentId", "uint256")],
        ),
        view("releasable", &[p!("account", "address")], &[UINT]),
        call("release", &[p!("account", "address")], &[]),
        view("totalShares", &[], &[UINT]),
        view("totalReleased", &[], &[UINT]),
    ],
    events: &[
        sig("PayeeAdded", &[p!("account", "address"), p!("shares", "uint256")]),
        sig(
            "PaymentReceived",
            &[p!("paymentId", "uint256"), p!("from", "address"), p!("amount", "uint256")],
        ),
        sig(
            "PaymentReleased",
            &[p!("to", "address"), p!("amount", "uint256")],
        ),
    ],
    errors: &[],
};

const SOLANA_ADAPTER: RegistryCatalog = RegistryCatalog {
    kind: RegistryKind::SolanaAdapter,
    operations: &[call(
        "syncToSolana",
        &[p!("user", "address"), p!("data", "bytes")],
        &[],
    )],
    events: &[sig(
        "DataSyncedToSolana",
        &[p!("user", "address"), p!("data", "bytes")],
    )],
    errors: &[],
};

/// Every registry's catalog, in deployment order.
pub const CATALOG: [RegistryCatalog; 15] = [
    ORACLE,
    IPFS_STORAGE,
    CARBON_CREDIT_TOKEN,
    USER_PROFILE,
    USER_ONBOARDING,
    NFT_REWARD,
    VERIFICATION,
    CARBON_TRACKING,
    LEADERBOARD,
    REWARD_POOL,
    CHALLENGE_MANAGEMENT,
    MARKETPLACE,
    GOVERNANCE,
    PAYMENT,
    SOLANA_ADAPTER,
];

/// Registries guarded by role grants; they also expose role administration.
fn has_access_control(kind: RegistryKind) -> bool {
    matches!(
        kind,
        RegistryKind::Oracle
            | RegistryKind::CarbonCreditToken
            | RegistryKind::NftReward
            | RegistryKind::Verification
            | RegistryKind::RewardPool
            | RegistryKind::ChallengeManagement
    )
}

pub fn catalog_for(kind: RegistryKind) -> Option<&'static RegistryCatalog> {
    CATALOG.iter().find(|entry| entry.kind == kind)
}

/// Maps a ledger type to its OpenAPI schema type.
pub fn schema_type(ty: &str) -> &'static str {
    if ty.ends_with("[]") {
        "array"
    } else if ty.starts_with("uint") || ty.starts_with("int") {
        "integer"
    } else if ty == "bool" {
        "boolean"
    } else {
        // address, string, bytes and anything unrecognized
        "string"
    }
}

fn parameters(inputs: &[Param]) -> Value {
    Value::Array(
        inputs
            .iter()
            .map(|param| {
                json!({
                    "name": param.name,
                    "in": "query",
                    "required": true,
                    "schema": { "type": schema_type(param.ty) },
                    "description": param.ty,
                })
            })
            .collect(),
    )
}

fn response_schema(outputs: &[Param]) -> Value {
    match outputs {
        [] => json!({ "type": "string" }),
        [single] => json!({ "type": schema_type(single.ty) }),
        many => {
            let mut properties = Map::new();
            for (idx, output) in many.iter().enumerate() {
                let key = if output.name.is_empty() {
                    format!("output{idx}")
                } else {
                    output.name.to_string()
                };
                properties.insert(key, json!({ "type": schema_type(output.ty) }));
            }
            json!({ "type": "object", "properties": properties })
        }
    }
}

fn path_item(registry: &str, operation: &Operation) -> Value {
    json!({
        "post": {
            "summary": format!("Call {} on {}", operation.name, registry),
            "description": format!("State mutability: {}", operation.mutability.as_str()),
            "parameters": parameters(operation.inputs),
            "responses": {
                "200": {
                    "description": "Successful response",
                    "content": {
                        "application/json": {
                            "schema": response_schema(operation.outputs),
                        }
                    }
                }
            }
        }
    })
}

/// Renders the full OpenAPI 3.0.0 document for every registry.
pub fn generate_openapi() -> Value {
    let mut paths = Map::new();
    let mut x_events = Map::new();
    let mut x_errors = Map::new();
    let mut tags = Vec::with_capacity(CATALOG.len());

    for entry in &CATALOG {
        let registry = entry.kind.as_str();
        let access_ops: &[Operation] = if has_access_control(entry.kind) {
            &ACCESS_CONTROL_OPS
        } else {
            &[]
        };
        for operation in entry.operations.iter().chain(access_ops) {
            paths.insert(
                format!("/{}/{}", registry, operation.name),
                path_item(registry, operation),
            );
        }

        let role_events: &[Signature] = if has_access_control(entry.kind) {
            &ROLE_EVENTS
        } else {
            &[]
        };
        let events: Map<String, Value> = entry
            .events
            .iter()
            .chain(role_events)
            .map(|event| {
                (
                    event.name.to_string(),
                    json!({
                        "summary": format!("Event: {}", event.name),
                        "description": format!("Emitted when {} occurs.", event.name),
                        "parameters": parameters(event.inputs),
                    }),
                )
            })
            .collect();
        x_events.insert(registry.to_string(), Value::Object(events));

        let errors: Map<String, Value> = entry
            .errors
            .iter()
            .chain(ACCESS_ERRORS.iter())
            .map(|error| {
                (
                    error.name.to_string(),
                    json!({
                        "summary": format!("Error: {}", error.name),
                        "description": format!("Error {}", error.name),
                        "parameters": parameters(error.inputs),
                    }),
                )
            })
            .collect();
        x_errors.insert(registry.to_string(), Value::Object(errors));

        tags.push(json!({ "name": registry }));
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": API_TITLE,
            "version": API_VERSION,
            "description": API_DESCRIPTION,
        },
        "paths": paths,
        "components": {},
        "x_events": x_events,
        "x_errors": x_errors,
        "tags": tags,
    })
}

#[cfg(test)]
mod tests {
    use super::{catalog_for, generate_openapi, schema_type, Param, CATALOG};
    use crate::model::registry::RegistryKind;

    #[test]
    fn catalog_covers_every_registry_in_deploy_order() {
        let kinds: Vec<RegistryKind> = CATALOG.iter().map(|entry| entry.kind).collect();
        assert_eq!(kinds, RegistryKind::DEPLOY_ORDER.to_vec());
        assert!(catalog_for(RegistryKind::Marketplace).is_some());
    }

    #[test]
    fn maps_ledger_types_to_schema_types() {
        assert_eq!(schema_type("uint256"), "integer");
        assert_eq!(schema_type("int256"), "integer");
        assert_eq!(schema_type("address"), "string");
        assert_eq!(schema_type("bytes"), "string");
        assert_eq!(schema_type("bool"), "boolean");
        assert_eq!(schema_type("uint256[]"), "array");
        assert_eq!(schema_type("bytes32"), "string");
    }

    #[test]
    fn document_has_paths_tags_events_and_errors() {
        let doc = generate_openapi();
        assert_eq!(doc["openapi"], "3.0.0");
        assert_eq!(doc["info"]["title"], "Smart Contracts API");
        assert_eq!(doc["tags"].as_array().map(Vec::len), Some(15));

        let mint = &doc["paths"]["/NFTReward/mintNFT"]["post"];
        assert_eq!(mint["summary"], "Call mintNFT on NFTReward");
        assert_eq!(mint["description"], "State mutability: nonpayable");
        assert_eq!(mint["parameters"][0]["in"], "query");
        assert_eq!(mint["parameters"][0]["schema"]["type"], "string");
        assert_eq!(
            mint["responses"]["200"]["content"]["application/json"]["schema"]["type"],
            "integer"
        );

        let votes = &doc["paths"]["/Governance/proposalVotes"]["post"]["responses"]["200"]
            ["content"]["application/json"]["schema"];
        assert_eq!(votes["type"], "object");
        assert_eq!(votes["properties"]["forVotes"]["type"], "integer");

        let no_output = &doc["paths"]["/CarbonCreditToken/mint"]["post"]["responses"]["200"]
            ["content"]["application/json"]["schema"];
        assert_eq!(no_output["type"], "string");

        assert!(doc["paths"]["/Verification/grantRole"].is_object());
        assert!(doc["paths"]["/Leaderboard/grantRole"].is_null());
        assert_eq!(
            doc["x_events"]["SolanaAdapter"]["DataSyncedToSolana"]["summary"],
            "Event: DataSyncedToSolana"
        );
        assert_eq!(
            doc["x_errors"]["CarbonCreditToken"]["ERC20InsufficientBalance"]["description"],
            "Error ERC20InsufficientBalance"
        );
    }

    #[test]
    fn unnamed_outputs_fall_back_to_positional_keys() {
        let schema = super::response_schema(&[
            Param { name: "", ty: "uint256" },
            Param { name: "", ty: "bool" },
        ]);
        assert_eq!(schema["properties"]["output0"]["type"], "integer");
        assert_eq!(schema["properties"]["output1"]["type"], "boolean");
    }
}
