//! IPFS hash registry and Solana sync log.

use crate::model::address::Address;
use crate::model::event::DomainEvent;
use crate::model::registry::RegistryKind;
use crate::model::storage::{
    parse_hex_data, to_hex_data, IpfsRecord, SolanaSync, MAX_SYNC_PAYLOAD_BYTES,
};
use crate::model::verification::MAX_IPFS_HASH_CHARS;
use crate::model::{require_text, ValidationError};
use crate::repo::storage_repo::StorageRepository;
use crate::service::access::{require_backend, require_backend_or_admin};
use crate::service::ledger::Ledger;
use crate::service::LedgerResult;

pub struct StorageService<'l> {
    ledger: &'l Ledger,
}

impl<'l> StorageService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Stores an IPFS content hash for `user`. Backend only.
    pub fn store_hash(&self, caller: &Address, user: &Address, hash: &str) -> LedgerResult<i64> {
        self.ledger.write("ipfs_store", |ctx| {
            require_backend(ctx, RegistryKind::IpfsStorage, caller, "Only backend can store")?;
            require_text("hash", hash, MAX_IPFS_HASH_CHARS)?;
            let hash = hash.trim();
            let id = ctx.storage().insert_hash(user, hash, ctx.now())?;
            ctx.emit(DomainEvent::HashStored {
                user: *user,
                hash: hash.to_string(),
            })?;
            Ok(id)
        })
    }

    /// Hashes stored for `user`, oldest first.
    pub fn get_user_hashes(&self, user: &Address) -> LedgerResult<Vec<String>> {
        Ok(self
            .get_user_hash_records(user)?
            .into_iter()
            .map(|record| record.hash)
            .collect())
    }

    pub fn get_user_hash_records(&self, user: &Address) -> LedgerResult<Vec<IpfsRecord>> {
        self.ledger.read(|ctx| Ok(ctx.storage().user_hashes(user)?))
    }

    /// Records a hex payload bound for Solana. Backend or deployer admin.
    ///
    /// Returns the payload in canonical `0x` lowercase form.
    pub fn sync_to_solana(
        &self,
        caller: &Address,
        user: &Address,
        data: &str,
    ) -> LedgerResult<String> {
        self.ledger.write("solana_sync", |ctx| {
            require_backend_or_admin(
                ctx,
                RegistryKind::SolanaAdapter,
                caller,
                "Only backend can sync",
            )?;
            let bytes = parse_hex_data(data)
                .ok_or_else(|| ValidationError::InvalidHexData(data.trim().to_string()))?;
            if bytes.is_empty() {
                return Err(ValidationError::EmptyField("data").into());
            }
            if bytes.len() > MAX_SYNC_PAYLOAD_BYTES {
                return Err(ValidationError::TooLong {
                    field: "data",
                    max: MAX_SYNC_PAYLOAD_BYTES,
                }
                .into());
            }
            let data = to_hex_data(&bytes);
            ctx.storage().insert_sync(user, &data, caller, ctx.now())?;
            ctx.emit(DomainEvent::DataSyncedToSolana {
                user: *user,
                data: data.clone(),
            })?;
            Ok(data)
        })
    }

    pub fn list_syncs(&self, user: &Address) -> LedgerResult<Vec<SolanaSync>> {
        self.ledger.read(|ctx| Ok(ctx.storage().user_syncs(user)?))
    }
}
