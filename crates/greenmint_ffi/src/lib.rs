//! Flutter-facing bindings for the GreenMint ledger.

pub mod api;
