//! User profiles and onboarding.
//!
//! # Responsibility
//! - Backend-maintained counters (car model, carbon saved, marketplace
//!   activity) and self-declared identity share one profile row.
//! - Onboarding registers an account once and pays the welcome bonus once.
//!
//! # Invariants
//! - Backend writes create the profile row on first touch.
//! - `create_profile` succeeds at most once per account.

use crate::model::address::Address;
use crate::model::amount::Amount;
use crate::model::event::DomainEvent;
use crate::model::profile::{
    Registration, UserProfile, MAX_CAR_MODEL_CHARS, MAX_EMAIL_CHARS, MAX_NAME_CHARS,
};
use crate::model::registry::RegistryKind;
use crate::model::{require_text, ValidationError};
use crate::repo::profile_repo::ProfileRepository;
use crate::service::access::require_backend;
use crate::service::ledger::{Ctx, Ledger};
use crate::service::token_service::mint_as_registry;
use crate::service::{LedgerError, LedgerResult};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

const ONLY_BACKEND_UPDATE: &str = "Only backend can update";

pub struct ProfileService<'l> {
    ledger: &'l Ledger,
}

impl<'l> ProfileService<'l> {
    pub(crate) fn new(ledger: &'l Ledger) -> Self {
        Self { ledger }
    }

    /// Sets vehicle data. Backend only.
    pub fn update_profile(
        &self,
        caller: &Address,
        user: &Address,
        car_model: &str,
        fuel_consumption: Amount,
    ) -> LedgerResult<UserProfile> {
        self.ledger.write("profile_update", |ctx| {
            require_backend(ctx, RegistryKind::UserProfile, caller, ONLY_BACKEND_UPDATE)?;
            require_text("car_model", car_model, MAX_CAR_MODEL_CHARS)?;
            let mut profile = load_or_empty(ctx, user)?;
            profile.car_model = car_model.trim().to_string();
            profile.fuel_consumption = fuel_consumption;
            profile.updated_at = ctx.now();
            ctx.profiles().save_profile(&profile)?;
            ctx.emit(DomainEvent::ProfileUpdated { user: *user })?;
            Ok(profile)
        })
    }

    /// Adds to the user's carbon saved total. Backend only.
    pub fn add_carbon_saved(
        &self,
        caller: &Address,
        user: &Address,
        amount: Amount,
    ) -> LedgerResult<Amount> {
        self.ledger.write("profile_add_carbon", |ctx| {
            require_backend(ctx, RegistryKind::UserProfile, caller, ONLY_BACKEND_UPDATE)?;
            if amount == 0 {
                return Err(ValidationError::ZeroValue("amount").into());
            }
            let mut profile = load_or_empty(ctx, user)?;
            profile.total_carbon_saved = profile
                .total_carbon_saved
                .checked_add(amount)
                .ok_or_else(|| LedgerError::rule("Carbon total overflow"))?;
            profile.updated_at = ctx.now();
            ctx.profiles().save_profile(&profile)?;
            ctx.emit(DomainEvent::CarbonSavedAdded {
                user: *user,
                amount,
            })?;
            Ok(profile.total_carbon_saved)
        })
    }

    /// Bumps the sold (`sold = true`) or bought counter. Backend only.
    pub fn update_marketplace_activity(
        &self,
        caller: &Address,
        user: &Address,
        sold: bool,
    ) -> LedgerResult<UserProfile> {
        self.ledger.write("profile_marketplace_activity", |ctx| {
            require_backend(ctx, RegistryKind::UserProfile, caller, ONLY_BACKEND_UPDATE)?;
            record_marketplace_activity(ctx, user, sold)
        })
    }

    /// Self-service profile creation.
    pub fn create_profile(
        &self,
        caller: &Address,
        name: &str,
        email: &str,
    ) -> LedgerResult<UserProfile> {
        self.ledger.write("profile_create", |ctx| {
            ctx.registry(RegistryKind::UserProfile)?;
            validate_identity(name, email)?;
            let mut profile = load_or_empty(ctx, caller)?;
            if profile.is_created() {
                return Err(LedgerError::rule("Profile already exists"));
            }
            profile.name = Some(name.trim().to_string());
            profile.email = Some(email.trim().to_string());
            profile.updated_at = ctx.now();
            ctx.profiles().save_profile(&profile)?;
            ctx.emit(DomainEvent::ProfileCreated { user: *caller })?;
            Ok(profile)
        })
    }

    /// Self-service identity update of an existing profile.
    pub fn update_own_profile(
        &self,
        caller: &Address,
        name: &str,
        email: &str,
    ) -> LedgerResult<UserProfile> {
        self.ledger.write("profile_update_own", |ctx| {
            ctx.registry(RegistryKind::UserProfile)?;
            validate_identity(name, email)?;
            let mut profile = match ctx.profiles().get_profile(caller)? {
                Some(profile) if profile.is_created() => profile,
                _ => return Err(LedgerError::rule("Profile does not exist")),
            };
            profile.name = Some(name.trim().to_string());
            profile.email = Some(email.trim().to_string());
            profile.updated_at = ctx.now();
            ctx.profiles().save_profile(&profile)?;
            ctx.emit(DomainEvent::ProfileUpdated { user: *caller })?;
            Ok(profile)
        })
    }

    /// Profile of `user`; an untouched account reads as an empty profile.
    pub fn get_profile(&self, user: &Address) -> LedgerResult<UserProfile> {
        self.ledger.read(|ctx| load_or_empty(ctx, user))
    }

    /// Registers `user` without paying a bonus. Backend only.
    pub fn register_user(&self, caller: &Address, user: &Address) -> LedgerResult<()> {
        self.ledger.write("onboarding_register", |ctx| {
            require_backend(
                ctx,
                RegistryKind::UserOnboarding,
                caller,
                "Only backend can register",
            )?;
            if ctx.profiles().get_registration(user)?.is_some() {
                return Err(LedgerError::rule("User already registered"));
            }
            ctx.profiles().insert_registration(&Registration {
                account: *user,
                onboarded: false,
                registered_at: ctx.now(),
            })?;
            ctx.emit(DomainEvent::UserRegistered { user: *user })
        })
    }

    /// Backend-side session check.
    pub fn authenticate_user(&self, caller: &Address, user: &Address) -> LedgerResult<bool> {
        self.ledger.read(|ctx| {
            require_backend(
                ctx,
                RegistryKind::UserOnboarding,
                caller,
                "Only backend can authenticate",
            )?;
            Ok(ctx.profiles().get_registration(user)?.is_some())
        })
    }

    pub fn is_registered(&self, user: &Address) -> LedgerResult<bool> {
        self.ledger
            .read(|ctx| Ok(ctx.profiles().get_registration(user)?.is_some()))
    }

    /// Registers the caller if needed and mints the welcome bonus once.
    ///
    /// Returns the bonus paid.
    pub fn onboard_user(&self, caller: &Address) -> LedgerResult<Amount> {
        self.ledger.write("onboarding_onboard", |ctx| {
            ctx.registry(RegistryKind::UserOnboarding)?;
            match ctx.profiles().get_registration(caller)? {
                Some(registration) if registration.onboarded => {
                    return Err(LedgerError::rule("User already onboarded"));
                }
                Some(_) => ctx.profiles().mark_onboarded(caller)?,
                None => {
                    ctx.profiles().insert_registration(&Registration {
                        account: *caller,
                        onboarded: true,
                        registered_at: ctx.now(),
                    })?;
                    ctx.emit(DomainEvent::UserRegistered { user: *caller })?;
                }
            }
            let bonus = ctx.config().welcome_bonus;
            if bonus > 0 {
                mint_as_registry(ctx, RegistryKind::UserOnboarding, caller, bonus)?;
            }
            ctx.emit(DomainEvent::UserOnboarded {
                user: *caller,
                bonus,
            })?;
            Ok(bonus)
        })
    }
}

fn validate_identity(name: &str, email: &str) -> Result<(), ValidationError> {
    require_text("name", name, MAX_NAME_CHARS)?;
    require_text("email", email, MAX_EMAIL_CHARS)?;
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

fn load_or_empty(ctx: &Ctx<'_>, user: &Address) -> LedgerResult<UserProfile> {
    Ok(ctx
        .profiles()
        .get_profile(user)?
        .unwrap_or_else(|| UserProfile::empty(*user)))
}

/// Bumps one marketplace counter inside the current scope.
pub(crate) fn record_marketplace_activity(
    ctx: &Ctx<'_>,
    user: &Address,
    sold: bool,
) -> LedgerResult<UserProfile> {
    let mut profile = load_or_empty(ctx, user)?;
    let counter = if sold {
        &mut profile.marketplace_items_sold
    } else {
        &mut profile.marketplace_items_bought
    };
    *counter = counter.saturating_add(1);
    profile.updated_at = ctx.now();
    ctx.profiles().save_profile(&profile)?;
    ctx.emit(DomainEvent::MarketplaceActivityUpdated { user: *user, sold })?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::validate_identity;
    use crate::model::ValidationError;

    #[test]
    fn identity_requires_name_and_plausible_email() {
        assert!(validate_identity("Alice", "alice@example.com").is_ok());
        assert_eq!(
            validate_identity("  ", "alice@example.com"),
            Err(ValidationError::EmptyField("name"))
        );
        assert_eq!(
            validate_identity("Alice", "alice.example.com"),
            Err(ValidationError::InvalidEmail)
        );
    }
}
