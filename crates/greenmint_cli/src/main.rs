//! GreenMint ledger command line.
//!
//! # Responsibility
//! - Deploy and inspect a ledger database from a shell.
//! - Export the OpenAPI catalog and run a scripted user journey.
//! - Keep output deterministic: JSON for data, `key=value` lines for status.

use clap::{Parser, Subcommand};
use greenmint_core::config::{CONFIG_PATH_ENV, DB_PATH_ENV};
use greenmint_core::model::challenge::NewChallenge;
use greenmint_core::{
    format_units, generate_openapi, init_logging_from_config, tokens, Address, Amount,
    EventFilter, Ledger, LedgerConfig, RegistryKind, TOKEN_DECIMALS,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[clap(name = "greenmint")]
#[clap(about = "Inspect and operate a GreenMint ledger database")]
#[clap(version)]
struct Args {
    /// Ledger SQLite file; overrides the config value
    #[clap(long, value_name = "FILE", env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// TOML config file
    #[clap(long, value_name = "FILE", env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy every registry into an empty ledger
    Deploy,
    /// List deployed registries and their addresses
    Registries,
    /// Print committed ledger events
    Events {
        /// Registry name, e.g. `Verification`
        #[clap(long)]
        registry: Option<String>,
        #[clap(long, default_value = "100")]
        limit: u32,
        /// Only events after this sequence number
        #[clap(long)]
        after: Option<i64>,
    },
    /// Write the OpenAPI document for the registry catalog
    Openapi {
        /// Output file; stdout when omitted
        #[clap(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Run the onboarding-to-reward journey against the ledger
    Demo {
        /// Journey account; a fresh address when omitted
        #[clap(long)]
        user: Option<String>,
    },
    /// Check core linkage
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    match args.command {
        Command::Ping => {
            println!("greenmint_core ping={}", greenmint_core::ping());
            println!("greenmint_core version={}", greenmint_core::core_version());
            Ok(())
        }
        Command::Openapi { output } => write_openapi(output),
        Command::Deploy => {
            let ledger = open_ledger(args.config, args.db)?;
            let records = ledger.registries().deploy().map_err(|err| err.to_string())?;
            for record in &records {
                println!("{}={}", record.kind, record.address);
            }
            info!(
                "event=cli_deploy module=cli status=ok registries={}",
                records.len()
            );
            Ok(())
        }
        Command::Registries => {
            let ledger = open_ledger(args.config, args.db)?;
            let records = ledger
                .registries()
                .deployment()
                .map_err(|err| err.to_string())?;
            if records.is_empty() {
                println!("status=not_deployed");
                return Ok(());
            }
            print_json(&records)
        }
        Command::Events {
            registry,
            limit,
            after,
        } => {
            let registry = registry
                .as_deref()
                .map(|name| {
                    RegistryKind::parse(name).ok_or_else(|| format!("unknown registry `{name}`"))
                })
                .transpose()?;
            let ledger = open_ledger(args.config, args.db)?;
            let events = ledger
                .registries()
                .list_events(&EventFilter {
                    registry,
                    name: None,
                    after_seq: after,
                    limit: Some(limit),
                })
                .map_err(|err| err.to_string())?;
            print_json(&events)
        }
        Command::Demo { user } => {
            let ledger = open_ledger(args.config, args.db)?;
            run_demo(&ledger, user.as_deref())
        }
    }
}

fn open_ledger(config_path: Option<PathBuf>, db: Option<PathBuf>) -> Result<Ledger, String> {
    let mut config = LedgerConfig::load(config_path.as_deref()).map_err(|err| err.to_string())?;
    if let Some(db) = db {
        config.db_path = db;
    }
    init_logging_from_config(&config)?;
    Ledger::open(config).map_err(|err| err.to_string())
}

fn write_openapi(output: Option<PathBuf>) -> Result<(), String> {
    let document = serde_json::to_string_pretty(&generate_openapi())
        .map_err(|err| format!("openapi encode failed: {err}"))?;
    match output {
        Some(path) => {
            std::fs::write(&path, document)
                .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?;
            println!("openapi={}", path.display());
            Ok(())
        }
        None => {
            println!("{document}");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| format!("json encode failed: {err}"))?;
    println!("{rendered}");
    Ok(())
}

fn run_demo(ledger: &Ledger, user: Option<&str>) -> Result<(), String> {
    let fail = |err: greenmint_core::LedgerError| err.to_string();
    if !ledger.registries().is_deployed().map_err(fail)? {
        ledger.registries().deploy().map_err(fail)?;
        println!("step=deploy status=ok");
    }

    let backend = ledger.backend();
    let user = match user {
        Some(raw) => Address::parse(raw).map_err(|err| err.to_string())?,
        None => {
            let seq = ledger.registries().latest_event_seq().map_err(fail)?;
            Address::derive_registry(&backend, seq.unsigned_abs())
        }
    };
    println!("user={user}");

    let bonus = ledger.profiles().onboard_user(&user).map_err(fail)?;
    println!("step=onboard bonus={}", format_units(bonus, TOKEN_DECIMALS));

    let verification = ledger
        .verification()
        .submit_verification(&backend, &user, 1, "QmDemoCommuteProof")
        .map_err(fail)?;
    ledger
        .verification()
        .verify_submission(&backend, verification, tokens(50))
        .map_err(fail)?;
    println!("step=verify id={verification} reward=50");

    ledger
        .tracking()
        .track_carbon_reduction(&backend, &user, tokens(2))
        .map_err(fail)?;
    ledger
        .profiles()
        .add_carbon_saved(&backend, &user, tokens(2))
        .map_err(fail)?;
    println!("step=track reduction=2");

    let challenge = ledger
        .challenges()
        .create_challenge(
            &backend,
            &NewChallenge {
                title: "Car-free week".to_string(),
                description: "Walk, bike or ride transit for seven days".to_string(),
                details_uri: String::new(),
                reward: tokens(100),
                duration_secs: 7 * 24 * 60 * 60,
                max_participants: 0,
            },
        )
        .map_err(fail)?;
    ledger
        .challenges()
        .join_challenge(&user, challenge)
        .map_err(fail)?;
    ledger
        .challenges()
        .complete_challenge(&backend, challenge, &user)
        .map_err(fail)?;
    println!("step=challenge id={challenge} reward=100");

    let badge = ledger
        .nfts()
        .mint_reward(&backend, &user, "QmDemoBadge", "Car-free week finisher", 1)
        .map_err(fail)?;
    println!("step=nft token_id={badge}");

    let balance = ledger.tokens().balance_of(&user).map_err(fail)?;
    ledger
        .leaderboard()
        .update_user_score(&backend, &user, whole_token_score(balance))
        .map_err(fail)?;
    let position = ledger
        .leaderboard()
        .get_user_position(&user)
        .map_err(fail)?;

    println!(
        "summary balance={} nfts={} position={}",
        format_units(balance, TOKEN_DECIMALS),
        ledger.nfts().balance_of(&user).map_err(fail)?,
        position
    );
    info!("event=cli_demo module=cli status=ok user={user}");
    Ok(())
}

/// Whole CCT in `balance`, saturating at `u64::MAX`.
fn whole_token_score(balance: Amount) -> u64 {
    u64::try_from(balance / tokens(1)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::whole_token_score;
    use greenmint_core::{tokens, Amount};

    #[test]
    fn score_drops_fractions_and_saturates() {
        assert_eq!(whole_token_score(tokens(162) + tokens(1) / 2), 162);
        assert_eq!(whole_token_score(Amount::MAX), u64::MAX);
        assert_eq!(
            whole_token_score(tokens(1) * (Amount::from(u64::MAX) + 1)),
            u64::MAX
        );
    }
}
