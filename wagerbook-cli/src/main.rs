//! # Wagerbook CLI
//!
//! Command-line interface for proposing, accepting and settling escrowed
//! fixed-odds bets. State (bets, custody, balances) lives in a JSON file that
//! is loaded before and saved after every state-changing command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;
use wagerbook_core::{
    host::DEFAULT_OPENING_BALANCE, utils::*, Bet, Identity, LocalHost, Quote, Settlement,
    PLATFORM_FEE_PERCENT,
};

#[derive(Parser)]
#[command(name = "wagerbook")]
#[command(about = "Escrow-based peer-to-peer wagering ledger")]
#[command(version)]
struct Cli {
    /// State file holding bets, custody and balances
    #[arg(long, global = true, env = "WAGERBOOK_STATE", default_value = "wagerbook.json")]
    state: PathBuf,

    /// Caller identity: a seed alias (e.g. "alice") or a 64-char hex key
    #[arg(long, global = true, default_value = "alice")]
    from: String,

    /// Balance given to identities seen for the first time in a new state file
    #[arg(long, global = true, env = "WAGERBOOK_OPENING_BALANCE", default_value_t = DEFAULT_OPENING_BALANCE)]
    opening_balance: u64,

    /// Log filter (e.g. "info", "wagerbook_core=debug")
    #[arg(long, global = true, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose a new bet, locking stake * numerator / denominator
    Create {
        /// Base stake the acceptor must match
        #[arg(short, long)]
        stake: u64,
        /// Odds numerator
        #[arg(short, long)]
        numerator: u64,
        /// Odds denominator
        #[arg(short, long)]
        denominator: u64,
        /// Match label (text or 0x-hex)
        #[arg(short, long)]
        r#match: String,
        /// Predicted outcome (text or 0x-hex)
        #[arg(short, long)]
        predict: String,
        /// Value to attach (defaults to the exact locked stake)
        #[arg(short, long)]
        value: Option<u64>,
    },
    /// Accept a creator's open bet, matching its stake
    Accept {
        /// Creator alias or hex identity
        creator: String,
        /// Bet index in the creator's collection
        index: usize,
        /// Value to attach (defaults to the bet's stake)
        #[arg(short, long)]
        value: Option<u64>,
    },
    /// Resolve one of your accepted bets with the actual outcome
    Resolve {
        /// Bet index in your collection
        index: usize,
        /// Actual outcome (text or 0x-hex)
        outcome: String,
    },
    /// Withdraw one of your open bets
    Withdraw {
        /// Bet index in your collection
        index: usize,
    },
    /// Number of live bets you created
    Count,
    /// List a creator's live bets
    Show {
        /// Creator alias or hex identity (defaults to the caller)
        creator: Option<String>,
    },
    /// Show balances
    Balance {
        /// Alias or hex identity (defaults to every known account)
        who: Option<String>,
    },
    /// Show custody and retained platform fees
    Fees,
    /// Print the caller's resolved identity
    Identity,
    /// Quote locked stake, payout and fee without touching state
    Quote {
        stake: u64,
        numerator: u64,
        denominator: u64,
    },
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_host(path: &Path, opening_balance: u64) -> Result<LocalHost> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "starting new state file");
        return Ok(LocalHost::new(opening_balance));
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    LocalHost::from_json(&json)
        .with_context(|| format!("Failed to parse state file {}", path.display()))
}

fn save_host(path: &Path, host: &LocalHost) -> Result<()> {
    let json = host.to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write state file {}", path.display()))
}

fn resolve_identity(input: &str) -> Result<Identity> {
    Identity::resolve(input).with_context(|| format!("Invalid identity: {input}"))
}

fn print_bet(index: usize, bet: &Bet) {
    println!("{}", "─".repeat(50).bright_black());
    println!("{}: {}", "Index".yellow().bold(), index);
    println!("{}: {}", "Status".yellow().bold(), bet.status);
    println!("{}: {}", "Match".yellow().bold(), display_label(&bet.match_identifier));
    println!("{}: {}", "Prediction".yellow().bold(), display_label(&bet.predicted_outcome));
    println!("{}: {}", "Stake".yellow().bold(), bet.stake_amount);
    println!("{}: {}", "Odds".yellow().bold(), bet.odds);
    println!("{}: {}", "Creator Deposit".yellow().bold(), bet.creator_deposit);
    if let Some(acceptor) = &bet.acceptor {
        println!("{}: {}", "Acceptor".yellow().bold(), acceptor);
        println!("{}: {}", "Acceptor Deposit".yellow().bold(), bet.acceptor_deposit);
    }
    println!("{}: {}", "Created".yellow().bold(), format_timestamp(bet.created_at));
    println!("{}: {}", "Terms Digest".cyan().bold(), bet.terms_digest());
}

fn print_settlement(label: &str, settlement: &Settlement) {
    println!("{}", label.green().bold());
    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Paid To".yellow().bold(), settlement.winner);
    println!("{}: {}", "Amount".yellow().bold(), settlement.payout);
    println!("{}: {}", "Platform Fee".yellow().bold(), settlement.fee);
    for transfer in settlement.transfers.iter().skip(1) {
        println!(
            "{}: {} to {}",
            "Excess Refund".yellow().bold(),
            transfer.amount,
            transfer.to
        );
    }
    println!("{}", "═".repeat(50).bright_black());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let caller = resolve_identity(&cli.from)?;
    let mut host = load_host(&cli.state, cli.opening_balance)?;

    match cli.command {
        Commands::Create {
            stake,
            numerator,
            denominator,
            r#match,
            predict,
            value,
        } => {
            let match_identifier = decode_label(&r#match)?;
            let predicted_outcome = decode_label(&predict)?;
            let value = match value {
                Some(value) => value,
                None => Quote::new(stake, numerator, denominator)?.creator_locked,
            };

            let index = host.create_bet(
                caller,
                value,
                stake,
                numerator,
                denominator,
                &match_identifier,
                &predicted_outcome,
            )?;
            save_host(&cli.state, &host)?;

            println!("{}", "Bet Created Successfully!".green().bold());
            print_bet(index, host.book.get_bet(&caller, index)?);
            println!();
            println!(
                "{}",
                format!("Share creator {} and index {} with the acceptor.", caller, index)
                    .bright_blue()
            );
        }

        Commands::Accept {
            creator,
            index,
            value,
        } => {
            let creator = resolve_identity(&creator)?;
            let value = match value {
                Some(value) => value,
                None => host.book.get_bet(&creator, index)?.stake_amount,
            };
            host.accept_bet(caller, value, &creator, index)?;
            save_host(&cli.state, &host)?;

            println!("{}", "Bet Accepted!".green().bold());
            print_bet(index, host.book.get_bet(&creator, index)?);
        }

        Commands::Resolve { index, outcome } => {
            let outcome = decode_label(&outcome)?;
            let settlement = host.resolve_bet(caller, index, &outcome)?;
            save_host(&cli.state, &host)?;

            let label = if settlement.winner == caller {
                "Bet Resolved - Creator wins"
            } else {
                "Bet Resolved - Acceptor wins"
            };
            print_settlement(label, &settlement);
            println!(
                "{}",
                "Indices of your remaining bets may have shifted; run `show` before the next call."
                    .bright_black()
            );
        }

        Commands::Withdraw { index } => {
            let settlement = host.withdraw_bet(caller, index)?;
            save_host(&cli.state, &host)?;
            print_settlement("Bet Withdrawn", &settlement);
        }

        Commands::Count => {
            println!(
                "{}: {}",
                "Live Bets".green().bold(),
                host.get_number_of_bets(&caller)
            );
        }

        Commands::Show { creator } => {
            let creator = match creator {
                Some(creator) => resolve_identity(&creator)?,
                None => caller,
            };
            let bets = host.book.bets_of(&creator);
            println!("{}: {}", "Creator".green().bold(), creator);
            if bets.is_empty() {
                println!("{}", "No live bets.".bright_black());
            }
            for (index, bet) in bets.iter().enumerate() {
                print_bet(index, bet);
            }
        }

        Commands::Balance { who } => match who {
            Some(who) => {
                let who = resolve_identity(&who)?;
                println!("{}: {}", who.to_string().cyan(), host.balance_of(&who));
            }
            None => {
                for (who, balance) in host.balances.accounts() {
                    println!("{}: {}", who.to_string().cyan(), balance);
                }
            }
        },

        Commands::Fees => {
            println!("{}: {}", "Locked In Escrow".yellow().bold(), host.book.total_locked());
            println!("{}: {}", "Retained Fees".yellow().bold(), host.book.retained_fees());
        }

        Commands::Identity => {
            println!("{}: {}", "Identity".green().bold(), caller.to_string().cyan());
        }

        Commands::Quote {
            stake,
            numerator,
            denominator,
        } => {
            let quote = Quote::new(stake, numerator, denominator)?;
            println!("{}: {} at {}", "Stake".yellow().bold(), quote.stake, quote.odds);
            println!("{}: {}", "Creator Locks".yellow().bold(), quote.creator_locked);
            println!("{}: {}", "Pot".yellow().bold(), quote.pot);
            println!("{}: {}", "Winner Receives".yellow().bold(), quote.payout);
            println!(
                "{}: {} ({}%)",
                "Platform Fee".yellow().bold(),
                quote.fee,
                PLATFORM_FEE_PERCENT
            );
        }
    }

    Ok(())
}
