//! irt-ledger admin tool
//!
//! ```text
//! irt-ledger [--env|-e <name>] <command>
//!
//!   migrate                  apply schema migrations
//!   health                   check database connectivity
//!   price set <buy> <sell>   publish a USDT quote (IRT per USDT)
//!   price latest             show the authoritative quote
//!   price history [limit]    list quotes, newest first
//!   balances <user_id>       show a user's IRT/USDT balances
//!   capacity stats           show issued capacity per currency
//! ```

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use irt_ledger::config::AppConfig;
use irt_ledger::db::Database;
use irt_ledger::ledger::{Ledger, PgLedgerStore};
use irt_ledger::logging::init_logging;

fn get_env(args: &[String]) -> String {
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Positional arguments with `--env <name>` removed
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args.iter().skip(1) {
        if skip {
            skip = false;
            continue;
        }
        if arg == "--env" || arg == "-e" {
            skip = true;
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn parse_decimal(value: &str, what: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid {}: {}", what, value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env = get_env(&args);
    let command = positional(&args);

    let config = AppConfig::load(&env)?;
    let _guard = init_logging(&config);
    tracing::info!(env = %env, command = ?command, "irt-ledger starting");

    let database_url = config
        .database_url()
        .context("postgres_url is not configured and DATABASE_URL is unset")?;
    let db = Database::connect_with(&database_url, &config.database).await?;

    if let ["migrate"] = command.as_slice() {
        db.migrate().await?;
        println!("migrations applied");
        return Ok(());
    }
    if let ["health"] = command.as_slice() {
        db.health_check().await?;
        println!("ok");
        return Ok(());
    }

    let store = Arc::new(PgLedgerStore::new(db.pool().clone()));
    let ledger = Ledger::new(store, config.ledger.clone());

    match command.as_slice() {
        ["price", "set", buy, sell] => {
            let quote = ledger
                .pricing
                .publish_price(parse_decimal(buy, "buy price")?, parse_decimal(sell, "sell price")?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        ["price", "latest"] => match ledger.pricing.latest_price().await? {
            Some(quote) => println!("{}", serde_json::to_string_pretty(&quote)?),
            None => println!("no price published"),
        },
        ["price", "history", rest @ ..] => {
            let limit = match rest {
                [] => None,
                [limit] => Some(limit.parse::<i64>().context("Invalid limit")?),
                _ => bail!("usage: price history [limit]"),
            };
            let page = ledger
                .pricing
                .price_history(config.ledger.page(limit, None))
                .await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        ["balances", user_id] => {
            let user_id = user_id.parse::<i64>().context("Invalid user id")?;
            let balances = ledger.balances.get_balances(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&balances)?);
        }
        ["capacity", "stats"] => {
            let rows = ledger.capacity.capacity_stats().await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => bail!(
            "usage: irt-ledger [--env <name>] <migrate | health | price set <buy> <sell> | \
             price latest | price history [limit] | balances <user_id> | capacity stats>"
        ),
    }

    Ok(())
}
