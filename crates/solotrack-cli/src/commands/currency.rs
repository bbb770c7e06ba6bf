use chrono::{NaiveDate, Utc};
use clap::Args;
use solotrack_core::{Config, CurrencyEngine, Database};

#[derive(Args)]
pub struct CurrencyArgs {
    /// Evaluate as of this date (default: today, UTC)
    #[arg(long)]
    as_of: Option<NaiveDate>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: CurrencyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let flights = db.list_flights()?;

    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let rules = config.currency;
    let status = CurrencyEngine::with_config(rules.clone()).status(&flights, as_of);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Currency as of {as_of}");
        println!("  Day:   {}", status.day.label());
        println!("  Night: {}", status.night.label());
        if !status.day.is_legal() || !status.night.is_legal() {
            println!(
                "Carrying passengers requires {} landings in the preceding {} days \
                 (full-stop for night).",
                rules.required_landings, rules.lookback_days
            );
        }
    }
    Ok(())
}
