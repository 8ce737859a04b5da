use std::{env, fs::File, io, process};

use tracing::info;

use ucenter_ledger::{
    Ledger, MemoryStore,
    config::Config,
    dlq::StdErrDLQ,
    engine::Engine,
    ingestion::{self, CsvReader},
    output, telemetry,
};

#[tokio::main] // using Tokio runtime for async
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = args.remove(i + 1);
            args.remove(i);
            Some(path)
        }
        Some(_) => usage(),
        None => None,
    };
    let mut args = args.into_iter();
    let (Some(accounts_path), Some(requests_path)) = (args.next(), args.next()) else {
        usage();
    };
    let entries_path = args.next();

    let config = Config::load(config_path.as_deref())?;

    // Set up the components
    let store = MemoryStore::new();
    for account in ingestion::read_accounts(File::open(&accounts_path)?)? {
        store.open_account(account).await?;
    }
    let requests = CsvReader::new(File::open(&requests_path)?)?;

    let mut engine = Engine::new(
        requests,
        Ledger::new(store.clone(), config),
        StdErrDLQ::default(),
    );
    let summary = engine.process().await?;
    info!(?summary, "done");

    output::write_balances(&store.accounts().await, io::stdout().lock())?;
    if let Some(path) = entries_path {
        output::write_entries(&store.all_entries().await, File::create(path)?)?;
    }

    Ok(())
}

fn usage() -> ! {
    eprintln!(
        "usage: ucenter_ledger [--config <file.yaml>] <accounts.csv> <requests.csv> [entries.csv]"
    );
    process::exit(2);
}
