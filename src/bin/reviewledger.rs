//! reviewledger command-line front end
//!
//! Lists, shows and rates items in a ledger kept in a local data directory.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use reviewledger::{
    open_store, AppConfig, ItemId, LedgerRepository, RatingSession, ReviewRecord, UpsertKind,
};

enum Command {
    List,
    Show(ItemId),
    Rate {
        item_id: ItemId,
        title: String,
        score: String,
        review: String,
    },
}

struct Args {
    data_dir: Option<PathBuf>,
    user: Option<String>,
    command: Command,
}

fn usage() {
    println!("reviewledger - local movie review ledger");
    println!();
    println!("USAGE:");
    println!("    reviewledger [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    list                               List every stored review");
    println!("    show <ID>                          Show the review for one item");
    println!("    rate <ID> <TITLE> <SCORE> <REVIEW>  Create or update a review (score 1-10)");
    println!();
    println!("OPTIONS:");
    println!("    -d, --data-dir <DIR>      Data directory [default: ./cinereview.data]");
    println!("    -u, --user <UID>          Keep a separate ledger for this user id");
    println!("    -h, --help                Print help information");
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut data_dir = None;
    let mut user = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--data-dir" | "-d" => {
                let value = args.get(i + 1).ok_or("--data-dir requires a value")?;
                data_dir = Some(PathBuf::from(value));
                i += 2;
            }
            "--user" | "-u" => {
                let value = args.get(i + 1).ok_or("--user requires a value")?;
                user = Some(value.clone());
                i += 2;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            arg if arg.starts_with('-') && rest.is_empty() => {
                return Err(format!("unknown argument: {arg}"));
            }
            arg => {
                rest.push(arg.to_string());
                i += 1;
            }
        }
    }

    let command = match rest.split_first() {
        Some((cmd, params)) => match (cmd.as_str(), params) {
            ("list", []) => Command::List,
            ("show", [id]) => Command::Show(ItemId::parse(id)),
            ("rate", [id, title, score, review @ ..]) if !review.is_empty() => Command::Rate {
                item_id: ItemId::parse(id),
                title: title.clone(),
                score: score.clone(),
                review: review.join(" "),
            },
            (other, _) => return Err(format!("invalid command or arguments: {other}")),
        },
        None => return Err("missing command".to_string()),
    };

    Ok(Args {
        data_dir,
        user,
        command,
    })
}

fn print_record(record: &ReviewRecord) {
    println!("[{}] {} - {}/10", record.item_id, record.title, record.score);
    println!("    {}", record.review_text);
}

fn run(args: Args) -> Result<(), reviewledger::LedgerError> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(uid) = args.user {
        config.ledger = config.ledger.for_user(uid);
    }

    let store = open_store(&config.data_dir, Some(config.persistent.clone()))?;
    let repo = LedgerRepository::new(Arc::new(store), &config.ledger)?;

    match args.command {
        Command::List => {
            let ledger = repo.load()?;
            if ledger.is_empty() {
                println!("no reviews yet");
            }
            for record in &ledger {
                print_record(record);
            }
        }
        Command::Show(item_id) => match repo.load()?.find_by_id(&item_id) {
            Some(record) => print_record(record),
            None => println!("{item_id}: not rated"),
        },
        Command::Rate {
            item_id,
            title,
            score,
            review,
        } => {
            let mut session = RatingSession::activate(repo, item_id, title);
            session.set_review(review);
            session.set_score(score);
            match session.submit()? {
                UpsertKind::Create => println!("saved"),
                UpsertKind::Update => println!("updated"),
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
