use log::{debug, info, warn};

use gamevote_core::builder::ServiceBuilder;
use gamevote_core::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::driver::config_reader::*;
use crate::driver::io_csv::read_candidates_csv;
use crate::driver::state_file::{load_state, lock_state, save_state};

pub mod config_reader;
pub mod io_csv;
pub mod state_file;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Error reading file {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error replacing file {path}"))]
    PersistingFile {
        source: tempfile::PersistError,
        path: String,
    },
    #[snafu(display("Error locking file {path}"))]
    LockingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("CSV file {path} has no {column:?} column"))]
    CsvMissingColumn { path: String, column: String },
    #[snafu(display("CSV line {lineno}: cannot read {value:?} as enabled or disabled"))]
    CsvBadFlag { lineno: usize, value: String },

    #[snafu(context(false), display("{source}"))]
    Voting { source: VotingError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CliResult<T> = Result<T, CliError>;

fn print_candidates(candidates: &[Candidate], show_flag: bool) {
    for c in candidates.iter() {
        if show_flag {
            let flag = if c.enabled { "enabled" } else { "disabled" };
            println!("{:>4}  {}  ({})", c.id.0, c.name, flag);
        } else {
            println!("{:>4}  {}", c.id.0, c.name);
        }
    }
}

fn print_view(view: &ResultsView) {
    println!("Winner: {}", view.winner_name);
    println!("{}", view.explanation);
    for e in view.breakdown.iter() {
        println!("{:>6} {}", e.votes, e.name);
    }
}

/// The JSON summary of a result.
pub fn build_summary_js(view: &ResultsView) -> JSValue {
    let tally: Vec<JSValue> = view
        .breakdown
        .iter()
        .map(|e| json!({"candidate": e.name, "votes": e.votes}))
        .collect();
    json!({
        "winner": view.winner_name,
        "reason": view.result.reason.key(),
        "explanation": view.explanation,
        "computedAt": view.result.computed_at.to_rfc3339(),
        "period": {
            "openedAt": view.result.period.opened_at().to_rfc3339(),
            "closedAt": view.result.period.closed_at().to_rfc3339(),
        },
        "tally": tally,
    })
}

fn write_summary(view: &ResultsView, out: Option<&str>, reference: Option<&str>) -> CliResult<()> {
    let result_js = build_summary_js(view);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {
        path: out.unwrap_or("stdout"),
    })?;

    match out {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingFileSnafu { path })?;
            info!("Summary written to {:?}", path);
        }
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = reference {
        let contents =
            fs::read_to_string(summary_p).context(ReadingFileSnafu { path: summary_p })?;
        let summary_ref: JSValue = serde_json::from_str(contents.as_str())
            .context(ParsingJsonSnafu { path: summary_p })?;
        let pretty_js_summary_ref = serde_json::to_string_pretty(&summary_ref)
            .context(ParsingJsonSnafu { path: summary_p })?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }
    Ok(())
}

/// Runs one command against the session.
pub fn execute(
    session: &mut Session<MemoryStore>,
    service: &VotingService<MemoryStore>,
    command: &Command,
) -> CliResult<()> {
    match command {
        Command::Status => {
            let period = service.status()?;
            println!("Voting is {}.", period.state());
            if let Some(t) = period.opened_at {
                println!("Last opened: {}", t.to_rfc3339());
            }
            if let Some(t) = period.closed_at {
                println!("Last closed: {}", t.to_rfc3339());
            }
            if period.is_open {
                let voter = &session.identity().voter;
                if service.is_eligible(voter)? {
                    println!("{} can vote.", voter);
                } else {
                    println!("{} already voted.", voter);
                }
            }
        }
        Command::Open => {
            if session.open()? == Transition::Unchanged {
                println!("Voting was already open.");
            }
        }
        Command::Close => match session.close()? {
            Closing::AlreadyClosed => println!("Voting was already closed."),
            Closing::Closed { result: None, .. } => {
                println!("Nobody voted, there is no winner.")
            }
            Closing::Closed { result: Some(_), .. } => {}
        },
        Command::Vote { candidates } => {
            session.cast_ballot_by_name(candidates)?;
            println!("Ballot recorded for {}.", candidates.join(" and "));
        }
        Command::Candidates { all } => {
            if *all {
                print_candidates(&session.list_all()?, true);
            } else {
                print_candidates(&session.list_enabled()?, false);
            }
        }
        Command::AddCandidate { name, disabled } => {
            let c = session.add_candidate(name, !*disabled)?;
            println!("Added candidate {} ({}).", c.name, c.id);
        }
        Command::Enable { name } => {
            session.set_enabled_by_name(name, true)?;
        }
        Command::Disable { name } => {
            session.set_enabled_by_name(name, false)?;
        }
        Command::Import { path } => {
            let parsed = read_candidates_csv(path)?;
            info!("Importing {} candidates from {:?}", parsed.len(), path);
            for pc in parsed.iter() {
                match session.add_candidate(&pc.name, pc.enabled) {
                    Ok(c) => println!("Added candidate {} ({}).", c.name, c.id),
                    Err(VotingError::NameTaken { name }) => {
                        warn!("Candidate {:?} already exists, skipping", name)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Command::Results { out, reference } => match session.results()? {
            Some(view) => {
                print_view(&view);
                write_summary(&view, out.as_deref(), reference.as_deref())?;
            }
            None => {
                println!("Nobody voted in the last period, there is no winner.");
                if reference.is_some() {
                    whatever!("No result to compare with the reference summary")
                }
            }
        },
        Command::Retally => match session.retally()? {
            PeriodOutcome::Decided(r) => {
                println!("Result {:?} recorded for period {}.", r.id.0, r.period)
            }
            PeriodOutcome::NoVotes(w) => println!("Nobody voted in period {}.", w),
        },
    }
    Ok(())
}

pub fn run(args: &Args) -> CliResult<()> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => AppConfig::default(),
    };
    info!("config: {:?}", config);

    let state_path = args
        .state
        .clone()
        .or_else(|| config.state_file.clone())
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    // Held until the new state is saved, so commands run one after the other.
    let _lock = lock_state(&state_path)?;
    let store = load_state(&state_path)?;

    let mut builder = ServiceBuilder::new(store).reason_texts(config.reason_texts());
    if let Some(seed) = args.seed.or(config.random_seed) {
        builder = builder.seed(seed);
    }
    let service = builder.build();
    let identity = config.identity(args.user.as_deref());
    debug!("identity: {:?}", identity);

    let res = {
        let mut session = Session::new(&service, identity);
        let res = execute(&mut session, &service, &args.command);
        if let Some(msg) = session.response() {
            println!("{}", msg);
        }
        res
    };

    // Rejected commands leave the state as it was, saving it is harmless.
    if args.command.is_mutating() {
        save_state(&state_path, &service.into_store())?;
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run_cmd(dir: &tempfile::TempDir, cmd: &[&str]) -> CliResult<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let state = dir.path().join("state.json");
        let config = dir.path().join("config.json");
        if !config.exists() {
            fs::write(
                &config,
                r#"{"admins": ["root"], "randomSeed": 3, "reasons": {"mostVotes": "Most votes."}}"#,
            )
            .unwrap();
        }
        let mut argv = vec![
            "gamevote".to_string(),
            "--config".to_string(),
            config.to_str().unwrap().to_string(),
            "--state".to_string(),
            state.to_str().unwrap().to_string(),
        ];
        argv.extend(cmd.iter().map(|s| s.to_string()));
        let args = Args::parse_from(argv);
        run(&args)
    }

    #[test]
    fn full_cycle_through_the_state_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Azul", "Catan", "Wingspan"] {
            run_cmd(&dir, &["--user", "root", "add-candidate", name]).unwrap();
        }
        run_cmd(&dir, &["--user", "root", "open"]).unwrap();
        run_cmd(&dir, &["--user", "ann", "vote", "Azul", "Catan"]).unwrap();
        run_cmd(&dir, &["--user", "bob", "vote", "Azul", "Wingspan"]).unwrap();
        let again = run_cmd(&dir, &["--user", "ann", "vote", "Azul", "Wingspan"]);
        assert!(matches!(
            again,
            Err(CliError::Voting {
                source: VotingError::IneligibleBallot { .. }
            })
        ));
        // Results are hidden while voting is open.
        assert!(run_cmd(&dir, &["results"]).is_err());
        run_cmd(&dir, &["--user", "root", "close"]).unwrap();

        let out = dir.path().join("summary.json");
        run_cmd(&dir, &["results", "--out", out.to_str().unwrap()]).unwrap();
        let js: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(js["winner"], json!("Azul"));
        assert_eq!(js["reason"], json!("MostVotes"));
        assert_eq!(js["explanation"], json!("Most votes."));
        assert_eq!(js["tally"][0], json!({"candidate": "Azul", "votes": 2}));

        // The written summary is its own reference.
        run_cmd(&dir, &["results", "--reference", out.to_str().unwrap()]).unwrap();
        fs::write(&out, r#"{"winner": "Catan"}"#).unwrap();
        assert!(run_cmd(&dir, &["results", "--reference", out.to_str().unwrap()]).is_err());
    }

    #[test]
    fn voters_cannot_administer() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_cmd(&dir, &["--user", "ann", "open"]);
        assert!(matches!(
            res,
            Err(CliError::Voting {
                source: VotingError::NotAuthorized { .. }
            })
        ));
    }

    #[test]
    fn unknown_candidate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        run_cmd(&dir, &["--user", "root", "add-candidate", "Azul"]).unwrap();
        run_cmd(&dir, &["--user", "root", "open"]).unwrap();
        let res = run_cmd(&dir, &["--user", "ann", "vote", "Azul", "Chess"]);
        assert!(matches!(
            res,
            Err(CliError::Voting {
                source: VotingError::NotFound { .. }
            })
        ));
    }

    #[test]
    fn concurrent_commands_keep_every_ballot() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Azul", "Catan"] {
            run_cmd(&dir, &["--user", "root", "add-candidate", name]).unwrap();
        }
        run_cmd(&dir, &["--user", "root", "open"]).unwrap();

        let voters: Vec<String> = (0..16).map(|i| format!("voter{}", i)).collect();
        let accepted = std::thread::scope(|s| {
            let handles: Vec<_> = voters
                .iter()
                .map(|v| {
                    let dir = &dir;
                    let cmd = ["--user", v.as_str(), "vote", "Azul", "Catan"];
                    s.spawn(move || run_cmd(dir, &cmd).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(accepted, 16);

        let store = load_state(dir.path().join("state.json").to_str().unwrap()).unwrap();
        assert_eq!(store.votes().len(), 32);
    }

    #[test]
    fn closed_period_is_reported_before_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        run_cmd(&dir, &["--user", "root", "add-candidate", "Azul"]).unwrap();
        let res = run_cmd(&dir, &["--user", "ann", "vote", "Azul", "Chess"]);
        assert!(matches!(
            res,
            Err(CliError::Voting {
                source: VotingError::StateViolation { .. }
            })
        ));
    }

    #[test]
    fn toggling_needs_admin_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        run_cmd(&dir, &["--user", "root", "add-candidate", "Azul"]).unwrap();
        for cmd in ["enable", "disable"] {
            let res = run_cmd(&dir, &["--user", "ann", cmd, "Chess"]);
            assert!(matches!(
                res,
                Err(CliError::Voting {
                    source: VotingError::NotAuthorized { .. }
                })
            ));
        }
        run_cmd(&dir, &["--user", "root", "disable", "Azul"]).unwrap();
        let store = load_state(dir.path().join("state.json").to_str().unwrap()).unwrap();
        assert!(!store.candidates().unwrap()[0].enabled);
    }

    #[test]
    fn import_skips_existing_names() {
        let dir = tempfile::tempdir().unwrap();
        run_cmd(&dir, &["--user", "root", "add-candidate", "Azul"]).unwrap();
        let csv_path = dir.path().join("games.csv");
        fs::write(&csv_path, "name,enabled\nAzul,\nCatan,no\n").unwrap();
        run_cmd(&dir, &["--user", "root", "import", csv_path.to_str().unwrap()]).unwrap();
        let store = load_state(dir.path().join("state.json").to_str().unwrap()).unwrap();
        let candidates = store.candidates().unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().any(|c| c.name == "Catan" && !c.enabled));
    }
}
