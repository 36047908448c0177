mod command;
mod render;

use std::fmt;

use services::{Clock, NextOutcome, PlayerError, SessionError, StudyPlayer, StudySessionService};
use storage::remote::RemoteConfig;
use storage::repository::Storage;
use study_core::model::{ChoiceId, StudySetId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use command::Command;

const ENV_SET_ID: &str = "STUDY_SET_ID";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSetId { raw: String },
    InvalidSeed { raw: String },
    MissingSetId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSetId { raw } => write!(f, "invalid --set-id value: {raw}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::MissingSetId => write!(f, "no study set given (--set-id or {ENV_SET_ID})"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--set-id <id>] [--seed <n>] [--no-shuffle]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_BACKEND_URL, STUDY_BACKEND_KEY   (required)");
    eprintln!("  STUDY_ACCESS_TOKEN, STUDY_RPC_TIMEOUT_SECS, STUDY_SET_ID");
    eprintln!("  RUST_LOG                               log filter, e.g. services=debug");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subcommand {
    Play,
}

impl Subcommand {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    set_id: StudySetId,
    seed: Option<u64>,
    shuffle: bool,
}

impl Args {
    fn parse_play(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut set_id = std::env::var(ENV_SET_ID)
            .ok()
            .and_then(|value| value.trim().parse::<StudySetId>().ok());
        let mut seed = None;
        let mut shuffle = true;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--set-id" => {
                    let value = require_value(args, "--set-id")?;
                    let parsed = value
                        .parse::<StudySetId>()
                        .map_err(|_| ArgsError::InvalidSetId { raw: value.clone() })?;
                    set_id = Some(parsed);
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                "--no-shuffle" => shuffle = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            set_id: set_id.ok_or(ArgsError::MissingSetId)?,
            seed,
            shuffle,
        })
    }
}

/// Resolve a displayed 1-based position against the visit's presentation order.
fn at(player: &StudyPlayer, position: usize) -> Result<ChoiceId, PlayerError> {
    let order = player.visit().map(|v| v.order()).unwrap_or_default();
    order
        .get(position - 1)
        .copied()
        .ok_or(PlayerError::Position {
            index: position - 1,
            len: order.len(),
        })
}

/// Left-hand entries of a matching item are listed in their canonical order.
fn left_at(player: &StudyPlayer, position: usize) -> Result<ChoiceId, PlayerError> {
    let lefts = player
        .current_item()
        .map(|item| item.shufflable_ids())
        .unwrap_or_default();
    lefts.get(position - 1).copied().ok_or(PlayerError::Position {
        index: position - 1,
        len: lefts.len(),
    })
}

enum Flow {
    Stay,
    Redraw,
    Done,
}

async fn apply(
    service: &StudySessionService,
    player: &mut StudyPlayer,
    command: Command,
) -> Result<Flow, SessionError> {
    let flow = match command {
        Command::Flip => {
            player.flip()?;
            Flow::Redraw
        }
        Command::Knew => {
            render::verdict(player.assess(true)?);
            Flow::Stay
        }
        Command::Missed => {
            render::verdict(player.assess(false)?);
            Flow::Stay
        }
        Command::Pick(pos) => {
            let id = at(player, pos)?;
            player.select_choice(id)?;
            Flow::Redraw
        }
        Command::Toggle(pos) => {
            let id = at(player, pos)?;
            player.toggle_choice(id)?;
            Flow::Redraw
        }
        Command::Type(text) => {
            player.set_text(&text)?;
            Flow::Stay
        }
        Command::Pair { left, right } => {
            let left = left_at(player, left)?;
            let right = at(player, right)?;
            player.match_pair(left, right)?;
            Flow::Redraw
        }
        Command::Unpair(left) => {
            let left = left_at(player, left)?;
            player.unmatch(left)?;
            Flow::Redraw
        }
        Command::Move { from, to } => {
            player.move_step(from - 1, to - 1)?;
            Flow::Redraw
        }
        Command::Check => {
            render::verdict(player.check()?);
            Flow::Stay
        }
        Command::Next => match service.next(player).await? {
            NextOutcome::Presenting { .. } => Flow::Redraw,
            NextOutcome::Finished(report) => {
                render::summary(&report);
                Flow::Done
            }
        },
        Command::Prev => {
            player.prev()?;
            Flow::Redraw
        }
        Command::Progress => {
            render::progress(&player.progress());
            Flow::Stay
        }
        Command::Help => {
            command::print_commands();
            Flow::Stay
        }
        Command::Quit => Flow::Done,
    };
    Ok(flow)
}

async fn play(service: &StudySessionService, set_id: StudySetId) -> Result<(), Box<dyn std::error::Error>> {
    let mut player = service.start(set_id).await?;
    command::print_commands();
    render::item(&player);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        match apply(service, &mut player, command).await {
            Ok(Flow::Stay) => {}
            Ok(Flow::Redraw) => render::item(&player),
            Ok(Flow::Done) => break,
            // Player errors are learner mistakes; storage errors cannot occur
            // mid-session, so anything else ends the run.
            Err(SessionError::Player(err)) => eprintln!("{err}"),
            Err(err) => return Err(err.into()),
        }
        for notice in player.take_notices() {
            render::notice(&notice);
        }
    }

    if !player.is_finished() {
        info!(session_id = %player.session_id(), "left study session before the end; nothing reported");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Subcommand::Play,
        Some(first) => Subcommand::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let skip = usize::from(argv.first().is_some_and(|a| !a.starts_with("--")));
    let mut iter = argv.into_iter().skip(skip);
    let parsed = match cmd {
        Subcommand::Play => Args::parse_play(&mut iter),
    }
    .map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Remote wiring stays in the binary so core/services remain backend-agnostic.
    let config = RemoteConfig::from_env()?;
    let storage = Storage::remote(config)?;
    let service = StudySessionService::from_storage(Clock::system(), &storage)
        .with_shuffle(parsed.shuffle)
        .with_seed(parsed.seed);

    match cmd {
        Subcommand::Play => play(&service, parsed.set_id).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
