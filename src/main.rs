use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use chess_session::{
    session::{OpponentOutcome, Rejection},
    shakmaty::{uci::Uci, Chess, Color, Position, Square},
    AttemptOutcome, Difficulty, Phase, RandomOracle, Replay, ReviewInput, SessionConfig,
    SessionEngine,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Play chess against an oracle and review finished games")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play on the terminal, entering moves like e2e4 or e7e8q
    Play {
        /// JSON session config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum)]
        color: Option<Side>,
        /// Level 1-10 or beginner / intermediate / advanced
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Play both sides yourself
        #[arg(long)]
        two_player: bool,
        /// Opponent failures tolerated in a row before giving up
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },
    /// Show a reviewed game
    Review {
        /// JSON file with notation, annotations and accuracy
        file: PathBuf,
        /// Ply to show; -1 is the initial position
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        ply: isize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Color {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

fn print_board(position: &Chess, highlight: Option<Square>) {
    let board = position.board();
    for rank in (0..8u32).rev() {
        let mut line = format!("{} ", rank + 1);
        for file in 0..8u32 {
            let sq = Square::new(rank * 8 + file);
            let c = board.piece_at(sq).map_or('.', |p| p.char());
            if Some(sq) == highlight {
                line.push_str(&format!("[{c}]"));
            } else {
                line.push_str(&format!(" {c} "));
            }
        }
        println!("{line}");
    }
    println!("   a  b  c  d  e  f  g  h");
}

async fn play(config: SessionConfig, retries: u32) -> Result<()> {
    config.validate()?;
    let oracle = RandomOracle::new();
    let mut engine = SessionEngine::started(config);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut failures = 0;

    loop {
        let Some(position) = engine.position() else {
            bail!("no game in progress");
        };
        print_board(position, engine.check_square());

        match engine.phase() {
            Phase::Idle => bail!("no game in progress"),
            Phase::Terminated => break,
            Phase::AwaitingOpponentMove => {
                println!("opponent is thinking...");
                match engine.drive_opponent(&oracle).await {
                    Some(OpponentOutcome::Played { record, rationale }) => {
                        failures = 0;
                        println!("opponent plays {record} ({rationale})");
                    }
                    Some(OpponentOutcome::Fault(fault)) => {
                        failures += 1;
                        println!("opponent failed: {fault}");
                        if failures > retries {
                            println!("giving up on the opponent");
                            break;
                        }
                    }
                    Some(OpponentOutcome::Stale) | None => {}
                }
            }
            Phase::AwaitingHumanInput => {
                print!("{:?} to move> ", engine.side_to_move().unwrap_or(Color::White));
                io::stdout().flush()?;
                let Some(line) = lines.next() else {
                    break;
                };
                let line = line?;
                match line.trim() {
                    "" => continue,
                    "quit" => break,
                    "new" => {
                        engine.reset_session();
                        continue;
                    }
                    input => match Uci::from_str(input) {
                        Ok(Uci::Normal { from, to, promotion }) => {
                            match engine.attempt_move(from, to, promotion) {
                                AttemptOutcome::Committed(record) => println!("you play {record}"),
                                AttemptOutcome::Rejected(Rejection::Illegal) => {
                                    println!("illegal move");
                                    if let Some(selection) = engine.selection() {
                                        println!(
                                            "{} can go to {:?}",
                                            selection.square, selection.destinations
                                        );
                                    }
                                }
                                other => println!("{other:?}"),
                            }
                        }
                        _ => println!("enter a move like e2e4, or 'new' / 'quit'"),
                    },
                }
            }
        }
    }

    if let Some(status) = engine.status() {
        println!("status: {status:?}");
    }
    if let Some(record) = engine.game_record("White", "Black", "????.??.??") {
        println!("{}", record.to_json()?);
    }
    Ok(())
}

fn review(file: PathBuf, ply: isize) -> Result<()> {
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let input: ReviewInput = serde_json::from_str(&text).context("parsing review input")?;
    let replay = Replay::from_input(input)?;

    let board = replay.board_at_ply(ply);
    print_board(&board.position, board.highlighted.as_ref().map(|m| m.to));
    match (&board.ply, &board.highlighted) {
        (Some(ply), Some(m)) => {
            println!("ply {ply}: {m}");
            if let Some(annotation) = replay.annotations().get(*ply) {
                println!(
                    "{} - {}",
                    annotation.classification.label(),
                    annotation.explanation
                );
            }
        }
        _ => println!("initial position"),
    }

    let summary = replay.aggregate();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    for point in replay.evaluation_series() {
        println!("{:>4} {:+.2}", point.ply, point.evaluation);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            color,
            difficulty,
            two_player,
            retries,
        } => {
            let mut session_config = match config {
                Some(path) => SessionConfig::load(path)?,
                None => SessionConfig::default(),
            };
            if let Some(color) = color {
                session_config.human_color = color.into();
            }
            if let Some(difficulty) = difficulty {
                session_config.difficulty = difficulty;
            }
            if two_player {
                session_config.opponent = chess_session::OpponentKind::Human;
            }
            play(session_config, retries).await
        }
        Command::Review { file, ply } => review(file, ply),
    }
}
