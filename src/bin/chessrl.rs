//! Training CLI
//!
//! `chessrl train --cycles N [--seed S] [--config path]`
//! `chessrl eval --checkpoint id [--games N]`
//! `chessrl play [--checkpoint id]`

use chessrl::cycle;
use chessrl::cycle::Config;
use chessrl::errors::ChessError;
use clap::Parser;
use clap::Subcommand;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chessrl", about = "self-play training cycle for chess")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// run the training cycle loop
    Train {
        #[arg(long)]
        cycles: u64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// evaluate a checkpoint against the fresh baseline
    Eval {
        #[arg(long)]
        checkpoint: String,
        #[arg(long, default_value_t = 8)]
        games: u64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// play a checkpoint interactively
    Play {
        #[arg(long)]
        checkpoint: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    chessrl::init();
    let cli = Cli::parse();
    std::process::exit(match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            match e {
                ChessError::ConfigInvalid(_) => 2,
                ChessError::CheckpointValidationFailed { .. }
                | ChessError::CheckpointFormatMismatch { .. } => 1,
                _ => 3,
            }
        }
    });
}

fn run(cli: Cli) -> Result<i32, ChessError> {
    match cli.command {
        Command::Train {
            cycles,
            seed,
            config,
        } => {
            let mut config = load(config)?;
            if let Some(seed) = seed {
                config.master_seed = seed;
            }
            let report = cycle::train(config, cycles)?;
            log::info!(
                "finished: {} cycles, {} games, {} updates, stop {:?}",
                report.completed_cycles,
                report.final_metrics.total_games,
                report.final_metrics.total_updates,
                report.stop_reason
            );
            for issue in report.issues.iter() {
                log::warn!("issue: {}", issue);
            }
            Ok(match report.stop_reason {
                cycle::StopReason::Failed => 3,
                _ => 0,
            })
        }
        Command::Eval {
            checkpoint,
            games,
            config,
        } => {
            let config = load(config)?;
            let stats = cycle::evaluate(config, &checkpoint, games)?;
            log::info!(
                "{}: {} games, {}W/{}D/{}L, performance {:.3}",
                checkpoint,
                stats.games,
                stats.wins,
                stats.draws,
                stats.losses,
                stats.performance
            );
            Ok(0)
        }
        Command::Play { checkpoint, config } => {
            let config = load(config)?;
            let mut session = cycle::PlaySession::new(config, checkpoint.as_deref())?;
            play_loop(&mut session);
            Ok(0)
        }
    }
}

fn load(path: Option<PathBuf>) -> Result<Config, ChessError> {
    let mut config = match path {
        Some(path) => Config::load(&path)?,
        None => Config::new(),
    };
    config.apply_env()?;
    Ok(config)
}

/// stdin loop: long algebraic in, engine reply out
fn play_loop(session: &mut cycle::PlaySession) {
    println!("{}", session.board().fen());
    loop {
        let ref mut input = String::new();
        print!("> ");
        std::io::stdout().flush().ok();
        if std::io::stdin().read_line(input).is_err() {
            break;
        }
        match input.trim() {
            "quit" | "exit" => break,
            "" => continue,
            mv => match session.step(mv) {
                Err(e) => eprintln!("{}", e),
                Ok(reply) => {
                    if let Some(engine) = reply.engine_move {
                        println!("engine: {}", engine);
                    }
                    println!("{}", reply.fen);
                    if reply.status.is_terminal() {
                        println!("game over: {}", reply.status);
                        break;
                    }
                }
            },
        }
    }
}
