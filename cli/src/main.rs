//! # Merge Puzzle CLI
//!
//! Terminal host for the rules engine: play interactively, or run headless
//! seeded simulations with a simple policy and print summary statistics.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use merge_2048_core::{Action, Game};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(name = "merge-2048")]
#[command(author, version, about = "Play the 4x4 merge puzzle in the terminal or run simulations")]
struct Args {
    /// Run in interactive mode (default if no other mode specified)
    #[arg(short, long)]
    interactive: bool,

    /// Number of episodes to run in headless mode
    #[arg(short, long)]
    episodes: Option<u32>,

    /// Random seed for deterministic runs
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Maximum steps per episode (0 = unlimited)
    #[arg(short, long, default_value = "10000")]
    max_steps: u32,

    /// Policy for headless mode
    #[arg(short, long, value_enum, default_value = "random")]
    policy: Policy,

    /// Show board after each move in headless mode
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Random legal moves
    Random,
    /// Cycle through actions: Left, Down, Right, Up
    Cycle,
}

const CONTROLS: &str = "Controls: WASD or Arrow Keys | Q to quit | R to restart\n";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    debug!("{:?}", args);

    match args.episodes {
        Some(episodes) if !args.interactive => run_headless(&args, episodes),
        _ => run_interactive(&args),
    }
}

/// Run interactive mode where the user plays with the keyboard.
fn run_interactive(args: &Args) {
    enable_raw_mode();

    let mut game = Game::new(args.seed);
    redraw(&game);
    play(&mut game, io::stdin().lock());

    disable_raw_mode();
}

/// Apply keys read from `input` until the player quits or the input ends.
fn play<R: Rng, I: Read>(game: &mut Game<R>, mut input: I) {
    let mut buffer = [0u8; 3];

    loop {
        let bytes_read = match input.read(&mut buffer) {
            Ok(0) => {
                debug!("input closed");
                break;
            }
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("failed to read input: {}", err);
                break;
            }
        };

        match parse_input(&buffer[..bytes_read]) {
            InputAction::Move(dir) => {
                if game.is_finished() {
                    continue;
                }
                let before = game.score();
                match game.next(dir) {
                    Ok(_) => {
                        redraw(game);
                        let gained = game.score() - before;
                        if gained > 0 {
                            println!("  +{} points!", gained);
                        }
                    }
                    Err(err) => {
                        redraw(game);
                        println!("  {}", err);
                    }
                }

                if game.is_finished() {
                    println!("\n  *** GAME OVER ***");
                    println!("  Final Score: {}", game.score());
                    println!("  Max Tile: {}", game.board().max_tile());
                    println!("\n  Press R to restart or Q to quit");
                }
            }
            InputAction::Restart => {
                game.reset();
                redraw(game);
            }
            InputAction::Quit => {
                println!("\nGoodbye!");
                break;
            }
            InputAction::None => {}
        }
    }
}

/// Run headless simulation mode.
fn run_headless(args: &Args, episodes: u32) {
    if episodes == 0 {
        println!("episodes=0");
        return;
    }

    let mut total_score: u64 = 0;
    let mut max_tile_overall: u64 = 0;
    let mut scores: Vec<u64> = Vec::with_capacity(episodes as usize);
    let mut tile_counts: BTreeMap<u64, u32> = BTreeMap::new();

    // Separate stream for action selection so spawns stay reproducible
    let mut action_rng = SmallRng::seed_from_u64(args.seed.wrapping_add(1000));

    for episode in 0..episodes {
        let episode_seed = args.seed.wrapping_add(episode as u64);
        let mut game = Game::new(episode_seed);
        let mut steps = 0;
        let mut action_cycle = 0;

        while args.max_steps == 0 || steps < args.max_steps {
            let action = match args.policy {
                Policy::Random => select_random_action(game.possible_moves(), &mut action_rng),
                Policy::Cycle => select_cycle_action(game.possible_moves(), &mut action_cycle),
            };

            // no legal action left
            let Some(act) = action else { break };
            let result = game.step(act);
            steps += 1;

            if args.verbose {
                println!("Episode {} Step {}: {} (+{})", episode + 1, steps, act, result.reward);
                print!("{}", game.board());
            }
            if result.done {
                break;
            }
        }

        let score = game.score();
        let max_tile = game.board().max_tile();
        info!(
            "episode {} finished: score={} max_tile={} steps={}",
            episode + 1,
            score,
            max_tile,
            steps
        );

        scores.push(score);
        *tile_counts.entry(max_tile).or_insert(0) += 1;
        total_score += score;
        max_tile_overall = max_tile_overall.max(max_tile);
    }

    let avg_score = total_score as f64 / episodes as f64;
    scores.sort_unstable();
    let mid = scores.len() / 2;
    let median_score = if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) as f64 / 2.0
    } else {
        scores[mid] as f64
    };

    // Output results in parseable format
    println!("=== Simulation Results ===");
    println!("episodes={}", episodes);
    println!("policy={:?}", args.policy);
    println!("seed={}", args.seed);
    println!("max_steps={}", args.max_steps);
    println!("avg_score={:.2}", avg_score);
    println!("median_score={:.2}", median_score);
    println!("min_score={}", scores.first().copied().unwrap_or(0));
    println!("max_score={}", scores.last().copied().unwrap_or(0));
    println!("max_tile_overall={}", max_tile_overall);

    let distribution: Vec<String> = tile_counts
        .iter()
        .map(|(tile, count)| format!("{}:{}", tile, count))
        .collect();
    println!("tile_distribution={}", distribution.join(","));
}

/// Select a random legal action.
fn select_random_action<R: Rng>(legal: &[Action], rng: &mut R) -> Option<Action> {
    if legal.is_empty() {
        None
    } else {
        Some(legal[rng.gen_range(0..legal.len())])
    }
}

/// Select action in a cycle: Left, Down, Right, Up.
fn select_cycle_action(legal: &[Action], cycle: &mut usize) -> Option<Action> {
    let order = [Action::Left, Action::Down, Action::Right, Action::Up];

    // Try actions in cycle order, starting from current position
    for _ in 0..order.len() {
        let action = order[*cycle % order.len()];
        *cycle += 1;
        if legal.contains(&action) {
            return Some(action);
        }
    }

    None
}

enum InputAction {
    Move(Action),
    Restart,
    Quit,
    None,
}

fn parse_input(bytes: &[u8]) -> InputAction {
    match bytes {
        // Arrow keys (escape sequences)
        [27, 91, 65] => InputAction::Move(Action::Up),
        [27, 91, 66] => InputAction::Move(Action::Down),
        [27, 91, 67] => InputAction::Move(Action::Right),
        [27, 91, 68] => InputAction::Move(Action::Left),

        // Control keys: q, Ctrl+C, Esc
        [b'q'] | [b'Q'] | [3] | [27] => InputAction::Quit,
        [b'r'] | [b'R'] => InputAction::Restart,

        // WASD keys
        [key] => match std::str::from_utf8(&[*key]).ok().map(str::parse::<Action>) {
            Some(Ok(action)) => InputAction::Move(action),
            _ => InputAction::None,
        },

        _ => InputAction::None,
    }
}

fn redraw<R: Rng>(game: &Game<R>) {
    print!("\x1b[2J\x1b[H"); // Clear screen
    println!("=== 2048 ===");
    println!("{}", CONTROLS);
    println!("Score: {}", game.score());
    print!("{}", game.board());
    let moves: Vec<String> = game.possible_moves().iter().map(Action::to_string).collect();
    println!("Moves: {}", moves.join(" "));
    io::stdout().flush().ok();
}

// Platform-specific terminal raw mode handling

/// Local flags for single-key input. Ctrl+C arrives as a key instead of SIGINT
/// so quitting always restores the terminal.
#[cfg(unix)]
fn raw_lflag(lflag: libc::tcflag_t) -> libc::tcflag_t {
    lflag & !(libc::ICANON | libc::ECHO | libc::ISIG)
}

#[cfg(unix)]
fn cooked_lflag(lflag: libc::tcflag_t) -> libc::tcflag_t {
    lflag | libc::ICANON | libc::ECHO | libc::ISIG
}

#[cfg(unix)]
fn enable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag = raw_lflag(termios.c_lflag);
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(unix)]
fn disable_raw_mode() {
    use std::os::unix::io::AsRawFd;
    unsafe {
        let fd = io::stdin().as_raw_fd();
        let mut termios: libc::termios = std::mem::zeroed();
        libc::tcgetattr(fd, &mut termios);
        termios.c_lflag = cooked_lflag(termios.c_lflag);
        libc::tcsetattr(fd, libc::TCSANOW, &termios);
    }
}

#[cfg(not(unix))]
fn enable_raw_mode() {
    // Without raw mode each key needs Enter
}

#[cfg(not(unix))]
fn disable_raw_mode() {}
