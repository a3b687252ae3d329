pub mod approximator;
pub mod checkpoint;
pub mod chess;
pub mod codec;
pub mod cycle;
pub mod errors;
pub mod replay;
pub mod rewards;
pub mod seed;
pub mod selfplay;
pub mod validator;

/// dimensional analysis types
pub type Reward = f32;
pub type Loss = f32;
pub type Entropy = f32;
pub type Quality = f32;
pub type Performance = f32;

/// state/action space dimensions.
/// 12 piece planes x 64 squares, 64 en passant one-hot,
/// 4 castling rights, 1 side to move, 2 normalized clocks.
pub const FEATURES: usize = 839;
/// from-to move planes. promotions collapse to queen.
pub const ACTIONS: usize = 64 * 64;

// runner thresholds
pub const MAX_ILLEGAL_ACTIONS_PER_CYCLE: usize = 8;
pub const MAX_NONFINITE_UPDATES_PER_CYCLE: usize = 3;

// validator parameters
pub const LOSS_EXPLOSION_FACTOR: f32 = 5.0;
pub const TREND_EPSILON: f32 = 0.01;
pub const STABILITY_FLOOR: f32 = 0.3;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// initialize logging. terminal level comes from CHESSRL_LOG_LEVEL,
/// file logger always captures debug under logs/.
pub fn init() {
    let level = std::env::var("CHESSRL_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        level,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
