use anyhow::Result;
use clap::{ArgAction, Parser};
use doom_a2c::modes::{TrainConfig, TrainMode};
use doom_a2c::rl::{AgentConfig, TrainingBackend, accelerator_available, default_device};
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "doom_a2c")]
#[command(version, about = "Train a convolutional A2C agent on a synthetic screen environment")]
struct Cli {
    /// Number of training episodes
    #[arg(long, default_value_t = 100)]
    episodes: usize,

    /// Maximum steps per episode
    #[arg(long, default_value_t = 1000)]
    max_steps: usize,

    /// Learn every N steps inside an episode (default: only at episode end)
    #[arg(long)]
    update_frequency: Option<usize>,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    learning_rate: f64,

    /// Agent configuration as JSON (screen size, action count, discount, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluation episodes after training
    #[arg(long, default_value_t = 5)]
    eval_episodes: usize,

    /// Screens per environment step (at least 2)
    #[arg(long, default_value_t = 2)]
    batch_size: usize,

    /// Steps before the synthetic environment ends an episode
    #[arg(long, default_value_t = 32)]
    episode_length: usize,

    /// Log progress every N episodes
    #[arg(long, default_value_t = 10)]
    log_frequency: usize,

    /// Run on the GPU backend (requires the `wgpu` feature)
    #[arg(long)]
    accelerator: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();
    info!("Logging initialized at level: {}", level);

    let mut config = TrainConfig::new(cli.episodes);
    config.max_steps = cli.max_steps;
    config.update_frequency = cli.update_frequency;
    config.learning_rate = cli.learning_rate;
    config.eval_episodes = cli.eval_episodes;
    config.log_frequency = cli.log_frequency;
    config.env.batch_size = cli.batch_size;
    config.env.episode_length = cli.episode_length;
    if let Some(path) = &cli.config {
        config.agent = AgentConfig::load(path)?;
        info!("Loaded agent config from {:?}", path);
    }

    if cli.accelerator {
        if accelerator_available() {
            return run_accelerated(config);
        }
        warn!("Built without the `wgpu` feature, falling back to the CPU backend");
    }

    TrainMode::<TrainingBackend>::new(config, default_device())?.run()
}

#[cfg(feature = "wgpu")]
fn run_accelerated(config: TrainConfig) -> Result<()> {
    use doom_a2c::rl::{AcceleratedBackend, accelerated_device};

    TrainMode::<AcceleratedBackend>::new(config, accelerated_device())?.run()
}

#[cfg(not(feature = "wgpu"))]
fn run_accelerated(config: TrainConfig) -> Result<()> {
    TrainMode::<TrainingBackend>::new(config, default_device())?.run()
}
