use std::{error::Error, path::PathBuf};

use clap::Parser;
use drone_rl::{
    algo::tabular::q_table::{QTableAgent, QTableAgentConfig, TrainConfig},
    gym::{DroneGrid, DroneGridConfig},
};
use log::info;

/// Train a Q-learning agent to fly the drone to its target
#[derive(Parser)]
#[command(name = "train", about = "Train the drone navigation Q-table")]
struct Cli {
    /// Where to write the trained Q-table
    #[arg(default_value = "q_table.npy")]
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut env = DroneGrid::new(DroneGridConfig::default())?;
    let mut agent = QTableAgent::new(env.grid_size(), QTableAgentConfig::default());
    let config = TrainConfig::default();

    run(&mut agent, &mut env, &config)?;

    agent.q_table().save(&cli.path)?;
    info!("Saved Q-table to {}", cli.path.display());
    Ok(())
}

#[cfg(not(feature = "viz"))]
fn run(
    agent: &mut QTableAgent,
    env: &mut DroneGrid,
    config: &TrainConfig,
) -> Result<(), Box<dyn Error>> {
    use drone_rl::algo::tabular::q_table::train;

    tracing_subscriber::fmt::init();
    train(agent, env, config, |_, _, _| {});
    Ok(())
}

/// Trains while drawing every `log_every`-th episode, as the headless run logs it
#[cfg(feature = "viz")]
fn run(
    agent: &mut QTableAgent,
    env: &mut DroneGrid,
    config: &TrainConfig,
) -> Result<(), Box<dyn Error>> {
    use std::time::Duration;

    use drone_rl::{algo::tabular::q_table::train, viz::Viewer};

    const RENDER_DELAY: Duration = Duration::from_millis(100);

    tui_logger::init_logger(log::LevelFilter::Trace)?;
    tui_logger::set_default_level(log::LevelFilter::Info);

    let mut viewer = Viewer::new()?;
    let log_every = config.log_every.max(1);
    train(agent, env, config, |episode, record, env| {
        if episode % log_every == 0 {
            let status = format!(
                "Episode {episode} | step {} | {} | reward {:.2} | q to stop drawing",
                record.step, record.action, record.reward
            );
            viewer.show(env, &status, RENDER_DELAY);
        }
    });
    viewer.finish()?;
    Ok(())
}
