use std::{error::Error, path::PathBuf, time::Duration};

use clap::Parser;
use drone_rl::{
    algo::tabular::q_table::StepRecord,
    ds::QTable,
    gym::{DroneGrid, DroneGridConfig},
};
use log::info;

const MAX_STEPS: usize = 100;
const STEP_DELAY: Duration = Duration::from_millis(300);
const RESTART_DELAY: Duration = Duration::from_secs(3);

/// Replay a trained Q-table greedily, episode after episode
#[derive(Parser)]
#[command(name = "play", about = "Replay a trained drone navigation Q-table")]
struct Cli {
    /// Q-table written by `train`
    #[arg(default_value = "q_table.npy")]
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut env = DroneGrid::new(DroneGridConfig::default())?;
    let q_table = QTable::load(&cli.path, env.grid_size())?;

    run(&q_table, &mut env)
}

fn log_step(record: &StepRecord) {
    info!(
        "Step: {}, Action: {}, Position: {:?}, Reward: {:.1}",
        record.step,
        record.action,
        record.state.pos(),
        record.reward
    );
}

#[cfg(not(feature = "viz"))]
fn run(q_table: &QTable, env: &mut DroneGrid) -> Result<(), Box<dyn Error>> {
    use std::thread;

    use drone_rl::algo::tabular::q_table::play;

    tracing_subscriber::fmt::init();
    loop {
        let summary = play(q_table, env, MAX_STEPS, |record, _| {
            log_step(record);
            thread::sleep(STEP_DELAY);
        });
        info!("Episode complete! Total reward: {:.1}", summary.total_reward);
        info!("Restarting in {} seconds...", RESTART_DELAY.as_secs());
        thread::sleep(RESTART_DELAY);
    }
}

#[cfg(feature = "viz")]
fn run(q_table: &QTable, env: &mut DroneGrid) -> Result<(), Box<dyn Error>> {
    use drone_rl::{algo::tabular::q_table::play, viz::Viewer};

    tui_logger::init_logger(log::LevelFilter::Trace)?;
    tui_logger::set_default_level(log::LevelFilter::Info);

    let mut viewer = Viewer::new()?;
    while viewer.is_open() {
        let summary = play(q_table, env, MAX_STEPS, |record, env| {
            log_step(record);
            let status = format!(
                "Step {} | {} | {:?} | reward {:.1} | q to quit",
                record.step,
                record.action,
                record.state.pos(),
                record.reward
            );
            viewer.show(env, &status, STEP_DELAY);
        });
        info!("Episode complete! Total reward: {:.1}", summary.total_reward);
        info!("Restarting in {} seconds...", RESTART_DELAY.as_secs());
        viewer.show(env, "Episode complete | q to quit", RESTART_DELAY);
    }
    viewer.finish()?;
    Ok(())
}
