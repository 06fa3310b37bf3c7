//! Runs the sorting line: IR sensor, diverter and pusher servos, and grade commands from the
//! vision host arriving one per line on stdin (`GRADE_AA`, `GRADE_A`, `GRADE_B`,
//! `GRADE_INEDIBLE`).  Presence edges go back to the host on stdout as bare `OBJECT_DETECTED` /
//! `OBJECT_GONE` lines; logging stays on stderr.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use tokio::sync::mpsc;

use egg_sorter::config::SorterConfig;
use egg_sorter::controller::SortingController;
use egg_sorter::linux::stdin_command_source::StdinCommandSource;
use egg_sorter::sorter_hal_factory::SorterHalFactory;

#[derive(Parser, Debug)]
#[clap(name = "sorter")]
struct Opts {
    /// JSON file overriding timings, angles and pin assignments.
    #[clap(short, long)]
    config: Option<PathBuf>,

    #[clap(long)]
    fake_hw: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let opts: Opts = Opts::parse();

    let config = match &opts.config {
        Some(path) => SorterConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SorterConfig::default(),
    };
    let hal = SorterHalFactory::new_maybe_mock(opts.fake_hw).create_hal(&config.hardware)?;
    let commands = StdinCommandSource::spawn()?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let controller = SortingController::start(hal, Box::new(commands), events_tx, &config);
    tokio::spawn(async move {
        while let Some(edge) = events_rx.recv().await {
            println!("{}", edge.message());
        }
    });
    controller.run_forever().await?;
    Ok(())
}
