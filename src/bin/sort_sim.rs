//! Dry-runs the whole controller against mock hardware:
//!
//! 1. Object arrives at the sensor and the controller announces `OBJECT_DETECTED`
//! 2. Vision host answers with a random grade (or, occasionally, garbage)
//! 3. Object rides the belt to the pusher and gets pushed
//! 4. Object leaves the sensor and the pusher retracts
//!
//! Time is simulated, so a few hundred objects take a moment rather than minutes.

use anyhow::anyhow;
use clap::Parser;
use env_logger::Env;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use egg_sorter::config::SorterConfig;
use egg_sorter::controller::SortingController;
use egg_sorter::grade::Grade;
use egg_sorter::presence_monitor::PresenceEdge;
use egg_sorter::sorter_hal::SensorState;
use egg_sorter::sorter_hal_mock::{MockCommandSource, MockSorterHal};

#[derive(Parser, Debug)]
#[clap(name = "sort_sim")]
struct Opts {
    #[clap(short = 'n', long, default_value = "20")]
    objects: usize,

    #[clap(long)]
    seed: Option<u64>,

    /// Chance that the vision host sends an unrecognised command instead of a grade.
    #[clap(long, default_value = "0.1")]
    garbage_ratio: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let opts: Opts = Opts::parse();
    if !(0.0..=1.0).contains(&opts.garbage_ratio) {
        return Err(anyhow!("--garbage-ratio must be within 0..=1"));
    }
    tokio::time::pause();

    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let config = SorterConfig::default();
    let mock = MockSorterHal::default();
    let commands = MockCommandSource::default();
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let controller =
        SortingController::start(mock.hal(), Box::new(commands.clone()), events_tx, &config);
    // The monitor's first sample is its baseline.
    sleep(config.timing.sensor_poll()).await;

    let mut sorted = [0usize; Grade::ALL.len()];
    let mut rejected = 0;
    for i in 0..opts.objects {
        mock.sensor.set(SensorState::Present);
        if events.recv().await != Some(PresenceEdge::Arrived) {
            return Err(anyhow!("#{i}: no OBJECT_DETECTED for arriving object"));
        }
        // Capture and classification on the host.
        sleep(Duration::from_millis(rng.gen_range(50..300))).await;

        let pushes_before = mock.pusher.angles().len();
        if rng.gen_bool(opts.garbage_ratio) {
            commands.push_line("GRADE_X");
            rejected += 1;
            println!("#{i}: garbage command, object left on the belt");
        } else {
            let index = rng.gen_range(0..Grade::ALL.len());
            let grade = Grade::ALL[index];
            commands.push_line(grade.command());
            sorted[index] += 1;

            sleep(config.timing.push_dwell() + Duration::from_millis(100)).await;
            let expected = config.diverter.angle_for(grade);
            if mock.diverter.angle() != Some(expected) {
                return Err(anyhow!("#{i}: diverter at {:?}, expected {expected} for {grade}",
                    mock.diverter.angle()));
            }
            if mock.pusher.angle() != Some(config.pusher.push) {
                return Err(anyhow!("#{i}: pusher never pushed for {grade}"));
            }
            println!("#{i}: {grade} -> diverter {expected}");
        }

        mock.sensor.set(SensorState::Absent);
        sleep(config.timing.retract_settle() + Duration::from_millis(rng.gen_range(100..400))).await;
        if mock.pusher.angle() != Some(config.pusher.idle) {
            return Err(anyhow!("#{i}: pusher did not retract"));
        }
        if !matches!(events.try_recv(), Ok(PresenceEdge::Departed)) {
            return Err(anyhow!("#{i}: no OBJECT_GONE after departure"));
        }
        if mock.pusher.angles().len() == pushes_before {
            return Err(anyhow!("#{i}: no retract recorded"));
        }
    }
    controller.shutdown().await;

    println!();
    for (grade, count) in Grade::ALL.iter().zip(sorted) {
        println!("{grade}: {count}");
    }
    println!("rejected: {rejected}");
    println!("diverter moves: {}, pusher moves: {}", mock.diverter.angles().len(), mock.pusher.angles().len());
    Ok(())
}
