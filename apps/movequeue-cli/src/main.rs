use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec3;
use movequeue_common::{EntityId, Offset};
use movequeue_config::TypeData;
use movequeue_kernel::World;
use movequeue_pipeline::{
    DispatchReport, Dispatcher, EnqueueError, MergePolicy, PipelineConfig, UpdateCommand,
    UpdateQueue, UpdateSender,
};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "movequeue-cli", about = "Drive the deferred world-mutation pipeline")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML file whose `pipeline` table configures the dispatcher
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective pipeline configuration
    Info,
    /// Flood the queue from worker threads and check every command is accounted for
    Stress {
        /// Number of producer threads
        #[arg(short, long, default_value = "8")]
        producers: usize,
        /// Commands enqueued by each producer
        #[arg(short = 'n', long, default_value = "10000")]
        per_producer: usize,
        /// Override the configured merge policy (last_wins or compose)
        #[arg(long)]
        policy: Option<MergePolicy>,
    },
    /// Show how each merge policy resolves two moves of the same entity
    Demo,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_data(&TypeData::load(path).get_data_or_empty("pipeline")),
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("movequeue-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("merge policy: {}", config.merge_policy);
            match config.queue.capacity {
                Some(cap) => println!("queue capacity: {cap}"),
                None => println!("queue capacity: unbounded"),
            }
            println!("enqueue timeout: {:?}", config.queue.enqueue_timeout);
            println!("tick interval: {:?}", config.tick_interval);
        }
        Commands::Stress {
            producers,
            per_producer,
            policy,
        } => {
            let config = PipelineConfig {
                merge_policy: policy.unwrap_or(config.merge_policy),
                ..config
            };
            stress(&config, producers, per_producer)?;
        }
        Commands::Demo => {
            for policy in [MergePolicy::LastWins, MergePolicy::Compose] {
                let position = demo(policy)?;
                println!("{policy}: entity ends at {position}");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Default)]
struct Totals {
    drained: usize,
    duplicates: usize,
    superseded: usize,
    applied: usize,
    failed: usize,
}

impl Totals {
    fn add(&mut self, report: &DispatchReport) {
        self.drained += report.drained;
        self.duplicates += report.duplicates;
        self.superseded += report.superseded;
        self.applied += report.applied;
        self.failed += report.failures.len();
    }
}

fn enqueue_with_retry(sender: &UpdateSender, mut cmd: UpdateCommand) -> Result<(), EnqueueError> {
    loop {
        match sender.enqueue(cmd) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() => {
                cmd = err.into_command();
                thread::yield_now();
            }
            Err(err) => return Err(err),
        }
    }
}

/// Tick until `expected` commands are drained or every producer has
/// stopped and the tick after that has emptied the queue.
///
/// A producer that panics or gives up early never sends its share, so the
/// drained count alone cannot end the loop.
fn drain_until_done<T>(
    dispatcher: &mut Dispatcher<World>,
    interval: Duration,
    expected: usize,
    workers: &[JoinHandle<T>],
) -> Totals {
    let mut totals = Totals::default();
    let mut producers_done = false;
    dispatcher.run(interval, |world, report| {
        totals.add(report);
        world.flush_player_displacements();
        world.step();
        if totals.drained >= expected || producers_done {
            return false;
        }
        // Checked after the tick, so the next drain sees every finished send.
        producers_done = workers.iter().all(|w| w.is_finished());
        true
    });
    totals
}

fn stress(config: &PipelineConfig, producers: usize, per_producer: usize) -> anyhow::Result<()> {
    let expected = producers * per_producer;
    println!(
        "Stress: {producers} producers x {per_producer} commands, policy={}",
        config.merge_policy
    );

    let mut world = World::default();
    // Every fourth mover is a player, to exercise both relocation paths.
    let movers: Vec<(EntityId, bool)> = (0..producers)
        .map(|i| {
            let start = DVec3::new(i as f64 * 4.0, 64.0, 0.0);
            if i % 4 == 3 {
                (world.spawn_player(start), true)
            } else {
                (world.spawn(start), false)
            }
        })
        .collect();
    let mut dispatcher = Dispatcher::from_config(world, config);

    let workers: Vec<_> = movers
        .iter()
        .map(|&(entity, player)| {
            let sender = dispatcher.sender();
            thread::spawn(move || -> Result<(), EnqueueError> {
                for seq in 0..per_producer {
                    let offset = Offset::new(0.0, 0.0, 1.0e-3, seq as f32 * 1.0e-3, 0.0);
                    enqueue_with_retry(&sender, UpdateCommand::relocate(entity, player, offset))?;
                }
                Ok(())
            })
        })
        .collect();

    let totals = drain_until_done(&mut dispatcher, config.tick_interval, expected, &workers);

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?
            .context("producer could not enqueue")?;
    }

    let timer = dispatcher.timer();
    println!(
        "Ticks: {} (avg {:?}, max {:?}, {} over the {:?} budget)",
        dispatcher.ticks(),
        timer.average_elapsed(),
        timer.max_elapsed(),
        timer.overruns(),
        timer.budget()
    );
    println!(
        "Throughput: {:.1} drained, {:.1} applied per tick",
        timer.drained_per_tick(),
        timer.applied_per_tick()
    );
    println!(
        "Drained: {}, applied: {}, duplicates: {}, superseded: {}, failed: {}",
        totals.drained, totals.applied, totals.duplicates, totals.superseded, totals.failed
    );

    let accounted = totals.duplicates + totals.superseded + totals.applied + totals.failed;
    if totals.drained != expected || accounted != expected || !dispatcher.queue().is_empty() {
        anyhow::bail!("command accounting mismatch: expected {expected}, drained {}", totals.drained);
    }
    println!("Accounting: OK");
    Ok(())
}

fn demo(policy: MergePolicy) -> anyhow::Result<DVec3> {
    let mut world = World::default();
    let id = world.spawn(DVec3::ZERO);
    let mut dispatcher = Dispatcher::new(world, UpdateQueue::default(), policy);

    dispatcher
        .queue()
        .enqueue(UpdateCommand::relocate(id, false, Offset::translation(1.0, 0.0, 0.0)))?;
    dispatcher
        .queue()
        .enqueue(UpdateCommand::relocate(id, false, Offset::translation(0.0, 1.0, 0.0)))?;
    let report = dispatcher.tick();
    tracing::debug!(?report, "demo tick");

    let data = dispatcher
        .world()
        .get(id)
        .context("demo entity vanished")?;
    Ok(data.location.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher_with_mover() -> (Dispatcher<World>, EntityId) {
        let mut world = World::default();
        let id = world.spawn(DVec3::ZERO);
        (Dispatcher::new(world, UpdateQueue::default(), MergePolicy::Compose), id)
    }

    #[test]
    fn stress_loop_stops_once_everything_expected_is_drained() {
        let (mut dispatcher, id) = dispatcher_with_mover();
        let sender = dispatcher.sender();
        let worker = thread::spawn(move || {
            for _ in 0..4 {
                enqueue_with_retry(&sender, UpdateCommand::relocate(id, false, Offset::translation(1.0, 0.0, 0.0)))?;
            }
            Ok::<(), EnqueueError>(())
        });

        let workers = [worker];
        let totals = drain_until_done(&mut dispatcher, Duration::from_millis(1), 4, &workers);
        assert_eq!(totals.drained, 4);
        assert_eq!(dispatcher.world().get(id).map(|e| e.location.position), Some(DVec3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn stress_loop_ends_when_a_producer_dies_short() {
        let (mut dispatcher, id) = dispatcher_with_mover();
        let sender = dispatcher.sender();
        let worker = thread::spawn(move || {
            for _ in 0..3 {
                enqueue_with_retry(&sender, UpdateCommand::relocate(id, false, Offset::translation(0.0, 1.0, 0.0)))?;
            }
            // Bail out long before the promised share.
            Err::<(), _>(anyhow::anyhow!("producer gave up"))
        });

        let workers = [worker];
        let totals = drain_until_done(&mut dispatcher, Duration::from_millis(1), 1_000, &workers);
        assert_eq!(totals.drained, 3);
        assert!(dispatcher.queue().is_empty());

        let [worker] = workers;
        assert!(matches!(worker.join(), Ok(Err(_))));
    }
}
