use crate::command::UpdateCommand;
use crate::config::PipelineConfig;
use crate::merge::{MergePolicy, resolve};
use crate::queue::{UpdateQueue, UpdateSender};
use crate::stats::{TickSample, TickTimer};
use movequeue_common::{AccessError, WorldAccess};
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

const TIMER_WINDOW: usize = 100;

/// A command whose application failed, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedUpdate {
    pub command: UpdateCommand,
    pub error: AccessError,
}

/// What happened to one drained batch.
///
/// `drained == duplicates + superseded + applied + failures.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub tick: u64,
    pub drained: usize,
    pub duplicates: usize,
    pub superseded: usize,
    pub applied: usize,
    pub failures: Vec<FailedUpdate>,
    pub elapsed: Duration,
}

impl DispatchReport {
    /// Commands that never reached the world because of dedup or merging.
    pub fn dropped(&self) -> usize {
        self.duplicates + self.superseded
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The consumer end of the pipeline. Owns the world facade.
///
/// A dispatcher is pinned to the thread that created it: it is `!Send`,
/// and each tick asserts (in debug builds) that it runs on that thread.
/// Producers on other threads talk to it only through [`UpdateSender`].
pub struct Dispatcher<W: WorldAccess> {
    world: W,
    queue: UpdateQueue,
    policy: MergePolicy,
    owner: ThreadId,
    ticks: u64,
    timer: TickTimer,
    _pinned: PhantomData<*const ()>,
}

impl<W: WorldAccess> Dispatcher<W> {
    pub fn new(world: W, queue: UpdateQueue, policy: MergePolicy) -> Self {
        Self {
            world,
            queue,
            policy,
            owner: thread::current().id(),
            ticks: 0,
            timer: TickTimer::new(PipelineConfig::default().tick_interval, TIMER_WINDOW),
            _pinned: PhantomData,
        }
    }

    /// Build the queue from `config` and attach it to a new dispatcher
    /// whose tick budget is the configured tick interval.
    pub fn from_config(world: W, config: &PipelineConfig) -> Self {
        let mut dispatcher =
            Self::new(world, UpdateQueue::new(config.queue.clone()), config.merge_policy);
        dispatcher.timer = TickTimer::new(config.tick_interval, TIMER_WINDOW);
        dispatcher
    }

    /// A producer handle for worker threads.
    pub fn sender(&self) -> UpdateSender {
        self.queue.sender()
    }

    /// Drain the queue and apply every surviving command.
    ///
    /// Individual failures are logged and recorded in the report; they never
    /// abort the batch.
    pub fn tick(&mut self) -> DispatchReport {
        self.assert_owner_thread();
        self.ticks += 1;
        let _span = tracing::info_span!("dispatch_tick", tick = self.ticks).entered();
        let started = Instant::now();

        let batch = self.queue.drain_all();
        let drained = batch.len();
        let resolved = resolve(batch, self.policy);
        tracing::debug!(
            drained,
            duplicates = resolved.duplicates,
            superseded = resolved.superseded,
            policy = %self.policy,
            "batch resolved"
        );

        let mut applied = 0;
        let mut failures = Vec::new();
        for command in resolved.commands {
            match command.apply(&mut self.world) {
                Ok(()) => {
                    tracing::trace!(?command, "update applied");
                    applied += 1;
                }
                Err(error) => {
                    tracing::warn!(?command, %error, "update command failed");
                    failures.push(FailedUpdate { command, error });
                }
            }
        }

        let elapsed = started.elapsed();
        let overran = self.timer.record(TickSample {
            elapsed,
            drained,
            applied,
        });
        if overran {
            tracing::warn!(?elapsed, budget = ?self.timer.budget(), "dispatch tick over budget");
        }
        DispatchReport {
            tick: self.ticks,
            drained,
            duplicates: resolved.duplicates,
            superseded: resolved.superseded,
            applied,
            failures,
            elapsed,
        }
    }

    /// Tick at a fixed cadence until `keep_going` returns false.
    ///
    /// `keep_going` runs after every tick with the world and that tick's
    /// report, which is where the host performs its own per-tick work.
    pub fn run(
        &mut self,
        interval: Duration,
        mut keep_going: impl FnMut(&mut W, &DispatchReport) -> bool,
    ) {
        loop {
            let started = Instant::now();
            let report = self.tick();
            if !keep_going(&mut self.world, &report) {
                break;
            }
            let spent = started.elapsed();
            if spent < interval {
                thread::sleep(interval - spent);
            } else {
                tracing::debug!(?spent, ?interval, "tick overran its interval");
            }
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn into_world(self) -> W {
        self.world
    }

    pub fn queue(&self) -> &UpdateQueue {
        &self.queue
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    fn assert_owner_thread(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "world mutation attempted off the dispatcher's owning thread"
        );
    }
}
