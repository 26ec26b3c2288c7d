//! Host event loop: turns start-up, device messages and clock ticks into
//! independent relay cycles.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::{io::AsyncBufRead, io::AsyncBufReadExt, task::JoinSet, time::Instant};

use crate::{
    model::Trigger,
    relay::{CycleOutcome, Relay},
};

/// Refresh interval the watch firmware uses.
pub const DEFAULT_EVERY_MINUTES: u32 = 15;

/// Wall-clock aligned refresh schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every_minutes: u32,
}

impl Schedule {
    pub fn every_minutes(every_minutes: u32) -> Result<Self> {
        if every_minutes == 0 {
            return Err(anyhow!("Refresh interval must be at least one minute"));
        }
        Ok(Self { every_minutes })
    }

    fn until_next(&self, now: DateTime<Utc>) -> Duration {
        (next_aligned_tick(now, self.every_minutes) - now).to_std().unwrap_or_default()
    }

    fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.every_minutes) * 60)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self { every_minutes: DEFAULT_EVERY_MINUTES }
    }
}

/// First instant strictly after `now` whose epoch minute is a multiple of
/// `every_minutes`. With 15 that is :00, :15, :30 and :45 of every hour.
pub fn next_aligned_tick(now: DateTime<Utc>, every_minutes: u32) -> DateTime<Utc> {
    let period = i64::from(every_minutes.max(1)) * 60;
    let next = (now.timestamp().div_euclid(period) + 1) * period;
    DateTime::from_timestamp(next, 0).unwrap_or(now + TimeDelta::seconds(period))
}

/// Runs cycles until `inbox` closes, then waits for the ones still running.
///
/// One `Ready` cycle fires immediately. Every line read from `inbox` fires a
/// `DeviceMessage` cycle, its content is ignored. Cycles are not ordered or
/// deduplicated.
pub async fn run_event_loop<R>(
    relay: Arc<Relay>,
    inbox: R,
    schedule: Option<Schedule>,
) -> Result<Vec<CycleOutcome>>
where
    R: AsyncBufRead + Unpin,
{
    run_event_loop_from(relay, inbox, schedule, Utc::now()).await
}

/// The wall clock is read once, at `now`, to place the first tick. Later
/// ticks follow on the runtime clock, one period apart.
async fn run_event_loop_from<R>(
    relay: Arc<Relay>,
    inbox: R,
    schedule: Option<Schedule>,
    now: DateTime<Utc>,
) -> Result<Vec<CycleOutcome>>
where
    R: AsyncBufRead + Unpin,
{
    let mut tasks = JoinSet::new();
    let mut outcomes = Vec::new();
    let mut lines = inbox.lines();

    let mut next_tick = schedule.map(|s| {
        tracing::info!(
            every_minutes = s.every_minutes,
            next = %next_aligned_tick(now, s.every_minutes),
            "scheduled refresh enabled"
        );
        (Instant::now() + s.until_next(now), s.period())
    });

    spawn_cycle(&mut tasks, &relay, Trigger::Ready);

    loop {
        let tick = async {
            match next_tick {
                Some((deadline, _)) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read device inbox")? {
                    Some(_) => {
                        tracing::info!("device message received");
                        spawn_cycle(&mut tasks, &relay, Trigger::DeviceMessage);
                    }
                    None => {
                        tracing::debug!("device inbox closed");
                        break;
                    }
                }
            }
            () = tick => {
                if let Some((deadline, period)) = next_tick.as_mut() {
                    *deadline += *period;
                }
                spawn_cycle(&mut tasks, &relay, Trigger::Tick);
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                collect(&mut outcomes, joined);
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        collect(&mut outcomes, joined);
    }

    Ok(outcomes)
}

fn spawn_cycle(tasks: &mut JoinSet<CycleOutcome>, relay: &Arc<Relay>, trigger: Trigger) {
    let relay = Arc::clone(relay);
    tasks.spawn(async move { relay.run_cycle(trigger).await });
}

fn collect(
    outcomes: &mut Vec<CycleOutcome>,
    joined: Result<CycleOutcome, tokio::task::JoinError>,
) {
    match joined {
        Ok(outcome) => outcomes.push(outcome),
        Err(e) => tracing::error!("relay cycle aborted: {e}"),
    }
}
