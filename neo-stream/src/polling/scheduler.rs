//! Fixed-interval polling loop with a deadline and cancellation
//!
//! The loop selects over three events, in priority order: the deadline, the
//! cancellation token, and the next tick. A poll that is already running is
//! always allowed to finish. Handing its result to the sink is raced against
//! the deadline and the token, so a sink that stops accepting events cannot
//! hold the loop past either.

use std::fmt;
use std::time::Duration;

use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::EventSource;
use crate::config::PollingConfig;
use crate::sink::EventSink;
use crate::Result;

/// Why the polling loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The maximum polling duration elapsed
    Expired,
    /// The cancellation token fired
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Expired => f.write_str("expired"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What a polling run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSummary {
    /// Polls attempted
    pub ticks: u64,
    /// Polls that returned an error
    pub failed_polls: u64,
    /// Events handed to the sink
    pub events_delivered: u64,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

/// Poll `source` every `config.interval` until `config.max_duration` passes or
/// `cancel` fires
///
/// The first poll happens immediately. If the deadline and a tick are due at
/// the same instant the loop stops without polling. Poll and sink failures are
/// logged and counted; they never end the loop. A delivery still pending when
/// the loop stops is abandoned and its events are not counted.
///
/// Returns a configuration error, before polling anything, if either duration
/// is zero.
pub async fn run_polling_loop<S, K>(
    source: &mut S,
    sink: &mut K,
    config: &PollingConfig,
    cancel: &CancellationToken,
) -> Result<PollingSummary>
where
    S: EventSource + ?Sized,
    K: EventSink + ?Sized,
{
    config.validate()?;

    let started = Instant::now();
    let deadline = sleep_until(started + config.max_duration);
    tokio::pin!(deadline);

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks = 0u64;
    let mut failed_polls = 0u64;
    let mut events_delivered = 0u64;

    info!(
        interval_ms = config.interval.as_millis() as u64,
        max_duration_ms = config.max_duration.as_millis() as u64,
        "Starting polling loop"
    );

    let stop_reason = loop {
        tokio::select! {
            biased;

            _ = &mut deadline => break StopReason::Expired,
            _ = cancel.cancelled() => break StopReason::Cancelled,
            _ = ticker.tick() => {
                ticks += 1;

                match source.poll_events().await {
                    Ok(envelope) => {
                        if envelope.pending_events > 0 {
                            debug!(tick = ticks, pending = envelope.pending_events, "Device still has buffered events");
                        }

                        let interrupted = tokio::select! {
                            biased;

                            result = sink.deliver(&envelope) => {
                                events_delivered += envelope.len() as u64;
                                if let Err(e) = result {
                                    warn!(tick = ticks, error = %e, "Event sink failed");
                                }
                                None
                            }
                            _ = &mut deadline => Some(StopReason::Expired),
                            _ = cancel.cancelled() => Some(StopReason::Cancelled),
                        };

                        if let Some(reason) = interrupted {
                            warn!(
                                tick = ticks,
                                events = envelope.len(),
                                reason = %reason,
                                "Abandoned delivery to a blocked event sink"
                            );
                            break reason;
                        }
                    }
                    Err(e) => {
                        failed_polls += 1;
                        warn!(tick = ticks, error = %e, "Poll failed");
                    }
                }
            }
        }
    };

    let summary = PollingSummary {
        ticks,
        failed_polls,
        events_delivered,
        stop_reason,
        elapsed: started.elapsed(),
    };

    info!(
        ticks = summary.ticks,
        failed_polls = summary.failed_polls,
        events = summary.events_delivered,
        reason = %summary.stop_reason,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Polling loop stopped"
    );

    Ok(summary)
}
