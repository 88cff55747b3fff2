//! One complete collection session
//!
//! Login, subscribe, poll until the deadline or cancellation, then tear down.
//! Teardown runs on every path out of [`run_session`], including a rejected
//! login or subscription.

use neo_api::{Credential, NeoClient, SubscriptionRequestSpec};
use neo_transport::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PollingConfig;
use crate::polling::{run_polling_loop, PollingSummary};
use crate::sink::EventSink;
use crate::Result;

/// Run a full session against the client's device
///
/// Login and subscription failures are returned after teardown has run. Poll
/// failures are only counted in the summary.
pub async fn run_session<T, K>(
    client: &mut NeoClient<T>,
    credential: &Credential,
    spec: SubscriptionRequestSpec,
    polling: &PollingConfig,
    sink: &mut K,
    cancel: &CancellationToken,
) -> Result<PollingSummary>
where
    T: Transport,
    K: EventSink + ?Sized,
{
    polling.validate()?;

    let result = collect(client, credential, spec, polling, sink, cancel).await;
    client.teardown().await;

    match &result {
        Ok(summary) => info!(
            ticks = summary.ticks,
            events = summary.events_delivered,
            reason = %summary.stop_reason,
            "Session complete"
        ),
        Err(e) => warn!(error = %e, "Session ended early"),
    }
    result
}

async fn collect<T, K>(
    client: &mut NeoClient<T>,
    credential: &Credential,
    spec: SubscriptionRequestSpec,
    polling: &PollingConfig,
    sink: &mut K,
    cancel: &CancellationToken,
) -> Result<PollingSummary>
where
    T: Transport,
    K: EventSink + ?Sized,
{
    let session = client.login(credential).await?;
    let activity_timeout = session.activity_timeout();
    if !activity_timeout.is_zero() && polling.interval >= activity_timeout {
        warn!(
            interval_ms = polling.interval.as_millis() as u64,
            activity_timeout_ms = session.activity_timeout_ms,
            "Polling interval is not shorter than the session activity timeout"
        );
    }

    client.subscribe(spec).await?;
    run_polling_loop(client, sink, polling, cancel).await
}
