use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, OptionFuture};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use iboard_types::Idea;

use crate::api::IdeaApi;
use crate::error::ClientError;
use crate::snapshot::Snapshot;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Stop polling while the board is not visible.
    pub pause_on_hidden: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            pause_on_hidden: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Suspended,
}

#[derive(Debug, Clone, Copy)]
struct Control {
    enabled: bool,
    visible: bool,
    shutdown: bool,
}

impl Control {
    fn state(self, pause_on_hidden: bool) -> PollerState {
        match (self.enabled, self.visible || !pause_on_hidden) {
            (false, _) => PollerState::Idle,
            (true, true) => PollerState::Polling,
            (true, false) => PollerState::Suspended,
        }
    }
}

/// Controls a running poller task. The task starts disabled.
pub struct PollerHandle {
    control: watch::Sender<Control>,
    pause_on_hidden: bool,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn set_enabled(&self, enabled: bool) {
        self.control.send_modify(|c| c.enabled = enabled);
    }

    pub fn set_visible(&self, visible: bool) {
        self.control.send_modify(|c| c.visible = visible);
    }

    pub fn state(&self) -> PollerState {
        self.control.borrow().state(self.pause_on_hidden)
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.control.send_modify(|c| c.shutdown = true);
        if let Err(e) = self.task.await {
            warn!("Poller task ended abnormally: {}", e);
        }
    }
}

/// Spawn the snapshot poller. Each successful fetch is sent on `snapshots`;
/// the task ends when the receiver is dropped or the handle shuts it down.
pub fn spawn_poller<A: IdeaApi>(
    api: Arc<A>,
    config: PollerConfig,
    snapshots: mpsc::Sender<Snapshot>,
) -> PollerHandle {
    let (control, rx) = watch::channel(Control {
        enabled: false,
        visible: true,
        shutdown: false,
    });

    let task = tokio::spawn(run(api, config, rx, snapshots));

    PollerHandle {
        control,
        pause_on_hidden: config.pause_on_hidden,
        task,
    }
}

type Fetch = BoxFuture<'static, Result<Vec<Idea>, ClientError>>;

async fn run<A: IdeaApi>(
    api: Arc<A>,
    config: PollerConfig,
    mut control: watch::Receiver<Control>,
    snapshots: mpsc::Sender<Snapshot>,
) {
    let mut state = PollerState::Idle;
    let mut ticker: Option<Interval> = None;
    // At most one fetch outstanding; dropping it discards the response
    let mut in_flight: Option<Fetch> = None;

    loop {
        tokio::select! {
            changed = control.changed() => {
                if changed.is_err() {
                    break;
                }
                let ctl = *control.borrow_and_update();
                if ctl.shutdown {
                    break;
                }

                let next = ctl.state(config.pause_on_hidden);
                if next == state {
                    continue;
                }
                debug!("Poller {:?} -> {:?}", state, next);

                match next {
                    PollerState::Idle => {
                        ticker = None;
                        if in_flight.take().is_some() {
                            debug!("Discarding in-flight fetch");
                        }
                    }
                    PollerState::Suspended => ticker = None,
                    PollerState::Polling => {
                        ticker = Some(cadence(config.interval));
                        // A fetch started before the hide stands in for the
                        // restore fetch; its data may be up to one interval old
                        if state == PollerState::Suspended && in_flight.is_none() {
                            in_flight = Some(fetch(&api));
                        }
                    }
                }
                state = next;
            }

            _ = next_tick(&mut ticker) => {
                if in_flight.is_none() {
                    in_flight = Some(fetch(&api));
                } else {
                    debug!("Skipping tick, fetch still in flight");
                }
            }

            Some(result) = OptionFuture::from(in_flight.as_mut()) => {
                in_flight = None;
                match result {
                    Ok(ideas) => {
                        if snapshots.send(Snapshot::new(ideas)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Background poll failed: {}", e),
                }
            }

            _ = snapshots.closed() => break,
        }
    }

    info!("Poller stopped");
}

/// Ticks every `period`, first tick one period from now.
fn cadence(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn fetch<A: IdeaApi>(api: &Arc<A>) -> Fetch {
    let api = Arc::clone(api);
    async move { api.fetch_all().await }.boxed()
}
