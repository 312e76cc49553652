//! Polling reconciler: the deliberate backstop for missed push events. On a
//! fixed interval it re-fetches the authoritative room snapshot and merges
//! it into the store. A fetch still in flight when the next tick fires is
//! dropped (supersede-in-flight), so an out-of-order response can never
//! land after a newer one. Transient failures are suppressed; only a
//! terminal "room not found" is reported.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use shared::model::Room;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::store::{RoomPatch, RoomStore};

type InFlight = Pin<Box<dyn Future<Output = Result<Room>> + Send>>;

/// Handle to the background polling loop; dropping it cancels the loop and
/// whatever fetch it had in flight.
pub struct Reconciler {
    task: JoinHandle<()>,
}

impl Reconciler {
    pub fn spawn(
        api: ApiClient,
        store: RoomStore,
        room_id: String,
        period: Duration,
        fatal: mpsc::Sender<ClientError>,
    ) -> Self {
        let task = tokio::spawn(run(api, store, room_id, period, fatal));
        Self { task }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    api: ApiClient,
    store: RoomStore,
    room_id: String,
    period: Duration,
    fatal: mpsc::Sender<ClientError>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the interval's immediate first fire; the session seeds the store
    // with an initial fetch before the reconciler starts.
    ticker.tick().await;

    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if in_flight.is_some() {
                    debug!(%room_id, "superseding still-pending room poll");
                }
                let api = api.clone();
                let id = room_id.clone();
                in_flight = Some(Box::pin(async move { api.fetch_room(&id).await }));
            }
            result = poll_in_flight(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                match result {
                    Ok(room) => {
                        store.apply(RoomPatch::snapshot(room));
                    }
                    Err(ClientError::RoomNotFound) => {
                        let _ = fatal.send(ClientError::RoomNotFound).await;
                        break;
                    }
                    Err(err) => {
                        // Retried implicitly by the next tick.
                        debug!(%room_id, %err, "room poll failed");
                    }
                }
            }
        }
    }
}

async fn poll_in_flight(in_flight: &mut Option<InFlight>) -> Result<Room> {
    match in_flight.as_mut() {
        Some(fetch) => fetch.await,
        // Guarded by the select precondition; never polled when empty.
        None => std::future::pending().await,
    }
}
