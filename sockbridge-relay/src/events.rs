use std::net::SocketAddr;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Observation-only notifications emitted by the relay. Subscribers must not
/// call back into the core from a handler; they receive values over a
/// broadcast channel and consume them on their own schedule.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    ClientAccepted { peer: SocketAddr },
    UpstreamConnected { upstream: SocketAddr },
    Log { message: String },
}

pub type RelayEvents = BroadcastStream<RelayEvent>;

const EVENT_CAPACITY: usize = 1024;

pub(crate) fn event_channel() -> (broadcast::Sender<RelayEvent>, RelayEvents) {
    let (sender, receiver) = broadcast::channel(EVENT_CAPACITY);
    (sender, BroadcastStream::new(receiver))
}
