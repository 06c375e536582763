use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::Event;
use crate::queue::ChangeKind;

/// What an upstream watch produces: event changes, plus a marker that the
/// initial list has been fully replayed.
#[derive(Debug, Clone)]
pub enum Notification {
    /// The initial list is done; everything from here on is live.
    Synced,
    Apply(ChangeKind, Event),
}

/// Upstream boundary of the controller. An implementation lists the
/// current events for a namespace (`""` = all namespaces), replays them
/// as `Apply(Added, ..)`, sends `Synced`, and then streams live changes
/// until the token cancels or the source closes the channel.
pub trait ListerWatcher: Send + Sync + 'static {
    fn watch(
        &self,
        namespace: &str,
        token: CancellationToken,
    ) -> impl std::future::Future<Output = Result<mpsc::Receiver<Notification>>> + Send;
}
