//! Progress propagation over two channels.
//!
//! Every job change is published as a [`ProgressEvent`] on a push channel
//! and is also visible through point-in-time snapshots. Push can drop, lag
//! or reconnect, so consumers merge both channels with [`MergedView`]:
//! last writer wins by the snapshot's `updated_at`, and a terminal status
//! freezes the view.
//!
//! - [`ProgressBroadcaster`]: per-job push channels
//! - [`ProgressTransport`]: `subscribe` + `snapshot`, with an in-process
//!   implementation in [`LocalProgressTransport`]
//! - [`subscribe_with_retry`]: bounded retry over the submit/subscribe race
//! - [`ProgressObserver`]: merged push/poll view for one subscriber

mod broadcaster;
mod config;
mod observer;
mod reconcile;
mod transport;
mod types;

pub use broadcaster::ProgressBroadcaster;
pub use config::ProgressConfig;
pub use observer::ProgressObserver;
pub use reconcile::{subscribe_with_retry, MergedView};
pub use transport::{LocalProgressTransport, ProgressStream, ProgressTransport};
pub use types::{ProgressError, ProgressEvent, ProgressKind};
