//! Sources of cycle triggers and shutdown requests

mod shutdown;
mod signals;
mod watch;

pub use shutdown::ShutdownCoordinator;
pub use signals::{dispatch, spawn_signal_listener, SignalType};
pub use watch::{is_relevant, DomainDirWatcher, WatchError};
