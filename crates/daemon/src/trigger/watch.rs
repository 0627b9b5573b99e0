//! Domain directory watching
//!
//! Changes to YAML descriptors in the domain directory request a cycle. The
//! watcher is non-recursive, like the directory loader.

use std::path::{Path, PathBuf};

use certkeeper_common::is_yaml_path;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::renewal::{Trigger, TriggerSender};

/// The watcher could not be started
#[derive(Debug, Error)]
#[error("failed to watch {path}: {source}")]
pub struct WatchError {
    path: PathBuf,
    #[source]
    source: notify::Error,
}

/// Whether a filesystem event should trigger a cycle
pub fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|path| is_yaml_path(path))
}

/// Watches the domain directory while alive.
pub struct DomainDirWatcher {
    _watcher: RecommendedWatcher,
}

impl DomainDirWatcher {
    /// Start watching `path`, firing [`Trigger::ConfigChanged`] on relevant events.
    ///
    /// # Errors
    ///
    /// Fails if the platform watcher cannot be created or the directory
    /// cannot be watched.
    pub fn start(path: &Path, sender: TriggerSender) -> Result<Self, WatchError> {
        let to_error = |source| WatchError {
            path: path.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| match event {
            Ok(event) if is_relevant(&event) => {
                debug!(paths = ?event.paths, kind = ?event.kind, "Domain descriptor changed");
                sender.fire(Trigger::ConfigChanged);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Domain directory watch error"),
        })
        .map_err(to_error)?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(to_error)?;

        info!(path = %path.display(), "Watching domain directory for changes");
        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_relevant_events() {
        assert!(is_relevant(&event(EventKind::Create(CreateKind::File), "/d/a.yml")));
        assert!(is_relevant(&event(EventKind::Modify(ModifyKind::Any), "/d/a.YAML")));
        assert!(is_relevant(&event(EventKind::Remove(RemoveKind::File), "/d/a.yaml")));
    }

    #[test]
    fn test_irrelevant_events() {
        assert!(!is_relevant(&event(EventKind::Access(AccessKind::Any), "/d/a.yml")));
        assert!(!is_relevant(&event(EventKind::Modify(ModifyKind::Any), "/d/a.yml.swp")));
        assert!(!is_relevant(&event(EventKind::Create(CreateKind::File), "/d/notes.txt")));
    }

    #[test]
    fn test_missing_directory_fails() {
        let (sender, _queue) = crate::renewal::TriggerQueue::channel();
        assert!(DomainDirWatcher::start(Path::new("/nonexistent/certkeeper/domains"), sender).is_err());
    }
}
