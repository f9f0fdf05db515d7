use crate::error::VigilError;
use crate::event::{EventType, RawEvent};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Starts a recursive OS watcher over `roots`, forwarding translated events.
///
/// Roots that cannot be watched are logged and skipped; an error is returned
/// only when none of them could be registered. Dropping the returned watcher
/// drops `raw_event_tx` with it.
pub fn setup_file_watcher(
    roots: &[PathBuf],
    raw_event_tx: UnboundedSender<RawEvent>,
) -> Result<RecommendedWatcher, VigilError> {
    let event_handler = move |res: Result<Event, notify::Error>| match res {
        Ok(event) => {
            for raw in translate(&event) {
                let _ = raw_event_tx.send(raw);
            }
        }
        Err(e) => warn!(error = %e, "file watcher error"),
    };

    let mut watcher = RecommendedWatcher::new(event_handler, Config::default())?;

    let mut watched = 0usize;
    for root in roots {
        match watcher.watch(root, RecursiveMode::Recursive) {
            Ok(()) => {
                info!(root = %root.display(), "watching");
                watched += 1;
            }
            Err(e) => warn!(root = %root.display(), error = %e, "cannot watch root, skipping"),
        }
    }

    if watched == 0 {
        return Err(VigilError::NoRoots);
    }

    Ok(watcher)
}

/// Maps one notify event onto zero or more raw pipeline events.
pub fn translate(event: &Event) -> Vec<RawEvent> {
    let each = |event_type: EventType| {
        event
            .paths
            .iter()
            .map(|path| RawEvent::new(event_type, path.clone()))
            .collect::<Vec<_>>()
    };

    match event.kind {
        EventKind::Create(CreateKind::Folder) => each(EventType::DirectoryCreated),
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.is_dir() {
                    EventType::DirectoryCreated
                } else {
                    EventType::Created
                };
                RawEvent::new(kind, path.clone())
            })
            .collect(),
        EventKind::Remove(RemoveKind::Folder) => each(EventType::DirectoryDeleted),
        EventKind::Remove(_) => each(EventType::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(EventType::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(EventType::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => vec![
            RawEvent::new(EventType::Deleted, event.paths[0].clone()),
            RawEvent::new(EventType::Created, event.paths[1].clone()),
        ],
        EventKind::Modify(_) => each(EventType::Modified),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_both_splits_into_delete_and_create() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/w/old.txt"))
            .add_path(PathBuf::from("/w/new.txt"));

        assert_eq!(
            translate(&event),
            vec![
                RawEvent::new(EventType::Deleted, "/w/old.txt"),
                RawEvent::new(EventType::Created, "/w/new.txt"),
            ]
        );
    }

    #[test]
    fn folder_removal_is_a_directory_event() {
        let event = Event::new(EventKind::Remove(RemoveKind::Folder)).add_path(PathBuf::from("/w/d"));
        assert_eq!(
            translate(&event),
            vec![RawEvent::new(EventType::DirectoryDeleted, "/w/d")]
        );
    }

    #[test]
    fn access_events_are_ignored() {
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/w/a.txt"));
        assert!(translate(&event).is_empty());
    }
}
