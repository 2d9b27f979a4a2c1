use std::collections::BTreeMap;
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::types::{ChangeEvent, ChangeKind};
use crate::post::{ContentRoot, Location};

/// Turn debounced path changes into one event per affected location.
///
/// Paths outside the post layout are ignored. Several paths may name the same
/// post (its directory and its source file); they collapse into one event
/// whose kind is reconciled with whether the source file exists now, since
/// notify may report a stale kind after an atomic save.
pub(super) fn route(
    changes: FxHashMap<PathBuf, ChangeKind>,
    root: &ContentRoot,
) -> Vec<ChangeEvent> {
    let mut grouped: BTreeMap<Location, Vec<ChangeKind>> = BTreeMap::new();
    for (path, kind) in changes {
        match root.locate(&path) {
            Some(location) => grouped.entry(location).or_default().push(kind),
            None => crate::debug!("watch"; "ignored {}: {}", kind.label(), path.display()),
        }
    }

    grouped
        .into_iter()
        .filter_map(|(location, kinds)| {
            let exists = root.source_path(&location).is_file();
            let kind = reconcile(&kinds, exists)?;
            Some(ChangeEvent { location, kind })
        })
        .collect()
}

fn reconcile(kinds: &[ChangeKind], exists: bool) -> Option<ChangeKind> {
    if !exists {
        // A post that appeared and vanished within the window never existed
        // as far as the cache is concerned.
        let only_created = kinds.iter().all(|k| *k == ChangeKind::Created);
        return (!only_created).then_some(ChangeKind::Removed);
    }
    if kinds.contains(&ChangeKind::Created) {
        Some(ChangeKind::Created)
    } else {
        Some(ChangeKind::Modified)
    }
}

pub(super) fn log_events(events: &[ChangeEvent]) {
    for event in events {
        crate::debug!("watch"; "{}", event);
    }
}
