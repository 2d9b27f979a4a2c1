//! Content directory watcher.
//!
//! Turns filesystem notifications into per-location invalidation events.
//! The watcher is attached as soon as it is constructed, so changes made
//! during the initial build are buffered rather than lost.
//!
//! ```text
//! notify ─▶ bridge thread ─▶ Debouncer (timing, per-path dedup)
//!                                 │
//!                                 ▼
//!                          router (path → Location)
//!                                 │
//!                                 ▼
//!                     mpsc::Sender<ChangeEvent> ─▶ apply(cache, event)
//! ```

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use crate::cache::ItemCache;
use crate::post::ContentRoot;

// Attach/re-attach of the content dir.
mod content_dir;
// Quiet-window timing and per-path dedup.
mod debouncer;
// Paths to locations.
mod router;
mod types;


use content_dir::ContentDirWatch;
use debouncer::Debouncer;
use router::{log_events, route};

pub use types::{ChangeEvent, ChangeKind};

/// React to a change: clear the resident item's slots.
///
/// Returns whether an item was resident. The entry itself is never removed,
/// so later lookups get the same instance.
pub fn apply(cache: &ItemCache, event: &ChangeEvent) -> bool {
    let resident = cache.invalidate(&event.location);
    crate::debug!("cache"; "invalidate {} (resident: {})", event.location, resident);
    resident
}

/// Watches the content directory and sends [`ChangeEvent`]s.
pub struct ChangeWatcher {
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    watcher: RecommendedWatcher,
    content_dir: ContentDirWatch,
    tx: mpsc::Sender<ChangeEvent>,
    debouncer: Debouncer,
    root: ContentRoot,
}

impl ChangeWatcher {
    /// Start watching `root`'s directory immediately. Events buffer until
    /// [`run`](Self::run) is awaited.
    ///
    /// A content dir that does not exist yet is attached once it appears.
    pub fn new(tx: mpsc::Sender<ChangeEvent>, root: ContentRoot) -> notify::Result<Self> {
        // notify is callback-based and sync
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut content_dir = ContentDirWatch::new(root.dir());
        if !content_dir.sync(&mut watcher)? {
            crate::debug!("watch"; "waiting for {}", content_dir.dir().display());
        }

        Ok(Self {
            notify_rx,
            watcher,
            content_dir,
            tx,
            debouncer: Debouncer::new(),
            root,
        })
    }

    /// Event loop. Returns when the receiving side of the channel is dropped.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut content_dir,
            tx,
            mut debouncer,
            root,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if let Err(e) = content_dir.sync(&mut watcher) {
                        crate::log!("watch"; "failed to attach {}: {}", content_dir.dir().display(), e);
                    }
                    if flush(&mut debouncer, &tx, &root).await.is_err() {
                        break;
                    }
                }
                _ = tx.closed() => break,
            }
        }
        crate::debug!("watch"; "watcher stopped");
    }
}

/// Send whatever the debouncer has ready.
///
/// Returns `Err(())` once the receiver is gone.
async fn flush(
    debouncer: &mut Debouncer,
    tx: &mpsc::Sender<ChangeEvent>,
    root: &ContentRoot,
) -> Result<(), ()> {
    let Some(changes) = debouncer.take_if_ready() else {
        return Ok(());
    };

    let events = route(changes, root);
    log_events(&events);

    for event in events {
        tx.send(event).await.map_err(|_| ())?;
    }
    Ok(())
}
