//! Background reload loop.
//!
//! Two producers feed the same reconciliation function,
//! [`SpatialIndex::handle_trigger`]: file system notifications for the
//! directories holding the collections, and a fixed polling tick. Polling
//! alone is enough for correctness; notifications only shorten the delay.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, never, select, tick, unbounded, Receiver, Sender};
use log::{debug, info, warn};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::spatial::index::SpatialIndex;
use crate::{Error, Result};

/// Reason to reconcile collections with their files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// Periodic check of every collection
    Poll,
    /// Something changed at this path
    Changed(PathBuf),
}

impl ReloadTrigger {
    /// Triggers for a watcher event; pure access events are ignored.
    pub fn from_event(event: Event) -> Vec<ReloadTrigger> {
        if matches!(event.kind, EventKind::Access(_)) {
            return Vec::new();
        }
        event.paths.into_iter().map(ReloadTrigger::Changed).collect()
    }
}

type EventReceiver = Receiver<notify::Result<Event>>;

/// Handle of the reload thread. Stops the thread when stopped or dropped.
pub struct Reloader {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
}

impl Reloader {
    /// Starts watching the directories of all collections in `index` and
    /// polling every `poll_interval`.
    ///
    /// A watcher that cannot be created or registered is logged and the
    /// loop falls back to polling only.
    pub fn spawn(index: &Arc<SpatialIndex>, poll_interval: Duration) -> Result<Reloader> {
        let (watcher, events_rx) = match start_watcher(index) {
            Ok((watcher, events_rx)) => (Some(watcher), events_rx),
            Err(e) => {
                warn!("file watching unavailable, polling every {poll_interval:?} only: {e}");
                (None, never())
            }
        };

        let (stop_tx, stop_rx) = bounded(1);
        let weak = Arc::downgrade(index);
        let thread = thread::Builder::new()
            .name("featurelet-reload".to_string())
            .spawn(move || run(weak, events_rx, stop_rx, tick(poll_interval)))?;

        info!("reload loop started, polling every {poll_interval:?}");
        Ok(Reloader {
            stop_tx,
            thread: Some(thread),
            watcher,
        })
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Adds `directory` to the watch set. Without a watcher the loop keeps
    /// polling and this does nothing.
    pub fn watch(&mut self, directory: &Path) -> Result<()> {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.watch(directory, RecursiveMode::NonRecursive)?;
            debug!("watching {}", directory.display());
        }
        Ok(())
    }

    /// Stops the loop and waits for the thread, unless called from the
    /// thread itself.
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() && thread.join().is_err() {
                warn!("reload thread panicked");
            }
        }
    }

    fn signal_stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        // Dropping the watcher removes every registration.
        self.watcher.take();
    }
}

impl Drop for Reloader {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

impl std::fmt::Debug for Reloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reloader")
            .field("watching", &self.is_watching())
            .field("running", &self.thread.is_some())
            .finish()
    }
}

fn start_watcher(index: &SpatialIndex) -> Result<(RecommendedWatcher, EventReceiver)> {
    let (events_tx, events_rx) = unbounded();
    let mut watcher = RecommendedWatcher::new(
        move |result| {
            if events_tx.send(result).is_err() {
                debug!("dropping file system event, reload loop has stopped");
            }
        },
        Config::default(),
    )
    .map_err(Error::Watch)?;

    for directory in index.watched_directories() {
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(Error::Watch)?;
        debug!("watching {}", directory.display());
    }
    Ok((watcher, events_rx))
}

fn run(
    index: Weak<SpatialIndex>,
    events_rx: EventReceiver,
    stop_rx: Receiver<()>,
    ticker: Receiver<std::time::Instant>,
) {
    loop {
        let triggers = select! {
            recv(stop_rx) -> _ => None,
            recv(ticker) -> _ => Some(vec![ReloadTrigger::Poll]),
            recv(events_rx) -> event => match event {
                Ok(Ok(event)) => {
                    debug!("watcher event: {event:?}");
                    Some(ReloadTrigger::from_event(event))
                }
                Ok(Err(e)) => {
                    warn!("file watcher error: {e}");
                    Some(Vec::new())
                }
                Err(_) => None,
            },
        };

        let Some(triggers) = triggers else { break };
        let Some(index) = index.upgrade() else { break };
        for trigger in &triggers {
            index.handle_trigger(trigger);
        }
    }
    debug!("reload loop stopped");
}
