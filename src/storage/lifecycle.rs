//! Open/close accounting and simulated media removal.
//!
//! When the last handle closes, an idle timer is armed. If it fires before
//! anyone reopens the device, the media is flagged as changed, and the next
//! first open zeroes the store and forgets every sector's owner before any
//! request is serviced. Reopening before the deadline cancels the timer and
//! leaves the content alone.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use super::device::Device;
use super::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No handles and no pending idle timer.
    Closed,
    /// At least one handle is open.
    Open,
    /// Last handle closed; the idle timer is running.
    IdleArmed,
    /// The idle timer fired; the next open resets the media.
    MediaInvalid,
}

/// Logs an idle timer task that ended in a panic. Returns whether it did.
fn report_timer_exit(name: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Err(e) if e.is_panic() => {
            tracing::warn!("{}: idle timer panicked: {}", name, e);
            true
        }
        _ => false,
    }
}

#[derive(Debug, Default)]
pub(super) struct Lifecycle {
    users: usize,
    ever_opened: bool,
    idle_deadline: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl Device {
    /// Registers a new handle.
    ///
    /// Any pending idle timer is cancelled (waiting for an in-flight firing)
    /// before the bookkeeping lock is taken. The first ever open, and the
    /// first open after a media change, reset the device.
    pub async fn open(&self) -> Result<(), StorageError> {
        if self.is_released() {
            return Err(StorageError::Released(self.name().to_string()));
        }
        self.cancel_idle_timer().await;

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.users == 0 {
            if !lifecycle.ever_opened {
                lifecycle.ever_opened = true;
                self.media_changed.store(false, Ordering::SeqCst);
                self.reset_media();
            } else if self.revalidate() {
                tracing::debug!("{}: media changed, device revalidated", self.name());
            }
        }
        lifecycle.users += 1;
        tracing::debug!("{}: opened ({} users)", self.name(), lifecycle.users);
        Ok(())
    }

    /// Drops a handle. Closing the last one arms the idle timer, which needs
    /// a tokio runtime to run on.
    pub fn close(self: &Arc<Self>) -> Result<(), StorageError> {
        if self.is_released() {
            return Err(StorageError::Released(self.name().to_string()));
        }

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.users == 0 {
            return Err(StorageError::NotOpen(self.name().to_string()));
        }
        lifecycle.users -= 1;
        tracing::debug!("{}: closed ({} users)", self.name(), lifecycle.users);

        if lifecycle.users == 0 {
            let runtime = match Handle::try_current() {
                Ok(runtime) => runtime,
                Err(_) => {
                    tracing::warn!("{}: no runtime, idle timer not armed", self.name());
                    return Ok(());
                }
            };

            let deadline = Instant::now() + self.config().idle_delay;
            lifecycle.generation += 1;
            lifecycle.idle_deadline = Some(deadline);

            let device = Arc::downgrade(self);
            let generation = lifecycle.generation;
            let timer = runtime.spawn(async move {
                tokio::time::sleep_until(deadline).await;
                if let Some(device) = device.upgrade() {
                    device.invalidate(generation);
                }
            });

            if let Some(stale) = lifecycle.timer.replace(timer) {
                stale.abort();
            }
        }
        Ok(())
    }

    /// Idle timer callback.
    fn invalidate(&self, generation: u64) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.generation != generation {
            tracing::trace!("{}: stale idle timer ignored", self.name());
            return;
        }
        lifecycle.idle_deadline = None;
        lifecycle.timer = None;

        if lifecycle.users > 0 || !self.store.read().is_allocated() {
            tracing::warn!(
                "{}: idle timer sanity check failed ({} users)",
                self.name(),
                lifecycle.users
            );
            return;
        }
        self.media_changed.store(true, Ordering::SeqCst);
        tracing::debug!("{}: idle timeout, media marked changed", self.name());
    }

    /// Cancels the idle timer and waits for a firing already in progress.
    async fn cancel_idle_timer(&self) {
        let timer = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.idle_deadline = None;
            lifecycle.timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
            report_timer_exit(self.name(), timer.await);
        }
    }

    pub fn media_changed(&self) -> bool {
        self.media_changed.load(Ordering::SeqCst)
    }

    /// Resets the device if the media is flagged as changed, clearing the
    /// flag. Returns whether a reset happened.
    ///
    /// This does not take the lifecycle lock. An open racing with it can be
    /// serviced against the buffer before it is zeroed.
    pub fn revalidate(&self) -> bool {
        if self.media_changed.swap(false, Ordering::SeqCst) {
            self.reset_media();
            true
        } else {
            false
        }
    }

    pub fn users(&self) -> usize {
        self.lifecycle.lock().users
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.lifecycle.lock().idle_deadline
    }

    pub fn state(&self) -> LifecycleState {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.users > 0 {
            LifecycleState::Open
        } else if self.media_changed() {
            LifecycleState::MediaInvalid
        } else if lifecycle.idle_deadline.is_some() {
            LifecycleState::IdleArmed
        } else {
            LifecycleState::Closed
        }
    }

    /// Cancels the idle timer, then frees the backing memory. Safe to call
    /// more than once.
    pub async fn teardown(&self) {
        self.cancel_idle_timer().await;
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.users = 0;
            lifecycle.generation += 1;
        }
        if !self.is_released() {
            self.release();
            tracing::info!("{}: released", self.name());
        }
    }
}
