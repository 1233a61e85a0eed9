//! Unbuffered hand-off of stop reasons.
//!
//! A waiter queues a oneshot sender and parks on the receiving half. A
//! producer takes the next live waiter and sends it an [`Offer`] holding the
//! reason and a reply channel. The waiter acknowledges on the same poll that
//! returns the reason; a waiter dropped with an unread offer hands the reason
//! back instead. The producer only completes once the reason is acknowledged,
//! so a cancelled `wait` never swallows it.
//!
//! Producers are serialized, so each waiter receives exactly one reason and
//! surplus producers stay pending until another waiter arrives. Closed
//! waiters are pruned whenever a new one is queued.

use crate::reason::Reason;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Notify, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

struct Offer {
    reason: Reason,
    reply: oneshot::Sender<Result<(), Reason>>,
}

type Waiter = oneshot::Sender<Offer>;

struct Rendezvous {
    waiters: Mutex<VecDeque<Waiter>>,
    waiter_ready: Notify,
    producers: tokio::sync::Mutex<()>,
}

impl Rendezvous {
    fn push_waiter(&self, waiter: Waiter) {
        {
            let mut waiters = self.waiters.lock();
            waiters.retain(|w| !w.is_closed());
            waiters.push_back(waiter);
        }
        self.waiter_ready.notify_one();
    }

    fn pop_waiter(&self) -> Option<Waiter> {
        let mut waiters = self.waiters.lock();
        while let Some(waiter) = waiters.pop_front() {
            if !waiter.is_closed() {
                return Some(waiter);
            }
        }
        None
    }

    async fn next_waiter(&self) -> Waiter {
        loop {
            if let Some(waiter) = self.pop_waiter() {
                return waiter;
            }
            // `notify_one` stores a permit, so a push between the pop and
            // this await is not missed.
            self.waiter_ready.notified().await;
        }
    }

    /// Offer `reason` to waiters until one acknowledges it.
    async fn deliver(&self, mut reason: Reason, token: &CancellationToken) -> Result<(), Reason> {
        let _turn = tokio::select! {
            turn = self.producers.lock() => turn,
            _ = token.cancelled() => return Err(reason),
        };

        loop {
            let waiter = tokio::select! {
                waiter = self.next_waiter() => waiter,
                _ = token.cancelled() => return Err(reason),
            };

            let (reply, replied) = oneshot::channel();
            if let Err(offer) = waiter.send(Offer { reason, reply }) {
                reason = offer.reason;
                continue;
            }

            // The offer is out of our hands; only the waiter can settle it.
            match replied.await {
                Ok(Ok(())) => {
                    debug!("stop reason delivered");
                    return Ok(());
                }
                Ok(Err(returned)) => {
                    trace!("waiter dropped before taking the reason");
                    reason = returned;
                }
                Err(_) => {
                    warn!("stop reason dropped by its waiter");
                    return Ok(());
                }
            }
        }
    }
}

/// Receiving half of a queued waiter. Gives an unread offer back on drop.
struct Slot {
    rx: oneshot::Receiver<Offer>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.rx.close();
        if let Ok(offer) = self.rx.try_recv() {
            let _ = offer.reply.send(Err(offer.reason));
        }
    }
}

/// Receiving half, owned by the dispatcher.
pub(crate) struct Receiver {
    inner: Arc<Rendezvous>,
}

/// Cloneable producer handle given to emitters.
#[derive(Clone)]
pub struct Intake {
    inner: Arc<Rendezvous>,
}

pub(crate) fn channel() -> (Intake, Receiver) {
    let inner = Arc::new(Rendezvous {
        waiters: Mutex::new(VecDeque::new()),
        waiter_ready: Notify::new(),
        producers: tokio::sync::Mutex::new(()),
    });

    (
        Intake {
            inner: Arc::clone(&inner),
        },
        Receiver { inner },
    )
}

impl Receiver {
    /// Wait until a producer hands over a reason.
    ///
    /// Cancel safe: dropping the future before it resolves leaves any
    /// offered reason with its producer.
    pub(crate) async fn recv(&self) -> Reason {
        loop {
            let (tx, rx) = oneshot::channel();
            self.inner.push_waiter(tx);
            trace!("waiting for stop reason");

            let mut slot = Slot { rx };
            if let Ok(offer) = (&mut slot.rx).await {
                let _ = offer.reply.send(Ok(()));
                return offer.reason;
            }
        }
    }

    /// Waiters currently queued, including closed ones not yet pruned.
    #[cfg(test)]
    pub(crate) fn queued_waiters(&self) -> usize {
        self.inner.waiters.lock().len()
    }
}

impl Intake {
    /// Hand a reason to the next waiting dispatcher.
    ///
    /// Stays pending until a `wait` call has taken it.
    pub async fn stop(&self, reason: impl Into<Reason>) {
        let never = CancellationToken::new();
        // Only cancellation hands the reason back.
        let _ = self.inner.deliver(reason.into(), &never).await;
    }

    /// Like [`Intake::stop`], but gives the reason back if `token` is
    /// cancelled before a waiter is offered it.
    pub async fn stop_or_cancel(
        &self,
        reason: impl Into<Reason>,
        token: &CancellationToken,
    ) -> Result<(), Reason> {
        self.inner.deliver(reason.into(), token).await
    }
}

impl fmt::Debug for Intake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intake").finish_non_exhaustive()
    }
}
