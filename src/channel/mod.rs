//! Broadcast channel with independent subscriber cursors.
//!
//! A channel is a multi-producer, multi-subscriber stream. Each subscription
//! is an independent cursor created at subscribe time: it observes every
//! message sent *after* that moment and none sent before. Sends complete
//! synchronously and never block; a slow subscriber retains its backlog in
//! an unbounded per-subscriber buffer.
//!
//! # Semantics
//!
//! - **Fan-out**: every message goes to every live subscription.
//! - **Post-subscription only**: no replay of earlier messages.
//! - **Close**: after [`Sender::close`], pending and future `next` calls
//!   yield `None` once the subscriber's buffer is drained; further sends
//!   fail with `ChannelClosed`.
//! - **Concurrent `next`**: several tasks may wait on one subscription; their
//!   resolvers queue in call order and drain FIFO as messages arrive.

use crate::error::{Error, ErrorKind};
use crate::op::{self, Operation};
use crate::runtime::waker::Resolver;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Internal state shared between senders and subscriptions.
struct Shared<M> {
    /// Per-subscriber cursors, keyed by subscription id. A BTreeMap keeps
    /// fan-out order deterministic.
    subscribers: BTreeMap<u64, SubscriberState<M>>,
    /// Next subscription id.
    next_id: u64,
    /// Whether the channel has been closed.
    closed: bool,
}

struct SubscriberState<M> {
    /// Messages sent but not yet consumed by this subscriber.
    buffer: VecDeque<M>,
    /// Parked `next` calls, in call order.
    waiters: VecDeque<Resolver>,
}

impl<M> SubscriberState<M> {
    fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            waiters: VecDeque::new(),
        }
    }
}

type Channel<M> = Arc<Mutex<Shared<M>>>;

/// Creates a new broadcast channel.
///
/// Returns the sending half and the subscribing half. Both are cheaply
/// cloneable; all clones refer to the same channel.
#[must_use]
pub fn channel<M: Send + 'static>() -> (Sender<M>, Outlet<M>) {
    let shared = Arc::new(Mutex::new(Shared {
        subscribers: BTreeMap::new(),
        next_id: 0,
        closed: false,
    }));
    (
        Sender {
            channel: Arc::clone(&shared),
        },
        Outlet { channel: shared },
    )
}

/// The sending side of a broadcast channel.
pub struct Sender<M> {
    channel: Channel<M>,
}

impl<M> Clone for Sender<M> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<M: Clone + Send + 'static> Sender<M> {
    /// Sends a message to every live subscription.
    ///
    /// The operation completes synchronously: parked receivers are woken,
    /// everyone else's cursor buffers the message. Fails with
    /// `ChannelClosed` after [`close`](Sender::close).
    pub fn send(&self, message: M) -> Operation<()> {
        let channel = Arc::clone(&self.channel);
        op::action(move || {
            let mut shared = channel.lock().expect("channel lock poisoned");
            if shared.closed {
                return Err(Error::new(ErrorKind::ChannelClosed)
                    .with_context("send on a closed channel"));
            }
            for sub in shared.subscribers.values_mut() {
                if let Some(waiter) = sub.waiters.pop_front() {
                    waiter.resolve(Box::new(Some(message.clone())));
                } else {
                    sub.buffer.push_back(message.clone());
                }
            }
            Ok(())
        })
    }

    /// Closes the channel.
    ///
    /// Every parked `next` resolves with `None`; buffered messages remain
    /// readable. Idempotent.
    pub fn close(&self) -> Operation<()> {
        let channel = Arc::clone(&self.channel);
        op::action(move || {
            let mut shared = channel.lock().expect("channel lock poisoned");
            shared.closed = true;
            for sub in shared.subscribers.values_mut() {
                for waiter in sub.waiters.drain(..) {
                    waiter.resolve(Box::new(None::<M>));
                }
            }
            Ok(())
        })
    }
}

impl<M> core::fmt::Debug for Sender<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

/// The subscribing side of a broadcast channel.
pub struct Outlet<M> {
    channel: Channel<M>,
}

impl<M> Clone for Outlet<M> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<M: Send + 'static> Outlet<M> {
    /// Creates a new subscription.
    ///
    /// The subscription observes messages sent after this operation runs.
    pub fn subscribe(&self) -> Operation<Subscription<M>> {
        let channel = Arc::clone(&self.channel);
        op::action(move || {
            let id = {
                let mut shared = channel.lock().expect("channel lock poisoned");
                let id = shared.next_id;
                shared.next_id += 1;
                shared.subscribers.insert(id, SubscriberState::new());
                id
            };
            Ok(Subscription {
                core: Arc::new(SubscriptionCore { channel, id }),
            })
        })
    }
}

impl<M> core::fmt::Debug for Outlet<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Outlet").finish_non_exhaustive()
    }
}

struct SubscriptionCore<M> {
    channel: Channel<M>,
    id: u64,
}

impl<M> Drop for SubscriptionCore<M> {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.channel.lock() {
            shared.subscribers.remove(&self.id);
        }
    }
}

/// An independent read cursor over a channel's post-subscription messages.
///
/// Cloning shares the cursor; the underlying subscriber state is removed
/// when the last clone is dropped.
pub struct Subscription<M> {
    core: Arc<SubscriptionCore<M>>,
}

impl<M> Clone for Subscription<M> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<M: Send + 'static> Subscription<M> {
    /// Yields the next unconsumed message for this subscriber, suspending
    /// until one is available. Yields `None` once the channel is closed and
    /// the buffer is drained.
    pub fn next(&self) -> Operation<Option<M>> {
        let core = Arc::clone(&self.core);
        op::wait(move |resolver| {
            let mut shared = core.channel.lock().expect("channel lock poisoned");
            let closed = shared.closed;
            let Some(sub) = shared.subscribers.get_mut(&core.id) else {
                resolver.resolve(Box::new(None::<M>));
                return;
            };
            if let Some(message) = sub.buffer.pop_front() {
                resolver.resolve(Box::new(Some(message)));
            } else if closed {
                resolver.resolve(Box::new(None::<M>));
            } else {
                sub.waiters.push_back(resolver);
            }
        })
    }

    /// Runs `handler` for every message until the channel closes.
    ///
    /// The loop suspends between messages, so halting the consuming task
    /// stops it between deliveries.
    pub fn for_each<F>(self, handler: F) -> Operation<()>
    where
        F: FnMut(M) + Send + 'static,
    {
        drain_loop(self, handler)
    }
}

fn drain_loop<M, F>(subscription: Subscription<M>, mut handler: F) -> Operation<()>
where
    M: Send + 'static,
    F: FnMut(M) + Send + 'static,
{
    subscription.next().and_then(move |message| match message {
        Some(m) => {
            handler(m);
            drain_loop(subscription, handler)
        }
        None => op::value(()),
    })
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.core.id)
            .finish_non_exhaustive()
    }
}
