//! Subscriptions and the lifecycle of an upstream link.

use std::sync::{Arc, Mutex};

use crate::demand::Demand;
use crate::lock;

/// The handle a publisher gives to a subscriber.
///
/// A subscriber uses it to raise its demand or to stop the flow of values.
/// Both calls may happen from any thread, at any time, including from within
/// the subscriber's own `receive`. Implementations never call back into the
/// subscriber from `cancel`.
pub trait Subscription: Send + Sync {
    /// Add `demand` to the outstanding demand.
    fn request(&self, demand: Demand);

    /// Stop delivering values and release resources.
    ///
    /// Cancelling is idempotent.
    fn cancel(&self);
}

/// A subscription that ignores every call.
///
/// Handed out by publishers that complete right away.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptySubscription;

impl EmptySubscription {
    /// An empty subscription as a trait object.
    pub fn shared() -> Arc<dyn Subscription> {
        Arc::new(EmptySubscription)
    }
}

impl Subscription for EmptySubscription {
    fn request(&self, _demand: Demand) {}
    fn cancel(&self) {}
}

enum Status {
    Awaiting,
    Subscribed {
        subscription: Arc<dyn Subscription>,
        open: bool,
    },
    Terminated,
}

/// The link from a sink to the subscription it received from upstream.
///
/// The only legal paths are `awaiting -> subscribed -> terminated` and
/// `awaiting -> terminated`. Every transition that would leave that path is
/// ignored, so racing or duplicated signals are harmless.
///
/// A sink hands itself downstream before it asks upstream for anything.
/// Demand raised by the downstream during that handshake is not forwarded:
/// a synchronous upstream would start emitting into a sink whose delivery
/// is still busy with the handshake. The sink calls `open` once the
/// handshake returned, which requests unlimited demand and lets later
/// requests through.
pub(crate) struct Upstream {
    status: Mutex<Status>,
}

impl Upstream {
    pub fn new() -> Upstream {
        Upstream {
            status: Mutex::new(Status::Awaiting),
        }
    }

    /// Store the subscription received from upstream.
    ///
    /// If the link is not awaiting a subscription, the new one is cancelled
    /// and `false` is returned.
    pub fn attach(&self, subscription: Arc<dyn Subscription>) -> bool {
        {
            let mut status = lock(&self.status);
            if let Status::Awaiting = *status {
                *status = Status::Subscribed {
                    subscription,
                    open: false,
                };
                return true;
            }
        }
        log::debug!("ignoring a subscription on an already linked sink");
        subscription.cancel();
        false
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(*lock(&self.status), Status::Subscribed { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(*lock(&self.status), Status::Terminated)
    }

    /// Mark the link finished because upstream completed.
    ///
    /// Returns whether the link was live, i.e. whether the completion should
    /// be handled.
    pub fn complete(&self) -> bool {
        let mut status = lock(&self.status);
        if matches!(*status, Status::Subscribed { .. }) {
            *status = Status::Terminated;
            true
        } else {
            false
        }
    }

    /// Terminate the link and cancel upstream.
    ///
    /// Returns whether this call performed the termination.
    pub fn cancel(&self) -> bool {
        let previous = std::mem::replace(&mut *lock(&self.status), Status::Terminated);
        match previous {
            Status::Subscribed { subscription, .. } => {
                subscription.cancel();
                true
            }
            Status::Awaiting => true,
            Status::Terminated => false,
        }
    }

    /// Return a live link to awaiting a fresh subscription.
    ///
    /// Used to resubscribe after a failure. Returns `false` if the link was
    /// cancelled in the meantime.
    pub fn detach(&self) -> bool {
        let mut status = lock(&self.status);
        if matches!(*status, Status::Subscribed { .. }) {
            *status = Status::Awaiting;
            true
        } else {
            false
        }
    }

    /// Ask upstream for `demand` while the link is live.
    pub fn request(&self, demand: Demand) {
        let subscription = match *lock(&self.status) {
            Status::Subscribed {
                ref subscription, ..
            } => subscription.clone(),
            _ => {
                log::debug!("dropping request for {} on an unlinked sink", demand);
                return;
            }
        };
        subscription.request(demand);
    }

    /// Finish the handshake: request unlimited demand and start forwarding
    /// downstream requests.
    pub fn open(&self) {
        let subscription = {
            let mut status = lock(&self.status);
            match &mut *status {
                Status::Subscribed { subscription, open } => {
                    *open = true;
                    subscription.clone()
                }
                _ => return,
            }
        };
        subscription.request(Demand::Unlimited);
    }

    /// Pass on demand raised by the downstream, once the link is open.
    pub fn forward(&self, demand: Demand) {
        let subscription = match &*lock(&self.status) {
            Status::Subscribed {
                subscription,
                open: true,
            } => subscription.clone(),
            Status::Subscribed { open: false, .. } => {
                log::trace!("request for {} during the handshake, unlimited follows", demand);
                return;
            }
            _ => {
                log::debug!("dropping request for {} on an unlinked sink", demand);
                return;
            }
        };
        subscription.request(demand);
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counting {
        requests: AtomicUsize,
        cancels: AtomicUsize,
    }

    impl Subscription for Counting {
        fn request(&self, _demand: Demand) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn attach_once() {
        let upstream = Upstream::new();
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        assert!(upstream.attach(first.clone()));
        assert!(!upstream.attach(second.clone()));
        assert_eq!(second.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(first.cancels.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let upstream = Upstream::new();
        let sub = Arc::new(Counting::default());
        upstream.attach(sub.clone());
        assert!(upstream.cancel());
        assert!(!upstream.cancel());
        assert_eq!(sub.cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_before_subscribe() {
        let upstream = Upstream::new();
        assert!(upstream.cancel());
        let late = Arc::new(Counting::default());
        assert!(!upstream.attach(late.clone()));
        assert_eq!(late.cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn request_after_termination_is_dropped() {
        let upstream = Upstream::new();
        let sub = Arc::new(Counting::default());
        upstream.attach(sub.clone());
        upstream.request(Demand::max(1));
        assert!(upstream.complete());
        upstream.request(Demand::max(1));
        assert_eq!(sub.requests.load(Ordering::SeqCst), 1);
        assert!(!upstream.complete());
        assert!(upstream.is_terminated());
    }

    #[test]
    fn forward_waits_for_open() {
        let upstream = Upstream::new();
        let sub = Arc::new(Counting::default());
        upstream.attach(sub.clone());
        upstream.forward(Demand::max(3));
        assert_eq!(sub.requests.load(Ordering::SeqCst), 0);
        upstream.open();
        upstream.forward(Demand::max(3));
        assert_eq!(sub.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detach_allows_resubscription() {
        let upstream = Upstream::new();
        upstream.attach(Arc::new(Counting::default()));
        assert!(upstream.detach());
        assert!(!upstream.is_subscribed());
        assert!(upstream.attach(Arc::new(Counting::default())));
        upstream.cancel();
        assert!(!upstream.detach());
    }
}
