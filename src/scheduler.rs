//! Schedulers decide where and when work runs.
//!
//! `ReceiveOn` and `Debounce` hand their deliveries to a scheduler instead of
//! calling downstream directly. A scheduler is an injected capability. Every
//! stage holds its own handle to one, and there is no global default.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::lock;

/// A unit of work.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs work now or after a delay.
pub trait Scheduler: Send + Sync + 'static {
    /// Run `work` as soon as possible.
    fn schedule(&self, work: Work);

    /// Run `work` once `delay` has passed.
    fn schedule_after(&self, delay: Duration, work: Work);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule(&self, work: Work) {
        (**self).schedule(work)
    }

    fn schedule_after(&self, delay: Duration, work: Work) {
        (**self).schedule_after(delay, work)
    }
}

/// Runs work inline on the calling thread.
///
/// Delays are ignored, so this is mostly useful where a scheduler is required
/// but no thread hop is wanted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, work: Work) {
        work()
    }

    fn schedule_after(&self, _delay: Duration, work: Work) {
        work()
    }
}

/// Work due at a certain point in time.
///
/// Ordered by due time, then by submission, so that work due at the same
/// time runs in the order it was scheduled.
pub(crate) struct Timer<T> {
    pub at: T,
    pub seq: u64,
    pub work: Work,
}

impl<T: Ord> PartialEq for Timer<T> {
    fn eq(&self, other: &Timer<T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Timer<T> {}

impl<T: Ord> PartialOrd for Timer<T> {
    fn partial_cmp(&self, other: &Timer<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Timer<T> {
    fn cmp(&self, other: &Timer<T>) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// Runs work serially on a dedicated background thread.
///
/// Work is executed in the order it becomes due. Dropping the last handle
/// lets the thread finish the work already scheduled and exit.
///
/// ```
/// # use backflow::{Scheduler, ThreadScheduler};
/// # use std::sync::mpsc::channel;
/// let scheduler = ThreadScheduler::new().unwrap();
/// let (tx, rx) = channel();
/// scheduler.schedule(Box::new(move || tx.send(7).unwrap()));
/// assert_eq!(rx.recv(), Ok(7));
/// ```
#[derive(Clone)]
pub struct ThreadScheduler {
    sender: Arc<Mutex<Sender<Timer<Instant>>>>,
    seq: Arc<Mutex<u64>>,
}

impl ThreadScheduler {
    /// Spawn the worker thread.
    pub fn new() -> io::Result<ThreadScheduler> {
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("backflow-scheduler".into())
            .spawn(move || run_timers(receiver))?;
        Ok(ThreadScheduler {
            sender: Arc::new(Mutex::new(sender)),
            seq: Arc::new(Mutex::new(0)),
        })
    }

    fn submit(&self, at: Instant, work: Work) {
        let seq = {
            let mut seq = lock(&self.seq);
            *seq += 1;
            *seq
        };
        if lock(&self.sender).send(Timer { at, seq, work }).is_err() {
            log::error!("scheduler thread is gone, dropping work");
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, work: Work) {
        self.submit(Instant::now(), work)
    }

    fn schedule_after(&self, delay: Duration, work: Work) {
        self.submit(Instant::now() + delay, work)
    }
}

fn run_timers(receiver: Receiver<Timer<Instant>>) {
    let mut timers: BinaryHeap<Reverse<Timer<Instant>>> = BinaryHeap::new();
    let mut connected = true;
    loop {
        let now = Instant::now();
        while timers.peek().map_or(false, |Reverse(timer)| timer.at <= now) {
            if let Some(Reverse(timer)) = timers.pop() {
                (timer.work)();
            }
        }
        let next = timers.peek().map(|Reverse(timer)| timer.at);
        if !connected {
            match next {
                Some(at) => {
                    thread::sleep(at.saturating_duration_since(Instant::now()));
                    continue;
                }
                None => break,
            }
        }
        let received = match next {
            Some(at) => receiver.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(timer) => timers.push(Reverse(timer)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => connected = false,
        }
    }
    log::trace!("scheduler thread exiting");
}
