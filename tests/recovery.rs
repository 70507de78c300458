//! Failure handling across whole pipelines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use backflow::operators::EventHooks;
use backflow::testing::{Event, Recorder};
use backflow::{
    Completion, Fail, Just, Never, PassthroughSubject, Publisher, PublisherExt, Sequence,
};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
enum SensorError {
    #[error("sensor {0} timed out")]
    Timeout(u8),
    #[error("sensor disconnected")]
    Disconnected,
}

fn counting(counter: &Arc<AtomicUsize>) -> EventHooks<f32, SensorError> {
    let counter = counter.clone();
    EventHooks::new().on_subscription(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn retry_exhaustion_counts_attempts() {
    let _ = env_logger::builder().is_test(true).try_init();
    let attempts = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    Fail::<f32, _>::new(SensorError::Timeout(3))
        .handle_events(counting(&attempts))
        .retry(Some(2))
        .subscribe(recorder.clone());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        recorder.events(),
        vec![
            Event::Subscribed,
            Event::Completed(Completion::Failure(SensorError::Timeout(3)))
        ]
    );
}

#[test]
fn catch_replaces_failed_upstream() {
    let subject = PassthroughSubject::<f32, SensorError>::new();
    let recorder: Recorder<f32, Never> = Recorder::new();
    subject
        .clone()
        .catch(|_| Just::new(42.0))
        .subscribe(recorder.clone());
    subject.send(1.5);
    subject.send_completion(Completion::Failure(SensorError::Disconnected));
    assert_eq!(
        recorder.events(),
        vec![
            Event::Subscribed,
            Event::Value(1.5),
            Event::Value(42.0),
            Event::Completed(Completion::Finished)
        ]
    );
}

#[test]
fn catch_picks_replacement_by_error() {
    let fallback = |error: SensorError| match error {
        SensorError::Timeout(id) => Sequence::new(vec![f32::from(id); 2]).erase(),
        SensorError::Disconnected => Sequence::new(vec![]).erase(),
    };
    let recorder = Recorder::new();
    Fail::<f32, _>::new(SensorError::Timeout(7))
        .catch(fallback)
        .subscribe(recorder.clone());
    assert_eq!(recorder.values(), vec![7.0, 7.0]);
    assert!(recorder.is_finished());
}

#[test]
fn retry_then_catch() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let recorder = Recorder::new();
    Fail::<f32, _>::new(SensorError::Disconnected)
        .handle_events(counting(&attempts))
        .retry(Some(1))
        .catch(|error| Just::new(if error == SensorError::Disconnected { -1.0 } else { 0.0 }))
        .subscribe(recorder.clone());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.values(), vec![-1.0]);
    assert!(recorder.is_finished());
}

#[test]
fn try_catch_surfaces_handler_error() {
    let recorder = Recorder::new();
    Fail::<f32, _>::new(SensorError::Timeout(1))
        .try_catch(|error| -> anyhow::Result<Just<f32>> {
            anyhow::bail!("no fallback for: {}", error)
        })
        .subscribe(recorder.clone());
    assert!(recorder.values().is_empty());
    assert_eq!(
        recorder.error_message().as_deref(),
        Some("no fallback for: sensor 1 timed out")
    );
}

#[test]
fn try_map_error_is_typed_underneath() {
    let recorder = Recorder::new();
    Sequence::new(vec![2, 0])
        .try_map(|divisor: u8| {
            if divisor == 0 {
                Err(SensorError::Disconnected.into())
            } else {
                Ok(10 / divisor)
            }
        })
        .map_error(|error: anyhow::Error| error.downcast::<SensorError>().ok())
        .subscribe(recorder.clone());
    assert_eq!(recorder.values(), vec![5]);
    assert_eq!(
        recorder.completion(),
        Some(Completion::Failure(Some(SensorError::Disconnected)))
    );
}

#[test]
fn replace_error_and_on_completion() {
    let (tx, rx) = std::sync::mpsc::channel();
    let _handle = Fail::<i32, _>::new(SensorError::Disconnected)
        .replace_error(0)
        .on_completion(move |result| {
            let _ = tx.send(result);
        });
    assert_eq!(rx.recv().unwrap(), Ok(Some(0)));
}

#[test]
fn upstream_failure_surfaces_once_in_events() {
    let events: Vec<_> = Sequence::new(vec![1, 2])
        .try_filter(|x: &i32| {
            anyhow::ensure!(*x < 2, "{} is too large", x);
            Ok(true)
        })
        .map_error(|error| error.to_string())
        .events()
        .collect();
    assert_eq!(events, vec![Ok(1), Err("2 is too large".to_string())]);
}
