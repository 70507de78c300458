//! Combining several publishers.

use backflow::combinators::MergeMany;
use backflow::testing::{Event, Recorder};
use backflow::{
    Completion, CurrentValueSubject, Just, Never, PassthroughSubject, Publisher, PublisherExt,
    Sequence,
};

#[test]
fn combine_latest_stays_open_until_every_branch_finishes() {
    let a = PassthroughSubject::<i32, ()>::new();
    let b = PassthroughSubject::<i32, ()>::new();
    let recorder = Recorder::new();
    a.clone().combine_latest(b.clone()).subscribe(recorder.clone());
    a.send(1);
    b.send(10);
    b.send_completion(Completion::Finished);
    a.send(2);
    assert_eq!(recorder.values(), vec![(1, 10), (2, 10)]);
    assert_eq!(recorder.completions(), 0);
    assert!(recorder.is_subscribed());
}

#[test]
fn combine_latest_of_current_values() {
    let width = CurrentValueSubject::<u32, Never>::new(4);
    let height = CurrentValueSubject::<u32, Never>::new(3);
    let recorder = Recorder::new();
    width
        .clone()
        .combine_latest_map(height.clone(), |(w, h)| w * h)
        .remove_duplicates()
        .subscribe(recorder.clone());
    width.send(6);
    height.send(2);
    width.send(4);
    height.send(3);
    assert_eq!(recorder.values(), vec![12, 18, 12, 8, 12]);
}

#[test]
fn zip_drops_unpaired_values() {
    let recorder = Recorder::new();
    Sequence::new(vec![1, 2, 3])
        .zip(Sequence::new(vec![10, 20]))
        .subscribe(recorder.clone());
    assert_eq!(
        recorder.events(),
        vec![
            Event::Subscribed,
            Event::Value((1, 10)),
            Event::Value((2, 20)),
            Event::Completed(Completion::Finished)
        ]
    );
}

#[test]
fn zip_of_four_and_five() {
    let recorder = Recorder::new();
    Just::new('a')
        .zip4(Just::new(1), Just::new("x"), Just::new(2.5))
        .subscribe(recorder.clone());
    assert_eq!(recorder.values(), vec![('a', 1, "x", 2.5)]);

    let recorder = Recorder::new();
    Sequence::new(vec![1, 2])
        .zip5_map(
            Sequence::new(vec![1, 2]),
            Sequence::new(vec![1, 2]),
            Sequence::new(vec![1, 2]),
            Sequence::new(vec![1]),
            |(a, b, c, d, e)| a * b * c * d * e,
        )
        .subscribe(recorder.clone());
    assert_eq!(recorder.values(), vec![1]);
    assert!(recorder.is_finished());
}

#[test]
fn merge_failure_cancels_the_other_branch() {
    let a = PassthroughSubject::<i32, &str>::new();
    let b = PassthroughSubject::<i32, &str>::new();
    let recorder = Recorder::new();
    a.clone().merge(b.clone()).subscribe(recorder.clone());
    a.send(1);
    b.send(2);
    b.send(3);
    a.send_completion(Completion::Failure("E"));
    b.send(4);
    assert_eq!(
        recorder.events(),
        vec![
            Event::Subscribed,
            Event::Value(1),
            Event::Value(2),
            Event::Value(3),
            Event::Completed(Completion::Failure("E"))
        ]
    );
    assert_eq!(b.subscriber_count(), 0);
}

#[test]
fn downstream_cancel_reaches_every_branch() {
    let subjects: Vec<_> = (0..4)
        .map(|_| PassthroughSubject::<i32, ()>::new())
        .collect();
    let recorder = Recorder::new();
    MergeMany::new(subjects.iter().cloned())
        .map(|x| x * 2)
        .subscribe(recorder.clone());
    subjects[2].send(21);
    recorder.cancel();
    assert_eq!(recorder.values(), vec![42]);
    assert!(subjects.iter().all(|s| s.subscriber_count() == 0));
}

#[test]
fn nested_combinators() {
    let recorder = Recorder::new();
    Sequence::new(vec![1, 2])
        .merge(Sequence::new(vec![3]))
        .zip(Just::new(true).combine_latest(Sequence::new(vec!['a', 'b', 'c'])))
        .map(|(n, (flag, c))| format!("{}{}{}", n, c, flag))
        .subscribe(recorder.clone());
    assert_eq!(
        recorder.values(),
        vec!["1atrue".to_string(), "2btrue".to_string(), "3ctrue".to_string()]
    );
    assert!(recorder.is_finished());
}

#[test]
fn values_count_across_merge3() {
    let recorder = Recorder::new();
    Sequence::new(0..5)
        .merge3(Sequence::new(5..7), Sequence::new(7..10))
        .count()
        .subscribe(recorder.clone());
    assert_eq!(recorder.values(), vec![10]);
}
