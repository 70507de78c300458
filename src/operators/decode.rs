//! Decoding raw values into typed items.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::completion::Completion;
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

/// Turns one encoded `Input` into an `Item`.
///
/// Implemented by codec adapters. Any closure of the right shape is a
/// decoder too.
pub trait Decoder<Input, Item>: Send + Sync + 'static {
    /// The error of a failed decode.
    type Error: Into<anyhow::Error>;

    /// Decode a single input.
    fn decode(&self, input: Input) -> Result<Item, Self::Error>;
}

impl<Input, Item, E, F> Decoder<Input, Item> for F
where
    F: Fn(Input) -> Result<Item, E> + Send + Sync + 'static,
    E: Into<anyhow::Error>,
{
    type Error = E;

    fn decode(&self, input: Input) -> Result<Item, E> {
        self(input)
    }
}

/// Decodes JSON documents with `serde_json`.
///
/// Accepts anything that can be viewed as bytes, such as `Vec<u8>`,
/// `String` or `&'static str`.
///
/// ```
/// # use backflow::{JsonDecoder, PublisherExt, Sequence};
/// #[derive(serde::Deserialize, Debug, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// let points: Vec<_> = Sequence::new(vec![r#"{"x": 1, "y": 2}"#])
///     .decode::<Point, _>(JsonDecoder)
///     .events()
///     .map(|event| event.unwrap())
///     .collect();
/// assert_eq!(points, vec![Point { x: 1, y: 2 }]);
/// ```
#[cfg(feature = "json")]
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDecoder;

#[cfg(feature = "json")]
impl<Input, Item> Decoder<Input, Item> for JsonDecoder
where
    Input: AsRef<[u8]>,
    Item: serde::de::DeserializeOwned,
{
    type Error = serde_json::Error;

    fn decode(&self, input: Input) -> Result<Item, serde_json::Error> {
        serde_json::from_slice(input.as_ref())
    }
}

/// Applies a `Decoder` to every value.
///
/// A decode error cancels upstream and fails the stream.
pub struct Decode<P, D, T> {
    upstream: P,
    decoder: Arc<D>,
    item: PhantomData<fn() -> T>,
}

impl<P: Clone, D, T> Clone for Decode<P, D, T> {
    fn clone(&self) -> Decode<P, D, T> {
        Decode {
            upstream: self.upstream.clone(),
            decoder: self.decoder.clone(),
            item: PhantomData,
        }
    }
}

impl<P, D, T> Decode<P, D, T> {
    pub(crate) fn new(upstream: P, decoder: D) -> Decode<P, D, T> {
        Decode {
            upstream,
            decoder: Arc::new(decoder),
            item: PhantomData,
        }
    }
}

struct DecodeOp<D, T> {
    decoder: Arc<D>,
    item: PhantomData<fn() -> T>,
}

impl<I, E, D, T> Operator<I, E> for DecodeOp<D, T>
where
    D: Decoder<I, T>,
    T: Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = T;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<T, anyhow::Error> {
        match self.decoder.decode(input) {
            Ok(item) => Step::Send(item),
            Err(error) => Step::Fail(error.into()),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<T>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P, D, T> Publisher for Decode<P, D, T>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    D: Decoder<P::Output, T>,
    T: Send + 'static,
{
    type Output = T;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = T, Failure = anyhow::Error>,
    {
        let op = DecodeOp {
            decoder: self.decoder.clone(),
            item: PhantomData,
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

#[cfg(test)]
mod test {
    use std::num::ParseIntError;

    use crate::ext::PublisherExt;
    use crate::publisher::Publisher;
    use crate::publishers::{PassthroughSubject, Sequence};
    use crate::testing::Recorder;

    #[test]
    fn closure_decoder() {
        let recorder = Recorder::new();
        Sequence::new(vec!["1", "22", "x", "4"])
            .decode::<i32, _>(|s: &str| s.parse::<i32>())
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1, 22]);
        let expected = "x".parse::<i32>().unwrap_err();
        assert_eq!(recorder.error_message(), Some(expected.to_string()));
    }

    #[test]
    fn decode_error_cancels_upstream() {
        let subject = PassthroughSubject::<String, ParseIntError>::new();
        let recorder = Recorder::new();
        subject
            .clone()
            .decode::<u8, _>(|s: String| s.parse::<u8>())
            .subscribe(recorder.clone());
        subject.send("300".to_string());
        assert_eq!(subject.subscriber_count(), 0);
        assert_eq!(recorder.completions(), 1);
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_records() {
        use serde::Deserialize;

        use crate::operators::JsonDecoder;

        #[derive(Clone, Debug, Deserialize, PartialEq)]
        struct Reading {
            sensor: String,
            celsius: f64,
        }

        let recorder = Recorder::new();
        Sequence::new(vec![
            br#"{"sensor": "porch", "celsius": 11.5}"#.to_vec(),
            b"not json".to_vec(),
        ])
        .decode::<Reading, _>(JsonDecoder)
        .subscribe(recorder.clone());
        assert_eq!(
            recorder.values(),
            vec![Reading {
                sensor: "porch".into(),
                celsius: 11.5
            }]
        );
        assert!(recorder.error_message().is_some());
    }
}
