//! Regular expression matching on text values.

use regex::Regex;

use crate::completion::Completion;
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

type Compiled = Result<Regex, regex::Error>;

/// Turn a pattern that did not compile into the failure of the stream.
fn invalid(error: &regex::Error) -> anyhow::Error {
    anyhow::Error::new(error.clone())
}

/// Emits every match of a pattern in each value.
///
/// Each value becomes the list of matched substrings in order, which is
/// empty if nothing matched. A pattern that does not compile fails the stream
/// when the first value arrives.
///
/// ```
/// # use backflow::{PublisherExt, Sequence};
/// let found: Vec<_> = Sequence::new(vec!["a1b22", "none"])
///     .matches(r"\d+")
///     .events()
///     .map(|event| event.unwrap())
///     .collect();
/// assert_eq!(found, vec![vec!["1", "22"], vec![]]);
/// ```
#[derive(Clone)]
pub struct Matches<P> {
    upstream: P,
    expression: Compiled,
}

impl<P> Matches<P> {
    pub(crate) fn new(upstream: P, pattern: &str) -> Matches<P> {
        Matches {
            upstream,
            expression: Regex::new(pattern),
        }
    }
}

struct MatchesOp {
    expression: Compiled,
}

impl<I, E> Operator<I, E> for MatchesOp
where
    I: AsRef<str>,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = Vec<String>;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<Vec<String>, anyhow::Error> {
        match &self.expression {
            Ok(expression) => Step::Send(
                expression
                    .find_iter(input.as_ref())
                    .map(|found| found.as_str().to_owned())
                    .collect(),
            ),
            Err(error) => Step::Fail(invalid(error)),
        }
    }

    fn complete(
        &mut self,
        completion: Completion<E>,
    ) -> (Option<Vec<String>>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P> Publisher for Matches<P>
where
    P: Publisher,
    P::Output: AsRef<str>,
    P::Failure: Into<anyhow::Error>,
{
    type Output = Vec<String>;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = Vec<String>, Failure = anyhow::Error>,
    {
        let op = MatchesOp {
            expression: self.expression.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Tells for each value whether a pattern occurs in it.
///
/// Fails like `Matches` if the pattern does not compile.
#[derive(Clone)]
pub struct FirstMatch<P> {
    upstream: P,
    expression: Compiled,
}

impl<P> FirstMatch<P> {
    pub(crate) fn new(upstream: P, pattern: &str) -> FirstMatch<P> {
        FirstMatch {
            upstream,
            expression: Regex::new(pattern),
        }
    }
}

struct FirstMatchOp {
    expression: Compiled,
}

impl<I, E> Operator<I, E> for FirstMatchOp
where
    I: AsRef<str>,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = bool;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<bool, anyhow::Error> {
        match &self.expression {
            Ok(expression) => Step::Send(expression.is_match(input.as_ref())),
            Err(error) => Step::Fail(invalid(error)),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<bool>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P> Publisher for FirstMatch<P>
where
    P: Publisher,
    P::Output: AsRef<str>,
    P::Failure: Into<anyhow::Error>,
{
    type Output = bool;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = bool, Failure = anyhow::Error>,
    {
        let op = FirstMatchOp {
            expression: self.expression.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

#[cfg(test)]
mod test {
    use crate::completion::Never;
    use crate::ext::PublisherExt;
    use crate::publisher::Publisher;
    use crate::publishers::{PassthroughSubject, Sequence};
    use crate::testing::Recorder;

    #[test]
    fn every_occurrence_in_order() {
        let recorder = Recorder::new();
        Sequence::new(vec!["a1b22", "none", "7"])
            .matches(r"\d+")
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![vec!["1", "22"], vec![], vec!["7"]]);
        assert!(recorder.is_finished());
    }

    #[test]
    fn first_match_tells_presence() {
        let recorder = Recorder::new();
        Sequence::new(vec!["catalog".to_string(), "dog".to_string()])
            .first_match("^cat")
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![true, false]);
        assert!(recorder.is_finished());
    }

    #[test]
    fn invalid_pattern_fails_on_first_value() {
        let subject = PassthroughSubject::<&'static str, Never>::new();
        let recorder = Recorder::new();
        subject.clone().matches("(").subscribe(recorder.clone());
        assert_eq!(recorder.completions(), 0);
        subject.send("anything");
        assert!(recorder.values().is_empty());
        assert!(recorder.error_message().is_some());
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn invalid_pattern_without_values_finishes() {
        let recorder = Recorder::new();
        Sequence::new(Vec::<&str>::new())
            .first_match("[")
            .subscribe(recorder.clone());
        assert!(recorder.is_finished());
    }
}
