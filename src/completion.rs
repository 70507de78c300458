//! Terminal signals.

/// Failure type of publishers that cannot fail.
pub type Never = std::convert::Infallible;

/// The terminal signal of a subscription.
///
/// Exactly one completion ends every subscription that is not cancelled, and
/// nothing is delivered after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion<E> {
    /// The publisher will not produce any more values.
    Finished,
    /// The publisher stopped because of an error.
    Failure(E),
}

impl<E> Completion<E> {
    /// Transform the error, leaving `Finished` untouched.
    ///
    /// ```
    /// # use backflow::Completion;
    /// let failed: Completion<i32> = Completion::Failure(4);
    /// assert_eq!(failed.map_error(|n| n * 2), Completion::Failure(8));
    /// ```
    pub fn map_error<F, G>(self, f: G) -> Completion<F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            Completion::Finished => Completion::Finished,
            Completion::Failure(error) => Completion::Failure(f(error)),
        }
    }

    /// The error, if this completion is a failure.
    pub fn error(&self) -> Option<&E> {
        match self {
            Completion::Finished => None,
            Completion::Failure(error) => Some(error),
        }
    }

    /// Consume the completion and return its error, if any.
    pub fn into_error(self) -> Option<E> {
        match self {
            Completion::Finished => None,
            Completion::Failure(error) => Some(error),
        }
    }

    /// Whether this is a normal completion.
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }

    /// `Ok(())` for `Finished`, `Err(error)` for a failure.
    pub fn into_result(self) -> Result<(), E> {
        match self {
            Completion::Finished => Ok(()),
            Completion::Failure(error) => Err(error),
        }
    }
}

impl<E> From<Result<(), E>> for Completion<E> {
    fn from(result: Result<(), E>) -> Completion<E> {
        match result {
            Ok(()) => Completion::Finished,
            Err(error) => Completion::Failure(error),
        }
    }
}

impl Completion<Never> {
    /// Widen a completion that cannot fail to any failure type.
    pub fn never_fails<E>(self) -> Completion<E> {
        self.map_error(|never| match never {})
    }
}
