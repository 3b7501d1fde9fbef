//! Stages: the unary function values that pipelines and dispatchers compose.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, Either, Ready};

use crate::error::{FlowError, FlowResult};

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// Result of invoking a stage: available now, or deferred until a future resolves.
///
/// Every `Step` can be `.await`ed. A `Ready` step can also be consumed
/// synchronously with [`Step::ready`].
pub enum Step<T> {
    Ready(FlowResult<T>),
    Deferred(BoxFuture<'static, FlowResult<T>>),
}

impl<T> Step<T> {
    pub fn ok(value: T) -> Self {
        Step::Ready(Ok(value))
    }

    pub fn err(err: impl Into<FlowError>) -> Self {
        Step::Ready(Err(err.into()))
    }

    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = FlowResult<T>> + Send + 'static,
    {
        Step::Deferred(Box::pin(fut))
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Step::Deferred(_))
    }

    /// The synchronous result, or `None` if the step is deferred.
    #[must_use]
    pub fn ready(self) -> Option<FlowResult<T>> {
        match self {
            Step::Ready(result) => Some(result),
            Step::Deferred(_) => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Step::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl<T> IntoFuture for Step<T> {
    type Output = FlowResult<T>;
    type IntoFuture = Either<Ready<FlowResult<T>>, BoxFuture<'static, FlowResult<T>>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Step::Ready(result) => Either::Left(future::ready(result)),
            Step::Deferred(pending) => Either::Right(pending),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

type StageFn<T> = dyn Fn(T) -> Step<T> + Send + Sync;

/// A single unary transformation. Cheap to clone; clones share the function.
pub struct Stage<T> {
    f: Arc<StageFn<T>>,
}

impl<T: 'static> Stage<T> {
    /// A stage from a function returning a [`Step`] directly.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(T) -> Step<T> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Infallible synchronous stage.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::new(move |input| Step::ok(f(input)))
    }

    /// Fallible synchronous stage.
    pub fn try_map<F, E>(f: F) -> Self
    where
        F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
        E: Into<FlowError>,
    {
        Self::new(move |input| Step::Ready(f(input).map_err(Into::into)))
    }

    /// Infallible asynchronous stage.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::new(move |input| {
            let fut = f(input);
            Step::deferred(async move { Ok(fut.await) })
        })
    }

    /// Fallible asynchronous stage.
    pub fn try_deferred<F, Fut, E>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<FlowError>,
    {
        Self::new(move |input| {
            let fut = f(input);
            Step::deferred(async move { fut.await.map_err(Into::into) })
        })
    }

    #[must_use]
    pub fn identity() -> Self {
        Self::new(Step::ok)
    }

    pub fn apply(&self, input: T) -> Step<T> {
        (self.f)(input)
    }
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<T> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// IntoStage
// ---------------------------------------------------------------------------

/// Conversion into a [`Stage`]. Implemented for stages, pipelines,
/// dispatchers, and plain `Fn(T) -> T` closures.
pub trait IntoStage<T> {
    fn into_stage(self) -> Stage<T>;
}

impl<T> IntoStage<T> for Stage<T> {
    fn into_stage(self) -> Stage<T> {
        self
    }
}

impl<T, F> IntoStage<T> for F
where
    T: 'static,
    F: Fn(T) -> T + Send + Sync + 'static,
{
    fn into_stage(self) -> Stage<T> {
        Stage::map(self)
    }
}
