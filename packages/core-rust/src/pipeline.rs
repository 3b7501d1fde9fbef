//! Pipeline combinator: left-to-right composition of stages.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::FlowResult;
use crate::stage::{IntoStage, Stage, Step};

/// An immutable, ordered composition of stages.
///
/// Calling a pipeline threads the input through every stage in declaration
/// order. Stages run synchronously until one returns a deferred step; from
/// that point the remaining stages run inside the returned future, each
/// starting only after its predecessor's value is available. A pipeline
/// with no stages is the identity.
pub struct Pipeline<T> {
    stages: Arc<[Stage<T>]>,
}

/// Compose `stages` into a [`Pipeline`].
pub fn pipe<T, I>(stages: I) -> Pipeline<T>
where
    T: Send + 'static,
    I: IntoIterator,
    I::Item: IntoStage<T>,
{
    stages.into_iter().collect()
}

/// Compose stages, pipelines, dispatchers or `Fn(T) -> T` closures.
///
/// ```
/// use flowpipe_core::pipe;
///
/// let pipeline = pipe![|x: i64| x + 1, |x: i64| x * 2, |x: i64| x - 3];
/// assert_eq!(pipeline.call(5).ready().unwrap().unwrap(), 9);
/// ```
#[macro_export]
macro_rules! pipe {
    () => {
        $crate::Pipeline::new()
    };
    ($($stage:expr),+ $(,)?) => {
        $crate::Pipeline::new()$(.then($stage))+
    };
}

impl<T: Send + 'static> Pipeline<T> {
    /// The identity pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Arc::from(Vec::new()),
        }
    }

    /// Returns a new pipeline with `stage` appended.
    #[must_use]
    pub fn then(self, stage: impl IntoStage<T>) -> Self {
        let mut stages = self.stages.to_vec();
        stages.push(stage.into_stage());
        Self {
            stages: stages.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn call(&self, input: T) -> Step<T> {
        let mut value = input;
        for (idx, stage) in self.stages.iter().enumerate() {
            match stage.apply(value) {
                Step::Ready(Ok(next)) => value = next,
                Step::Ready(Err(err)) => return Step::Ready(Err(err)),
                Step::Deferred(pending) => {
                    return Step::Deferred(Box::pin(resume(
                        pending,
                        Arc::clone(&self.stages),
                        idx + 1,
                    )));
                }
            }
        }
        Step::Ready(Ok(value))
    }
}

/// Await `pending`, then run `stages[from..]` strictly in order.
async fn resume<T: Send + 'static>(
    pending: BoxFuture<'static, FlowResult<T>>,
    stages: Arc<[Stage<T>]>,
    from: usize,
) -> FlowResult<T> {
    let mut value = pending.await?;
    for stage in &stages[from..] {
        value = stage.apply(value).await?;
    }
    Ok(value)
}

impl<T: Send + 'static> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            stages: Arc::clone(&self.stages),
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl<T, S> FromIterator<S> for Pipeline<T>
where
    T: Send + 'static,
    S: IntoStage<T>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().map(IntoStage::into_stage).collect(),
        }
    }
}

impl<T: Send + 'static> IntoStage<T> for Pipeline<T> {
    fn into_stage(self) -> Stage<T> {
        Stage::new(move |input| self.call(input))
    }
}

impl<T: Send + 'static> From<Pipeline<T>> for Stage<T> {
    fn from(pipeline: Pipeline<T>) -> Self {
        pipeline.into_stage()
    }
}
