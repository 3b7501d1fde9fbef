/// Errors returned by pipelines and dispatchers.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The dispatcher exhausted every configured property without a key match.
    /// A request missing a configured property lands here too.
    #[error("no matching route found (attempted properties: [{}])", .attempted.join(", "))]
    RouteNotFound {
        /// Property names tried, in declaration order.
        attempted: Vec<String>,
    },
    /// A stage or handler failed; the source error is carried unchanged.
    #[error(transparent)]
    Stage(#[from] anyhow::Error),
}

impl FlowError {
    /// Wrap any error raised by stage code.
    pub fn stage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FlowError::Stage(anyhow::Error::new(err))
    }

    #[must_use]
    pub fn is_route_not_found(&self) -> bool {
        matches!(self, FlowError::RouteNotFound { .. })
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
