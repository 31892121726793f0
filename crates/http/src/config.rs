use std::time::Duration;

const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(30);

/// Builder for [`EndpointConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointConfigBuilder {
    url: String,
    retry_budget: Option<Duration>,
}

impl EndpointConfigBuilder {
    /// Creates a builder with the given agent endpoint URL.
    #[inline]
    pub fn with_url<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            retry_budget: None,
        }
    }

    /// Sets how long the endpoint keeps retrying transient connection
    /// failures before surfacing them.
    #[inline]
    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = Some(budget);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> EndpointConfig {
        EndpointConfig {
            url: self.url,
            retry_budget: self.retry_budget.unwrap_or(DEFAULT_RETRY_BUDGET),
        }
    }
}

/// Configuration for the HTTP agent endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointConfig {
    pub(crate) url: String,
    pub(crate) retry_budget: Duration,
}
