use std::time::Duration;

/// Runtime options of the client that are not part of the configuration
/// document.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Upper bound on waiting for a single worker to stop during shutdown.
    pub worker_stop_timeout: Duration,
    /// Describe the domain while building a connection so that a missing
    /// domain fails start instead of the first workflow call.
    pub verify_domain: bool,
    /// Timeout for workflow operations whose context sets none.
    pub default_call_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            worker_stop_timeout: Duration::from_secs(10),
            verify_domain: true,
            default_call_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_options_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.worker_stop_timeout, Duration::from_secs(10));
        assert!(options.verify_domain);
        assert_eq!(options.default_call_timeout, Duration::from_secs(30));
    }
}
