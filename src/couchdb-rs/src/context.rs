use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Per-call context carrying an optional cancellation signal.
///
/// Without a token the request runs until the transport returns.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<CancellationToken>,
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
        }
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Run `future`, aborting it with [`Error::Cancelled`] if the token fires first.
    pub(crate) async fn run<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match &self.cancel {
            None => future.await,
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    result = future => result,
                }
            }
        }
    }
}
