use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// The error type for a model provider.
///
/// Errors are handed to the agent's caller as they are, so the kind must
/// be enough for the caller to decide what to do (e.g. re-prompt for a
/// key on [`ErrorKind::Authentication`]).
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A completion service that turns a conversation into the next message.
///
/// Once the provider is created, it should behave like a stateless object.
/// It can still have internal state (connection pools and the like), but
/// callers should not rely on it. A provider is shared by every run of an
/// agent, and may be used by several runs at the same time.
pub trait ModelProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// The response type for this provider.
    type Response: ModelResponse<Error = Self::Error>;

    /// Sends a request to the model.
    ///
    /// The returned future must not borrow from `self` or `req`. Failures
    /// should not be retried here; they are reported to the caller.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
