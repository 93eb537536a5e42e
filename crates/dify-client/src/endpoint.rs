//! The seam between endpoint models and the executors.

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::request::Request;

/// An API endpoint call.
///
/// Implementors describe one call as a [`Request`] and name the type its
/// successful JSON body decodes into.
pub trait Endpoint {
    /// Decoded body of a successful response.
    type Output: DeserializeOwned;

    /// Describe the call.
    fn to_request(&self) -> Result<Request>;
}
