use crate::envelope::{Category, Command, RequestBody, ResponseBody, ResponseEnvelope};
use crate::error::Result;

/// Base trait for all neo protocol operations
///
/// Each operation pairs a command/category with the typed request body it
/// sends and the typed response body it expects, so the client can drive any
/// of them through one exchange path.
pub trait NeoOperation {
    /// Caller-facing request data
    type Request;

    /// Children of the `<request>` element
    type Body: RequestBody;

    /// Typed view of the `<response>` document
    type ResponseBody: ResponseBody;

    /// Caller-facing result
    type Response;

    const COMMAND: Command;

    const CATEGORY: Category;

    /// Name used in logs and rejection errors
    const NAME: &'static str;

    /// Whether the request must carry the session id
    ///
    /// Only login goes out without one.
    const REQUIRES_SESSION: bool = true;

    /// Build the request body from the request data
    fn build_body(request: &Self::Request) -> Result<Self::Body>;

    /// Turn the decoded response into the typed result
    ///
    /// Implementations map a device rejection to the error variant that fits
    /// the operation.
    fn parse_response(response: ResponseEnvelope<Self::ResponseBody>) -> Result<Self::Response>;
}
