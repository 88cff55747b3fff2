//! `get/event`: fetch the events a pull session has buffered
//!
//! The request carries nothing but the header and the session id:
//!
//! ```xml
//! <request id="G1111" origin="transcoder-collector" destination="device" command="get"
//!     category="event" time="..." protocol-version="2.1" platform-name="neo" sid="1435336628026"/>
//! ```

use crate::envelope::{Category, Command, EmptyBody, ResponseEnvelope};
use crate::events::DeviceEventEnvelope;
use crate::operation::NeoOperation;
use crate::{ApiError, Result};

pub struct GetEventOperation;

impl NeoOperation for GetEventOperation {
    type Request = ();
    type Body = EmptyBody;
    type ResponseBody = DeviceEventEnvelope;
    type Response = DeviceEventEnvelope;

    const COMMAND: Command = Command::Get;
    const CATEGORY: Category = Category::Event;
    const NAME: &'static str = "get event";

    fn build_body(_request: &()) -> Result<EmptyBody> {
        Ok(EmptyBody)
    }

    fn parse_response(response: ResponseEnvelope<DeviceEventEnvelope>) -> Result<DeviceEventEnvelope> {
        if let Some(reason) = response.failure() {
            return Err(ApiError::Rejected {
                operation: Self::NAME,
                code: reason.code.unwrap_or_default(),
                message: reason.message,
            });
        }
        Ok(response.body)
    }
}
