//! Bit-rate subscription add and remove
//!
//! Both requests carry the same `<path>`; the add request lists the metrics
//! wanted, the remove request only names the event type.

use crate::codec::XmlElement;
use crate::envelope::{Category, Command, EmptyBody, RequestBody, ResponseEnvelope};
use crate::operation::NeoOperation;
use crate::subscription::{removal_event_list_element, SubscriptionRequestSpec, SubscriptionTarget};
use crate::{ApiError, Result};

/// `<path>` plus `<event-list>`
#[derive(Debug, Clone)]
pub struct SubscriptionBody {
    pub path: XmlElement,
    pub event_list: XmlElement,
}

impl RequestBody for SubscriptionBody {
    fn children(&self) -> Vec<XmlElement> {
        vec![self.path.clone(), self.event_list.clone()]
    }
}

fn subscription_result(operation: &'static str, response: ResponseEnvelope<EmptyBody>) -> Result<()> {
    match response.failure() {
        Some(reason) => {
            let code = reason.code.unwrap_or_default();
            tracing::debug!(operation, code = %code, "Subscription exchange rejected");
            Err(ApiError::Subscription {
                code,
                message: reason.message,
            })
        }
        None => Ok(()),
    }
}

/// `add/subscription`
pub struct AddSubscriptionOperation;

impl NeoOperation for AddSubscriptionOperation {
    type Request = SubscriptionRequestSpec;
    type Body = SubscriptionBody;
    type ResponseBody = EmptyBody;
    type Response = ();

    const COMMAND: Command = Command::Add;
    const CATEGORY: Category = Category::Subscription;
    const NAME: &'static str = "subscribe";

    fn build_body(request: &SubscriptionRequestSpec) -> Result<SubscriptionBody> {
        request.target.validate()?;
        Ok(SubscriptionBody {
            path: request.target.to_path_element(),
            event_list: request.to_event_list_element(),
        })
    }

    fn parse_response(response: ResponseEnvelope<EmptyBody>) -> Result<()> {
        subscription_result(Self::NAME, response)
    }
}

/// `remove/subscription`
pub struct RemoveSubscriptionOperation;

impl NeoOperation for RemoveSubscriptionOperation {
    type Request = SubscriptionTarget;
    type Body = SubscriptionBody;
    type ResponseBody = EmptyBody;
    type Response = ();

    const COMMAND: Command = Command::Remove;
    const CATEGORY: Category = Category::Subscription;
    const NAME: &'static str = "unsubscribe";

    fn build_body(request: &SubscriptionTarget) -> Result<SubscriptionBody> {
        Ok(SubscriptionBody {
            path: request.to_path_element(),
            event_list: removal_event_list_element(),
        })
    }

    fn parse_response(response: ResponseEnvelope<EmptyBody>) -> Result<()> {
        subscription_result(Self::NAME, response)
    }
}
