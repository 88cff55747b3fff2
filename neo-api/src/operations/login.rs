//! Login and logout
//!
//! ```xml
//! <request ... command="add" category="login">
//!   <user name="Admin" password="" type="pull"/>
//! </request>
//! ```
//!
//! A successful response carries a `<session>` element; a rejected one carries
//! `status="error"` and a `<reason>` instead.

use xmltree::Element;

use crate::codec::XmlElement;
use crate::envelope::{Category, Command, EmptyBody, RequestBody, ResponseBody, ResponseEnvelope};
use crate::operation::NeoOperation;
use crate::session::{Credential, Session};
use crate::{ApiError, Result};

/// Reason code reported when the device answers without a session
pub const MISSING_SESSION: &str = "Missing_Session";

/// Login request body
#[derive(Debug, Clone)]
pub struct UserBody(pub Credential);

impl RequestBody for UserBody {
    fn children(&self) -> Vec<XmlElement> {
        vec![self.0.to_element()]
    }

    fn redacted_children(&self) -> Vec<XmlElement> {
        vec![self.0.to_redacted_element()]
    }
}

/// Login response body
#[derive(Debug, Clone)]
pub struct LoginBody {
    pub session: Option<Session>,
}

impl ResponseBody for LoginBody {
    fn from_response(root: &Element) -> Result<Self> {
        let session = root
            .get_child("session")
            .map(Session::from_element)
            .transpose()?;
        Ok(Self { session })
    }
}

/// `add/login`
pub struct LoginOperation;

impl NeoOperation for LoginOperation {
    type Request = Credential;
    type Body = UserBody;
    type ResponseBody = LoginBody;
    type Response = Session;

    const COMMAND: Command = Command::Add;
    const CATEGORY: Category = Category::Login;
    const NAME: &'static str = "login";
    const REQUIRES_SESSION: bool = false;

    fn build_body(request: &Credential) -> Result<UserBody> {
        if request.username.trim().is_empty() {
            return Err(ApiError::InvalidParameter("username must not be empty".to_string()));
        }
        Ok(UserBody(request.clone()))
    }

    fn parse_response(response: ResponseEnvelope<LoginBody>) -> Result<Session> {
        if let Some(reason) = response.failure() {
            return Err(ApiError::Auth {
                code: reason.code.unwrap_or_default(),
                message: reason.message,
            });
        }

        match response.body.session {
            Some(session) if !session.session_id.trim().is_empty() => Ok(session),
            Some(_) => Err(ApiError::Auth {
                code: MISSING_SESSION.to_string(),
                message: "Login response carried an empty session id".to_string(),
            }),
            None => Err(ApiError::Auth {
                code: MISSING_SESSION.to_string(),
                message: "Login response carried no session element".to_string(),
            }),
        }
    }
}

/// `remove/login`
pub struct LogoutOperation;

impl NeoOperation for LogoutOperation {
    type Request = ();
    type Body = EmptyBody;
    type ResponseBody = EmptyBody;
    type Response = ();

    const COMMAND: Command = Command::Remove;
    const CATEGORY: Category = Category::Login;
    const NAME: &'static str = "logout";

    fn build_body(_request: &()) -> Result<EmptyBody> {
        Ok(EmptyBody)
    }

    fn parse_response(response: ResponseEnvelope<EmptyBody>) -> Result<()> {
        match response.failure() {
            Some(reason) => Err(ApiError::Rejected {
                operation: Self::NAME,
                code: reason.code.unwrap_or_default(),
                message: reason.message,
            }),
            None => Ok(()),
        }
    }
}
