//! Operations for the command/category pairs this client drives
//!
//! - `add/login`, `remove/login`
//! - `add/subscription`, `remove/subscription`
//! - `get/event`

pub mod event;
pub mod login;
pub mod subscription;

pub use event::GetEventOperation;
pub use login::{LoginBody, LoginOperation, LogoutOperation, UserBody};
pub use subscription::{AddSubscriptionOperation, RemoveSubscriptionOperation, SubscriptionBody};
