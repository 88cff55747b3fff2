//! Session lifecycle tests against a scripted device
//!
//! The scripted transport answers each POST with the next queued reply and
//! records every request body, so the tests can check both the state machine
//! and the exact exchanges it produced.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use neo_api::{
    ApiError, ClientState, Credential, NeoClient, SessionMode, SubscriptionRequestSpec,
    SubscriptionTarget,
};
use neo_transport::{Transport, TransportError};

const LOGIN_OK: &str = r#"<response id="G1000" origin="device" destination="gui" command="add" category="login" time="2015-06-26T16:37:08.524Z" protocol-version="2.3" platform-name="neo" sw-version="me7k.1.0.1" sw-build="1"><session sid="1435336628026" type="pull" activity-timeout="300000" auth-method="local" farmer-id="ME-7000-2" client-ip="10.45.0.154"/></response>"#;

const LOGIN_SESSIONS_EXCEEDED: &str = r#"<?xml version="1.0" encoding="UTF-8"?><response id="beacham" origin="device" destination="transcoder-collector" command="add" category="login" time="2017-08-30T23:24:54.900Z" protocol-version="2.1" platform-name="neo" sw-version="me7k.2.1.2" sw-build="0" status="error"><reason error-code="Unknown_Error"><![CDATA[Number of sessions exceeded the maximum of 8.]]></reason></response>"#;

const SUBSCRIBE_OK: &str = r#"<response id="G1001" origin="device" destination="gui" command="add" category="subscription" protocol-version="2.3" platform-name="neo" sid="1435336628026"><reason error-code="OK"><![CDATA[subscription completed.]]></reason></response>"#;

const SUBSCRIBE_REJECTED: &str = r#"<response id="G1001" command="add" category="subscription" status="error"><reason error-code="Invalid_Path"><![CDATA[No such output mux.]]></reason></response>"#;

const POLL_EMPTY: &str = r#"<response id="G1002" origin="device" destination="gui" command="get" category="event" time="2015-06-26T16:37:59.692Z" protocol-version="2.3" platform-name="neo" sw-version="me7k.1.0.1" sw-build="1" pending-events="0"/>"#;

const UNSUBSCRIBE_OK: &str = r#"<response id="G1003" command="remove" category="subscription"><reason error-code="OK"><![CDATA[unsuscribe completed.]]></reason></response>"#;

const LOGOUT_OK: &str = r#"<response id="G1004" command="remove" category="login"><reason err-code="OK">succeeded</reason></response>"#;

struct ScriptedDevice {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedDevice {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, command: &str, category: &str) -> usize {
        let needle = format!(r#"command="{}" category="{}""#, command, category);
        self.requests().iter().filter(|r| r.contains(&needle)).count()
    }
}

#[async_trait]
impl Transport for ScriptedDevice {
    async fn post(&self, body: String) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(body);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".to_string())))
    }

    fn endpoint(&self) -> &str {
        "http://scripted/neoreq/"
    }
}

fn credential() -> Credential {
    Credential::new("Admin", "", SessionMode::Pull)
}

fn mux_spec() -> SubscriptionRequestSpec {
    SubscriptionRequestSpec::new(SubscriptionTarget::mux("ME-7000-2", "4", "4/3", "0000"))
}

#[tokio::test]
async fn test_end_to_end_pull_session() {
    let device = ScriptedDevice::new(&[LOGIN_OK, SUBSCRIBE_OK, POLL_EMPTY, UNSUBSCRIBE_OK, LOGOUT_OK]);
    let mut client = NeoClient::new(device);

    let session = client.login(&credential()).await.unwrap();
    assert_eq!(session.session_id, "1435336628026");
    assert_eq!(client.state(), ClientState::Authenticated);

    client.subscribe(mux_spec()).await.unwrap();
    assert_eq!(client.state(), ClientState::Subscribed);

    let events = client.poll_once().await.unwrap();
    assert!(events.is_empty());
    assert_eq!(events.pending_events, 0);
    assert_eq!(client.state(), ClientState::Polling);

    client.unsubscribe().await.unwrap();
    assert_eq!(client.state(), ClientState::Unsubscribing);

    client.logout().await.unwrap();
    assert_eq!(client.state(), ClientState::LoggedOut);
    assert!(client.session().is_none());

    assert_eq!(
        client.state_history(),
        &[
            ClientState::Unauthenticated,
            ClientState::Authenticated,
            ClientState::Subscribed,
            ClientState::Polling,
            ClientState::Unsubscribing,
            ClientState::LoggedOut,
        ]
    );

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 5);
    assert!(!requests[0].contains("sid="));
    for request in &requests[1..] {
        assert!(request.contains(r#"sid="1435336628026""#));
    }
    assert!(requests[2].ends_with(r#"sid="1435336628026"/>"#));
}

#[tokio::test]
async fn test_session_limit_login_stops_everything() {
    let device = ScriptedDevice::new(&[LOGIN_SESSIONS_EXCEEDED]);
    let mut client = NeoClient::new(device);

    match client.login(&credential()).await {
        Err(ApiError::Auth { code, message }) => {
            assert_eq!(code, "Unknown_Error");
            assert_eq!(message, "Number of sessions exceeded the maximum of 8.");
        }
        other => panic!("Expected ApiError::Auth, got {:?}", other),
    }
    assert_eq!(client.state(), ClientState::Unauthenticated);

    assert!(matches!(
        client.subscribe(mux_spec()).await,
        Err(ApiError::InvalidState(_))
    ));
    client.teardown().await;

    assert_eq!(client.transport().requests().len(), 1);
    assert_eq!(client.state(), ClientState::Unauthenticated);
}

#[tokio::test]
async fn test_subscribe_while_unauthenticated_sends_nothing() {
    let mut client = NeoClient::new(ScriptedDevice::new(&[]));

    let result = client.subscribe(mux_spec()).await;

    assert!(matches!(result, Err(ApiError::InvalidState(_))));
    assert!(client.transport().requests().is_empty());
    assert!(client.subscription().is_none());
}

#[tokio::test]
async fn test_subscribed_run_tears_down_exactly_once() {
    let device = ScriptedDevice::new(&[LOGIN_OK, SUBSCRIBE_OK, POLL_EMPTY, UNSUBSCRIBE_OK, LOGOUT_OK]);
    let mut client = NeoClient::new(device);

    client.login(&credential()).await.unwrap();
    client.subscribe(mux_spec()).await.unwrap();
    client.poll_once().await.unwrap();

    client.teardown().await;
    client.teardown().await;

    let device = client.transport();
    assert_eq!(device.count("remove", "subscription"), 1);
    assert_eq!(device.count("remove", "login"), 1);
    assert_eq!(client.state(), ClientState::LoggedOut);
}

#[tokio::test]
async fn test_rejected_subscription_still_torn_down() {
    let device = ScriptedDevice::new(&[LOGIN_OK, SUBSCRIBE_REJECTED, UNSUBSCRIBE_OK, LOGOUT_OK]);
    let mut client = NeoClient::new(device);

    client.login(&credential()).await.unwrap();
    match client.subscribe(mux_spec()).await {
        Err(ApiError::Subscription { code, message }) => {
            assert_eq!(code, "Invalid_Path");
            assert_eq!(message, "No such output mux.");
        }
        other => panic!("Expected ApiError::Subscription, got {:?}", other),
    }
    assert_eq!(client.state(), ClientState::Failed);
    assert!(matches!(client.poll_once().await, Err(ApiError::InvalidState(_))));

    client.teardown().await;

    let device = client.transport();
    assert_eq!(device.count("remove", "subscription"), 1);
    assert_eq!(device.count("remove", "login"), 1);
    assert_eq!(client.state(), ClientState::LoggedOut);
}

#[tokio::test]
async fn test_poll_failure_keeps_state() {
    let device = ScriptedDevice::new(&[LOGIN_OK, SUBSCRIBE_OK]);
    device.push_error(TransportError::Timeout("5s elapsed".to_string()));
    device.replies.lock().unwrap().push_back(Ok(POLL_EMPTY.to_string()));
    let mut client = NeoClient::new(device);

    client.login(&credential()).await.unwrap();
    client.subscribe(mux_spec()).await.unwrap();

    assert!(matches!(
        client.poll_once().await,
        Err(ApiError::Transport(TransportError::Timeout(_)))
    ));
    assert_eq!(client.state(), ClientState::Subscribed);

    client.poll_once().await.unwrap();
    assert_eq!(client.state(), ClientState::Polling);
}

#[tokio::test]
async fn test_failed_logout_still_clears_session() {
    let device = ScriptedDevice::new(&[LOGIN_OK]);
    device.push_error(TransportError::Status(503));
    let mut client = NeoClient::new(device);

    client.login(&credential()).await.unwrap();
    assert!(client.logout().await.is_err());

    assert!(client.session().is_none());
    assert_eq!(client.state(), ClientState::LoggedOut);

    client.logout().await.unwrap();
    assert_eq!(client.transport().requests().len(), 2);
}

#[tokio::test]
async fn test_push_session_cannot_poll() {
    let login_push = LOGIN_OK.replace(r#"type="pull""#, r#"type="push""#);
    let device = ScriptedDevice::new(&[login_push.as_str(), SUBSCRIBE_OK]);
    let mut client = NeoClient::new(device);

    client
        .login(&Credential::new("Admin", "", SessionMode::Push))
        .await
        .unwrap();
    client.subscribe(mux_spec()).await.unwrap();

    assert!(matches!(client.poll_once().await, Err(ApiError::InvalidState(_))));
    assert_eq!(client.transport().requests().len(), 2);
}

#[tokio::test]
async fn test_subscription_request_renders_self_closing_path() {
    let device = ScriptedDevice::new(&[LOGIN_OK, SUBSCRIBE_OK]);
    let mut client = NeoClient::new(device);

    client.login(&credential()).await.unwrap();
    client
        .subscribe(mux_spec().with_avg_bitrate(false))
        .await
        .unwrap();

    let requests = client.transport().requests();
    let subscribe = &requests[1];
    assert!(subscribe.contains(r#"command="add" category="subscription""#));
    assert!(subscribe.ends_with(concat!(
        r#"<path><farmer id="ME-7000-2"/><board id="4"/><gige-line id="4/3"/><gige-output-mux id="0000"/></path>"#,
        r#"<event-list><event type="bit-rate-event" get-streams="true" get-std-dev="true" get-inst-br="true" get-avg-br="false"/></event-list>"#,
        "</request>"
    )));
}
