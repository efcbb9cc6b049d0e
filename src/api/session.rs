use tracing::{Instrument, Span, field};

use crate::schema::{
    AccountDetails, AccountEnvelope, GameStatus, Leaderboard, Ship, ShipList, StatusBody,
};

use super::decode::{ServerError, decode_envelope};
use super::error::ApiError;
use super::transport::Transport;

/// Public game API host.
pub const DEFAULT_BASE_URL: &str = "https://api.spacetraders.io";

// ------------------------------------------------------------
// Endpoints
// ------------------------------------------------------------
//
// Pre-built GET urls, one per read operation. The token travels
// as the `token` query parameter on every call.
//
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub account: String,
    pub ships: String,
    pub leaderboard: String,
    pub status: String,
}

impl Endpoints {
    pub fn new(base_url: &str, token: &str) -> Self {
        let base = base_url.trim_end_matches('/');

        Self {
            account: format!("{base}/my/account?token={token}"),
            ships: format!("{base}/my/ships?token={token}"),
            leaderboard: format!("{base}/game/leaderboard/net-worth?token={token}"),
            status: format!("{base}/game/status?token={token}"),
        }
    }
}

/// Authenticated, read-only view of one account.
///
/// Owns the transport and the pre-built endpoints (and through them
/// the credential). Every operation:
/// - issues one GET through the transport
/// - resets the stored server error to the sentinel on transport success
/// - decodes the domain half and the embedded server error
/// - fails with `ApiError::Server` when the server reported one
///
/// Each call runs inside its own tracing span tagged with the username
/// from the latest successful account fetch.
pub struct Session<T> {
    transport: T,
    endpoints: Endpoints,
    details: AccountDetails,
    last_error: ServerError,
}

impl<T: Transport> Session<T> {
    /// Logs in by fetching the account details once.
    ///
    /// Fails when that first fetch fails; on success the session
    /// already holds populated details.
    pub async fn open(transport: T, endpoints: Endpoints) -> Result<Self, ApiError> {
        let mut session = Self {
            transport,
            endpoints,
            details: AccountDetails::default(),
            last_error: ServerError::none(),
        };

        let span = tracing::info_span!(
            "user_login",
            otel.name = "user_login",
            otel.status_code = field::Empty,
            error = field::Empty,
        );

        if let Err(e) = session
            .fetch_account_details()
            .instrument(span.clone())
            .await
        {
            record_failure(&span, &e);
            return Err(e);
        }

        Ok(session)
    }

    /// Account details of the latest successful fetch.
    pub fn details(&self) -> &AccountDetails {
        &self.details
    }

    pub fn username(&self) -> &str {
        &self.details.username
    }

    /// Server error seen by the latest call, sentinel when none.
    #[cfg(test)]
    pub fn last_error(&self) -> &ServerError {
        &self.last_error
    }

    /// GET /my/account
    pub async fn fetch_account_details(&mut self) -> Result<&AccountDetails, ApiError> {
        let span = self.operation_span("get_user_details");
        let url = self.endpoints.account.clone();

        let envelope: AccountEnvelope = self
            .read(&url)
            .instrument(span.clone())
            .await
            .inspect_err(|e| record_failure(&span, e))?;

        self.details = envelope.user;
        Ok(&self.details)
    }

    /// GET /my/ships
    pub async fn fetch_ships(&mut self) -> Result<Vec<Ship>, ApiError> {
        let span = self.operation_span("get_ships");
        let url = self.endpoints.ships.clone();

        let list: ShipList = self
            .read(&url)
            .instrument(span.clone())
            .await
            .inspect_err(|e| record_failure(&span, e))?;

        Ok(list.ships)
    }

    /// GET /game/leaderboard/net-worth
    pub async fn fetch_leaderboard(&mut self) -> Result<Leaderboard, ApiError> {
        let span = self.operation_span("get_leaderboard");
        let url = self.endpoints.leaderboard.clone();

        self.read(&url)
            .instrument(span.clone())
            .await
            .inspect_err(|e| record_failure(&span, e))
    }

    /// GET /game/status
    ///
    /// Unknown status text maps to `Unavailable`, never to an error.
    pub async fn fetch_status(&mut self) -> Result<GameStatus, ApiError> {
        let span = self.operation_span("get_game_status");
        let url = self.endpoints.status.clone();

        let body: StatusBody = self
            .read(&url)
            .instrument(span.clone())
            .await
            .inspect_err(|e| record_failure(&span, e))?;

        Ok(GameStatus::from_text(body.text()))
    }

    fn operation_span(&self, name: &'static str) -> Span {
        tracing::info_span!(
            "fetch",
            otel.name = name,
            otel.status_code = field::Empty,
            operation = name,
            user.username = %self.details.username,
            error = field::Empty,
        )
    }

    /// Transport, then decode, then the server error check.
    async fn read<P: serde::de::DeserializeOwned>(&mut self, url: &str) -> Result<P, ApiError> {
        let body = self.transport.get(url).await?;
        self.last_error = ServerError::none();

        let envelope = decode_envelope::<P>(&body)?;
        if !envelope.error.is_none() {
            self.last_error = envelope.error.clone();
            tracing::warn!(
                code = self.last_error.code,
                message = %self.last_error.message,
                "server reported an error"
            );
        }

        envelope.into_result()
    }
}

fn record_failure(span: &Span, err: &ApiError) {
    span.record("otel.status_code", "ERROR");
    span.record("error", field::display(err));
    tracing::error!(parent: span, error = %err, "request failed");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::error::TransportError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) const TEST_BASE: &str = "http://api.test";
    pub(crate) const TEST_TOKEN: &str = "tok-123";

    /// Serves canned bodies per url; unknown urls fail like a refused connection.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub routes: Mutex<HashMap<String, Vec<u8>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub(crate) fn respond(&self, url: &str, body: &str) {
            self.routes.lock().unwrap().insert(url.to_string(), body.as_bytes().to_vec());
        }

        pub(crate) fn drop_route(&self, url: &str) {
            self.routes.lock().unwrap().remove(url);
        }

        pub(crate) fn call_count(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| c.as_str() == url).count()
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.routes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::Request(format!("no route for {url}").into()))
        }
    }

    pub(crate) fn endpoints() -> Endpoints {
        Endpoints::new(TEST_BASE, TEST_TOKEN)
    }

    pub(crate) const ACCOUNT: &str = r#"{ "user": {
        "username": "nova_trader", "credits": 1000, "shipCount": 2,
        "structureCount": 0, "joinedAt": "2021-05-01T10:00:00.000Z"
    } }"#;

    pub(crate) const SHIPS: &str = r#"{ "ships": [
        { "id": "s1", "class": "MK-I", "type": "JW-MK-I", "manufacturer": "Jackshaw",
          "location": "OE-PM", "maxCargo": 50, "plating": 5, "spaceAvailable": 10,
          "speed": 1, "weapons": 5, "x": 1, "y": 2 },
        { "id": "s2", "class": "MK-II", "type": "GR-MK-II", "manufacturer": "Gravager",
          "flightPlanId": "fp1", "maxCargo": 100, "plating": 10, "spaceAvailable": 20,
          "speed": 2, "weapons": 3 }
    ] }"#;

    pub(crate) const LEADERBOARD: &str = r#"{
        "netWorth": [ { "username": "top", "netWorth": 99999, "rank": 1 } ],
        "userNetWorth": { "username": "nova_trader", "netWorth": 1000, "rank": 5 }
    }"#;

    pub(crate) const STATUS_ONLINE: &str =
        r#"{ "status": "spacetraders is currently online and available to play" }"#;

    /// Fake transport answering every endpoint with a healthy payload.
    pub(crate) fn healthy_transport() -> FakeTransport {
        let e = endpoints();
        let t = FakeTransport::default();
        t.respond(&e.account, ACCOUNT);
        t.respond(&e.ships, SHIPS);
        t.respond(&e.leaderboard, LEADERBOARD);
        t.respond(&e.status, STATUS_ONLINE);
        t
    }

    #[test]
    fn endpoints_carry_token() {
        let e = Endpoints::new("https://api.spacetraders.io/", "abc");

        assert_eq!(e.account, "https://api.spacetraders.io/my/account?token=abc");
        assert_eq!(e.ships, "https://api.spacetraders.io/my/ships?token=abc");
        assert_eq!(e.leaderboard, "https://api.spacetraders.io/game/leaderboard/net-worth?token=abc");
        assert_eq!(e.status, "https://api.spacetraders.io/game/status?token=abc");
    }

    #[tokio::test]
    async fn open_populates_details() {
        let session = Session::open(healthy_transport(), endpoints()).await.unwrap();

        assert_eq!(session.username(), "nova_trader");
        assert_eq!(session.details().credits, 1000);
        assert_eq!(session.details().ship_count, 2);
        assert_eq!(session.last_error(), &ServerError::none());
    }

    #[tokio::test]
    async fn open_fails_on_rejected_token() {
        let t = FakeTransport::default();
        t.respond(
            &endpoints().account,
            r#"{ "error": { "message": "Token was invalid or missing from the request.", "code": 40101 } }"#,
        );

        match Session::open(t, endpoints()).await {
            Err(ApiError::Server { code, .. }) => assert_eq!(code, 40101),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("login should fail"),
        }
    }

    #[tokio::test]
    async fn open_propagates_transport_failure() {
        let err = Session::open(FakeTransport::default(), endpoints()).await.err().unwrap();

        assert!(matches!(err, ApiError::Transport(TransportError::Request(_))));
    }

    #[tokio::test]
    async fn server_error_is_stored_then_reset() {
        let t = healthy_transport();
        let e = endpoints();
        let mut session = Session::open(&t, e.clone()).await.unwrap();

        t.respond(
            &e.ships,
            r#"{ "ships": [], "error": { "message": "Too many requests", "code": 42901 } }"#,
        );
        match session.fetch_ships().await {
            Err(ApiError::Server { code, message }) => {
                assert_eq!(code, 42901);
                assert_eq!(message, "Too many requests");
            }
            other => panic!("expected server error, got {:?}", other),
        }
        assert_eq!(session.last_error().code, 42901);

        t.respond(&e.ships, SHIPS);
        let ships = session.fetch_ships().await.unwrap();
        assert_eq!(ships.len(), 2);
        assert_eq!(session.last_error(), &ServerError::none());
    }

    #[tokio::test]
    async fn status_text_never_errors() {
        let t = healthy_transport();
        let e = endpoints();
        let mut session = Session::open(&t, e.clone()).await.unwrap();

        assert_eq!(session.fetch_status().await.unwrap(), GameStatus::Available);

        for body in [
            r#"{"status":"offline"}"#,
            r#"{"status":""}"#,
            r#"{"status":"maintenance"}"#,
            r#"{"status":null}"#,
            "{}",
        ] {
            t.respond(&e.status, body);
            assert_eq!(session.fetch_status().await.unwrap(), GameStatus::Unavailable);
        }
    }

    #[tokio::test]
    async fn open_accepts_account_without_join_date() {
        let t = healthy_transport();
        let e = endpoints();
        t.respond(
            &e.account,
            r#"{"user":{"username":"n","credits":1,"shipCount":0,"structureCount":0}}"#,
        );

        let session = Session::open(&t, e).await.unwrap();
        assert_eq!(session.username(), "n");
        assert_eq!(session.details().joined_at, "");
    }

    #[tokio::test]
    async fn account_refresh_replaces_details() {
        let t = healthy_transport();
        let e = endpoints();
        let mut session = Session::open(&t, e.clone()).await.unwrap();

        t.respond(
            &e.account,
            r#"{ "user": { "username": "nova_trader", "credits": 2500, "shipCount": 3,
                 "structureCount": 1, "joinedAt": "2021-05-01T10:00:00.000Z" } }"#,
        );

        let details = session.fetch_account_details().await.unwrap();
        assert_eq!(details.credits, 2500);
        assert_eq!(details.structure_count, 1);
    }

    #[tokio::test]
    async fn leaderboard_returns_user_entry() {
        let mut session = Session::open(healthy_transport(), endpoints()).await.unwrap();

        let board = session.fetch_leaderboard().await.unwrap();
        assert_eq!(board.user_net_worth.rank, 5);
        assert_eq!(board.net_worth.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error() {
        let t = healthy_transport();
        let e = endpoints();
        let mut session = Session::open(&t, e.clone()).await.unwrap();

        t.respond(&e.leaderboard, "<html>Bad gateway</html>");
        assert!(matches!(session.fetch_leaderboard().await, Err(ApiError::Decode(_))));
    }
}
