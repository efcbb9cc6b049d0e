use serde::{Serialize, Deserialize};

/// Payload types returned by the SpaceTraders HTTP API.
///
/// Every endpoint answers with a single JSON object. The domain fields
/// and an optional `error` object may share that envelope, so none of
/// these types carry the error themselves; it is pulled out separately
/// by `api::decode`.
///
/// DESIGN NOTES:
/// - Field names follow the API (camelCase) via serde renames.
/// - Absent fields take their zero value; a field of the wrong type
///   is still a decode error.
/// - Values are point-in-time snapshots, replaced wholesale each cycle.
///

// ------------------------------------------------------------
// Account
// ------------------------------------------------------------
//
// GET /my/account
//
// Example:
// { "user": { "username": "x", "credits": 1000, "shipCount": 2,
//             "structureCount": 0, "joinedAt": "2021-..." } }
//
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AccountEnvelope {
    pub user: AccountDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountDetails {
    /// Username claimed together with the token
    pub username: String,

    pub credits: i64,

    pub ship_count: i64,

    pub structure_count: i64,

    /// Registration date as sent by the server (RFC 3339)
    pub joined_at: String,
}

// ------------------------------------------------------------
// Ships
// ------------------------------------------------------------
//
// GET /my/ships
//
// Ships in transit have no `location` and may lack coordinates,
// docked ships have no `flightPlanId`. Those fields are optional.
//
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ShipList {
    pub ships: Vec<Ship>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Ship {
    pub id: String,

    pub class: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub manufacturer: String,

    pub location: Option<String>,

    pub flight_plan_id: Option<String>,

    pub max_cargo: i64,

    pub plating: i64,

    /// Unused cargo capacity, published as the `shipload` gauge
    pub space_available: i64,

    pub speed: i64,

    pub weapons: i64,

    pub x: Option<i64>,

    pub y: Option<i64>,
}

// ------------------------------------------------------------
// Leaderboard
// ------------------------------------------------------------
//
// GET /game/leaderboard/net-worth
//
// `netWorth` holds the top entries in rank order, `userNetWorth`
// is the entry of the authenticated account (present even when
// the account is outside the top list).
//
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Leaderboard {
    pub net_worth: Vec<LeaderboardEntry>,

    pub user_net_worth: LeaderboardEntry,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaderboardEntry {
    pub username: String,

    pub net_worth: i64,

    pub rank: i64,
}

// ------------------------------------------------------------
// Game status
// ------------------------------------------------------------
//
// GET /game/status
//
// Only a free-text sentence. It is reduced to a +1 / -1 signal
// by `GameStatus::from_text`.
//
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct StatusBody {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusBody {
    /// Status sentence, empty when absent or null.
    pub fn text(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

/// Exact sentence the server sends while the game is playable.
pub const ONLINE_STATUS: &str = "spacetraders is currently online and available to play";

/// Availability signal derived from the status sentence.
///
/// Anything but the exact online sentence counts as unavailable,
/// including an empty string. Unknown text is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Available,
    Unavailable,
}

impl GameStatus {
    pub fn from_text(status: &str) -> Self {
        if status == ONLINE_STATUS {
            GameStatus::Available
        } else {
            GameStatus::Unavailable
        }
    }

    /// Gauge value: 1 when available, -1 otherwise.
    pub fn as_signal(self) -> i64 {
        match self {
            GameStatus::Available => 1,
            GameStatus::Unavailable => -1,
        }
    }
}
