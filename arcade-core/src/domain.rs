use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Email,
    Federated,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Pending,
    Verified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: Option<String>,
    pub display_name: String,
    pub provider: Provider,
    pub verification: VerificationState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Save {
    pub account_id: AccountId,
    pub schema_version: i64,
    pub save_data: serde_json::Value,
    pub wave: i64,
    pub game_state: String,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreditBalance {
    pub free_remaining: i64,
    pub purchased: i64,
}

impl CreditBalance {
    pub fn total(&self) -> i64 {
        self.free_remaining + self.purchased
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSubmission {
    pub difficulty: String,
    pub game_duration_ms: i64,
    pub is_victory: bool,
    pub kills: i64,
    pub level: i64,
    pub max_combo: i64,
    pub score: i64,
    pub start_wave: i64,
    pub wave: i64,
    #[serde(default)]
    pub continues_used: i64,
    #[serde(default)]
    pub run_detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub account_id: AccountId,
    pub display_name: String,
    pub submission: LeaderboardSubmission,
    pub submitted_at: DateTime<Utc>,
}

/// Whitelisted, lexicographically sorted field set that participates in the
/// leaderboard submission checksum. Order here is the canonical order.
pub const CHECKSUM_FIELDS: &[&str] = &[
    "difficulty",
    "gameDurationMs",
    "isVictory",
    "kills",
    "level",
    "maxCombo",
    "score",
    "startWave",
    "wave",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaProgression {
    pub data: serde_json::Value,
    pub schema_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}
