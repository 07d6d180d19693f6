//! Shared types for the dish duty service and its RPC clients.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Chat-platform user identifier. Supplied by the caller and trusted.
pub type UserId = i64;

/// Number of history entries returned when a caller does not ask for a limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

// =====================================================
// Domain Types
// =====================================================

/// A registered participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// One completed wash on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub user_id: UserId,
}

/// The whole persisted document: users and history in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub history: Vec<HistoryEntry>,
}

/// Outcome of logging a wash for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogResult {
    Recorded,
    AlreadyRecordedToday,
    UnknownUser,
}

/// A history entry resolved to the user's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLine {
    pub date: NaiveDate,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_users: usize,
    pub total_entries: usize,
    pub entries_today: usize,
}

// =====================================================
// RPC Request Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogActionRequest {
    pub user_id: UserId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecentHistoryRequest {
    /// Zero or negative yields an empty list. Omitted means [`DEFAULT_HISTORY_LIMIT`].
    #[serde(default)]
    pub limit: Option<i64>,
}

impl RecentHistoryRequest {
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            None => DEFAULT_HISTORY_LIMIT,
            Some(n) if n <= 0 => 0,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        }
    }
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub total_users: usize,
    pub total_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_result_wire_names() {
        assert_eq!(
            serde_json::to_string(&LogResult::AlreadyRecordedToday).unwrap(),
            "\"already_recorded_today\""
        );
        assert_eq!(
            serde_json::from_str::<LogResult>("\"unknown_user\"").unwrap(),
            LogResult::UnknownUser
        );
    }

    #[test]
    fn test_history_entry_date_format() {
        let entry = HistoryEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            user_id: 42,
        };
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["date"], "2024-03-07");
        assert_eq!(json["user_id"], 42);
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(RecentHistoryRequest::default().effective_limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(RecentHistoryRequest { limit: Some(0) }.effective_limit(), 0);
        assert_eq!(RecentHistoryRequest { limit: Some(-3) }.effective_limit(), 0);
        assert_eq!(RecentHistoryRequest { limit: Some(25) }.effective_limit(), 25);
    }

    #[test]
    fn test_recent_history_request_accepts_empty_body() {
        let req: RecentHistoryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.limit.is_none());
    }

    #[test]
    fn test_rpc_response_skips_empty_fields() {
        let ok = serde_json::to_value(RpcResponse::ok(true)).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(RpcResponse::<bool>::err("disk full")).unwrap();
        assert_eq!(err["success"], false);
        assert!(err.get("data").is_none());
        assert_eq!(err["error"], "disk full");
    }
}
