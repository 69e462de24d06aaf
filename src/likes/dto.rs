use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::LikeRow;

#[derive(Debug, Deserialize)]
pub struct CreateLikeRequest {
    pub ad: i64,
}

/// A like as nested in ad detail: who liked it and when.
#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub user: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl From<LikeRow> for LikeResponse {
    fn from(r: LikeRow) -> Self {
        Self {
            user: r.username,
            created: r.created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn created_is_rfc3339() {
        let like = LikeResponse {
            user: "buyer".into(),
            created: datetime!(2024-03-01 12:30:00 UTC),
        };
        let json = serde_json::to_value(&like).unwrap();
        assert_eq!(json["user"], "buyer");
        assert_eq!(json["created"], "2024-03-01T12:30:00Z");
    }

    #[test]
    fn request_needs_ad_id() {
        assert!(serde_json::from_str::<CreateLikeRequest>(r#"{"ad": 4}"#).is_ok());
        assert!(serde_json::from_str::<CreateLikeRequest>(r#"{}"#).is_err());
        assert!(serde_json::from_str::<CreateLikeRequest>(r#"{"ad": "x"}"#).is_err());
    }
}
