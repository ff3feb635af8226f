use anyhow::Result;
use serde::Deserialize;
use tracing::info;

/// Farcaster user as returned by the Neynar bulk-users endpoint. `score` is
/// Neynar's spam/quality signal in [0, 1].
#[derive(Debug, Clone, Deserialize)]
pub struct FarcasterUser {
    pub fid: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BulkUsersResponse {
    users: Vec<FarcasterUser>,
}

/// Client for the Farcaster identity graph (Neynar-compatible API).
/// Constructed once at startup; callers treat any failure as "identity not
/// verifiable" and fail closed.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Looks up a fid on the identity graph. `Ok(None)` means the fid does
    /// not exist; `Err` means the service could not be reached.
    pub async fn fetch_user(&self, fid: i64) -> Result<Option<FarcasterUser>> {
        let url = format!("{}/v2/farcaster/user/bulk?fids={}", self.base_url, fid);
        let response = self
            .http
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("Identity API returned {}", response.status());
        }

        let body: BulkUsersResponse = response.json().await?;
        let user = body.users.into_iter().find(|u| u.fid == fid);
        if let Some(user) = &user {
            info!(fid = %fid, username = %user.username.as_deref().unwrap_or("-"), "Verified fid");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_response_parses_with_and_without_score() {
        let raw = r#"{"users":[
            {"fid": 1043, "username": "alice", "score": 0.91},
            {"fid": 2000}
        ]}"#;
        let parsed: BulkUsersResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.users.len(), 2);
        assert_eq!(parsed.users[0].score, Some(0.91));
        assert_eq!(parsed.users[1].score, None);
        assert_eq!(parsed.users[1].username, None);
    }
}
