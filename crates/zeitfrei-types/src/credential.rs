//! OAuth credentials held on behalf of a Discord user.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::wire;

/// A user's stored OAuth credentials.
///
/// `expires_at` is the provider-reported expiry of `access_token` as of the
/// last exchange or refresh. No skew margin is applied: the token is stale
/// once `now >= expires_at`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub username: String,
    /// Legacy four-digit suffix; `"0"` or empty for migrated accounts.
    #[serde(default)]
    pub discriminator: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "wire::timestamp")]
    pub expires_at: DateTime<Utc>,
}

impl UserCredential {
    /// Build a credential from a freshly exchanged grant.
    pub fn from_grant(profile: &UserProfile, grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            user_id: profile.id,
            username: profile.username.clone(),
            discriminator: profile.discriminator.clone(),
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            expires_at: grant.expires_at(now),
        }
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Overwrite the token pair with a refreshed grant.
    ///
    /// Providers may omit the refresh token when it was not rotated; the
    /// stored one is kept in that case.
    pub fn apply_grant(&mut self, grant: &TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token.clone();
        if !grant.refresh_token.is_empty() {
            self.refresh_token = grant.refresh_token.clone();
        }
        self.expires_at = grant.expires_at(now);
    }
}

impl fmt::Debug for UserCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredential")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("discriminator", &self.discriminator)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl TokenGrant {
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in.max(0))
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// The subset of `GET /users/@me` the gatekeeper stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(access: &str, refresh: &str, expires_in: i64) -> TokenGrant {
        TokenGrant {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_in,
            token_type: "Bearer".to_string(),
            scope: "identify guilds.join".to_string(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId(42),
            username: "nelly".to_string(),
            discriminator: "0".to_string(),
        }
    }

    #[test]
    fn test_stale_exactly_at_expiry() {
        let now = Utc::now();
        let cred = UserCredential::from_grant(&profile(), &grant("a", "r", 0), now);
        assert!(cred.is_stale_at(now));
        assert!(!cred.is_stale_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_apply_grant_keeps_refresh_token_when_not_rotated() {
        let now = Utc::now();
        let mut cred = UserCredential::from_grant(&profile(), &grant("a1", "r1", 60), now);

        cred.apply_grant(&grant("a2", "", 604800), now);
        assert_eq!(cred.access_token, "a2");
        assert_eq!(cred.refresh_token, "r1");
        assert_eq!(cred.expires_at, now + Duration::seconds(604800));

        cred.apply_grant(&grant("a3", "r3", 604800), now);
        assert_eq!(cred.refresh_token, "r3");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let cred = UserCredential::from_grant(&profile(), &grant("secret-a", "secret-r", 60), Utc::now());
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("secret-a"));
        assert!(!rendered.contains("secret-r"));
        assert!(rendered.contains("nelly"));
    }

    #[test]
    fn test_json_shape_matches_bot_client() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 1, 2, 3, 4, 5).unwrap();
        let cred = UserCredential::from_grant(&profile(), &grant("a", "r", 0), now);
        let json = serde_json::to_value(&cred).unwrap();

        assert_eq!(json["id"], "42");
        assert_eq!(json["username"], "nelly");
        assert_eq!(json["expires_at"], "2024-01-02T03:04:05.000000Z");

        let back: UserCredential = serde_json::from_value(json).unwrap();
        assert_eq!(back, cred);
    }
}
