use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::clients::BrokerageCredentials;
use crate::domain::progression::{level_for_xp, xp_to_next_level};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub brokerage_key_id: Option<String>,
    pub brokerage_secret_key: Option<String>,
    pub xp: i32,
    pub trades_placed: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn brokerage_credentials(&self) -> Option<BrokerageCredentials> {
        match (&self.brokerage_key_id, &self.brokerage_secret_key) {
            (Some(key_id), Some(secret_key)) if !key_id.is_empty() && !secret_key.is_empty() => {
                Some(BrokerageCredentials {
                    key_id: key_id.clone(),
                    secret_key: secret_key.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn profile(&self, xp_per_level: i32) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            xp: self.xp,
            level: level_for_xp(self.xp, xp_per_level),
            xp_to_next_level: xp_to_next_level(self.xp, xp_per_level),
            has_brokerage_keys: self.brokerage_credentials().is_some(),
            created_at: self.created_at,
        }
    }
}

/// What clients see of a user. Credentials never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub xp: i32,
    pub level: i32,
    pub xp_to_next_level: i32,
    pub has_brokerage_keys: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(key: Option<&str>, secret: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "trader".into(),
            email: "trader@example.com".into(),
            password_hash: "$argon2id$...".into(),
            brokerage_key_id: key.map(String::from),
            brokerage_secret_key: secret.map(String::from),
            xp: 250,
            trades_placed: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn credentials_need_both_halves() {
        assert!(user(Some("PK1"), Some("secret")).brokerage_credentials().is_some());
        assert!(user(Some("PK1"), None).brokerage_credentials().is_none());
        assert!(user(Some(""), Some("secret")).brokerage_credentials().is_none());
    }

    #[test]
    fn profile_hides_secrets_and_derives_level() {
        let profile = user(Some("PK1"), Some("secret")).profile(100);
        assert_eq!(profile.level, 3);
        assert_eq!(profile.xp_to_next_level, 50);
        assert!(profile.has_brokerage_keys);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
    }
}
