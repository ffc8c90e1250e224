use std::{fmt::Display, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        matches!(self, Role::Moderator)
    }

    pub fn is_plain_user(&self) -> bool {
        matches!(self, Role::User)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow::anyhow!("Unknown role: {other}")),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Claims of the short lived access credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClaim {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub superuser: bool,
    pub exp: u64,
}

impl ApiClaim {
    /// New claim with zero expiry, to be stamped by the token issuer.
    pub fn new_expired(
        user_id: impl Display,
        username: impl Into<String>,
        role: Role,
        superuser: bool,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            username: username.into(),
            role,
            superuser,
            exp: 0,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = unix_secs(until);
    }

    fn check_validity(&self) -> bool {
        self.exp > unix_secs(SystemTime::now())
    }
}

/// Claims of the longer lived refresh credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaim {
    pub sub: String,
    pub exp: u64,
}

impl RefreshClaim {
    pub fn new_expired(user_id: impl Display) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: 0,
        }
    }
}

impl TimeLimited for RefreshClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = unix_secs(until);
    }

    fn check_validity(&self) -> bool {
        self.exp > unix_secs(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::Moderator.to_string(), "moderator");
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Admin.is_moderator());
        assert!(Role::Moderator.is_moderator());
        assert!(Role::User.is_plain_user());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn test_claim_validity() {
        let mut claim = ApiClaim::new_expired(123, "bob", Role::User, false);
        assert_eq!(claim.sub, "123");
        assert_eq!(claim.user_id(), Some(123));
        assert!(!claim.check_validity());
        claim.set_validity(SystemTime::now() + std::time::Duration::from_secs(60));
        assert!(claim.check_validity());
    }

    #[test]
    fn test_role_serde() {
        let role: Role = serde_json::from_str("\"moderator\"").unwrap();
        assert_eq!(role, Role::Moderator);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
