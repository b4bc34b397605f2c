use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
    Transporter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Transporter => "transporter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "transporter" => Ok(Role::Transporter),
            other => Err(CoreError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// Who is making a request, as established by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, name: impl Into<String>, role: Role) -> Self {
        Self { id, name: name.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_transporter(&self) -> bool {
        self.role == Role::Transporter
    }

    pub fn require_admin(&self) -> CoreResult<()> {
        self.require_any(&[Role::Admin])
    }

    pub fn require_any(&self, roles: &[Role]) -> CoreResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "role '{}' may not perform this action",
                self.role
            )))
        }
    }

    /// Label written into `updated_by` on status history entries.
    pub fn display_name(&self) -> String {
        match self.role {
            Role::Customer => self.name.clone(),
            role => format!("{} ({})", self.name, role),
        }
    }
}

/// A user as shown to clients. Never carries credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.name.clone(), self.role)
    }
}

/// A stored user: profile plus bcrypt hash.
#[derive(Clone, PartialEq)]
pub struct UserRecord {
    pub profile: Profile,
    pub password_hash: String,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("profile", &self.profile)
            .field("password_hash", &"********")
            .finish()
    }
}

pub fn hash_password(plain: &str, cost: u32) -> CoreResult<String> {
    bcrypt::hash(plain, cost).map_err(|e| CoreError::Persistence(format!("password hashing failed: {e}")))
}

/// False on mismatch and on malformed hashes alike.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("s3cret!", 4).unwrap();
        assert_ne!(hash, "s3cret!");
        assert!(verify_password("s3cret!", &hash));
        assert!(!verify_password("S3cret!", &hash));
        assert!(!verify_password("s3cret!", "not-a-hash"));
    }

    #[test]
    fn test_role_checks() {
        let admin = Actor::new(Uuid::new_v4(), "Laura", Role::Admin);
        let driver = Actor::new(Uuid::new_v4(), "Carlos", Role::Transporter);
        assert!(admin.require_admin().is_ok());
        assert!(matches!(driver.require_admin(), Err(CoreError::Forbidden(_))));
        assert!(driver.require_any(&[Role::Admin, Role::Transporter]).is_ok());
        assert_eq!(driver.display_name(), "Carlos (transporter)");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("transporter".parse::<Role>().unwrap(), Role::Transporter);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_debug_hides_hash() {
        let record = UserRecord {
            profile: Profile {
                id: Uuid::new_v4(),
                name: "Ana".into(),
                email: "ana@example.com".into(),
                role: Role::Customer,
                phone: None,
                address: None,
                city: None,
                department: None,
                country: None,
                created_at: Utc::now(),
            },
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".into(),
        };
        assert!(!format!("{record:?}").contains("$2b$"));
    }
}
