use sagfo_shared::time::now_micros;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::identity::{hash_password, normalize_email, verify_password, Actor, Profile, Role, UserRecord};
use crate::repository::UserRepository;
use crate::{CoreError, CoreResult};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
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
}

/// Admin edit of a profile. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub department: Option<String>,
    pub country: Option<String>,
}

fn check_email(email: &str) -> CoreResult<String> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(CoreError::Validation(format!("'{email}' is not a valid e-mail"))),
    }
}

fn check_password(password: &str) -> CoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    async fn insert(&self, user: NewUser) -> CoreResult<Profile> {
        let name = user.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::Validation("name must not be empty".to_string()));
        }
        let email = check_email(&user.email)?;
        check_password(&user.password)?;

        let record = UserRecord {
            profile: Profile {
                id: Uuid::new_v4(),
                name,
                email,
                role: user.role,
                phone: non_blank(user.phone),
                address: non_blank(user.address),
                city: non_blank(user.city),
                department: non_blank(user.department),
                country: non_blank(user.country),
                created_at: now_micros(),
            },
            password_hash: hash_password(&user.password, self.bcrypt_cost)?,
        };
        self.users.insert_user(&record).await?;
        info!(user_id = %record.profile.id, role = %record.profile.role, "User created");
        Ok(record.profile)
    }

    /// Self-service sign-up. Always a customer, whatever was requested.
    pub async fn register(&self, mut user: NewUser) -> CoreResult<Profile> {
        user.role = Role::Customer;
        self.insert(user).await
    }

    /// Same error for unknown e-mail and wrong password.
    pub async fn login(&self, email: &str, password: &str) -> CoreResult<Profile> {
        let invalid = || CoreError::Authentication("invalid e-mail or password".to_string());
        let record = self.users.find_user_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &record.password_hash) {
            warn!(user_id = %record.profile.id, "Rejected login");
            return Err(invalid());
        }
        info!(user_id = %record.profile.id, "User logged in");
        Ok(record.profile)
    }

    pub async fn profile(&self, id: Uuid) -> CoreResult<Profile> {
        self.users
            .get_user(id)
            .await?
            .map(|r| r.profile)
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))
    }

    pub async fn list_users(&self, actor: &Actor) -> CoreResult<Vec<Profile>> {
        actor.require_admin()?;
        Ok(self.users.list_users().await?.into_iter().map(|r| r.profile).collect())
    }

    pub async fn create_user(&self, actor: &Actor, user: NewUser) -> CoreResult<Profile> {
        actor.require_admin()?;
        self.insert(user).await
    }

    pub async fn update_user(&self, actor: &Actor, id: Uuid, update: ProfileUpdate) -> CoreResult<Profile> {
        actor.require_admin()?;
        let mut record = self
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {id}")))?;

        if let Some(name) = non_blank(update.name) {
            record.profile.name = name;
        }
        if let Some(email) = update.email {
            record.profile.email = check_email(&email)?;
        }
        if let Some(password) = update.password {
            check_password(&password)?;
            record.password_hash = hash_password(&password, self.bcrypt_cost)?;
        }
        if let Some(role) = update.role {
            if id == actor.id && role != Role::Admin {
                return Err(CoreError::Validation("admins cannot demote themselves".to_string()));
            }
            record.profile.role = role;
        }
        let p = &mut record.profile;
        for (slot, value) in [
            (&mut p.phone, update.phone),
            (&mut p.address, update.address),
            (&mut p.city, update.city),
            (&mut p.department, update.department),
            (&mut p.country, update.country),
        ] {
            if value.is_some() {
                *slot = non_blank(value);
            }
        }

        self.users.update_user(&record).await?;
        info!(user_id = %id, "User updated");
        Ok(record.profile)
    }

    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> CoreResult<()> {
        actor.require_admin()?;
        if id == actor.id {
            return Err(CoreError::Validation("admins cannot delete themselves".to_string()));
        }
        self.users.delete_user(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Creates the first administrator if the e-mail is not registered yet.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> CoreResult<Profile> {
        if let Some(existing) = self.users.find_user_by_email(email).await? {
            return Ok(existing.profile);
        }
        self.insert(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
            phone: None,
            address: None,
            city: None,
            department: None,
            country: None,
        })
        .await
    }
}
