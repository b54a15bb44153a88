use bson::{DateTime, Uuid, doc};
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The role of a user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Standard,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
        }
    }

    /// Parses a role from a client-supplied string.
    pub fn parse(raw: &str) -> Result<Role, ApiError> {
        match raw {
            "standard" => Ok(Role::Standard),
            "admin" => Ok(Role::Admin),
            _ => Err(ApiError::Validation(format!("Role `{raw}` is not a valid role"))),
        }
    }
}

/// Reference to an externally stored avatar asset.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Avatar {
    pub public_id: String,
    pub url: String,
}

impl Avatar {
    /// Placeholder assigned at registration until an asset store is wired up.
    pub fn placeholder() -> Self {
        Avatar {
            public_id: "sample-avatar-id".to_string(),
            url: "https://example.com/avatars/placeholder.png".to_string(),
        }
    }
}

/// A user of the shop.
///
/// The stored credential is an Argon2 hash and is only ever exposed through
/// [`User::details`], which omits it together with the reset token fields.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// User UUID.
    pub _id: Uuid,
    pub name: String,
    /// Unique, enforced by an index on the collection.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Avatar,
    /// SHA-256 digest of the currently outstanding reset token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token_hash: Option<String>,
    /// Instant after which the outstanding reset token is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime>,
}

/// Public view of a user, safe to serialize into responses.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct UserDetails {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Avatar,
}

impl User {
    pub fn details(&self) -> UserDetails {
        UserDetails {
            id: self._id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
        }
    }
}

/// Enumerated payload for a profile update. Only these fields can change.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileCommand {
    pub name: String,
    pub email: String,
}

impl UpdateProfileCommand {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_name(&self.name)?;
        validate_email(&self.email)
    }
}

/// Enumerated payload for an admin role update.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleCommand {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl UpdateRoleCommand {
    /// Validates the command and resolves the role string.
    pub fn validated_role(&self) -> Result<Role, ApiError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        Role::parse(&self.role)
    }
}

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    // Bounds count characters, not bytes, so multibyte names are measured
    // the way a user would count them.
    let length = name.chars().count();
    if length < 4 {
        return Err(ApiError::Validation("Name should have more than 4 characters".to_string()));
    }
    if length > 30 {
        return Err(ApiError::Validation("Name cannot exceed 30 characters".to_string()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::Validation("Please enter a valid email".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation("Password should have more than 8 characters".to_string()));
    }
    Ok(())
}

/// Shared function to query a user from the MongoDB collection of users.
///
/// * `collection` - MongoDB collection of users.
/// * `id` - UUID of the user.
pub async fn query_user(collection: &Collection<User>, id: Uuid) -> Result<User, ApiError> {
    match collection.find_one(doc! {"_id": id}, None).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::NotFound(format!("User does not exist with id: `{id}`"))),
        Err(error) => Err(error.into()),
    }
}
