use super::{is_printable, is_unset, is_valid_email, is_valid_name, is_valid_url, Resource};
use c9_repo::{Entity, EntityType, Lifetime, Patch, RecordId, ValidationError};
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Record id.
    #[serde(skip_serializing_if = "is_unset")]
    pub id: RecordId,
    /// Unique login name, immutable once created.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    /// Human-readable name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Contact address.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    /// Home page.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Entity for User {
    const TYPE: EntityType = EntityType::User;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        Some(&self.user_name)
    }
}

impl Resource for User {
    type Patch = UserPatch;
    const COLLECTION: &'static str = "user";
}

/// Fields of a user create or update request. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    /// New login name; only allowed on create.
    pub user_name: Option<String>,
    /// New display name; empty resets it to the login name.
    pub display_name: Option<String>,
    /// New contact address.
    pub email: Option<String>,
    /// New home page; empty clears it.
    pub url: Option<String>,
}

impl Patch<User> for UserPatch {
    fn validate(&self, lifetime: Lifetime) -> Result<(), ValidationError> {
        if lifetime == Lifetime::New && self.user_name.is_none() {
            return Err(ValidationError::new("Field 'user_name' must be set"));
        }
        if lifetime == Lifetime::New && self.email.is_none() {
            return Err(ValidationError::new("Field 'email' must be set"));
        }
        if let Some(user_name) = &self.user_name {
            if lifetime == Lifetime::Existing {
                return Err(ValidationError::new("Field 'user_name' cannot be changed"));
            }
            if user_name.is_empty() {
                return Err(ValidationError::new("Field 'user_name' must be set"));
            }
            if !is_valid_name(user_name) {
                return Err(ValidationError::new(
                    "Field 'user_name' must start with a letter and consist of letters and numbers",
                ));
            }
        }
        if let Some(display_name) = &self.display_name {
            if !is_printable(display_name) {
                return Err(ValidationError::new(
                    "Field 'display_name' must not contain control characters",
                ));
            }
        }
        if let Some(email) = &self.email {
            if email.is_empty() {
                return Err(ValidationError::new("Field 'email' must be set"));
            }
            if !is_valid_email(email) {
                return Err(ValidationError::new(
                    "Field 'email' must be a valid e-mail address",
                ));
            }
        }
        if let Some(url) = &self.url {
            if !url.is_empty() && !is_valid_url(url) {
                return Err(ValidationError::new("Field 'url' must be a valid HTTP(S) URL"));
            }
        }
        Ok(())
    }

    fn apply(&self, user: &mut User) {
        if let Some(user_name) = &self.user_name {
            user.user_name.clone_from(user_name);
        }
        if let Some(display_name) = &self.display_name {
            if display_name.is_empty() {
                user.display_name = user.user_name.clone();
            } else {
                user.display_name.clone_from(display_name);
            }
        }
        if let Some(email) = &self.email {
            user.email.clone_from(email);
        }
        if let Some(url) = &self.url {
            user.url.clone_from(url);
        }
    }
}
