use super::{is_printable, is_unset, is_valid_name, Resource};
use c9_repo::{Entity, EntityType, Lifetime, Patch, RecordId, ValidationError};
use serde::{Deserialize, Serialize};

/// A named group of users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    /// Record id.
    #[serde(skip_serializing_if = "is_unset")]
    pub id: RecordId,
    /// Unique group name, immutable once created.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group_name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Member user ids.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<RecordId>,
}

impl Entity for Group {
    const TYPE: EntityType = EntityType::Group;

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        Some(&self.group_name)
    }
}

impl Resource for Group {
    type Patch = GroupPatch;
    const COLLECTION: &'static str = "group";
}

/// Fields of a group create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPatch {
    /// Group name; only allowed on create.
    pub group_name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement member list.
    pub users: Option<Vec<RecordId>>,
}

impl Patch<Group> for GroupPatch {
    fn validate(&self, lifetime: Lifetime) -> Result<(), ValidationError> {
        if lifetime == Lifetime::New && self.group_name.is_none() {
            return Err(ValidationError::new("Field 'group_name' must be set"));
        }
        if let Some(group_name) = &self.group_name {
            if lifetime == Lifetime::Existing {
                return Err(ValidationError::new("Field 'group_name' cannot be changed"));
            }
            if group_name.is_empty() {
                return Err(ValidationError::new("Field 'group_name' must be set"));
            }
            if !is_valid_name(group_name) {
                return Err(ValidationError::new(
                    "Field 'group_name' must start with a letter and consist of letters and numbers",
                ));
            }
        }
        if let Some(description) = &self.description {
            if !is_printable(description) {
                return Err(ValidationError::new(
                    "Field 'description' must not contain control characters",
                ));
            }
        }
        if let Some(users) = &self.users {
            if users.iter().any(|id| id.is_unset()) {
                return Err(ValidationError::new(
                    "Field 'users' must contain valid user IDs",
                ));
            }
        }
        Ok(())
    }

    fn apply(&self, group: &mut Group) {
        if let Some(group_name) = &self.group_name {
            group.group_name.clone_from(group_name);
        }
        if let Some(description) = &self.description {
            group.description.clone_from(description);
        }
        if let Some(users) = &self.users {
            group.users.clone_from(users);
        }
    }
}
