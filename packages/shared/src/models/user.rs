use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::entity::is_valid_id;
use crate::repositories::errors::repository_errors::RepositoryError;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Full replacement of a user document. `createdAt` is kept when supplied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceUserRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Builds a validated user, generating an id when none is given.
    pub fn new(
        id: Option<String>,
        name: &str,
        email: Option<String>,
    ) -> Result<Self, RepositoryError> {
        let user = User {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: name.trim().to_string(),
            email,
            created_at: Utc::now(),
        };
        user.validate()?;
        Ok(user)
    }

    pub fn validate(&self) -> Result<(), RepositoryError> {
        if !is_valid_id(&self.id) {
            return Err(RepositoryError::validation(
                "id",
                "id must match ^[A-Za-z0-9._-]{1,128}$",
            ));
        }
        validate_name(&self.name)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    /// Validates a merge patch before it is sent to the repository and trims
    /// `name` the same way [`User::new`] does. Only `name` and `email` may change.
    pub fn normalize_patch(patch: Value) -> Result<Value, RepositoryError> {
        let Value::Object(mut fields) = patch else {
            return Err(RepositoryError::validation(
                "body",
                "patch must be a JSON object",
            ));
        };

        for (field, value) in fields.iter() {
            match (field.as_str(), value) {
                ("name", Value::String(name)) => validate_name(name)?,
                ("name", _) => {
                    return Err(RepositoryError::validation("name", "name must be a string"))
                }
                ("email", Value::String(email)) => validate_email(email)?,
                ("email", Value::Null) => {}
                ("email", _) => {
                    return Err(RepositoryError::validation("email", "email must be a string"))
                }
                (other, _) => {
                    return Err(RepositoryError::validation(
                        other,
                        "field cannot be changed",
                    ))
                }
            }
        }

        if let Some(Value::String(name)) = fields.get_mut("name") {
            *name = name.trim().to_string();
        }
        Ok(Value::Object(fields))
    }
}

fn validate_name(name: &str) -> Result<(), RepositoryError> {
    let length = name.trim().chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
        return Err(RepositoryError::validation(
            "name",
            format!(
                "name must be between {} and {} characters",
                MIN_NAME_LENGTH, MAX_NAME_LENGTH
            ),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), RepositoryError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(RepositoryError::validation(
            "email",
            "email must look like name@domain",
        )),
    }
}
