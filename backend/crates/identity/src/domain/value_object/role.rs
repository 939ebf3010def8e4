//! Role Registry
//!
//! The role set is fixed at compile time. Each role has a stable numeric id
//! (storage) and a stable code (tokens, API).

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum Role {
    #[default]
    Student = 0,
    Instructor = 1,
    Admin = 2,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Instructor, Role::Admin];

    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    /// Resolve a role name, case-insensitively
    pub fn from_name(name: &str) -> AppResult<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                AppError::validation(format!("Unknown role: {name}"))
                    .with_action("Use one of STUDENT, INSTRUCTOR, ADMIN")
            })
    }

    /// Resolve a list of role names, deduplicated in first-seen order
    ///
    /// An empty list yields the default role.
    pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> AppResult<Vec<Self>> {
        let mut roles = Vec::with_capacity(names.len().max(1));
        for name in names {
            let role = Self::from_name(name.as_ref())?;
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        if roles.is_empty() {
            roles.push(Role::default());
        }
        Ok(roles)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
