use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SecurityError;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => ROLE_USER,
            Role::Admin => ROLE_ADMIN,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ROLE_USER => Ok(Role::User),
            ROLE_ADMIN => Ok(Role::Admin),
            other => Err(SecurityError::UnknownRole(other.to_string())),
        }
    }
}

pub fn ensure_role(actual: Role, required: Role) -> Result<(), SecurityError> {
    if actual == required {
        Ok(())
    } else {
        Err(SecurityError::Forbidden { required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_role_names() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" User ".parse::<Role>().unwrap(), Role::User);
        assert!("super_admin".parse::<Role>().is_err());
    }

    #[test]
    fn ensure_role_requires_exact_match() {
        assert!(ensure_role(Role::Admin, Role::Admin).is_ok());
        assert!(matches!(
            ensure_role(Role::User, Role::Admin),
            Err(SecurityError::Forbidden { required: Role::Admin })
        ));
    }
}
