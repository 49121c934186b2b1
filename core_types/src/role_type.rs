use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::CoreTypeError;

/// Built-in permission levels that can be bound to a group.
#[derive(
    Debug, Clone, PartialEq, Copy, EnumIter, Display, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum RoleType {
    Guest = 1,
    Reader = 2,
    Contributor = 3,
    #[strum(serialize = "Web Designer")]
    WebDesigner = 4,
    Administrator = 5,
    Editor = 6,
}

impl RoleType {
    pub fn to_int(&self) -> u8 {
        *self as u8
    }

    pub fn from_int(value: u8) -> Result<Self, CoreTypeError> {
        match value {
            1 => Ok(RoleType::Guest),
            2 => Ok(RoleType::Reader),
            3 => Ok(RoleType::Contributor),
            4 => Ok(RoleType::WebDesigner),
            5 => Ok(RoleType::Administrator),
            6 => Ok(RoleType::Editor),
            _ => Err(CoreTypeError::ConversionError(
                "Failed convert to RoleType".to_string(),
            )),
        }
    }
}

/// A group name paired with the role it should hold on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub group_name: String,
    pub role: RoleType,
}

impl RoleBinding {
    pub fn new(group_name: impl Into<String>, role: RoleType) -> Self {
        Self {
            group_name: group_name.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_role_type_int_conversion() {
        for role in RoleType::iter() {
            assert_eq!(RoleType::from_int(role.to_int()).unwrap(), role);
        }
        assert!(RoleType::from_int(0).is_err());
    }

    #[test]
    fn test_role_type_display() {
        assert_eq!(RoleType::WebDesigner.to_string(), "Web Designer");
        assert_eq!(RoleType::Reader.to_string(), "Reader");
    }
}
