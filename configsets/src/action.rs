use crate::errors::{ConfigSetError, Result};
use crate::params::{ACTION, Params};
use std::str::FromStr;

/// The closed set of actions accepted by the configsets API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigSetAction {
    Create,
    Delete,
    List,
    Upload,
}

/// Permission an authorization layer must grant before an action runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    ConfigEdit,
    ConfigRead,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ConfigEdit => "config-edit",
            Permission::ConfigRead => "config-read",
        }
    }
}

impl ConfigSetAction {
    pub const ALL: [ConfigSetAction; 4] = [
        ConfigSetAction::Create,
        ConfigSetAction::Delete,
        ConfigSetAction::List,
        ConfigSetAction::Upload,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigSetAction::Create => "CREATE",
            ConfigSetAction::Delete => "DELETE",
            ConfigSetAction::List => "LIST",
            ConfigSetAction::Upload => "UPLOAD",
        }
    }

    pub const fn to_lower(&self) -> &'static str {
        match self {
            ConfigSetAction::Create => "create",
            ConfigSetAction::Delete => "delete",
            ConfigSetAction::List => "list",
            ConfigSetAction::Upload => "upload",
        }
    }

    pub const fn permission(&self) -> Permission {
        match self {
            ConfigSetAction::Create | ConfigSetAction::Delete | ConfigSetAction::Upload => {
                Permission::ConfigEdit
            }
            ConfigSetAction::List => Permission::ConfigRead,
        }
    }

    /// Resolves the `action` parameter of a request.
    pub fn from_params(params: &Params) -> Result<Self> {
        params
            .get(ACTION)
            .ok_or_else(|| ConfigSetError::bad_request("action is a required param"))?
            .parse()
    }
}

impl FromStr for ConfigSetAction {
    type Err = ConfigSetError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigSetAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigSetError::bad_request(format!("Unknown action: {s}")))
    }
}

/// Permission required by a request, or `None` when the action is absent or unknown.
pub fn permission_for(params: &Params) -> Option<Permission> {
    ConfigSetAction::from_params(params)
        .ok()
        .map(|action| action.permission())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(
            "create".parse::<ConfigSetAction>().unwrap(),
            ConfigSetAction::Create
        );
        assert_eq!(
            "UPLOAD".parse::<ConfigSetAction>().unwrap(),
            ConfigSetAction::Upload
        );

        let err = "RELOAD".parse::<ConfigSetAction>().unwrap_err();
        assert!(matches!(err, ConfigSetError::BadRequest(_)));
        assert_eq!(err.to_string(), "Unknown action: RELOAD");
    }

    #[test]
    fn test_missing_action() {
        let err = ConfigSetAction::from_params(&Params::default()).unwrap_err();
        assert_eq!(err.to_string(), "action is a required param");
    }

    #[test]
    fn test_permissions() {
        let perm = |action: &str| permission_for(&Params::from_pairs([(ACTION, action)]));

        assert_eq!(perm("CREATE"), Some(Permission::ConfigEdit));
        assert_eq!(perm("DELETE"), Some(Permission::ConfigEdit));
        assert_eq!(perm("UPLOAD"), Some(Permission::ConfigEdit));
        assert_eq!(perm("LIST"), Some(Permission::ConfigRead));
        assert_eq!(perm("RELOAD"), None);
        assert_eq!(permission_for(&Params::default()), None);
    }
}
