//! Variable references and their lookup against user and space data

use crate::error::TemplateError;
use spacereg_core::{Space, User};
use std::fmt;

/// Field of a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    /// `Id.OpaqueId`
    OpaqueId,
    /// `Id.Idp`
    Idp,
    /// `Username`
    Username,
    /// `Mail`
    Mail,
    /// `DisplayName`
    DisplayName,
}

impl UserField {
    fn parse(parts: &[&str]) -> Option<Self> {
        match parts {
            ["Id", "OpaqueId"] => Some(Self::OpaqueId),
            ["Id", "Idp"] => Some(Self::Idp),
            ["Username"] => Some(Self::Username),
            ["Mail"] => Some(Self::Mail),
            ["DisplayName"] => Some(Self::DisplayName),
            _ => None,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::OpaqueId => "Id.OpaqueId",
            Self::Idp => "Id.Idp",
            Self::Username => "Username",
            Self::Mail => "Mail",
            Self::DisplayName => "DisplayName",
        }
    }

    fn read(self, user: &User) -> &str {
        match self {
            Self::OpaqueId => &user.id.opaque_id,
            Self::Idp => &user.id.idp,
            Self::Username => &user.username,
            Self::Mail => &user.mail,
            Self::DisplayName => &user.display_name,
        }
    }
}

/// Field of a space record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceField {
    /// `Id.OpaqueId` or `ID`: the compound space id
    Id,
    /// `Name`
    Name,
    /// `SpaceType`
    SpaceType,
    /// `Root.StorageId`
    RootStorageId,
    /// `Root.SpaceId`
    RootSpaceId,
    /// `Root.OpaqueId`
    RootOpaqueId,
    /// `Owner.<user field>`
    Owner(UserField),
}

impl SpaceField {
    fn parse(parts: &[&str]) -> Option<Self> {
        match parts {
            ["Id", "OpaqueId"] | ["ID"] => Some(Self::Id),
            ["Name"] => Some(Self::Name),
            ["SpaceType"] => Some(Self::SpaceType),
            ["Root", "StorageId"] => Some(Self::RootStorageId),
            ["Root", "SpaceId"] => Some(Self::RootSpaceId),
            ["Root", "OpaqueId"] => Some(Self::RootOpaqueId),
            ["Owner", rest @ ..] => UserField::parse(rest).map(Self::Owner),
            _ => None,
        }
    }
}

/// A variable reference such as `.Space.Owner.Username`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Field of the requesting user
    CurrentUser(UserField),
    /// Field of the space being placed or resolved
    Space(SpaceField),
}

impl Variable {
    /// Parse a dotted path; a leading dot is optional
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.strip_prefix('.').unwrap_or(path);
        let parts: Vec<&str> = trimmed.split('.').collect();
        match parts.as_slice() {
            ["CurrentUser", rest @ ..] => UserField::parse(rest).map(Self::CurrentUser),
            ["Space", rest @ ..] => SpaceField::parse(rest).map(Self::Space),
            _ => None,
        }
    }

    /// True for dotted paths and bare roots, known or not
    pub(crate) fn looks_like_variable(path: &str) -> bool {
        path.contains('.') || path == "CurrentUser" || path == "Space"
    }

    /// True when rendering requires a current user
    pub fn needs_user(self) -> bool {
        matches!(self, Self::CurrentUser(_))
    }

    /// True when rendering requires a space owner
    pub fn needs_owner(self) -> bool {
        matches!(self, Self::Space(SpaceField::Owner(_)))
    }

    /// Read the value, failing if the user or owner is absent
    pub(crate) fn read<'a>(
        self,
        user: Option<&'a User>,
        space: Option<&'a Space>,
    ) -> Result<&'a str, TemplateError> {
        match self {
            Self::CurrentUser(field) => user
                .map(|u| field.read(u))
                .ok_or_else(|| TemplateError::missing("CurrentUser")),
            Self::Space(field) => {
                let space = space.ok_or_else(|| TemplateError::missing("Space"))?;
                Self::read_space(field, space)
            }
        }
    }

    fn read_space(field: SpaceField, space: &Space) -> Result<&str, TemplateError> {
        match field {
            SpaceField::Id => Ok(space.id.as_str()),
            SpaceField::Name => Ok(&space.name),
            SpaceField::SpaceType => Ok(&space.space_type),
            SpaceField::RootStorageId => Ok(&space.root.storage_id),
            SpaceField::RootSpaceId => Ok(&space.root.space_id),
            SpaceField::RootOpaqueId => Ok(&space.root.opaque_id),
            SpaceField::Owner(user_field) => space
                .owner
                .as_ref()
                .map(|o| user_field.read(o))
                .ok_or_else(|| TemplateError::missing("Space.Owner")),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentUser(field) => write!(f, "CurrentUser.{}", field.path()),
            Self::Space(field) => match field {
                SpaceField::Id => f.write_str("Space.Id.OpaqueId"),
                SpaceField::Name => f.write_str("Space.Name"),
                SpaceField::SpaceType => f.write_str("Space.SpaceType"),
                SpaceField::RootStorageId => f.write_str("Space.Root.StorageId"),
                SpaceField::RootSpaceId => f.write_str("Space.Root.SpaceId"),
                SpaceField::RootOpaqueId => f.write_str("Space.Root.OpaqueId"),
                SpaceField::Owner(user_field) => write!(f, "Space.Owner.{}", user_field.path()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_dot() {
        assert_eq!(
            Variable::parse(".Space.Name"),
            Some(Variable::Space(SpaceField::Name))
        );
        assert_eq!(
            Variable::parse("Space.Name"),
            Some(Variable::Space(SpaceField::Name))
        );
        assert_eq!(
            Variable::parse("Space.Owner.Id.OpaqueId"),
            Some(Variable::Space(SpaceField::Owner(UserField::OpaqueId)))
        );
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(Variable::parse("Space.Quota"), None);
        assert_eq!(Variable::parse("CurrentUser"), None);
        assert_eq!(Variable::parse("Env.HOME"), None);
        assert!(Variable::looks_like_variable("Space.Quota"));
        assert!(!Variable::looks_like_variable("lower"));
    }

    #[test]
    fn test_missing_owner() {
        let space = Space::new("s1", "o1", "Shared", "project");
        let err = Variable::Space(SpaceField::Owner(UserField::Username))
            .read(None, Some(&space))
            .unwrap_err();
        assert_eq!(err, TemplateError::missing("Space.Owner"));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let var = Variable::CurrentUser(UserField::Idp);
        assert_eq!(Variable::parse(&var.to_string()), Some(var));
    }
}
