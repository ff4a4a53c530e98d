use crate::model::{Id, ModelValidationError};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const GROUP_SLUG_MAX_LEN: usize = 50;
pub const GROUP_TITLE_MAX_LEN: usize = 200;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct GroupMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Group {
    pub id: Id<GroupMarker>,
    pub title: String,
    pub slug: GroupSlug,
    pub description: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateGroup {
    pub title: String,
    pub slug: GroupSlug,
    pub description: String,
}

impl CreateGroup {
    pub fn new(
        title: String,
        slug: GroupSlug,
        description: String,
    ) -> Result<Self, ModelValidationError> {
        let title_len = title.trim().chars().count();
        if title_len == 0 || title_len > GROUP_TITLE_MAX_LEN {
            return Err(InvalidGroupTitleError(title).into());
        }

        Ok(Self {
            title,
            slug,
            description,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupSlug(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The group slug is invalid: {0}")]
pub struct InvalidGroupSlugError(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The group title is invalid: {0}")]
pub struct InvalidGroupTitleError(String);

impl GroupSlug {
    /// ASCII letters, digits, `-` and `_`, at most [`GROUP_SLUG_MAX_LEN`] characters.
    pub fn new(slug: String) -> Result<Self, InvalidGroupSlugError> {
        let valid_chars = slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));

        if !slug.is_empty() && valid_chars && slug.len() <= GROUP_SLUG_MAX_LEN {
            Ok(GroupSlug(slug))
        } else {
            Err(InvalidGroupSlugError(slug))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for GroupSlug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GroupSlug {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        GroupSlug::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"GroupSlug"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        ModelValidationError,
        group::{CreateGroup, GROUP_SLUG_MAX_LEN, GroupSlug},
    };

    #[test]
    fn legal_slugs() {
        for legal in ["test", "rust-lang", "group_2", "ABC"] {
            assert!(GroupSlug::new(legal.to_owned()).is_ok(), "{legal}");
        }

        for illegal in ["", "with space", "ümlaut", "dot.ted", "slash/"] {
            assert!(GroupSlug::new(illegal.to_owned()).is_err(), "{illegal}");
        }

        assert!(GroupSlug::new("s".repeat(GROUP_SLUG_MAX_LEN)).is_ok());
        assert!(GroupSlug::new("s".repeat(GROUP_SLUG_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn group_title_required() {
        let slug = GroupSlug::new("test".to_owned()).unwrap();

        assert!(CreateGroup::new("Test group".to_owned(), slug.clone(), String::new()).is_ok());
        assert!(matches!(
            CreateGroup::new("   ".to_owned(), slug, String::new()),
            Err(ModelValidationError::GroupTitle(_))
        ));
    }
}
