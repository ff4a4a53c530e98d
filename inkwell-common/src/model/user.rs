use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub const USERNAME_MAX_LEN: usize = 150;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0}")]
pub struct InvalidUsernameError(String);

impl Username {
    /// Letters, digits and `@.+-_`, at most [`USERNAME_MAX_LEN`] characters.
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let valid_chars = username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

        if !username.is_empty() && valid_chars && username.chars().count() <= USERNAME_MAX_LEN {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
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

impl Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{USERNAME_MAX_LEN, Username};

    #[test]
    fn legal_usernames() {
        for legal in ["auth", "leo.tolstoy", "user+tag@example.org", "snake_case-1", "Автор"] {
            assert!(Username::new(legal.to_owned()).is_ok(), "{legal}");
        }

        for illegal in ["", "has space", "semi;colon", "slash/name", "quote'"] {
            assert!(Username::new(illegal.to_owned()).is_err(), "{illegal}");
        }

        assert!(Username::new("a".repeat(USERNAME_MAX_LEN)).is_ok());
        assert!(Username::new("a".repeat(USERNAME_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn deserialize_validates() {
        assert!(serde_json::from_str::<Username>("\"auth\"").is_ok());
        assert!(serde_json::from_str::<Username>("\"not valid\"").is_err());
    }
}
