use serde::{
    Deserialize, Deserializer, Serialize,
    de::{IgnoredAny, MapAccess, SeqAccess, Visitor},
};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};
use thiserror::Error;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Non-empty text with surrounding whitespace removed.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct RequiredText(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Text must not be empty")]
pub struct EmptyTextError;

impl RequiredText {
    pub fn new(text: &str) -> Result<Self, EmptyTextError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(EmptyTextError)
        } else {
            Ok(Self(trimmed.to_owned()))
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

impl Display for RequiredText {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RequiredText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        RequiredText::new(&inner).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<&'static str>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: &'static str) {
        self.0.entry(field).or_default().push(message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn field(&self, field: &str) -> &[&'static str] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

/// A submitted field of any JSON type.
pub(crate) enum Submitted {
    Null,
    Text(String),
    Integer(i64),
    Other(String),
}

struct SubmittedVisitor;

impl<'de> Visitor<'de> for SubmittedVisitor {
    type Value = Submitted;

    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("a form field value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(Submitted::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(Submitted::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Submitted::Other(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Submitted::Integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(i64::try_from(v).map_or_else(|_| Submitted::Other(v.to_string()), Submitted::Integer))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Submitted::Other(v.to_string()))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Submitted::Text(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(Submitted::Text(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Submitted::Other(String::new()))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Submitted::Other(String::new()))
    }
}

impl<'de> Deserialize<'de> for Submitted {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SubmittedVisitor)
    }
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Submitted::deserialize(deserializer)? {
        Submitted::Null => String::new(),
        Submitted::Text(text) | Submitted::Other(text) => text,
        Submitted::Integer(number) => number.to_string(),
    })
}

pub(crate) fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Submitted::deserialize(deserializer)? {
        Submitted::Null => None,
        Submitted::Text(text) | Submitted::Other(text) => Some(text),
        Submitted::Integer(number) => Some(number.to_string()),
    })
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    #[serde(deserialize_with = "lenient_text")]
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<RequiredText, FormErrors> {
        RequiredText::new(&self.text).map_err(|EmptyTextError| {
            let mut errors = FormErrors::default();
            errors.add("text", REQUIRED_MESSAGE);
            errors
        })
    }
}
