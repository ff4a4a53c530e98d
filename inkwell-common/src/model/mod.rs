pub mod comment;
pub mod follow;
pub mod form;
pub mod group;
pub mod post;
pub mod user;

use crate::{
    model::{
        form::EmptyTextError,
        group::{InvalidGroupSlugError, InvalidGroupTitleError},
        user::InvalidUsernameError,
    },
    util::NonPositiveDurationError,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{OffsetDateTime, error::ComponentRange};

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    GroupSlug(#[from] InvalidGroupSlugError),
    #[error(transparent)]
    GroupTitle(#[from] InvalidGroupTitleError),
    #[error(transparent)]
    Text(#[from] EmptyTextError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error("Timestamp was out of range: {0}")]
    Timestamp(#[from] ComponentRange),
    #[error("Timestamp {0} cannot be stored as unix nanoseconds")]
    TimestampTooLarge(OffsetDateTime),
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(i64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<i64> for Id<Marker> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for i64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

/// Stored creation times are unix nanoseconds in UTC.
pub fn timestamp_to_nanos(time: OffsetDateTime) -> Result<i64, ModelValidationError> {
    i64::try_from(time.unix_timestamp_nanos())
        .map_err(|_| ModelValidationError::TimestampTooLarge(time))
}

pub fn timestamp_from_nanos(nanos: i64) -> Result<OffsetDateTime, ModelValidationError> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))?)
}
