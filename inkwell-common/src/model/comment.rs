use crate::model::{
    Id,
    form::RequiredText,
    post::PostMarker,
    user::User,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub author: User,
    pub text: RequiredText,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}
