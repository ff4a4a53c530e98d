use inkwell_common::model::{
    ModelValidationError,
    comment::Comment,
    form::RequiredText,
    group::{Group, GroupSlug},
    post::Post,
    timestamp_from_nanos,
    user::{User, Username},
};
use sqlx::FromRow;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct GroupRecord {
    pub group_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_id: i64,
    pub text: String,
    pub image: Option<String>,
    pub created_at: i64,
    pub user_id: i64,
    pub username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    pub group_description: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct FullCommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub text: String,
    pub created_at: i64,
    pub user_id: i64,
    pub username: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.into(),
            username: Username::new(value.username)?,
        })
    }
}

impl TryFrom<GroupRecord> for Group {
    type Error = ModelValidationError;

    fn try_from(value: GroupRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.group_id.into(),
            title: value.title,
            slug: GroupSlug::new(value.slug)?,
            description: value.description,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        // Any column of the joined group is null exactly when the post has no group.
        let group = match (
            value.group_id,
            value.group_title,
            value.group_slug,
            value.group_description,
        ) {
            (Some(group_id), Some(title), Some(slug), Some(description)) => Some(
                GroupRecord {
                    group_id,
                    title,
                    slug,
                    description,
                }
                .try_into()?,
            ),
            _ => None,
        };

        Ok(Self {
            id: value.post_id.into(),
            author: User {
                id: value.user_id.into(),
                username: Username::new(value.username)?,
            },
            group,
            text: RequiredText::new(&value.text)?,
            image: value.image,
            created: timestamp_from_nanos(value.created_at)?,
        })
    }
}

impl TryFrom<FullCommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: FullCommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_id.into(),
            post_id: value.post_id.into(),
            author: User {
                id: value.user_id.into(),
                username: Username::new(value.username)?,
            },
            text: RequiredText::new(&value.text)?,
            created: timestamp_from_nanos(value.created_at)?,
        })
    }
}
