use crate::{
    model::{
        Id,
        form::{
            FormErrors, INVALID_CHOICE_MESSAGE, REQUIRED_MESSAGE, RequiredText, Submitted,
            lenient_optional_text, lenient_text,
        },
        group::{Group, GroupMarker},
        user::User,
    },
    util::truncate_chars,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

pub const POST_PREVIEW_LEN: usize = 15;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub group: Option<Group>,
    pub text: RequiredText,
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(truncate_chars(self.text.get(), POST_PREVIEW_LEN))
    }
}

/// Validated post fields. The author is always the acting user.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostContent {
    pub text: RequiredText,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupChoice {
    Id(Id<GroupMarker>),
    /// Not a group id at all, kept as sent.
    Invalid(String),
}

fn group_choice<'de, D>(deserializer: D) -> Result<Option<GroupChoice>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Submitted::deserialize(deserializer)? {
        Submitted::Null => None,
        Submitted::Integer(id) => Some(GroupChoice::Id(Id::new(id))),
        Submitted::Text(text) if text.trim().is_empty() => None,
        Submitted::Text(text) => Some(match text.trim().parse::<i64>() {
            Ok(id) => GroupChoice::Id(Id::new(id)),
            Err(_) => GroupChoice::Invalid(text),
        }),
        Submitted::Other(raw) => Some(GroupChoice::Invalid(raw)),
    })
}

/// A post as submitted, echoed back unchanged when it is rejected.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct PostForm {
    #[serde(deserialize_with = "lenient_text")]
    pub text: String,
    #[serde(deserialize_with = "group_choice")]
    pub group: Option<GroupChoice>,
    #[serde(deserialize_with = "lenient_optional_text")]
    pub image: Option<String>,
}

impl PostForm {
    #[must_use]
    pub fn group_id(&self) -> Option<Id<GroupMarker>> {
        match self.group {
            Some(GroupChoice::Id(id)) => Some(id),
            _ => None,
        }
    }

    /// `group_exists` tells whether the selected group id is a known one.
    pub fn validate(&self, group_exists: bool) -> Result<PostContent, FormErrors> {
        let mut errors = FormErrors::default();

        let text = RequiredText::new(&self.text);
        if text.is_err() {
            errors.add("text", REQUIRED_MESSAGE);
        }
        match self.group {
            Some(GroupChoice::Id(_)) if !group_exists => {
                errors.add("group", INVALID_CHOICE_MESSAGE);
            }
            Some(GroupChoice::Invalid(_)) => errors.add("group", INVALID_CHOICE_MESSAGE),
            _ => {}
        }

        match text {
            Ok(text) if errors.is_empty() => Ok(PostContent {
                text,
                group: self.group_id(),
                image: self
                    .image
                    .as_deref()
                    .map(str::trim)
                    .filter(|image| !image.is_empty())
                    .map(str::to_owned),
            }),
            _ => Err(errors),
        }
    }
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            text: post.text.get().to_owned(),
            group: post.group.as_ref().map(|group| GroupChoice::Id(group.id)),
            image: post.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        form::{INVALID_CHOICE_MESSAGE, REQUIRED_MESSAGE, RequiredText},
        post::{GroupChoice, Post, PostForm},
        user::{User, Username},
    };
    use time::macros::datetime;

    #[test]
    fn valid_post_form() {
        let form = PostForm {
            text: "  First post  ".to_owned(),
            group: Some(GroupChoice::Id(Id::new(3))),
            image: Some("posts/small.gif".to_owned()),
        };

        let content = form.validate(true).unwrap();
        assert_eq!(content.text.get(), "First post");
        assert_eq!(content.group, Some(Id::new(3)));
        assert_eq!(content.image.as_deref(), Some("posts/small.gif"));
    }

    #[test]
    fn blank_image_is_absent() {
        let form = PostForm {
            text: "text".to_owned(),
            group: None,
            image: Some("  ".to_owned()),
        };

        assert_eq!(form.validate(false).unwrap().image, None);
    }

    #[test]
    fn invalid_post_form_reports_every_field() {
        let form = PostForm {
            text: "   ".to_owned(),
            group: Some(GroupChoice::Id(Id::new(99))),
            image: None,
        };

        let errors = form.validate(false).unwrap_err();
        assert_eq!(errors.field("text"), [REQUIRED_MESSAGE]);
        assert_eq!(errors.field("group"), [INVALID_CHOICE_MESSAGE]);
    }

    #[test]
    fn malformed_fields_become_form_errors() {
        let parse = |body: &str| serde_json::from_str::<PostForm>(body).unwrap();

        let form = parse(r#"{ "text": null, "group": "abc", "image": null }"#);
        assert_eq!(form.text, "");
        assert_eq!(form.group, Some(GroupChoice::Invalid("abc".to_owned())));
        assert_eq!(form.image, None);

        let errors = form.validate(true).unwrap_err();
        assert_eq!(errors.field("text"), [REQUIRED_MESSAGE]);
        assert_eq!(errors.field("group"), [INVALID_CHOICE_MESSAGE]);

        assert_eq!(parse(r#"{ "group": "" }"#).group, None);
        assert_eq!(parse(r#"{ "group": " 7 " }"#).group_id(), Some(Id::new(7)));
        assert_eq!(parse(r#"{ "group": 7 }"#).group_id(), Some(Id::new(7)));
        assert_eq!(
            parse(r#"{ "group": 1.5 }"#).group,
            Some(GroupChoice::Invalid("1.5".to_owned()))
        );
        assert!(matches!(
            parse(r#"{ "group": [1] }"#).group,
            Some(GroupChoice::Invalid(_))
        ));

        let valid = parse(r#"{ "text": "hello", "group": "" }"#);
        assert_eq!(valid.validate(false).unwrap().group, None);
    }

    #[test]
    fn post_display_is_truncated() {
        let post = Post {
            id: Id::new(1),
            author: User {
                id: Id::new(1),
                username: Username::new("auth".to_owned()).unwrap(),
            },
            group: None,
            text: RequiredText::new("A post that is clearly longer than fifteen").unwrap(),
            image: None,
            created: datetime!(2022-12-19 14:55 UTC),
        };

        assert_eq!(post.to_string(), "A post that is ");
        assert_eq!(PostForm::from(&post).text, post.text.get());
    }
}
