use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Header, HeaderName, HeaderValue};
use inkwell_common::model::{
    Id,
    user::{User, UserMarker, Username},
};
use inkwell_db::client::DbClient;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};
use tracing::debug;

static REMOTE_USER: HeaderName = HeaderName::from_static("x-remote-user");

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct RemoteUser(pub Username);

impl Header for RemoteUser {
    fn name() -> &'static HeaderName {
        &REMOTE_USER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(headers::Error::invalid)?;
        let username = value.to_str().map_err(|_| headers::Error::invalid())?;

        Username::new(username.to_owned())
            .map(Self)
            .map_err(|_| headers::Error::invalid())
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(self.0.get()) {
            values.extend(std::iter::once(value));
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LoginUrl(Arc<str>);

impl LoginUrl {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self(Arc::from(url))
    }

    #[must_use]
    pub fn with_next(&self, next: &str) -> String {
        let separator = if self.0.contains('?') { '&' } else { '?' };
        format!("{}{separator}next={}", self.0, urlencoding::encode(next))
    }
}

impl Display for LoginUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn id(&self) -> Id<UserMarker> {
        self.user.id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.user.username
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let remote_user =
            <TypedHeader<RemoteUser> as OptionalFromRequestParts<S>>::from_request_parts(
                parts, state,
            )
            .await
            .map_err(ServerError::InvalidRemoteUser)?;

        let Some(TypedHeader(RemoteUser(username))) = remote_user else {
            return Ok(None);
        };

        let user = Arc::<DbClient>::from_ref(state)
            .upsert_user(&username)
            .await?;
        debug!(user_id = %user.id, username = %user.username, "Authenticated remote user");

        Ok(Some(Self { user }))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    LoginUrl: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user =
            <Self as OptionalFromRequestParts<S>>::from_request_parts(parts, state).await?;

        user.ok_or_else(|| ServerError::LoginRequired {
            login_url: LoginUrl::from_ref(state),
            next: parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::server::auth::{LoginUrl, RemoteUser};
    use headers::{Header, HeaderValue};

    fn decode(value: &'static str) -> Result<RemoteUser, headers::Error> {
        let value = HeaderValue::from_static(value);
        RemoteUser::decode(&mut std::iter::once(&value))
    }

    #[test]
    fn decode_remote_user() {
        assert_eq!(decode("leo").unwrap().0.get(), "leo");
        assert_eq!(decode("a.b+c@d-e_f").unwrap().0.get(), "a.b+c@d-e_f");
        assert!(decode("").is_err());
        assert!(decode("two words").is_err());
        assert!(RemoteUser::decode(&mut std::iter::empty::<&HeaderValue>()).is_err());
    }

    #[test]
    fn login_url_with_next() {
        assert_eq!(
            LoginUrl::new("/auth/login/").with_next("/create/"),
            "/auth/login/?next=%2Fcreate%2F"
        );
        assert_eq!(
            LoginUrl::new("/auth/login/").with_next("/profile/user+tag/follow/"),
            "/auth/login/?next=%2Fprofile%2Fuser%2Btag%2Ffollow%2F"
        );
        assert_eq!(
            LoginUrl::new("https://id.example.org/login?client=inkwell")
                .with_next("/follow/?page=2"),
            "https://id.example.org/login?client=inkwell&next=%2Ffollow%2F%3Fpage%3D2"
        );
    }
}
