use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    routes::{PageQuery, follows::FollowIndexPath, see_other},
};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use inkwell_common::{
    model::{
        follow::FollowOutcome,
        post::Post,
        user::{User, Username},
    },
    pagination::{Page, Paginator},
};
use inkwell_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(profile)
        .typed_post(follow)
        .typed_post(unfollow)
}

async fn fetch_author(db: &DbClient, username: Username) -> Result<User> {
    match db.fetch_user_by_username(&username).await? {
        Some(author) => Ok(author),
        None => Err(ServerError::UserByUsernameNotFound(username)),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
pub(super) struct ProfilePath {
    pub(super) username: Username,
}

#[derive(Serialize)]
struct ProfileView {
    author: User,
    posts_count: u64,
    followers_count: u64,
    following_count: u64,
    /// Whether the viewer follows `author`. Always false for anonymous viewers.
    following: bool,
    page: Page<Post>,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(db): State<Arc<DbClient>>,
    State(paginator): State<Paginator>,
    viewer: Option<AuthenticatedUser>,
    query: PageQuery,
) -> Result<Json<ProfileView>> {
    let author = fetch_author(&db, username).await?;

    let page = db
        .fetch_posts(PostFilter::Author(author.id), paginator, query.requested())
        .await?;
    let counts = db.follow_counts(author.id).await?;
    let following = match viewer {
        Some(viewer) => db.is_following(viewer.id(), author.id).await?,
        None => false,
    };

    Ok(Json(ProfileView {
        author,
        posts_count: page.count,
        followers_count: counts.followers,
        following_count: counts.following,
        following,
        page,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/follow/", rejection(ServerError))]
struct FollowPath {
    username: Username,
}

async fn follow(
    FollowPath { username }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Redirect> {
    let author = fetch_author(&db, username).await?;

    match db.follow(user.id(), author.id).await? {
        FollowOutcome::Created => {
            info!(user = %user.username(), author = %author.username, "Followed author");
        }
        outcome => debug!(?outcome, user = %user.username(), "Follow left unchanged"),
    }

    Ok(see_other(&FollowIndexPath()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/unfollow/", rejection(ServerError))]
struct UnfollowPath {
    username: Username,
}

async fn unfollow(
    UnfollowPath { username }: UnfollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Redirect> {
    let author = fetch_author(&db, username).await?;

    if db.unfollow(user.id(), author.id).await? {
        info!(user = %user.username(), author = %author.username, "Unfollowed author");
    }

    Ok(see_other(&FollowIndexPath()))
}
