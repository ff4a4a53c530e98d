use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json, routes::PageQuery,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use inkwell_common::{
    model::post::Post,
    pagination::{Page, Paginator},
};
use inkwell_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(follow_index)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow/", rejection(ServerError))]
pub(super) struct FollowIndexPath();

#[derive(Serialize)]
struct FollowIndexView {
    page: Page<Post>,
}

async fn follow_index(
    FollowIndexPath(): FollowIndexPath,
    State(db): State<Arc<DbClient>>,
    State(paginator): State<Paginator>,
    user: AuthenticatedUser,
    query: PageQuery,
) -> Result<Json<FollowIndexView>> {
    let page = db
        .fetch_posts(PostFilter::FollowedBy(user.id()), paginator, query.requested())
        .await?;

    Ok(Json(FollowIndexView { page }))
}
