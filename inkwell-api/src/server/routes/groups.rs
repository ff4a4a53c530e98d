use crate::server::{Result, ServerError, ServerRouter, json::Json, routes::PageQuery};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use inkwell_common::{
    model::{
        group::{Group, GroupSlug},
        post::Post,
    },
    pagination::{Page, Paginator},
};
use inkwell_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(group_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
struct GroupPath {
    slug: GroupSlug,
}

#[derive(Serialize)]
struct GroupView {
    group: Group,
    page: Page<Post>,
}

async fn group_posts(
    GroupPath { slug }: GroupPath,
    State(db): State<Arc<DbClient>>,
    State(paginator): State<Paginator>,
    query: PageQuery,
) -> Result<Json<GroupView>> {
    let Some(group) = db.fetch_group_by_slug(&slug).await? else {
        return Err(ServerError::GroupBySlugNotFound(slug));
    };

    let page = db
        .fetch_posts(PostFilter::Group(group.id), paginator, query.requested())
        .await?;

    Ok(Json(GroupView { group, page }))
}
