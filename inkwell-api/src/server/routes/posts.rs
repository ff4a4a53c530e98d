use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    cache::PageCache,
    json::{Json, JsonBytes, to_bytes},
    routes::{PageQuery, profiles::ProfilePath, see_other},
};
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use inkwell_common::{
    model::{
        Id,
        comment::Comment,
        form::FormErrors,
        group::Group,
        post::{Post, PostForm, PostMarker},
    },
    pagination::{Page, Paginator},
};
use inkwell_db::client::{DbClient, PostFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(post_detail)
        .typed_get(create_form)
        .typed_post(create_post)
        .typed_get(edit_form)
        .typed_post(edit_post)
        .typed_post(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

#[derive(Serialize)]
struct IndexView {
    page: Page<Post>,
}

async fn index(
    IndexPath(): IndexPath,
    uri: Uri,
    State(db): State<Arc<DbClient>>,
    State(cache): State<Arc<PageCache>>,
    State(paginator): State<Paginator>,
    query: PageQuery,
) -> Result<JsonBytes> {
    let key = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), ToString::to_string);

    if let Some(body) = cache.get(&key) {
        return Ok(JsonBytes(body));
    }

    let page = db
        .fetch_posts(PostFilter::All, paginator, query.requested())
        .await?;
    let body = to_bytes(&IndexView { page })?;
    cache.insert(key, body.clone());

    Ok(JsonBytes(body))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
pub(super) struct PostDetailPath {
    pub(super) id: Id<PostMarker>,
}

#[derive(Serialize)]
struct PostDetailView {
    post: Post,
    posts_count: u64,
    comments: Vec<Comment>,
}

async fn post_detail(
    PostDetailPath { id }: PostDetailPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<PostDetailView>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    let posts_count = db.count_posts(PostFilter::Author(post.author.id)).await?;
    let comments = db.fetch_post_comments(id).await?;

    Ok(Json(PostDetailView {
        post,
        posts_count,
        comments,
    }))
}

#[derive(Serialize)]
struct PostFormView {
    form: PostForm,
    errors: FormErrors,
    groups: Vec<Group>,
    is_edit: bool,
    post_id: Option<Id<PostMarker>>,
}

impl PostFormView {
    async fn new(
        db: &DbClient,
        form: PostForm,
        errors: FormErrors,
        post_id: Option<Id<PostMarker>>,
    ) -> Result<Self> {
        Ok(Self {
            form,
            errors,
            groups: db.fetch_groups().await?,
            is_edit: post_id.is_some(),
            post_id,
        })
    }

    fn into_rejection(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

async fn group_exists(db: &DbClient, form: &PostForm) -> Result<bool> {
    match form.group_id() {
        Some(group_id) => Ok(db.fetch_group(group_id).await?.is_some()),
        None => Ok(true),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create/", rejection(ServerError))]
struct CreatePostPath();

async fn create_form(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
) -> Result<Json<PostFormView>> {
    let view = PostFormView::new(&db, PostForm::default(), FormErrors::default(), None).await?;

    Ok(Json(view))
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(form): Json<PostForm>,
) -> Result<Response> {
    let content = match form.validate(group_exists(&db, &form).await?) {
        Ok(content) => content,
        Err(errors) => {
            let view = PostFormView::new(&db, form, errors, None).await?;
            return Ok(view.into_rejection());
        }
    };

    let post_id = db.create_post(&content, user.id()).await?;
    info!(%post_id, author = %user.username(), "Created post");

    Ok(see_other(&ProfilePath {
        username: user.username().clone(),
    })
    .into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit/", rejection(ServerError))]
struct EditPostPath {
    id: Id<PostMarker>,
}

/// `None` if someone else wrote the post.
async fn fetch_own_post(
    db: &DbClient,
    id: Id<PostMarker>,
    user: &AuthenticatedUser,
) -> Result<Option<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok((post.author.id == user.id()).then_some(post))
}

async fn edit_form(
    EditPostPath { id }: EditPostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let Some(post) = fetch_own_post(&db, id, &user).await? else {
        return Ok(see_other(&PostDetailPath { id }).into_response());
    };

    let view =
        PostFormView::new(&db, PostForm::from(&post), FormErrors::default(), Some(id)).await?;

    Ok(Json(view).into_response())
}

async fn edit_post(
    EditPostPath { id }: EditPostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    form: Result<Json<PostForm>>,
) -> Result<Response> {
    if fetch_own_post(&db, id, &user).await?.is_none() {
        info!(post_id = %id, user = %user.username(), "Refused edit of foreign post");
        return Ok(see_other(&PostDetailPath { id }).into_response());
    }

    let Json(form) = form?;

    let content = match form.validate(group_exists(&db, &form).await?) {
        Ok(content) => content,
        Err(errors) => {
            let view = PostFormView::new(&db, form, errors, Some(id)).await?;
            return Ok(view.into_rejection());
        }
    };

    db.update_post(id, &content).await?;
    info!(post_id = %id, "Updated post");

    Ok(see_other(&PostDetailPath { id }).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/delete/", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Response> {
    if fetch_own_post(&db, id, &user).await?.is_none() {
        info!(post_id = %id, user = %user.username(), "Refused deletion of foreign post");
        return Ok(see_other(&PostDetailPath { id }).into_response());
    }

    db.delete_post(id).await?;
    info!(post_id = %id, "Deleted post");

    Ok(see_other(&ProfilePath {
        username: user.username().clone(),
    })
    .into_response())
}
