use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    routes::{posts::PostDetailPath, see_other},
};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use inkwell_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    form::CommentForm,
    post::PostMarker,
};
use inkwell_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(add_comment)
        .typed_post(edit_comment)
        .typed_post(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comment/", rejection(ServerError))]
struct AddCommentPath {
    id: Id<PostMarker>,
}

async fn add_comment(
    AddCommentPath { id }: AddCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    form: Result<Json<CommentForm>>,
) -> Result<Redirect> {
    if db.fetch_post(id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(id));
    }

    match form.map(|Json(form)| form.validate()) {
        Ok(Ok(text)) => {
            let comment_id = db.create_comment(id, user.id(), &text).await?;
            info!(%comment_id, post_id = %id, author = %user.username(), "Created comment");
        }
        Ok(Err(errors)) => debug!(?errors, post_id = %id, "Discarded invalid comment"),
        Err(err) => debug!(%err, post_id = %id, "Discarded unreadable comment"),
    }

    Ok(see_other(&PostDetailPath { id }))
}

async fn fetch_post_comment(
    db: &DbClient,
    id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
) -> Result<Comment> {
    db.fetch_comment(comment_id)
        .await?
        .filter(|comment| comment.post_id == id)
        .ok_or(ServerError::CommentByIdNotFound(comment_id))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/{comment_id}/edit/", rejection(ServerError))]
struct EditCommentPath {
    id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

async fn edit_comment(
    EditCommentPath { id, comment_id }: EditCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    form: Result<Json<CommentForm>>,
) -> Result<Redirect> {
    let comment = fetch_post_comment(&db, id, comment_id).await?;

    if comment.author.id == user.id() {
        if let Ok(Ok(text)) = form.map(|Json(form)| form.validate()) {
            db.update_comment(comment_id, &text).await?;
            info!(%comment_id, "Updated comment");
        }
    } else {
        info!(%comment_id, user = %user.username(), "Refused edit of foreign comment");
    }

    Ok(see_other(&PostDetailPath { id }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/{comment_id}/delete/", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id, comment_id }: DeleteCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Redirect> {
    let comment = fetch_post_comment(&db, id, comment_id).await?;

    if comment.author.id == user.id() {
        db.delete_comment(comment_id).await?;
        info!(%comment_id, "Deleted comment");
    } else {
        info!(%comment_id, user = %user.username(), "Refused deletion of foreign comment");
    }

    Ok(see_other(&PostDetailPath { id }))
}
