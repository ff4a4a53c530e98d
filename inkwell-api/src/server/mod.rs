use crate::server::{auth::LoginUrl, cache::PageCache};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{extract::QueryRejection, typed_header::TypedHeaderRejection};
use inkwell_common::{
    model::{
        Id,
        comment::CommentMarker,
        group::GroupSlug,
        post::PostMarker,
        user::Username,
    },
    pagination::Paginator,
    util::PositiveDuration,
};
use inkwell_db::client::{DbClient, DbError};
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

mod auth;
mod cache;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub page_cache: Arc<PageCache>,
    pub paginator: Paginator,
    pub login_url: LoginUrl,
}

impl ServerState {
    pub fn new(
        db_client: DbClient,
        paginator: Paginator,
        page_cache_ttl: PositiveDuration,
        login_url: &str,
    ) -> Self {
        Self {
            db_client: Arc::new(db_client),
            page_cache: Arc::new(PageCache::new(page_cache_ttl)),
            paginator,
            login_url: LoginUrl::new(login_url),
        }
    }
}

pub fn app(state: ServerState) -> Router {
    routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("X-Remote-User header was invalid: {0}")]
    InvalidRemoteUser(TypedHeaderRejection),
    #[error("Login required to access {next}")]
    LoginRequired { login_url: LoginUrl, next: String },
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Group with slug {0} was not found.")]
    GroupBySlugNotFound(GroupSlug),
    #[error("User with username {0} was not found.")]
    UserByUsernameNotFound(Username),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::GroupBySlugNotFound(_)
            | ServerError::UserByUsernameNotFound(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::LoginRequired { .. } => StatusCode::SEE_OTHER,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidRemoteUser(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_) | ServerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::LoginRequired { login_url, next } = &self {
            debug!(%next, %login_url, "Redirecting anonymous request to login");
            return Redirect::to(&login_url.with_next(next)).into_response();
        }

        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
