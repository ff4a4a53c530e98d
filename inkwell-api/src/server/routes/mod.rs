use crate::server::{ServerError, ServerRouter};
use axum::{Router, extract::FromRequestParts, response::Redirect};
use axum_extra::{extract::Query, routing::TypedPath};
use inkwell_common::pagination::RequestedPage;
use serde::Deserialize;

mod comments;
mod follows;
mod groups;
mod posts;
mod profiles;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(groups::routes())
        .merge(profiles::routes())
        .merge(follows::routes())
}

/// `?page=N` on listing routes. When the key repeats, the last value counts.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, FromRequestParts)]
#[from_request(via(Query), rejection(ServerError))]
struct PageQuery {
    #[serde(default)]
    page: Vec<String>,
}

impl PageQuery {
    fn requested(&self) -> RequestedPage {
        RequestedPage::parse(self.page.last().map(String::as_str))
    }
}

fn see_other(path: &impl TypedPath) -> Redirect {
    Redirect::to(&path.to_string())
}
