//! Course catalog, enrollment and contacting a course's instructor.

mod bootstrap;
mod catalog;

use axum::{routing::{get, post}, Router};

use crate::{gateway::Gateway, AppState};

pub use bootstrap::{introduction, BootstrapReport, SeedOutcome};

/// Course operations over one gateway.
pub struct Courses<'a, G> {
    gateway: &'a G,
}

impl<'a, G: Gateway> Courses<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list))
        .route("/mine", get(catalog::mine))
        .route("/{id}", get(catalog::show))
        .route("/{id}/enroll", post(catalog::enroll))
        .route("/{id}/contact", post(bootstrap::contact))
}
