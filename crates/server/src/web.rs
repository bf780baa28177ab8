use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Html};
use tera::{Context, Tera};
use tracing::{error, warn};

use crate::routes::AppState;

const INDEX_TEMPLATE: &str = "index.html";

/// Templates from `templates/` on disk, with the built-in chat page as
/// fallback.
pub fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/**/*.html") {
        Ok(tera) => tera,
        Err(load_error) => {
            warn!(
                event_name = "server.web.templates_fallback",
                error = %load_error,
                "failed to load templates from filesystem, using embedded page"
            );
            Tera::default()
        }
    };

    if !tera.get_template_names().any(|name| name == INDEX_TEMPLATE) {
        if let Err(template_error) =
            tera.add_raw_template(INDEX_TEMPLATE, include_str!("../../../templates/index.html"))
        {
            error!(
                event_name = "server.web.template_invalid",
                error = %template_error,
                "embedded index template failed to parse"
            );
        }
    }

    Arc::new(tera)
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let mut context = Context::new();
    context.insert("shop_name", "Print Shop Assistant");
    context.insert("categories", &state.catalog.categories());

    state.templates.render(INDEX_TEMPLATE, &context).map(Html).map_err(|render_error| {
        error!(event_name = "server.web.render_failed", error = %render_error, "index render failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Template Error</h1>".to_string()),
        )
    })
}
