//! Product catalog routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bluefitt_core::{DimensionEntry, Product};

use crate::components::DataTableConfig;
use crate::components::data_table::products_table_config;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::catalog;
use crate::state::AppState;

use super::{NotFoundTemplate, UserView, session_failure};

/// Category filter query.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// Product view for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub code: String,
    pub gtin: Option<String>,
    pub name: String,
    pub title: String,
    pub measure: String,
    pub seo_title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub ai_hint: String,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub related_images: Vec<String>,
    pub dimensions: Vec<DimensionEntry>,
    pub dimension_image: Option<String>,
    pub price: String,
    pub stock: i64,
    pub in_stock: bool,
    pub is_active: bool,
    pub updated_at: String,
}

impl ProductView {
    fn new(product: Product, state: &AppState) -> Self {
        let images: Vec<String> = product.images.iter().map(|i| state.image_url(i)).collect();
        Self {
            image_url: product.primary_image().map(|i| state.image_url(i)),
            related_images: product
                .related_images
                .iter()
                .map(|i| state.image_url(i))
                .collect(),
            dimension_image: product.dimension_image.as_deref().map(|i| state.image_url(i)),
            price: if product.price.is_zero() {
                "Consultar".to_string()
            } else {
                product.price.display()
            },
            in_stock: product.in_stock(),
            updated_at: product.updated_at.to_rfc3339(),
            images,
            code: product.code.into_inner(),
            gtin: product.gtin,
            title: product.title,
            name: product.name,
            measure: product.measure,
            seo_title: product.seo_title,
            description: product.description,
            category: product.category,
            brand: product.brand,
            ai_hint: product.ai_hint,
            dimensions: product.dimensions,
            stock: product.stock,
            is_active: product.is_active,
        }
    }
}

/// Products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub table: DataTableConfig,
    pub products: Vec<ProductView>,
    pub fetch_error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub current_user: Option<UserView>,
    pub current_path: String,
    pub product: ProductView,
}

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index))
        .route("/products/{id}", get(show))
}

/// Product list, optionally filtered by `?category=`.
///
/// Filter options come from the unfiltered catalog; with a filter active that
/// takes a second read.
#[instrument(skip(state, session, _user))]
async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<CategoryQuery>,
) -> Response {
    let (user, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, "/products"),
    };

    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let fetch = catalog::products(&store, category).await;

    let categories = match (category, &fetch.data) {
        (None, Some(products)) => catalog::categories(products),
        (Some(selected), _) => {
            let mut all = catalog::products(&store, None)
                .await
                .data
                .map(|products| catalog::categories(&products))
                .unwrap_or_default();
            if !all.iter().any(|c| c == selected) {
                all.push(selected.to_owned());
            }
            all
        }
        (None, None) => Vec::new(),
    };

    if let Some(error) = &fetch.error {
        tracing::warn!(error = %error, "Failed to list products");
    }

    ProductsIndexTemplate {
        current_user: Some(UserView::from(&user)),
        current_path: "/products".to_string(),
        table: products_table_config(&categories, category),
        products: fetch
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|p| ProductView::new(p, &state))
            .collect(),
        fetch_error: fetch.error,
    }
    .into_response()
}

/// Product detail. A missing product renders the not-found page.
#[instrument(skip(state, session, _user))]
async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let current_path = format!("/products/{}", urlencoding::encode(&id));
    let (user, store) = match state.identity().user_store(&session).await {
        Ok(pair) => pair,
        Err(e) => return session_failure(e, &current_path),
    };

    let fetch = catalog::product_by_id(&store, &id).await;
    let current_user = Some(UserView::from(&user));

    match (fetch.data, fetch.error) {
        (Some(product), _) => ProductShowTemplate {
            current_user,
            current_path,
            product: ProductView::new(product, &state),
        }
        .into_response(),
        (None, Some(error)) => {
            tracing::warn!(product_id = %id, error = %error, "Failed to load product");
            (
                StatusCode::BAD_GATEWAY,
                NotFoundTemplate {
                    current_user,
                    current_path,
                    message: format!("No se pudo cargar el producto: {error}"),
                },
            )
                .into_response()
        }
        (None, None) => (
            StatusCode::NOT_FOUND,
            NotFoundTemplate {
                current_user,
                current_path,
                message: format!("El producto {id} no existe."),
            },
        )
            .into_response(),
    }
}
