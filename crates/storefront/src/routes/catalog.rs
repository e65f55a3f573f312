//! Catalog pages: home, gallery listing and artwork detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use galeria_core::{Artwork, ArtworkId};

use super::cart::CartStore;
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

/// Number of artworks featured on the home page.
const HOME_ARTWORKS: i64 = 6;

/// Artwork display data for templates.
#[derive(Clone)]
pub struct ArtworkView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: String,
    pub image_url: String,
    /// `"<dimensions> - <technique>"`, possibly empty.
    pub details: String,
    pub year: Option<i32>,
    pub available: bool,
}

impl From<&Artwork> for ArtworkView {
    fn from(artwork: &Artwork) -> Self {
        Self {
            id: artwork.id.to_string(),
            title: artwork.title.clone(),
            description: artwork.description.clone(),
            price: artwork.price.display(),
            image_url: artwork.image_url.clone(),
            details: artwork.details(),
            year: artwork.year,
            available: artwork.available,
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/home.html")]
pub struct HomeTemplate {
    pub artworks: Vec<ArtworkView>,
    pub cart_count: u32,
}

/// Gallery listing template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct GalleryTemplate {
    pub artworks: Vec<ArtworkView>,
    pub cart_count: u32,
}

/// Artwork detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/show.html")]
pub struct ArtworkTemplate {
    pub artwork: ArtworkView,
    pub in_cart: bool,
    pub cart_count: u32,
}

/// Display the home page.
#[instrument(skip(state, cart))]
pub async fn home(State(state): State<AppState>, cart: CartStore) -> Result<HomeTemplate> {
    let artworks = state.store().latest_available(HOME_ARTWORKS).await?;

    Ok(HomeTemplate {
        artworks: artworks.iter().map(ArtworkView::from).collect(),
        cart_count: cart.cart().item_count(),
    })
}

/// Display every artwork, newest first; sold pieces are marked.
#[instrument(skip(state, cart))]
pub async fn index(State(state): State<AppState>, cart: CartStore) -> Result<GalleryTemplate> {
    let artworks = state.store().list_artworks().await?;

    Ok(GalleryTemplate {
        artworks: artworks.iter().map(ArtworkView::from).collect(),
        cart_count: cart.cart().item_count(),
    })
}

/// Display one artwork.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    cart: CartStore,
    Path(id): Path<String>,
) -> Result<ArtworkTemplate> {
    let not_found = || AppError::NotFound(format!("artwork {id}"));
    let artwork_id: ArtworkId = id.parse().map_err(|_| not_found())?;
    let artwork = state
        .store()
        .artwork(artwork_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ArtworkTemplate {
        in_cart: cart.cart().contains(artwork.id),
        artwork: ArtworkView::from(&artwork),
        cart_count: cart.cart().item_count(),
    })
}
