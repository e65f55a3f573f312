//! Cart route handlers.
//!
//! The cart lives in the buyer's session. [`CartStore`] loads it once per
//! request and writes it back after every mutation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{FromRequestParts, State},
    http::request::Parts,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use galeria_core::{ArtworkId, ArtworkSnapshot, Cart};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::models::session;
use crate::state::AppState;

// =============================================================================
// Cart Store
// =============================================================================

/// The buyer's cart, bound to their session.
pub struct CartStore {
    session: Session,
    cart: Cart,
}

impl CartStore {
    /// Load the cart from `session` (empty if none was saved).
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn load(session: Session) -> std::result::Result<Self, tower_sessions::session::Error> {
        let cart = session.get::<Cart>(session::CART).await?.unwrap_or_default();
        Ok(Self { session, cart })
    }

    /// The current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add an artwork and persist. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn add(&mut self, artwork: ArtworkSnapshot) -> Result<bool> {
        let added = self.cart.add(artwork);
        if added {
            self.save().await?;
        }
        Ok(added)
    }

    /// Remove an artwork and persist. Returns `false` if it was not present.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn remove(&mut self, id: ArtworkId) -> Result<bool> {
        let removed = self.cart.remove(id);
        if removed {
            self.save().await?;
        }
        Ok(removed)
    }

    /// Empty the cart and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn clear(&mut self) -> Result<()> {
        self.cart.clear();
        self.save().await
    }

    async fn save(&self) -> Result<()> {
        self.session.insert(session::CART, &self.cart).await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CartStore
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(message.to_string()))?;
        Ok(Self::load(session).await?)
    }
}

// =============================================================================
// View Types
// =============================================================================

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub image_url: String,
    pub details: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView {
                    id: item.artwork.id.to_string(),
                    title: item.artwork.title.clone(),
                    price: item.artwork.price.display(),
                    image_url: item.artwork.image_url.clone(),
                    details: galeria_core::artwork::details_line(
                        item.artwork.dimensions.as_deref(),
                        item.artwork.technique.as_deref(),
                    ),
                })
                .collect(),
            total: cart.total().display(),
            item_count: cart.item_count(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub cart_count: u32,
}

/// Add/remove form data.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub artwork_id: String,
}

fn parse_artwork_id(raw: &str) -> Result<ArtworkId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Neplatné dielo".to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(cart))]
pub async fn show(cart: CartStore) -> CartShowTemplate {
    CartShowTemplate {
        cart: CartView::from(cart.cart()),
        cart_count: cart.cart().item_count(),
    }
}

/// Add an artwork to the cart. Sold artworks are refused.
#[instrument(skip(state, cart))]
pub async fn add(
    State(state): State<AppState>,
    mut cart: CartStore,
    Form(form): Form<CartItemForm>,
) -> Result<Redirect> {
    let id = parse_artwork_id(&form.artwork_id)?;
    let artwork = state
        .store()
        .artwork(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("artwork {id}")))?;
    if !artwork.available {
        return Err(AppError::BadRequest(format!(
            "Dielo „{}“ je už predané",
            artwork.title
        )));
    }

    if cart.add(artwork.snapshot()).await? {
        info!(artwork_id = %id, "Artwork added to cart");
        add_breadcrumb("cart", "Added artwork", Some(&[("artwork_id", &form.artwork_id)]));
    }
    Ok(Redirect::to("/kosik"))
}

/// Remove an artwork from the cart.
#[instrument(skip(cart))]
pub async fn remove(mut cart: CartStore, Form(form): Form<CartItemForm>) -> Result<Redirect> {
    let id = parse_artwork_id(&form.artwork_id)?;
    cart.remove(id).await?;
    Ok(Redirect::to("/kosik"))
}

/// Number of artworks in the cart, as plain text for the header badge.
pub async fn count(cart: CartStore) -> String {
    cart.cart().item_count().to_string()
}
