//! Artwork management: list, create, edit, delete.
//!
//! Images are written to the [`ImageStore`](crate::storage::ImageStore)
//! before the row, so a failed insert or update removes the freshly stored
//! file again. A replaced or deleted artwork's old image is removed only
//! when the store owns its URL.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, instrument, warn};

use galeria_core::{Artwork, ArtworkId};

use crate::db::ArtworkRepository;
use crate::error::{AppError, Result};
use crate::models::{ArtworkForm, ArtworkInput};
use crate::state::AppState;
use crate::storage::{StorageError, UploadedImage};

/// Multipart field carrying the image file.
const IMAGE_FIELD: &str = "image";

/// Artwork row in the admin list.
#[derive(Debug, Clone)]
pub struct ArtworkRow {
    pub id: String,
    pub title: String,
    pub price: String,
    pub image_url: String,
    pub details: String,
    pub year: String,
    pub available: bool,
}

impl From<&Artwork> for ArtworkRow {
    fn from(artwork: &Artwork) -> Self {
        Self {
            id: artwork.id.to_string(),
            title: artwork.title.clone(),
            price: artwork.price.display(),
            image_url: artwork.image_url.clone(),
            details: artwork.details(),
            year: artwork.year.map(|y| y.to_string()).unwrap_or_default(),
            available: artwork.available,
        }
    }
}

/// Artwork list template.
#[derive(Template, WebTemplate)]
#[template(path = "artworks/index.html")]
pub struct IndexTemplate {
    pub artworks: Vec<ArtworkRow>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "artworks/form.html")]
pub struct FormTemplate {
    pub heading: &'static str,
    pub action: String,
    pub form: ArtworkForm,
    /// Current image when editing.
    pub image_url: Option<String>,
    pub errors: Vec<String>,
}

impl FormTemplate {
    fn create(form: ArtworkForm, errors: Vec<String>) -> Self {
        Self {
            heading: "Pridať obraz",
            action: "/obrazy".to_string(),
            form,
            image_url: None,
            errors,
        }
    }

    fn edit(artwork: &Artwork, form: ArtworkForm, errors: Vec<String>) -> Self {
        Self {
            heading: "Upraviť obraz",
            action: format!("/obrazy/{}", artwork.id),
            form,
            image_url: Some(artwork.image_url.clone()),
            errors,
        }
    }

    fn rejected(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, self).into_response()
    }
}

/// List all artworks, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<IndexTemplate> {
    let artworks = ArtworkRepository::new(state.pool()).list().await?;
    Ok(IndexTemplate {
        artworks: artworks.iter().map(ArtworkRow::from).collect(),
    })
}

/// Empty form for a new artwork.
pub async fn new_form() -> FormTemplate {
    FormTemplate::create(ArtworkForm::new_listing(), Vec::new())
}

/// Create an artwork from the multipart form.
#[instrument(skip(state, multipart))]
pub async fn create(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let (form, image) = read_artwork_form(multipart).await?;

    let (input, image) = match (form.validate(), image) {
        (Ok(input), Some(image)) => (input, image),
        (validated, image) => {
            let mut errors = validated.err().unwrap_or_default();
            if image.is_none() {
                errors.push("Obrázok je povinný".to_string());
            }
            return Ok(FormTemplate::create(form, errors).rejected());
        }
    };

    let image_url = match store_image(&state, image).await? {
        Ok(url) => url,
        Err(message) => return Ok(FormTemplate::create(form, vec![message]).rejected()),
    };

    let created = match ArtworkRepository::new(state.pool())
        .create(&input, &image_url)
        .await
    {
        Ok(artwork) => artwork,
        Err(e) => {
            discard_image(&state, &image_url).await;
            return Err(e.into());
        }
    };

    info!(artwork_id = %created.id, title = %created.title, "Artwork created");
    Ok(Redirect::to("/").into_response())
}

/// Form pre-filled with an existing artwork.
#[instrument(skip(state))]
pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<FormTemplate> {
    let artwork = ArtworkRepository::new(state.pool())
        .get(parse_id(&id)?)
        .await?;
    Ok(FormTemplate::edit(
        &artwork,
        ArtworkForm::from_artwork(&artwork),
        Vec::new(),
    ))
}

/// Update an artwork; a new image replaces the old one.
#[instrument(skip(state, multipart))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response> {
    let repo = ArtworkRepository::new(state.pool());
    let existing = repo.get(parse_id(&id)?).await?;
    let (form, image) = read_artwork_form(multipart).await?;

    let input: ArtworkInput = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(FormTemplate::edit(&existing, form, errors).rejected()),
    };

    let new_image_url = match image {
        Some(image) => match store_image(&state, image).await? {
            Ok(url) => Some(url),
            Err(message) => {
                return Ok(FormTemplate::edit(&existing, form, vec![message]).rejected());
            }
        },
        None => None,
    };

    let image_url = new_image_url.as_deref().unwrap_or(&existing.image_url);
    if let Err(e) = repo.update(existing.id, &input, image_url).await {
        if let Some(url) = &new_image_url {
            discard_image(&state, url).await;
        }
        return Err(e.into());
    }

    if new_image_url.is_some() {
        discard_image(&state, &existing.image_url).await;
    }

    info!(artwork_id = %existing.id, "Artwork updated");
    Ok(Redirect::to("/").into_response())
}

/// Delete an artwork and its uploaded image.
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Redirect> {
    let deleted = ArtworkRepository::new(state.pool())
        .delete(parse_id(&id)?)
        .await?;

    discard_image(&state, &deleted.image_url).await;

    info!(artwork_id = %deleted.id, title = %deleted.title, "Artwork deleted");
    Ok(Redirect::to("/"))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_id(raw: &str) -> Result<ArtworkId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("artwork {raw}")))
}

/// Collect the text fields and the optional image from the form.
async fn read_artwork_form(
    mut multipart: Multipart,
) -> Result<(ArtworkForm, Option<UploadedImage>)> {
    let mut form = ArtworkForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            // Browsers send an empty part when no file was chosen
            if !bytes.is_empty() {
                image = Some(UploadedImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            form.set_field(&name, field.text().await?);
        }
    }

    Ok((form, image))
}

/// Store an upload. Rejected files come back as a form message.
async fn store_image(
    state: &AppState,
    image: UploadedImage,
) -> Result<std::result::Result<String, String>> {
    match state.images().store(image).await {
        Ok(url) => Ok(Ok(url)),
        Err(StorageError::Io(e)) => Err(StorageError::Io(e).into()),
        Err(e) => {
            warn!(error = %e, "Image rejected");
            Ok(Err(
                "Obrázok musí byť PNG, JPG, WEBP alebo GIF do 10 MB".to_string()
            ))
        }
    }
}

/// Remove an image if the store owns it. Failures are logged only.
async fn discard_image(state: &AppState, url: &str) {
    let images = state.images();
    if !images.owns(url) {
        return;
    }
    if let Err(e) = images.delete(url).await {
        warn!(error = %e, %url, "Failed to delete image");
    }
}
