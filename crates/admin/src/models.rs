//! Artwork form handling.
//!
//! The admin form posts every field as text. [`ArtworkForm`] keeps the raw
//! values so a rejected form can be re-rendered exactly as typed;
//! [`ArtworkForm::validate`] turns it into an [`ArtworkInput`] the repository
//! accepts.

use std::str::FromStr;

use rust_decimal::Decimal;

use galeria_core::{Artwork, Price, PriceError};

/// Validated artwork fields, minus the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkInput {
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    pub dimensions: Option<String>,
    pub technique: Option<String>,
    pub year: Option<i32>,
    pub available: bool,
}

/// Raw artwork form fields.
#[derive(Debug, Clone, Default)]
pub struct ArtworkForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub dimensions: String,
    pub technique: String,
    pub year: String,
    pub available: bool,
}

impl ArtworkForm {
    /// An empty form for a new listing; new artworks start out for sale.
    #[must_use]
    pub fn new_listing() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    /// Pre-fill the form from a stored artwork.
    #[must_use]
    pub fn from_artwork(artwork: &Artwork) -> Self {
        Self {
            title: artwork.title.clone(),
            description: artwork.description.clone().unwrap_or_default(),
            price: artwork.price.to_string(),
            dimensions: artwork.dimensions.clone().unwrap_or_default(),
            technique: artwork.technique.clone().unwrap_or_default(),
            year: artwork.year.map(|y| y.to_string()).unwrap_or_default(),
            available: artwork.available,
        }
    }

    /// Record one text field. Unknown names are ignored.
    ///
    /// Browsers omit unchecked checkboxes, so `available` is true only when
    /// the field is present.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "description" => self.description = value,
            "price" => self.price = value,
            "dimensions" => self.dimensions = value,
            "technique" => self.technique = value,
            "year" => self.year = value,
            "available" => self.available = true,
            _ => {}
        }
    }

    /// Validate the fields.
    ///
    /// # Errors
    ///
    /// Returns every problem found, as messages for the form.
    pub fn validate(&self) -> Result<ArtworkInput, Vec<String>> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push("Názov obrazu je povinný".to_string());
        }

        let price = match parse_price(&self.price) {
            Ok(price) => Some(price),
            Err(message) => {
                errors.push(message);
                None
            }
        };

        let year = match optional(&self.year).map(str::parse::<i32>).transpose() {
            Ok(year) => year,
            Err(_) => {
                errors.push("Rok musí byť celé číslo".to_string());
                None
            }
        };

        match price {
            Some(price) if errors.is_empty() => Ok(ArtworkInput {
                title: title.to_string(),
                description: optional(&self.description).map(str::to_string),
                price,
                dimensions: optional(&self.dimensions).map(str::to_string),
                technique: optional(&self.technique).map(str::to_string),
                year,
                available: self.available,
            }),
            _ => Err(errors),
        }
    }
}

/// Parse a listing price. A decimal comma is accepted.
fn parse_price(raw: &str) -> Result<Price, String> {
    let raw = raw.trim().replace(',', ".");
    if raw.is_empty() {
        return Err("Cena je povinná".to_string());
    }
    let amount =
        Decimal::from_str(&raw).map_err(|_| "Cena musí byť číslo".to_string())?;
    Price::listing(amount).map_err(|e| match e {
        PriceError::NotPositive => "Cena musí byť väčšia ako 0".to_string(),
        PriceError::TooPrecise | PriceError::OutOfRange(_) => {
            "Cena môže mať najviac dve desatinné miesta".to_string()
        }
    })
}

/// Trimmed text, or `None` when blank.
fn optional(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(title: &str, price: &str) -> ArtworkForm {
        let mut form = ArtworkForm::new_listing();
        form.set_field("title", title.to_string());
        form.set_field("price", price.to_string());
        form
    }

    #[test]
    fn test_minimal_form() {
        let input = form("  Západ slnka ", "120").validate().unwrap();
        assert_eq!(input.title, "Západ slnka");
        assert_eq!(input.price.to_minor_units().unwrap(), 12_000);
        assert!(input.description.is_none());
        assert!(input.year.is_none());
        assert!(input.available);
    }

    #[test]
    fn test_optional_fields() {
        let mut f = form("Západ slnka", "250,50");
        f.set_field("description", "Večerná krajina".to_string());
        f.set_field("dimensions", "50x70 cm".to_string());
        f.set_field("technique", "   ".to_string());
        f.set_field("year", "2023".to_string());

        let input = f.validate().unwrap();
        assert_eq!(input.price.to_string(), "250.50");
        assert_eq!(input.description.as_deref(), Some("Večerná krajina"));
        assert_eq!(input.dimensions.as_deref(), Some("50x70 cm"));
        assert!(input.technique.is_none());
        assert_eq!(input.year, Some(2023));
    }

    #[test]
    fn test_title_required() {
        let errors = form("  ", "120").validate().unwrap_err();
        assert_eq!(errors, vec!["Názov obrazu je povinný".to_string()]);
    }

    #[test]
    fn test_price_rules() {
        assert!(form("A", "").validate().is_err());
        assert!(form("A", "abc").validate().is_err());
        assert!(form("A", "0").validate().is_err());
        assert!(form("A", "-5").validate().is_err());
        assert!(form("A", "1.001").validate().is_err());
        assert!(form("A", "0.01").validate().is_ok());
    }

    #[test]
    fn test_year_must_be_integer() {
        let mut f = form("A", "10");
        f.set_field("year", "cca 1990".to_string());
        let errors = f.validate().unwrap_err();
        assert_eq!(errors, vec!["Rok musí byť celé číslo".to_string()]);
    }

    #[test]
    fn test_collects_every_error() {
        let mut f = form("", "0");
        f.set_field("year", "x".to_string());
        assert_eq!(f.validate().unwrap_err().len(), 3);
    }

    #[test]
    fn test_unchecked_checkbox_means_unavailable() {
        let mut f = ArtworkForm::default();
        f.set_field("title", "A".to_string());
        f.set_field("price", "10".to_string());
        assert!(!f.validate().unwrap().available);

        f.set_field("available", "on".to_string());
        assert!(f.validate().unwrap().available);
    }
}
