//! Links into external apps for weather and nearby places.
//!
//! Nothing here calls a weather or maps API; the front end opens the
//! returned URL in a browser or the maps app.

use std::fmt;

use reqwest::Url;

use crate::models::ValidationError;

const WEATHER_SEARCH_URL: &str = "https://www.google.com/search";

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search";

/// Map zoom level for nearby searches
const MAPS_ZOOM: u8 = 15;

/// Google search for the weather in `city`.
pub fn weather_search_url(city: &str) -> Result<Url, ValidationError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(ValidationError::new("city", "must not be empty"));
    }
    Url::parse_with_params(WEATHER_SEARCH_URL, &[("q", format!("weather in {}", city))])
        .map_err(|_| ValidationError::new("city", "could not be encoded"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceKind {
    TouristAttractions,
    Restaurants,
    Parks,
}

impl PlaceKind {
    pub const ALL: [PlaceKind; 3] = [PlaceKind::TouristAttractions, PlaceKind::Restaurants, PlaceKind::Parks];

    /// Search term as it appears in the maps URL path
    fn slug(&self) -> &'static str {
        match self {
            PlaceKind::TouristAttractions => "tourist+attractions",
            PlaceKind::Restaurants => "restaurants",
            PlaceKind::Parks => "parks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "attractions" | "tourist-attractions" | "tourist attractions" => Some(PlaceKind::TouristAttractions),
            "restaurants" | "food" => Some(PlaceKind::Restaurants),
            "parks" => Some(PlaceKind::Parks),
            _ => None,
        }
    }
}

impl fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaceKind::TouristAttractions => "Tourist attractions",
            PlaceKind::Restaurants => "Restaurants",
            PlaceKind::Parks => "Parks",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::new("latitude", "must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::new("longitude", "must be between -180 and 180"));
        }
        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}, {:.3}", self.latitude, self.longitude)
    }
}

/// Google Maps search for `kind` around `at`.
pub fn nearby_search_url(kind: PlaceKind, at: Coordinates) -> String {
    format!(
        "{}/{}+near+me/@{},{},{}z",
        MAPS_SEARCH_URL,
        kind.slug(),
        at.latitude,
        at.longitude,
        MAPS_ZOOM
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_url_is_form_encoded() {
        let url = weather_search_url(" New Delhi ").unwrap();
        assert_eq!(url.as_str(), "https://www.google.com/search?q=weather+in+New+Delhi");
        assert_eq!(weather_search_url("  ").unwrap_err().field, "city");
    }

    #[test]
    fn test_nearby_url() {
        let at = Coordinates::new(12.9716, 77.5946).unwrap();
        assert_eq!(
            nearby_search_url(PlaceKind::TouristAttractions, at),
            "https://www.google.com/maps/search/tourist+attractions+near+me/@12.9716,77.5946,15z"
        );
        assert_eq!(at.to_string(), "12.972, 77.595");
    }

    #[test]
    fn test_coordinates_range() {
        assert_eq!(Coordinates::new(91.0, 0.0).unwrap_err().field, "latitude");
        assert_eq!(Coordinates::new(0.0, -181.0).unwrap_err().field, "longitude");
        assert_eq!(PlaceKind::from_name("Parks"), Some(PlaceKind::Parks));
        assert_eq!(PlaceKind::from_name("museums"), None);
    }
}
