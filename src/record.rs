use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback shown when the identification service returns no usable message.
pub const DEFAULT_ERROR_MESSAGE: &str = "Une erreur s'est produite";

/// A latitude/longitude pair locating a capture or sighting. Captured once
/// per request and never adjusted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Exact-match grouping key. Two sightings share a map marker only when
    /// this string is identical, so no spatial tolerance is applied.
    pub fn key(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// A validated sighting as served by `GET /getInvasivPlants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvasivePlant {
    pub name: String,
    pub probability: f64,
    pub is_invasive: bool,
    #[serde(default)]
    pub img_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub family: Option<String>,
}

impl InvasivePlant {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// An unconfirmed species suggestion from the identification service.
/// The list order is the service's ranking and is never re-sorted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantMatch {
    pub score: f64,
    pub species: Species,
    #[serde(default)]
    pub images: Vec<MatchImage>,
}

impl PlantMatch {
    pub fn primary_image_url(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.m.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    #[serde(rename = "scientificName")]
    pub scientific_name: String,
    pub family: Family,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    #[serde(rename = "scientificName")]
    pub scientific_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchImage {
    pub url: ImageUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub m: String,
}

/// Body of a `POST /process-image` response.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyResponse {
    pub status: IdentifyStatus,
    pub message: Option<String>,
    pub results: Option<Vec<PlantMatch>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifyStatus {
    Identified,
    Unidentified,
    Error,
}

/// What the selection flow sees after an identification response: either a
/// non-empty ranked candidate list or a user-facing rejection message.
#[derive(Debug, Clone)]
pub enum IdentifyOutcome {
    Matches(Vec<PlantMatch>),
    Rejected(String),
}

impl IdentifyResponse {
    pub fn into_outcome(self) -> IdentifyOutcome {
        let message = self
            .message
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        match self.status {
            IdentifyStatus::Identified => {
                let results = self.results.unwrap_or_default();
                if results.is_empty() {
                    // "identified" with nothing to show reads like an
                    // unidentified plant.
                    IdentifyOutcome::Rejected(message)
                } else {
                    IdentifyOutcome::Matches(results)
                }
            }
            IdentifyStatus::Unidentified | IdentifyStatus::Error => {
                IdentifyOutcome::Rejected(message)
            }
        }
    }
}

/// Body of a `POST /validate-match` request.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateRequest {
    #[serde(rename = "scientificName")]
    pub scientific_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

/// Body of a `POST /validate-match` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateResponse {
    pub status: ValidateStatus,
    pub message: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "isInvasiv")]
    pub is_invasive: Option<bool>,
    pub family: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "imgUrl")]
    pub img_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateStatus {
    Success,
    Error,
}

/// Flat sighting row for CSV export and result display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingRecord {
    pub name: String,
    pub family: String,
    pub probability: f64,
    pub is_invasive: bool,
    pub img_url: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SightingRecord {
    pub fn from_plant(plant: &InvasivePlant) -> Self {
        Self {
            name: plant.name.clone(),
            family: plant.family.clone().unwrap_or_default(),
            probability: plant.probability,
            is_invasive: plant.is_invasive,
            img_url: plant.img_url.clone().unwrap_or_default(),
            latitude: plant.latitude,
            longitude: plant.longitude,
        }
    }

    /// A freshly validated match. The service vouched for it, so the
    /// probability is pinned to 1.
    pub fn from_validation(
        response: &ValidateResponse,
        coordinate: Coordinate,
        image_url: Option<&str>,
    ) -> Self {
        Self {
            name: response.name.clone().unwrap_or_default(),
            family: response.family.clone().unwrap_or_default(),
            probability: 1.0,
            is_invasive: response.is_invasive.unwrap_or(false),
            img_url: image_url.unwrap_or_default().to_string(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }
}
