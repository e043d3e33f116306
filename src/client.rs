use crate::record::{
    Coordinate, IdentifyResponse, InvasivePlant, PlantMatch, ValidateRequest, ValidateResponse,
};
use log::info;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

const USER_AGENT: &str = concat!("plant-tracker/", env!("CARGO_PKG_VERSION"));

pub struct PlantApiClient {
    client: Client,
    base_url: String,
    pub(crate) timeout: Duration,
}

fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to create HTTP client")
}

impl PlantApiClient {
    pub fn new(base_url: &str) -> Self {
        let timeout = Duration::from_secs(10);
        Self {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self.client = build_http_client(self.timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch previously validated sightings. Only invasive-flagged entries
    /// are kept, and relative image paths are resolved against the API base.
    pub async fn fetch_invasive_plants(
        &self,
    ) -> Result<Vec<InvasivePlant>, Box<dyn std::error::Error>> {
        let url = format!("{}/getInvasivPlants", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(format!("HTTP error {} from {}", response.status(), url).into());
        }

        let plants: Vec<InvasivePlant> = response.json().await?;
        info!("Fetched {} sightings from {}", plants.len(), url);

        Ok(filter_invasive(plants, &self.base_url))
    }

    /// Send an image and its coordinate to the identification service.
    /// Callers must have a coordinate in hand before getting here.
    pub async fn identify(
        &self,
        image: Vec<u8>,
        file_name: &str,
        coordinate: Coordinate,
    ) -> Result<IdentifyResponse, Box<dyn std::error::Error>> {
        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .part("image", part)
            .text("latitude", coordinate.latitude.to_string())
            .text("longitude", coordinate.longitude.to_string());

        let url = format!("{}/process-image", self.base_url);
        info!("Sending identification request for {} to {}", file_name, url);

        let response = self.client.post(&url).multipart(form).send().await?;
        let parsed = response.json::<IdentifyResponse>().await?;
        Ok(parsed)
    }

    /// Confirm a chosen candidate match. `image_url` defaults to the match's
    /// first reference image when not supplied by the caller.
    pub async fn validate_match(
        &self,
        chosen: &PlantMatch,
        coordinate: Coordinate,
        image_url: Option<String>,
    ) -> Result<ValidateResponse, Box<dyn std::error::Error>> {
        let request = ValidateRequest {
            scientific_name: chosen.species.scientific_name.clone(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            image_url: image_url.or_else(|| chosen.primary_image_url().map(String::from)),
        };

        let url = format!("{}/validate-match", self.base_url);
        info!(
            "Validating match {} at {}",
            request.scientific_name, coordinate
        );

        let response = self.client.post(&url).json(&request).send().await?;
        let parsed = response.json::<ValidateResponse>().await?;
        Ok(parsed)
    }
}

pub(crate) fn filter_invasive(plants: Vec<InvasivePlant>, base_url: &str) -> Vec<InvasivePlant> {
    plants
        .into_iter()
        .filter(|plant| plant.is_invasive)
        .map(|mut plant| {
            if let Some(url) = plant.img_url.take() {
                plant.img_url = Some(resolve_image_url(base_url, url));
            }
            plant
        })
        .collect()
}

fn resolve_image_url(base_url: &str, url: String) -> String {
    if url.starts_with('/') {
        format!("{}{}", base_url, url)
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plant(name: &str, is_invasive: bool, img_url: Option<&str>) -> InvasivePlant {
        InvasivePlant {
            name: name.to_string(),
            probability: 0.9,
            is_invasive,
            img_url: img_url.map(String::from),
            latitude: 46.2,
            longitude: 2.2,
            family: Some("Asteraceae".to_string()),
        }
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = PlantApiClient::new("http://localhost:3000");
        assert_eq!(client.timeout, Duration::from_secs(10));
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_client_configuration() {
        let client = PlantApiClient::new("http://localhost:3000/").with_timeout(30);
        assert_eq!(client.timeout, Duration::from_secs(30));
        // Trailing slash is trimmed so joined paths stay clean.
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn filter_drops_non_invasive_entries() {
        let plants = vec![
            sample_plant("Ambroisie", true, None),
            sample_plant("Paquerette", false, None),
        ];

        let kept = filter_invasive(plants, "http://localhost:3000");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Ambroisie");
    }

    #[test]
    fn filter_resolves_relative_image_urls() {
        let plants = vec![
            sample_plant("Ambroisie", true, Some("/uploads/1.jpg")),
            sample_plant("Renouee", true, Some("https://img.example/2.jpg")),
        ];

        let kept = filter_invasive(plants, "http://localhost:3000");
        assert_eq!(
            kept[0].img_url.as_deref(),
            Some("http://localhost:3000/uploads/1.jpg")
        );
        assert_eq!(
            kept[1].img_url.as_deref(),
            Some("https://img.example/2.jpg")
        );
    }
}
