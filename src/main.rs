mod client;
mod gps;
mod map;
mod parse;
mod record;
mod util;
mod watch;

use crate::client::PlantApiClient;
use crate::parse::{Args, Command};
use crate::record::{Coordinate, IdentifyOutcome, PlantMatch, SightingRecord, ValidateStatus};
use crate::util::print_hms;
use crate::watch::LocationTracker;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const MISSING_COORDINATE_MESSAGE: &str =
    "Position GPS non disponible. Veuillez réessayer.";
pub const PROCESSING_ERROR_MESSAGE: &str =
    "Une erreur s'est produite lors du traitement de l'image";
pub const VALIDATION_ERROR_MESSAGE: &str =
    "Une erreur s'est produite lors de la validation";
pub const FETCH_ERROR_MESSAGE: &str =
    "Erreur lors de la récupération des plantes invasives.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::try_parse()?;
    // Initialize logger
    env_logger::init();

    let client = PlantApiClient::new(&args.api_url).with_timeout(args.timeout);

    match args.command {
        Command::Identify {
            images,
            latitude,
            longitude,
            select,
            output,
        } => {
            run_identify(
                &client,
                &images,
                latitude,
                longitude,
                select,
                output.as_deref(),
            )
            .await?;
        }
        Command::Watch {
            dir,
            fix,
            location_interval,
            scan_interval,
            select,
            output,
        } => {
            run_watch(
                &client,
                &dir,
                fix,
                location_interval,
                scan_interval,
                select,
                output.as_deref(),
            )
            .await?;
        }
        Command::Map { output, no_legend } => {
            run_map(&client, &output, !no_legend).await?;
        }
    }

    Ok(())
}

/// The upload flow: coordinate from EXIF metadata (or CLI override), then
/// identify, select, validate, one image at a time.
async fn run_identify(
    client: &PlantApiClient,
    images: &[PathBuf],
    latitude: Option<f64>,
    longitude: Option<f64>,
    select: Option<usize>,
    output: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let override_coordinate = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
        (None, None) => None,
        _ => {
            return Err(
                "Both --latitude and --longitude are required to override GPS metadata".into(),
            );
        }
    };

    let start = Instant::now();
    let progress = (images.len() > 1).then(|| {
        let bar = ProgressBar::new(images.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        bar.set_message("Identifying images");
        bar
    });

    let mut validated: Vec<SightingRecord> = Vec::new();
    for path in images {
        let coordinate = match override_coordinate {
            Some(coordinate) => coordinate,
            None => match gps::read_gps_coordinate(path) {
                Ok(coordinate) => coordinate,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    if let Some(bar) = &progress {
                        bar.inc(1);
                    }
                    continue;
                }
            },
        };

        match identify_and_validate(client, path, coordinate, select).await {
            Ok(Some(record)) => validated.push(record),
            Ok(None) => {}
            Err(e) => eprintln!("{}: {}", path.display(), e),
        }

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    print_hms(&start);

    info!(
        "Validated {} out of {} images",
        validated.len(),
        images.len()
    );

    if let Some(output) = output {
        if !validated.is_empty() {
            util::save_sightings_csv(&validated, output)?;
        }
    }

    Ok(())
}

/// The capture flow: a directory stands in for the camera, and a background
/// task refreshes the GPS fix on a fixed interval until teardown.
async fn run_watch(
    client: &PlantApiClient,
    dir: &Path,
    fix: PathBuf,
    location_interval: u64,
    scan_interval: u64,
    select: Option<usize>,
    output: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    if !dir.is_dir() {
        return Err(format!("{} is not a directory", dir.display()).into());
    }

    let tracker = LocationTracker::spawn(fix, Duration::from_secs(location_interval));

    // Images already present are not captures from this session.
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let existing = watch::scan_new_images(dir, &mut seen)?;
    info!(
        "Ignoring {} existing images in {}",
        existing.len(),
        dir.display()
    );

    println!("Watching {} for new captures (Ctrl-C to stop)", dir.display());
    if tracker.current().is_none() {
        println!("{}", MISSING_COORDINATE_MESSAGE);
    }

    let mut validated: Vec<SightingRecord> = Vec::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(scan_interval));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let fresh = match watch::scan_new_images(dir, &mut seen) {
                    Ok(fresh) => fresh,
                    Err(e) => {
                        error!("Failed to scan {}: {}", dir.display(), e);
                        continue;
                    }
                };

                for path in fresh {
                    let coordinate = match require_coordinate(tracker.current()) {
                        Ok(coordinate) => coordinate,
                        Err(e) => {
                            eprintln!("{}: {}", path.display(), e);
                            continue;
                        }
                    };

                    match identify_and_validate(client, &path, coordinate, select).await {
                        Ok(Some(record)) => validated.push(record),
                        Ok(None) => {}
                        Err(e) => eprintln!("{}: {}", path.display(), e),
                    }
                }
            }
        }
    }

    tracker.stop();
    info!("Stopped watching {}", dir.display());

    if let Some(output) = output {
        if !validated.is_empty() {
            util::save_sightings_csv(&validated, output)?;
        }
    }

    Ok(())
}

/// Gate in front of every identification request: without a coordinate no
/// request is sent, only a user-facing message.
fn require_coordinate(coordinate: Option<Coordinate>) -> Result<Coordinate, Box<dyn Error>> {
    coordinate.ok_or_else(|| MISSING_COORDINATE_MESSAGE.into())
}

/// One image through the full cycle. Requests run strictly one after the
/// other, so a selection can never have two validations in flight.
async fn identify_and_validate(
    client: &PlantApiClient,
    path: &Path,
    coordinate: Coordinate,
    select: Option<usize>,
) -> Result<Option<SightingRecord>, Box<dyn Error>> {
    let image = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("plant.jpg");

    println!("\nIdentifying {} at {}", path.display(), coordinate);

    let response = match client.identify(image, file_name, coordinate).await {
        Ok(response) => response,
        Err(e) => {
            error!("Identification request failed: {}", e);
            return Err(PROCESSING_ERROR_MESSAGE.into());
        }
    };

    let matches = match response.into_outcome() {
        IdentifyOutcome::Matches(matches) => matches,
        IdentifyOutcome::Rejected(message) => {
            println!("{}", message);
            return Ok(None);
        }
    };

    print_matches(&matches);

    let Some(chosen) = select_match(&matches, select)? else {
        // Back to the capture/upload entry state.
        return Ok(None);
    };

    let validation = match client.validate_match(chosen, coordinate, None).await {
        Ok(validation) => validation,
        Err(e) => {
            error!("Validation request failed: {}", e);
            return Err(VALIDATION_ERROR_MESSAGE.into());
        }
    };

    match validation.status {
        ValidateStatus::Success => {
            let record =
                SightingRecord::from_validation(&validation, coordinate, chosen.primary_image_url());
            print_sighting(&record);
            Ok(Some(record))
        }
        ValidateStatus::Error => {
            println!(
                "{}",
                validation
                    .message
                    .unwrap_or_else(|| VALIDATION_ERROR_MESSAGE.to_string())
            );
            Ok(None)
        }
    }
}

fn print_matches(matches: &[PlantMatch]) {
    println!("\nPossible plant matches:");
    for (index, candidate) in matches.iter().enumerate() {
        println!("{:>3}. {}", index + 1, candidate.species.scientific_name);
        println!("     Family: {}", candidate.species.family.scientific_name);
        println!("     Match score: {:.1}%", candidate.score * 100.0);
        for image in candidate.images.iter().take(4) {
            println!("     Image: {}", image.url.m);
        }
    }
}

/// Resolve the user's pick: `--select` when given, otherwise a stdin prompt.
/// `None` means go back without validating.
fn select_match<'a>(
    matches: &'a [PlantMatch],
    select: Option<usize>,
) -> Result<Option<&'a PlantMatch>, Box<dyn Error>> {
    if let Some(choice) = select {
        if choice == 0 || choice > matches.len() {
            return Err(format!(
                "--select {} is out of range (1-{})",
                choice,
                matches.len()
            )
            .into());
        }
        return Ok(Some(&matches[choice - 1]));
    }

    print!("Select the best match (1-{}, 0 to go back): ", matches.len());
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    match line.trim().parse::<usize>() {
        Ok(choice) if choice >= 1 && choice <= matches.len() => Ok(Some(&matches[choice - 1])),
        _ => Ok(None),
    }
}

fn print_sighting(record: &SightingRecord) {
    println!("\nValidated sighting:");
    println!("  Name: {}", record.name);
    if !record.family.is_empty() {
        println!("  Family: {}", record.family);
    }
    println!("  Probability: {:.1}%", record.probability * 100.0);
    println!("  Invasive: {}", if record.is_invasive { "yes" } else { "no" });
    println!("  Location: {}, {}", record.latitude, record.longitude);
}

/// The map flow: fetch, group by exact coordinate, color by family, report.
async fn run_map(
    client: &PlantApiClient,
    output: &str,
    legend: bool,
) -> Result<(), Box<dyn Error>> {
    let plants = match client.fetch_invasive_plants().await {
        Ok(plants) => plants,
        Err(e) => {
            error!("Failed to fetch invasive plants: {}", e);
            return Err(FETCH_ERROR_MESSAGE.into());
        }
    };

    if plants.is_empty() {
        println!("No invasive sightings recorded yet");
        return Ok(());
    }

    let groups = map::group_by_location(&plants);
    println!(
        "{} invasive sightings at {} locations\n",
        plants.len(),
        groups.len()
    );

    for group in &groups {
        println!("Marker at {} ({})", group.coordinate, group.color);
        for plant in &group.plants {
            println!(
                "  {} ({:.1}%) family: {}",
                plant.name,
                plant.probability * 100.0,
                plant.family.as_deref().unwrap_or(map::UNKNOWN_FAMILY)
            );
        }
    }

    if legend {
        println!("\nPlant families:");
        for (family, color) in map::family_legend(&plants) {
            println!("  {:<30} {}", family, color);
        }
    }

    let records: Vec<SightingRecord> = plants.iter().map(SightingRecord::from_plant).collect();
    util::save_sightings_csv(&records, output)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Family, ImageUrl, MatchImage, Species};

    fn sample_matches() -> Vec<PlantMatch> {
        ["Reynoutria japonica", "Fallopia baldschuanica", "Rumex acetosa"]
            .iter()
            .enumerate()
            .map(|(index, name)| PlantMatch {
                score: 0.9 - index as f64 * 0.2,
                species: Species {
                    scientific_name: name.to_string(),
                    family: Family {
                        scientific_name: "Polygonaceae".to_string(),
                    },
                },
                images: vec![MatchImage {
                    url: ImageUrl {
                        m: format!("https://img.example/{}-m.jpg", index),
                    },
                }],
            })
            .collect()
    }

    #[test]
    fn select_flag_picks_the_requested_match() {
        let matches = sample_matches();
        let chosen = select_match(&matches, Some(2)).unwrap().unwrap();
        assert_eq!(chosen.species.scientific_name, "Fallopia baldschuanica");
    }

    #[test]
    fn select_flag_out_of_range_is_an_error() {
        let matches = sample_matches();
        assert!(select_match(&matches, Some(0)).is_err());
        assert!(select_match(&matches, Some(4)).is_err());
    }

    #[test]
    fn missing_coordinate_blocks_the_request_with_a_message() {
        let error = require_coordinate(None).unwrap_err();
        assert_eq!(error.to_string(), MISSING_COORDINATE_MESSAGE);

        let coordinate = require_coordinate(Some(Coordinate::new(45.76, 4.84))).unwrap();
        assert_eq!(coordinate.latitude, 45.76);
    }
}
