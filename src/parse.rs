use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plant-tracker")]
#[command(about = "A CLI client for identifying and tracking invasive plant sightings")]
#[command(version = "1.0")]
pub(crate) struct Args {
    /// Base URL of the plant tracker API
    #[arg(
        long,
        env = "PLANT_TRACKER_API_URL",
        default_value = "http://localhost:3000"
    )]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "10")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Identify plant photos and validate a chosen match
    Identify {
        /// Image files to identify (JPEG with GPS EXIF metadata)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Latitude override when the images carry no GPS metadata
        #[arg(long)]
        latitude: Option<f64>,

        /// Longitude override when the images carry no GPS metadata
        #[arg(long)]
        longitude: Option<f64>,

        /// Pick this match (1-based) instead of prompting
        #[arg(short, long)]
        select: Option<usize>,

        /// Write validated sightings to this CSV file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Watch a capture directory and identify new photos as they appear
    Watch {
        /// Directory to watch for new captures
        dir: PathBuf,

        /// File holding the current GPS fix as "latitude,longitude"
        #[arg(short, long, default_value = "fix.txt")]
        fix: PathBuf,

        /// Seconds between GPS fix refreshes
        #[arg(long, default_value = "30")]
        location_interval: u64,

        /// Seconds between directory scans
        #[arg(long, default_value = "5")]
        scan_interval: u64,

        /// Pick this match (1-based) instead of prompting
        #[arg(short, long)]
        select: Option<usize>,

        /// Write validated sightings to this CSV file on exit
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fetch validated invasive sightings and print the grouped map report
    Map {
        /// Output CSV filename
        #[arg(short, long, default_value = "sightings.csv")]
        output: String,

        /// Skip the family color legend
        #[arg(long)]
        no_legend: bool,
    },
}
