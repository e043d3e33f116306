use crate::record::Coordinate;
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Background GPS fix, refreshed on a fixed interval the way the browser
/// client re-polls device geolocation every 30 seconds. The last good fix is
/// kept when a refresh fails.
pub struct LocationTracker {
    current: Arc<Mutex<Option<Coordinate>>>,
    handle: JoinHandle<()>,
}

impl LocationTracker {
    pub fn spawn(fix_file: PathBuf, interval: Duration) -> Self {
        let current = Arc::new(Mutex::new(read_fix(&fix_file)));
        let shared = Arc::clone(&current);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately and the initial read already
            // happened on spawn.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match read_fix(&fix_file) {
                    Some(coordinate) => {
                        info!("GPS fix refreshed: {}", coordinate);
                        *shared.lock().unwrap() = Some(coordinate);
                    }
                    None => warn!("No GPS fix available in {}", fix_file.display()),
                }
            }
        });

        Self { current, handle }
    }

    pub fn current(&self) -> Option<Coordinate> {
        *self.current.lock().unwrap()
    }

    /// Teardown, the analog of stopping the camera's media tracks on unmount.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

fn read_fix(path: &Path) -> Option<Coordinate> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_fix(&contents)
}

/// Parse a fix file holding "latitude,longitude" (comma or whitespace
/// separated) on its first non-empty line.
pub(crate) fn parse_fix(contents: &str) -> Option<Coordinate> {
    let line = contents.lines().find(|line| !line.trim().is_empty())?;
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());

    let latitude = parts.next()?.parse().ok()?;
    let longitude = parts.next()?.parse().ok()?;
    Some(Coordinate::new(latitude, longitude))
}

/// Scan a capture directory and return images not seen before, oldest path
/// first. `seen` is updated in place.
pub fn scan_new_images(
    dir: &Path,
    seen: &mut HashSet<PathBuf>,
) -> std::io::Result<Vec<PathBuf>> {
    let mut fresh = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_image(&path) && seen.insert(path.clone()) {
            fresh.push(path);
        }
    }
    fresh.sort();
    Ok(fresh)
}

fn is_image(path: &Path) -> bool {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());
    matches!(extension.as_deref(), Some("jpg" | "jpeg" | "png"))
}
