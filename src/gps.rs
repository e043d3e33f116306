use crate::record::Coordinate;
use exif::{Exif, In, Reader, Tag, Value};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const NO_EXIF_MESSAGE: &str = "Cette image ne contient pas de métadonnées EXIF.";
pub const NO_GPS_MESSAGE: &str = "Cette image ne contient pas de coordonnées GPS. \
    Assurez-vous que la localisation était activée lors de la prise de photo.";

/// Read the GPS coordinate embedded in an image's EXIF block.
///
/// A missing or unreadable EXIF block and an EXIF block without GPS tags are
/// reported with distinct user-facing messages, matching how the two cases
/// are explained to the person uploading the photo.
pub fn read_gps_coordinate(path: &Path) -> Result<Coordinate, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let exif = match Reader::new().read_from_container(&mut BufReader::new(&file)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF block in {}: {}", path.display(), e);
            return Err(NO_EXIF_MESSAGE.into());
        }
    };

    let latitude = read_axis(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S');
    let longitude = read_axis(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W');

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            let coordinate = Coordinate::new(latitude, longitude);
            info!("Found GPS coordinate {} in {}", coordinate, path.display());
            Ok(coordinate)
        }
        _ => Err(NO_GPS_MESSAGE.into()),
    }
}

/// One GPS axis: a degrees/minutes/seconds rational triple plus a hemisphere
/// reference tag that flips the sign for south and west.
fn read_axis(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative_ref: u8) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let degrees = match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => {
            dms_to_decimal(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64())
        }
        _ => return None,
    };

    let negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|field| is_negative_ref(&field.value, negative_ref))
        .unwrap_or(false);

    Some(if negative { -degrees } else { degrees })
}

fn is_negative_ref(value: &Value, negative_ref: u8) -> bool {
    match value {
        Value::Ascii(chars) => chars
            .first()
            .and_then(|s| s.first())
            .is_some_and(|&c| c == negative_ref),
        _ => false,
    }
}

pub(crate) fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}
