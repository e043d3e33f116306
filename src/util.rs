use crate::record::SightingRecord;
use csv::Writer;
use log::info;
use std::fs::File;
use std::time::Instant;

/// Save sighting rows to a CSV file.
pub fn save_sightings_csv(
    records: &[SightingRecord],
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;
    info!("Data saved to {}", filename);
    Ok(())
}

pub fn print_hms(start: &Instant) {
    let secs = start.elapsed().as_secs();
    println!(
        "Elapsed: {:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trips_sighting_rows() {
        let dir = std::env::temp_dir().join("plant-tracker-csv-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sightings.csv");
        let filename = path.to_str().unwrap();

        let records = vec![SightingRecord {
            name: "Renouee du Japon".to_string(),
            family: "Polygonaceae".to_string(),
            probability: 1.0,
            is_invasive: true,
            img_url: "https://img.example/1-m.jpg".to_string(),
            latitude: 45.76,
            longitude: 4.84,
        }];

        save_sightings_csv(&records, filename).unwrap();

        let mut reader = csv::Reader::from_path(filename).unwrap();
        let parsed: Vec<SightingRecord> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "Renouee du Japon");
        assert!(parsed[0].is_invasive);

        std::fs::remove_file(&path).ok();
    }
}
