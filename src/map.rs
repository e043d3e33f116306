use crate::record::{Coordinate, InvasivePlant};
use std::collections::{HashMap, HashSet};

pub const UNKNOWN_FAMILY: &str = "Famille inconnue";
pub const UNKNOWN_FAMILY_COLOR: &str = "#808080";
pub const MIXED_FAMILY_COLOR: &str = "#9C27B0";
pub const MIXED_FAMILY_LABEL: &str = "Familles multiples";

/// One map marker: every sighting recorded at exactly this coordinate.
#[derive(Debug, Clone)]
pub struct MarkerGroup {
    pub coordinate: Coordinate,
    pub color: String,
    pub plants: Vec<InvasivePlant>,
}

/// Deterministic color for a plant family. Same name, same color, within a
/// session and across sessions.
pub fn family_color(family: Option<&str>) -> String {
    match family {
        Some(name) if !name.is_empty() && name != UNKNOWN_FAMILY => {
            format!("hsl({}, 70%, 50%)", family_hue(name))
        }
        _ => UNKNOWN_FAMILY_COLOR.to_string(),
    }
}

/// Rolling 32-bit hash over UTF-16 code units, projected onto 0..360.
/// Negative intermediate values land on the same hue a CSS `hsl()` with a
/// negative angle would.
fn family_hue(name: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in name.encode_utf16() {
        hash = (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash));
    }
    hash.rem_euclid(360)
}

/// Group sightings by exact coordinate string, preserving first-seen order.
/// Groups holding a single family take that family's color; mixed groups get
/// the fixed mixed-family color.
pub fn group_by_location(plants: &[InvasivePlant]) -> Vec<MarkerGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<InvasivePlant>> = HashMap::new();

    for plant in plants {
        let key = plant.coordinate().key();
        let members = grouped.entry(key.clone()).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(plant.clone());
    }

    order
        .into_iter()
        .filter_map(|key| grouped.remove(&key))
        .filter_map(build_group)
        .collect()
}

fn build_group(plants: Vec<InvasivePlant>) -> Option<MarkerGroup> {
    let first = plants.first()?;
    let coordinate = first.coordinate();

    let families: HashSet<Option<&str>> =
        plants.iter().map(|plant| plant.family.as_deref()).collect();
    let color = if families.len() == 1 {
        family_color(first.family.as_deref())
    } else {
        MIXED_FAMILY_COLOR.to_string()
    };

    Some(MarkerGroup {
        coordinate,
        color,
        plants,
    })
}

/// Legend entries in first-seen family order, always closed by the
/// mixed-family entry.
pub fn family_legend(plants: &[InvasivePlant]) -> Vec<(String, String)> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries: Vec<(String, String)> = Vec::new();

    for plant in plants {
        let label = plant
            .family
            .clone()
            .unwrap_or_else(|| UNKNOWN_FAMILY.to_string());
        if seen.insert(label.clone()) {
            entries.push((label, family_color(plant.family.as_deref())));
        }
    }

    entries.push((MIXED_FAMILY_LABEL.to_string(), MIXED_FAMILY_COLOR.to_string()));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant_at(name: &str, family: Option<&str>, latitude: f64, longitude: f64) -> InvasivePlant {
        InvasivePlant {
            name: name.to_string(),
            probability: 0.8,
            is_invasive: true,
            img_url: None,
            latitude,
            longitude,
            family: family.map(String::from),
        }
    }

    #[test]
    fn family_color_is_stable_across_calls() {
        let first = family_color(Some("Asteraceae"));
        let second = family_color(Some("Asteraceae"));

        assert_eq!(first, second);
        assert!(first.starts_with("hsl("));
        assert!(first.ends_with(", 70%, 50%)"));
    }

    #[test]
    fn distinct_families_usually_get_distinct_hues() {
        assert_ne!(
            family_color(Some("Asteraceae")),
            family_color(Some("Polygonaceae"))
        );
    }

    #[test]
    fn unknown_or_missing_family_is_gray() {
        assert_eq!(family_color(None), UNKNOWN_FAMILY_COLOR);
        assert_eq!(family_color(Some("")), UNKNOWN_FAMILY_COLOR);
        assert_eq!(family_color(Some(UNKNOWN_FAMILY)), UNKNOWN_FAMILY_COLOR);
    }

    #[test]
    fn hue_is_always_a_valid_angle() {
        for name in ["Asteraceae", "Polygonaceae", "Fabaceae", "Poaceae", "x"] {
            let hue = family_hue(name);
            assert!((0..360).contains(&hue), "{} gave hue {}", name, hue);
        }
    }

    #[test]
    fn identical_coordinates_share_one_marker() {
        let plants = vec![
            plant_at("Ambroisie", Some("Asteraceae"), 45.764043, 4.835659),
            plant_at("Solidage", Some("Asteraceae"), 45.764043, 4.835659),
        ];

        let groups = group_by_location(&plants);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].plants.len(), 2);
        assert_eq!(groups[0].color, family_color(Some("Asteraceae")));
    }

    #[test]
    fn any_coordinate_difference_splits_markers() {
        let plants = vec![
            plant_at("Ambroisie", Some("Asteraceae"), 45.764043, 4.835659),
            plant_at("Ambroisie", Some("Asteraceae"), 45.764044, 4.835659),
            plant_at("Ambroisie", Some("Asteraceae"), 45.764043, 4.835660),
        ];

        let groups = group_by_location(&plants);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn mixed_family_groups_take_the_fixed_color() {
        let plants = vec![
            plant_at("Ambroisie", Some("Asteraceae"), 45.764043, 4.835659),
            plant_at("Renouee", Some("Polygonaceae"), 45.764043, 4.835659),
        ];

        let groups = group_by_location(&plants);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].color, MIXED_FAMILY_COLOR);
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let plants = vec![
            plant_at("A", Some("Asteraceae"), 48.85, 2.35),
            plant_at("B", Some("Asteraceae"), 43.30, 5.37),
            plant_at("C", Some("Asteraceae"), 48.85, 2.35),
        ];

        let groups = group_by_location(&plants);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].coordinate.key(), "48.85,2.35");
        assert_eq!(groups[1].coordinate.key(), "43.3,5.37");
    }

    #[test]
    fn legend_lists_each_family_once_plus_mixed_entry() {
        let plants = vec![
            plant_at("A", Some("Asteraceae"), 48.85, 2.35),
            plant_at("B", Some("Polygonaceae"), 43.30, 5.37),
            plant_at("C", Some("Asteraceae"), 45.76, 4.84),
            plant_at("D", None, 47.22, -1.55),
        ];

        let legend = family_legend(&plants);
        let labels: Vec<&str> = legend.iter().map(|(label, _)| label.as_str()).collect();

        assert_eq!(
            labels,
            vec![
                "Asteraceae",
                "Polygonaceae",
                UNKNOWN_FAMILY,
                MIXED_FAMILY_LABEL
            ]
        );
        assert_eq!(legend[2].1, UNKNOWN_FAMILY_COLOR);
        assert_eq!(legend[3].1, MIXED_FAMILY_COLOR);
    }
}
