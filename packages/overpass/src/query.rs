//! Overpass QL for road network extraction.

use ram_database_models::BoundingBox;

/// `highway=*` values that make up the routable network.
pub const HIGHWAY_TYPES: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "service",
    "road",
    "track",
];

/// Builds a query returning every routable way inside `bbox` together with
/// the nodes it references, as OSM XML.
///
/// Overpass bbox filters are `(south, west, north, east)`.
#[must_use]
pub fn road_network_query(bbox: &BoundingBox, timeout_secs: u32) -> String {
    let [south, west, north, east] = bbox.to_swne();
    let types = HIGHWAY_TYPES.join("|");

    format!(
        "[out:xml][timeout:{timeout_secs}];\n\
         (\n  \
           way[\"highway\"~\"^({types})$\"]({south},{west},{north},{east});\n  \
           >;\n\
         );\n\
         out body;\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_uses_swne_order() {
        let query = road_network_query(&BoundingBox::new(-37.5, -11.2, -37.0, -10.9), 900);

        assert!(query.starts_with("[out:xml][timeout:900];"));
        assert!(query.contains("(-11.2,-37.5,-10.9,-37);"));
        assert!(query.contains("^(motorway|motorway_link|trunk"));
        assert!(query.trim_end().ends_with("out body;"));
    }
}
