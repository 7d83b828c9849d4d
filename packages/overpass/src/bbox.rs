//! Bounding box of a `GeoJSON` feature collection.

use geo::BoundingRect;
use geojson::FeatureCollection;
use ram_database_models::BoundingBox;

use crate::OverpassError;

/// Returns the bounding box enclosing every feature geometry in `fc`.
///
/// Features without geometry, or whose geometry cannot be converted, are
/// skipped.
///
/// # Errors
///
/// Returns [`OverpassError::EmptyBounds`] if no feature has a usable
/// geometry.
pub fn fc_bbox(fc: &FeatureCollection) -> Result<BoundingBox, OverpassError> {
    let geometries: Vec<geo::Geometry<f64>> = fc
        .features
        .iter()
        .filter_map(|feature| feature.geometry.clone())
        .filter_map(|geometry| geo::Geometry::<f64>::try_from(geometry).ok())
        .collect();

    let rect = geo::GeometryCollection::from(geometries)
        .bounding_rect()
        .ok_or(OverpassError::EmptyBounds)?;

    Ok(BoundingBox::new(
        rect.min().x,
        rect.min().y,
        rect.max().x,
        rect.max().y,
    ))
}
