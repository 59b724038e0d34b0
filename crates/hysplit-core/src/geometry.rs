//! GeoJSON documents produced by the pipeline.

use serde::{Deserialize, Serialize};

pub type Position2 = [f64; 2];
/// `[longitude, latitude, height]`.
pub type Position3 = [f64; 3];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Polygons of exterior ring followed by holes.
    MultiPolygon { coordinates: Vec<Vec<Vec<Position2>>> },
    LineString { coordinates: Vec<Position3> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature<P> {
    pub geometry: Geometry,
    pub properties: P,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection<P> {
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl From<&geo_types::MultiPolygon<f64>> for Geometry {
    fn from(shape: &geo_types::MultiPolygon<f64>) -> Self {
        let ring = |line: &geo_types::LineString<f64>| {
            line.coords()
                .map(|coord| [coord.x, coord.y])
                .collect::<Vec<_>>()
        };
        Self::MultiPolygon {
            coordinates: shape
                .0
                .iter()
                .map(|polygon| {
                    std::iter::once(polygon.exterior())
                        .chain(polygon.interiors())
                        .map(ring)
                        .collect()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureCollection, Geometry};
    use geo_types::{LineString, MultiPolygon, Polygon};
    use serde_json::json;

    #[test]
    fn feature_collection_carries_type_tags() {
        let collection = FeatureCollection::new(vec![Feature {
            geometry: Geometry::LineString {
                coordinates: vec![[-111.9, 40.7, 250.0]],
            },
            properties: json!({ "heights": [250.0] }),
        }]);
        let value = serde_json::to_value(&collection).expect("collection should serialize");
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"],
            json!([[-111.9, 40.7, 250.0]])
        );
    }

    #[test]
    fn polygon_rings_keep_exterior_first() {
        let exterior = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)]);
        let shape = MultiPolygon(vec![Polygon::new(exterior, vec![hole])]);

        let Geometry::MultiPolygon { coordinates } = Geometry::from(&shape) else {
            panic!("expected a multipolygon");
        };
        assert_eq!(coordinates.len(), 1);
        assert_eq!(coordinates[0].len(), 2);
        assert_eq!(coordinates[0][0][1], [4.0, 0.0]);
        assert_eq!(coordinates[0][1][0], [1.0, 1.0]);
    }
}
