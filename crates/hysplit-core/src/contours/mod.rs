//! Filled contour polygons for every (height, time) slice of a
//! concentration field.

use crate::dataset::ConcentrationField;
use crate::domain::{Direction, PipelineError, PipelineResult};
use crate::geometry::{Feature, FeatureCollection, Geometry};
use crate::numerics::{LogField, jet_hex_colors};
use ::contour::ContourBuilder;
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourProperties {
    pub level_name: String,
    /// Lower bound of the band, as a power of ten.
    pub level: i32,
    pub color: String,
}

pub type ContourCollection = FeatureCollection<ContourProperties>;

/// Contours of one slice. `time_index` is chronological for both
/// directions.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourArtifact {
    pub height_index: usize,
    pub time_index: usize,
    pub collection: ContourCollection,
}

impl ContourArtifact {
    pub fn file_stem(&self) -> String {
        artifact_stem(self.height_index, self.time_index)
    }
}

pub fn artifact_stem(height_index: usize, time_index: usize) -> String {
    format!("height{height_index}_time{time_index}")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSet {
    pub artifacts: Vec<ContourArtifact>,
    /// Slices that produced no polygon at any threshold.
    pub skipped: usize,
}

pub struct ContourExtractor<'a> {
    ladder: &'a [i32],
    colors: Vec<String>,
}

impl<'a> ContourExtractor<'a> {
    pub fn new(ladder: &'a [i32]) -> Self {
        Self {
            ladder,
            colors: jet_hex_colors(ladder.len().saturating_sub(1)),
        }
    }

    pub fn extract(&self, field: &ConcentrationField, direction: Direction) -> PipelineResult<ContourSet> {
        let log_field = field.log10();
        self.extract_log(field, &log_field, direction)
    }

    fn extract_log(
        &self,
        field: &ConcentrationField,
        log_field: &LogField,
        direction: Direction,
    ) -> PipelineResult<ContourSet> {
        let time_count = field.time_count();
        let mut set = ContourSet::default();
        for height_index in 0..field.level_count() {
            let deposition = field.is_deposition_level(height_index);
            for time_index in 0..time_count {
                let stored_index = match direction {
                    Direction::Forward => time_index,
                    Direction::Backward => time_count - 1 - time_index,
                };
                if field
                    .slice(height_index, stored_index)
                    .iter()
                    .all(|value| *value == 0.0)
                {
                    trace!(height_index, time_index, "slice is all zero");
                    set.skipped += 1;
                    continue;
                }
                let slice = log_field
                    .values
                    .index_axis(Axis(0), height_index)
                    .index_axis_move(Axis(0), stored_index);
                match self.contour_slice(
                    slice,
                    field.latitudes(),
                    field.longitudes(),
                    deposition,
                )? {
                    Some(collection) => set.artifacts.push(ContourArtifact {
                        height_index,
                        time_index,
                        collection,
                    }),
                    None => set.skipped += 1,
                }
            }
        }
        debug!(
            artifacts = set.artifacts.len(),
            skipped = set.skipped,
            sentinel = log_field.sentinel,
            "extracted contours"
        );
        Ok(set)
    }

    /// Bands `[ladder[i], ladder[i + 1])` of one log10 slice laid out rows by
    /// latitude. Returns `None` when no band holds a polygon.
    pub fn contour_slice(
        &self,
        slice: ArrayView2<'_, f64>,
        latitudes: &[f64],
        longitudes: &[f64],
        deposition: bool,
    ) -> PipelineResult<Option<ContourCollection>> {
        let (rows, columns) = slice.dim();
        if rows < 2 || columns < 2 || self.ladder.len() < 2 {
            return Ok(None);
        }
        let values = slice.iter().copied().collect::<Vec<_>>();
        let thresholds = self
            .ladder
            .iter()
            .map(|level| f64::from(*level))
            .collect::<Vec<_>>();

        // Marching squares puts sample `j` at the centre of cell `[j, j + 1]`.
        let x_step = longitudes[1] - longitudes[0];
        let y_step = latitudes[1] - latitudes[0];
        let builder = ContourBuilder::new(columns as _, rows as _, false)
            .x_origin(longitudes[0] - x_step / 2.0)
            .y_origin(latitudes[0] - y_step / 2.0)
            .x_step(x_step)
            .y_step(y_step);
        let extent = GridExtent::new(longitudes, latitudes);
        let bands = builder.isobands(&values, &thresholds).map_err(|error| {
            PipelineError::internal("SYS.CONTOUR", format!("contouring failed: {error:?}"))
        })?;

        let features = bands
            .iter()
            .filter(|band| !band.geometry().0.is_empty())
            .filter_map(|band| {
                let index = thresholds
                    .iter()
                    .position(|threshold| *threshold == band.min_v())?;
                let level = self.ladder[index];
                let mut geometry = Geometry::from(band.geometry());
                extent.clamp(&mut geometry);
                Some(Feature {
                    geometry,
                    properties: ContourProperties {
                        level_name: level_name(level, deposition),
                        level,
                        color: self.colors.get(index).cloned().unwrap_or_default(),
                    },
                })
            })
            .collect::<Vec<_>>();

        if features.is_empty() {
            Ok(None)
        } else {
            Ok(Some(FeatureCollection::new(features)))
        }
    }
}

/// Bounds of the sample grid. Rings reaching the padded border of the
/// marching-squares grid are pulled back onto it.
struct GridExtent {
    longitudes: (f64, f64),
    latitudes: (f64, f64),
}

impl GridExtent {
    fn new(longitudes: &[f64], latitudes: &[f64]) -> Self {
        let bounds = |axis: &[f64]| {
            let first = axis[0];
            let last = axis[axis.len() - 1];
            (first.min(last), first.max(last))
        };
        Self {
            longitudes: bounds(longitudes),
            latitudes: bounds(latitudes),
        }
    }

    fn clamp(&self, geometry: &mut Geometry) {
        let Geometry::MultiPolygon { coordinates } = geometry else {
            return;
        };
        for [lon, lat] in coordinates.iter_mut().flatten().flatten() {
            *lon = lon.clamp(self.longitudes.0, self.longitudes.1);
            *lat = lat.clamp(self.latitudes.0, self.latitudes.1);
        }
    }
}

/// Display label: mass per cubic metre aloft, per square metre for the
/// deposition level.
pub fn level_name(level: i32, deposition: bool) -> String {
    let unit = if deposition { 2 } else { 3 };
    format!("10<sup>{level}</sup> mass/m<sup>{unit}</sup>")
}

#[cfg(test)]
mod tests {
    use super::{ContourExtractor, level_name};
    use crate::common::constants::DEFAULT_CONTOUR_LADDER;
    use crate::dataset::ConcentrationField;
    use crate::domain::Direction;
    use crate::geometry::Geometry;
    use ndarray::{Array2, Array4};

    fn plume(times: usize, hot_time: usize) -> ConcentrationField {
        let mut values = Array4::<f64>::zeros((1, times, 5, 5));
        values[[0, hot_time, 2, 2]] = 1e-6;
        values[[0, hot_time, 2, 1]] = 1e-12;
        values[[0, hot_time, 1, 2]] = 1e-12;
        ConcentrationField::new(
            "PM",
            vec![100.0],
            vec![40.0, 40.5, 41.0, 41.5, 42.0],
            vec![-113.0, -112.5, -112.0, -111.5, -111.0],
            values,
            false,
        )
        .expect("field should build")
    }

    #[test]
    fn labels_use_area_units_for_deposition() {
        assert_eq!(level_name(-12, false), "10<sup>-12</sup> mass/m<sup>3</sup>");
        assert_eq!(level_name(-12, true), "10<sup>-12</sup> mass/m<sup>2</sup>");
    }

    #[test]
    fn all_zero_slices_are_skipped() {
        let field = plume(3, 1);
        let set = ContourExtractor::new(&DEFAULT_CONTOUR_LADDER)
            .extract(&field, Direction::Forward)
            .expect("contours should extract");

        assert_eq!(set.artifacts.len(), 1);
        assert_eq!(set.skipped, 2);
        let artifact = &set.artifacts[0];
        assert_eq!((artifact.height_index, artifact.time_index), (0, 1));
        assert_eq!(artifact.file_stem(), "height0_time1");
    }

    #[test]
    fn features_sit_on_the_ladder_with_matching_colors() {
        let field = plume(1, 0);
        let set = ContourExtractor::new(&DEFAULT_CONTOUR_LADDER)
            .extract(&field, Direction::Forward)
            .expect("contours should extract");
        let collection = &set.artifacts[0].collection;

        assert!(!collection.is_empty());
        for feature in &collection.features {
            let index = DEFAULT_CONTOUR_LADDER
                .iter()
                .position(|level| *level == feature.properties.level)
                .expect("level should come from the ladder");
            assert!(index < DEFAULT_CONTOUR_LADDER.len() - 1);
            assert!(feature.properties.color.starts_with('#'));
            assert_eq!(feature.properties.color.len(), 7);
            let Geometry::MultiPolygon { coordinates } = &feature.geometry else {
                panic!("contours are multipolygons");
            };
            for polygon in coordinates {
                for ring in polygon {
                    for [lon, lat] in ring {
                        assert!((-113.0..=-111.0).contains(lon));
                        assert!((40.0..=42.0).contains(lat));
                    }
                }
            }
        }
        assert!(
            collection
                .features
                .iter()
                .any(|feature| feature.properties.level == -11)
        );
    }

    #[test]
    fn backward_runs_number_slices_chronologically() {
        let field = plume(4, 0);
        let set = ContourExtractor::new(&DEFAULT_CONTOUR_LADDER)
            .extract(&field, Direction::Backward)
            .expect("contours should extract");

        assert_eq!(set.artifacts.len(), 1);
        assert_eq!(set.artifacts[0].time_index, 3);
    }

    #[test]
    fn band_is_centred_on_the_cell_that_carries_it() {
        let latitudes = [40.0, 40.5, 41.0, 41.5, 42.0];
        let longitudes = [-113.0, -112.5, -112.0, -111.5, -111.0];
        let mut slice = Array2::<f64>::from_elem((5, 5), -20.0);
        slice[[2, 2]] = -6.0;

        let collection = ContourExtractor::new(&DEFAULT_CONTOUR_LADDER)
            .contour_slice(slice.view(), &latitudes, &longitudes, false)
            .expect("contours should extract")
            .expect("the hot cell should produce a band");
        let feature = collection
            .features
            .iter()
            .find(|feature| feature.properties.level == -11)
            .expect("hot cell sits in the top band");
        let Geometry::MultiPolygon { coordinates } = &feature.geometry else {
            panic!("contours are multipolygons");
        };
        let exterior = &coordinates[0][0];
        let open = &exterior[..exterior.len() - 1];
        let count = open.len() as f64;
        let lon = open.iter().map(|[lon, _]| lon).sum::<f64>() / count;
        let lat = open.iter().map(|[_, lat]| lat).sum::<f64>() / count;

        assert!((lon - -112.0).abs() < 1e-9, "band centred at lon {lon}");
        assert!((lat - 41.0).abs() < 1e-9, "band centred at lat {lat}");
    }

    #[test]
    fn edge_cells_stay_inside_the_grid() {
        let latitudes = [40.0, 40.5, 41.0];
        let longitudes = [-113.0, -112.5, -112.0];
        let slice = Array2::<f64>::from_elem((3, 3), -6.0);

        let collection = ContourExtractor::new(&DEFAULT_CONTOUR_LADDER)
            .contour_slice(slice.view(), &latitudes, &longitudes, false)
            .expect("contours should extract")
            .expect("a saturated slice fills the top band");
        for feature in &collection.features {
            let Geometry::MultiPolygon { coordinates } = &feature.geometry else {
                panic!("contours are multipolygons");
            };
            for [lon, lat] in coordinates.iter().flatten().flatten() {
                assert!((-113.0..=-112.0).contains(lon), "lon {lon} off grid");
                assert!((40.0..=41.0).contains(lat), "lat {lat} off grid");
            }
        }
    }
}
