//! Gridded concentration output of the dispersion phase.

use crate::domain::{PipelineError, PipelineResult};
use crate::numerics::{LogField, log10_remap};
use ndarray::{Array4, ArrayView2, Axis, Ix4};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const TIME_DIMENSION: &str = "time";
pub const LEVEL_DIMENSION: &str = "levels";
pub const LATITUDE_DIMENSION: &str = "latitude";
pub const LONGITUDE_DIMENSION: &str = "longitude";

/// Concentrations indexed `(level, time, latitude, longitude)`, where the
/// time axis is in simulation order.
#[derive(Debug, Clone)]
pub struct ConcentrationField {
    species: String,
    levels: Vec<f64>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    values: Array4<f64>,
    deposition_active: bool,
}

impl ConcentrationField {
    pub fn new(
        species: impl Into<String>,
        levels: Vec<f64>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Array4<f64>,
        deposition_active: bool,
    ) -> PipelineResult<Self> {
        let (level_count, _, lat_count, lon_count) = values.dim();
        if level_count != levels.len()
            || lat_count != latitudes.len()
            || lon_count != longitudes.len()
        {
            return Err(PipelineError::io_system(
                "IO.DATASET_SHAPE",
                format!(
                    "concentration grid {:?} does not match axes of {} levels, {} latitudes, {} longitudes",
                    values.dim(),
                    levels.len(),
                    latitudes.len(),
                    longitudes.len()
                ),
            ));
        }
        Ok(Self {
            species: species.into(),
            levels,
            latitudes,
            longitudes,
            values,
            deposition_active,
        })
    }

    /// Opens a converted dataset, takes the first species present and drops
    /// the ground level unless deposition is enabled.
    pub fn load(path: &Path, species: &[String], deposition_active: bool) -> PipelineResult<Self> {
        let file = netcdf::open(path).map_err(|source| decode_error(path, source.into()))?;
        let field = Self::from_netcdf(&file, species, deposition_active)
            .map_err(|source| decode_error(path, source))?;
        debug!(
            path = %path.display(),
            species = %field.species,
            levels = field.levels.len(),
            times = field.time_count(),
            "loaded concentration dataset"
        );
        if deposition_active {
            Ok(field)
        } else {
            Ok(field.without_ground_level())
        }
    }

    fn from_netcdf(
        file: &netcdf::File,
        species: &[String],
        deposition_active: bool,
    ) -> Result<Self, DecodeError> {
        let variable = species
            .iter()
            .find_map(|name| file.variable(name))
            .ok_or_else(|| DecodeError::MissingVariable(species.join(" or ")))?;
        let name = variable.name();

        let names = variable
            .dimensions()
            .iter()
            .map(|dimension| dimension.name())
            .collect::<Vec<_>>();
        if names.len() != 4 {
            return Err(DecodeError::Layout(name));
        }
        let axis_of = |wanted: &str| {
            names
                .iter()
                .position(|name| name == wanted)
                .ok_or_else(|| DecodeError::Layout(variable.name()))
        };
        let order = [
            axis_of(LEVEL_DIMENSION)?,
            axis_of(TIME_DIMENSION)?,
            axis_of(LATITUDE_DIMENSION)?,
            axis_of(LONGITUDE_DIMENSION)?,
        ];

        let (scale, offset) = packing(&variable)?;
        let mut stored = variable
            .get::<f64, _>(..)?
            .into_dimensionality::<Ix4>()
            .map_err(|_| DecodeError::Layout(name.clone()))?;
        if scale != 1.0 || offset != 0.0 {
            stored.mapv_inplace(|value| value * scale + offset);
        }
        let values = stored.permuted_axes(order).as_standard_layout().into_owned();

        Ok(Self {
            levels: axis_values(file, LEVEL_DIMENSION)?,
            latitudes: axis_values(file, LATITUDE_DIMENSION)?,
            longitudes: axis_values(file, LONGITUDE_DIMENSION)?,
            species: name,
            values,
            deposition_active,
        })
    }

    fn without_ground_level(self) -> Self {
        let keep = self
            .levels
            .iter()
            .enumerate()
            .filter(|(_, level)| **level != 0.0)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if keep.len() == self.levels.len() {
            return self;
        }
        Self {
            levels: keep.iter().map(|index| self.levels[*index]).collect(),
            values: self.values.select(Axis(0), &keep),
            ..self
        }
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn values(&self) -> &Array4<f64> {
        &self.values
    }

    pub fn deposition_active(&self) -> bool {
        self.deposition_active
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn time_count(&self) -> usize {
        self.values.dim().1
    }

    /// Ground level holding deposited mass rather than air concentration.
    pub fn is_deposition_level(&self, level_index: usize) -> bool {
        self.deposition_active && self.levels.get(level_index) == Some(&0.0)
    }

    /// One horizontal slice, rows by latitude.
    pub fn slice(&self, level_index: usize, time_index: usize) -> ArrayView2<'_, f64> {
        self.values
            .index_axis(Axis(0), level_index)
            .index_axis_move(Axis(0), time_index)
    }

    pub fn log10(&self) -> LogField {
        log10_remap(&self.values)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Netcdf(#[from] netcdf::Error),
    #[error("missing variable '{0}'")]
    MissingVariable(String),
    #[error("variable '{0}' is not laid out over time, levels, latitude and longitude")]
    Layout(String),
}

fn axis_values(file: &netcdf::File, name: &str) -> Result<Vec<f64>, DecodeError> {
    let variable = file
        .variable(name)
        .ok_or_else(|| DecodeError::MissingVariable(name.to_string()))?;
    let (scale, offset) = packing(&variable)?;
    Ok(variable
        .get_values::<f64, _>(..)?
        .into_iter()
        .map(|value| value * scale + offset)
        .collect())
}

/// `scale_factor` and `add_offset` of a packed variable, identity otherwise.
fn packing(variable: &netcdf::Variable<'_>) -> Result<(f64, f64), DecodeError> {
    let scalar = |name: &str, default: f64| -> Result<f64, DecodeError> {
        match variable.attribute_value(name) {
            Some(value) => Ok(f64::try_from(value?)?),
            None => Ok(default),
        }
    };
    Ok((scalar("scale_factor", 1.0)?, scalar("add_offset", 0.0)?))
}

fn decode_error(path: &Path, source: DecodeError) -> PipelineError {
    PipelineError::io_system(
        "IO.DATASET_READ",
        format!(
            "failed to read concentration dataset '{}': {}",
            path.display(),
            source
        ),
    )
}
