use super::CliError;
use super::helpers::{ConfigFlags, load_config, parse_release_time, print_json};
use chrono::{NaiveDateTime, Utc};
use hysplit_core::common::constants::DEFAULT_RELEASE_HEIGHT;
use hysplit_core::control::{bind, parse_control, serialize_control};
use hysplit_core::domain::{Direction, PhaseKind, PipelineError, RunParameters};
use hysplit_core::orchestrator::{CatalogSite, postprocess_catalog_site};
use hysplit_core::{
    DirectoryStore, ExternalQuantizer, PersistenceGateway, PipelineConfig, run_directions,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum DirectionArg {
    #[value(alias = "forward")]
    Fwd,
    #[value(alias = "backward")]
    Bwd,
}

impl DirectionArg {
    fn direction(self) -> Direction {
        match self {
            Self::Fwd => Direction::Forward,
            Self::Bwd => Direction::Backward,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum DirectionsArg {
    #[value(alias = "forward")]
    Fwd,
    #[value(alias = "backward")]
    Bwd,
    Both,
}

impl DirectionsArg {
    fn directions(self) -> Vec<Direction> {
        match self {
            Self::Fwd => vec![Direction::Forward],
            Self::Bwd => vec![Direction::Backward],
            Self::Both => vec![Direction::Forward, Direction::Backward],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum TemplateKindArg {
    Single,
    Ensemble,
    Concentration,
}

impl TemplateKindArg {
    fn phase(self) -> PhaseKind {
        match self {
            Self::Single => PhaseKind::SingleTrajectory,
            Self::Ensemble => PhaseKind::EnsembleTrajectory,
            Self::Concentration => PhaseKind::Concentration,
        }
    }
}

#[derive(clap::Args, Debug)]
pub(super) struct ReleaseArgs {
    /// Release latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Release longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Release height above ground in metres
    #[arg(long, default_value_t = DEFAULT_RELEASE_HEIGHT)]
    height: f64,

    /// Number of hourly records to simulate
    #[arg(long)]
    records: u32,

    /// Release time as "YYYY-MM-DD HH"
    #[arg(long, value_parser = parse_release_time)]
    time: NaiveDateTime,
}

impl ReleaseArgs {
    fn parameters(&self, direction: Direction) -> RunParameters {
        RunParameters {
            latitude: self.lat,
            longitude: self.lon,
            height: self.height,
            direction,
            record_count: self.records,
            start_time: self.time,
        }
    }
}

#[derive(clap::Args, Debug)]
pub(super) struct RunArgs {
    #[command(flatten)]
    release: ReleaseArgs,

    /// Directions to simulate
    #[arg(long, value_enum, default_value_t = DirectionsArg::Both)]
    direction: DirectionsArg,

    /// Simulation id; each direction is stored as `<id>_fwd` / `<id>_bwd`
    #[arg(long)]
    id: Option<String>,

    #[command(flatten)]
    config: ConfigFlags,
}

#[derive(clap::Args, Debug)]
pub(super) struct BindArgs {
    /// Template control file
    #[arg(long)]
    template: PathBuf,

    /// Which phase the template configures
    #[arg(long, value_enum, default_value_t = TemplateKindArg::Concentration)]
    kind: TemplateKindArg,

    #[command(flatten)]
    release: ReleaseArgs,

    #[arg(long, value_enum, default_value_t = DirectionArg::Fwd)]
    direction: DirectionArg,
}

#[derive(clap::Args, Debug)]
pub(super) struct PostprocessArgs {
    /// Catalog site id
    #[arg(long)]
    site: String,

    #[arg(long, value_enum)]
    direction: DirectionArg,

    /// Simulation id to store under; defaults to `<site>_<direction>`
    #[arg(long)]
    id: Option<String>,

    #[command(flatten)]
    config: ConfigFlags,
}

#[derive(clap::Args, Debug)]
pub(super) struct MetadataArgs {
    /// Simulation id, including its direction suffix
    #[arg(long)]
    id: String,

    #[command(flatten)]
    config: ConfigFlags,
}

#[derive(clap::Args, Debug)]
pub(super) struct ContoursArgs {
    /// Simulation id, including its direction suffix
    #[arg(long)]
    id: String,

    /// Height index of the slice
    #[arg(long)]
    height: usize,

    /// Chronological time index of the slice
    #[arg(long)]
    time: usize,

    #[command(flatten)]
    config: ConfigFlags,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DirectionResult {
    Succeeded { id: String, seconds: f64 },
    Failed { id: String, error: String },
}

fn quantizer_for(config: &PipelineConfig) -> ExternalQuantizer {
    ExternalQuantizer::new(&config.commands.topology, config.quantization, config.timeout())
}

pub(super) fn run_simulation_command(args: RunArgs) -> Result<i32, CliError> {
    let config = load_config(&args.config)?;
    let base_id = args
        .id
        .unwrap_or_else(|| Utc::now().format("%Y%m%d%H%M%S").to_string());
    let parameters = args.release.parameters(Direction::Forward);
    let store = DirectoryStore::new(&config.store_dir);
    let quantizer = quantizer_for(&config);

    let outcomes = run_directions(
        &config,
        &base_id,
        &parameters,
        &args.direction.directions(),
        &store,
        &quantizer,
    );

    let mut all_succeeded = true;
    let mut results = BTreeMap::new();
    for outcome in outcomes {
        let result = match outcome.result {
            Ok(report) => DirectionResult::Succeeded {
                id: outcome.simulation_id,
                seconds: report.elapsed.as_secs_f64(),
            },
            Err(error) => {
                all_succeeded = false;
                eprintln!("{}", error.diagnostic_line());
                DirectionResult::Failed {
                    id: outcome.simulation_id,
                    error: error.to_string(),
                }
            }
        };
        results.insert(outcome.direction.as_str(), result);
    }
    print_json(&results)?;

    if all_succeeded { Ok(0) } else { Ok(1) }
}

pub(super) fn run_bind_command(args: BindArgs) -> Result<i32, CliError> {
    let phase = args.kind.phase();
    let source = fs::read_to_string(&args.template).map_err(|source| {
        CliError::Pipeline(PipelineError::io_system(
            "IO.CONTROL_READ",
            format!(
                "failed to read template '{}': {}",
                args.template.display(),
                source
            ),
        ))
    })?;
    let template = parse_control(&source, phase).map_err(CliError::Pipeline)?;
    let bound = bind(&template, &args.release.parameters(args.direction.direction()));
    print!("{}", serialize_control(&bound));
    Ok(0)
}

#[derive(Debug, Serialize)]
struct PostprocessResult {
    id: String,
    contours: usize,
    skipped: usize,
}

pub(super) fn run_postprocess_command(args: PostprocessArgs) -> Result<i32, CliError> {
    let config = load_config(&args.config)?;
    let site = CatalogSite::new(args.site, args.direction.direction());
    let simulation_id = args.id.unwrap_or_else(|| site.default_simulation_id());
    let store = DirectoryStore::new(&config.store_dir);

    let summary = postprocess_catalog_site(
        &config,
        &site,
        &simulation_id,
        &store,
        &quantizer_for(&config),
    )
    .map_err(CliError::Pipeline)?;
    print_json(&PostprocessResult {
        id: simulation_id,
        contours: summary.contours,
        skipped: summary.skipped,
    })?;
    Ok(0)
}

pub(super) fn run_metadata_command(args: MetadataArgs) -> Result<i32, CliError> {
    let config = load_config(&args.config)?;
    let store = DirectoryStore::new(&config.store_dir);
    let metadata = store.metadata(&args.id).map_err(CliError::Pipeline)?;
    match metadata {
        Some(document) => {
            println!("{document}");
            Ok(0)
        }
        None => Err(CliError::Pipeline(PipelineError::input_validation(
            "INPUT.METADATA_MISSING",
            format!("no metadata stored for simulation '{}'", args.id),
        ))),
    }
}

pub(super) fn run_contours_command(args: ContoursArgs) -> Result<i32, CliError> {
    let config = load_config(&args.config)?;
    let store = DirectoryStore::new(&config.store_dir);
    let topology = store
        .contour(&args.id, args.height, args.time)
        .map_err(CliError::Pipeline)?;
    match topology {
        Some(document) => {
            println!("{document}");
            Ok(0)
        }
        None => Err(CliError::Pipeline(PipelineError::input_validation(
            "INPUT.CONTOUR_MISSING",
            format!(
                "no contours stored for simulation '{}' at height {} time {}",
                args.id, args.height, args.time
            ),
        ))),
    }
}
