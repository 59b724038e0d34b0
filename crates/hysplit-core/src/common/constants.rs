//! Fixed numbers shared by the control codec, the phase runner and the
//! output readers.

/// Status the dispersion model reports through `STOP 900` on internal failure.
pub const MODEL_FATAL_CODE: i32 = 900;

/// Hosts keep only the low byte of a process exit status.
pub const HOST_EXIT_MODULUS: i32 = 256;

/// What a caller actually observes for [`MODEL_FATAL_CODE`]: 900 mod 256 = 132.
pub const SENTINEL_EXIT_STATUS: i32 = MODEL_FATAL_CODE % HOST_EXIT_MODULUS;

pub const LINE_START_TIME: usize = 0;
pub const LINE_SITE_COUNT: usize = 1;
pub const LINE_RELEASE_LOCATION: usize = 2;
pub const LINE_PERIOD_COUNT: usize = 3;
pub const LINE_METEOROLOGY_FILE: usize = 8;
pub const LINE_TRAJECTORY_OUTPUT: usize = 10;
pub const LINE_RELEASE_DURATION: usize = 12;
pub const LINE_CONCENTRATION_OUTPUT: usize = 19;
pub const LINE_HEIGHT_BOUNDS: usize = 21;
pub const LINE_DEPOSITION: usize = 26;

pub const HEADER_REQUIRED_LINES: usize = LINE_METEOROLOGY_FILE + 1;
pub const TRAJECTORY_REQUIRED_LINES: usize = LINE_TRAJECTORY_OUTPUT + 1;
pub const CONCENTRATION_REQUIRED_LINES: usize = LINE_DEPOSITION + 1;

pub const DEPOSITION_SETTING_COUNT: usize = 4;

/// Column widths of the trajectory endpoint rows.
pub const TRAJECTORY_COLUMN_WIDTHS: [usize; 13] = [6, 6, 6, 6, 6, 6, 6, 6, 8, 9, 9, 9, 9];
pub const TRAJECTORY_COLUMN_ID: usize = 0;
pub const TRAJECTORY_COLUMN_LATITUDE: usize = 9;
pub const TRAJECTORY_COLUMN_LONGITUDE: usize = 10;
pub const TRAJECTORY_COLUMN_HEIGHT: usize = 11;

pub const SINGLE_TRAJECTORY_HEADER_LINES: usize = 5;
pub const ENSEMBLE_TRAJECTORY_HEADER_LINES: usize = 31;

/// log10 decade boundaries; the last pair is the wide top bin.
pub const DEFAULT_CONTOUR_LADDER: [i32; 8] = [-17, -16, -15, -14, -13, -12, -11, -5];

pub const TICK_BIN_COUNT: usize = 8;

pub const DEFAULT_QUANTIZATION: u32 = 10_000;
pub const DEFAULT_PARALLEL_WORKERS: usize = 4;
pub const DEFAULT_RELEASE_HEIGHT: f64 = 250.0;
