use super::model::{
    ConcentrationFields, ControlBody, ControlHeader, ControlRecord, TrajectoryFields,
};
use crate::common::constants::{
    CONCENTRATION_REQUIRED_LINES, DEPOSITION_SETTING_COUNT, HEADER_REQUIRED_LINES,
    LINE_CONCENTRATION_OUTPUT, LINE_DEPOSITION, LINE_HEIGHT_BOUNDS, LINE_METEOROLOGY_FILE,
    LINE_PERIOD_COUNT, LINE_RELEASE_DURATION, LINE_RELEASE_LOCATION, LINE_SITE_COUNT,
    LINE_START_TIME, LINE_TRAJECTORY_OUTPUT, TRAJECTORY_REQUIRED_LINES,
};
use crate::domain::{ControlResult, PhaseKind, PipelineError};
use crate::serialization::{format_control_float, write_text_artifact};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const START_TIME_FORMAT: &str = "%y %m %d %H";

pub fn read_control_file(path: &Path, kind: PhaseKind) -> ControlResult<ControlRecord> {
    let source = fs::read_to_string(path).map_err(|source| {
        PipelineError::io_system(
            "IO.CONTROL_READ",
            format!(
                "failed to read {} control '{}': {}",
                kind,
                path.display(),
                source
            ),
        )
    })?;
    parse_control(&source, kind)
}

pub fn write_control_file(path: &Path, record: &ControlRecord) -> ControlResult<()> {
    write_text_artifact(path, &serialize_control(record)).map_err(|source| {
        PipelineError::io_system(
            "IO.CONTROL_WRITE",
            format!("failed to write control '{}': {}", path.display(), source),
        )
    })
}

pub fn parse_control(source: &str, kind: PhaseKind) -> ControlResult<ControlRecord> {
    let lines = source
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>();

    let required = match kind {
        PhaseKind::SingleTrajectory | PhaseKind::EnsembleTrajectory => TRAJECTORY_REQUIRED_LINES,
        PhaseKind::Concentration => CONCENTRATION_REQUIRED_LINES,
    };
    if lines.len() < required {
        return Err(PipelineError::malformed_control(
            "INPUT.CONTROL_LINES",
            format!(
                "{} control has {} lines, expected at least {}",
                kind,
                lines.len(),
                required
            ),
        ));
    }

    let header = parse_header(&lines)?;
    let body = match kind {
        PhaseKind::SingleTrajectory => ControlBody::Trajectory(parse_trajectory_fields(&lines)?),
        PhaseKind::EnsembleTrajectory => ControlBody::Ensemble(parse_trajectory_fields(&lines)?),
        PhaseKind::Concentration => {
            ControlBody::Concentration(parse_concentration_fields(&lines)?)
        }
    };

    Ok(ControlRecord {
        lines,
        header,
        body,
    })
}

pub fn serialize_control(record: &ControlRecord) -> String {
    let mut lines = record.lines.clone();
    let header = &record.header;

    lines[LINE_START_TIME] = format_start_time(header.start_time);
    lines[LINE_SITE_COUNT] = header.site_count.to_string();
    lines[LINE_RELEASE_LOCATION] = [header.latitude, header.longitude, header.height_agl]
        .map(format_control_float)
        .join(" ");
    lines[LINE_PERIOD_COUNT] = header.period_count.to_string();
    lines[LINE_METEOROLOGY_FILE] = header.meteorology_file.clone();

    match &record.body {
        ControlBody::Trajectory(fields) | ControlBody::Ensemble(fields) => {
            lines[LINE_TRAJECTORY_OUTPUT] = fields.output_file.clone();
        }
        ControlBody::Concentration(fields) => {
            lines[LINE_RELEASE_DURATION] = format_control_float(fields.release_duration);
            lines[LINE_CONCENTRATION_OUTPUT] = fields.output_file.clone();
            lines[LINE_HEIGHT_BOUNDS] = join_floats(&fields.height_bounds);
            lines[LINE_DEPOSITION] = join_floats(&fields.deposition_settings);
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub fn format_start_time(start_time: NaiveDateTime) -> String {
    start_time.format(START_TIME_FORMAT).to_string()
}

/// Parses `YY MM DD HH`. Two-digit years pivot at 69 the way `strptime` does.
pub fn parse_start_time(line: &str) -> ControlResult<NaiveDateTime> {
    let malformed = || {
        PipelineError::malformed_control(
            "INPUT.CONTROL_START_TIME",
            format!("start time '{}' does not match 'YY MM DD HH'", line.trim()),
        )
    };

    let fields = line
        .split_whitespace()
        .map(|token| token.parse::<u32>().map_err(|_| malformed()))
        .collect::<ControlResult<Vec<_>>>()?;
    let [year, month, day, hour] = fields[..] else {
        return Err(malformed());
    };
    if year > 99 {
        return Err(malformed());
    }

    let century = if year >= 69 { 1900 } else { 2000 };
    let full_year = (century + year) as i32;
    NaiveDate::from_ymd_opt(full_year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(malformed)
}

fn parse_header(lines: &[String]) -> ControlResult<ControlHeader> {
    if lines.len() < HEADER_REQUIRED_LINES {
        return Err(PipelineError::malformed_control(
            "INPUT.CONTROL_LINES",
            format!(
                "control has {} lines, expected at least {}",
                lines.len(),
                HEADER_REQUIRED_LINES
            ),
        ));
    }

    let start_time = parse_start_time(&lines[LINE_START_TIME])?;
    let site_count = parse_scalar::<u32>(lines, LINE_SITE_COUNT, "site count")?;

    let location = parse_float_list(lines, LINE_RELEASE_LOCATION, "release location")?;
    if location.len() < 3 {
        return Err(field_error(
            LINE_RELEASE_LOCATION,
            "release location",
            &lines[LINE_RELEASE_LOCATION],
        ));
    }

    Ok(ControlHeader {
        start_time,
        site_count,
        latitude: location[0],
        longitude: location[1],
        height_agl: location[2],
        period_count: parse_scalar::<i64>(lines, LINE_PERIOD_COUNT, "period count")?,
        meteorology_file: lines[LINE_METEOROLOGY_FILE].trim().to_string(),
    })
}

fn parse_trajectory_fields(lines: &[String]) -> ControlResult<TrajectoryFields> {
    Ok(TrajectoryFields {
        output_file: parse_file_name(lines, LINE_TRAJECTORY_OUTPUT, "trajectory output")?,
    })
}

fn parse_concentration_fields(lines: &[String]) -> ControlResult<ConcentrationFields> {
    let release_duration =
        parse_scalar::<f64>(lines, LINE_RELEASE_DURATION, "release duration")?;
    let output_file = parse_file_name(lines, LINE_CONCENTRATION_OUTPUT, "concentration output")?;
    let height_bounds = parse_float_list(lines, LINE_HEIGHT_BOUNDS, "height bounds")?;
    if height_bounds.is_empty() {
        return Err(field_error(
            LINE_HEIGHT_BOUNDS,
            "height bounds",
            &lines[LINE_HEIGHT_BOUNDS],
        ));
    }

    let settings = parse_float_list(lines, LINE_DEPOSITION, "deposition settings")?;
    let deposition_settings: [f64; DEPOSITION_SETTING_COUNT] = settings
        .try_into()
        .map_err(|_| field_error(LINE_DEPOSITION, "deposition settings", &lines[LINE_DEPOSITION]))?;

    Ok(ConcentrationFields {
        release_duration,
        output_file,
        height_bounds,
        deposition_settings,
    })
}

fn parse_scalar<T: FromStr>(lines: &[String], index: usize, label: &str) -> ControlResult<T> {
    lines[index]
        .trim()
        .parse::<T>()
        .map_err(|_| field_error(index, label, &lines[index]))
}

fn parse_float_list(lines: &[String], index: usize, label: &str) -> ControlResult<Vec<f64>> {
    lines[index]
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| field_error(index, label, &lines[index]))
        })
        .collect()
}

fn parse_file_name(lines: &[String], index: usize, label: &str) -> ControlResult<String> {
    let name = lines[index].trim();
    if name.is_empty() {
        return Err(field_error(index, label, &lines[index]));
    }
    Ok(name.to_string())
}

fn field_error(index: usize, label: &str, line: &str) -> PipelineError {
    PipelineError::malformed_control(
        "INPUT.CONTROL_FIELD",
        format!("invalid {} '{}' at control line {}", label, line.trim(), index),
    )
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .copied()
        .map(format_control_float)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub(crate) const TRAJECTORY_TEMPLATE: &str = "24 01 01 00
1
42.5 -73.8 250.0
6
0
10000.0
1
/home/xcite/hysplit/met/
hysplit.hrrr.20231231.06z-20240101.00z.sml
./
tdump
";

    pub(crate) const CONCENTRATION_TEMPLATE: &str = "24 01 01 00
1
42.5 -73.8 250.0
6
0
10000.0
1
/home/xcite/hysplit/met/
hysplit.hrrr.20231231.06z-20240101.00z.sml
1
PM25
1.0
1.0
00 00 00 00 00
1
0.0 0.0
0.05 0.05
30.0 30.0
./
cdump
2
0 100
00 00 00 00 00
00 00 00 00 00
00 01 00
1
0.006 0.0064 0.8 1.0
0.0 0.0 0.0 0.0 0.0
0.0 0.0 0.0
0.0
0.0
";
}
