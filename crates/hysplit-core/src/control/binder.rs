use super::model::ControlRecord;
use crate::domain::RunParameters;
use chrono::{Duration, NaiveDateTime, Timelike};

const METEOROLOGY_STAMP_FORMAT: &str = "%Y%m%d.%Hz";

/// Merges request parameters into a template. Only the start time, release
/// location, signed period count and meteorology file change; every other
/// template line is carried over untouched.
pub fn bind(template: &ControlRecord, parameters: &RunParameters) -> ControlRecord {
    let mut bound = template.clone();
    let header = &mut bound.header;
    header.start_time = parameters.start_time;
    header.latitude = parameters.latitude;
    header.longitude = parameters.longitude;
    header.height_agl = parameters.height;
    header.period_count = parameters.direction.signed(parameters.record_count);
    header.meteorology_file = meteorology_file(parameters.start_time);
    bound
}

/// Name of the meteorology archive covering a run that starts at `start`.
/// The archive opens the previous day at 06z for 00z starts, 18z otherwise.
pub fn meteorology_file(start: NaiveDateTime) -> String {
    let previous_day = start - Duration::days(1);
    let lookback_hour = if start.hour() == 0 { 6 } else { 18 };
    let opened = previous_day
        .with_hour(lookback_hour)
        .unwrap_or(previous_day);
    format!(
        "hysplit.hrrr.{}-{}.sml",
        opened.format(METEOROLOGY_STAMP_FORMAT),
        start.format(METEOROLOGY_STAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::{bind, meteorology_file};
    use crate::control::parser::fixtures::{CONCENTRATION_TEMPLATE, TRAJECTORY_TEMPLATE};
    use crate::control::{parse_control, serialize_control};
    use crate::domain::{Direction, PhaseKind, RunParameters};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp")
    }

    fn parameters(direction: Direction, record_count: u32) -> RunParameters {
        RunParameters {
            latitude: 43.25,
            longitude: -75.125,
            height: 500.0,
            direction,
            record_count,
            start_time: at(2024, 3, 1, 12),
        }
    }

    #[test]
    fn bound_control_reparses_to_request_parameters() {
        let cases = [
            (TRAJECTORY_TEMPLATE, PhaseKind::SingleTrajectory),
            (TRAJECTORY_TEMPLATE, PhaseKind::EnsembleTrajectory),
            (CONCENTRATION_TEMPLATE, PhaseKind::Concentration),
        ];
        for (source, kind) in cases {
            let template = parse_control(source, kind).expect("template should parse");
            for direction in [Direction::Forward, Direction::Backward] {
                for record_count in [1_u32, 6, 24] {
                    let request = parameters(direction, record_count);
                    let bound = bind(&template, &request);
                    let reparsed = parse_control(&serialize_control(&bound), kind)
                        .expect("bound control should parse");

                    assert_eq!(reparsed.header.latitude, request.latitude);
                    assert_eq!(reparsed.header.longitude, request.longitude);
                    assert_eq!(reparsed.header.height_agl, request.height);
                    assert_eq!(reparsed.direction(), direction);
                    assert_eq!(reparsed.header.record_count(), u64::from(record_count));
                    assert_eq!(reparsed.header.start_time, request.start_time);
                    assert_eq!(reparsed.body, template.body);
                }
            }
        }
    }

    #[test]
    fn bind_is_pure() {
        let template = parse_control(CONCENTRATION_TEMPLATE, PhaseKind::Concentration)
            .expect("template should parse");
        let request = parameters(Direction::Backward, 6);
        let first = serialize_control(&bind(&template, &request));
        let second = serialize_control(&bind(&template, &request));
        assert_eq!(first, second);
        assert_eq!(template.header.period_count, 6);
    }

    #[test]
    fn backward_binding_writes_negative_count_line() {
        let template = parse_control(TRAJECTORY_TEMPLATE, PhaseKind::SingleTrajectory)
            .expect("template should parse");
        let text = serialize_control(&bind(&template, &parameters(Direction::Backward, 12)));
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "24 03 01 12");
        assert_eq!(lines[2], "43.25 -75.125 500.0");
        assert_eq!(lines[3], "-12");
        assert_eq!(
            lines[8],
            "hysplit.hrrr.20240229.18z-20240301.12z.sml"
        );
    }

    #[test]
    fn meteorology_lookback_depends_on_start_hour() {
        assert_eq!(
            meteorology_file(at(2024, 1, 1, 0)),
            "hysplit.hrrr.20231231.06z-20240101.00z.sml"
        );
        assert_eq!(
            meteorology_file(at(2024, 1, 1, 12)),
            "hysplit.hrrr.20231231.18z-20240101.12z.sml"
        );
    }
}
