mod binder;
mod model;
mod parser;

pub use binder::{bind, meteorology_file};
pub use model::{
    ConcentrationFields, ControlBody, ControlHeader, ControlRecord, TrajectoryFields,
};
pub use parser::{
    format_start_time, parse_control, parse_start_time, read_control_file, serialize_control,
    write_control_file,
};

#[cfg(test)]
pub(crate) use parser::fixtures;
