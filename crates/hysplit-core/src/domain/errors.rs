use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PipelineResult<T> = Result<T, PipelineError>;
pub type ControlResult<T> = PipelineResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineErrorCategory {
    Success,
    InputValidation,
    IoSystem,
    SimulationFailed,
    ExternalProcess,
    Persistence,
    Internal,
}

impl PipelineErrorCategory {
    pub const fn exit_mapping(self) -> ExitMapping {
        match self {
            Self::Success => ExitMapping {
                exit_code: 0,
                name: "Success",
                class: "SUCCESS",
            },
            Self::InputValidation => ExitMapping {
                exit_code: 2,
                name: "InputValidation",
                class: "INPUT_FATAL",
            },
            Self::IoSystem => ExitMapping {
                exit_code: 3,
                name: "IoSystem",
                class: "IO_FATAL",
            },
            Self::SimulationFailed => ExitMapping {
                exit_code: 4,
                name: "SimulationFailed",
                class: "RUN_FATAL",
            },
            Self::ExternalProcess => ExitMapping {
                exit_code: 5,
                name: "ExternalProcess",
                class: "EXEC_FATAL",
            },
            Self::Persistence => ExitMapping {
                exit_code: 6,
                name: "Persistence",
                class: "STORE_FATAL",
            },
            Self::Internal => ExitMapping {
                exit_code: 7,
                name: "Internal",
                class: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_mapping().exit_code
    }

    pub const fn name(self) -> &'static str {
        self.exit_mapping().name
    }

    pub const fn class(self) -> &'static str {
        self.exit_mapping().class
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitMapping {
    pub exit_code: i32,
    pub name: &'static str,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    category: PipelineErrorCategory,
    placeholder: &'static str,
    message: String,
    exit_status: Option<i32>,
}

impl PipelineError {
    pub fn new(
        category: PipelineErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
            exit_status: None,
        }
    }

    /// A control file is missing required lines or carries unparseable fields.
    pub fn malformed_control(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCategory::InputValidation, placeholder, message)
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCategory::InputValidation, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCategory::IoSystem, placeholder, message)
    }

    pub fn simulation_failed(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCategory::SimulationFailed, placeholder, message)
    }

    /// Any external process that finished unsuccessfully for a reason other
    /// than the model's own fatal sentinel. `exit_status` is `None` when the
    /// process was killed by a signal or by the invocation timeout.
    pub fn external_process(
        placeholder: &'static str,
        exit_status: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            exit_status,
            ..Self::new(PipelineErrorCategory::ExternalProcess, placeholder, message)
        }
    }

    pub fn persistence(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCategory::Persistence, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> PipelineErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::{PipelineError, PipelineErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (PipelineErrorCategory::Success, 0, "Success", "SUCCESS"),
            (
                PipelineErrorCategory::InputValidation,
                2,
                "InputValidation",
                "INPUT_FATAL",
            ),
            (PipelineErrorCategory::IoSystem, 3, "IoSystem", "IO_FATAL"),
            (
                PipelineErrorCategory::SimulationFailed,
                4,
                "SimulationFailed",
                "RUN_FATAL",
            ),
            (
                PipelineErrorCategory::ExternalProcess,
                5,
                "ExternalProcess",
                "EXEC_FATAL",
            ),
            (
                PipelineErrorCategory::Persistence,
                6,
                "Persistence",
                "STORE_FATAL",
            ),
            (PipelineErrorCategory::Internal, 7, "Internal", "SYS_FATAL"),
        ];

        for (category, exit_code, name, class) in cases {
            let mapping = category.exit_mapping();
            assert_eq!(mapping.exit_code, exit_code);
            assert_eq!(mapping.name, name);
            assert_eq!(mapping.class, class);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = PipelineError::malformed_control(
            "INPUT.CONTROL_LINES",
            "control file has 3 lines, expected at least 9",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.CONTROL_LINES] control file has 3 lines, expected at least 9"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
    }

    #[test]
    fn external_process_error_keeps_raw_status() {
        let error = PipelineError::external_process("RUN.PHASE_EXIT", Some(3), "exit code 3");
        assert_eq!(error.category(), PipelineErrorCategory::ExternalProcess);
        assert_eq!(error.exit_status(), Some(3));

        let plain = PipelineError::io_system("IO.COPY", "copy failed");
        assert_eq!(plain.exit_status(), None);
    }
}
