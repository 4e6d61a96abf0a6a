//! Logger configuration derived from the Cloud Run environment.

use serde::Serialize;

use crate::CloudResource;

/// Name of the Cloud Run service.
pub const SERVICE_ENV: &str = "K_SERVICE";

/// Name of the Cloud Run revision being run.
pub const REVISION_ENV: &str = "K_REVISION";

/// Name of the Cloud Run configuration that created the revision.
pub const CONFIGURATION_ENV: &str = "K_CONFIGURATION";

/// Shape of the emitted lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines, used outside of a structured log collector.
    #[default]
    Plain,

    /// Single-line JSON documents understood by Cloud Logging.
    Structured,
}

/// Identifies the service reporting errors to Error Reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceContext {
    /// The service name.
    pub service: String,
}

/// Snapshot of the environment variables Cloud Run sets for a container.
///
/// Unset and empty variables are both treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudRunEnvironment {
    /// Value of [`SERVICE_ENV`].
    pub service: Option<String>,

    /// Value of [`REVISION_ENV`].
    pub revision: Option<String>,

    /// Value of [`CONFIGURATION_ENV`].
    pub configuration: Option<String>,
}

impl CloudRunEnvironment {
    /// Reads the variables from the process environment.
    pub fn from_env() -> Self {
        Self {
            service: non_empty_var(SERVICE_ENV),
            revision: non_empty_var(REVISION_ENV),
            configuration: non_empty_var(CONFIGURATION_ENV),
        }
    }

    /// Whether the process looks like it runs on Cloud Run.
    pub fn is_cloud_run(&self) -> bool {
        self.service.is_some()
    }

    /// The service context to attach to structured records, if a service name is known.
    pub fn service_context(&self) -> Option<ServiceContext> {
        self.service.clone().map(|service| ServiceContext { service })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Configuration of a [`Logger`][crate::Logger].
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Shape of the emitted lines.
    pub format: LogFormat,

    /// Service context attached to structured records. Ignored in plain format.
    pub service_context: Option<ServiceContext>,

    /// Monitored resource and log name attached to structured records. Ignored in plain format.
    pub resource: Option<CloudResource>,
}

impl LoggerConfig {
    /// Structured output when a service name is present, plain output otherwise.
    pub fn from_environment(environment: &CloudRunEnvironment) -> Self {
        let format = if environment.is_cloud_run() {
            LogFormat::Structured
        } else {
            LogFormat::Plain
        };

        Self {
            format,
            service_context: environment.service_context(),
            resource: None,
        }
    }

    /// Reads the process environment, see [`LoggerConfig::from_environment`].
    pub fn from_env() -> Self {
        Self::from_environment(&CloudRunEnvironment::from_env())
    }
}
