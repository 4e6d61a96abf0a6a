//! Monitored resource descriptor attached to records when the logger identifies its cloud
//! resource at construction.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::CloudRunEnvironment;

/// Monitored resource type of a Cloud Run revision.
pub const CLOUD_RUN_RESOURCE_TYPE: &str = "cloud_run_revision";

/// A Cloud Logging monitored resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    /// The resource type, e.g. [`CLOUD_RUN_RESOURCE_TYPE`].
    #[serde(rename = "type")]
    pub kind: String,

    /// Labels identifying the resource instance.
    pub labels: BTreeMap<String, String>,
}

/// The log name and monitored resource written with every structured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudResource {
    /// Full log name, `projects/<project>/logs/<log id>`.
    pub log_name: String,

    /// The resource records are attributed to.
    pub resource: MonitoredResource,
}

impl CloudResource {
    /// Describes a Cloud Run revision in `project_id` and `region`.
    ///
    /// Service, revision and configuration labels are taken from `environment` when present.
    /// `log_id` is URL-encoded into the log name.
    pub fn cloud_run(
        project_id: &str,
        region: &str,
        environment: &CloudRunEnvironment,
        log_id: &str,
    ) -> Self {
        let mut labels = BTreeMap::from([
            ("project_id".to_owned(), project_id.to_owned()),
            ("location".to_owned(), region.to_owned()),
        ]);

        let optional_labels = [
            ("service_name", &environment.service),
            ("revision_name", &environment.revision),
            ("configuration_name", &environment.configuration),
        ];
        for (key, value) in optional_labels {
            if let Some(value) = value {
                labels.insert(key.to_owned(), value.clone());
            }
        }

        Self {
            log_name: format!(
                "projects/{project_id}/logs/{}",
                urlencoding::encode(log_id)
            ),
            resource: MonitoredResource {
                kind: CLOUD_RUN_RESOURCE_TYPE.to_owned(),
                labels,
            },
        }
    }

    /// Queries the metadata server for the project and region of the running instance.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`][crate::LoggerError] if either value cannot be fetched. There is no
    /// retry.
    #[cfg(feature = "resource")]
    pub fn resolve(
        client: &crate::MetadataClient,
        environment: &CloudRunEnvironment,
        log_id: &str,
    ) -> Result<Self, crate::LoggerError> {
        let project_id = client.project_id()?;
        let region = client.region()?;

        let resource = Self::cloud_run(&project_id, &region, environment, log_id);
        tracing::debug!(
            log_name = %resource.log_name,
            labels = ?resource.resource.labels,
            "Resolved monitored resource"
        );

        Ok(resource)
    }
}
