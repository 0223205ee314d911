//! Structured records of what each run did.
//!
//! One [`LayerLogEntry`] is written per processed layer and one
//! [`StyleLogEntry`] per processed style, immediately after the item finishes.

use std::error::Error as StdError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{StoreAction, StyleAction, StyleReport};
use crate::model::{LayerDeclaration, StyleDeclaration};

/// Final status of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    /// Every stage completed.
    Success,
    /// A stage failed; the message says which.
    Error,
}

/// Flat record of the stages completed for one layer.
#[expect(
    clippy::struct_excessive_bools,
    reason = "one flag per pipeline stage keeps the NDJSON record flat"
)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerLogEntry {
    /// When processing of the layer finished.
    pub timestamp: DateTime<Utc>,
    /// Region the layer belongs to.
    pub region: String,
    /// Display name from the manifest.
    pub layer_name: String,
    /// Upstream link.
    pub link: String,
    /// The upstream stream was downloaded.
    pub layer_stream_fetched: bool,
    /// The download was normalised into a bundle.
    pub layer_processed: bool,
    /// The region's workspace was created during this run.
    pub workspace_created: bool,
    /// A shapefile datastore was created.
    pub wfs_datastore_created: bool,
    /// A shapefile datastore was replaced.
    pub wfs_datastore_updated: bool,
    /// A vector layer was published by a datastore creation.
    pub wfs_layer_created: bool,
    /// A vector layer was republished by a datastore replacement.
    pub wfs_layer_updated: bool,
    /// A WMS store was created.
    pub wms_datastore_created: bool,
    /// A WMS store was patched.
    pub wms_datastore_updated: bool,
    /// A WMS layer was created.
    pub wms_layer_created: bool,
    /// A WMS layer was recreated.
    pub wms_layer_updated: bool,
    /// Final status.
    pub status: LogStatus,
    /// Human-readable summary or error.
    pub message: String,
}

impl LayerLogEntry {
    /// Start an entry for `layer` with every stage flag cleared.
    #[must_use]
    pub fn start(region: &str, layer: &LayerDeclaration, workspace_created: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            region: region.to_owned(),
            layer_name: layer.layer_name.clone(),
            link: layer.link.clone(),
            layer_stream_fetched: false,
            layer_processed: false,
            workspace_created,
            wfs_datastore_created: false,
            wfs_datastore_updated: false,
            wfs_layer_created: false,
            wfs_layer_updated: false,
            wms_datastore_created: false,
            wms_datastore_updated: false,
            wms_layer_created: false,
            wms_layer_updated: false,
            status: LogStatus::Success,
            message: String::new(),
        }
    }

    /// Record the outcome of converging a shapefile datastore.
    ///
    /// Uploading a shapefile publishes its layer, so the layer flags follow
    /// the datastore flags.
    pub const fn record_vector_store(&mut self, action: StoreAction) {
        match action {
            StoreAction::Created => {
                self.wfs_datastore_created = true;
                self.wfs_layer_created = true;
            }
            StoreAction::Replaced => {
                self.wfs_datastore_updated = true;
                self.wfs_layer_updated = true;
            }
            StoreAction::Skipped => {}
        }
    }

    /// Record the outcome of converging a WMS store.
    pub const fn record_wms_store(&mut self, action: StoreAction) {
        match action {
            StoreAction::Created => self.wms_datastore_created = true,
            StoreAction::Replaced => self.wms_datastore_updated = true,
            StoreAction::Skipped => {}
        }
    }

    /// Record the outcome of converging a WMS layer.
    pub const fn record_wms_layer(&mut self, action: StoreAction) {
        match action {
            StoreAction::Created => self.wms_layer_created = true,
            StoreAction::Replaced => self.wms_layer_updated = true,
            StoreAction::Skipped => {}
        }
    }

    /// Mark the entry successful.
    pub fn succeed(&mut self, message: impl Into<String>) {
        self.timestamp = Utc::now();
        self.status = LogStatus::Success;
        self.message = message.into();
    }

    /// Mark the entry failed with the error's display text.
    pub fn fail(&mut self, error: &dyn StdError) {
        self.timestamp = Utc::now();
        self.status = LogStatus::Error;
        self.message = error.to_string();
    }
}

/// Record of uploading and assigning one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleLogEntry {
    /// When processing finished.
    pub timestamp: DateTime<Utc>,
    /// Workspace owning the style.
    pub workspace: String,
    /// Layer the style was assigned to.
    pub layer: String,
    /// Style name.
    pub style_name: String,
    /// The style was newly registered.
    pub style_created: bool,
    /// An existing style body was replaced.
    pub style_updated: bool,
    /// The style became the layer's default.
    pub style_assigned: bool,
    /// Final status.
    pub status: LogStatus,
    /// Human-readable summary or error.
    pub message: String,
}

impl StyleLogEntry {
    /// Entry describing a completed upload.
    ///
    /// A failed assignment marks the entry as an error while keeping the
    /// creation flags, since the style body stays stored.
    #[must_use]
    pub fn from_report(declaration: &StyleDeclaration, report: &StyleReport) -> Self {
        let (status, message) = match &report.assignment_failure {
            None => (
                LogStatus::Success,
                format!(
                    "style {} assigned to {}:{}",
                    declaration.style_name, declaration.workspace, declaration.layer
                ),
            ),
            Some(reason) => (
                LogStatus::Error,
                format!("style stored but not assigned: {reason}"),
            ),
        };
        Self {
            timestamp: Utc::now(),
            workspace: declaration.workspace.clone(),
            layer: declaration.layer.clone(),
            style_name: declaration.style_name.clone(),
            style_created: report.action == StyleAction::Created,
            style_updated: report.action == StyleAction::Updated,
            style_assigned: report.assigned(),
            status,
            message,
        }
    }

    /// Entry describing a failed upload.
    #[must_use]
    pub fn failed(declaration: &StyleDeclaration, error: &dyn StdError) -> Self {
        Self {
            timestamp: Utc::now(),
            workspace: declaration.workspace.clone(),
            layer: declaration.layer.clone(),
            style_name: declaration.style_name.clone(),
            style_created: false,
            style_updated: false,
            style_assigned: false,
            status: LogStatus::Error,
            message: error.to_string(),
        }
    }
}

/// Failure to persist a log entry.
#[derive(Debug, Error)]
#[error("failed to record outcome ({what}): {source}")]
pub struct RecordOutcomeError {
    what: String,
    source: Box<dyn StdError + Send + Sync>,
}

impl RecordOutcomeError {
    /// Wrap `source`, describing the step that failed as `what`.
    pub fn new(what: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            what: what.into(),
            source: source.into(),
        }
    }
}

/// Destination for log entries.
pub trait OutcomeSink {
    /// Persist one layer entry.
    ///
    /// # Errors
    ///
    /// Returns [`RecordOutcomeError`] when the entry cannot be written.
    fn record_layer(&mut self, entry: &LayerLogEntry) -> Result<(), RecordOutcomeError>;

    /// Persist one style entry.
    ///
    /// # Errors
    ///
    /// Returns [`RecordOutcomeError`] when the entry cannot be written.
    fn record_style(&mut self, entry: &StyleLogEntry) -> Result<(), RecordOutcomeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkType;
    use rstest::{fixture, rstest};

    #[fixture]
    fn layer() -> LayerDeclaration {
        LayerDeclaration {
            layer_name: "Roads".to_owned(),
            search_name: "roads".to_owned(),
            link: "https://example.test/wfs".to_owned(),
            link_type: LinkType::Wfs,
            output_format: "json".to_owned(),
            version: "2.0.0".to_owned(),
            standard_layer_name: "yukon_roads".to_owned(),
        }
    }

    #[rstest]
    #[case(StoreAction::Created, true, false)]
    #[case(StoreAction::Replaced, false, true)]
    #[case(StoreAction::Skipped, false, false)]
    fn vector_store_flags_follow_action(
        layer: LayerDeclaration,
        #[case] action: StoreAction,
        #[case] created: bool,
        #[case] updated: bool,
    ) {
        let mut entry = LayerLogEntry::start("Yukon", &layer, false);
        entry.record_vector_store(action);
        assert_eq!(entry.wfs_datastore_created, created);
        assert_eq!(entry.wfs_layer_created, created);
        assert_eq!(entry.wfs_datastore_updated, updated);
        assert_eq!(entry.wfs_layer_updated, updated);
    }

    #[rstest]
    fn entry_serialises_flat_record(layer: LayerDeclaration) {
        let mut entry = LayerLogEntry::start("Yukon", &layer, true);
        entry.succeed("published");
        let value = serde_json::to_value(&entry).expect("entry should serialise");
        assert_eq!(value["status"], "success");
        assert_eq!(value["workspace_created"], true);
        assert_eq!(value["layer_name"], "Roads");
        assert_eq!(value["message"], "published");
    }

    #[rstest]
    fn failed_entry_keeps_completed_stages(layer: LayerDeclaration) {
        let mut entry = LayerLogEntry::start("Yukon", &layer, false);
        entry.layer_stream_fetched = true;
        let error = crate::source::FetchError::EmptyResponse {
            url: "https://example.test/wfs".to_owned(),
        };
        entry.fail(&error);
        assert_eq!(entry.status, LogStatus::Error);
        assert!(entry.layer_stream_fetched);
        assert!(entry.message.contains("empty response"));
    }

    #[rstest]
    fn style_entry_reports_failed_assignment() {
        let declaration = StyleDeclaration {
            workspace: "yukon_v2".to_owned(),
            layer: "roads".to_owned(),
            style_name: "roads_style".to_owned(),
            style_path: "styles/roads.sld".into(),
        };
        let report = StyleReport {
            action: StyleAction::Created,
            assignment_failure: Some("status 500".to_owned()),
        };
        let entry = StyleLogEntry::from_report(&declaration, &report);
        assert!(entry.style_created);
        assert!(!entry.style_assigned);
        assert_eq!(entry.status, LogStatus::Error);
    }
}
