//! Test doubles for the orchestrator's collaborators.
//!
//! [`StubCatalog`] models the catalog in memory and records every call, so
//! tests can assert both the converged state and the operations that got it
//! there.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use camino::{Utf8Path, Utf8PathBuf};

use crate::catalog::{
    Catalog, CatalogError, RenameOutcome, StoreAction, StyleAction, StyleReport, WmsStoreOptions,
    WorkspaceOutcome,
};
use crate::normalise::{FormatError, Normaliser};
use crate::outcome::{LayerLogEntry, OutcomeSink, RecordOutcomeError, StyleLogEntry};
use crate::source::{FeaturePayload, FeatureRequest, FeatureSource, FetchError, OutputFormat};

/// Catalog operations, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Catalog::workspace_exists`].
    WorkspaceExists,
    /// [`Catalog::ensure_workspace`].
    EnsureWorkspace,
    /// [`Catalog::ensure_vector_datastore`].
    EnsureVectorDatastore,
    /// [`Catalog::rename_published_layer`].
    RenamePublishedLayer,
    /// [`Catalog::ensure_wms_datastore`].
    EnsureWmsDatastore,
    /// [`Catalog::ensure_wms_layer`].
    EnsureWmsLayer,
    /// [`Catalog::upload_style`].
    UploadStyle,
    /// The assignment step of [`Catalog::upload_style`].
    AssignStyle,
}

/// A recorded call to [`StubCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    /// Workspace lookup.
    WorkspaceExists {
        /// Workspace name.
        workspace: String,
    },
    /// Workspace creation.
    EnsureWorkspace {
        /// Workspace name.
        workspace: String,
    },
    /// Shapefile datastore convergence.
    EnsureVectorDatastore {
        /// Workspace name.
        workspace: String,
        /// Datastore name.
        datastore: String,
        /// Bundle path.
        bundle: Utf8PathBuf,
        /// Whether replacement was allowed.
        update_allowed: bool,
    },
    /// Feature type rename.
    RenamePublishedLayer {
        /// Workspace name.
        workspace: String,
        /// Datastore name.
        datastore: String,
        /// Current name.
        source: String,
        /// Desired name.
        target: String,
    },
    /// WMS store convergence.
    EnsureWmsDatastore {
        /// Workspace name.
        workspace: String,
        /// Datastore name.
        datastore: String,
        /// Upstream capabilities URL.
        capabilities_url: String,
        /// Whether patching was allowed.
        update_allowed: bool,
    },
    /// WMS layer convergence.
    EnsureWmsLayer {
        /// Workspace name.
        workspace: String,
        /// Datastore name.
        datastore: String,
        /// Upstream layer name.
        source: String,
        /// Published name.
        target: String,
        /// Whether recreation was allowed.
        update_allowed: bool,
    },
    /// Style upload.
    UploadStyle {
        /// Workspace name.
        workspace: String,
        /// Layer receiving the style.
        layer: String,
        /// Style name.
        style: String,
    },
}

impl CatalogCall {
    /// The operation this call invoked.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::WorkspaceExists { .. } => Operation::WorkspaceExists,
            Self::EnsureWorkspace { .. } => Operation::EnsureWorkspace,
            Self::EnsureVectorDatastore { .. } => Operation::EnsureVectorDatastore,
            Self::RenamePublishedLayer { .. } => Operation::RenamePublishedLayer,
            Self::EnsureWmsDatastore { .. } => Operation::EnsureWmsDatastore,
            Self::EnsureWmsLayer { .. } => Operation::EnsureWmsLayer,
            Self::UploadStyle { .. } => Operation::UploadStyle,
        }
    }
}

/// Failure injected into [`StubCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Answer as if the credentials were rejected.
    Unauthorized,
    /// Answer with the given HTTP status.
    Status(u16),
}

/// Subject matching every resource.
pub const ANY_SUBJECT: &str = "*";

#[derive(Debug, Default)]
struct CatalogState {
    workspaces: BTreeSet<String>,
    feature_types: BTreeMap<(String, String), BTreeSet<String>>,
    wms_stores: BTreeSet<(String, String)>,
    wms_layers: BTreeSet<(String, String)>,
    styles: BTreeSet<(String, String)>,
    default_styles: BTreeMap<(String, String), String>,
}

/// In-memory catalog recording every call.
///
/// Failures are keyed by operation and subject. The subject is the workspace
/// for workspace operations, the datastore for vector datastores, the
/// capabilities URL for WMS stores, the target name for layer operations and
/// the style name for style operations. [`ANY_SUBJECT`] matches everything.
#[derive(Debug, Default)]
pub struct StubCatalog {
    state: RefCell<CatalogState>,
    calls: RefCell<Vec<CatalogCall>>,
    failures: HashMap<(Operation, String), InjectedFailure>,
}

impl StubCatalog {
    /// Seed an existing workspace.
    #[must_use]
    pub fn with_workspace(self, workspace: &str) -> Self {
        self.state.borrow_mut().workspaces.insert(workspace.to_owned());
        self
    }

    /// Seed an existing shapefile datastore publishing `feature_type`.
    #[must_use]
    pub fn with_vector_datastore(self, workspace: &str, datastore: &str, feature_type: &str) -> Self {
        self.state
            .borrow_mut()
            .feature_types
            .entry((workspace.to_owned(), datastore.to_owned()))
            .or_default()
            .insert(feature_type.to_owned());
        self
    }

    /// Seed an existing WMS store.
    #[must_use]
    pub fn with_wms_datastore(self, workspace: &str, datastore: &str) -> Self {
        self.state
            .borrow_mut()
            .wms_stores
            .insert((workspace.to_owned(), datastore.to_owned()));
        self
    }

    /// Seed an existing WMS layer.
    #[must_use]
    pub fn with_wms_layer(self, workspace: &str, layer: &str) -> Self {
        self.state
            .borrow_mut()
            .wms_layers
            .insert((workspace.to_owned(), layer.to_owned()));
        self
    }

    /// Seed an existing style.
    #[must_use]
    pub fn with_style(self, workspace: &str, style: &str) -> Self {
        self.state
            .borrow_mut()
            .styles
            .insert((workspace.to_owned(), style.to_owned()));
        self
    }

    /// Make `operation` on `subject` fail.
    #[must_use]
    pub fn failing(mut self, operation: Operation, subject: &str, failure: InjectedFailure) -> Self {
        self.failures
            .insert((operation, subject.to_owned()), failure);
        self
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.borrow().clone()
    }

    /// Number of calls to `operation`.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Whether `workspace` exists.
    #[must_use]
    pub fn has_workspace(&self, workspace: &str) -> bool {
        self.state.borrow().workspaces.contains(workspace)
    }

    /// Feature types published by a shapefile datastore, or `None` when the
    /// datastore does not exist.
    #[must_use]
    pub fn feature_types(&self, workspace: &str, datastore: &str) -> Option<Vec<String>> {
        self.state
            .borrow()
            .feature_types
            .get(&(workspace.to_owned(), datastore.to_owned()))
            .map(|names| names.iter().cloned().collect())
    }

    /// WMS stores in `workspace`.
    #[must_use]
    pub fn wms_datastores(&self, workspace: &str) -> Vec<String> {
        self.state
            .borrow()
            .wms_stores
            .iter()
            .filter(|(ws, _)| ws == workspace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Whether a WMS layer named `layer` exists in `workspace`.
    #[must_use]
    pub fn has_wms_layer(&self, workspace: &str, layer: &str) -> bool {
        self.state
            .borrow()
            .wms_layers
            .contains(&(workspace.to_owned(), layer.to_owned()))
    }

    /// Default style of `workspace:layer`.
    #[must_use]
    pub fn default_style(&self, workspace: &str, layer: &str) -> Option<String> {
        self.state
            .borrow()
            .default_styles
            .get(&(workspace.to_owned(), layer.to_owned()))
            .cloned()
    }

    fn record(&self, call: CatalogCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, operation: Operation, subject: &str) -> Result<(), CatalogError> {
        let failure = self
            .failures
            .get(&(operation, subject.to_owned()))
            .or_else(|| self.failures.get(&(operation, ANY_SUBJECT.to_owned())));
        match failure {
            None => Ok(()),
            Some(InjectedFailure::Unauthorized) => Err(CatalogError::Unauthorized {
                operation: operation_name(operation),
                url: subject.to_owned(),
            }),
            Some(InjectedFailure::Status(status)) => Err(CatalogError::Store {
                operation: operation_name(operation),
                url: subject.to_owned(),
                status: *status,
                message: "injected failure".to_owned(),
            }),
        }
    }
}

const fn operation_name(operation: Operation) -> &'static str {
    match operation {
        Operation::WorkspaceExists => "workspace lookup",
        Operation::EnsureWorkspace => "workspace creation",
        Operation::EnsureVectorDatastore => "shapefile datastore upload",
        Operation::RenamePublishedLayer => "feature type rename",
        Operation::EnsureWmsDatastore => "WMS store convergence",
        Operation::EnsureWmsLayer => "WMS layer convergence",
        Operation::UploadStyle => "style upload",
        Operation::AssignStyle => "style assignment",
    }
}

impl Catalog for StubCatalog {
    fn workspace_exists(&self, workspace: &str) -> Result<bool, CatalogError> {
        self.record(CatalogCall::WorkspaceExists {
            workspace: workspace.to_owned(),
        });
        self.check(Operation::WorkspaceExists, workspace)?;
        Ok(self.has_workspace(workspace))
    }

    fn ensure_workspace(&self, workspace: &str) -> Result<WorkspaceOutcome, CatalogError> {
        self.record(CatalogCall::EnsureWorkspace {
            workspace: workspace.to_owned(),
        });
        self.check(Operation::EnsureWorkspace, workspace)?;
        let inserted = self
            .state
            .borrow_mut()
            .workspaces
            .insert(workspace.to_owned());
        Ok(if inserted {
            WorkspaceOutcome::Created
        } else {
            WorkspaceOutcome::AlreadyExisted
        })
    }

    fn ensure_vector_datastore(
        &self,
        workspace: &str,
        datastore: &str,
        bundle: &Utf8Path,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError> {
        self.record(CatalogCall::EnsureVectorDatastore {
            workspace: workspace.to_owned(),
            datastore: datastore.to_owned(),
            bundle: bundle.to_owned(),
            update_allowed,
        });
        self.check(Operation::EnsureVectorDatastore, datastore)?;
        let key = (workspace.to_owned(), datastore.to_owned());
        let mut state = self.state.borrow_mut();
        let existed = state.feature_types.contains_key(&key);
        if existed && !update_allowed {
            return Ok(StoreAction::Skipped);
        }
        let published = bundle.file_stem().unwrap_or(datastore).to_owned();
        state
            .feature_types
            .insert(key, BTreeSet::from([published]));
        Ok(if existed {
            StoreAction::Replaced
        } else {
            StoreAction::Created
        })
    }

    fn rename_published_layer(
        &self,
        workspace: &str,
        datastore: &str,
        source_name: &str,
        target_name: &str,
    ) -> Result<RenameOutcome, CatalogError> {
        self.record(CatalogCall::RenamePublishedLayer {
            workspace: workspace.to_owned(),
            datastore: datastore.to_owned(),
            source: source_name.to_owned(),
            target: target_name.to_owned(),
        });
        self.check(Operation::RenamePublishedLayer, target_name)?;
        if source_name == target_name {
            return Ok(RenameOutcome::Unchanged);
        }
        let mut state = self.state.borrow_mut();
        let Some(names) = state
            .feature_types
            .get_mut(&(workspace.to_owned(), datastore.to_owned()))
        else {
            return Ok(RenameOutcome::NotFound);
        };
        if !names.remove(source_name) {
            return Ok(RenameOutcome::NotFound);
        }
        names.insert(target_name.to_owned());
        Ok(RenameOutcome::Renamed)
    }

    fn ensure_wms_datastore(
        &self,
        workspace: &str,
        datastore: &str,
        capabilities_url: &str,
        _options: &WmsStoreOptions,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError> {
        self.record(CatalogCall::EnsureWmsDatastore {
            workspace: workspace.to_owned(),
            datastore: datastore.to_owned(),
            capabilities_url: capabilities_url.to_owned(),
            update_allowed,
        });
        self.check(Operation::EnsureWmsDatastore, capabilities_url)?;
        let inserted = self
            .state
            .borrow_mut()
            .wms_stores
            .insert((workspace.to_owned(), datastore.to_owned()));
        Ok(match (inserted, update_allowed) {
            (true, _) => StoreAction::Created,
            (false, true) => StoreAction::Replaced,
            (false, false) => StoreAction::Skipped,
        })
    }

    fn ensure_wms_layer(
        &self,
        workspace: &str,
        datastore: &str,
        source_name: &str,
        target_name: &str,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError> {
        self.record(CatalogCall::EnsureWmsLayer {
            workspace: workspace.to_owned(),
            datastore: datastore.to_owned(),
            source: source_name.to_owned(),
            target: target_name.to_owned(),
            update_allowed,
        });
        self.check(Operation::EnsureWmsLayer, target_name)?;
        let inserted = self
            .state
            .borrow_mut()
            .wms_layers
            .insert((workspace.to_owned(), target_name.to_owned()));
        Ok(match (inserted, update_allowed) {
            (true, _) => StoreAction::Created,
            (false, true) => StoreAction::Replaced,
            (false, false) => StoreAction::Skipped,
        })
    }

    fn upload_style(
        &self,
        workspace: &str,
        layer_name: &str,
        style_name: &str,
        _style_bundle: &Utf8Path,
    ) -> Result<StyleReport, CatalogError> {
        self.record(CatalogCall::UploadStyle {
            workspace: workspace.to_owned(),
            layer: layer_name.to_owned(),
            style: style_name.to_owned(),
        });
        self.check(Operation::UploadStyle, style_name)?;
        let mut state = self.state.borrow_mut();
        let inserted = state
            .styles
            .insert((workspace.to_owned(), style_name.to_owned()));
        let action = if inserted {
            StyleAction::Created
        } else {
            StyleAction::Updated
        };
        let assignment_failure = match self.check(Operation::AssignStyle, style_name) {
            Ok(()) => {
                state.default_styles.insert(
                    (workspace.to_owned(), layer_name.to_owned()),
                    style_name.to_owned(),
                );
                None
            }
            Err(error) => Some(error.to_string()),
        };
        Ok(StyleReport {
            action,
            assignment_failure,
        })
    }
}

/// Feature source serving canned payloads keyed by search name.
///
/// Unknown search names fail with [`FetchError::LayerNotFound`].
#[derive(Debug, Default)]
pub struct StubFeatureSource {
    responses: HashMap<String, Result<FeaturePayload, FetchError>>,
    unreachable_maps: BTreeSet<String>,
    fetches: RefCell<Vec<String>>,
    probes: RefCell<Vec<String>>,
}

impl StubFeatureSource {
    /// Serve `bytes` in `format` for `search_name`.
    #[must_use]
    pub fn with_payload(mut self, search_name: &str, format: OutputFormat, bytes: &[u8]) -> Self {
        self.responses.insert(
            search_name.to_owned(),
            Ok(FeaturePayload {
                format,
                bytes: bytes.to_vec(),
            }),
        );
        self
    }

    /// Fail fetches of `search_name` with `error`.
    #[must_use]
    pub fn with_failure(mut self, search_name: &str, error: FetchError) -> Self {
        self.responses.insert(search_name.to_owned(), Err(error));
        self
    }

    /// Make capability probes of `link` fail.
    #[must_use]
    pub fn with_unreachable_map(mut self, link: &str) -> Self {
        self.unreachable_maps.insert(link.to_owned());
        self
    }

    /// Search names fetched so far.
    #[must_use]
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }

    /// Links probed so far.
    #[must_use]
    pub fn probes(&self) -> Vec<String> {
        self.probes.borrow().clone()
    }
}

impl FeatureSource for StubFeatureSource {
    fn fetch_features(&self, request: &FeatureRequest<'_>) -> Result<FeaturePayload, FetchError> {
        self.fetches
            .borrow_mut()
            .push(request.search_name.to_owned());
        self.responses
            .get(request.search_name)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::LayerNotFound {
                    search_name: request.search_name.to_owned(),
                    url: request.link.to_owned(),
                })
            })
    }

    fn probe_map_service(&self, link: &str, _version: &str) -> Result<(), FetchError> {
        self.probes.borrow_mut().push(link.to_owned());
        if self.unreachable_maps.contains(link) {
            return Err(FetchError::Network {
                url: link.to_owned(),
                message: "connection refused".to_owned(),
            });
        }
        Ok(())
    }
}

/// Normaliser that returns the bundle path without touching the filesystem.
#[derive(Debug, Default)]
pub struct StubNormaliser {
    failing_stems: BTreeSet<String>,
    calls: RefCell<Vec<(Utf8PathBuf, String)>>,
}

impl StubNormaliser {
    /// Fail normalisation for `stem` with [`FormatError::NoFeatures`].
    #[must_use]
    pub fn failing_for(mut self, stem: &str) -> Self {
        self.failing_stems.insert(stem.to_owned());
        self
    }

    /// Target directories and stems seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(Utf8PathBuf, String)> {
        self.calls.borrow().clone()
    }
}

impl Normaliser for StubNormaliser {
    fn normalise(
        &self,
        _payload: &FeaturePayload,
        target_dir: &Utf8Path,
        stem: &str,
    ) -> Result<Utf8PathBuf, FormatError> {
        self.calls
            .borrow_mut()
            .push((target_dir.to_owned(), stem.to_owned()));
        if self.failing_stems.contains(stem) {
            return Err(FormatError::NoFeatures);
        }
        Ok(target_dir.join(format!("{stem}.zip")))
    }
}

/// Sink collecting entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Layer entries in recording order.
    pub layers: Vec<LayerLogEntry>,
    /// Style entries in recording order.
    pub styles: Vec<StyleLogEntry>,
}

impl OutcomeSink for MemorySink {
    fn record_layer(&mut self, entry: &LayerLogEntry) -> Result<(), RecordOutcomeError> {
        self.layers.push(entry.clone());
        Ok(())
    }

    fn record_style(&mut self, entry: &StyleLogEntry) -> Result<(), RecordOutcomeError> {
        self.styles.push(entry.clone());
        Ok(())
    }
}
