//! Convergence operations against a remote map-serving catalog.
//!
//! Every operation checks the current remote state and acts only when that
//! state differs from the requested one. Implementations report what they
//! actually did so callers can log it.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// What an `ensure_*` operation did to converge a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// The resource was absent and has been created.
    Created,
    /// The resource existed and was replaced or patched.
    Replaced,
    /// The resource existed and updates were not allowed.
    Skipped,
}

/// Result of [`Catalog::ensure_workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOutcome {
    /// The workspace was created by this call.
    Created,
    /// The catalog already held a workspace with this name.
    AlreadyExisted,
}

/// Result of [`Catalog::rename_published_layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The feature type now carries the target name.
    Renamed,
    /// Source and target names were equal.
    Unchanged,
    /// No feature type with the source name exists.
    NotFound,
}

/// Whether [`Catalog::upload_style`] created or overwrote the style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleAction {
    /// A new style entry was registered and its body uploaded.
    Created,
    /// The body of an existing style was replaced.
    Updated,
}

/// Outcome of uploading a style and assigning it to a layer.
///
/// Assignment runs after the style body is stored and is not rolled back on
/// failure, so its result is reported separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleReport {
    /// Whether the style was created or updated.
    pub action: StyleAction,
    /// `None` when the style became the layer's default, otherwise the reason
    /// assignment failed.
    pub assignment_failure: Option<String>,
}

impl StyleReport {
    /// Whether the style was assigned to the layer.
    #[must_use]
    pub const fn assigned(&self) -> bool {
        self.assignment_failure.is_none()
    }
}

/// Connection settings applied to cascaded WMS stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmsStoreOptions {
    /// Maximum number of pooled connections to the upstream service.
    pub max_connections: u32,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u32,
    /// Read timeout in seconds.
    pub read_timeout_secs: u32,
    /// Whether the catalog pools upstream connections.
    pub use_connection_pooling: bool,
    /// Optional upstream user name.
    pub username: Option<String>,
    /// Optional upstream password.
    pub password: Option<String>,
}

impl Default for WmsStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 6,
            connect_timeout_secs: 30,
            read_timeout_secs: 60,
            use_connection_pooling: true,
            username: None,
            password: None,
        }
    }
}

/// Errors raised by catalog operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// The catalog rejected the configured credentials.
    #[error("catalog rejected credentials during {operation} ({url})")]
    Unauthorized {
        /// Operation being attempted.
        operation: &'static str,
        /// Request URL or path.
        url: String,
    },
    /// The catalog answered with an unexpected status.
    #[error("{operation} failed: {url} returned status {status}: {message}")]
    Store {
        /// Operation being attempted.
        operation: &'static str,
        /// Request URL or path.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body or short description.
        message: String,
    },
    /// A deleted datastore was still reported present after every poll.
    #[error(
        "datastore {datastore} in workspace {workspace} still present after {attempts} deletion checks"
    )]
    DeletionTimeout {
        /// Workspace owning the datastore.
        workspace: String,
        /// Datastore awaiting deletion.
        datastore: String,
        /// Number of existence checks performed.
        attempts: u32,
    },
    /// A local document failed validation before any request was sent.
    #[error("style document {path} is invalid: {reason}")]
    Validation {
        /// Offending document.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        reason: String,
    },
    /// A local bundle could not be read.
    #[error("failed to read {path}: {source}")]
    ReadBundle {
        /// Bundle location.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The request never produced a response.
    #[error("transport error contacting {url}: {message}")]
    Transport {
        /// Request URL or path.
        url: String,
        /// Transport diagnostic.
        message: String,
    },
    /// A response body could not be decoded.
    #[error("failed to decode {what} from {url}: {message}")]
    Decode {
        /// Description of the expected document.
        what: &'static str,
        /// Request URL or path.
        url: String,
        /// Decoder diagnostic.
        message: String,
    },
}

impl CatalogError {
    /// Whether the error means the credentials are unusable.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Idempotent operations over the catalog resource hierarchy
/// (workspace, datastore, layer, style).
///
/// Every `ensure_*` operation follows the same state machine: an absent
/// resource is created; a present resource is skipped when `update_allowed`
/// is false and replaced or patched when it is true.
pub trait Catalog {
    /// Whether a workspace named `workspace` exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unauthorized`] for rejected credentials and
    /// [`CatalogError::Store`] for any status other than found or not found.
    fn workspace_exists(&self, workspace: &str) -> Result<bool, CatalogError>;

    /// Create `workspace` unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] when creation fails for a reason other
    /// than the workspace already existing.
    fn ensure_workspace(&self, workspace: &str) -> Result<WorkspaceOutcome, CatalogError>;

    /// Converge a shapefile datastore onto the zipped `bundle`.
    ///
    /// Replacing an existing datastore deletes it recursively, waits until the
    /// catalog no longer reports it, then uploads the bundle afresh.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DeletionTimeout`] when the deleted datastore
    /// never disappears, and [`CatalogError::Store`] for rejected requests.
    fn ensure_vector_datastore(
        &self,
        workspace: &str,
        datastore: &str,
        bundle: &Utf8Path,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError>;

    /// Rename the feature type published from `source_name` to `target_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] when the lookup or rename is rejected.
    fn rename_published_layer(
        &self,
        workspace: &str,
        datastore: &str,
        source_name: &str,
        target_name: &str,
    ) -> Result<RenameOutcome, CatalogError>;

    /// Converge a cascaded WMS store pointing at `capabilities_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] for unexpected statuses and failed
    /// creates or updates.
    fn ensure_wms_datastore(
        &self,
        workspace: &str,
        datastore: &str,
        capabilities_url: &str,
        options: &WmsStoreOptions,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError>;

    /// Converge a cascaded WMS layer published as `target_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Store`] when the layer cannot be created.
    fn ensure_wms_layer(
        &self,
        workspace: &str,
        datastore: &str,
        source_name: &str,
        target_name: &str,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError>;

    /// Create or update a style from the SLD at `style_bundle` and make it the
    /// default style of `workspace:layer_name`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] before any request when the
    /// document is not well-formed XML, and [`CatalogError::Store`] when the
    /// style cannot be registered or its body uploaded.
    fn upload_style(
        &self,
        workspace: &str,
        layer_name: &str,
        style_name: &str,
        style_bundle: &Utf8Path,
    ) -> Result<StyleReport, CatalogError>;
}
