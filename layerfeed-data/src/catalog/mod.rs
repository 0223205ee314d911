//! GeoServer REST implementation of the [`Catalog`] trait.
//!
//! [`CatalogClient`] turns each convergence operation into a short sequence of
//! REST calls: look the resource up, then create, replace or leave it. The
//! wire is abstracted behind [`CatalogTransport`], so the same client runs
//! against [`HttpCatalogTransport`] in production and an in-memory server in
//! tests.
//!
//! # Example
//!
//! ```no_run
//! use layerfeed_core::Catalog;
//! use layerfeed_data::catalog::{CatalogClient, CatalogSettings};
//!
//! let settings = CatalogSettings::new("http://localhost:8080/geoserver/rest", "admin", "geoserver");
//! let client = CatalogClient::connect(&settings)?;
//! client.ensure_workspace("Yukon_v2")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod payload;
mod settings;
mod styles;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

use std::thread;

use camino::Utf8Path;
use layerfeed_core::{
    Catalog, CatalogError, RenameOutcome, StoreAction, StyleAction, StyleReport, WmsStoreOptions,
    WorkspaceOutcome,
};
use log::{debug, info, warn};

pub use settings::{CatalogSettings, DEFAULT_USER_AGENT, DeletionPolicy};
pub use transport::{
    CatalogRequest, CatalogResponse, CatalogTransport, HttpCatalogTransport, Method, RequestBody,
    TransportBuildError, TransportError,
};

const UNAUTHORIZED: u16 = 401;
const NOT_FOUND: u16 = 404;
const CONFLICT: u16 = 409;

/// Catalog client issuing REST calls through a [`CatalogTransport`].
#[derive(Debug)]
pub struct CatalogClient<T> {
    transport: T,
    deletion: DeletionPolicy,
}

impl CatalogClient<HttpCatalogTransport> {
    /// Build an HTTP-backed client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be built.
    pub fn connect(settings: &CatalogSettings) -> Result<Self, TransportBuildError> {
        Ok(Self::new(HttpCatalogTransport::new(settings)?).with_deletion_policy(settings.deletion))
    }
}

impl<T: CatalogTransport> CatalogClient<T> {
    /// Wrap `transport` with the default deletion policy.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            deletion: DeletionPolicy::default(),
        }
    }

    /// Override the poll budget used after recursive deletion.
    #[must_use]
    pub fn with_deletion_policy(mut self, deletion: DeletionPolicy) -> Self {
        self.deletion = deletion;
        self
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    fn send(
        &self,
        request: &CatalogRequest,
        operation: &'static str,
    ) -> Result<CatalogResponse, CatalogError> {
        debug!("{} {}", request.method, request.path);
        let response =
            self.transport
                .send(request)
                .map_err(|err| CatalogError::Transport {
                    url: request.path.clone(),
                    message: err.to_string(),
                })?;
        debug!("{} {} -> {}", request.method, request.path, response.status);
        if response.status == UNAUTHORIZED {
            return Err(CatalogError::Unauthorized {
                operation,
                url: request.path.clone(),
            });
        }
        Ok(response)
    }

    /// Send `request` and require a 2xx answer.
    fn expect_success(
        &self,
        request: &CatalogRequest,
        operation: &'static str,
    ) -> Result<CatalogResponse, CatalogError> {
        let response = self.send(request, operation)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(store_error(request, operation, &response))
        }
    }

    /// `GET path`: 200 means present, 404 absent, anything else fails.
    fn exists(&self, path: String, operation: &'static str) -> Result<bool, CatalogError> {
        let request = CatalogRequest::get(path);
        let response = self.send(&request, operation)?;
        match response.status {
            NOT_FOUND => Ok(false),
            _ if response.is_success() => Ok(true),
            _ => Err(store_error(&request, operation, &response)),
        }
    }

    fn datastore_path(workspace: &str, datastore: &str) -> String {
        format!("workspaces/{workspace}/datastores/{datastore}")
    }

    fn delete_datastore(&self, workspace: &str, datastore: &str) -> Result<(), CatalogError> {
        let path = format!("{}?recurse=true", Self::datastore_path(workspace, datastore));
        self.expect_success(&CatalogRequest::delete(path), "datastore deletion")?;
        self.await_datastore_removal(workspace, datastore)
    }

    /// Poll until the catalog stops reporting the datastore.
    ///
    /// At least one check runs whatever the policy says, so a completed
    /// deletion is never mistaken for a timeout.
    fn await_datastore_removal(&self, workspace: &str, datastore: &str) -> Result<(), CatalogError> {
        let attempts = self.deletion.max_attempts.max(1);
        for attempt in 1..=attempts {
            if !self.deletion.interval.is_zero() {
                thread::sleep(self.deletion.interval);
            }
            if !self.exists(
                Self::datastore_path(workspace, datastore),
                "datastore deletion check",
            )? {
                debug!("datastore {workspace}:{datastore} gone after {attempt} check(s)");
                return Ok(());
            }
        }
        Err(CatalogError::DeletionTimeout {
            workspace: workspace.to_owned(),
            datastore: datastore.to_owned(),
            attempts,
        })
    }

    fn upload_shapefile(
        &self,
        workspace: &str,
        datastore: &str,
        bundle: &Utf8Path,
    ) -> Result<(), CatalogError> {
        let bytes = layerfeed_fs::read_file(bundle).map_err(|source| CatalogError::ReadBundle {
            path: bundle.to_owned(),
            source,
        })?;
        let path = format!("{}/file.shp", Self::datastore_path(workspace, datastore));
        self.expect_success(
            &CatalogRequest::put(path, payload::ZIP, bytes),
            "shapefile upload",
        )?;
        Ok(())
    }

    /// Delete a resource, logging rather than propagating ordinary failures.
    fn delete_quietly(&self, path: String, operation: &'static str) -> Result<(), CatalogError> {
        match self.expect_success(&CatalogRequest::delete(path), operation) {
            Ok(_) => Ok(()),
            Err(err) if err.is_unauthorized() => Err(err),
            Err(err) => {
                warn!("{operation} failed, continuing: {err}");
                Ok(())
            }
        }
    }

    fn style_exists(&self, workspace: &str, style: &str) -> Result<bool, CatalogError> {
        let request = CatalogRequest::get(format!("workspaces/{workspace}/styles.json"));
        let response = self.expect_success(&request, "style listing")?;
        let names = styles::style_names(&response.body).map_err(|err| CatalogError::Decode {
            what: "style listing",
            url: request.path.clone(),
            message: err.to_string(),
        })?;
        Ok(names.iter().any(|name| name == style))
    }

    fn put_style_body(
        &self,
        workspace: &str,
        style: &str,
        body: Vec<u8>,
    ) -> Result<(), CatalogError> {
        let path = format!("workspaces/{workspace}/styles/{style}");
        self.expect_success(&CatalogRequest::put(path, payload::SLD, body), "style upload")?;
        Ok(())
    }
}

fn store_error(
    request: &CatalogRequest,
    operation: &'static str,
    response: &CatalogResponse,
) -> CatalogError {
    CatalogError::Store {
        operation,
        url: format!("{} {}", request.method, request.path),
        status: response.status,
        message: response.body.trim().to_owned(),
    }
}

impl<T: CatalogTransport> Catalog for CatalogClient<T> {
    fn workspace_exists(&self, workspace: &str) -> Result<bool, CatalogError> {
        self.exists(format!("workspaces/{workspace}"), "workspace lookup")
    }

    fn ensure_workspace(&self, workspace: &str) -> Result<WorkspaceOutcome, CatalogError> {
        let request = CatalogRequest::post(
            "workspaces",
            payload::XML,
            payload::workspace(workspace).into_bytes(),
        );
        let response = self.send(&request, "workspace creation")?;
        match response.status {
            CONFLICT => {
                debug!("workspace {workspace} already exists");
                Ok(WorkspaceOutcome::AlreadyExisted)
            }
            _ if response.is_success() => {
                info!("created workspace {workspace}");
                Ok(WorkspaceOutcome::Created)
            }
            _ => Err(store_error(&request, "workspace creation", &response)),
        }
    }

    fn ensure_vector_datastore(
        &self,
        workspace: &str,
        datastore: &str,
        bundle: &Utf8Path,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError> {
        let present = self.exists(
            Self::datastore_path(workspace, datastore),
            "datastore lookup",
        )?;
        match (present, update_allowed) {
            (true, false) => {
                info!("datastore {workspace}:{datastore} exists; updates disabled, skipping");
                Ok(StoreAction::Skipped)
            }
            (true, true) => {
                info!("replacing datastore {workspace}:{datastore}");
                self.delete_datastore(workspace, datastore)?;
                self.upload_shapefile(workspace, datastore, bundle)?;
                Ok(StoreAction::Replaced)
            }
            (false, _) => {
                info!("creating datastore {workspace}:{datastore}");
                self.upload_shapefile(workspace, datastore, bundle)?;
                Ok(StoreAction::Created)
            }
        }
    }

    fn rename_published_layer(
        &self,
        workspace: &str,
        datastore: &str,
        source_name: &str,
        target_name: &str,
    ) -> Result<RenameOutcome, CatalogError> {
        if source_name == target_name {
            return Ok(RenameOutcome::Unchanged);
        }
        let path = format!(
            "{}/featuretypes/{source_name}",
            Self::datastore_path(workspace, datastore)
        );
        if !self.exists(path.clone(), "feature type lookup")? {
            debug!("feature type {source_name} not found in {workspace}:{datastore}");
            return Ok(RenameOutcome::NotFound);
        }
        self.expect_success(
            &CatalogRequest::put(
                path,
                payload::XML,
                payload::feature_type_rename(target_name).into_bytes(),
            ),
            "feature type rename",
        )?;
        info!("renamed {workspace}:{source_name} to {target_name}");
        Ok(RenameOutcome::Renamed)
    }

    fn ensure_wms_datastore(
        &self,
        workspace: &str,
        datastore: &str,
        capabilities_url: &str,
        options: &WmsStoreOptions,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError> {
        let store_path = format!("workspaces/{workspace}/wmsstores/{datastore}");
        let present = self.exists(store_path.clone(), "WMS store lookup")?;
        let document = payload::wms_store(workspace, datastore, capabilities_url, options);
        match (present, update_allowed) {
            (true, false) => {
                info!("WMS store {workspace}:{datastore} exists; updates disabled, skipping");
                Ok(StoreAction::Skipped)
            }
            (true, true) => {
                self.expect_success(
                    &CatalogRequest::put(store_path, payload::XML, document.into_bytes()),
                    "WMS store update",
                )?;
                info!("updated WMS store {workspace}:{datastore}");
                Ok(StoreAction::Replaced)
            }
            (false, _) => {
                self.expect_success(
                    &CatalogRequest::post(
                        format!("workspaces/{workspace}/wmsstores"),
                        payload::XML,
                        document.into_bytes(),
                    ),
                    "WMS store creation",
                )?;
                info!("created WMS store {workspace}:{datastore}");
                Ok(StoreAction::Created)
            }
        }
    }

    fn ensure_wms_layer(
        &self,
        workspace: &str,
        datastore: &str,
        source_name: &str,
        target_name: &str,
        update_allowed: bool,
    ) -> Result<StoreAction, CatalogError> {
        let layers_path = format!("workspaces/{workspace}/wmsstores/{datastore}/wmslayers");
        let layer_path = format!("{layers_path}/{target_name}");
        let present = self.exists(layer_path.clone(), "WMS layer lookup")?;
        let action = match (present, update_allowed) {
            (true, false) => {
                info!("WMS layer {workspace}:{target_name} exists; updates disabled, skipping");
                return Ok(StoreAction::Skipped);
            }
            (true, true) => {
                self.delete_quietly(
                    format!("layers/{workspace}:{target_name}"),
                    "published layer deletion",
                )?;
                self.delete_quietly(layer_path, "WMS layer deletion")?;
                StoreAction::Replaced
            }
            (false, _) => StoreAction::Created,
        };
        self.expect_success(
            &CatalogRequest::post(
                layers_path,
                payload::XML,
                payload::wms_layer(target_name, source_name).into_bytes(),
            ),
            "WMS layer creation",
        )?;
        info!("published WMS layer {workspace}:{target_name} from {source_name}");
        Ok(action)
    }

    fn upload_style(
        &self,
        workspace: &str,
        layer_name: &str,
        style_name: &str,
        style_bundle: &Utf8Path,
    ) -> Result<StyleReport, CatalogError> {
        let body = styles::read_style_document(style_bundle)?;

        let action = if self.style_exists(workspace, style_name)? {
            self.put_style_body(workspace, style_name, body)?;
            StyleAction::Updated
        } else {
            self.expect_success(
                &CatalogRequest::post(
                    format!("workspaces/{workspace}/styles"),
                    payload::XML,
                    payload::style_entry(style_name).into_bytes(),
                ),
                "style registration",
            )?;
            self.put_style_body(workspace, style_name, body)?;
            StyleAction::Created
        };
        info!("style {workspace}:{style_name} {action:?}");

        let assignment = self.expect_success(
            &CatalogRequest::put(
                format!("layers/{workspace}:{layer_name}"),
                payload::XML,
                payload::style_assignment(workspace, style_name).into_bytes(),
            ),
            "style assignment",
        );
        let assignment_failure = match assignment {
            Ok(_) => None,
            Err(err) if err.is_unauthorized() => return Err(err),
            Err(err) => {
                warn!("style {style_name} stored but not assigned to {layer_name}: {err}");
                Some(err.to_string())
            }
        };
        Ok(StyleReport {
            action,
            assignment_failure,
        })
    }
}
