//! In-memory catalog server for exercising [`CatalogClient`](super::CatalogClient).
//!
//! [`FakeCatalogServer`] answers the subset of the GeoServer REST API the
//! client uses, keeps the resulting catalog state, and records every request
//! so tests can assert exactly which calls were made.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Cursor;

use quick_xml::escape::unescape;

use super::transport::{CatalogRequest, CatalogResponse, CatalogTransport, Method, TransportError};

#[derive(Debug, Default)]
struct ServerState {
    workspaces: BTreeSet<String>,
    datastores: BTreeMap<(String, String), BTreeSet<String>>,
    pending_deletions: BTreeMap<(String, String), u32>,
    wms_stores: BTreeMap<(String, String), String>,
    wms_layers: BTreeSet<(String, String, String)>,
    published: BTreeSet<(String, String)>,
    styles: BTreeMap<(String, String), String>,
    default_styles: BTreeMap<(String, String), String>,
}

/// In-memory GeoServer REST simulation implementing [`CatalogTransport`].
#[derive(Debug, Default)]
pub struct FakeCatalogServer {
    state: RefCell<ServerState>,
    requests: RefCell<Vec<CatalogRequest>>,
    reject_credentials: bool,
    deletion_lag: u32,
    unreachable_capabilities: HashSet<String>,
    failures: Vec<(Method, String, u16)>,
}

impl FakeCatalogServer {
    /// Seed an existing workspace.
    #[must_use]
    pub fn with_workspace(self, workspace: &str) -> Self {
        self.state.borrow_mut().workspaces.insert(workspace.to_owned());
        self
    }

    /// Seed a shapefile datastore publishing `feature_type`.
    #[must_use]
    pub fn with_datastore(self, workspace: &str, datastore: &str, feature_type: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.workspaces.insert(workspace.to_owned());
            state
                .datastores
                .entry((workspace.to_owned(), datastore.to_owned()))
                .or_default()
                .insert(feature_type.to_owned());
            state
                .published
                .insert((workspace.to_owned(), feature_type.to_owned()));
        }
        self
    }

    /// Seed a WMS store pointing at `capabilities_url`.
    #[must_use]
    pub fn with_wms_store(self, workspace: &str, datastore: &str, capabilities_url: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.workspaces.insert(workspace.to_owned());
            state.wms_stores.insert(
                (workspace.to_owned(), datastore.to_owned()),
                capabilities_url.to_owned(),
            );
        }
        self
    }

    /// Seed a WMS layer in an existing store.
    #[must_use]
    pub fn with_wms_layer(self, workspace: &str, datastore: &str, layer: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.wms_layers.insert((
                workspace.to_owned(),
                datastore.to_owned(),
                layer.to_owned(),
            ));
            state
                .published
                .insert((workspace.to_owned(), layer.to_owned()));
        }
        self
    }

    /// Seed a style with `body`.
    #[must_use]
    pub fn with_style(self, workspace: &str, style: &str, body: &str) -> Self {
        self.state
            .borrow_mut()
            .styles
            .insert((workspace.to_owned(), style.to_owned()), body.to_owned());
        self
    }

    /// Answer every request with 401.
    #[must_use]
    pub const fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    /// Keep reporting a deleted datastore for `checks` further lookups.
    #[must_use]
    pub const fn with_deletion_lag(mut self, checks: u32) -> Self {
        self.deletion_lag = checks;
        self
    }

    /// Fail WMS store creation or update for stores pointing at `url`.
    #[must_use]
    pub fn with_unreachable_capabilities(mut self, url: &str) -> Self {
        self.unreachable_capabilities.insert(url.to_owned());
        self
    }

    /// Answer `method` requests whose path starts with `path_prefix` with `status`.
    #[must_use]
    pub fn failing(mut self, method: Method, path_prefix: &str, status: u16) -> Self {
        self.failures.push((method, path_prefix.to_owned(), status));
        self
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CatalogRequest> {
        self.requests.borrow().clone()
    }

    /// Number of `method` requests whose path starts with `path_prefix`.
    #[must_use]
    pub fn count(&self, method: Method, path_prefix: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.method == method && request.path.starts_with(path_prefix))
            .count()
    }

    /// Number of requests using `method`.
    #[must_use]
    pub fn count_method(&self, method: Method) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.method == method)
            .count()
    }

    /// Whether `workspace` exists.
    #[must_use]
    pub fn has_workspace(&self, workspace: &str) -> bool {
        self.state.borrow().workspaces.contains(workspace)
    }

    /// Feature types of a shapefile datastore, or `None` if it does not exist.
    #[must_use]
    pub fn feature_types(&self, workspace: &str, datastore: &str) -> Option<Vec<String>> {
        self.state
            .borrow()
            .datastores
            .get(&(workspace.to_owned(), datastore.to_owned()))
            .map(|names| names.iter().cloned().collect())
    }

    /// Capabilities URL of a WMS store.
    #[must_use]
    pub fn wms_store_url(&self, workspace: &str, datastore: &str) -> Option<String> {
        self.state
            .borrow()
            .wms_stores
            .get(&(workspace.to_owned(), datastore.to_owned()))
            .cloned()
    }

    /// Whether a WMS layer exists in the given store.
    #[must_use]
    pub fn has_wms_layer(&self, workspace: &str, datastore: &str, layer: &str) -> bool {
        self.state.borrow().wms_layers.contains(&(
            workspace.to_owned(),
            datastore.to_owned(),
            layer.to_owned(),
        ))
    }

    /// Stored body of a style.
    #[must_use]
    pub fn style_body(&self, workspace: &str, style: &str) -> Option<String> {
        self.state
            .borrow()
            .styles
            .get(&(workspace.to_owned(), style.to_owned()))
            .cloned()
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

    fn injected_failure(&self, request: &CatalogRequest) -> Option<u16> {
        self.failures
            .iter()
            .find(|(method, prefix, _)| *method == request.method && request.path.starts_with(prefix))
            .map(|(_, _, status)| *status)
    }

    fn route(&self, request: &CatalogRequest) -> CatalogResponse {
        let path = request
            .path
            .split_once('?')
            .map_or(request.path.as_str(), |(path, _)| path);
        let segments: Vec<&str> = path.split('/').collect();
        let body = request.body_text();
        let mut state = self.state.borrow_mut();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["workspaces", ws]) => found(state.workspaces.contains(*ws)),
            (Method::Post, ["workspaces"]) => match element_text(&body, "name") {
                None => respond(400, "workspace name missing"),
                Some(name) if state.workspaces.contains(&name) => {
                    respond(409, format!("Workspace '{name}' already exists"))
                }
                Some(name) => {
                    state.workspaces.insert(name.clone());
                    respond(201, name)
                }
            },
            (Method::Get, ["workspaces", ws, "datastores", ds]) => {
                let key = key(ws, ds);
                if let Some(remaining) = state.pending_deletions.get_mut(&key) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return respond(200, "");
                    }
                }
                found(state.datastores.contains_key(&key))
            }
            (Method::Delete, ["workspaces", ws, "datastores", ds]) => {
                let key = key(ws, ds);
                match state.datastores.remove(&key) {
                    None => respond(404, "No such datastore"),
                    Some(feature_types) => {
                        for name in feature_types {
                            state.published.remove(&((*ws).to_owned(), name));
                        }
                        if self.deletion_lag > 0 {
                            state.pending_deletions.insert(key, self.deletion_lag);
                        }
                        respond(200, "")
                    }
                }
            }
            (Method::Put, ["workspaces", ws, "datastores", ds, "file.shp"]) => {
                if !state.workspaces.contains(*ws) {
                    return respond(404, format!("No such workspace: {ws}"));
                }
                let Some(stem) = request.body.as_ref().and_then(|b| shapefile_stem(&b.bytes))
                else {
                    return respond(400, "upload is not a zipped shapefile");
                };
                state.pending_deletions.remove(&key(ws, ds));
                state
                    .datastores
                    .entry(key(ws, ds))
                    .or_default()
                    .insert(stem.clone());
                state.published.insert(((*ws).to_owned(), stem));
                respond(201, "")
            }
            (Method::Get, ["workspaces", ws, "datastores", ds, "featuretypes", ft]) => found(
                state
                    .datastores
                    .get(&key(ws, ds))
                    .is_some_and(|names| names.contains(*ft)),
            ),
            (Method::Put, ["workspaces", ws, "datastores", ds, "featuretypes", ft]) => {
                let Some(target) = element_text(&body, "name") else {
                    return respond(400, "feature type name missing");
                };
                let renamed = state
                    .datastores
                    .get_mut(&key(ws, ds))
                    .is_some_and(|names| names.remove(*ft) && names.insert(target.clone()));
                if !renamed {
                    return respond(404, "No such feature type");
                }
                state.published.remove(&key(ws, ft));
                state.published.insert(((*ws).to_owned(), target));
                respond(200, "")
            }
            (Method::Get, ["workspaces", ws, "wmsstores", ds]) => {
                found(state.wms_stores.contains_key(&key(ws, ds)))
            }
            (Method::Post, ["workspaces", ws, "wmsstores"]) => {
                let (Some(name), Some(url)) = (
                    element_text(&body, "name"),
                    element_text(&body, "capabilitiesURL"),
                ) else {
                    return respond(400, "incomplete wmsStore document");
                };
                if self.unreachable_capabilities.contains(&url) {
                    return respond(500, format!("Error connecting to remote WMS at {url}"));
                }
                if state.wms_stores.contains_key(&key(ws, &name)) {
                    return respond(500, format!("Store '{name}' already exists"));
                }
                state.wms_stores.insert(key(ws, &name), url);
                respond(201, name)
            }
            (Method::Put, ["workspaces", ws, "wmsstores", ds]) => {
                let Some(url) = element_text(&body, "capabilitiesURL") else {
                    return respond(400, "incomplete wmsStore document");
                };
                if self.unreachable_capabilities.contains(&url) {
                    return respond(500, format!("Error connecting to remote WMS at {url}"));
                }
                match state.wms_stores.get_mut(&key(ws, ds)) {
                    None => respond(404, "No such WMS store"),
                    Some(stored) => {
                        *stored = url;
                        respond(200, "")
                    }
                }
            }
            (Method::Get, ["workspaces", ws, "wmsstores", ds, "wmslayers", name]) => {
                found(state.wms_layers.contains(&key3(ws, ds, name)))
            }
            (Method::Delete, ["workspaces", ws, "wmsstores", ds, "wmslayers", name]) => {
                found(state.wms_layers.remove(&key3(ws, ds, name)))
            }
            (Method::Post, ["workspaces", ws, "wmsstores", ds, "wmslayers"]) => {
                if !state.wms_stores.contains_key(&key(ws, ds)) {
                    return respond(404, "No such WMS store");
                }
                let Some(name) = element_text(&body, "name") else {
                    return respond(400, "wmsLayer name missing");
                };
                if !state.wms_layers.insert(key3(ws, ds, &name)) {
                    return respond(500, format!("Resource named '{name}' already exists"));
                }
                state.published.insert(((*ws).to_owned(), name.clone()));
                respond(201, name)
            }
            (Method::Delete, ["layers", qualified]) => match qualified.split_once(':') {
                Some((ws, name)) => found(state.published.remove(&key(ws, name))),
                None => respond(404, "No such layer"),
            },
            (Method::Get, ["workspaces", ws, "styles.json"]) => {
                let names: Vec<serde_json::Value> = state
                    .styles
                    .keys()
                    .filter(|(owner, _)| owner == ws)
                    .map(|(_, name)| serde_json::json!({ "name": name }))
                    .collect();
                let listing = if names.is_empty() {
                    serde_json::json!({ "styles": "" })
                } else {
                    serde_json::json!({ "styles": { "style": names } })
                };
                respond(200, listing.to_string())
            }
            (Method::Post, ["workspaces", ws, "styles"]) => match element_text(&body, "name") {
                None => respond(400, "style name missing"),
                Some(name) if state.styles.contains_key(&key(ws, &name)) => {
                    respond(403, format!("Style {name} already exists"))
                }
                Some(name) => {
                    state.styles.insert(key(ws, &name), String::new());
                    respond(201, name)
                }
            },
            (Method::Put, ["workspaces", ws, "styles", name]) => {
                match state.styles.get_mut(&key(ws, name)) {
                    None => respond(404, "No such style"),
                    Some(stored) => {
                        *stored = body;
                        respond(200, "")
                    }
                }
            }
            (Method::Put, ["layers", qualified]) => {
                let Some((ws, name)) = qualified.split_once(':') else {
                    return respond(404, "No such layer");
                };
                if !state.published.contains(&key(ws, name)) {
                    return respond(404, format!("No such layer: {qualified}"));
                }
                let Some(style) = element_text(&body, "name") else {
                    return respond(400, "default style missing");
                };
                state.default_styles.insert(key(ws, name), style);
                respond(200, "")
            }
            _ => respond(405, format!("unsupported {} {path}", request.method)),
        }
    }
}

impl CatalogTransport for FakeCatalogServer {
    fn send(&self, request: &CatalogRequest) -> Result<CatalogResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        if self.reject_credentials {
            return Ok(respond(401, "HTTP Status 401 - Unauthorized"));
        }
        if let Some(status) = self.injected_failure(request) {
            return Ok(respond(status, "injected failure"));
        }
        Ok(self.route(request))
    }
}

fn key(first: &str, second: &str) -> (String, String) {
    (first.to_owned(), second.to_owned())
}

fn key3(first: &str, second: &str, third: &str) -> (String, String, String) {
    (first.to_owned(), second.to_owned(), third.to_owned())
}

fn respond(status: u16, body: impl Into<String>) -> CatalogResponse {
    CatalogResponse {
        status,
        body: body.into(),
    }
}

fn found(present: bool) -> CatalogResponse {
    if present {
        respond(200, "")
    } else {
        respond(404, "No such resource")
    }
}

/// Text of the first `<tag>` element in `document`, unescaped.
fn element_text(document: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let (_, rest) = document.split_once(open.as_str())?;
    let (raw, _) = rest.split_once(close.as_str())?;
    unescape(raw).ok().map(|text| text.into_owned())
}

/// Stem of the `.shp` member inside a zipped shapefile.
fn shapefile_stem(bytes: &[u8]) -> Option<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    archive
        .file_names()
        .find_map(|name| name.strip_suffix(".shp"))
        .map(|stem| stem.rsplit('/').next().unwrap_or(stem).to_owned())
}
