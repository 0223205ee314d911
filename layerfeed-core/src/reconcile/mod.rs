//! Reconciliation of manifest regions against the catalog.
//!
//! The [`Reconciler`] walks each region in order: it derives the workspace
//! name, decides once whether existing resources may be updated, ensures the
//! workspace exists and then converges every declared layer. Each layer's
//! outcome is written to the [`OutcomeSink`] before the next layer starts.
//!
//! Layer failures are recorded and skipped. A workspace failure abandons the
//! region. Rejected credentials abandon the run, because every region shares
//! them.

mod error;
mod report;
mod styles;


use std::collections::{BTreeSet, HashMap};

use camino::Utf8PathBuf;
use log::{debug, info, warn};

use crate::catalog::{Catalog, CatalogError, StoreAction, WmsStoreOptions, WorkspaceOutcome};
use crate::model::{LayerDeclaration, LinkType, RegionManifest};
use crate::naming::{
    DEFAULT_WORKSPACE_SUFFIX, sanitise_name, vector_datastore_name, wms_datastore_name,
    workspace_name,
};
use crate::normalise::Normaliser;
use crate::outcome::{LayerLogEntry, OutcomeSink};
use crate::source::{FeatureRequest, FeatureSource};

pub use error::{LayerError, ReconcileError, RegionError, RunError};
pub use report::{RegionReport, RunReport, StyleRunReport};
pub use styles::apply_styles;

/// Run-wide settings for [`Reconciler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Root directory receiving one subdirectory per region.
    pub output_dir: Utf8PathBuf,
    /// Suffix appended to region names to form workspace names.
    pub workspace_suffix: String,
    /// Connection settings for newly created or patched WMS stores.
    pub wms_options: WmsStoreOptions,
    /// Regions to process; `None` processes every region.
    pub regions: Option<BTreeSet<String>>,
}

impl ReconcileSettings {
    /// Settings writing beneath `output_dir` with default naming.
    #[must_use]
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            workspace_suffix: DEFAULT_WORKSPACE_SUFFIX.to_owned(),
            wms_options: WmsStoreOptions::default(),
            regions: None,
        }
    }

    /// Override the workspace suffix.
    #[must_use]
    pub fn with_workspace_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.workspace_suffix = suffix.into();
        self
    }

    /// Override the WMS store options.
    #[must_use]
    pub fn with_wms_options(mut self, options: WmsStoreOptions) -> Self {
        self.wms_options = options;
        self
    }

    /// Restrict the run to the named regions.
    #[must_use]
    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `region` is selected for processing.
    #[must_use]
    pub fn includes(&self, region: &str) -> bool {
        self.regions
            .as_ref()
            .is_none_or(|selected| selected.contains(region))
    }
}

/// Per-region state shared by every layer of that region.
struct RegionContext<'r> {
    region: &'r str,
    workspace: String,
    update_allowed: bool,
    workspace_created: bool,
    wms_stores: HashMap<String, String>,
}

/// Drives the catalog towards the state declared in a manifest.
///
/// The reconciler borrows its collaborators, so the same catalog client and
/// fetcher can serve several runs. Trait objects are accepted for each of
/// them.
pub struct Reconciler<'a, C: ?Sized, S: ?Sized, N: ?Sized> {
    catalog: &'a C,
    source: &'a S,
    normaliser: &'a N,
    settings: &'a ReconcileSettings,
}

impl<'a, C, S, N> Reconciler<'a, C, S, N>
where
    C: Catalog + ?Sized,
    S: FeatureSource + ?Sized,
    N: Normaliser + ?Sized,
{
    /// Assemble a reconciler from its collaborators.
    #[must_use]
    pub const fn new(
        catalog: &'a C,
        source: &'a S,
        normaliser: &'a N,
        settings: &'a ReconcileSettings,
    ) -> Self {
        Self {
            catalog,
            source,
            normaliser,
            settings,
        }
    }

    /// Reconcile every selected region in manifest order.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Unauthorized`] as soon as the catalog rejects the
    /// credentials, and [`RunError::Sink`] when a log entry cannot be
    /// written. Entries recorded before the failure remain in the sink.
    pub fn reconcile_manifest(
        &self,
        regions: &[RegionManifest],
        sink: &mut dyn OutcomeSink,
    ) -> Result<RunReport, RunError> {
        let mut report = RunReport::default();
        for region in regions {
            if !self.settings.includes(&region.region) {
                debug!("skipping region {} (not selected)", region.region);
                continue;
            }
            report.regions.push(self.reconcile_region(region, sink)?);
        }
        Ok(report)
    }

    /// Reconcile one region.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] under the same conditions as
    /// [`Reconciler::reconcile_manifest`]. Other region-level failures are
    /// reported through [`RegionReport::abort`].
    pub fn reconcile_region(
        &self,
        region: &RegionManifest,
        sink: &mut dyn OutcomeSink,
    ) -> Result<RegionReport, RunError> {
        let workspace = workspace_name(&region.region, &self.settings.workspace_suffix);
        info!("reconciling region {} into workspace {workspace}", region.region);
        let mut report = RegionReport::new(&region.region, &workspace);

        let mut context = match self.prepare_workspace(&region.region, workspace) {
            Ok(context) => context,
            Err(RegionError::Unauthorized { source }) => {
                return Err(RunError::Unauthorized {
                    context: region.region.clone(),
                    source,
                });
            }
            Err(error) => {
                warn!("abandoning region {}: {error}", region.region);
                report.abort = Some(error);
                return Ok(report);
            }
        };
        report.update_allowed = context.update_allowed;
        report.workspace_created = context.workspace_created;

        for layer in &region.layers {
            let mut entry =
                LayerLogEntry::start(&region.region, layer, context.workspace_created);
            let outcome = self.process_layer(&mut context, layer, &mut entry);
            let fatal = match outcome {
                Ok(()) => {
                    report.layers_succeeded += 1;
                    None
                }
                Err(ReconcileError::Recoverable(error)) => {
                    warn!("layer {} in {} failed: {error}", layer.layer_name, region.region);
                    entry.fail(&error);
                    report.layers_failed += 1;
                    None
                }
                Err(ReconcileError::Fatal(error)) => {
                    entry.fail(&error);
                    report.layers_failed += 1;
                    Some(error)
                }
            };
            sink.record_layer(&entry)?;

            match fatal {
                None => {}
                Some(RegionError::Unauthorized { source }) => {
                    return Err(RunError::Unauthorized {
                        context: region.region.clone(),
                        source,
                    });
                }
                Some(error) => {
                    warn!("abandoning region {}: {error}", region.region);
                    report.abort = Some(error);
                    return Ok(report);
                }
            }
        }
        Ok(report)
    }

    fn prepare_workspace<'r>(
        &self,
        region: &'r str,
        workspace: String,
    ) -> Result<RegionContext<'r>, RegionError> {
        let classify = |source: CatalogError, workspace: &str| {
            if source.is_unauthorized() {
                RegionError::Unauthorized { source }
            } else {
                RegionError::Workspace {
                    workspace: workspace.to_owned(),
                    source,
                }
            }
        };

        let existed = self
            .catalog
            .workspace_exists(&workspace)
            .map_err(|source| classify(source, &workspace))?;
        let workspace_created = if existed {
            false
        } else {
            let outcome = self
                .catalog
                .ensure_workspace(&workspace)
                .map_err(|source| classify(source, &workspace))?;
            outcome == WorkspaceOutcome::Created
        };
        debug!("workspace {workspace}: existed={existed} created={workspace_created}");

        Ok(RegionContext {
            region,
            workspace,
            update_allowed: existed,
            workspace_created,
            wms_stores: HashMap::new(),
        })
    }

    fn process_layer(
        &self,
        context: &mut RegionContext<'_>,
        layer: &LayerDeclaration,
        entry: &mut LayerLogEntry,
    ) -> Result<(), ReconcileError> {
        match &layer.link_type {
            LinkType::Wfs => self.publish_vector_layer(context, layer, entry),
            LinkType::Wms => self.publish_map_layer(context, layer, entry),
            LinkType::Other(kind) => Err(LayerError::UnsupportedLinkType {
                link_type: kind.clone(),
            }
            .into()),
        }
    }

    fn publish_vector_layer(
        &self,
        context: &RegionContext<'_>,
        layer: &LayerDeclaration,
        entry: &mut LayerLogEntry,
    ) -> Result<(), ReconcileError> {
        let request = FeatureRequest {
            link: &layer.link,
            search_name: &layer.search_name,
            output_format: &layer.output_format,
            version: &layer.version,
        };
        let payload = self.source.fetch_features(&request)?;
        entry.layer_stream_fetched = true;

        let stem = sanitise_name(&layer.search_name);
        let layer_dir = self
            .settings
            .output_dir
            .join(sanitise_name(context.region))
            .join(&stem);
        let bundle = self.normaliser.normalise(&payload, &layer_dir, &stem)?;
        entry.layer_processed = true;

        let datastore = vector_datastore_name(&layer.search_name);
        let action = self.catalog.ensure_vector_datastore(
            &context.workspace,
            &datastore,
            &bundle,
            context.update_allowed,
        )?;
        entry.record_vector_store(action);
        info!("datastore {}:{datastore} {action:?}", context.workspace);

        self.catalog.rename_published_layer(
            &context.workspace,
            &datastore,
            &stem,
            &layer.standard_layer_name,
        )?;

        entry.succeed(match action {
            StoreAction::Created => format!("published {}", layer.standard_layer_name),
            StoreAction::Replaced => format!("republished {}", layer.standard_layer_name),
            StoreAction::Skipped => format!("{} already published", layer.standard_layer_name),
        });
        Ok(())
    }

    fn publish_map_layer(
        &self,
        context: &mut RegionContext<'_>,
        layer: &LayerDeclaration,
        entry: &mut LayerLogEntry,
    ) -> Result<(), ReconcileError> {
        let datastore = if let Some(existing) = context.wms_stores.get(&layer.link) {
            debug!("reusing WMS store {existing} for {}", layer.link);
            existing.clone()
        } else {
            if let Err(error) = self.source.probe_map_service(&layer.link, &layer.version) {
                warn!("map service {} did not answer capabilities: {error}", layer.link);
            }
            let name = wms_datastore_name(context.region, &layer.link);
            let action = self.catalog.ensure_wms_datastore(
                &context.workspace,
                &name,
                &layer.link,
                &self.settings.wms_options,
                context.update_allowed,
            )?;
            entry.record_wms_store(action);
            info!("WMS store {}:{name} {action:?}", context.workspace);
            context.wms_stores.insert(layer.link.clone(), name.clone());
            name
        };

        let action = self.catalog.ensure_wms_layer(
            &context.workspace,
            &datastore,
            &layer.search_name,
            &layer.standard_layer_name,
            context.update_allowed,
        )?;
        entry.record_wms_layer(action);
        info!(
            "WMS layer {}:{} {action:?}",
            context.workspace, layer.standard_layer_name
        );

        entry.succeed(format!(
            "WMS layer {} served from {datastore}",
            layer.standard_layer_name
        ));
        Ok(())
    }
}
