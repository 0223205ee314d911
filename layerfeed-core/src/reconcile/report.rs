//! Summaries returned by reconciliation runs.

use super::error::RegionError;

/// Summary of one manifest run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One report per processed region, in manifest order.
    pub regions: Vec<RegionReport>,
}

impl RunReport {
    /// Total number of layers that failed across every region.
    #[must_use]
    pub fn layers_failed(&self) -> usize {
        self.regions.iter().map(|region| region.layers_failed).sum()
    }

    /// Total number of layers published or confirmed.
    #[must_use]
    pub fn layers_succeeded(&self) -> usize {
        self.regions.iter().map(|region| region.layers_succeeded).sum()
    }

    /// Regions abandoned before all their layers were processed.
    pub fn aborted_regions(&self) -> impl Iterator<Item = &RegionReport> {
        self.regions.iter().filter(|region| region.abort.is_some())
    }
}

/// Summary of one region.
#[derive(Debug)]
pub struct RegionReport {
    /// Region name from the manifest.
    pub region: String,
    /// Derived workspace name.
    pub workspace: String,
    /// Whether existing catalog resources could be replaced.
    pub update_allowed: bool,
    /// Whether the workspace was created during this run.
    pub workspace_created: bool,
    /// Layers that finished successfully.
    pub layers_succeeded: usize,
    /// Layers that finished with an error entry.
    pub layers_failed: usize,
    /// Error that stopped the region early, if any.
    pub abort: Option<RegionError>,
}

impl RegionReport {
    pub(super) fn new(region: &str, workspace: &str) -> Self {
        Self {
            region: region.to_owned(),
            workspace: workspace.to_owned(),
            update_allowed: false,
            workspace_created: false,
            layers_succeeded: 0,
            layers_failed: 0,
            abort: None,
        }
    }
}

/// Summary of a style run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StyleRunReport {
    /// Styles uploaded and assigned.
    pub succeeded: usize,
    /// Styles that failed validation, upload or assignment.
    pub failed: usize,
}
