//! Style uploads driven by a style manifest.

use log::{info, warn};

use super::error::RunError;
use super::report::StyleRunReport;
use crate::catalog::Catalog;
use crate::model::StyleDeclaration;
use crate::outcome::{OutcomeSink, StyleLogEntry};

/// Upload each declared style and assign it to its layer.
///
/// Every declaration produces one [`StyleLogEntry`]. Validation and store
/// failures are recorded and the next declaration is processed.
///
/// # Errors
///
/// Returns [`RunError::Unauthorized`] when the catalog rejects the
/// credentials (after recording the entry for that declaration) and
/// [`RunError::Sink`] when an entry cannot be written.
pub fn apply_styles<C>(
    catalog: &C,
    styles: &[StyleDeclaration],
    sink: &mut dyn OutcomeSink,
) -> Result<StyleRunReport, RunError>
where
    C: Catalog + ?Sized,
{
    let mut report = StyleRunReport::default();
    for declaration in styles {
        let result = catalog.upload_style(
            &declaration.workspace,
            &declaration.layer,
            &declaration.style_name,
            &declaration.style_path,
        );
        match result {
            Ok(style) => {
                let entry = StyleLogEntry::from_report(declaration, &style);
                if entry.style_assigned {
                    info!(
                        "style {} assigned to {}:{}",
                        declaration.style_name, declaration.workspace, declaration.layer
                    );
                    report.succeeded += 1;
                } else {
                    warn!("style {}: {}", declaration.style_name, entry.message);
                    report.failed += 1;
                }
                sink.record_style(&entry)?;
            }
            Err(error) => {
                warn!("style {} failed: {error}", declaration.style_name);
                report.failed += 1;
                sink.record_style(&StyleLogEntry::failed(declaration, &error))?;
                if error.is_unauthorized() {
                    return Err(RunError::Unauthorized {
                        context: format!("style {}", declaration.style_name),
                        source: error,
                    });
                }
            }
        }
    }
    Ok(report)
}
