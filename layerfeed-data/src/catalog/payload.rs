//! XML documents sent to the catalog.
//!
//! Documents are small and fixed in shape, so they are assembled as text with
//! every interpolated value escaped.

use layerfeed_core::WmsStoreOptions;
use quick_xml::escape::escape;

/// `Content-Type` for XML documents.
pub(crate) const XML: &str = "text/xml";
/// `Content-Type` for zipped shapefile uploads.
pub(crate) const ZIP: &str = "application/zip";
/// `Content-Type` for SLD bodies.
pub(crate) const SLD: &str = "application/vnd.ogc.sld+xml";

pub(crate) fn workspace(name: &str) -> String {
    format!("<workspace><name>{}</name></workspace>", escape(name))
}

pub(crate) fn feature_type_rename(name: &str) -> String {
    format!("<featureType><name>{}</name></featureType>", escape(name))
}

pub(crate) fn wms_store(
    workspace: &str,
    name: &str,
    capabilities_url: &str,
    options: &WmsStoreOptions,
) -> String {
    let mut document = String::from("<wmsStore>");
    document.push_str(&format!("<name>{}</name>", escape(name)));
    document.push_str("<type>WMS</type><enabled>true</enabled>");
    document.push_str(&format!(
        "<workspace><name>{}</name></workspace>",
        escape(workspace)
    ));
    document.push_str(&format!(
        "<capabilitiesURL>{}</capabilitiesURL>",
        escape(capabilities_url)
    ));
    if let Some(username) = &options.username {
        document.push_str(&format!("<user>{}</user>", escape(username.as_str())));
    }
    if let Some(password) = &options.password {
        document.push_str(&format!("<password>{}</password>", escape(password.as_str())));
    }
    document.push_str(&format!(
        "<maxConnections>{}</maxConnections><connectTimeout>{}</connectTimeout>\
         <readTimeout>{}</readTimeout><useConnectionPooling>{}</useConnectionPooling>",
        options.max_connections,
        options.connect_timeout_secs,
        options.read_timeout_secs,
        options.use_connection_pooling
    ));
    document.push_str("</wmsStore>");
    document
}

pub(crate) fn wms_layer(name: &str, native_name: &str) -> String {
    format!(
        "<wmsLayer><name>{}</name><nativeName>{}</nativeName></wmsLayer>",
        escape(name),
        escape(native_name)
    )
}

pub(crate) fn style_entry(name: &str) -> String {
    format!(
        "<style><name>{0}</name><filename>{0}.sld</filename></style>",
        escape(name)
    )
}

pub(crate) fn style_assignment(workspace: &str, style: &str) -> String {
    let style_name = escape(style);
    let owner = escape(workspace);
    format!(
        "<layer><defaultStyle><name>{style_name}</name><workspace>{owner}</workspace></defaultStyle>\
         <styles><style><name>{style_name}</name><workspace>{owner}</workspace></style></styles></layer>"
    )
}
