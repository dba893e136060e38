//! OGC service exception documents.

use quick_xml::escape::escape;

/// Render a WMS `ServiceExceptionReport` with a single exception.
pub fn service_exception_xml(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><ServiceExceptionReport><ServiceException code="{}">{}</ServiceException></ServiceExceptionReport>"#,
        escape(code),
        escape(message)
    )
}
