//! MIME type detection from filename extensions.
//!
//! Detection is a static table lookup only; content bytes are never
//! inspected. Unknown or missing extensions fall back to the generic
//! binary type.

use crate::content_address::file_extension;

/// Fallback content type for unknown extensions.
pub const GENERIC_BINARY: &str = "application/octet-stream";

/// Detect a MIME type from the filename extension.
pub fn detect_content_type(filename: &str) -> &'static str {
    let ext = match file_extension(filename) {
        Some(ext) => ext,
        None => return GENERIC_BINARY,
    };

    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "odt" => "application/vnd.oasis.opendocument.text",
        "zip" => "application/zip",
        _ => GENERIC_BINARY,
    }
}
