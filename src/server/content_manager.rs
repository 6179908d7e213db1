use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub trait ContentManager {
    /// Looks up the content for an already decoded request path.
    fn find_content(&self, url: &str) -> Result<Resource, ResolveError>;
}

/// A file read in full for a single response.
#[derive(Debug)]
pub struct Resource {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub content_type: &'static str
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Missing, not a regular file, or outside the document root.
    #[error("not found")]
    NotFound,

    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return DEFAULT_CONTENT_TYPE
    };
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "ico" => "image/x-icon",
        _ => DEFAULT_CONTENT_TYPE
    }
}
