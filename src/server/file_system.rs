use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use super::content_manager::{content_type_for, ContentManager, ResolveError, Resource};

/// Serves regular files found under a canonicalized document root.
pub struct FileSystemAdapter {
    root: PathBuf
}

impl FileSystemAdapter {
    pub fn new(root: &Path) -> io::Result<FileSystemAdapter> {
        Ok(FileSystemAdapter {
            root: root.canonicalize()?
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `url` against the root, following `..` and symlinks, and only
    /// accepts the result if it is still inside the root.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, ResolveError> {
        let relative = url.trim_start_matches('/');
        let joined = self.root.join(relative);

        let target = match joined.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                debug!("Error finding file {}:{}", url, e);
                return Err(ResolveError::NotFound)
            }
        };

        // Component-wise, so `/srv/www-evil` never counts as inside `/srv/www`.
        if !target.starts_with(&self.root) {
            warn!("Rejected {}: resolves outside the document root", url);
            return Err(ResolveError::NotFound);
        }

        match fs::metadata(&target) {
            Ok(md) if md.is_file() => Ok(target),
            Ok(_) => {
                debug!("Not a regular file: {}", target.display());
                Err(ResolveError::NotFound)
            },
            Err(e) => {
                debug!("Error reading metadata for {}:{}", target.display(), e);
                Err(ResolveError::NotFound)
            }
        }
    }
}

impl ContentManager for FileSystemAdapter {
    fn find_content(&self, url: &str) -> Result<Resource, ResolveError> {
        let path = self.resolve(url)?;
        debug!("file_path={}", path.display());

        match fs::read(&path) {
            Ok(content) => Ok(Resource {
                content_type: content_type_for(&path),
                content,
                path
            }),
            Err(source) => Err(ResolveError::Read { path, source })
        }
    }
}
