use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file not found: {0}")]
    MissingFile(PathBuf),
    #[error("model {name} not found (searched {searched:?}) and no download URL configured")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where to look for one model file.
#[derive(Clone, Debug, Default)]
pub struct ModelLocation<'a> {
    /// File name used inside the cache and bundled directories.
    pub name: &'a str,
    /// User-supplied path; when set, nothing else is searched.
    pub explicit_path: Option<&'a Path>,
    pub bundled_dir: Option<&'a Path>,
    pub url: Option<&'a str>,
}

/// Resolve a model file, checking local locations before downloading.
///
/// Resolution order:
/// 1. Explicit path (must exist)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from URL into the cache
pub fn resolve(
    location: &ModelLocation<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = location.explicit_path {
        return existing(path);
    }
    resolve_in(&model_cache_dir()?, location, progress)
}

fn existing(path: &Path) -> Result<PathBuf, ModelResolveError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ModelResolveError::MissingFile(path.to_path_buf()))
    }
}

/// Searches the cache and bundled directories, then downloads.
/// `explicit_path` is handled by [`resolve`].
fn resolve_in(
    cache_dir: &Path,
    location: &ModelLocation<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(location.name);
    if cached_path.is_file() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    let mut searched = vec![cached_path.clone()];
    if let Some(dir) = location.bundled_dir {
        let bundled_path = dir.join(location.name);
        if bundled_path.is_file() {
            log::debug!("Using bundled model {}", bundled_path.display());
            return Ok(bundled_path);
        }
        searched.push(bundled_path);
    }

    let Some(url) = location.url else {
        return Err(ModelResolveError::NotFound {
            name: location.name.to_string(),
            searched,
        });
    };

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {url}", location.name);
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/maskwatch/models/`
/// - Linux: `$XDG_CACHE_HOME/maskwatch/models/` or `~/.cache/maskwatch/models/`
/// - Windows: `%LOCALAPPDATA%/maskwatch/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("maskwatch").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("maskwatch").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    // Clean up .part file on any error
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|source| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn location<'a>(name: &'a str) -> ModelLocation<'a> {
        ModelLocation {
            name,
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("custom.onnx");
        fs::write(&explicit, b"model").unwrap();
        let loc = ModelLocation {
            explicit_path: Some(&explicit),
            ..location("other.onnx")
        };
        assert_eq!(resolve(&loc, None).unwrap(), explicit);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("absent.onnx");
        let loc = ModelLocation {
            explicit_path: Some(&explicit),
            ..location("absent.onnx")
        };
        assert!(matches!(
            resolve(&loc, None),
            Err(ModelResolveError::MissingFile(p)) if p == explicit
        ));
    }

    #[test]
    fn test_cached_file_found() {
        let cache = TempDir::new().unwrap();
        fs::write(cache.path().join("m.onnx"), b"cached").unwrap();
        let path = resolve_in(cache.path(), &location("m.onnx"), None).unwrap();
        assert_eq!(path, cache.path().join("m.onnx"));
    }

    #[test]
    fn test_bundled_file_found_when_cache_empty() {
        let cache = TempDir::new().unwrap();
        let bundled = TempDir::new().unwrap();
        fs::write(bundled.path().join("m.onnx"), b"bundled").unwrap();
        let loc = ModelLocation {
            bundled_dir: Some(bundled.path()),
            ..location("m.onnx")
        };
        let path = resolve_in(cache.path(), &loc, None).unwrap();
        assert_eq!(path, bundled.path().join("m.onnx"));
    }

    #[test]
    fn test_not_found_without_url_lists_searched_paths() {
        let cache = TempDir::new().unwrap();
        let bundled = TempDir::new().unwrap();
        let loc = ModelLocation {
            bundled_dir: Some(bundled.path()),
            ..location("m.onnx")
        };
        match resolve_in(cache.path(), &loc, None) {
            Err(ModelResolveError::NotFound { name, searched }) => {
                assert_eq!(name, "m.onnx");
                assert_eq!(searched.len(), 2);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("maskwatch"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_failure_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
