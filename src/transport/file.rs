//! Local `file://` fetches.
//!
//! # Responsibilities
//! - Map a forward-slash URL path onto a native filesystem path
//! - Reject paths that are ambiguous on the host platform (no drive letter,
//!   UNC shares, relative results)
//! - Serve the opened file (or a directory listing) through the transport
//!
//! # Design Decisions
//! - Validation is parameterized by [`PathStyle`] so drive-letter rules can
//!   be checked on any host; [`FileUrlResolver::native`] picks the host style
//! - Open failures are returned unmasked; the caller decides what a missing
//!   file means
//! - Blocking filesystem calls run on the blocking pool

use std::fs::File;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;
use percent_encoding::percent_decode_str;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::error::{InvalidPathError, ResolveError, TransportError};
use crate::transport::{ProtocolHandler, TransportResponse};

/// Path conventions of a filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// `/`-separated, absolute paths start with `/`.
    Slash,
    /// `\`-separated, absolute paths start with a drive letter (`C:\`).
    Backslash,
}

impl PathStyle {
    /// Style of the host platform.
    pub fn native() -> Self {
        if std::path::MAIN_SEPARATOR == '\\' {
            PathStyle::Backslash
        } else {
            PathStyle::Slash
        }
    }

    fn from_slash(self, path: &str) -> String {
        match self {
            PathStyle::Slash => path.to_owned(),
            PathStyle::Backslash => path.replace('/', "\\"),
        }
    }

    fn is_absolute(self, path: &str) -> bool {
        match self {
            PathStyle::Slash => path.starts_with('/'),
            PathStyle::Backslash => {
                let volume = volume_name(path);
                if volume.starts_with(r"\\") {
                    return true;
                }
                !volume.is_empty() && path[volume.len()..].starts_with('\\')
            }
        }
    }
}

/// Leading volume of a backslash-style path: `C:` or `\\host\share`.
fn volume_name(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return &path[..2];
    }
    if let Some(rest) = path.strip_prefix(r"\\") {
        if rest.is_empty() || rest.starts_with('\\') {
            return "";
        }
        // host, then share
        let host_end = rest.find('\\').map(|i| i + 1).unwrap_or(rest.len());
        let share_end = rest[host_end..]
            .find('\\')
            .map(|i| host_end + i)
            .unwrap_or(rest.len());
        return &path[..2 + share_end];
    }
    ""
}

/// An opened local file together with the path it was opened from.
#[derive(Debug)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file: File,
}

/// Resolves `file://` URL paths into open file handles.
#[derive(Debug, Clone, Copy)]
pub struct FileUrlResolver {
    style: PathStyle,
}

impl FileUrlResolver {
    /// Resolver for the host platform.
    pub fn native() -> Self {
        Self::with_style(PathStyle::native())
    }

    pub fn with_style(style: PathStyle) -> Self {
        Self { style }
    }

    /// Translate a decoded URL path into a native absolute path.
    pub fn resolve(&self, url_path: &str) -> Result<PathBuf, InvalidPathError> {
        let mut name = self.style.from_slash(url_path);

        if self.style == PathStyle::Backslash {
            let mut chars = name.chars();
            if chars.next().is_none() {
                return Err(InvalidPathError::MissingDriveLetter);
            }
            name = chars.as_str().to_owned();

            let volume = volume_name(&name);
            if volume.is_empty() || volume.starts_with(r"\\") {
                return Err(InvalidPathError::MissingDriveLetter);
            }
        }

        if !self.style.is_absolute(&name) {
            return Err(InvalidPathError::NotAbsolute);
        }

        Ok(PathBuf::from(name))
    }

    /// Resolve and open read-only. The caller owns the returned handle.
    pub fn open(&self, url_path: &str) -> Result<LocalFile, ResolveError> {
        let path = self.resolve(url_path)?;
        let file = File::open(&path)?;
        Ok(LocalFile { path, file })
    }
}

/// Lexically clean a URL path the way a file server does before opening:
/// rooted, no empty, `.` or `..` segments.
pub fn clean_url_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Transport protocol handler serving `file://` URLs from local disk.
#[derive(Debug, Clone, Copy)]
pub struct FileProtocol {
    resolver: FileUrlResolver,
}

impl FileProtocol {
    pub fn new(resolver: FileUrlResolver) -> Self {
        Self { resolver }
    }

    pub fn native() -> Self {
        Self::new(FileUrlResolver::native())
    }

    async fn fetch(self, url: Url) -> Result<TransportResponse, TransportError> {
        let decoded = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|_| InvalidPathError::InvalidEncoding)?;
        let cleaned = clean_url_path(&decoded);
        let resolver = self.resolver;

        let opened = tokio::task::spawn_blocking(move || -> Result<Opened, ResolveError> {
            let local = resolver.open(&cleaned)?;
            let metadata = local.file.metadata()?;
            if metadata.is_dir() {
                return Ok(Opened::Directory(list_directory(&local.path)?));
            }
            Ok(Opened::File {
                content_type: content_type_for(&local.path),
                len: metadata.len(),
                file: local.file,
            })
        })
        .await
        .map_err(std::io::Error::other)??;

        let mut headers = HeaderMap::new();
        let response = match opened {
            Opened::File { file, len, content_type } => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
                let stream = ReaderStream::new(tokio::fs::File::from_std(file));
                TransportResponse::new(StatusCode::OK, headers, Body::from_stream(stream))
            }
            Opened::Directory(listing) => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                TransportResponse::new(StatusCode::OK, headers, Body::from(listing))
            }
        };
        Ok(response)
    }
}

impl ProtocolHandler for FileProtocol {
    fn round_trip(&self, url: Url) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
        Box::pin(self.fetch(url))
    }
}

enum Opened {
    File {
        file: File,
        len: u64,
        content_type: &'static str,
    },
    Directory(String),
}

fn list_directory(path: &Path) -> std::io::Result<String> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let mut listing = String::new();
    for name in names {
        listing.push_str(&name);
        listing.push('\n');
    }
    Ok(listing)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") | Some("info") => "application/json",
        Some("mod") | Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}
