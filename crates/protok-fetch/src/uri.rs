//! URI fetching with nested-archive support.
//!
//! A fetch materializes the resource behind a URI as a local file. The
//! scheme decides the handler: `file:` resolves straight to the
//! filesystem, `http:`/`https:` download with bounded timeouts, and
//! `zip:`/`jar:` URIs of the form `jar:<inner>!/<entry>` recurse on the
//! inner URI and then stream a single archive entry. The handler table is
//! built locally and passed in at construction; nothing registers global
//! state.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sha1::{Digest, Sha1};

use protok_util::errors::{ProtokError, ProtokResult};

use crate::scratch::ScratchSpace;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const PROGRESS_THRESHOLD: u64 = 100_000;

/// An open stream for a fetched resource, plus its length when known.
pub struct FetchedStream {
    pub reader: Box<dyn Read>,
    pub length: Option<u64>,
}

/// Opens a stream for one URI scheme.
pub trait StreamHandler: Send + Sync {
    /// Open the resource, or `Ok(None)` when it does not exist.
    fn open(&self, fetcher: &UriFetcher, uri: &str) -> ProtokResult<Option<FetchedStream>>;
}

/// Materializes URIs into scratch-owned local files.
///
/// The fetcher itself never caches across builds and never verifies
/// integrity; declared digests are checked by the caller once the file
/// exists on disk.
pub struct UriFetcher {
    scratch: ScratchSpace,
    offline: bool,
    handlers: HashMap<String, Arc<dyn StreamHandler>>,
}

impl UriFetcher {
    /// Fetcher with the default handler table (http, https, zip, jar).
    pub fn new(scratch: ScratchSpace, offline: bool) -> ProtokResult<Self> {
        Ok(Self::with_handlers(scratch, offline, default_handlers()?))
    }

    /// Fetcher with an explicit handler table.
    pub fn with_handlers(
        scratch: ScratchSpace,
        offline: bool,
        handlers: HashMap<String, Arc<dyn StreamHandler>>,
    ) -> Self {
        Self {
            scratch,
            offline,
            handlers,
        }
    }

    /// Fetch `uri` to a local file.
    ///
    /// Returns `Ok(None)` when the resource does not exist, the local
    /// path otherwise. `extension_hint` (e.g. `".exe"`) names the
    /// materialized file so the OS will exec it.
    pub fn fetch(&self, uri: &str, extension_hint: &str) -> ProtokResult<Option<PathBuf>> {
        let scheme = scheme_of(uri).ok_or_else(|| ProtokError::Resolution {
            message: format!("malformed URL `{uri}`: missing scheme"),
        })?;

        if self.offline && !offline_permitted(uri) {
            return Err(ProtokError::Resolution {
                message: format!("offline mode forbids fetching `{uri}`"),
            }
            .into());
        }

        if scheme == "file" {
            let path = file_uri_to_path(uri)?;
            return Ok(path.is_file().then_some(path));
        }

        let handler = self.handlers.get(scheme).ok_or_else(|| {
            ProtokError::Resolution {
                message: format!("no handler for scheme `{scheme}` in `{uri}`"),
            }
        })?;
        let handler = Arc::clone(handler);

        let Some(stream) = handler.open(self, uri)? else {
            tracing::debug!("{uri} not found");
            return Ok(None);
        };

        let dir = self.scratch.dir(&["downloads"])?;
        let target = dir.join(download_name(uri, extension_hint));
        write_stream(stream, &target, uri)?;
        tracing::debug!("fetched {uri} to {}", target.display());
        Ok(Some(target))
    }
}

/// The default scheme table. `zip` shares the `jar` handler because the
/// byte layout is identical.
pub fn default_handlers() -> ProtokResult<HashMap<String, Arc<dyn StreamHandler>>> {
    let mut handlers: HashMap<String, Arc<dyn StreamHandler>> = HashMap::new();
    let http = Arc::new(HttpHandler::new()?);
    handlers.insert("http".to_string(), http.clone());
    handlers.insert("https".to_string(), http);
    let archive = Arc::new(ArchiveHandler);
    handlers.insert("zip".to_string(), archive.clone());
    handlers.insert("jar".to_string(), archive);
    Ok(handlers)
}

/// HTTP(S) downloads over a blocking client with 30 s connect and read
/// bounds.
pub struct HttpHandler {
    client: reqwest::blocking::Client,
}

impl HttpHandler {
    pub fn new() -> ProtokResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(FETCH_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .user_agent("protok")
            .build()
            .map_err(|e| ProtokError::Resolution {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl StreamHandler for HttpHandler {
    fn open(&self, _fetcher: &UriFetcher, uri: &str) -> ProtokResult<Option<FetchedStream>> {
        let resp = self
            .client
            .get(uri)
            .send()
            .map_err(|e| ProtokError::Resolution {
                message: format!("request to {uri} failed: {e}"),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProtokError::Resolution {
                message: format!("HTTP {status} fetching {uri}"),
            }
            .into());
        }

        let length = resp.content_length();
        Ok(Some(FetchedStream {
            reader: Box::new(resp),
            length,
        }))
    }
}

/// Nested-archive URIs: `jar:<inner>!/<entry>` fetches the inner URI,
/// opens it as an archive, and streams one entry.
pub struct ArchiveHandler;

impl StreamHandler for ArchiveHandler {
    fn open(&self, fetcher: &UriFetcher, uri: &str) -> ProtokResult<Option<FetchedStream>> {
        let (inner_uri, entry) = split_nested(uri)?;

        let Some(archive_path) = fetcher.fetch(&inner_uri, ".zip")? else {
            return Ok(None);
        };

        let file = std::fs::File::open(&archive_path).map_err(ProtokError::Io)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| ProtokError::Resolution {
                message: format!("cannot open {inner_uri} as an archive: {e}"),
            })?;

        let mut entry_reader = match archive.by_name(&entry) {
            Ok(reader) => reader,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(ProtokError::Resolution {
                    message: format!("cannot read `{entry}` from {inner_uri}: {e}"),
                }
                .into())
            }
        };

        let mut buf = Vec::new();
        entry_reader
            .read_to_end(&mut buf)
            .map_err(|e| ProtokError::Resolution {
                message: format!("cannot read `{entry}` from {inner_uri}: {e}"),
            })?;
        let length = Some(buf.len() as u64);
        Ok(Some(FetchedStream {
            reader: Box::new(std::io::Cursor::new(buf)),
            length,
        }))
    }
}

/// The scheme of a URI, lowercased. Single-letter prefixes are not
/// schemes, which keeps Windows drive paths out.
fn scheme_of(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    if scheme.len() < 2 {
        return None;
    }
    if !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
        return None;
    }
    Some(scheme)
}

/// Offline mode only permits local resources: `file`, `jrt`, and archive
/// chains that bottom out in `file`.
fn offline_permitted(uri: &str) -> bool {
    let mut current = uri;
    loop {
        match scheme_of(current) {
            Some("file") | Some("jrt") => return true,
            Some(scheme @ ("zip" | "jar")) => {
                current = &current[scheme.len() + 1..];
            }
            _ => return false,
        }
    }
}

/// Split `jar:<inner>!/<entry>` (or `zip:`) into the inner URI and the
/// entry path. The rightmost `!/` wins, so archive nesting recurses
/// outside-in.
fn split_nested(uri: &str) -> ProtokResult<(String, String)> {
    let rest = uri
        .strip_prefix("jar:")
        .or_else(|| uri.strip_prefix("zip:"))
        .ok_or_else(|| ProtokError::Resolution {
            message: format!("`{uri}` is not an archive URI"),
        })?;
    let (inner, entry) = rest.rsplit_once("!/").ok_or_else(|| ProtokError::Resolution {
        message: format!("archive URI `{uri}` is missing the `!/` entry separator"),
    })?;
    if entry.is_empty() {
        return Err(ProtokError::Resolution {
            message: format!("archive URI `{uri}` names no entry"),
        }
        .into());
    }
    Ok((inner.to_string(), entry.to_string()))
}

/// Resolve a `file:` URI to a filesystem path.
fn file_uri_to_path(uri: &str) -> ProtokResult<PathBuf> {
    let rest = uri.strip_prefix("file:").ok_or_else(|| ProtokError::Resolution {
        message: format!("`{uri}` is not a file URI"),
    })?;
    // file:///x and file://x collapse; file:/x passes through.
    let path = rest.strip_prefix("//").unwrap_or(rest);
    if path.is_empty() {
        return Err(ProtokError::Resolution {
            message: format!("file URI `{uri}` has no path"),
        }
        .into());
    }
    Ok(PathBuf::from(path))
}

/// Scratch file name for a download:
/// `<last-segment-stem>-<sha1(url)><extension-hint>`, or the digest alone
/// when the URL ends without a meaningful segment.
fn download_name(uri: &str, extension_hint: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(uri.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let tail = uri
        .split(['?', '#'])
        .next()
        .unwrap_or(uri)
        .trim_end_matches('/');
    let segment = tail.rsplit(['/', '\\']).next().unwrap_or("");
    let stem = segment.rsplit_once('.').map_or(segment, |(s, _)| s);
    let stem: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();

    if stem.is_empty() {
        format!("{digest}{extension_hint}")
    } else {
        format!("{stem}-{digest}{extension_hint}")
    }
}

fn write_stream(stream: FetchedStream, target: &std::path::Path, uri: &str) -> ProtokResult<()> {
    let pb = match stream.length {
        Some(total) if total > PROGRESS_THRESHOLD => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
                    .unwrap()
                    .progress_chars("##-"),
            );
            pb.set_message(uri.to_string());
            Some(pb)
        }
        _ => None,
    };

    let mut reader = stream.reader;
    let mut out = std::fs::File::create(target).map_err(ProtokError::Io)?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|e| ProtokError::Resolution {
            message: format!("read error fetching {uri}: {e}"),
        })?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(ProtokError::Io)?;
        if let Some(ref pb) = pb {
            pb.inc(n as u64);
        }
    }
    out.flush().map_err(ProtokError::Io)?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(())
}
