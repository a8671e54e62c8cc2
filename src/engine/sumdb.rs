//! Proxied checksum database table.
//!
//! Entries are either a bare name (`sum.golang.org`, fetched from
//! `https://sum.golang.org/`) or a name followed by an explicit base URL
//! (`sum.golang.google.cn https://sum.golang.google.cn`). The base URL may
//! use any scheme the transport supports, `file` included.

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

/// Bytes that would otherwise end or reshape the path of a joined URL.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, Default)]
pub struct SumdbTable {
    bases: HashMap<String, Url>,
}

impl SumdbTable {
    /// Parse the configured list; blank and malformed entries are skipped.
    pub fn parse(entries: &[String]) -> Self {
        let mut bases = HashMap::new();
        for entry in entries {
            let mut fields = entry.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let raw_url = fields
                .next()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("https://{name}"));

            match Url::parse(&raw_url) {
                Ok(mut base) => {
                    if !base.path().ends_with('/') {
                        let path = format!("{}/", base.path());
                        base.set_path(&path);
                    }
                    bases.insert(name.to_owned(), base);
                }
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "Ignoring malformed proxied checksum database");
                }
            }
        }
        Self { bases }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bases.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Upstream URL for `rest` under the named database.
    ///
    /// `rest` is the decoded request path. It must be relative: a leading
    /// `/`, a dot segment or a scheme-like first segment would let it escape
    /// the configured base. Each segment is encoded again before the join.
    pub fn upstream_url(&self, name: &str, rest: &str) -> Option<Url> {
        let base = self.bases.get(name)?;
        if rest.starts_with('/') || rest.split('/').next().is_some_and(|s| s.contains(':')) {
            return None;
        }

        let mut relative = String::with_capacity(rest.len());
        for (i, segment) in rest.split('/').enumerate() {
            if matches!(segment, "." | "..") {
                return None;
            }
            if i > 0 {
                relative.push('/');
            }
            relative.extend(utf8_percent_encode(segment, SEGMENT));
        }
        base.join(&relative).ok()
    }
}
