use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::qualifiers::Qualifiers;
use crate::resolver::ResolveError;

/// One on-disk variant of a package logo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    /// Path relative to the logo's folder, `/`-separated.
    pub rel: String,
    pub qualifiers: Qualifiers,
    pub target_size: Option<u32>,
    pub scale: Option<u32>,
}

impl Candidate {
    pub fn new(path: PathBuf, rel: String, qualifiers: Qualifiers) -> Result<Self, ResolveError> {
        let target_size = numeric(&qualifiers, "targetsize", &rel)?;
        let scale = numeric(&qualifiers, "scale", &rel)?;
        Ok(Self {
            path,
            rel,
            qualifiers,
            target_size,
            scale,
        })
    }

    /// Builds a candidate from a relative asset path alone. Returns `None`
    /// when the path does not carry valid qualifiers.
    pub fn from_rel(rel: &str) -> Result<Option<Self>, ResolveError> {
        match Qualifiers::from_relative_path(rel) {
            Ok(q) => Self::new(PathBuf::from(rel), rel.replace('\\', "/"), q).map(Some),
            Err(_) => Ok(None),
        }
    }
}

fn numeric(q: &Qualifiers, name: &'static str, rel: &str) -> Result<Option<u32>, ResolveError> {
    q.get(name)
        .map(|v| {
            v.parse::<u32>().map_err(|_| ResolveError::InvalidNumber {
                qualifier: name,
                value: v.to_string(),
                asset: rel.to_string(),
            })
        })
        .transpose()
}

/// Splits a manifest logo reference (`Assets\Square44x44Logo.png`) into the
/// folder holding its variants and the file-name stem they share.
pub fn logo_location(package_root: &Path, logo: &str) -> Option<(PathBuf, String)> {
    let mut path = package_root.to_path_buf();
    for part in logo.split(['\\', '/']).filter(|p| !p.is_empty() && *p != ".") {
        path.push(part);
    }
    let stem = path.file_stem()?.to_str()?.to_string();
    let folder = path.parent()?.to_path_buf();
    Some((folder, stem))
}

/// Lists every file variant of `logo` inside `package_root`.
///
/// A missing asset folder is an empty result. Files whose path does not parse
/// as qualifiers are skipped; other I/O failures are returned.
pub fn enumerate(package_root: &Path, logo: &str) -> Result<Vec<Candidate>, ResolveError> {
    let Some((folder, stem)) = logo_location(package_root, logo) else {
        return Ok(Vec::new());
    };
    match std::fs::metadata(&folder) {
        Ok(m) if m.is_dir() => {}
        Ok(_) => return Ok(Vec::new()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ResolveError::io(&folder, e)),
    }

    let prefix = format!("{stem}.");
    let mut out = Vec::new();
    for entry in WalkDir::new(&folder).min_depth(1) {
        let entry = entry.map_err(|e| {
            let at = e.path().unwrap_or(&folder).to_path_buf();
            ResolveError::io(&at, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !starts_with_ignore_ascii_case(&name, &prefix) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&folder) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        match Qualifiers::from_relative_path(&rel) {
            Ok(q) => out.push(Candidate::new(entry.path().to_path_buf(), rel, q)?),
            Err(e) => tracing::debug!(asset=%rel, error=%e, "skipping asset with unparsable qualifiers"),
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}
