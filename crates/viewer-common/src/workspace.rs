//! Per-session scratch directory shared by the retrieval invoker (writer)
//! and the overlay renderer (reader).

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::request::OutputNameStem;

/// Extensions removed before every retrieval.
const RASTER_EXTENSIONS: [&str; 2] = ["tif", "tiff"];

/// Handle to one session's scratch directory.
///
/// A workspace has a single writer and a single reader; callers serialize
/// access per session.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open (creating if needed) the workspace rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Delete every raster file in the workspace, whichever request wrote
    /// it. Other files are left alone. Returns the number removed.
    pub fn clear_rasters(&self) -> io::Result<usize> {
        let mut removed = 0;
        for path in self.raster_files()? {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "Removed stale raster");
            removed += 1;
        }
        info!(workspace = %self.root.display(), removed, "Cleared raster files");
        Ok(removed)
    }

    /// Raster files currently present, in natural order.
    pub fn raster_files(&self) -> io::Result<Vec<PathBuf>> {
        self.files_where(|name| {
            Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| RASTER_EXTENSIONS.iter().any(|r| e.eq_ignore_ascii_case(r)))
        })
    }

    /// Files whose name starts with `stem`, in natural order.
    pub fn find_artifacts(&self, stem: &OutputNameStem) -> io::Result<Vec<PathBuf>> {
        self.files_where(|name| stem.matches(name))
    }

    /// Remove the whole workspace directory.
    pub fn remove(self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn files_where<F: Fn(&str) -> bool>(&self, keep: F) -> io::Result<Vec<PathBuf>> {
        let mut matched = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if keep(name) {
                    matched.push(entry.path());
                }
            }
        }
        matched.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
        Ok(matched)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare names so that digit runs order numerically ("f2" < "f10").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a_chars);
                let right = take_digits(&mut b_chars);
                let left_trimmed = left.trim_start_matches('0');
                let right_trimmed = right.trim_start_matches('0');
                let ord = left_trimmed
                    .len()
                    .cmp(&right_trimmed.len())
                    .then_with(|| left_trimmed.cmp(right_trimmed))
                    .then_with(|| left.len().cmp(&right.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut names = vec!["s_10.tif", "s_2.tif", "s_1.tif", "s.tif"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["s.tif", "s_1.tif", "s_2.tif", "s_10.tif"]);
    }

    #[test]
    fn test_leading_zeros_do_not_change_value_order() {
        assert_eq!(natural_cmp("f003", "f10"), Ordering::Less);
        assert_eq!(natural_cmp("f3", "f003"), Ordering::Less);
    }
}
