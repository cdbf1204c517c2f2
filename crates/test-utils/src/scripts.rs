//! Stand-in retrieval programs.
//!
//! Tests point the retriever at a small shell script instead of the real
//! download tool. The script sees the same arguments and working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions)?;
    Ok(path)
}

/// Script that copies `fixture` into the working directory under the
/// `--out` name it was given, then prints a summary line.
#[cfg(unix)]
pub fn write_copying_script(dir: &Path, name: &str, fixture: &Path) -> io::Result<PathBuf> {
    let body = format!(
        r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--out" ]; then out="$2"; fi
  shift
done
cp "{}" "./$out"
echo "saved $out""#,
        fixture.display()
    );
    write_script(dir, name, &body)
}
