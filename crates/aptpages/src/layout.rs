//! Files aptpages owns on the hosting branch.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PublishError;

/// Armored public key at the branch root. Written once, never replaced.
pub const PUBLIC_KEY_FILE: &str = "public.key";

pub fn public_key_path(workdir: &Path) -> PathBuf {
    workdir.join(PUBLIC_KEY_FILE)
}

pub fn distributions_path(repo_dir: &Path) -> PathBuf {
    repo_dir.join("conf").join("distributions")
}

/// reprepro `conf/distributions`: one stanza per codename in the given order.
pub fn render_distributions(
    description: &str,
    distributions: &[String],
    architectures: &[String],
    sign_with: &str,
) -> String {
    let architectures = architectures.join(" ");
    let mut out = String::new();
    for codename in distributions {
        out.push_str(&format!("Description: {description}\n"));
        out.push_str(&format!("Codename: {codename}\n"));
        out.push_str(&format!("Architectures: {architectures}\n"));
        out.push_str("Components: main\n");
        out.push_str(&format!("SignWith: {sign_with}\n"));
        out.push_str("\n\n");
    }
    out
}

/// Create `<repo_dir>/conf` if needed and overwrite `distributions`.
pub fn write_distributions(repo_dir: &Path, contents: &str) -> Result<PathBuf, PublishError> {
    let path = distributions_path(repo_dir);
    if let Some(conf) = path.parent() {
        fs::create_dir_all(conf)
            .map_err(|e| PublishError::io(format!("creating {}", conf.display()), e))?;
    }
    fs::write(&path, contents)
        .map_err(|e| PublishError::io(format!("writing {}", path.display()), e))?;
    Ok(path)
}

/// Write the public key file unless the branch already has one.
///
/// Returns `true` when the file was created.
pub fn write_public_key(workdir: &Path, armored: &str) -> Result<bool, PublishError> {
    let path = public_key_path(workdir);
    if path.is_file() {
        return Ok(false);
    }
    fs::write(&path, armored)
        .map_err(|e| PublishError::io(format!("writing {}", path.display()), e))?;
    Ok(true)
}
