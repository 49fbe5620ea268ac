//! side-car variable file resolution
//!
//! A host or group may carry extra variables next to the inventory file,
//! under `host_vars/` or `group_vars/`: either a single file named after the
//! element (extension optional) or a directory of such files. A missing
//! vars source is not an error, it simply contributes nothing.
//!
//! Vars files are always parsed as YAML, whatever their extension says.
use crate::value::{Value, VarsMap};
use std::path::{Path, PathBuf};

/// Accepted file name extensions, in lookup priority order.
pub const VARS_FILENAME_EXTENSIONS: &[&str] = &["", ".ini", ".yml", ".yaml"];

#[derive(thiserror::Error, Debug)]
pub enum VarsError {
    #[error("unable to read vars file")]
    Io(#[from] std::io::Error),
    #[error("unable to parse vars file {} as YAML", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("vars file {} does not hold a mapping", path.display())]
    NotAMapping { path: PathBuf },
    #[error("vars directory {} nests deeper than {max} levels", path.display())]
    DepthExceeded { path: PathBuf, max: usize },
}

/// Locate and load the side-car variables of `element`.
///
/// Tries `<search_root>/{host,group}_vars/<element><ext>` for each accepted
/// extension, first match wins. A directory named `<element>` is loaded
/// recursively instead: matching files are shallow-merged in lexical path
/// order, later files overriding earlier ones on key collision.
pub fn resolve_vars(
    element: &str,
    search_root: &Path,
    is_host: bool,
    max_depth: usize,
) -> Result<VarsMap, VarsError> {
    let vars_dir = search_root.join(if is_host { "host_vars" } else { "group_vars" });
    let base = vars_dir.join(element);

    for extension in VARS_FILENAME_EXTENSIONS {
        let mut candidate = base.clone().into_os_string();
        candidate.push(extension);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return load_vars_file(&candidate);
        }
    }

    if base.is_dir() {
        let mut files = Vec::new();
        collect_files(&base, 0, max_depth, &mut files)?;
        files.sort();

        let mut merged = VarsMap::new();
        for file in &files {
            let file_vars = load_vars_file(file)?;
            // later files win on collision
            merged.extend(file_vars);
        }
        return Ok(merged);
    }

    tracing::debug!(
        element,
        path = %base.display(),
        "no vars file found with any of the supported extensions"
    );
    Ok(VarsMap::new())
}

fn load_vars_file(path: &Path) -> Result<VarsMap, VarsError> {
    tracing::debug!(path = %path.display(), "reading vars file");
    let contents = std::fs::read_to_string(path)?;
    let document: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|source| VarsError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    match Value::from(document) {
        Value::Null => Ok(VarsMap::new()),
        Value::Object(vars) => Ok(vars),
        _ => Err(VarsError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

fn collect_files(
    dir: &Path,
    depth: usize,
    max_depth: usize,
    files: &mut Vec<PathBuf>,
) -> Result<(), VarsError> {
    if depth > max_depth {
        return Err(VarsError::DepthExceeded {
            path: dir.to_path_buf(),
            max: max_depth,
        });
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            collect_files(&path, depth + 1, max_depth, files)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        if has_accepted_extension(&path) {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping file with unsupported extension");
        }
    }

    Ok(())
}

fn has_accepted_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        None => true,
        Some(extension) => VARS_FILENAME_EXTENSIONS
            .iter()
            .any(|accepted| accepted.strip_prefix('.') == Some(extension)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vars;
    use pretty_assertions::assert_eq;

    fn lookup_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/vars_lookup")
    }

    fn resolve(element: &str, is_host: bool) -> VarsMap {
        resolve_vars(element, &lookup_root(), is_host, 32).expect("lookup must succeed")
    }

    #[test]
    fn extension_priority_is_fixed() {
        // both `hostx` and `hostx.ini` exist; the bare file wins
        assert_eq!(resolve("hostx", true), vars! { "src" => "bare" });
    }

    #[test]
    fn yml_extension_is_found() {
        assert_eq!(resolve("hosty", true), vars! { "src" => "yml" });
    }

    #[test]
    fn group_lookup_uses_group_vars() {
        assert_eq!(resolve("groupa", false), vars! { "tier" => "gold" });
    }

    #[test]
    fn directory_merges_lexically_with_last_write_wins() {
        assert_eq!(
            resolve("hostz", true),
            vars! {
                "alpha" => 1,
                "beta" => "new",
                "gamma" => 3,
            }
        );
    }

    #[test]
    fn missing_vars_source_is_empty() {
        assert_eq!(resolve("no-such-host", true), vars! {});
    }

    #[test]
    fn non_mapping_vars_file_is_rejected() {
        let err =
            resolve_vars("badlist", &lookup_root(), true, 32).expect_err("must not resolve");
        assert!(matches!(err, VarsError::NotAMapping { .. }));
    }
}
