//! Path resolution for file-touching tools: tilde expansion, workspace-root
//! anchoring, ambiguous-basename search, and a symlink/boundary check that
//! rejects anything resolving outside the workspace. Grounded on the
//! teacher's `steer-workspace::local::workspace::LocalWorkspace::resolve_path`
//! and `utils::paths` directory-discovery helpers, adapted into a pure
//! function since this crate owns no filesystem-backend abstraction.

use std::path::{Path, PathBuf};

use orchestra_tools::ToolError;

/// Outcome of resolving a model-supplied path string against a workspace
/// root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolution {
    pub absolute: PathBuf,
}

fn expand_tilde(raw: &str) -> Option<PathBuf> {
    if raw == "~" {
        return dirs::home_dir();
    }
    let rest = raw.strip_prefix("~/")?;
    dirs::home_dir().map(|home| home.join(rest))
}

/// Resolve `raw` (a path string as supplied by the model) to an absolute
/// path inside `workspace_root`.
///
/// Resolution order, matching spec §4.5:
/// 1. `~` / `~/...` is expanded against the user's home directory.
/// 2. An absolute path is used as-is.
/// 3. A relative path is anchored at `workspace_root`.
/// 4. If the anchored path does not exist, an ambiguous-basename search is
///    attempted under `workspace_root` (breadth-first, skipping common
///    dependency/VCS directories); zero matches is `FileNotFound`, more than
///    one is `PathAmbiguous`.
/// 5. The final candidate is canonicalized and checked against
///    `workspace_root`'s canonical form — this also resolves symlinks, so a
///    symlink that escapes the workspace is rejected even though the
///    unresolved path looked contained.
pub fn resolve_path(raw: &str, workspace_root: &Path) -> Result<PathResolution, ToolError> {
    let candidate = if let Some(expanded) = expand_tilde(raw) {
        expanded
    } else {
        let p = Path::new(raw);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            workspace_root.join(p)
        }
    };

    let candidate = if candidate.exists() {
        candidate
    } else {
        search_by_basename(raw, workspace_root)?
    };

    let canonical_root = workspace_root
        .canonicalize()
        .map_err(|_| ToolError::PathNotInWorkspace {
            path: workspace_root.display().to_string(),
        })?;
    let canonical = candidate
        .canonicalize()
        .map_err(|_| ToolError::FileNotFound {
            path: raw.to_string(),
        })?;

    if !canonical.starts_with(&canonical_root) {
        tracing::debug!(target: "safety.path", raw, "path escapes workspace root, rejecting");
        return Err(ToolError::PathNotInWorkspace {
            path: raw.to_string(),
        });
    }

    tracing::debug!(target: "safety.path", raw, resolved = %canonical.display(), "path resolved");
    Ok(PathResolution { absolute: canonical })
}

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", ".venv", "vendor"];

fn search_by_basename(raw: &str, workspace_root: &Path) -> Result<PathBuf, ToolError> {
    let needle = Path::new(raw)
        .file_name()
        .ok_or_else(|| ToolError::FileNotFound {
            path: raw.to_string(),
        })?;

    let mut matches = Vec::new();
    let mut queue = vec![workspace_root.to_path_buf()];
    while let Some(dir) = queue.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name() else {
                continue;
            };
            if path.is_dir() {
                if !SKIP_DIRS.contains(&name.to_string_lossy().as_ref()) {
                    queue.push(path);
                }
                continue;
            }
            if name == needle {
                matches.push(path);
            }
        }
    }

    match matches.len() {
        0 => Err(ToolError::FileNotFound {
            path: raw.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(ToolError::PathAmbiguous {
            path: raw.to_string(),
            candidates: matches.len(),
        }),
    }
}
