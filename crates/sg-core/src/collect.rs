//! Staging-tree file collection.
//!
//! Collected files mirror their absolute path under `<root>/files/`;
//! captured command output lands under `<root>/commands/<plugin>/`.
//! Copy specs accept literal paths and glob patterns, expanded against
//! the live filesystem at call time. Non-existent paths are silently
//! skipped; paths matching a forbidden spec are never collected.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from staging-tree operations.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> CollectError {
    CollectError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The staging tree one collection run writes into.
#[derive(Debug)]
pub struct Staging {
    root: PathBuf,
    forbidden: Vec<String>,
    files_collected: usize,
}

impl Staging {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CollectError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        Ok(Self {
            root,
            forbidden: Vec::new(),
            files_collected: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_collected(&self) -> usize {
        self.files_collected
    }

    /// Exclude paths matching `pattern` (glob or literal) from all
    /// subsequent collection.
    pub fn add_forbidden_path(&mut self, pattern: impl Into<String>) {
        self.forbidden.push(pattern.into());
    }

    fn is_forbidden(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.forbidden.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(&text))
                .unwrap_or(text.as_ref() == pattern.as_str())
        })
    }

    /// Collect every path in `specs`. Each spec is a literal path or a
    /// glob pattern, expanded now. Returns the number of files copied.
    pub fn copy_spec<'a, I>(&mut self, specs: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut copied = 0;
        for spec in specs {
            match glob::glob(spec) {
                Ok(paths) => {
                    let mut matched = false;
                    for entry in paths.flatten() {
                        matched = true;
                        copied += self.collect_tree(&entry);
                    }
                    if !matched {
                        debug!(spec, "copy spec matched nothing");
                    }
                }
                // Not a valid pattern: treat as a literal path.
                Err(_) => copied += self.collect_tree(Path::new(spec)),
            }
        }
        self.files_collected += copied;
        copied
    }

    /// Copy one file or directory tree into the staging mirror. Soft
    /// failures are logged and counted as zero.
    fn collect_tree(&self, src: &Path) -> usize {
        if self.is_forbidden(src) {
            debug!(path = %src.display(), "skipping forbidden path");
            return 0;
        }
        let Ok(meta) = std::fs::symlink_metadata(src) else {
            return 0;
        };
        if meta.is_dir() {
            let entries = match std::fs::read_dir(src) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %src.display(), error = %e, "cannot read directory");
                    return 0;
                }
            };
            return entries
                .flatten()
                .map(|entry| self.collect_tree(&entry.path()))
                .sum();
        }
        if !meta.is_file() {
            // Sockets, fifos, dangling symlinks: nothing to copy.
            return 0;
        }
        match self.copy_file(src) {
            Ok(()) => 1,
            Err(e) => {
                warn!(path = %src.display(), error = %e, "copy failed");
                0
            }
        }
    }

    fn copy_file(&self, src: &Path) -> Result<(), CollectError> {
        let dest = self.mirror_path(src);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::copy(src, &dest).map_err(|e| io_err(src, e))?;
        Ok(())
    }

    fn mirror_path(&self, src: &Path) -> PathBuf {
        let relative = src.strip_prefix("/").unwrap_or(src);
        self.root.join("files").join(relative)
    }

    /// Store captured command output under `commands/<plugin>/<slug>`.
    pub fn write_command_output(
        &mut self,
        plugin: &str,
        rendered_cmd: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, CollectError> {
        let dir = self.root.join("commands").join(plugin);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let dest = dir.join(command_slug(rendered_cmd));
        std::fs::write(&dest, bytes).map_err(|e| io_err(&dest, e))?;
        Ok(dest)
    }
}

/// Longest mangled command kept verbatim before switching to a hashed
/// suffix.
const SLUG_MAX: usize = 96;

/// Mangle a rendered command into a stable file name. Long commands are
/// truncated with a digest suffix so commands differing only in their
/// tail never share a file.
pub fn command_slug(rendered: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut slug: String = rendered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    if slug.len() > SLUG_MAX {
        let digest = Sha256::digest(rendered.as_bytes());
        slug.truncate(SLUG_MAX);
        slug.push('_');
        slug.push_str(&hex::encode(&digest[..4]));
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_literals_and_mirrors_absolute_paths() {
        let src_dir = tempdir().unwrap();
        let stage_dir = tempdir().unwrap();
        let src = src_dir.path().join("agent.config");
        std::fs::write(&src, "contents").unwrap();

        let mut staging = Staging::new(stage_dir.path()).unwrap();
        let copied = staging.copy_spec([src.to_str().unwrap()]);
        assert_eq!(copied, 1);

        let mirrored = stage_dir
            .path()
            .join("files")
            .join(src.strip_prefix("/").unwrap());
        assert_eq!(std::fs::read_to_string(mirrored).unwrap(), "contents");
    }

    #[test]
    fn expands_globs_at_call_time() {
        let src_dir = tempdir().unwrap();
        let stage_dir = tempdir().unwrap();
        std::fs::write(src_dir.path().join("cli.log"), "a").unwrap();
        std::fs::write(src_dir.path().join("brick.log"), "b").unwrap();
        std::fs::write(src_dir.path().join("notes.txt"), "c").unwrap();

        let mut staging = Staging::new(stage_dir.path()).unwrap();
        let pattern = format!("{}/*.log", src_dir.path().display());
        assert_eq!(staging.copy_spec([pattern.as_str()]), 2);
    }

    #[test]
    fn missing_paths_are_silently_skipped() {
        let stage_dir = tempdir().unwrap();
        let mut staging = Staging::new(stage_dir.path()).unwrap();
        assert_eq!(staging.copy_spec(["/no/such/path/anywhere"]), 0);
    }

    #[test]
    fn forbidden_paths_are_never_collected() {
        let src_dir = tempdir().unwrap();
        let stage_dir = tempdir().unwrap();
        let secret = src_dir.path().join("secret.pem");
        std::fs::write(&secret, "key").unwrap();
        std::fs::write(src_dir.path().join("ok.conf"), "fine").unwrap();

        let mut staging = Staging::new(stage_dir.path()).unwrap();
        staging.add_forbidden_path(format!("{}/secret.pem", src_dir.path().display()));
        let copied = staging.copy_spec([src_dir.path().to_str().unwrap()]);
        assert_eq!(copied, 1);
        assert!(!stage_dir
            .path()
            .join("files")
            .join(secret.strip_prefix("/").unwrap())
            .exists());
    }

    #[test]
    fn directories_copy_recursively() {
        let src_dir = tempdir().unwrap();
        let stage_dir = tempdir().unwrap();
        std::fs::create_dir_all(src_dir.path().join("nested/deep")).unwrap();
        std::fs::write(src_dir.path().join("nested/deep/file"), "x").unwrap();
        std::fs::write(src_dir.path().join("top"), "y").unwrap();

        let mut staging = Staging::new(stage_dir.path()).unwrap();
        assert_eq!(staging.copy_spec([src_dir.path().to_str().unwrap()]), 2);
    }

    #[test]
    fn command_output_lands_under_plugin_dir() {
        let stage_dir = tempdir().unwrap();
        let mut staging = Staging::new(stage_dir.path()).unwrap();
        let dest = staging
            .write_command_output("gluster", "gluster peer status", b"peers: 0\n")
            .unwrap();
        assert!(dest.ends_with("commands/gluster/gluster_peer_status"));
        assert_eq!(std::fs::read(dest).unwrap(), b"peers: 0\n");
    }

    #[test]
    fn command_slug_mangles_and_truncates() {
        assert_eq!(
            command_slug("navicli -h 10.0.0.1 getsptime -spa"),
            "navicli_-h_10.0.0.1_getsptime_-spa"
        );
        assert!(command_slug(&"x".repeat(200)).len() <= SLUG_MAX + 9);
    }

    #[test]
    fn command_slug_keeps_long_commands_distinct() {
        let volume = "v".repeat(80);
        let heal = format!("gluster volume heal {volume} info");
        let split = format!("gluster volume heal {volume} info split-brain");
        let a = command_slug(&heal);
        let b = command_slug(&split);
        assert_ne!(a, b);
        // Both share the truncated body but carry different digests.
        assert_eq!(a[..SLUG_MAX], b[..SLUG_MAX]);
    }
}
