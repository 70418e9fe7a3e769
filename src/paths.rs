//! Resolution of modelfile directive arguments to absolute paths
//!
//! Lexical path algebra: nothing here touches the filesystem. A relative
//! base directory is anchored on the current directory once, when the
//! resolver is built.

use std::io;
use std::path::{Component, Path, PathBuf};

const HOME_MARKER: char = '~';

/// Resolves directive arguments against a base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    base_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl PathResolver {
    /// Create a resolver for `base_dir`, looking up the home directory once
    ///
    /// A relative `base_dir` is made absolute against the current directory.
    /// Fails only when the current directory cannot be read.
    pub fn new(base_dir: impl AsRef<Path>) -> io::Result<Self> {
        let base_dir = base_dir.as_ref();
        let base_dir = if base_dir.as_os_str().is_empty() {
            std::path::absolute(".")?
        } else {
            std::path::absolute(base_dir)?
        };
        Ok(Self::with_home(normalize(&base_dir), dirs::home_dir()))
    }

    /// Create a resolver with an explicit home directory
    ///
    /// `base_dir` is used as given. A relative base yields relative results.
    pub fn with_home(base_dir: impl Into<PathBuf>, home_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            home_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Turn a directive argument into a normalized path
    ///
    /// `~/adapters/x.bin` lands under the home directory; anything else is
    /// joined onto the base directory, which leaves absolute arguments as
    /// they are. The result is absolute whenever the base is.
    pub fn resolve(&self, arg: &str) -> PathBuf {
        let joined = match arg.strip_prefix(HOME_MARKER) {
            Some(rest) => {
                let rest = rest.trim_start_matches(['/', '\\']);
                let home = self
                    .home_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("/"));
                home.join(rest)
            }
            None => self.base_dir.join(arg),
        };

        normalize(&joined)
    }
}

/// Lexically collapse `.` and `..` components
///
/// `..` never climbs above the root, matching how the shell treats `/..`.
/// Leading `..` components of a relative path are kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                None | Some(Component::ParentDir) | Some(Component::CurDir) => {
                    out.push(Component::ParentDir.as_os_str());
                }
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(Component::CurDir.as_os_str());
    }

    out
}
