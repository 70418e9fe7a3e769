//! Modelfile rewriting
//!
//! `FROM` and `ADAPTER` directives that point at local files are replaced by
//! `@<digest>` references after the file has been uploaded as a blob. Every
//! other line, including directives naming registry models, is passed
//! through byte for byte.

use crate::blob::BlobUploader;
use crate::digest::BlobDigest;
use crate::error::ClientResult;
use crate::paths::PathResolver;
use crate::transport::Transport;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Directives whose argument may name a local file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Base model weights
    From,
    /// LoRA or similar adapter weights
    Adapter,
}

impl Directive {
    pub const ALL: [Directive; 2] = [Directive::From, Directive::Adapter];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::From => "FROM",
            Self::Adapter => "ADAPTER",
        }
    }

    /// Match a keyword case-insensitively
    pub fn from_keyword(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.keyword().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A directive line split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveLine<'a> {
    pub directive: Directive,
    /// Keyword as written in the modelfile
    pub token: &'a str,
    /// Argument with surrounding whitespace removed
    pub argument: &'a str,
}

impl<'a> DirectiveLine<'a> {
    /// Parse a line, returning `None` unless it is a file-bearing directive
    /// with a non-empty argument
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_start();
        let (token, rest) = line.split_once(char::is_whitespace)?;
        let directive = Directive::from_keyword(token)?;

        let argument = rest.trim();
        if argument.is_empty() {
            return None;
        }

        Some(Self {
            directive,
            token,
            argument,
        })
    }
}

/// A resolved directive argument and whether it exists on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalReference {
    /// An existing regular file
    File(PathBuf),
    /// Nothing usable at this path; the argument is a registry name
    Absent(PathBuf),
}

impl LocalReference {
    pub async fn inspect(path: PathBuf) -> Self {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Self::File(path),
            _ => Self::Absent(path),
        }
    }
}

/// Rewrites modelfiles so local artifacts become blob references
pub struct ModelfileRewriter<'a, T: Transport + ?Sized> {
    resolver: &'a PathResolver,
    uploader: BlobUploader<'a, T>,
}

impl<'a, T: Transport + ?Sized> ModelfileRewriter<'a, T> {
    pub fn new(resolver: &'a PathResolver, uploader: BlobUploader<'a, T>) -> Self {
        Self { resolver, uploader }
    }

    /// Rewrite `modelfile`, uploading referenced files in line order
    ///
    /// The output has the same number of lines as the input. A file named by
    /// several directives is uploaded once.
    pub async fn rewrite(&self, modelfile: &str) -> ClientResult<String> {
        let mut uploaded: HashMap<PathBuf, BlobDigest> = HashMap::new();
        let mut out = Vec::new();

        for line in modelfile.split('\n') {
            out.push(self.rewrite_line(line, &mut uploaded).await?);
        }

        Ok(out.join("\n"))
    }

    async fn rewrite_line(
        &self,
        line: &str,
        uploaded: &mut HashMap<PathBuf, BlobDigest>,
    ) -> ClientResult<String> {
        let Some(parsed) = DirectiveLine::parse(line) else {
            return Ok(line.to_string());
        };

        let path = match LocalReference::inspect(self.resolver.resolve(parsed.argument)).await {
            LocalReference::File(path) => path,
            LocalReference::Absent(path) => {
                tracing::debug!(
                    directive = %parsed.directive,
                    argument = parsed.argument,
                    path = ?path,
                    "No local file, keeping directive as written"
                );
                return Ok(line.to_string());
            }
        };

        let digest = match uploaded.get(&path) {
            Some(digest) => digest.clone(),
            None => {
                let digest = self.uploader.ensure_blob(&path).await?;
                uploaded.insert(path, digest.clone());
                digest
            }
        };

        let eol = if line.ends_with('\r') { "\r" } else { "" };
        Ok(format!("{} @{}{}", parsed.token, digest, eol))
    }
}
