//! `#include` expansion
//!
//! Include directives are resolved at token level: the included file is
//! scanned and its tokens are spliced in place of the directive. Every file is
//! included at most once, which also makes include cycles harmless.

use crate::error::{Error, Result};
use crate::lexer::{Scanner, Token, TokenKind};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Source of included files
pub trait IncludeResolver {
    /// Locate an included file.
    ///
    /// `local` is true for `#include "name"`, which is looked up relative to
    /// `includer` (the key of the including file, `None` for the root source).
    /// Returns a key identifying the file and its contents.
    fn resolve(&self, name: &str, local: bool, includer: Option<&str>) -> Result<(String, String)>;
}

/// Resolves includes on the filesystem
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    /// Directories searched for `#include <name>`
    pub search_paths: Vec<PathBuf>,
    /// Directory of the root source file, used for its local includes
    pub root_dir: Option<PathBuf>,
}

impl FileResolver {
    /// Creates a resolver with the given library search paths
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        FileResolver {
            search_paths,
            root_dir: None,
        }
    }

    /// Sets the directory local includes of the root file are relative to
    pub fn with_root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(dir.into());
        self
    }

    fn read(path: &Path, name: &str) -> Result<(String, String)> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::IncludeError {
            path: name.to_string(),
            message: e.to_string(),
        })?;
        let key = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();
        Ok((key, text))
    }
}

impl IncludeResolver for FileResolver {
    fn resolve(&self, name: &str, local: bool, includer: Option<&str>) -> Result<(String, String)> {
        if local {
            let base = match includer {
                Some(key) => Path::new(key).parent().map(Path::to_path_buf),
                None => self.root_dir.clone(),
            };
            let path = base.unwrap_or_default().join(name);
            return Self::read(&path, name);
        }

        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
            .map(|path| Self::read(&path, name))
            .unwrap_or_else(|| {
                Err(Error::IncludeError {
                    path: name.to_string(),
                    message: "not found in any library search path".to_string(),
                })
            })
    }
}

/// Resolves includes from an in-memory map of name to source
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: HashMap<String, String>,
}

impl MemoryResolver {
    /// Creates an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file under `name`
    pub fn with_file(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.files.insert(name.into(), source.into());
        self
    }
}

impl IncludeResolver for MemoryResolver {
    fn resolve(&self, name: &str, _local: bool, _includer: Option<&str>) -> Result<(String, String)> {
        self.files
            .get(name)
            .map(|source| (name.to_string(), source.clone()))
            .ok_or_else(|| Error::IncludeError {
                path: name.to_string(),
                message: "no such file".to_string(),
            })
    }
}

/// Expands include directives in a token stream
pub struct Preprocessor<'r> {
    resolver: &'r dyn IncludeResolver,
    included: HashSet<String>,
}

impl<'r> Preprocessor<'r> {
    /// Creates a preprocessor backed by `resolver`
    pub fn new(resolver: &'r dyn IncludeResolver) -> Self {
        Preprocessor {
            resolver,
            included: HashSet::new(),
        }
    }

    /// Replaces every include directive with the tokens of the included file
    pub fn expand(&mut self, tokens: Vec<Token>) -> Result<Vec<Token>> {
        self.expand_from(tokens, None)
    }

    fn expand_from(&mut self, tokens: Vec<Token>, origin: Option<&str>) -> Result<Vec<Token>> {
        let mut out = Vec::with_capacity(tokens.len());

        for token in tokens {
            let (path, local) = match token.kind {
                TokenKind::Include { ref path, local } => (path.clone(), local),
                _ => {
                    out.push(token);
                    continue;
                }
            };

            let (key, source) = self.resolver.resolve(&path, local, origin)?;
            if !self.included.insert(key.clone()) {
                tracing::debug!("skipping '{}', already included", key);
                continue;
            }
            tracing::debug!("including '{}'", key);

            let included = Scanner::new(&source).scan_tokens()?;
            let expanded = self.expand_from(included, Some(&key))?;
            out.extend(
                expanded
                    .into_iter()
                    .filter(|t| !matches!(t.kind, TokenKind::Eof)),
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(source: &str, resolver: &MemoryResolver) -> Result<Vec<TokenKind>> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let expanded = Preprocessor::new(resolver).expand(tokens)?;
        Ok(expanded.into_iter().map(|t| t.kind).collect())
    }

    #[test]
    fn test_include_splices_tokens() {
        let resolver = MemoryResolver::new().with_file("one.code", "int one() { return 1; }");
        let kinds = expand("#include <one.code>\nint x;", &resolver).unwrap();
        assert_eq!(kinds[0], TokenKind::Int);
        assert_eq!(kinds[1], TokenKind::Identifier("one".to_string()));
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Eof).count(), 1);
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_each_file_included_once() {
        let resolver = MemoryResolver::new()
            .with_file("a.code", "#include \"b.code\"\nint a;")
            .with_file("b.code", "#include \"a.code\"\nint b;");
        let kinds = expand("#include \"a.code\"\n#include \"b.code\"", &resolver).unwrap();
        let ints = kinds.iter().filter(|k| **k == TokenKind::Int).count();
        assert_eq!(ints, 2);
    }

    #[test]
    fn test_missing_include() {
        let resolver = MemoryResolver::new();
        let err = expand("#include <nope.code>", &resolver).unwrap_err();
        assert!(matches!(err, Error::IncludeError { ref path, .. } if path == "nope.code"));
    }
}
