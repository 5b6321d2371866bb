use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ScanError;

/// パスマッチング用の構造体
#[derive(Debug, Clone)]
pub struct PathMatcher {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

impl PathMatcher {
    /// include/excludeパターンからPathMatcherを作成
    ///
    /// includeが空の場合は全ファイル対象
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ScanError> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_set(include)?)
        };

        Ok(Self {
            include,
            exclude: build_set(exclude)?,
        })
    }

    /// ファイルが解析対象かどうかを判定
    pub fn should_include(&self, relative_path: &Path) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        match &self.include {
            Some(include_set) => include_set.is_match(relative_path),
            None => true,
        }
    }

    /// ディレクトリを走査すべきかどうかを判定（excludeのみチェック）
    pub fn should_traverse_dir(&self, relative_path: &Path) -> bool {
        !self.exclude.is_match(relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_include_means_all() {
        let matcher = PathMatcher::new(&[], &[]).unwrap();
        assert!(matcher.should_include(Path::new("src/app.ts")));
        assert!(matcher.should_include(Path::new("lib/utils.js")));
    }

    #[test]
    fn test_include_filter() {
        let matcher = PathMatcher::new(&["src/**/*.ts".to_string()], &[]).unwrap();
        assert!(matcher.should_include(Path::new("src/app.ts")));
        assert!(!matcher.should_include(Path::new("lib/other.ts")));
    }

    #[test]
    fn test_exclude_filter() {
        let matcher = PathMatcher::new(&[], &["**/test/**".to_string()]).unwrap();
        assert!(matcher.should_include(Path::new("src/app.ts")));
        assert!(!matcher.should_include(Path::new("src/test/app.spec.ts")));
    }

    #[test]
    fn test_should_traverse_dir() {
        let matcher = PathMatcher::new(
            &[],
            &["**/node_modules".to_string(), "**/node_modules/**".to_string()],
        )
        .unwrap();
        assert!(matcher.should_traverse_dir(Path::new("src")));
        assert!(!matcher.should_traverse_dir(Path::new("node_modules")));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = PathMatcher::new(&["src/[".to_string()], &[]).unwrap_err();
        assert!(matches!(err, ScanError::Pattern { ref pattern, .. } if pattern == "src/["));
    }
}
