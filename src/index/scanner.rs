use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tower_lsp::lsp_types::Url;

use crate::analyzer::SourceFile;
use crate::config::PathMatcher;
use crate::error::ScanError;

/// ワークスペース内のソースファイルの探索と読み込み
#[derive(Debug, Clone, Default)]
pub struct SourceFilesScanner {
    root: Option<PathBuf>,
}

impl SourceFilesScanner {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// globに一致するファイルをワークスペースルートから探索する
    ///
    /// 走査はブロッキングプールで行い、結果はパス順に並べる。
    pub async fn find_files(&self, matcher: &PathMatcher) -> Result<Vec<PathBuf>, ScanError> {
        let root = self.root.clone().ok_or(ScanError::MissingRoot)?;
        let matcher = matcher.clone();
        let started = Instant::now();

        let mut files = tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            collect_files(&root, &root, &matcher, &mut files).map(|_| files)
        })
        .await??;
        files.sort();

        tracing::debug!("Discovered {} files in {:?}", files.len(), started.elapsed());
        Ok(files)
    }

    /// ファイルを読み込んで解析する（失敗した場合は警告して `None`）
    pub async fn load(&self, path: &Path) -> Option<SourceFile> {
        let uri = match Url::from_file_path(path) {
            Ok(uri) => uri,
            Err(()) => {
                tracing::warn!("Cannot convert {} to a URI", path.display());
                return None;
            }
        };
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        match SourceFile::parse(uri, text) {
            Ok(file) => Some(file.with_root(self.root.clone())),
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// 複数ファイルを読み込む（失敗したファイルは除外）
    pub async fn load_all(&self, paths: &[PathBuf]) -> Vec<SourceFile> {
        let started = Instant::now();
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(file) = self.load(path).await {
                files.push(file);
            }
        }
        tracing::debug!(
            "Loaded {}/{} files in {:?}",
            files.len(),
            paths.len(),
            started.elapsed()
        );
        files
    }
}

/// ディレクトリを再帰的に走査し、matcherに一致するファイルを集める
fn collect_files(
    dir: &Path,
    root: &Path,
    matcher: &PathMatcher,
    files: &mut Vec<PathBuf>,
) -> Result<(), ScanError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ScanError::Io { path, source }
    };

    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let path = entry.path();
        let relative_path = path.strip_prefix(root).unwrap_or(&path);
        let file_type = entry.file_type().map_err(io_error(&path))?;

        if file_type.is_dir() {
            if matcher.should_traverse_dir(relative_path) {
                collect_files(&path, root, matcher, files)?;
            }
        } else if file_type.is_file() && matcher.should_include(relative_path) {
            files.push(path);
        }
    }
    Ok(())
}
