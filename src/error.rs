use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// アナライザー解析エラー
///
/// 抽出処理の境界を越えて伝播することはない。ファイル単位で捕捉され、
/// そのファイルは空のエンティティ集合として扱われる。
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Failed to load grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Syntax tree of {file} is nested deeper than {depth} levels")]
    TooDeep { file: String, depth: usize },

    #[error("Invalid UTF-8 in {file}: {source}")]
    Utf8 {
        file: String,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// ファイル探索エラー
///
/// 発生した場合はフルリフレッシュ全体が失敗し、既存のインデックスは保持される。
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Workspace root is not set")]
    MissingRoot,

    #[error("Scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
