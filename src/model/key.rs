use std::fmt;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Url;

use super::span::Span;

/// コンポーネント・コントローラーの同一性キー（宣言ファイル + 宣言開始位置）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub uri: Url,
    pub line: u32,
    pub col: u32,
}

impl EntityKey {
    pub fn new(uri: &Url, span: &Span) -> Self {
        Self {
            uri: uri.clone(),
            line: span.start_line,
            col: span.start_col,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.uri, self.line + 1, self.col + 1)
    }
}
