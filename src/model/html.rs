use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Location, Url};

use super::span::Span;

/// HTML内のカスタム要素の開始タグ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
    /// タグ名（小文字）
    pub tag: String,
    pub uri: Url,
    /// タグ名の位置
    pub span: Span,
}

impl TagUsage {
    pub fn location(&self) -> Location {
        Location {
            uri: self.uri.clone(),
            range: self.span.to_lsp_range(),
        }
    }
}
