use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Position, Range};

use crate::util::byte_col_to_utf16_col;

/// 位置情報の統一型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// 幅ゼロのスパン
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// tree-sitterノードの範囲から作成（列はUTF-16コードユニット）
    pub fn from_node(node: &tree_sitter::Node, source: &str) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self::new(
            start.row as u32,
            byte_col_to_utf16_col(source, node.start_byte(), start.column),
            end.row as u32,
            byte_col_to_utf16_col(source, node.end_byte(), end.column),
        )
    }

    /// LSP Range に変換
    pub fn to_lsp_range(&self) -> Range {
        Range {
            start: Position {
                line: self.start_line,
                character: self.start_col,
            },
            end: Position {
                line: self.end_line,
                character: self.end_col,
            },
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::point(0, 0)
    }
}
