use tree_sitter::Node;

use super::parser::SourceFile;
use super::syntax::{check_depth, find_child_kind, named_children, node_text, NodeKind};
use crate::error::AnalyzerError;
use crate::model::{Span, TagUsage};

/// HTMLファイル内のカスタム要素（タグ名に `-` を含む）の開始タグを抽出する
pub fn parse_tag_usages(file: &SourceFile) -> Vec<TagUsage> {
    if file.language.is_script() {
        return Vec::new();
    }
    let mut usages = Vec::new();
    match visit(file, file.tree.root_node(), 0, &mut usages) {
        Ok(()) => usages,
        Err(e) => {
            tracing::warn!("Skipping tag usages in {}: {}", file.uri, e);
            Vec::new()
        }
    }
}

fn visit(file: &SourceFile, node: Node, depth: usize, usages: &mut Vec<TagUsage>) -> Result<(), AnalyzerError> {
    check_depth(depth, file.uri.as_str())?;

    match NodeKind::of(&node) {
        NodeKind::StartTag | NodeKind::SelfClosingTag => {
            if let Some(name) = find_child_kind(node, "tag_name") {
                let tag = node_text(name, &file.text).to_ascii_lowercase();
                if tag.contains('-') {
                    usages.push(TagUsage {
                        tag,
                        uri: file.uri.clone(),
                        span: Span::from_node(&name, &file.text),
                    });
                }
            }
            return Ok(());
        }
        _ => {}
    }

    for child in named_children(node) {
        visit(file, child, depth + 1, usages)?;
    }
    Ok(())
}
