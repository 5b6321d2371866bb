use tree_sitter::Node;

use super::member::extract_members;
use super::parser::SourceFile;
use super::syntax::{
    base_class_name, call_arguments, check_depth, checked_text, class_name, is_string_literal,
    method_call, string_value, FileSymbols, NodeKind,
};
use crate::error::AnalyzerError;
use crate::model::{Controller, Span};
use crate::util::byte_col_to_utf16_col;

/// ファイル内のコントローラーを抽出する
///
/// クラス宣言・名前付きクラス式がそれぞれ候補になり、
/// `angular.module(...).controller('name', Class)` で登録名が付け替えられる。
/// 解析に失敗したファイルは空として扱う。
pub fn parse_controllers(file: &SourceFile) -> Vec<Controller> {
    if !file.language.is_script() {
        return Vec::new();
    }
    match extract(file) {
        Ok(controllers) => controllers,
        Err(e) => {
            tracing::warn!("Skipping controllers in {}: {}", file.uri, e);
            Vec::new()
        }
    }
}

fn extract(file: &SourceFile) -> Result<Vec<Controller>, AnalyzerError> {
    let root = file.tree.root_node();
    let symbols = FileSymbols::collect(root, &file.text, file.uri.as_str())?;
    let mut collector = ControllerCollector {
        file,
        symbols,
        controllers: Vec::new(),
        registrations: Vec::new(),
    };
    collector.visit(root, 0)?;
    Ok(collector.finish())
}

struct ControllerCollector<'a, 't> {
    file: &'a SourceFile,
    symbols: FileSymbols<'t>,
    controllers: Vec<Controller>,
    /// (登録名, クラス名)
    registrations: Vec<(String, String)>,
}

impl<'a, 't> ControllerCollector<'a, 't> {
    fn visit(&mut self, node: Node<'t>, depth: usize) -> Result<(), AnalyzerError> {
        check_depth(depth, self.file.uri.as_str())?;

        match NodeKind::of(&node) {
            NodeKind::ClassDeclaration => self.visit_class(node)?,
            NodeKind::CallExpression => self.visit_call(node),
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }

    fn visit_class(&mut self, node: Node<'t>) -> Result<(), AnalyzerError> {
        let source = self.file.text.as_str();
        let Some(name) = class_name(node, source) else {
            return Ok(());
        };
        let Some(body) = node.child_by_field_name("body") else {
            return Ok(());
        };
        let name_span = match node.child_by_field_name("name") {
            Some(name_node) => {
                checked_text(name_node, source, self.file.uri.as_str())?;
                Span::from_node(&name_node, source)
            }
            None => Span::from_node(&node, source),
        };
        // メンバーリストの位置は `{` の直後
        let start = body.start_position();
        let anchor_col = byte_col_to_utf16_col(source, body.start_byte() + 1, start.column + 1);

        self.controllers.push(Controller {
            name: name.clone(),
            class_name: name.clone(),
            uri: self.file.uri.clone(),
            span: Span::point(start.row as u32, anchor_col),
            name_span,
            base_class_name: base_class_name(node, source),
            base: None,
            members: extract_members(node, &name, source),
        });
        Ok(())
    }

    /// `<module>.controller('name', Class)` の登録を記録する
    fn visit_call(&mut self, node: Node<'t>) {
        let source = self.file.text.as_str();
        let Some((method, object)) = method_call(node, source) else {
            return;
        };
        if method != "controller" || !self.symbols.is_module_chain(object, source) {
            return;
        }
        let args = call_arguments(node);
        let (Some(name), Some(target)) = (args.first(), args.get(1)) else {
            return;
        };
        if !is_string_literal(*name) {
            return;
        }
        let Some(class) = registered_class(*target, source) else {
            return;
        };
        self.registrations.push((string_value(*name, source), class));
    }

    fn finish(mut self) -> Vec<Controller> {
        for (registered, class) in std::mem::take(&mut self.registrations) {
            if registered == class {
                continue;
            }
            match self
                .controllers
                .iter_mut()
                .find(|c| c.class_name == class && c.name == c.class_name)
            {
                Some(controller) => {
                    tracing::debug!("Controller {} registered as {}", class, registered);
                    controller.name = registered;
                }
                None => {
                    tracing::debug!(
                        "Registration {} refers to {} which is not declared in {}",
                        registered,
                        class,
                        self.file.uri
                    );
                }
            }
        }
        self.controllers
    }
}

/// 登録対象のクラス名（DI配列の場合は最後の要素）
fn registered_class(node: Node, source: &str) -> Option<String> {
    match NodeKind::of(&node) {
        NodeKind::Identifier => Some(super::syntax::node_text(node, source).to_string()),
        NodeKind::Array => {
            let last = node.named_child(node.named_child_count().checked_sub(1)?)?;
            registered_class(last, source)
        }
        _ => None,
    }
}
