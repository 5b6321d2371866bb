use std::collections::HashMap;

use phf::phf_map;
use tree_sitter::Node;

use crate::error::AnalyzerError;

/// 走査の最大深さ（これを超えるファイルは解析対象外）
pub const MAX_DEPTH: usize = 512;

/// 抽出処理が扱う構文ノードの種類
///
/// tree-sitterの種類名は文法ごとに異なるため、ここで閉じた集合に正規化する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    ClassDeclaration,
    ClassBody,
    ClassHeritage,
    CallExpression,
    NewExpression,
    MemberExpression,
    AssignmentExpression,
    VariableDeclarator,
    ImportStatement,
    MethodDefinition,
    FieldDefinition,
    ArrowFunction,
    FunctionExpression,
    Object,
    Pair,
    Array,
    String,
    TemplateString,
    Identifier,
    This,
    StartTag,
    SelfClosingTag,
    TagName,
    Error,
    Other,
}

static NODE_KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "class_declaration" => NodeKind::ClassDeclaration,
    "abstract_class_declaration" => NodeKind::ClassDeclaration,
    "class" => NodeKind::ClassDeclaration,
    "class_body" => NodeKind::ClassBody,
    "class_heritage" => NodeKind::ClassHeritage,
    "call_expression" => NodeKind::CallExpression,
    "new_expression" => NodeKind::NewExpression,
    "member_expression" => NodeKind::MemberExpression,
    "assignment_expression" => NodeKind::AssignmentExpression,
    "variable_declarator" => NodeKind::VariableDeclarator,
    "import_statement" => NodeKind::ImportStatement,
    "method_definition" => NodeKind::MethodDefinition,
    "public_field_definition" => NodeKind::FieldDefinition,
    "field_definition" => NodeKind::FieldDefinition,
    "arrow_function" => NodeKind::ArrowFunction,
    "function_expression" => NodeKind::FunctionExpression,
    "function" => NodeKind::FunctionExpression,
    "object" => NodeKind::Object,
    "pair" => NodeKind::Pair,
    "array" => NodeKind::Array,
    "string" => NodeKind::String,
    "template_string" => NodeKind::TemplateString,
    "identifier" => NodeKind::Identifier,
    "type_identifier" => NodeKind::Identifier,
    "this" => NodeKind::This,
    "start_tag" => NodeKind::StartTag,
    "self_closing_tag" => NodeKind::SelfClosingTag,
    "tag_name" => NodeKind::TagName,
    "ERROR" => NodeKind::Error,
};

impl NodeKind {
    /// ノードの種類を判定する（キーワードトークンなど名前なしノードは `Other`）
    pub fn of(node: &Node) -> Self {
        if node.is_error() {
            return NodeKind::Error;
        }
        if !node.is_named() {
            return NodeKind::Other;
        }
        NODE_KINDS.get(node.kind()).copied().unwrap_or(NodeKind::Other)
    }
}

/// ASTノードからソーステキストを取得する
pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// UTF-8として検証したノードのテキスト
pub fn checked_text<'s>(node: Node, source: &'s str, uri: &str) -> Result<&'s str, AnalyzerError> {
    node.utf8_text(source.as_bytes())
        .map_err(|source| AnalyzerError::Utf8 {
            file: uri.to_string(),
            source,
        })
}

/// 文字列ノードから値を取得する（クォートを除去）
pub fn string_value(node: Node, source: &str) -> String {
    node_text(node, source)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// 文字列リテラル（式展開を含まないテンプレート文字列を含む）かどうか
pub fn is_string_literal(node: Node) -> bool {
    match NodeKind::of(&node) {
        NodeKind::String => true,
        NodeKind::TemplateString => node.named_child_count() == 0,
        _ => false,
    }
}

/// プロパティキーの名前を取得する（識別子・文字列キーに対応）
pub fn property_name(node: Node, source: &str) -> String {
    string_value(node, source)
}

/// 型注釈ノード（`: T`）から型のテキストを取得する
pub fn type_annotation_text(node: Option<Node>, source: &str) -> Option<String> {
    let annotation = node?;
    let text = node_text(annotation, source);
    let text = text.strip_prefix(':').unwrap_or(text).trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// 名前なしの子トークン（`get`, `static` 等）を持つかどうか
pub fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token);
    found
}

/// 指定種類の子ノードを探す
pub fn find_child_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// コメントを除いた名前付きの子ノード
pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let nodes: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    nodes
}

/// 呼び出し式の引数ノード
pub fn call_arguments(node: Node) -> Vec<Node> {
    let Some(args) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    let nodes: Vec<Node> = args
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    nodes
}

/// メンバー呼び出し `obj.method(...)` のメソッド名とオブジェクトを返す
pub fn method_call<'t>(node: Node<'t>, source: &str) -> Option<(String, Node<'t>)> {
    let callee = node.child_by_field_name("function")?;
    if NodeKind::of(&callee) != NodeKind::MemberExpression {
        return None;
    }
    let property = callee.child_by_field_name("property")?;
    let object = callee.child_by_field_name("object")?;
    Some((node_text(property, source).to_string(), object))
}

/// 深さ制限付きで子ノードを走査するためのガード
pub fn check_depth(depth: usize, uri: &str) -> Result<(), AnalyzerError> {
    if depth > MAX_DEPTH {
        return Err(AnalyzerError::TooDeep {
            file: uri.to_string(),
            depth: MAX_DEPTH,
        });
    }
    Ok(())
}

/// ファイル内のトップレベルな名前の束縛
///
/// `const x = ...` の初期化式、クラス宣言、デフォルトインポートを名前で引けるようにする。
#[derive(Default)]
pub struct FileSymbols<'t> {
    variables: HashMap<String, Node<'t>>,
    classes: HashMap<String, Node<'t>>,
    imports: HashMap<String, String>,
}

impl<'t> FileSymbols<'t> {
    pub fn collect(root: Node<'t>, source: &str, uri: &str) -> Result<Self, AnalyzerError> {
        let mut symbols = Self::default();
        symbols.visit(root, source, uri, 0)?;
        Ok(symbols)
    }

    fn visit(&mut self, node: Node<'t>, source: &str, uri: &str, depth: usize) -> Result<(), AnalyzerError> {
        check_depth(depth, uri)?;

        match NodeKind::of(&node) {
            NodeKind::VariableDeclarator => {
                if let (Some(name), Some(value)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("value"),
                ) {
                    if NodeKind::of(&name) == NodeKind::Identifier {
                        self.variables
                            .entry(node_text(name, source).to_string())
                            .or_insert(value);
                    }
                }
            }
            NodeKind::ClassDeclaration => {
                if let Some(name) = class_name(node, source) {
                    self.classes.entry(name).or_insert(node);
                }
            }
            NodeKind::ImportStatement => {
                if let Some((name, path)) = default_import(node, source) {
                    self.imports.insert(name, path);
                }
            }
            NodeKind::ClassBody
            | NodeKind::ClassHeritage
            | NodeKind::CallExpression
            | NodeKind::NewExpression
            | NodeKind::MemberExpression
            | NodeKind::AssignmentExpression
            | NodeKind::MethodDefinition
            | NodeKind::FieldDefinition
            | NodeKind::ArrowFunction
            | NodeKind::FunctionExpression
            | NodeKind::Object
            | NodeKind::Pair
            | NodeKind::Array
            | NodeKind::String
            | NodeKind::TemplateString
            | NodeKind::Identifier
            | NodeKind::This
            | NodeKind::StartTag
            | NodeKind::SelfClosingTag
            | NodeKind::TagName
            | NodeKind::Error
            | NodeKind::Other => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, source, uri, depth + 1)?;
        }
        Ok(())
    }

    /// 変数の初期化式
    pub fn variable(&self, name: &str) -> Option<Node<'t>> {
        self.variables.get(name).copied()
    }

    pub fn class(&self, name: &str) -> Option<Node<'t>> {
        self.classes.get(name).copied()
    }

    /// デフォルトインポートの取得元パス
    pub fn import_path(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(String::as_str)
    }

    /// 識別子を辿って値ノードを解決する（識別子以外はそのまま返す）
    pub fn resolve_value(&self, node: Node<'t>, source: &str) -> Node<'t> {
        let mut current = node;
        // 循環参照（`const a = b; const b = a;`）に備えて回数を制限する
        for _ in 0..8 {
            if NodeKind::of(&current) != NodeKind::Identifier {
                break;
            }
            match self.variable(node_text(current, source)) {
                Some(value) => current = value,
                None => break,
            }
        }
        current
    }

    /// 文字列リテラル、または文字列定数を指す識別子の値
    pub fn string_constant(&self, node: Node<'t>, source: &str) -> Option<String> {
        let value = self.resolve_value(node, source);
        if is_string_literal(value) {
            Some(string_value(value, source))
        } else {
            None
        }
    }

    /// `angular.module(...)` を起点とするメソッドチェーン（またはそれを束縛した変数）かどうか
    pub fn is_module_chain(&self, node: Node<'t>, source: &str) -> bool {
        let mut current = node;
        for _ in 0..MAX_DEPTH {
            match NodeKind::of(&current) {
                NodeKind::CallExpression => {
                    let Some(callee) = current.child_by_field_name("function") else {
                        return false;
                    };
                    let callee_text: String = node_text(callee, source)
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect();
                    if callee_text == "angular.module" {
                        return true;
                    }
                    if NodeKind::of(&callee) != NodeKind::MemberExpression {
                        return false;
                    }
                    match callee.child_by_field_name("object") {
                        Some(object) => current = object,
                        None => return false,
                    }
                }
                NodeKind::Identifier => match self.variable(node_text(current, source)) {
                    Some(value) if value != current => current = value,
                    _ => return false,
                },
                _ => return false,
            }
        }
        false
    }
}

/// クラス名を取得する（無名クラス式は代入先の変数名）
pub fn class_name(node: Node, source: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, source).to_string());
    }
    let parent = node.parent()?;
    if NodeKind::of(&parent) == NodeKind::VariableDeclarator {
        let name = parent.child_by_field_name("name")?;
        if NodeKind::of(&name) == NodeKind::Identifier {
            return Some(node_text(name, source).to_string());
        }
    }
    None
}

/// extends句の基底クラス名を取得する
///
/// - TypeScript: `class_heritage > extends_clause(value)`
/// - JavaScript: `class_heritage > expression`
/// `ns.BaseCtrl` のようなメンバー式は末尾の名前を使う
pub fn base_class_name(node: Node, source: &str) -> Option<String> {
    let heritage = find_child_kind(node, "class_heritage")?;
    let value = match find_child_kind(heritage, "extends_clause") {
        Some(extends) => extends.child_by_field_name("value")?,
        None => heritage.named_child(0)?,
    };
    let value = if NodeKind::of(&value) == NodeKind::MemberExpression {
        value.child_by_field_name("property")?
    } else {
        value
    };
    match NodeKind::of(&value) {
        NodeKind::Identifier => Some(node_text(value, source).to_string()),
        _ => {
            let text = node_text(value, source);
            (!text.is_empty() && text.chars().all(crate::util::is_identifier_char))
                .then(|| text.to_string())
        }
    }
}

/// `import Name from 'path'` の名前とパス
fn default_import(node: Node, source: &str) -> Option<(String, String)> {
    let clause = find_child_kind(node, "import_clause")?;
    let name = find_child_kind(clause, "identifier")?;
    let path = node
        .child_by_field_name("source")
        .or_else(|| find_child_kind(node, "string"))?;
    Some((node_text(name, source).to_string(), string_value(path, source)))
}
