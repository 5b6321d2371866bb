use tree_sitter::Node;

use super::parser::SourceFile;
use super::syntax::{
    call_arguments, check_depth, class_name, is_string_literal, method_call, named_children,
    node_text, property_name, string_value, FileSymbols, NodeKind,
};
use crate::error::AnalyzerError;
use crate::model::{Artifact, Binding, BindingKind, Component, Controller, Span};
use crate::util::{camel_to_kebab, resolve_reference};

/// コンポーネントのデフォルトのcontrollerAs
pub const DEFAULT_CONTROLLER_AS: &str = "$ctrl";

/// ファイル内のコンポーネント登録を抽出する
///
/// `angular.module(...).component(name, options)` を認識し、
/// コントローラー参照は `known_controllers` に対して解決する。
pub fn parse_components(file: &SourceFile, known_controllers: &[Controller]) -> Vec<Component> {
    if !file.language.is_script() {
        return Vec::new();
    }
    match extract(file, known_controllers) {
        Ok(components) => components,
        Err(e) => {
            tracing::warn!("Skipping components in {}: {}", file.uri, e);
            Vec::new()
        }
    }
}

fn extract(file: &SourceFile, known_controllers: &[Controller]) -> Result<Vec<Component>, AnalyzerError> {
    let root = file.tree.root_node();
    let symbols = FileSymbols::collect(root, &file.text, file.uri.as_str())?;
    let mut collector = ComponentCollector {
        file,
        symbols,
        components: Vec::new(),
    };
    collector.visit(root, 0)?;

    let mut components = collector.components;
    for component in &mut components {
        component.controller = bind_controller(component, known_controllers);
    }
    Ok(components)
}

/// コントローラー参照を解決する（登録名 → クラス名の順、最初の一致）
pub fn bind_controller(
    component: &Component,
    controllers: &[Controller],
) -> Option<crate::model::EntityKey> {
    if let Some(name) = &component.controller_name {
        if let Some(c) = controllers.iter().find(|c| &c.name == name) {
            return Some(c.key());
        }
    }
    if let Some(class_name) = &component.controller_class_name {
        if let Some(c) = controllers.iter().find(|c| &c.class_name == class_name) {
            return Some(c.key());
        }
    }
    None
}

/// コンポーネントのオプション1件（キー、値）
struct OptionEntry<'t> {
    key: String,
    value: Node<'t>,
}

struct ComponentCollector<'a, 't> {
    file: &'a SourceFile,
    symbols: FileSymbols<'t>,
    components: Vec<Component>,
}

impl<'a, 't> ComponentCollector<'a, 't> {
    fn source(&self) -> &'a str {
        self.file.text.as_str()
    }

    fn visit(&mut self, node: Node<'t>, depth: usize) -> Result<(), AnalyzerError> {
        check_depth(depth, self.file.uri.as_str())?;

        if NodeKind::of(&node) == NodeKind::CallExpression {
            if let Some(component) = self.visit_call(node) {
                tracing::debug!("Found component {} in {}", component.name, self.file.uri);
                self.components.push(component);
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }

    fn visit_call(&self, node: Node<'t>) -> Option<Component> {
        let source = self.source();
        let (method, object) = method_call(node, source)?;
        if method != "component" || !self.symbols.is_module_chain(object, source) {
            return None;
        }

        let args = call_arguments(node);
        let name_node = *args.first()?;
        let name = self.symbols.string_constant(name_node, source)?;
        let options = args
            .get(1)
            .map(|n| self.options(*n))
            .unwrap_or_default();

        let mut component = Component {
            html_name: camel_to_kebab(&name),
            name,
            uri: self.file.uri.clone(),
            span: Span::from_node(&name_node, source),
            controller: None,
            controller_name: None,
            controller_class_name: None,
            controller_as: DEFAULT_CONTROLLER_AS.to_string(),
            bindings: Vec::new(),
            template: None,
            route: None,
        };

        let mut controller_as = None;
        let mut alias_from_controller = None;
        for entry in &options {
            match entry.key.as_str() {
                "bindings" => component.bindings = self.bindings(entry.value),
                "controller" => {
                    let reference = self.controller_reference(entry.value, 0);
                    match reference {
                        Some(ControllerReference::Class(class)) => {
                            component.controller_class_name = Some(class);
                        }
                        Some(ControllerReference::Registered { name, alias }) => {
                            component.controller_name = Some(name);
                            alias_from_controller = alias;
                        }
                        None => {}
                    }
                }
                "controllerAs" => controller_as = self.symbols.string_constant(entry.value, source),
                "template" => {
                    if let Some(template) = self.template(entry.value) {
                        component.template = Some(template);
                    }
                }
                "templateUrl" => {
                    // template が既にあればそちらを優先
                    if component.template.is_none() {
                        component.template = self.template_url(entry.value);
                    }
                }
                "$routeConfig" => component.route = self.route_config(entry.value),
                _ => {}
            }
        }
        if let Some(alias) = controller_as.or(alias_from_controller) {
            component.controller_as = alias;
        }

        Some(component)
    }

    /// オプション式をキーと値の列に展開する
    ///
    /// - オブジェクトリテラル（または束縛された識別子）
    /// - `new Options()`: クラスのフィールドとコンストラクタ内の `this.key = value`
    fn options(&self, node: Node<'t>) -> Vec<OptionEntry<'t>> {
        let source = self.source();
        let value = self.symbols.resolve_value(node, source);
        match NodeKind::of(&value) {
            NodeKind::Object => self.object_entries(value),
            NodeKind::NewExpression => {
                let Some(constructor) = value.child_by_field_name("constructor") else {
                    return Vec::new();
                };
                match self.symbols.class(node_text(constructor, source)) {
                    Some(class) => self.class_entries(class),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn object_entries(&self, object: Node<'t>) -> Vec<OptionEntry<'t>> {
        let source = self.source();
        named_children(object)
            .into_iter()
            .filter_map(|child| match NodeKind::of(&child) {
                NodeKind::Pair => {
                    let key = child.child_by_field_name("key")?;
                    let value = child.child_by_field_name("value")?;
                    Some(OptionEntry {
                        key: property_name(key, source),
                        value,
                    })
                }
                // `{ bindings }` のような省略記法
                _ if child.kind() == "shorthand_property_identifier" => {
                    let key = node_text(child, source).to_string();
                    let value = self.symbols.variable(&key)?;
                    Some(OptionEntry { key, value })
                }
                _ => None,
            })
            .collect()
    }

    fn class_entries(&self, class: Node<'t>) -> Vec<OptionEntry<'t>> {
        let source = self.source();
        let Some(body) = class.child_by_field_name("body") else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        for member in named_children(body) {
            match NodeKind::of(&member) {
                NodeKind::FieldDefinition => {
                    let name = member
                        .child_by_field_name("name")
                        .or_else(|| member.child_by_field_name("property"));
                    if let (Some(name), Some(value)) = (name, member.child_by_field_name("value")) {
                        entries.push(OptionEntry {
                            key: property_name(name, source),
                            value,
                        });
                    }
                }
                NodeKind::MethodDefinition => {
                    let is_constructor = member
                        .child_by_field_name("name")
                        .is_some_and(|n| node_text(n, source) == "constructor");
                    if let (true, Some(block)) = (is_constructor, member.child_by_field_name("body")) {
                        self.this_assignments(block, &mut entries, 0);
                    }
                }
                _ => {}
            }
        }
        entries
    }

    /// コンストラクタ本体の `this.key = value`
    fn this_assignments(&self, node: Node<'t>, entries: &mut Vec<OptionEntry<'t>>, depth: usize) {
        if depth > 16 {
            return;
        }
        let source = self.source();
        for child in named_children(node) {
            match NodeKind::of(&child) {
                NodeKind::AssignmentExpression => {
                    let (Some(left), Some(right)) = (
                        child.child_by_field_name("left"),
                        child.child_by_field_name("right"),
                    ) else {
                        continue;
                    };
                    if NodeKind::of(&left) != NodeKind::MemberExpression {
                        continue;
                    }
                    let is_this = left
                        .child_by_field_name("object")
                        .is_some_and(|o| NodeKind::of(&o) == NodeKind::This);
                    if let (true, Some(property)) = (is_this, left.child_by_field_name("property")) {
                        entries.push(OptionEntry {
                            key: node_text(property, source).to_string(),
                            value: right,
                        });
                    }
                }
                // 関数の中までは追わない
                NodeKind::ArrowFunction | NodeKind::FunctionExpression | NodeKind::ClassDeclaration => {}
                _ => self.this_assignments(child, entries, depth + 1),
            }
        }
    }

    /// `bindings: { title: '<', onChange: '&?change' }`
    fn bindings(&self, node: Node<'t>) -> Vec<Binding> {
        let source = self.source();
        let value = self.symbols.resolve_value(node, source);
        if NodeKind::of(&value) != NodeKind::Object {
            return Vec::new();
        }

        self.object_entries(value)
            .into_iter()
            .filter_map(|entry| {
                let declaration = self.symbols.string_constant(entry.value, source)?;
                let key_node = entry.value.parent()?.child_by_field_name("key");
                let span = key_node
                    .map(|k| Span::from_node(&k, source))
                    .unwrap_or_else(|| Span::from_node(&entry.value, source));
                parse_binding(&entry.key, &declaration, span)
            })
            .collect()
    }

    fn controller_reference(&self, node: Node<'t>, depth: usize) -> Option<ControllerReference> {
        let source = self.source();
        if depth > 4 {
            return None;
        }
        if let Some(text) = self.symbols.string_constant(node, source) {
            return Some(ControllerReference::parse(&text));
        }
        match NodeKind::of(&node) {
            NodeKind::Identifier => Some(ControllerReference::Class(node_text(node, source).to_string())),
            // DI配列: ['$scope', function(...) {}] / ['$scope', Ctrl]
            NodeKind::Array => {
                let last = *named_children(node).last()?;
                self.controller_reference(last, depth + 1)
            }
            NodeKind::ClassDeclaration => class_name(node, source).map(ControllerReference::Class),
            _ => None,
        }
    }

    fn template(&self, node: Node<'t>) -> Option<Artifact> {
        let source = self.source();
        let value = self.symbols.resolve_value(node, source);
        match NodeKind::of(&value) {
            NodeKind::String | NodeKind::TemplateString => Some(Artifact::Inline {
                uri: self.file.uri.clone(),
                body: string_value(value, source),
                span: Span::from_node(&value, source),
            }),
            // template: require('./widget.html')
            NodeKind::CallExpression => {
                let callee = value.child_by_field_name("function")?;
                if node_text(callee, source) != "require" {
                    return None;
                }
                let path = *call_arguments(value).first()?;
                if !is_string_literal(path) {
                    return None;
                }
                self.external(&string_value(path, source))
            }
            _ => None,
        }
    }

    fn template_url(&self, node: Node<'t>) -> Option<Artifact> {
        let url = self.symbols.string_constant(node, self.source())?;
        self.external(&url)
    }

    fn external(&self, reference: &str) -> Option<Artifact> {
        let uri = resolve_reference(&self.file.uri, reference, self.file.root.as_deref())?;
        Some(Artifact::External {
            uri,
            span: Span::default(),
        })
    }

    /// `$routeConfig`: 配列リテラルはインライン、インポートされた識別子は外部ファイル
    fn route_config(&self, node: Node<'t>) -> Option<Artifact> {
        let source = self.source();
        let value = self.symbols.resolve_value(node, source);
        if NodeKind::of(&value) == NodeKind::Array {
            return Some(Artifact::Inline {
                uri: self.file.uri.clone(),
                body: node_text(value, source).to_string(),
                span: Span::from_node(&value, source),
            });
        }
        if NodeKind::of(&value) != NodeKind::Identifier {
            return None;
        }
        let import = self.symbols.import_path(node_text(value, source))?;
        self.external(&with_extension_of(import, &self.file.uri))
    }
}

/// コントローラー指定の形式
#[derive(Debug, PartialEq)]
enum ControllerReference {
    /// `controller: GreetController`
    Class(String),
    /// `controller: 'greetCtrl'` / `controller: 'greetCtrl as vm'`
    Registered { name: String, alias: Option<String> },
}

impl ControllerReference {
    fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let name = parts.next().unwrap_or_default().to_string();
        let alias = match (parts.next(), parts.next()) {
            (Some("as"), Some(alias)) => Some(alias.to_string()),
            _ => None,
        };
        ControllerReference::Registered { name, alias }
    }
}

/// `'<?alias'` 形式のバインディング宣言を解析する
pub fn parse_binding(member: &str, declaration: &str, span: Span) -> Option<Binding> {
    let declaration = declaration.trim();
    let mut chars = declaration.chars();
    let kind = BindingKind::from_symbol(chars.next()?)?;
    let rest = chars.as_str().trim_start();
    let (optional, alias) = match rest.strip_prefix('?') {
        Some(alias) => (true, alias.trim()),
        None => (false, rest.trim()),
    };
    let attribute = if alias.is_empty() { member } else { alias };

    Some(Binding {
        name: member.to_string(),
        html_name: camel_to_kebab(attribute),
        kind,
        optional,
        span,
    })
}

/// 拡張子のないインポートパスに宣言ファイルと同じ拡張子を付ける
fn with_extension_of(import: &str, declaring: &tower_lsp::lsp_types::Url) -> String {
    let file_name = import.rsplit('/').next().unwrap_or(import);
    if file_name.contains('.') {
        return import.to_string();
    }
    let ext = declaring.path().rsplit('.').next().unwrap_or("ts");
    format!("{}.{}", import, ext)
}
