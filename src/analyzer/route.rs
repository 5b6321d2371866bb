use tree_sitter::Node;

use super::parser::SourceFile;
use super::syntax::{
    call_arguments, check_depth, method_call, named_children, property_name,
    FileSymbols, NodeKind,
};
use crate::error::AnalyzerError;
use crate::model::{RouteDeclaration, RouteSource, Span};
use crate::util::kebab_to_camel;

/// ルートファイルからルート宣言を抽出する
///
/// - `$routeProvider.when(path, config)` / `.otherwise(config)`
/// - `$stateProvider.state(name, config)` / `.state(config)`
///
/// 設定オブジェクトが `component: 'name'` またはカスタム要素で始まる
/// `template` を持つ場合のみルートとして扱う。
pub fn parse_routes(file: &SourceFile) -> Vec<RouteDeclaration> {
    if !file.language.is_script() {
        return Vec::new();
    }
    match extract(file) {
        Ok(routes) => routes,
        Err(e) => {
            tracing::warn!("Skipping routes in {}: {}", file.uri, e);
            Vec::new()
        }
    }
}

fn extract(file: &SourceFile) -> Result<Vec<RouteDeclaration>, AnalyzerError> {
    let root = file.tree.root_node();
    let symbols = FileSymbols::collect(root, &file.text, file.uri.as_str())?;
    let mut routes = Vec::new();
    visit(file, &symbols, root, 0, &mut routes)?;
    Ok(routes)
}

fn visit<'t>(
    file: &SourceFile,
    symbols: &FileSymbols<'t>,
    node: Node<'t>,
    depth: usize,
    routes: &mut Vec<RouteDeclaration>,
) -> Result<(), AnalyzerError> {
    check_depth(depth, file.uri.as_str())?;

    if NodeKind::of(&node) == NodeKind::CallExpression {
        if let Some(route) = route_call(file, symbols, node) {
            routes.push(route);
        }
    }

    for child in named_children(node) {
        visit(file, symbols, child, depth + 1, routes)?;
    }
    Ok(())
}

fn route_call<'t>(file: &SourceFile, symbols: &FileSymbols<'t>, node: Node<'t>) -> Option<RouteDeclaration> {
    let source = file.text.as_str();
    let (method, _) = method_call(node, source)?;
    let args = call_arguments(node);

    let (source_kind, path, config) = match (method.as_str(), args.as_slice()) {
        ("when", [path, config, ..]) => (
            RouteSource::RouteProvider,
            symbols.string_constant(*path, source),
            *config,
        ),
        ("otherwise", [config, ..]) => (RouteSource::RouteProvider, None, *config),
        ("state", [name, config, ..]) => (
            RouteSource::StateProvider,
            symbols.string_constant(*name, source),
            *config,
        ),
        ("state", [config]) => (RouteSource::StateProvider, None, *config),
        _ => return None,
    };

    let config = symbols.resolve_value(config, source);
    if NodeKind::of(&config) != NodeKind::Object {
        return None;
    }

    let mut component = None;
    let mut template_tag = None;
    let mut state_name = None;
    for pair in named_children(config) {
        if NodeKind::of(&pair) != NodeKind::Pair {
            continue;
        }
        let (Some(key), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };
        match property_name(key, source).as_str() {
            "component" => component = symbols.string_constant(value, source),
            "template" => {
                template_tag = symbols
                    .string_constant(value, source)
                    .and_then(|t| first_custom_tag(&t).map(kebab_to_camel));
            }
            "name" => state_name = symbols.string_constant(value, source),
            _ => {}
        }
    }

    let component = component.or(template_tag)?;
    Some(RouteDeclaration {
        uri: file.uri.clone(),
        span: Span::from_node(&config, source),
        path: path.or(state_name),
        component,
        source: source_kind,
    })
}

/// テンプレート先頭のカスタム要素名（`-` を含むタグ名）
pub fn first_custom_tag(template: &str) -> Option<&str> {
    let start = template.find('<')? + 1;
    let rest = &template[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let tag = &rest[..end];
    if tag.contains('-') { Some(tag) } else { None }
}
