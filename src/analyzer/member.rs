use tree_sitter::Node;

use super::syntax::{
    find_child_kind, has_token, named_children, node_text, type_annotation_text, NodeKind,
};
use crate::model::{Member, MemberKind, Parameter, Span};

const ANY: &str = "any";

/// クラス本体からコントローラーのメンバーを抽出する
///
/// 対象:
/// - コンストラクタのパラメータプロパティ（アクセス修飾子 / readonly 付き）
/// - フィールド宣言
/// - getter（プロパティとして）
/// - メソッド
/// - アロー関数・関数式を値に持つフィールド（メソッドとして）
///
/// setter, static, `#private`, コンストラクタ自体は対象外
pub fn extract_members(class: Node, owner: &str, source: &str) -> Vec<Member> {
    let Some(body) = class.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut members = Vec::new();
    for child in named_children(body) {
        match NodeKind::of(&child) {
            NodeKind::MethodDefinition => visit_method(child, owner, source, &mut members),
            NodeKind::FieldDefinition => visit_field(child, owner, source, &mut members),
            _ => {}
        }
    }
    members
}

fn is_private_name(name: Node, source: &str) -> bool {
    name.kind() == "private_property_identifier" || node_text(name, source).starts_with('#')
}

fn visit_method(node: Node, owner: &str, source: &str, members: &mut Vec<Member>) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    if has_token(node, "static") || has_token(node, "set") || is_private_name(name_node, source) {
        return;
    }

    let name = node_text(name_node, source);
    if name == "constructor" {
        parameter_properties(node, owner, source, members);
        return;
    }

    let return_type = type_annotation_text(node.child_by_field_name("return_type"), source)
        .unwrap_or_else(|| ANY.to_string());

    let kind = if has_token(node, "get") {
        MemberKind::Property
    } else {
        MemberKind::Method {
            parameters: parameters_of(node, source),
        }
    };

    members.push(Member {
        owner: owner.to_string(),
        name: name.to_string(),
        type_text: return_type,
        kind,
        span: Span::from_node(&name_node, source),
    });
}

fn visit_field(node: Node, owner: &str, source: &str, members: &mut Vec<Member>) {
    // TypeScript: name / JavaScript: property
    let Some(name_node) = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("property"))
    else {
        return;
    };
    if has_token(node, "static") || is_private_name(name_node, source) {
        return;
    }

    let name = node_text(name_node, source).to_string();
    let value = node.child_by_field_name("value");

    let member = match value.map(|v| (NodeKind::of(&v), v)) {
        Some((NodeKind::ArrowFunction | NodeKind::FunctionExpression, function)) => Member {
            owner: owner.to_string(),
            name,
            type_text: type_annotation_text(function.child_by_field_name("return_type"), source)
                .unwrap_or_else(|| ANY.to_string()),
            kind: MemberKind::Method {
                parameters: parameters_of(function, source),
            },
            span: Span::from_node(&name_node, source),
        },
        _ => Member {
            owner: owner.to_string(),
            name,
            type_text: type_annotation_text(node.child_by_field_name("type"), source)
                .unwrap_or_else(|| ANY.to_string()),
            kind: MemberKind::Property,
            span: Span::from_node(&name_node, source),
        },
    };
    members.push(member);
}

/// `constructor(private foo: Foo, readonly bar)` のパラメータプロパティ
fn parameter_properties(ctor: Node, owner: &str, source: &str, members: &mut Vec<Member>) {
    let Some(params) = ctor.child_by_field_name("parameters") else {
        return;
    };
    for param in named_children(params) {
        let is_property =
            find_child_kind(param, "accessibility_modifier").is_some() || has_token(param, "readonly");
        if !is_property {
            continue;
        }
        let Some(pattern) = param.child_by_field_name("pattern") else {
            continue;
        };
        members.push(Member {
            owner: owner.to_string(),
            name: node_text(pattern, source).to_string(),
            type_text: type_annotation_text(param.child_by_field_name("type"), source)
                .unwrap_or_else(|| ANY.to_string()),
            kind: MemberKind::Property,
            span: Span::from_node(&pattern, source),
        });
    }
}

/// 関数・メソッドのパラメータ一覧
fn parameters_of(function: Node, source: &str) -> Vec<Parameter> {
    // `x => ...` のような括弧なしの単一パラメータ
    if let Some(single) = function.child_by_field_name("parameter") {
        return vec![Parameter {
            name: node_text(single, source).to_string(),
            type_text: ANY.to_string(),
        }];
    }
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };

    named_children(params)
        .into_iter()
        .filter_map(|param| parameter(param, source))
        .collect()
}

fn parameter(param: Node, source: &str) -> Option<Parameter> {
    let (name, type_text) = match param.kind() {
        "required_parameter" | "optional_parameter" => {
            let pattern = param.child_by_field_name("pattern")?;
            let type_text = type_annotation_text(param.child_by_field_name("type"), source);
            (node_text(pattern, source).to_string(), type_text)
        }
        "assignment_pattern" => {
            let left = param.child_by_field_name("left")?;
            (node_text(left, source).to_string(), None)
        }
        "decorator" => return None,
        _ => (node_text(param, source).to_string(), None),
    };
    Some(Parameter {
        name,
        type_text: type_text.unwrap_or_else(|| ANY.to_string()),
    })
}
