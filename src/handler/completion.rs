use std::collections::HashSet;
use std::sync::Arc;

use tower_lsp::lsp_types::*;

use crate::index::IndexSnapshot;
use crate::markup::{enclosing_tag, open_tag_before, word_at, OpenTag};
use crate::model::{Binding, Component, Member};
use crate::util::{is_identifier_char, offset_at};

pub struct CompletionHandler {
    snapshot: Arc<IndexSnapshot>,
}

impl CompletionHandler {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        Self { snapshot }
    }

    /// カーソル位置の補完候補
    ///
    /// - `<` の後: コンポーネントのタグ名
    /// - コンポーネントのタグ内: バインディングの属性名
    /// - 外部テンプレート内の `<controllerAs>.`: コントローラーのメンバー
    pub fn complete(&self, uri: &Url, text: &str, position: Position) -> Vec<CompletionItem> {
        let Some(offset) = offset_at(text, position) else {
            return Vec::new();
        };

        if let Some(items) = self.complete_members(uri, text, offset) {
            return items;
        }

        let Some(open) = open_tag_before(text, offset) else {
            return Vec::new();
        };
        if open.is_typing_tag_name() {
            return self.complete_tag_names(open.prefix());
        }
        if open.is_inside_quotes() {
            return Vec::new();
        }
        self.complete_attributes(&open, text, offset)
    }

    fn complete_tag_names(&self, prefix: &str) -> Vec<CompletionItem> {
        let prefix = prefix.to_ascii_lowercase();
        let mut seen = HashSet::new();
        self.snapshot
            .components()
            .iter()
            .filter(|c| c.html_name.starts_with(&prefix))
            .filter(|c| seen.insert(c.html_name.as_str()))
            .map(|c| CompletionItem {
                label: c.html_name.clone(),
                kind: Some(CompletionItemKind::CLASS),
                detail: Some(format!("Component: {}", c.name)),
                documentation: c.template.as_ref().map(|t| {
                    Documentation::String(format!("Template: {}", t.uri().path()))
                }),
                ..Default::default()
            })
            .collect()
    }

    fn complete_attributes(&self, open: &OpenTag, text: &str, offset: usize) -> Vec<CompletionItem> {
        // 閉じたタグならカーソルより後ろの属性も含める
        let parsed = enclosing_tag(text, offset)
            .filter(|tag| tag.start == open.start)
            .map(|tag| tag.parsed)
            .unwrap_or_else(|| open.parsed());
        let Some(component) = self.snapshot.component_by_html_name(&parsed.tag) else {
            return Vec::new();
        };
        let prefix = open.prefix();
        let typing = match prefix {
            "" => "",
            _ => word_at(text, offset).map(|(_, word)| word).unwrap_or(prefix),
        };

        // 入力中の単語は既存の属性として扱わない
        let existing: HashSet<&str> = parsed
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| *name != typing)
            .collect();

        let members = self.members_of(component);
        component
            .bindings
            .iter()
            .filter(|b| b.html_name.starts_with(prefix))
            .filter(|b| !existing.contains(b.html_name.as_str()))
            .map(|b| {
                let documentation = members
                    .iter()
                    .find(|m| m.name == b.name)
                    .map(|m| Documentation::String(m.documentation()));
                CompletionItem {
                    label: b.html_name.clone(),
                    kind: Some(CompletionItemKind::PROPERTY),
                    detail: Some(binding_detail(b)),
                    documentation,
                    ..Default::default()
                }
            })
            .collect()
    }

    /// 外部テンプレート内での `vm.` のようなメンバー補完
    fn complete_members(&self, uri: &Url, text: &str, offset: usize) -> Option<Vec<CompletionItem>> {
        let (alias, prefix) = member_access_before(text, offset)?;
        let component = self
            .snapshot
            .components_with_template(uri)
            .into_iter()
            .find(|c| c.controller_as == alias)?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut items = Vec::new();
        for binding in &component.bindings {
            if binding.name.starts_with(prefix) && seen.insert(binding.name.as_str()) {
                items.push(CompletionItem {
                    label: binding.name.clone(),
                    kind: Some(CompletionItemKind::REFERENCE),
                    detail: Some(binding_detail(binding)),
                    ..Default::default()
                });
            }
        }
        for member in self.members_of(component) {
            if member.name.starts_with(prefix) && seen.insert(member.name.as_str()) {
                items.push(member_item(member));
            }
        }
        Some(items)
    }

    fn members_of(&self, component: &Component) -> Vec<&Member> {
        self.snapshot
            .controller_of(component)
            .map(|c| self.snapshot.members_of(c))
            .unwrap_or_default()
    }
}

fn binding_detail(binding: &Binding) -> String {
    format!("Binding: {}", binding.declaration())
}

fn member_item(member: &Member) -> CompletionItem {
    CompletionItem {
        label: member.name.clone(),
        kind: Some(if member.is_method() {
            CompletionItemKind::METHOD
        } else {
            CompletionItemKind::FIELD
        }),
        detail: Some(member.documentation()),
        ..Default::default()
    }
}

/// カーソル直前の `alias.prefix` を取り出す
fn member_access_before(text: &str, offset: usize) -> Option<(&str, &str)> {
    let before = text.get(..offset)?;
    let prefix_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(before.len());
    let prefix = &before[prefix_start..];

    let head = before[..prefix_start].strip_suffix('.')?;
    let alias_start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map(|(i, _)| i)?;
    Some((&head[alias_start..], prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SourceFile;
    use crate::index::{EntityIndex, FileKind};

    const COMPONENT: &str = r#"
angular.module('app').component('greetWidget', {
    bindings: { title: '<', subtitle: '@?', onChange: '&' },
    controller: GreetController,
    controllerAs: 'vm',
    templateUrl: './greet.html',
});
class GreetController {
    title: string;
    save(item: Item): boolean { return true; }
}
"#;

    fn handler() -> CompletionHandler {
        let file = SourceFile::parse(
            Url::parse("file:///app/greet.ts").unwrap(),
            COMPONENT.to_string(),
        )
        .unwrap();
        let mut index = EntityIndex::new();
        index.replace_file(FileKind::Controller, file.uri.clone(), Some(&file));
        CompletionHandler::new(index.replace_file(FileKind::Component, file.uri.clone(), Some(&file)))
    }

    fn end_of(text: &str) -> Position {
        crate::util::position_at(text, text.len())
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    fn page() -> Url {
        Url::parse("file:///app/page.html").unwrap()
    }

    #[test]
    fn test_tag_name_completion() {
        let handler = handler();
        let text = "<div></div>\n<gr";
        let items = handler.complete(&page(), text, end_of(text));
        assert_eq!(labels(&items), vec!["greet-widget"]);

        let text = "<xy";
        assert!(handler.complete(&page(), text, end_of(text)).is_empty());
    }

    #[test]
    fn test_attribute_completion_filters_by_prefix() {
        let handler = handler();
        let text = "<greet-widget ti";
        let items = handler.complete(&page(), text, end_of(text));
        assert_eq!(labels(&items), vec!["title"]);
        assert_eq!(items[0].detail.as_deref(), Some("Binding: <"));
        assert_eq!(
            items[0].documentation,
            Some(Documentation::String("Type: string".to_string()))
        );
    }

    #[test]
    fn test_attribute_completion_skips_existing() {
        let handler = handler();
        let text = r#"<greet-widget title="x" "#;
        let items = handler.complete(&page(), text, end_of(text));
        assert_eq!(labels(&items), vec!["subtitle", "on-change"]);
    }

    #[test]
    fn test_attribute_completion_skips_attributes_after_cursor() {
        let handler = handler();
        let text = r#"<greet-widget  title="x"></greet-widget>"#;
        let position = crate::util::position_at(text, "<greet-widget ".len());
        let items = handler.complete(&page(), text, position);
        assert_eq!(labels(&items), vec!["subtitle", "on-change"]);

        // 入力中の属性そのものは候補に残る
        let position = crate::util::position_at(text, "<greet-widget  ti".len());
        let items = handler.complete(&page(), text, position);
        assert_eq!(labels(&items), vec!["title"]);
    }

    #[test]
    fn test_prefix_excludes_other_bindings_with_same_initial() {
        let source = "angular.module('app').component('kindWidget', { bindings: { title: '<', type: '@' } });";
        let file = SourceFile::parse(Url::parse("file:///app/kind.js").unwrap(), source.to_string()).unwrap();
        let mut index = EntityIndex::new();
        let handler = CompletionHandler::new(index.replace_file(FileKind::Component, file.uri.clone(), Some(&file)));

        let text = "<kind-widget ti";
        assert_eq!(labels(&handler.complete(&page(), text, end_of(text))), vec!["title"]);
        let text = "<kind-widget t";
        assert_eq!(labels(&handler.complete(&page(), text, end_of(text))), vec!["title", "type"]);
    }

    #[test]
    fn test_no_completion_inside_attribute_value() {
        let handler = handler();
        let text = r#"<greet-widget title="ti"#;
        assert!(handler.complete(&page(), text, end_of(text)).is_empty());
    }

    #[test]
    fn test_member_completion_in_template() {
        let handler = handler();
        let template = Url::parse("file:///app/greet.html").unwrap();
        let text = "<h1>{{vm.";
        let items = handler.complete(&template, text, end_of(text));
        assert_eq!(labels(&items), vec!["title", "subtitle", "onChange", "save"]);
        assert_eq!(items[0].kind, Some(CompletionItemKind::REFERENCE));
        assert_eq!(items[3].detail.as_deref(), Some("save(item: Item): boolean"));

        // 別のテンプレートでは補完しない
        assert!(handler.complete(&page(), text, end_of(text)).is_empty());
    }

    #[test]
    fn test_member_access_before() {
        assert_eq!(member_access_before("{{vm.ti", 7), Some(("vm", "ti")));
        assert_eq!(member_access_before("$ctrl.", 6), Some(("$ctrl", "")));
        assert_eq!(member_access_before("title", 5), None);
    }
}
