use std::sync::Arc;

use tower_lsp::lsp_types::{Location, Position, Url};
use tracing::debug;

use crate::config::DefinitionTarget;
use crate::index::IndexSnapshot;
use crate::markup::{enclosing_tag, word_at};
use crate::model::Component;
use crate::util::offset_at;

pub struct DefinitionHandler {
    snapshot: Arc<IndexSnapshot>,
    targets: Vec<DefinitionTarget>,
}

impl DefinitionHandler {
    pub fn new(snapshot: Arc<IndexSnapshot>, targets: &[DefinitionTarget]) -> Self {
        Self {
            snapshot,
            targets: targets.to_vec(),
        }
    }

    /// タグ名・属性名からコンポーネントの定義へジャンプする
    ///
    /// - 属性名: バインディングの宣言位置
    /// - タグ名: 設定された対象（コンポーネント、テンプレート、コントローラー、ルート）
    pub fn goto_definition(&self, uri: &Url, text: &str, position: Position) -> Vec<Location> {
        let Some(offset) = offset_at(text, position) else {
            return Vec::new();
        };
        let Some(tag) = enclosing_tag(text, offset) else {
            return Vec::new();
        };
        let Some((word_start, word)) = word_at(text, offset) else {
            return Vec::new();
        };
        if word_start <= tag.start || word_start >= tag.end {
            return Vec::new();
        }

        // 属性名トークンの直前は空白、タグ名の直前は `<` か `/`
        let preceding = text[..word_start].chars().last();
        if !matches!(preceding, Some(c) if c.is_whitespace() || c == '<' || c == '/') {
            return Vec::new();
        }

        let Some(component) = self.snapshot.component_by_html_name(&tag.parsed.tag) else {
            return Vec::new();
        };
        debug!("Definition in {} for <{}> {}", uri, tag.parsed.tag, word);

        if let Some(binding) = component.binding_by_html_name(word) {
            return vec![Location {
                uri: component.uri.clone(),
                range: binding.span.to_lsp_range(),
            }];
        }
        if component.html_name.eq_ignore_ascii_case(word) {
            return self.component_targets(component);
        }
        Vec::new()
    }

    fn component_targets(&self, component: &Component) -> Vec<Location> {
        self.targets
            .iter()
            .filter_map(|target| match target {
                DefinitionTarget::Component => Some(component.location()),
                DefinitionTarget::Template => component.template.as_ref().map(|t| t.location()),
                DefinitionTarget::Controller => self
                    .snapshot
                    .controller_of(component)
                    .map(|c| c.location()),
                DefinitionTarget::Route => self
                    .snapshot
                    .route_for(component)
                    .map(|r| r.location()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SourceFile;
    use crate::index::{EntityIndex, FileKind};

    const COMPONENT: &str = r#"
angular.module('app').component('greetWidget', {
    bindings: { title: '<', onChange: '&' },
    controller: GreetController,
    templateUrl: './greet.html',
});
class GreetController {
    title: string;
}
"#;

    fn snapshot() -> Arc<IndexSnapshot> {
        let file = SourceFile::parse(
            Url::parse("file:///app/greet.component.ts").unwrap(),
            COMPONENT.to_string(),
        )
        .unwrap();
        let mut index = EntityIndex::new();
        index.replace_file(FileKind::Controller, file.uri.clone(), Some(&file));
        index.replace_file(FileKind::Component, file.uri.clone(), Some(&file))
    }

    fn at(text: &str, needle: &str, delta: usize) -> Position {
        let offset = text.find(needle).unwrap() + delta;
        crate::util::position_at(text, offset)
    }

    fn page() -> Url {
        Url::parse("file:///app/page.html").unwrap()
    }

    #[test]
    fn test_binding_attribute_definition() {
        let handler = DefinitionHandler::new(snapshot(), &[DefinitionTarget::Component]);
        let html = r#"<greet-widget title="vm.title"></greet-widget>"#;
        let locations = handler.goto_definition(&page(), html, at(html, "title", 2));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].uri.path(), "/app/greet.component.ts");
        assert_eq!(locations[0].range.start.line, 2);
        assert_eq!(locations[0].range.start.character, 16);
    }

    #[test]
    fn test_binding_column_after_japanese_comment() {
        let source = "angular.module('app').component('greetWidget', {\n    bindings: { /* 題名 */ title: '<' },\n});\n";
        let file = SourceFile::parse(Url::parse("file:///app/ja.component.js").unwrap(), source.to_string()).unwrap();
        let mut index = EntityIndex::new();
        let snapshot = index.replace_file(FileKind::Component, file.uri.clone(), Some(&file));

        let handler = DefinitionHandler::new(snapshot, &[DefinitionTarget::Component]);
        let html = r#"<greet-widget title="x"></greet-widget>"#;
        let locations = handler.goto_definition(&page(), html, at(html, "title", 1));
        assert_eq!(locations.len(), 1);
        // `題名` は2コードユニット
        assert_eq!(locations[0].range.start, Position::new(1, 25));
        assert_eq!(locations[0].range.start, at(source, "title", 0));
        assert_eq!(locations[0].range.end.character, 30);
    }

    #[test]
    fn test_attribute_value_has_no_definition() {
        let handler = DefinitionHandler::new(snapshot(), &[DefinitionTarget::Component]);
        let html = r#"<greet-widget title="vm.title"></greet-widget>"#;
        // `="vm.title"` の中の title
        let locations = handler.goto_definition(&page(), html, at(html, "vm.title", 4));
        assert!(locations.is_empty());
    }

    #[test]
    fn test_tag_name_returns_configured_targets() {
        let handler = DefinitionHandler::new(
            snapshot(),
            &[DefinitionTarget::Component, DefinitionTarget::Template],
        );
        let html = "<div><greet-widget></greet-widget></div>";
        let locations = handler.goto_definition(&page(), html, at(html, "greet-widget", 3));
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].uri.path(), "/app/greet.component.ts");
        assert_eq!(locations[1].uri.path(), "/app/greet.html");
    }

    #[test]
    fn test_closing_tag_name_and_missing_targets() {
        // ルートがないので route は結果に含まれない
        let handler = DefinitionHandler::new(
            snapshot(),
            &[DefinitionTarget::Controller, DefinitionTarget::Route],
        );
        let html = "<greet-widget></greet-widget>";
        let locations = handler.goto_definition(&page(), html, at(html, "/greet", 2));
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].range.start.line, 6);
    }

    #[test]
    fn test_unknown_tag_and_outside_tag() {
        let handler = DefinitionHandler::new(snapshot(), &[DefinitionTarget::Component]);
        let html = "<other-widget title></other-widget> title";
        assert!(handler
            .goto_definition(&page(), html, at(html, "title", 1))
            .is_empty());
        assert!(handler
            .goto_definition(&page(), html, at(html, "> title", 3))
            .is_empty());
    }
}
