use std::sync::Arc;

use tower_lsp::lsp_types::{Location, Position, Url};

use crate::index::IndexSnapshot;
use crate::markup::{enclosing_tag, open_tag_before, word_at};
use crate::model::Component;
use crate::util::{identifier_at, is_html_file, offset_at};

pub struct ReferencesHandler {
    snapshot: Arc<IndexSnapshot>,
}

impl ReferencesHandler {
    pub fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        Self { snapshot }
    }

    /// コンポーネントの使用箇所を探す
    ///
    /// - HTML: カーソル位置のカスタムタグ
    /// - ソース: コンポーネント名（camelCase / kebab-case）、コントローラーのクラス名・登録名
    pub fn find_references(
        &self,
        uri: &Url,
        text: &str,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        let Some(offset) = offset_at(text, position) else {
            return Vec::new();
        };

        let mut declarations = Vec::new();
        let components: Vec<&Component> = if is_html_file(uri) {
            self.tag_at(text, offset).into_iter().collect()
        } else {
            self.components_in_source(text, offset, &mut declarations)
        };

        let mut locations: Vec<Location> = Vec::new();
        if include_declaration {
            locations.extend(components.iter().map(|c| c.location()));
            locations.extend(declarations);
        }
        for component in &components {
            locations.extend(
                self.snapshot
                    .usages_of(&component.html_name)
                    .iter()
                    .map(|u| u.location()),
            );
        }

        let mut unique: Vec<Location> = Vec::with_capacity(locations.len());
        for location in locations {
            if !unique.contains(&location) {
                unique.push(location);
            }
        }
        unique
    }

    /// カーソルがタグ名の上にある場合、そのコンポーネント
    fn tag_at(&self, text: &str, offset: usize) -> Option<&Component> {
        let (_, word) = word_at(text, offset)?;
        let tag = match enclosing_tag(text, offset) {
            Some(tag) => tag.parsed.tag,
            None => open_tag_before(text, offset)?.parsed().tag,
        };
        if !tag.eq_ignore_ascii_case(word) {
            return None;
        }
        self.snapshot.component_by_html_name(word)
    }

    /// ソース上の名前に対応するコンポーネント（コントローラーの場合は結び付いたもの）
    fn components_in_source(
        &self,
        text: &str,
        offset: usize,
        declarations: &mut Vec<Location>,
    ) -> Vec<&Component> {
        // 'greet-widget' のような文字列
        if let Some((_, word)) = word_at(text, offset) {
            if word.contains('-') {
                if let Some(component) = self.snapshot.component_by_html_name(word) {
                    return vec![component];
                }
            }
        }

        let Some(name) = identifier_at(text, offset) else {
            return Vec::new();
        };
        if let Some(component) = self.snapshot.component_by_name(name) {
            return vec![component];
        }

        let mut components = Vec::new();
        for controller in self.snapshot.controllers_named(name) {
            declarations.push(controller.location());
            components.extend(self.snapshot.components_of(controller));
        }
        components
    }
}
