use std::collections::{BTreeMap, HashMap, HashSet};

use tower_lsp::lsp_types::Url;

use crate::model::{
    Artifact, Component, Controller, EntityKey, Member, Route, RouteDeclaration, TagUsage,
};

/// ある時点のインデックスの読み取り専用ビュー
///
/// インデックスの更新ごとに新しく作られ、`Arc` で共有される。
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    generation: u64,
    components: Vec<Component>,
    controllers: Vec<Controller>,
    routes: Vec<RouteDeclaration>,
    usages: BTreeMap<String, Vec<TagUsage>>,
    controller_positions: HashMap<EntityKey, usize>,
}

impl IndexSnapshot {
    pub(crate) fn new(
        generation: u64,
        components: Vec<Component>,
        controllers: Vec<Controller>,
        routes: Vec<RouteDeclaration>,
        usages: Vec<TagUsage>,
    ) -> Self {
        let controller_positions = controllers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key(), i))
            .collect();

        let mut by_tag: BTreeMap<String, Vec<TagUsage>> = BTreeMap::new();
        for usage in usages {
            by_tag.entry(usage.tag.clone()).or_default().push(usage);
        }

        Self {
            generation,
            components,
            controllers,
            routes,
            usages: by_tag,
            controller_positions,
        }
    }

    /// 更新のたびに増える世代番号
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn routes(&self) -> &[RouteDeclaration] {
        &self.routes
    }

    pub fn component_by_html_name(&self, html_name: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.html_name.eq_ignore_ascii_case(html_name))
    }

    pub fn component_by_name(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn controller(&self, key: &EntityKey) -> Option<&Controller> {
        self.controller_positions
            .get(key)
            .and_then(|&i| self.controllers.get(i))
    }

    /// コンポーネントに結び付いたコントローラー
    pub fn controller_of(&self, component: &Component) -> Option<&Controller> {
        component.controller.as_ref().and_then(|key| self.controller(key))
    }

    /// クラス名または登録名が一致するコントローラー
    pub fn controllers_named(&self, name: &str) -> Vec<&Controller> {
        self.controllers
            .iter()
            .filter(|c| c.class_name == name || c.name == name)
            .collect()
    }

    /// 指定コントローラーに結び付いたコンポーネント
    pub fn components_of(&self, controller: &Controller) -> Vec<&Component> {
        let key = controller.key();
        self.components
            .iter()
            .filter(|c| c.controller.as_ref() == Some(&key))
            .collect()
    }

    /// 外部テンプレートとして指定URIを使うコンポーネント
    pub fn components_with_template(&self, uri: &Url) -> Vec<&Component> {
        self.components
            .iter()
            .filter(|c| c.has_template_file(uri))
            .collect()
    }

    /// 基底クラスを辿ってメンバーを集める（派生クラスのメンバーが優先）
    pub fn members_of<'a>(&'a self, controller: &'a Controller) -> Vec<&'a Member> {
        let mut members: Vec<&Member> = Vec::new();
        let mut seen_names: HashSet<&str> = HashSet::new();
        let mut visited: HashSet<EntityKey> = HashSet::new();
        let mut current = Some(controller);

        while let Some(ctrl) = current {
            if !visited.insert(ctrl.key()) {
                break;
            }
            for member in &ctrl.members {
                if seen_names.insert(member.name.as_str()) {
                    members.push(member);
                }
            }
            current = ctrl.base.as_ref().and_then(|key| self.controller(key));
        }
        members
    }

    /// コンポーネントのルート
    ///
    /// `$routeConfig` を優先し、なければルートファイルの宣言を使う
    pub fn route_for(&self, component: &Component) -> Option<Route> {
        if let Some(route) = &component.route {
            return Some(route.clone());
        }
        self.route_declaration_for(component)
            .map(|r| Artifact::External {
                uri: r.uri.clone(),
                span: r.span,
            })
    }

    /// ルートファイルでコンポーネントを指すルート宣言（最初の一致）
    pub fn route_declaration_for(&self, component: &Component) -> Option<&RouteDeclaration> {
        self.routes.iter().find(|r| r.component == component.name)
    }

    /// カスタム要素の使用箇所
    pub fn usages_of(&self, html_name: &str) -> &[TagUsage] {
        self.usages
            .get(&html_name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
