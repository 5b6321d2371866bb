mod scanner;
mod snapshot;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tower_lsp::lsp_types::Url;

use crate::analyzer::{
    bind_controller, parse_components, parse_controllers, parse_routes, parse_tag_usages,
    SourceFile,
};
use crate::config::ComponentsConfig;
use crate::error::ScanError;
use crate::model::{Component, Controller, EntityKey, RouteDeclaration, TagUsage};

pub use scanner::SourceFilesScanner;
pub use snapshot::IndexSnapshot;

/// 監視対象ファイルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    Component,
    Controller,
    Template,
    Route,
}

/// ファイルの変更種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Added,
    Changed,
    Deleted,
}

/// ファイルごとに保持するエンティティ
#[derive(Debug, Default)]
struct IndexState {
    controllers: BTreeMap<Url, Vec<Controller>>,
    components: BTreeMap<Url, Vec<Component>>,
    routes: BTreeMap<Url, Vec<RouteDeclaration>>,
    usages: BTreeMap<Url, Vec<TagUsage>>,
}

impl IndexState {
    fn contains(&self, kind: FileKind, uri: &Url) -> bool {
        match kind {
            FileKind::Component => self.components.contains_key(uri),
            FileKind::Controller => self.controllers.contains_key(uri),
            FileKind::Template => self.usages.contains_key(uri),
            FileKind::Route => self.routes.contains_key(uri),
        }
    }

    fn remove(&mut self, kind: FileKind, uri: &Url) {
        match kind {
            FileKind::Component => {
                self.components.remove(uri);
            }
            FileKind::Controller => {
                self.controllers.remove(uri);
            }
            FileKind::Template => {
                self.usages.remove(uri);
            }
            FileKind::Route => {
                self.routes.remove(uri);
            }
        }
    }

    /// ファイルのエンティティを抽出して登録する（`None` は読み込みに失敗したファイル）
    ///
    /// コンポーネントのコントローラー参照は `known` に対して解決する。
    fn insert(&mut self, kind: FileKind, uri: Url, file: Option<&SourceFile>, known: &[Controller]) {
        match kind {
            FileKind::Component => {
                self.components.insert(
                    uri,
                    file.map(|f| parse_components(f, known)).unwrap_or_default(),
                );
            }
            FileKind::Controller => {
                self.controllers
                    .insert(uri, file.map(parse_controllers).unwrap_or_default());
            }
            FileKind::Template => {
                self.usages
                    .insert(uri, file.map(parse_tag_usages).unwrap_or_default());
            }
            FileKind::Route => {
                self.routes
                    .insert(uri, file.map(parse_routes).unwrap_or_default());
            }
        }
    }

    fn all_controllers(&self) -> Vec<Controller> {
        self.controllers.values().flatten().cloned().collect()
    }

    /// 基底クラスとコントローラー参照を再解決する
    fn relink(&mut self) {
        // 基底クラス: クラス名 -> 最初に宣言されたコントローラー
        let mut by_class: HashMap<String, EntityKey> = HashMap::new();
        for controller in self.controllers.values().flatten() {
            by_class
                .entry(controller.class_name.clone())
                .or_insert_with(|| controller.key());
        }

        let mut edges: BTreeMap<EntityKey, EntityKey> = BTreeMap::new();
        for controller in self.controllers.values().flatten() {
            if let Some(base) = controller
                .base_class_name
                .as_ref()
                .and_then(|name| by_class.get(name))
            {
                edges.insert(controller.key(), base.clone());
            }
        }
        break_cycles(&mut edges);

        for controller in self.controllers.values_mut().flatten() {
            controller.base = edges.get(&controller.key()).cloned();
        }

        // コンポーネント -> コントローラーの遅延バインド
        let controllers = self.all_controllers();
        for component in self.components.values_mut().flatten() {
            let resolved = bind_controller(component, &controllers);
            if resolved.is_none()
                && (component.controller_name.is_some() || component.controller_class_name.is_some())
            {
                tracing::debug!("Controller of component {} is not indexed", component.name);
            }
            component.controller = resolved;
        }
    }

    fn snapshot(&self, generation: u64) -> IndexSnapshot {
        IndexSnapshot::new(
            generation,
            self.components.values().flatten().cloned().collect(),
            self.all_controllers(),
            self.routes.values().flatten().cloned().collect(),
            self.usages.values().flatten().cloned().collect(),
        )
    }
}

/// 継承の循環を検出し、循環を閉じる辺を取り除く
fn break_cycles(edges: &mut BTreeMap<EntityKey, EntityKey>) {
    let starts: Vec<EntityKey> = edges.keys().cloned().collect();
    let mut finished: HashSet<EntityKey> = HashSet::new();

    for start in starts {
        let mut path: Vec<EntityKey> = Vec::new();
        let mut on_path: HashSet<EntityKey> = HashSet::new();
        let mut current = start;

        loop {
            if finished.contains(&current) {
                break;
            }
            on_path.insert(current.clone());
            path.push(current.clone());
            let Some(next) = edges.get(&current).cloned() else {
                break;
            };
            if on_path.contains(&next) {
                tracing::warn!("Inheritance cycle detected: {} extends {}, link removed", current, next);
                edges.remove(&current);
                break;
            }
            current = next;
        }
        finished.extend(path);
    }
}

/// コンポーネント・コントローラー・ルート・タグ使用箇所のインデックス
///
/// 書き込みはサーバーが保持する単一のMutex越しに行い、
/// 更新のたびにスナップショットをwatchチャネルへ公開する。
pub struct EntityIndex {
    state: IndexState,
    generation: u64,
    sender: watch::Sender<Arc<IndexSnapshot>>,
}

impl Default for EntityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityIndex {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(IndexSnapshot::default()));
        Self {
            state: IndexState::default(),
            generation: 0,
            sender,
        }
    }

    /// スナップショットの購読
    pub fn subscribe(&self) -> watch::Receiver<Arc<IndexSnapshot>> {
        self.sender.subscribe()
    }

    /// 最新のスナップショット
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.sender.borrow().clone()
    }

    /// ワークスペース全体を探索し直し、状態を一括で置き換える
    ///
    /// 探索に失敗した場合は既存の状態を保持したままエラーを返す。
    pub async fn full_refresh(
        &mut self,
        scanner: &SourceFilesScanner,
        config: &ComponentsConfig,
    ) -> Result<Arc<IndexSnapshot>, ScanError> {
        let started = Instant::now();

        let mut discovered: Vec<(FileKind, Vec<PathBuf>)> = Vec::new();
        for (kind, globs) in [
            (FileKind::Controller, &config.controller_globs),
            (FileKind::Component, &config.component_globs),
            (FileKind::Template, &config.html_globs),
            (FileKind::Route, &config.route_globs),
        ] {
            let matcher = config.create_path_matcher(globs)?;
            discovered.push((kind, scanner.find_files(&matcher).await?));
        }

        // 同じファイルが複数の種類に一致しても読み込みは1回
        let unique: BTreeSet<&PathBuf> = discovered.iter().flat_map(|(_, paths)| paths).collect();
        let unique: Vec<PathBuf> = unique.into_iter().cloned().collect();
        let files: HashMap<Url, SourceFile> = scanner
            .load_all(&unique)
            .await
            .into_iter()
            .map(|file| (file.uri.clone(), file))
            .collect();

        // コントローラーを先に抽出し、コンポーネントは最終的なコントローラー集合に対して抽出する
        let mut state = IndexState::default();
        for (kind, paths) in discovered.iter().filter(|(k, _)| *k != FileKind::Component) {
            for uri in paths.iter().filter_map(|p| uri_of(p)) {
                let file = files.get(&uri);
                state.insert(*kind, uri, file, &[]);
            }
        }
        let known = state.all_controllers();
        for (kind, paths) in discovered.iter().filter(|(k, _)| *k == FileKind::Component) {
            for uri in paths.iter().filter_map(|p| uri_of(p)) {
                let file = files.get(&uri);
                state.insert(*kind, uri, file, &known);
            }
        }
        state.relink();

        self.state = state;
        let snapshot = self.publish();
        tracing::debug!(
            "Full refresh: {} components, {} controllers, {} routes in {:?}",
            snapshot.components().len(),
            snapshot.controllers().len(),
            snapshot.routes().len(),
            started.elapsed()
        );
        Ok(snapshot)
    }

    /// 1ファイルの変更を反映する
    pub async fn apply_file_changed(
        &mut self,
        scanner: &SourceFilesScanner,
        kind: FileKind,
        path: &Path,
        change: FileChange,
    ) -> Arc<IndexSnapshot> {
        let Some(uri) = uri_of(path) else {
            return self.snapshot();
        };

        match change {
            FileChange::Deleted => self.remove_file(kind, &uri),
            FileChange::Changed if !self.state.contains(kind, &uri) => {
                tracing::warn!("Changed file {} was not indexed as {:?}, ignoring", uri, kind);
                self.snapshot()
            }
            FileChange::Added | FileChange::Changed => {
                let file = scanner.load(path).await;
                self.replace_file(kind, uri, file.as_ref())
            }
        }
    }

    /// ファイルのエンティティを解析済みのソースで置き換える
    pub fn replace_file(&mut self, kind: FileKind, uri: Url, file: Option<&SourceFile>) -> Arc<IndexSnapshot> {
        self.state.remove(kind, &uri);
        let known = match kind {
            FileKind::Component => self.state.all_controllers(),
            _ => Vec::new(),
        };
        self.state.insert(kind, uri, file, &known);
        self.state.relink();
        self.publish()
    }

    /// ファイルのエンティティを取り除く（未知のファイルは何もしない）
    pub fn remove_file(&mut self, kind: FileKind, uri: &Url) -> Arc<IndexSnapshot> {
        if !self.state.contains(kind, uri) {
            tracing::warn!("Deleted file {} was not indexed as {:?}", uri, kind);
            return self.snapshot();
        }
        self.state.remove(kind, uri);
        self.state.relink();
        self.publish()
    }

    fn publish(&mut self) -> Arc<IndexSnapshot> {
        self.generation += 1;
        let snapshot = Arc::new(self.state.snapshot(self.generation));
        self.sender.send_replace(snapshot.clone());
        snapshot
    }
}

fn uri_of(path: &Path) -> Option<Url> {
    match Url::from_file_path(path) {
        Ok(uri) => Some(uri),
        Err(()) => {
            tracing::warn!("Cannot convert {} to a URI", path.display());
            None
        }
    }
}
