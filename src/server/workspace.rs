use std::path::{Path, PathBuf};

use serde_json::json;
use tower_lsp::lsp_types::{
    FileChangeType, FileSystemWatcher, GlobPattern, InitializeParams, Url,
};

use crate::config::{ComponentsConfig, PathMatcher};
use crate::error::ScanError;
use crate::index::{FileChange, FileKind, IndexSnapshot};

/// 変更されたファイルをglobで種類に振り分ける
#[derive(Debug, Clone)]
pub struct WatchedKinds {
    matchers: Vec<(FileKind, PathMatcher)>,
}

impl WatchedKinds {
    /// コントローラーをコンポーネントより先に並べる
    pub fn from_config(config: &ComponentsConfig) -> Result<Self, ScanError> {
        let matchers = [
            (FileKind::Controller, &config.controller_globs),
            (FileKind::Component, &config.component_globs),
            (FileKind::Template, &config.html_globs),
            (FileKind::Route, &config.route_globs),
        ]
        .into_iter()
        .map(|(kind, globs)| Ok((kind, config.create_path_matcher(globs)?)))
        .collect::<Result<Vec<_>, ScanError>>()?;
        Ok(Self { matchers })
    }

    /// パスに一致する種類（ルート外のパスは対象外）
    pub fn kinds_for(&self, root: &Path, path: &Path) -> Vec<FileKind> {
        let Ok(relative) = path.strip_prefix(root) else {
            return Vec::new();
        };
        self.matchers
            .iter()
            .filter(|(_, matcher)| matcher.should_include(relative))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// 監視登録用のwatcher（重複するglobは1つにまとめる）
pub fn file_watchers(config: &ComponentsConfig) -> Vec<FileSystemWatcher> {
    let mut globs: Vec<&String> = config
        .controller_globs
        .iter()
        .chain(&config.component_globs)
        .chain(&config.html_globs)
        .chain(&config.route_globs)
        .collect();
    globs.sort();
    globs.dedup();

    globs
        .into_iter()
        .map(|glob| FileSystemWatcher {
            glob_pattern: GlobPattern::String(glob.clone()),
            kind: None,
        })
        .collect()
}

/// ワークスペースルートを決定する
#[allow(deprecated)]
pub fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    let uri = params.root_uri.clone().or_else(|| {
        params
            .workspace_folders
            .as_ref()?
            .first()
            .map(|f| f.uri.clone())
    })?;
    uri.to_file_path().ok()
}

pub fn file_change(typ: FileChangeType) -> Option<FileChange> {
    match typ {
        FileChangeType::CREATED => Some(FileChange::Added),
        FileChangeType::CHANGED => Some(FileChange::Changed),
        FileChangeType::DELETED => Some(FileChange::Deleted),
        _ => None,
    }
}

/// `ngComponents.listComponents` の応答
pub fn component_summary(snapshot: &IndexSnapshot) -> serde_json::Value {
    let components: Vec<serde_json::Value> = snapshot
        .components()
        .iter()
        .map(|c| {
            let controller = snapshot.controller_of(c);
            json!({
                "name": c.name,
                "htmlName": c.html_name,
                "uri": c.uri,
                "controller": controller.map(|ctrl| ctrl.class_name.as_str()),
                "controllerAs": c.controller_as,
                "bindings": c.bindings.iter().map(|b| json!({
                    "name": b.name,
                    "attribute": b.html_name,
                    "kind": b.kind.as_str(),
                    "optional": b.optional,
                })).collect::<Vec<_>>(),
                "template": c.template.as_ref().map(|t| t.uri().to_string()),
                "route": snapshot.route_for(c).map(|r| r.uri().to_string()),
                "routePath": snapshot.route_declaration_for(c).and_then(|r| r.path.as_deref()),
                "routeProvider": snapshot.route_declaration_for(c).map(|r| r.source.as_str()),
            })
        })
        .collect();

    json!({
        "generation": snapshot.generation(),
        "components": components,
    })
}

pub fn path_of(uri: &Url) -> Option<PathBuf> {
    uri.to_file_path().ok()
}
