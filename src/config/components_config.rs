use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::path_matcher::PathMatcher;

/// 設定ファイル名
pub const CONFIG_FILE_NAME: &str = "ngcomponents.json";

/// クライアント設定のセクション名
pub const SETTINGS_SECTION: &str = "ngComponents";

/// 自己参照タグの定義ジャンプで返す対象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionTarget {
    Component,
    Template,
    Controller,
    Route,
}

/// ngcomponents.json の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsConfig {
    /// コンポーネント定義ファイルのglobパターン
    #[serde(default = "default_source_globs")]
    pub component_globs: Vec<String>,
    /// コントローラー定義ファイルのglobパターン
    #[serde(default = "default_source_globs")]
    pub controller_globs: Vec<String>,
    /// HTMLテンプレートのglobパターン
    #[serde(default = "default_html_globs")]
    pub html_globs: Vec<String>,
    /// ルート定義ファイルのglobパターン
    #[serde(default = "default_source_globs")]
    pub route_globs: Vec<String>,
    /// 除外対象のglobパターン
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// タグ名からの定義ジャンプ先
    #[serde(default = "default_definition_targets", rename = "goToDefinition")]
    pub definition_targets: Vec<DefinitionTarget>,
}

fn default_source_globs() -> Vec<String> {
    vec!["**/*.ts".to_string(), "**/*.js".to_string()]
}

fn default_html_globs() -> Vec<String> {
    vec!["**/*.html".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules".to_string(),
        "**/node_modules/**".to_string(),
        "**/dist".to_string(),
        "**/dist/**".to_string(),
        "**/build".to_string(),
        "**/build/**".to_string(),
        "**/.*".to_string(),
        "**/.*/**".to_string(),
    ]
}

fn default_definition_targets() -> Vec<DefinitionTarget> {
    vec![DefinitionTarget::Template, DefinitionTarget::Controller]
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            component_globs: default_source_globs(),
            controller_globs: default_source_globs(),
            html_globs: default_html_globs(),
            route_globs: default_source_globs(),
            exclude: default_exclude(),
            definition_targets: default_definition_targets(),
        }
    }
}

impl ComponentsConfig {
    /// 指定ディレクトリからngcomponents.jsonを読み込む
    pub fn load_from_dir(dir: &Path) -> Self {
        Self::load_from_path(&dir.join(CONFIG_FILE_NAME))
    }

    /// 指定パスからngcomponents.jsonを読み込む
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", CONFIG_FILE_NAME, e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", CONFIG_FILE_NAME, e);
                Self::default()
            }
        }
    }

    /// クライアント設定（initializationOptions / didChangeConfiguration）から読み込む
    ///
    /// `{ "ngComponents": { ... } }` と `{ ... }` のどちらの形式も受け付ける
    pub fn from_settings(settings: &serde_json::Value) -> Option<Self> {
        let section = settings.get(SETTINGS_SECTION).unwrap_or(settings);
        if !section.is_object() {
            return None;
        }
        match serde_json::from_value(section.clone()) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Invalid {} settings: {}", SETTINGS_SECTION, e);
                None
            }
        }
    }

    /// ファイル探索・監視に関わる設定が変わったかどうか
    pub fn globs_changed(&self, other: &Self) -> bool {
        self.component_globs != other.component_globs
            || self.controller_globs != other.controller_globs
            || self.html_globs != other.html_globs
            || self.route_globs != other.route_globs
            || self.exclude != other.exclude
    }

    /// 指定globの探索用PathMatcherを作成
    pub fn create_path_matcher(&self, globs: &[String]) -> Result<PathMatcher, crate::error::ScanError> {
        PathMatcher::new(globs, &self.exclude)
    }
}
