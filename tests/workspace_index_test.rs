//! ワークスペースを実ファイルで構築し、インデックスと各ハンドラーを通しで検証する統合テスト

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tower_lsp::lsp_types::{CompletionItemKind, Position, Url};

use ng_components_lsp::config::ComponentsConfig;
use ng_components_lsp::error::ScanError;
use ng_components_lsp::handler::{CompletionHandler, DefinitionHandler, ReferencesHandler};
use ng_components_lsp::index::{EntityIndex, FileChange, FileKind, SourceFilesScanner};
use ng_components_lsp::model::Artifact;
use ng_components_lsp::util::position_at;

const CONFIG: &str = r#"{
    "componentGlobs": ["src/**/*.component.ts"],
    "controllerGlobs": ["src/**/*.ts"],
    "htmlGlobs": ["src/**/*.html"],
    "routeGlobs": ["src/**/*.routes.js"],
    "goToDefinition": ["component", "template", "controller"]
}"#;

const CONTROLLER: &str = r#"
angular.module('app').controller('greetCtrl', GreetController);

export class GreetController {
    title: string;
    greet(who: string): void {}
}
"#;

const COMPONENT: &str = r#"
angular.module('app').component('greetWidget', {
    bindings: { title: '<', onSelect: '&?' },
    controller: 'greetCtrl',
    controllerAs: 'vm',
    templateUrl: './greet.html',
});
"#;

const TEMPLATE: &str = "<h1>{{vm.title}}</h1>\n";

const PAGE: &str = "<main>\n  <greet-widget title=\"'hi'\"></greet-widget>\n</main>\n";

const ROUTES: &str = r#"
angular.module('app').config(function ($routeProvider) {
    $routeProvider.when('/greet', { template: '<greet-widget></greet-widget>' });
});
"#;

/// テスト用のワークスペースを作成する
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("node_modules/lib")).unwrap();

    fs::write(dir.path().join("ngcomponents.json"), CONFIG).unwrap();
    fs::write(src.join("greet.controller.ts"), CONTROLLER).unwrap();
    fs::write(src.join("greet.component.ts"), COMPONENT).unwrap();
    fs::write(src.join("greet.html"), TEMPLATE).unwrap();
    fs::write(src.join("index.html"), PAGE).unwrap();
    fs::write(src.join("app.routes.js"), ROUTES).unwrap();
    // 除外ディレクトリ内は無視される
    fs::write(
        src.join("node_modules/lib/vendor.component.ts"),
        "angular.module('lib').component('vendorWidget', {});",
    )
    .unwrap();
    dir
}

fn uri(path: &Path) -> Url {
    Url::from_file_path(path).unwrap()
}

/// `needle` の先頭から `shift` バイト進んだ位置
fn position_of(text: &str, needle: &str, shift: usize) -> Position {
    let offset = text.find(needle).unwrap() + shift;
    position_at(text, offset)
}

async fn indexed(dir: &TempDir) -> (EntityIndex, SourceFilesScanner, ComponentsConfig) {
    let config = ComponentsConfig::load_from_dir(dir.path());
    let scanner = SourceFilesScanner::new(Some(dir.path().to_path_buf()));
    let mut index = EntityIndex::new();
    index.full_refresh(&scanner, &config).await.unwrap();
    (index, scanner, config)
}

// ============================================================
// 全体インデックス
// ============================================================

#[tokio::test]
async fn test_full_refresh_indexes_workspace() {
    let dir = workspace();
    let (index, _, _) = indexed(&dir).await;
    let snapshot = index.snapshot();

    assert_eq!(snapshot.components().len(), 1);
    assert!(snapshot.component_by_name("vendorWidget").is_none());

    let component = snapshot.component_by_html_name("greet-widget").unwrap();
    assert_eq!(component.controller_as, "vm");
    let controller = snapshot.controller_of(component).unwrap();
    assert_eq!(controller.class_name, "GreetController");
    assert_eq!(controller.uri, uri(&dir.path().join("src/greet.controller.ts")));

    match &component.template {
        Some(Artifact::External { uri: template, .. }) => {
            assert_eq!(*template, uri(&dir.path().join("src/greet.html")))
        }
        other => panic!("外部テンプレートであるべき: {:?}", other),
    }
    match snapshot.route_for(component) {
        Some(Artifact::External { uri: routes, .. }) => {
            assert_eq!(routes, uri(&dir.path().join("src/app.routes.js")))
        }
        other => panic!("ルートファイルを指すべき: {:?}", other),
    }
    assert_eq!(snapshot.usages_of("greet-widget").len(), 1);
}

#[tokio::test]
async fn test_invalid_glob_keeps_previous_index() {
    let dir = workspace();
    let (mut index, scanner, config) = indexed(&dir).await;
    let before = index.snapshot();

    let broken = ComponentsConfig {
        component_globs: vec!["src/[".to_string()],
        ..config
    };
    let result = index.full_refresh(&scanner, &broken).await;
    assert!(matches!(result, Err(ScanError::Pattern { .. })));

    let after = index.snapshot();
    assert_eq!(before.generation(), after.generation());
    assert_eq!(after.components().len(), 1);
}

#[tokio::test]
async fn test_missing_root_fails_refresh() {
    let mut index = EntityIndex::new();
    let result = index
        .full_refresh(&SourceFilesScanner::default(), &ComponentsConfig::default())
        .await;
    assert!(matches!(result, Err(ScanError::MissingRoot)));
}

// ============================================================
// ファイル変更
// ============================================================

#[tokio::test]
async fn test_file_changes_update_index() {
    let dir = workspace();
    let (mut index, scanner, _) = indexed(&dir).await;

    let path = dir.path().join("src/other.component.ts");
    fs::write(
        &path,
        "angular.module('app').component('otherWidget', { template: '<p></p>' });",
    )
    .unwrap();
    let snapshot = index
        .apply_file_changed(&scanner, FileKind::Component, &path, FileChange::Added)
        .await;
    assert!(snapshot.component_by_name("otherWidget").is_some());

    // コントローラーを消すとコンポーネントの参照が外れる
    let controller = dir.path().join("src/greet.controller.ts");
    fs::remove_file(&controller).unwrap();
    let snapshot = index
        .apply_file_changed(&scanner, FileKind::Controller, &controller, FileChange::Deleted)
        .await;
    let component = snapshot.component_by_name("greetWidget").unwrap();
    assert!(snapshot.controller_of(component).is_none());

    // 戻すと再び解決される
    fs::write(&controller, CONTROLLER).unwrap();
    let snapshot = index
        .apply_file_changed(&scanner, FileKind::Controller, &controller, FileChange::Added)
        .await;
    let component = snapshot.component_by_name("greetWidget").unwrap();
    assert!(snapshot.controller_of(component).is_some());
}

// ============================================================
// ハンドラー
// ============================================================

#[tokio::test]
async fn test_definition_from_page() {
    let dir = workspace();
    let (index, _, config) = indexed(&dir).await;
    let handler = DefinitionHandler::new(index.snapshot(), &config.definition_targets);
    let page = uri(&dir.path().join("src/index.html"));

    let locations = handler.goto_definition(&page, PAGE, position_of(PAGE, "<greet-widget", 3));
    let uris: Vec<Url> = locations.into_iter().map(|l| l.uri).collect();
    assert_eq!(
        uris,
        vec![
            uri(&dir.path().join("src/greet.component.ts")),
            uri(&dir.path().join("src/greet.html")),
            uri(&dir.path().join("src/greet.controller.ts")),
        ]
    );

    let locations = handler.goto_definition(&page, PAGE, position_of(PAGE, "title=", 1));
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri, uri(&dir.path().join("src/greet.component.ts")));
}

#[tokio::test]
async fn test_references_from_component_source() {
    let dir = workspace();
    let (index, _, _) = indexed(&dir).await;
    let handler = ReferencesHandler::new(index.snapshot());
    let component_uri = uri(&dir.path().join("src/greet.component.ts"));
    let page = uri(&dir.path().join("src/index.html"));

    let position = position_of(COMPONENT, "greetWidget", 2);
    let without = handler.find_references(&component_uri, COMPONENT, position, false);
    assert_eq!(without.len(), 1);
    assert_eq!(without[0].uri, page);

    let with = handler.find_references(&component_uri, COMPONENT, position, true);
    assert_eq!(with.len(), 2);
    assert_eq!(with[0].uri, component_uri);
}

#[tokio::test]
async fn test_completion_in_template_and_page() {
    let dir = workspace();
    let (index, _, _) = indexed(&dir).await;
    let handler = CompletionHandler::new(index.snapshot());

    let template = uri(&dir.path().join("src/greet.html"));
    let text = "<h1>{{vm.";
    let items = handler.complete(&template, text, position_at(text, text.len()));
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["title", "onSelect", "greet"]);
    assert_eq!(items[2].kind, Some(CompletionItemKind::METHOD));

    let page = uri(&dir.path().join("src/index.html"));
    let text = "<greet-widget title=\"x\" ";
    let items = handler.complete(&page, text, position_at(text, text.len()));
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, vec!["on-select"]);
}
