use rstest::rstest;
use tower_lsp::lsp_types::Url;

use super::*;
use crate::model::{Artifact, BindingKind, Controller, Member, MemberKind, RouteSource};

fn source_file(path: &str, source: &str) -> SourceFile {
    let uri = Url::parse(&format!("file://{}", path)).unwrap();
    SourceFile::parse(uri, source.to_string()).unwrap()
}

fn member<'c>(controller: &'c Controller, name: &str) -> Option<&'c Member> {
    controller.members.iter().find(|m| m.name == name)
}

// ============================================================
// コントローラー
// ============================================================

#[test]
fn test_typescript_controller_members() {
    let source = r#"
export class GreetController {
    title: string;
    private count = 0;
    static instances = 0;
    #secret = 1;
    onSave = (item: Item): boolean => true;
    constructor(private readonly $http: IHttpService, other) {}
    get label(): string { return this.title; }
    set label(v: string) {}
    greet(who: string, times?: number): void {}
}
"#;
    let file = source_file("/app/greet.controller.ts", source);
    let controllers = parse_controllers(&file);
    assert_eq!(controllers.len(), 1);

    let ctrl = &controllers[0];
    assert_eq!(ctrl.name, "GreetController");
    assert_eq!(ctrl.class_name, "GreetController");
    // アンカーはメンバーリストの先頭（`{` の直後）
    assert_eq!((ctrl.span.start_line, ctrl.span.start_col), (1, 30));
    assert_eq!((ctrl.name_span.start_line, ctrl.name_span.start_col), (1, 13));

    let names: Vec<&str> = ctrl.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["title", "count", "onSave", "$http", "label", "greet"]);

    let title = member(ctrl, "title").unwrap();
    assert_eq!(title.type_text, "string");
    assert_eq!(title.owner, "GreetController");
    assert_eq!(member(ctrl, "count").unwrap().type_text, "any");
    assert_eq!(member(ctrl, "$http").unwrap().type_text, "IHttpService");

    let label = member(ctrl, "label").unwrap();
    assert_eq!(label.kind, MemberKind::Property);
    assert_eq!(label.type_text, "string");

    let on_save = member(ctrl, "onSave").unwrap();
    assert!(on_save.is_method());
    assert_eq!(on_save.documentation(), "onSave(item: Item): boolean");

    let greet = member(ctrl, "greet").unwrap();
    assert_eq!(greet.documentation(), "greet(who: string, times: number): void");
}

#[test]
fn test_registration_renames_controller() {
    // 登録がクラス宣言より前にあっても別名が付く
    let source = r#"
angular.module('app').controller('greetCtrl', GreetController);

class GreetController extends BaseController {
    hello(name) {}
}

class BaseController {}
"#;
    let file = source_file("/app/greet.js", source);
    let controllers = parse_controllers(&file);
    assert_eq!(controllers.len(), 2);

    assert_eq!(controllers[0].name, "greetCtrl");
    assert_eq!(controllers[0].class_name, "GreetController");
    assert_eq!(controllers[0].base_class_name.as_deref(), Some("BaseController"));
    assert_eq!(controllers[0].members[0].documentation(), "hello(name: any): any");

    assert_eq!(controllers[1].name, "BaseController");
    assert_eq!(controllers[1].base_class_name, None);
}

#[rstest]
#[case::bound_module("const app = angular.module('app');\napp.controller('fooCtrl', Foo);\nclass Foo {}", "fooCtrl")]
#[case::di_array("angular.module('app').controller('fooCtrl', ['$scope', Foo]);\nclass Foo {}", "fooCtrl")]
#[case::not_a_module("someObject.controller('fooCtrl', Foo);\nclass Foo {}", "Foo")]
#[case::same_name("angular.module('app').controller('Foo', Foo);\nclass Foo {}", "Foo")]
fn test_registration_variants(#[case] source: &str, #[case] expected: &str) {
    let file = source_file("/app/foo.js", source);
    let controllers = parse_controllers(&file);
    assert_eq!(controllers.len(), 1);
    assert_eq!(controllers[0].name, expected);
}

#[test]
fn test_named_class_expression_is_controller() {
    let file = source_file("/app/expr.ts", "const WidgetController = class { value = 1; };");
    let controllers = parse_controllers(&file);
    assert_eq!(controllers.len(), 1);
    assert_eq!(controllers[0].class_name, "WidgetController");
    assert_eq!(controllers[0].members.len(), 1);
}

#[test]
fn test_too_deep_file_yields_nothing() {
    let nested = format!("{}1{}", "[".repeat(MAX_DEPTH + 10), "]".repeat(MAX_DEPTH + 10));
    let source = format!("class Shallow {{}}\nconst deep = {};", nested);
    let file = source_file("/app/deep.js", &source);
    assert!(parse_controllers(&file).is_empty());
    assert!(parse_components(&file, &[]).is_empty());
}

// ============================================================
// コンポーネント
// ============================================================

#[test]
fn test_component_options() {
    let source = r#"
import routes from './routes';
const NAME = 'greetWidget';
angular.module('app').component(NAME, {
    bindings: { title: '<', onChange: '&?change' },
    controller: GreetController,
    controllerAs: 'vm',
    templateUrl: './greet.html',
    $routeConfig: routes,
});
"#;
    let file = source_file("/app/src/greet.ts", source);
    let components = parse_components(&file, &[]);
    assert_eq!(components.len(), 1);

    let c = &components[0];
    assert_eq!(c.name, "greetWidget");
    assert_eq!(c.html_name, "greet-widget");
    assert_eq!(c.controller_class_name.as_deref(), Some("GreetController"));
    assert_eq!(c.controller_name, None);
    assert_eq!(c.controller_as, "vm");
    // 既知のコントローラーがないので未解決
    assert_eq!(c.controller, None);

    assert_eq!(c.bindings.len(), 2);
    assert_eq!(c.bindings[0].name, "title");
    assert_eq!(c.bindings[0].kind, BindingKind::OneWay);
    assert_eq!(c.bindings[1].name, "onChange");
    assert_eq!(c.bindings[1].html_name, "change");
    assert!(c.bindings[1].optional);
    assert_eq!(c.bindings[0].span.start_line, 4);

    match &c.template {
        Some(Artifact::External { uri, .. }) => assert_eq!(uri.path(), "/app/src/greet.html"),
        other => panic!("外部テンプレートであるべき: {:?}", other),
    }
    match &c.route {
        Some(Artifact::External { uri, .. }) => assert_eq!(uri.path(), "/app/src/routes.ts"),
        other => panic!("外部ルートであるべき: {:?}", other),
    }
}

#[test]
fn test_component_binds_registered_controller() {
    let controller_file = source_file(
        "/app/greet.controller.ts",
        "angular.module('app').controller('greetCtrl', GreetController);\nclass GreetController {}",
    );
    let controllers = parse_controllers(&controller_file);

    let source = r#"
angular.module('app').component('greetWidget', {
    controller: 'greetCtrl as vm',
    template: '<h1>{{vm.title}}</h1>',
});
"#;
    let file = source_file("/app/greet.component.ts", source);
    let components = parse_components(&file, &controllers);
    let c = &components[0];

    assert_eq!(c.controller_name.as_deref(), Some("greetCtrl"));
    assert_eq!(c.controller_as, "vm");
    assert_eq!(c.controller, Some(controllers[0].key()));
    match &c.template {
        Some(Artifact::Inline { body, uri, .. }) => {
            assert_eq!(body, "<h1>{{vm.title}}</h1>");
            assert_eq!(uri, &file.uri);
        }
        other => panic!("インラインテンプレートであるべき: {:?}", other),
    }
}

#[test]
fn test_component_options_from_class_instance() {
    let source = r#"
class WidgetOptions {
    bindings = { value: '=' };
    template = require('./widget.html');
    constructor() {
        this.controller = WidgetController;
    }
}
angular.module('app').component('myWidget', new WidgetOptions());
"#;
    let file = source_file("/app/widget/widget.ts", source);
    let components = parse_components(&file, &[]);
    assert_eq!(components.len(), 1);

    let c = &components[0];
    assert_eq!(c.controller_as, DEFAULT_CONTROLLER_AS);
    assert_eq!(c.bindings[0].kind, BindingKind::TwoWay);
    assert_eq!(c.controller_class_name.as_deref(), Some("WidgetController"));
    assert!(c.has_template_file(&Url::parse("file:///app/widget/widget.html").unwrap()));
}

#[test]
fn test_component_inline_route_and_root_template_url() {
    let source = r#"
const options = {
    templateUrl: 'views/shell.html',
    $routeConfig: [{ path: '/home', component: 'homePage' }],
};
angular.module('app').component('appShell', options);
"#;
    let uri = Url::parse("file:///work/src/shell.js").unwrap();
    let file = SourceFile::parse(uri, source.to_string())
        .unwrap()
        .with_root(Some(std::path::PathBuf::from("/work")));
    let components = parse_components(&file, &[]);
    let c = &components[0];

    assert!(c.has_template_file(&Url::parse("file:///work/views/shell.html").unwrap()));
    match &c.route {
        Some(Artifact::Inline { body, .. }) => assert!(body.contains("homePage")),
        other => panic!("インラインルートであるべき: {:?}", other),
    }
}

#[test]
fn test_parsing_is_deterministic() {
    let source = r#"
angular.module('app').controller('greetCtrl', GreetController);
class GreetController {
    title: string;
    greet(who: string): void {}
}
angular.module('app').component('greetWidget', {
    bindings: { title: '<', onChange: '&' },
    controller: 'greetCtrl',
    templateUrl: './greet.html',
});
"#;
    let first = source_file("/app/greet.ts", source);
    let second = source_file("/app/greet.ts", source);

    let controllers = parse_controllers(&first);
    assert_eq!(controllers, parse_controllers(&second));
    assert_eq!(
        parse_components(&first, &controllers),
        parse_components(&second, &parse_controllers(&second))
    );
}

#[test]
fn test_component_outside_module_chain_is_ignored() {
    let file = source_file("/app/x.js", "registry.component('notAComponent', {});");
    assert!(parse_components(&file, &[]).is_empty());
}

// ============================================================
// ルート・HTML
// ============================================================

#[test]
fn test_parse_routes() {
    let source = r#"
angular.module('app').config(function($routeProvider, $stateProvider) {
    $routeProvider
        .when('/greet', { component: 'greetWidget' })
        .when('/home', { template: '<home-page></home-page>' })
        .otherwise({ redirectTo: '/' });
    $stateProvider.state('about', { component: 'aboutPage' });
});
"#;
    let file = source_file("/app/routes.js", source);
    let routes = parse_routes(&file);
    assert_eq!(routes.len(), 3);

    let greet = routes.iter().find(|r| r.component == "greetWidget").unwrap();
    assert_eq!(greet.path.as_deref(), Some("/greet"));
    assert_eq!(greet.source, RouteSource::RouteProvider);

    let home = routes.iter().find(|r| r.component == "homePage").unwrap();
    assert_eq!(home.path.as_deref(), Some("/home"));

    let about = routes.iter().find(|r| r.component == "aboutPage").unwrap();
    assert_eq!(about.source, RouteSource::StateProvider);
    assert_eq!(about.path.as_deref(), Some("about"));
}

#[test]
fn test_parse_tag_usages() {
    let source = r#"<div>
  <greet-widget title="x"></greet-widget>
  <Other-Thing/>
  <span></span>
</div>"#;
    let file = source_file("/app/page.html", source);
    let usages = parse_tag_usages(&file);
    let tags: Vec<&str> = usages.iter().map(|u| u.tag.as_str()).collect();
    assert_eq!(tags, vec!["greet-widget", "other-thing"]);
    assert_eq!((usages[0].span.start_line, usages[0].span.start_col), (1, 3));

    // スクリプトからは抽出しない
    assert!(parse_controllers(&file).is_empty());
}
