use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Location, Url};

use super::key::EntityKey;
use super::span::Span;

/// `.component()` で登録されるAngularJSコンポーネント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// 登録名（camelCase）
    pub name: String,
    /// HTMLタグ名（kebab-case）
    pub html_name: String,
    pub uri: Url,
    /// 登録名リテラルの位置
    pub span: Span,
    /// インデックスが再解決するコントローラー参照
    pub controller: Option<EntityKey>,
    /// `controller: 'Name'` で指定された登録名
    pub controller_name: Option<String>,
    /// `controller: ClassName` で指定されたクラス名
    pub controller_class_name: Option<String>,
    pub controller_as: String,
    pub bindings: Vec<Binding>,
    pub template: Option<Template>,
    pub route: Option<Route>,
}

impl Component {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.uri, &self.span)
    }

    pub fn location(&self) -> Location {
        Location {
            uri: self.uri.clone(),
            range: self.span.to_lsp_range(),
        }
    }

    pub fn binding_by_html_name(&self, html_name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.html_name == html_name)
    }

    /// 指定URIが外部テンプレートかどうか
    pub fn has_template_file(&self, uri: &Url) -> bool {
        matches!(&self.template, Some(Artifact::External { uri: t, .. }) if t == uri)
    }
}

/// バインディングの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    /// `<`
    OneWay,
    /// `=`
    TwoWay,
    /// `&`
    Expression,
    /// `@`
    Literal,
}

impl BindingKind {
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '<' => Some(BindingKind::OneWay),
            '=' => Some(BindingKind::TwoWay),
            '&' => Some(BindingKind::Expression),
            '@' => Some(BindingKind::Literal),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            BindingKind::OneWay => '<',
            BindingKind::TwoWay => '=',
            BindingKind::Expression => '&',
            BindingKind::Literal => '@',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::OneWay => "one-way",
            BindingKind::TwoWay => "two-way",
            BindingKind::Expression => "expression",
            BindingKind::Literal => "literal",
        }
    }
}

/// コンポーネントのbindingsプロパティの1エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// コントローラーのメンバー名
    pub name: String,
    /// HTML属性名（kebab-case）
    pub html_name: String,
    pub kind: BindingKind,
    pub optional: bool,
    pub span: Span,
}

impl Binding {
    /// `<?`, `=title` のような宣言文字列
    pub fn declaration(&self) -> String {
        let mut s = String::new();
        s.push(self.kind.symbol());
        if self.optional {
            s.push('?');
        }
        s
    }
}

/// テンプレート・ルートの実体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Artifact {
    /// 別ファイル
    External { uri: Url, span: Span },
    /// 宣言ファイル内に埋め込まれた本文
    Inline { uri: Url, body: String, span: Span },
}

pub type Template = Artifact;
pub type Route = Artifact;

impl Artifact {
    pub fn location(&self) -> Location {
        match self {
            Artifact::External { uri, span } | Artifact::Inline { uri, span, .. } => Location {
                uri: uri.clone(),
                range: span.to_lsp_range(),
            },
        }
    }

    pub fn uri(&self) -> &Url {
        match self {
            Artifact::External { uri, .. } | Artifact::Inline { uri, .. } => uri,
        }
    }
}
