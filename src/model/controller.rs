use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Location, Url};

use super::key::EntityKey;
use super::span::Span;

/// コンポーネントの振る舞いを提供するコントローラークラス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    /// フレームワークに登録された名前（`.controller('name', Class)` で別名が付く場合がある）
    pub name: String,
    pub class_name: String,
    pub uri: Url,
    /// 定義位置（メンバーリストの開始位置）
    pub span: Span,
    /// クラス名識別子の位置
    pub name_span: Span,
    pub base_class_name: Option<String>,
    /// 基底コントローラー（インデックスが再解決する）
    pub base: Option<EntityKey>,
    pub members: Vec<Member>,
}

impl Controller {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.uri, &self.span)
    }

    pub fn location(&self) -> Location {
        Location {
            uri: self.uri.clone(),
            range: self.span.to_lsp_range(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    Property,
    Method { parameters: Vec<Parameter> },
}

/// コントローラーのメンバー（プロパティ・メソッド）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// 所属するコントローラーのクラス名
    pub owner: String,
    pub name: String,
    /// 宣言された型（メソッドの場合は戻り値の型）
    pub type_text: String,
    pub kind: MemberKind,
    pub span: Span,
}

impl Member {
    pub fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method { .. })
    }

    /// 補完候補のドキュメント
    ///
    /// - メソッド: `name(a: T, b: U): R`
    /// - プロパティ: `Type: T`
    pub fn documentation(&self) -> String {
        match &self.kind {
            MemberKind::Method { parameters } => {
                let params = parameters
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.type_text))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({}): {}", self.name, params, self.type_text)
            }
            MemberKind::Property => format!("Type: {}", self.type_text),
        }
    }
}
