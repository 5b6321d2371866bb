use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Url;

use super::span::Span;

/// ルーティングの登録方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteSource {
    /// `$routeProvider.when()` / `.otherwise()`
    RouteProvider,
    /// `$stateProvider.state()` (ui-router)
    StateProvider,
}

impl RouteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteSource::RouteProvider => "$routeProvider",
            RouteSource::StateProvider => "$stateProvider",
        }
    }
}

/// ルートファイル内で宣言されたルート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub uri: Url,
    /// 設定オブジェクトの位置
    pub span: Span,
    /// ルートのパスまたはステート名（`.otherwise()` の場合はなし）
    pub path: Option<String>,
    /// ルーティング先コンポーネントの登録名（camelCase）
    pub component: String,
    pub source: RouteSource,
}
