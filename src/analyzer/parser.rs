use std::path::PathBuf;

use tower_lsp::lsp_types::Url;
use tree_sitter::{Language, Parser, Tree};

use crate::error::AnalyzerError;

/// 解析対象の言語
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    TypeScript,
    JavaScript,
    Html,
}

impl SourceLanguage {
    /// URIの拡張子から言語を判定
    pub fn from_uri(uri: &Url) -> Option<Self> {
        let path = uri.path().to_lowercase();
        let ext = path.rsplit('.').next()?;
        match ext {
            "ts" => Some(SourceLanguage::TypeScript),
            "js" => Some(SourceLanguage::JavaScript),
            "html" | "htm" => Some(SourceLanguage::Html),
            _ => None,
        }
    }

    fn grammar(&self) -> Language {
        match self {
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceLanguage::Html => tree_sitter_html::LANGUAGE.into(),
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, SourceLanguage::TypeScript | SourceLanguage::JavaScript)
    }
}

pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new(language: SourceLanguage) -> Result<Self, AnalyzerError> {
        let mut parser = Parser::new();
        parser.set_language(&language.grammar())?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Option<Tree> {
        self.parser.parse(source, None)
    }
}

/// 構文木付きのソースファイル
pub struct SourceFile {
    pub uri: Url,
    pub text: String,
    pub tree: Tree,
    pub language: SourceLanguage,
    /// ルート相対のtemplateUrlを解決するためのワークスペースルート
    pub root: Option<PathBuf>,
}

impl SourceFile {
    /// 拡張子に応じた文法でテキストを解析する
    pub fn parse(uri: Url, text: String) -> Result<Self, AnalyzerError> {
        let language = SourceLanguage::from_uri(&uri)
            .ok_or_else(|| AnalyzerError::UnsupportedFile(uri.to_string()))?;
        let tree = SourceParser::new(language)?
            .parse(&text)
            .ok_or_else(|| AnalyzerError::Parse(uri.to_string()))?;

        if tree.root_node().has_error() {
            tracing::debug!("{} contains syntax errors, extracting what is recognizable", uri);
        }

        Ok(Self {
            uri,
            text,
            tree,
            language,
            root: None,
        })
    }

    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("uri", &self.uri.as_str())
            .field("language", &self.language)
            .finish()
    }
}
