use std::path::{Component as PathComponent, Path, PathBuf};

use tower_lsp::lsp_types::{Position, Url};

/// ファイルがHTMLかどうか判定
pub fn is_html_file(uri: &Url) -> bool {
    let path = uri.path().to_lowercase();
    path.ends_with(".html") || path.ends_with(".htm")
}

/// camelCaseをkebab-caseに変換
/// 例: "myDirective" -> "my-directive"
pub fn camel_to_kebab(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// kebab-caseをcamelCaseに変換
/// 例: "my-directive" -> "myDirective"
pub fn kebab_to_camel(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '-' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// `..` と `.` を畳み込んだパスを返す（ファイルシステムには触れない）
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            PathComponent::ParentDir => {
                normalized.pop();
            }
            PathComponent::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 宣言ファイルを起点として参照パスを解決する
///
/// - `./` `../` で始まるパスは宣言ファイルのディレクトリから
/// - それ以外はワークスペースルートから（ルートが不明ならディレクトリから）
pub fn resolve_reference(declaring: &Url, reference: &str, root: Option<&Path>) -> Option<Url> {
    let reference = reference.split('?').next().unwrap_or(reference);
    let declaring_path = declaring.to_file_path().ok()?;
    let dir = declaring_path.parent()?;

    let base = if reference.starts_with("./") || reference.starts_with("../") {
        dir
    } else {
        root.unwrap_or(dir)
    };
    let joined = base.join(reference.trim_start_matches('/'));
    Url::from_file_path(normalize_path(&joined)).ok()
}

/// LSP Position（UTF-16）をバイトオフセットに変換
///
/// 行末を超える文字位置は行末に丸める
pub fn offset_at(text: &str, position: Position) -> Option<usize> {
    let mut line_start = 0;
    for _ in 0..position.line {
        let newline = text[line_start..].find('\n')?;
        line_start += newline + 1;
    }

    let line_end = text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len());
    let mut units = 0u32;
    for (i, c) in text[line_start..line_end].char_indices() {
        if units >= position.character {
            return Some(line_start + i);
        }
        units += c.len_utf16() as u32;
    }
    Some(line_end)
}

/// バイトオフセットをLSP Position（UTF-16）に変換
pub fn position_at(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let character = before[line_start..]
        .chars()
        .map(|c| c.len_utf16() as u32)
        .sum();
    Position { line, character }
}

/// バイト単位の列位置をUTF-16コードユニット単位の列位置に変換
///
/// `byte` はソース先頭からのバイトオフセット、`byte_col` はその行頭からのバイト数
pub fn byte_col_to_utf16_col(source: &str, byte: usize, byte_col: usize) -> u32 {
    let line_start = byte.saturating_sub(byte_col);
    match source.get(line_start..byte) {
        Some(before) => before.chars().map(|c| c.len_utf16() as u32).sum(),
        None => byte_col as u32,
    }
}

/// JS識別子の構成文字かどうか
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// カーソル位置の識別子を抽出
pub fn identifier_at(text: &str, offset: usize) -> Option<&str> {
    let offset = offset.min(text.len());
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| !is_identifier_char(*c))
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());

    if start == end { None } else { Some(&text[start..end]) }
}
