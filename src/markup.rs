//! カーソル周辺のマークアップをテキストレベルで解析する
//!
//! テンプレート言語の完全な構文解析は行わず、タグの括弧位置と
//! タグ名・属性リストだけを扱う。オフセットはすべてバイト単位。

/// 括弧の探索方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    Backward,
    Forward,
}

/// 片方向の探索で見つかった括弧の位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagBrackets {
    /// `<` の位置
    pub opening: Option<usize>,
    /// `>` の位置
    pub closing: Option<usize>,
}

/// `\>` のようにエスケープされた括弧かどうか
fn is_escaped(bytes: &[u8], index: usize) -> bool {
    index > 0 && bytes[index - 1] == b'\\'
}

/// カーソル位置から片方向に括弧を探す
///
/// - Backward: 最初のエスケープされていない `>` を記録し、最初の `<` で止まる
/// - Forward: 最初の `<` を記録し、最初のエスケープされていない `>` で止まる
pub fn find_tag_brackets(text: &str, offset: usize, direction: ScanDirection) -> TagBrackets {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());
    let mut brackets = TagBrackets::default();

    match direction {
        ScanDirection::Backward => {
            for i in (0..offset).rev() {
                match bytes[i] {
                    b'>' if !is_escaped(bytes, i) => {
                        brackets.closing.get_or_insert(i);
                    }
                    b'<' => {
                        brackets.opening = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
        }
        ScanDirection::Forward => {
            for (i, b) in bytes.iter().enumerate().skip(offset) {
                match b {
                    b'<' => {
                        brackets.opening.get_or_insert(i);
                    }
                    b'>' if !is_escaped(bytes, i) => {
                        brackets.closing = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    brackets
}

/// 両方向の探索結果から、カーソルが1つの閉じたタグの内側にあるかを判定する
pub fn is_inside_a_closed_tag(before: &TagBrackets, after: &TagBrackets) -> bool {
    before.opening.is_some() && before.closing.is_none() && after.closing.is_some() && after.opening.is_none()
}

/// タグ内の属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAttribute {
    pub name: String,
    /// 値のない属性（`disabled` 等）は `None`
    pub value: Option<String>,
}

/// 括弧の内側を解析した結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag {
    pub tag: String,
    /// `</tag>` のような終了タグかどうか
    pub closing: bool,
    pub attributes: Vec<TagAttribute>,
}

impl ParsedTag {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// 括弧の内側（`<` と `>` を含まない）からタグ名と属性リストを取り出す
///
/// 空白と `=` で区切り、引用符はシングル・ダブル・なしのいずれも受け付ける。
/// 閉じられていない引用符は末尾までを値とする。
pub fn parse_tag(tag_text: &str) -> ParsedTag {
    let trimmed = tag_text.trim();
    let (closing, body) = match trimmed.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let body = body.strip_suffix('/').unwrap_or(body);

    let name_end = body.find(|c: char| c.is_whitespace()).unwrap_or(body.len());
    let tag = body[..name_end].to_ascii_lowercase();

    ParsedTag {
        tag,
        closing,
        attributes: parse_attributes(&body[name_end..]),
    }
}

fn parse_attributes(text: &str) -> Vec<TagAttribute> {
    let chars: Vec<char> = text.chars().collect();
    let mut attributes = Vec::new();
    let mut i = 0;

    let skip_whitespace = |i: &mut usize| {
        while *i < chars.len() && chars[*i].is_whitespace() {
            *i += 1;
        }
    };

    while i < chars.len() {
        skip_whitespace(&mut i);
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' {
            i += 1;
        }
        let name: String = chars[start..i].iter().collect();

        skip_whitespace(&mut i);
        let value = if i < chars.len() && chars[i] == '=' {
            i += 1;
            skip_whitespace(&mut i);
            Some(read_value(&chars, &mut i))
        } else {
            None
        };

        if name.is_empty() {
            // `="..."` のように名前のない値は読み飛ばす
            if value.is_none() {
                i += 1;
            }
            continue;
        }
        attributes.push(TagAttribute { name, value });
    }
    attributes
}

fn read_value(chars: &[char], i: &mut usize) -> String {
    match chars.get(*i) {
        Some(&quote) if quote == '"' || quote == '\'' => {
            *i += 1;
            let start = *i;
            while *i < chars.len() && chars[*i] != quote {
                *i += 1;
            }
            let value = chars[start..*i].iter().collect();
            // 閉じ引用符を読み飛ばす（なければ末尾）
            *i = (*i + 1).min(chars.len());
            value
        }
        _ => {
            let start = *i;
            while *i < chars.len() && !chars[*i].is_whitespace() {
                *i += 1;
            }
            chars[start..*i].iter().collect()
        }
    }
}

/// カーソルを囲む閉じたタグ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingTag {
    /// `<` の位置
    pub start: usize,
    /// `>` の位置
    pub end: usize,
    pub parsed: ParsedTag,
}

/// カーソルを囲むタグを探して解析する
pub fn enclosing_tag(text: &str, offset: usize) -> Option<EnclosingTag> {
    let before = find_tag_brackets(text, offset, ScanDirection::Backward);
    let after = find_tag_brackets(text, offset, ScanDirection::Forward);
    if !is_inside_a_closed_tag(&before, &after) {
        return None;
    }
    let start = before.opening?;
    let end = after.closing?;
    let parsed = parse_tag(text.get(start + 1..end)?);
    Some(EnclosingTag { start, end, parsed })
}

/// 入力途中（`>` がまだない）の開始タグ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    /// `<` の位置
    pub start: usize,
    /// `<` からカーソルまでのテキスト（`<` を含まない）
    pub text: String,
}

impl OpenTag {
    /// まだタグ名を入力中かどうか
    pub fn is_typing_tag_name(&self) -> bool {
        !self.text.contains(|c: char| c.is_whitespace())
    }

    /// 引用符で囲まれた属性値の中にいるかどうか
    pub fn is_inside_quotes(&self) -> bool {
        let mut quote = None;
        for c in self.text.chars() {
            match quote {
                Some(q) if c == q => quote = None,
                None if c == '"' || c == '\'' => quote = Some(c),
                _ => {}
            }
        }
        quote.is_some()
    }

    /// カーソル直前の入力中の単語
    pub fn prefix(&self) -> &str {
        let start = self
            .text
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_markup_word_char(*c))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[start..]
    }

    pub fn parsed(&self) -> ParsedTag {
        parse_tag(&self.text)
    }
}

/// カーソルの前にある開始タグ（閉じているかは問わない）
pub fn open_tag_before(text: &str, offset: usize) -> Option<OpenTag> {
    let offset = floor_char_boundary(text, offset);
    let before = find_tag_brackets(text, offset, ScanDirection::Backward);
    if before.closing.is_some() {
        return None;
    }
    let start = before.opening?;
    let tag_text = &text[start + 1..offset];
    if tag_text.starts_with('/') || tag_text.starts_with('!') {
        return None;
    }
    Some(OpenTag {
        start,
        text: tag_text.to_string(),
    })
}

/// マークアップの単語の構成文字（タグ名・属性名）
pub fn is_markup_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// カーソル位置の単語とその開始位置
pub fn word_at(text: &str, offset: usize) -> Option<(usize, &str)> {
    let offset = floor_char_boundary(text, offset);
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_markup_word_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| !is_markup_word_char(*c))
        .map(|(i, _)| offset + i)
        .unwrap_or(text.len());

    if start == end {
        None
    } else {
        Some((start, &text[start..end]))
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
