//! Syntax-aware tokenization and identifier classification.
//!
//! Best-effort, Python-oriented lexer: splits source into strings, comments,
//! numbers, identifiers, and punctuation, then classifies each identifier
//! occurrence as renamable or not. Classification fails closed — anything
//! the lexer cannot confidently call a local identifier (keywords, builtins,
//! dunders, imported names, `def`/`class` names, attribute accesses) is left
//! alone. Under-renaming is acceptable; corrupting code is not.

use std::collections::HashSet;

/// Lexical class of a source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword-shaped word.
    Word,
    /// Numeric literal.
    Number,
    /// String literal (including prefix and quotes).
    Str,
    /// Comment to end of line.
    Comment,
    /// Whitespace run.
    Whitespace,
    /// Any single punctuation / operator character.
    Symbol,
}

/// One lexed token: a kind plus its byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Token {
    /// The token's text within `source`.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Python keywords — never renamable.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Common builtins and magic names — never renamable.
const BUILTINS: &[&str] = &[
    "self", "cls", "print", "len", "range", "int", "str", "float", "bool", "list", "dict", "set",
    "tuple", "open", "input", "map", "filter", "zip", "enumerate", "sum", "min", "max", "abs",
    "round", "sorted", "reversed", "isinstance", "issubclass", "hasattr", "getattr", "setattr",
    "delattr", "type", "object", "super", "property", "classmethod", "staticmethod", "iter",
    "next", "repr", "hash", "id", "vars", "dir", "format", "any", "all", "ord", "chr", "bytes",
    "frozenset", "slice", "divmod", "pow", "Exception", "ValueError", "TypeError", "KeyError",
    "IndexError", "RuntimeError", "StopIteration", "AssertionError", "AttributeError",
    "ZeroDivisionError", "NotImplementedError", "OverflowError", "NameError",
];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_string_prefix(word: &str) -> bool {
    !word.is_empty()
        && word.len() <= 2
        && word
            .chars()
            .all(|c| matches!(c, 'r' | 'b' | 'f' | 'u' | 'R' | 'B' | 'F' | 'U'))
}

/// Lex `source` into a flat token stream covering every byte.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = source[i..].chars().next().expect("in-bounds char");
        let start = i;

        if c == '#' {
            // Comment runs to end of line.
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Comment,
                start,
                end: i,
            });
        } else if c == '\'' || c == '"' {
            i = lex_string(source, i);
            tokens.push(Token {
                kind: TokenKind::Str,
                start,
                end: i,
            });
        } else if is_ident_start(c) {
            while i < bytes.len() {
                let next = source[i..].chars().next().expect("in-bounds char");
                if !is_ident_continue(next) {
                    break;
                }
                i += next.len_utf8();
            }
            let word = &source[start..i];
            // A short r/b/f/u word glued to a quote is a string prefix,
            // not an identifier.
            if is_string_prefix(word)
                && i < bytes.len()
                && (bytes[i] == b'\'' || bytes[i] == b'"')
            {
                i = lex_string(source, i);
                tokens.push(Token {
                    kind: TokenKind::Str,
                    start,
                    end: i,
                });
            } else {
                tokens.push(Token {
                    kind: TokenKind::Word,
                    start,
                    end: i,
                });
            }
        } else if c.is_ascii_digit() {
            while i < bytes.len() {
                let next = source[i..].chars().next().expect("in-bounds char");
                if !(next.is_ascii_alphanumeric() || next == '.' || next == '_') {
                    break;
                }
                i += next.len_utf8();
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                start,
                end: i,
            });
        } else if c.is_whitespace() {
            while i < bytes.len() {
                let next = source[i..].chars().next().expect("in-bounds char");
                if !next.is_whitespace() {
                    break;
                }
                i += next.len_utf8();
            }
            tokens.push(Token {
                kind: TokenKind::Whitespace,
                start,
                end: i,
            });
        } else {
            i += c.len_utf8();
            tokens.push(Token {
                kind: TokenKind::Symbol,
                start,
                end: i,
            });
        }
    }

    tokens
}

/// Consume a string literal starting at the opening quote; returns the byte
/// offset one past its end. Handles single, double, and triple quotes plus
/// backslash escapes; an unterminated literal runs to end of input.
fn lex_string(source: &str, open: usize) -> usize {
    let bytes = source.as_bytes();
    let quote = bytes[open];
    let triple = open + 2 < bytes.len() && bytes[open + 1] == quote && bytes[open + 2] == quote;
    let mut i = if triple { open + 3 } else { open + 1 };

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if triple {
                if i + 2 < bytes.len() && bytes[i + 1] == quote && bytes[i + 2] == quote {
                    return i + 3;
                }
                i += 1;
                continue;
            }
            return i + 1;
        }
        if !triple && bytes[i] == b'\n' {
            // Unterminated single-line literal; stop at the newline.
            return i;
        }
        i += 1;
    }
    bytes.len()
}

/// Identifier classification over a lexed token stream.
#[derive(Debug)]
pub struct IdentifierIndex {
    /// Names that must never be renamed: keywords, builtins, imports,
    /// `def`/`class` names, dunders.
    preserved: HashSet<String>,
    /// Distinct renamable names, in first-occurrence order.
    renamable: Vec<String>,
    /// Every distinct word appearing in the document (for collision checks).
    all_names: HashSet<String>,
}

impl IdentifierIndex {
    /// Build the index for `source` over its token stream.
    #[must_use]
    pub fn build(source: &str, tokens: &[Token]) -> Self {
        let mut preserved: HashSet<String> =
            KEYWORDS.iter().chain(BUILTINS).map(|s| (*s).to_string()).collect();
        let mut all_names = HashSet::new();

        // Pass 1: collect preserved names.
        let words: Vec<(usize, &str)> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::Word)
            .map(|(i, t)| (i, t.text(source)))
            .collect();

        for (word_pos, &(token_index, word)) in words.iter().enumerate() {
            all_names.insert(word.to_string());

            // Dunders are never touched.
            if word.starts_with("__") && word.ends_with("__") {
                preserved.insert(word.to_string());
            }

            // The name after `def` / `class` is a function/class name.
            if let Some(&(_, previous)) = word_pos.checked_sub(1).and_then(|p| words.get(p)) {
                if (previous == "def" || previous == "class")
                    && prev_word_adjacent(tokens, token_index)
                {
                    preserved.insert(word.to_string());
                }
            }

            // Every identifier on an import line is preserved (fail closed:
            // module paths, imported symbols, and aliases all stay).
            if on_import_line(source, tokens[token_index].start) {
                preserved.insert(word.to_string());
            }
        }

        // Pass 2: renamable names in first-occurrence order. Attribute
        // accesses (`.name`) do not introduce renamable names.
        let mut renamable = Vec::new();
        let mut seen = HashSet::new();
        for (index, token) in tokens.iter().enumerate() {
            if token.kind != TokenKind::Word {
                continue;
            }
            let word = token.text(source);
            if preserved.contains(word) || seen.contains(word) {
                continue;
            }
            if is_attribute_access(source, tokens, index) {
                continue;
            }
            seen.insert(word.to_string());
            renamable.push(word.to_string());
        }

        Self {
            preserved,
            renamable,
            all_names,
        }
    }

    /// Distinct renamable names in first-occurrence order.
    #[must_use]
    pub fn renamable(&self) -> &[String] {
        &self.renamable
    }

    /// Whether `name` is classified as never-renamable.
    #[must_use]
    pub fn is_preserved(&self, name: &str) -> bool {
        self.preserved.contains(name)
    }

    /// Whether `name` appears anywhere in the document.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.all_names.contains(name)
    }

    /// Mark additional names as preserved (e.g. names bound in a protected
    /// prompt prefix).
    pub fn preserve_names<I: IntoIterator<Item = String>>(&mut self, names: I) {
        for name in names {
            self.preserved.insert(name.clone());
            self.renamable.retain(|n| n != &name);
        }
    }
}

/// Whether the word at `token_index` directly follows the previous word
/// with only whitespace between (guards the `def name` / `class name` rule
/// against e.g. `def f(klass, name)`).
fn prev_word_adjacent(tokens: &[Token], token_index: usize) -> bool {
    let mut i = token_index;
    while i > 0 {
        i -= 1;
        match tokens[i].kind {
            TokenKind::Whitespace => continue,
            TokenKind::Word => return true,
            _ => return false,
        }
    }
    false
}

/// Whether the word at `token_index` is an attribute access (preceded by a
/// `.` symbol, ignoring whitespace).
pub(crate) fn is_attribute_access(source: &str, tokens: &[Token], token_index: usize) -> bool {
    let mut i = token_index;
    while i > 0 {
        i -= 1;
        match tokens[i].kind {
            TokenKind::Whitespace => continue,
            TokenKind::Symbol => return tokens[i].text(source) == ".",
            _ => return false,
        }
    }
    false
}

/// Whether the byte offset sits on a line whose first word is `import` or
/// `from`.
fn on_import_line(source: &str, offset: usize) -> bool {
    let line_start = source[..offset].rfind('\n').map_or(0, |p| p + 1);
    let line = &source[line_start..];
    let line = &line[..line.find('\n').unwrap_or(line.len())];
    let trimmed = line.trim_start();
    trimmed.starts_with("import ") || trimmed.starts_with("from ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(source: &str) -> Vec<String> {
        tokenize(source)
            .iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text(source).to_string())
            .collect()
    }

    #[test]
    fn test_tokenize_covers_every_byte() {
        let source = "def f(x):\n    return x + 1  # done\n";
        let tokens = tokenize(source);
        let mut cursor = 0;
        for token in &tokens {
            assert_eq!(token.start, cursor);
            cursor = token.end;
        }
        assert_eq!(cursor, source.len());
    }

    #[test]
    fn test_strings_are_opaque() {
        let source = "x = \"total + num\"";
        assert_eq!(words(source), vec!["x"]);
    }

    #[test]
    fn test_triple_quoted_string() {
        let source = "s = '''multi\nline x y z'''\ny = 1";
        assert_eq!(words(source), vec!["s", "y"]);
    }

    #[test]
    fn test_fstring_prefix_not_identifier() {
        let source = "msg = f\"{x}\"";
        // `f` is a string prefix; `x` inside the literal is opaque.
        assert_eq!(words(source), vec!["msg"]);
    }

    #[test]
    fn test_comments_are_opaque() {
        let source = "x = 1  # total counter";
        assert_eq!(words(source), vec!["x"]);
    }

    #[test]
    fn test_index_first_occurrence_order() {
        let source = "total = 0\nfor num in items:\n    total += num\n";
        let tokens = tokenize(source);
        let index = IdentifierIndex::build(source, &tokens);
        assert_eq!(index.renamable(), &["total", "num", "items"]);
    }

    #[test]
    fn test_keywords_and_builtins_preserved() {
        let source = "for x in range(len(data)):\n    print(x)\n";
        let tokens = tokenize(source);
        let index = IdentifierIndex::build(source, &tokens);
        assert_eq!(index.renamable(), &["x", "data"]);
        assert!(index.is_preserved("for"));
        assert!(index.is_preserved("range"));
        assert!(index.is_preserved("print"));
    }

    #[test]
    fn test_def_name_preserved_params_renamable() {
        let source = "def calculate_sum(numbers):\n    return numbers\n";
        let tokens = tokenize(source);
        let index = IdentifierIndex::build(source, &tokens);
        assert!(index.is_preserved("calculate_sum"));
        assert_eq!(index.renamable(), &["numbers"]);
    }

    #[test]
    fn test_import_line_names_preserved() {
        let source = "import os\nfrom math import sqrt as root\npath = os.path\n";
        let tokens = tokenize(source);
        let index = IdentifierIndex::build(source, &tokens);
        assert!(index.is_preserved("os"));
        assert!(index.is_preserved("sqrt"));
        assert!(index.is_preserved("root"));
        assert!(index.is_preserved("math"));
        assert_eq!(index.renamable(), &["path"]);
    }

    #[test]
    fn test_attribute_access_not_renamable() {
        let source = "result = obj.value + value\n";
        let tokens = tokenize(source);
        let index = IdentifierIndex::build(source, &tokens);
        // `obj` and the bare `value` are renamable; the `.value` occurrence
        // never introduces a name on its own.
        assert_eq!(index.renamable(), &["result", "obj", "value"]);
    }

    #[test]
    fn test_dunder_preserved() {
        let source = "if __name__ == '__main__':\n    run()\n";
        let tokens = tokenize(source);
        let index = IdentifierIndex::build(source, &tokens);
        assert!(index.is_preserved("__name__"));
        assert_eq!(index.renamable(), &["run"]);
    }

    #[test]
    fn test_preserve_names_removes_from_renamable() {
        let source = "a = 1\nb = 2\n";
        let tokens = tokenize(source);
        let mut index = IdentifierIndex::build(source, &tokens);
        index.preserve_names(vec!["a".to_string()]);
        assert_eq!(index.renamable(), &["b"]);
        assert!(index.is_preserved("a"));
    }
}
