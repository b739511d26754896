//! Python lexer
//!
//! This module turns Python source text into a contiguous token stream using
//! the logos lexer library. Every byte of the source belongs to exactly one
//! token, so the stream can be written back out span by span without losing
//! spacing, comments or string contents.
//!
//! The lexer is deliberately shallow: it knows where names, strings and
//! comments start and end, and nothing about the grammar around them.

use std::ops::Range;

use logos::{Lexer, Logos};

/// Python hard keywords
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Token classification exposed to the rewriter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Keyword,
    String,
    Number,
    Comment,
    Op,
    Newline,
    Whitespace,
    Other,
}

impl TokenKind {
    /// Only names and keywords are ever looked up in a substitution table
    pub fn is_substitutable(self) -> bool {
        matches!(self, TokenKind::Name | TokenKind::Keyword)
    }
}

/// A token with its location in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Range<usize>,
}

/// Lexing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
pub enum LexError {
    /// Input the lexer has no rule for; recovered as an `Other` token
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,

    #[error("unterminated string starting at byte {offset}")]
    UnterminatedString { offset: usize },
}

impl LexError {
    /// 1-based line number of the failure within `source`
    pub fn line(&self, source: &str) -> usize {
        match self {
            LexError::UnterminatedString { offset } => {
                source[..(*offset).min(source.len())].matches('\n').count() + 1
            }
            LexError::UnexpectedCharacter => 1,
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(error = LexError)]
enum RawToken {
    #[regex(r"[ \t\x0C]+")]
    #[regex(r"\\(\r\n|\n|\r)")]
    Whitespace,

    #[regex(r"\r\n|\n|\r")]
    Newline,

    #[regex(r"#[^\r\n]*")]
    Comment,

    #[regex(r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Name,

    /// Replacement field expressions, relative to the token start
    #[regex(r#"([rRbBuUfF]|[rR][bBfF]|[bBfF][rR])?("|'|"""|''')"#, string_body)]
    String(Vec<Range<usize>>),

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9_]+)?[jJlL]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?[jJ]?")]
    #[regex(r"0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+")]
    Number,

    #[regex(r"\*\*=?|//=?|>>=?|<<=?|->|:=|\.\.\.|!=|[-+*/%@&|^<>=]=?")]
    #[regex(r"[~:.,;()\[\]{}]")]
    Op,
}

/// Consume a string body after its prefix and opening quote.
fn string_body(lex: &mut Lexer<RawToken>) -> Result<Vec<Range<usize>>, LexError> {
    let opening = lex.slice();
    let offset = lex.span().start;
    let triple = opening.ends_with("\"\"\"") || opening.ends_with("'''");
    let quote = opening.as_bytes()[opening.len() - 1];
    let prefix = &opening[..opening.len() - if triple { 3 } else { 1 }];

    let mut body = StringBody {
        rest: lex.remainder(),
        quote,
        triple,
        raw: prefix.contains(['r', 'R']),
        fields: Vec::new(),
    };
    let consumed = body
        .literal(0, prefix.contains(['f', 'F']))
        .ok_or(LexError::UnterminatedString { offset })?;
    let head = opening.len();
    let fields = body
        .fields
        .into_iter()
        .map(|field| field.start + head..field.end + head)
        .collect();

    lex.bump(consumed);
    Ok(fields)
}

/// Scanner for the text following a string's opening quote.
///
/// F-string replacement fields are lexed with the full token grammar, so a
/// quote inside `{...}` never closes the enclosing literal.
struct StringBody<'s> {
    rest: &'s str,
    quote: u8,
    triple: bool,
    raw: bool,
    /// Expression ranges of replacement fields, relative to `rest`
    fields: Vec<Range<usize>>,
}

impl StringBody<'_> {
    /// Scan literal text from `i`; returns the index just past the closing quote.
    fn literal(&mut self, mut i: usize, fstring: bool) -> Option<usize> {
        let rest = self.rest;
        let bytes = rest.as_bytes();
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += self.escape_len(i, fstring),
                b'\n' | b'\r' if !self.triple => return None,
                b'{' if fstring && bytes.get(i + 1) == Some(&b'{') => i += 2,
                b'{' if fstring => i = self.field(i + 1)?,
                c if c == self.quote => {
                    if !self.triple {
                        return Some(i + 1);
                    }
                    if bytes.get(i + 1) == Some(&c) && bytes.get(i + 2) == Some(&c) {
                        return Some(i + 3);
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
        None
    }

    fn escape_len(&self, i: usize, fstring: bool) -> usize {
        let bytes = self.rest.as_bytes();
        match bytes.get(i + 1) {
            Some(b'{' | b'}') if fstring => 1,
            Some(b'N') if fstring && !self.raw && bytes.get(i + 2) == Some(&b'{') => bytes[i..]
                .iter()
                .position(|&b| b == b'}')
                .map_or(bytes.len() - i, |end| end + 1),
            Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => 3,
            _ => 2,
        }
    }

    /// Scan a replacement field whose expression starts at `start`; returns
    /// the index just past its closing brace.
    fn field(&mut self, start: usize) -> Option<usize> {
        let rest = self.rest;
        let mut lexer = RawToken::lexer(&rest[start..]);
        let mut depth = 0usize;
        let end = loop {
            let token = lexer.next()?;
            match (token, lexer.slice()) {
                (Err(LexError::UnterminatedString { .. }), _) => return None,
                (Ok(RawToken::Op), "(" | "[" | "{") => depth += 1,
                (Ok(RawToken::Op), ")" | "]" | "}") if depth > 0 => depth -= 1,
                (Ok(RawToken::Op), "}" | ":" | ":=") if depth == 0 => break start + lexer.span().start,
                (Err(_), text) if depth == 0 && text.starts_with('!') => break start + lexer.span().start,
                _ => {}
            }
        };
        self.fields.push(start..end);

        let bytes = rest.as_bytes();
        let mut i = end;
        if bytes[i] == b'!' {
            while i < bytes.len() && !matches!(bytes[i], b':' | b'}') {
                i += 1;
            }
        }
        match bytes.get(i)? {
            b'}' => Some(i + 1),
            _ => self.format_spec(i + 1),
        }
    }

    /// Scan a format spec up to the brace closing its field.
    fn format_spec(&mut self, mut i: usize) -> Option<usize> {
        let rest = self.rest;
        let bytes = rest.as_bytes();
        while i < bytes.len() {
            match bytes[i] {
                b'}' => return Some(i + 1),
                b'{' => i = self.field(i + 1)?,
                b'\\' => i += self.escape_len(i, true),
                b'\n' | b'\r' if !self.triple => return None,
                _ => i += 1,
            }
        }
        None
    }
}

fn classify(raw: &RawToken, text: &str) -> TokenKind {
    match raw {
        RawToken::Name if KEYWORDS.contains(&text) => TokenKind::Keyword,
        RawToken::Name => TokenKind::Name,
        RawToken::String(_) => TokenKind::String,
        RawToken::Number => TokenKind::Number,
        RawToken::Comment => TokenKind::Comment,
        RawToken::Op => TokenKind::Op,
        RawToken::Newline => TokenKind::Newline,
        RawToken::Whitespace => TokenKind::Whitespace,
    }
}

/// Tokenize Python source with location information
///
/// Characters the lexer does not recognise are kept as `Other` tokens; only
/// an unterminated string aborts tokenization.
///
/// An f-string is split around its replacement fields: the literal pieces
/// (braces included) are `String` tokens and each field expression is
/// tokenized like ordinary code, so `f"{await x}"` yields a `Keyword`.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    lex_into(source, 0, &mut tokens)?;
    Ok(tokens)
}

fn lex_into<'src>(source: &'src str, base: usize, tokens: &mut Vec<Token<'src>>) -> Result<(), LexError> {
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let local = lexer.span();
        let text = &source[local.clone()];
        let span = base + local.start..base + local.end;
        match result {
            Ok(RawToken::String(fields)) if !fields.is_empty() => {
                split_fstring(text, span.start, &fields, tokens)?;
            }
            Ok(raw) => tokens.push(Token {
                kind: classify(&raw, text),
                text,
                span,
            }),
            Err(LexError::UnexpectedCharacter) => tokens.push(Token {
                kind: TokenKind::Other,
                text,
                span,
            }),
            Err(LexError::UnterminatedString { offset }) => {
                return Err(LexError::UnterminatedString { offset: base + offset });
            }
        }
    }

    Ok(())
}

fn split_fstring<'src>(
    text: &'src str,
    base: usize,
    fields: &[Range<usize>],
    tokens: &mut Vec<Token<'src>>,
) -> Result<(), LexError> {
    let literal = move |range: Range<usize>| Token {
        kind: TokenKind::String,
        text: &text[range.clone()],
        span: base + range.start..base + range.end,
    };

    let mut cursor = 0;
    for field in fields {
        tokens.push(literal(cursor..field.start));
        lex_into(&text[field.clone()], base + field.start, tokens)?;
        cursor = field.end;
    }
    tokens.push(literal(cursor..text.len()));
    Ok(())
}
