/*!
# File Rewriter

Applies a substitution table to a token stream and writes the source back
out. Output is reassembled from token spans, so every byte outside a
substituted name or keyword is copied from the input unchanged.
*/

use std::path::Path;

use tracing::trace;

use crate::encoding::SourceEncoding;
use crate::errors::{Result, UnasyncError};
use crate::lexer::{tokenize, LexError, Token, TokenKind};
use crate::table::SubstitutionTable;

/// Rewrite an already tokenized source.
///
/// `tokens` must have been produced from `source`. When a token is replaced
/// by the empty string, the blanks right after it go too, so
/// `print(await x)` becomes `print(x)` rather than `print( x)`.
pub fn rewrite(source: &str, tokens: &[Token<'_>], table: &SubstitutionTable) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    let mut removed = false;
    let mut substitutions = 0usize;

    for token in tokens {
        // Anything the stream does not cover is copied verbatim.
        if token.span.start > cursor {
            out.push_str(&source[cursor..token.span.start]);
        }
        cursor = token.span.end;

        if removed && token.kind == TokenKind::Whitespace && !token.text.starts_with('\\') {
            continue;
        }
        removed = false;

        let original = &source[token.span.clone()];
        match token
            .kind
            .is_substitutable()
            .then(|| table.get(original))
            .flatten()
        {
            Some(replacement) => {
                out.push_str(replacement);
                removed = replacement.is_empty();
                substitutions += 1;
            }
            None => out.push_str(original),
        }
    }

    if cursor < source.len() {
        out.push_str(&source[cursor..]);
    }

    trace!(substitutions, "rewrote token stream");
    out
}

/// Tokenize and rewrite decoded source text.
pub fn rewrite_source(source: &str, table: &SubstitutionTable) -> std::result::Result<String, LexError> {
    let tokens = tokenize(source)?;
    Ok(rewrite(source, &tokens, table))
}

/// Rewrite raw file contents, decoding and re-encoding with the file's own
/// encoding. `path` is only used for error reporting.
pub fn rewrite_bytes(path: &Path, bytes: &[u8], table: &SubstitutionTable) -> Result<Vec<u8>> {
    let encoding = SourceEncoding::detect(bytes).map_err(|msg| UnasyncError::encoding(path, msg))?;
    let source = encoding
        .decode(bytes)
        .map_err(|msg| UnasyncError::encoding(path, msg))?;

    let output = rewrite_source(&source, table).map_err(|err| UnasyncError::Tokenize {
        path: path.to_path_buf(),
        line: err.line(&source),
        message: err.to_string(),
    })?;

    encoding
        .encode(&output)
        .map_err(|msg| UnasyncError::encoding(path, msg))
}
