//! Expression lexer (tokenizer).
//!
//! Splits expression text into tokens: numbers, quoted strings, template
//! literals, identifiers (keywords are identifiers too; the parser decides)
//! and punctuation. Whitespace and `//` / `/* */` comments are skipped.
//!
//! Template literals are not tokenized recursively. The lexer returns the
//! literal text chunks and the raw source of each `${...}` substitution; the
//! parser compiles those sources on its own.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize, value},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// Token types recognized by the expression lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// Numeric literal (e.g., 42, 3.5, .5, 1e3)
    Number(f64),

    /// Quoted string literal with escapes decoded
    Str(String),

    /// Template literal (back-ticks)
    Template(Vec<TemplateChunk>),

    /// Identifier or keyword
    Ident(String),

    /// Operator or delimiter
    Punct(&'static str),
}

/// Piece of a template literal.
#[derive(Debug, PartialEq, Clone)]
pub enum TemplateChunk {
    /// Literal text, escapes decoded
    Text(String),
    /// Raw source of a `${...}` substitution
    Code(String),
}

/// A token and the byte offset it starts at.
#[derive(Debug, PartialEq, Clone)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// Byte offset into the source
    pub offset: usize,
}

/// Lexer failure.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// Byte offset of the failure
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at position {}", self.message, self.offset)
    }
}

/// Punctuators, longest first so that `===` wins over `==` and `=`.
const PUNCTUATORS: [&str; 36] = [
    "===", "!==", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "+", "-", "*", "/",
    "%", "<", ">", "!", "?", ":", ".", ",", ";", "(", ")", "[", "]", "{", "}", "=", "&", "|",
    "^", "~",
];

fn block_comment(input: &str) -> IResult<&str, ()> {
    value((), delimited(tag("/*"), take_until("*/"), tag("*/")))(input)
}

fn line_comment(input: &str) -> IResult<&str, ()> {
    value((), preceded(tag("//"), take_while(|c| c != '\n' && c != '\r')))(input)
}

/// Skip all whitespace and comments.
fn skip_ws(input: &str) -> &str {
    let mut remaining = input;
    loop {
        let trimmed = remaining.trim_start();
        if let Ok((rest, _)) = alt((block_comment, line_comment))(trimmed) {
            remaining = rest;
            continue;
        }
        return trimmed;
    }
}

/// Parse a decimal number: `12`, `1.5`, `.5`, `5.`, `1e-3`.
fn parse_number(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize(tuple((
        alt((recognize(pair(digit1, opt(pair(char('.'), digit0)))), recognize(pair(char('.'), digit1)))),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    let num: f64 = text.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((rest, Token::Number(num)))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Parse an identifier or keyword.
fn parse_ident(input: &str) -> IResult<&str, Token> {
    let (rest, name) = recognize(pair(take_while1(is_ident_start), take_while(is_ident_continue)))(input)?;
    Ok((rest, Token::Ident(name.to_string())))
}

/// Parse an operator or delimiter.
fn parse_punct(input: &str) -> IResult<&str, Token> {
    for p in PUNCTUATORS {
        if let Some(rest) = input.strip_prefix(p) {
            // `a?.5:1` is a conditional, not optional chaining
            if p == "?." && rest.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            return Ok((rest, Token::Punct(p)));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))
}

/// Decode one escape sequence after a backslash.
///
/// Returns the decoded text and the number of bytes consumed after the
/// backslash.
fn decode_escape(rest: &str) -> (String, usize) {
    let mut chars = rest.chars();
    match chars.next() {
        Some('n') => ("\n".into(), 1),
        Some('r') => ("\r".into(), 1),
        Some('t') => ("\t".into(), 1),
        Some('b') => ("\u{8}".into(), 1),
        Some('f') => ("\u{c}".into(), 1),
        Some('v') => ("\u{b}".into(), 1),
        Some('0') => ("\0".into(), 1),
        Some('u') => {
            let hex: String = rest[1..].chars().take(4).collect();
            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                Some(c) if hex.len() == 4 => (c.to_string(), 5),
                _ => ("u".into(), 1),
            }
        },
        // Line continuation
        Some('\n') => (String::new(), 1),
        Some(c) => (c.to_string(), c.len_utf8()),
        None => (String::new(), 0),
    }
}

/// Parse a single- or double-quoted string.
fn parse_string(input: &str) -> IResult<&str, Token> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)));
        },
    };

    let mut decoded = String::new();
    let mut pos = 1;
    while pos < input.len() {
        let c = input[pos..].chars().next().unwrap_or(quote);
        match c {
            '\\' => {
                let (text, used) = decode_escape(&input[pos + 1..]);
                decoded.push_str(&text);
                pos += 1 + used;
            },
            c if c == quote => return Ok((&input[pos + 1..], Token::Str(decoded))),
            '\n' => break,
            c => {
                decoded.push(c);
                pos += c.len_utf8();
            },
        }
    }

    // Unterminated string
    Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
}

/// Scan the body of a template literal.
///
/// With `terminator` set to `Some('`')` scanning stops at the closing
/// back-tick; with `None` the whole input is the body. Returns the chunks and
/// the byte length consumed (excluding the terminator).
pub fn scan_template(input: &str, terminator: Option<char>) -> Result<(Vec<TemplateChunk>, usize), LexError> {
    let mut chunks = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < input.len() {
        let c = input[pos..].chars().next().unwrap_or('\0');
        if Some(c) == terminator {
            if !text.is_empty() {
                chunks.push(TemplateChunk::Text(text));
            }
            return Ok((chunks, pos));
        }
        match c {
            '\\' => {
                let (decoded, used) = decode_escape(&input[pos + 1..]);
                text.push_str(&decoded);
                pos += 1 + used;
            },
            '$' if input[pos..].starts_with("${") => {
                let start = pos + 2;
                let end = find_substitution_end(input, start).ok_or_else(|| LexError {
                    offset: pos,
                    message: "Unterminated template substitution".to_string(),
                })?;
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                }
                chunks.push(TemplateChunk::Code(input[start..end].to_string()));
                pos = end + 1;
            },
            c => {
                text.push(c);
                pos += c.len_utf8();
            },
        }
    }

    if terminator.is_some() {
        return Err(LexError {
            offset: input.len(),
            message: "Unterminated template literal".to_string(),
        });
    }
    if !text.is_empty() {
        chunks.push(TemplateChunk::Text(text));
    }
    Ok((chunks, pos))
}

/// Find the `}` closing a `${` substitution that starts at `start`.
///
/// Braces inside nested strings and templates are ignored.
fn find_substitution_end(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(pos),
            b'}' => depth -= 1,
            q @ (b'\'' | b'"') => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != q {
                    if bytes[pos] == b'\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
            },
            b'`' => {
                let (_, used) = scan_template(&input[pos + 1..], Some('`')).ok()?;
                pos += used + 1;
            },
            _ => {},
        }
        pos += 1;
    }
    None
}

/// Parse a back-tick template literal.
fn parse_template(input: &str) -> IResult<&str, Token> {
    let (body, _) = char('`')(input)?;
    match scan_template(body, Some('`')) {
        Ok((chunks, used)) => Ok((&body[used + 1..], Token::Template(chunks))),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char))),
    }
}

/// Parse a single token after skipping whitespace and comments.
///
/// Order matters: numbers are tried before punctuation so that `.5` is a
/// number, and identifiers before everything else.
pub fn token(input: &str) -> IResult<&str, Token> {
    let input = skip_ws(input);
    alt((parse_ident, parse_number, parse_string, parse_template, parse_punct))(input)
}

/// Tokenize a whole expression.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    let mut tokens = Vec::new();
    let mut remaining = skip_ws(source);

    while !remaining.is_empty() {
        let offset = source.len() - remaining.len();
        match token(remaining) {
            Ok((rest, token)) => {
                tokens.push(Spanned { token, offset });
                remaining = skip_ws(rest);
            },
            Err(_) => {
                let found = remaining.chars().next().unwrap_or(' ');
                let message = match found {
                    '"' | '\'' => "Unterminated string".to_string(),
                    '`' => "Unterminated template literal".to_string(),
                    c => format!("Invalid or unexpected token '{}'", c),
                };
                return Err(LexError { offset, message });
            },
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_member_path() {
        assert_eq!(
            kinds("ctx.location.city"),
            vec![
                Token::Ident("ctx".into()),
                Token::Punct("."),
                Token::Ident("location".into()),
                Token::Punct("."),
                Token::Ident("city".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42"), vec![Token::Number(42.0)]);
        assert_eq!(kinds("1.5"), vec![Token::Number(1.5)]);
        assert_eq!(kinds(".5"), vec![Token::Number(0.5)]);
        assert_eq!(kinds("1e3"), vec![Token::Number(1000.0)]);
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(kinds(r#""New York""#), vec![Token::Str("New York".into())]);
        assert_eq!(kinds(r"'it\'s'"), vec![Token::Str("it's".into())]);
        assert_eq!(kinds(r#""a\nb""#), vec![Token::Str("a\nb".into())]);
    }

    #[test]
    fn test_longest_punctuator_wins() {
        assert_eq!(
            kinds("a === b"),
            vec![Token::Ident("a".into()), Token::Punct("==="), Token::Ident("b".into())]
        );
        assert_eq!(kinds("=>"), vec![Token::Punct("=>")]);
    }

    #[test]
    fn test_optional_chain_vs_conditional() {
        assert_eq!(kinds("a?.b")[1], Token::Punct("?."));
        assert_eq!(kinds("a?.5:1")[1], Token::Punct("?"));
    }

    #[test]
    fn test_template_literal() {
        assert_eq!(
            kinds("` ${ctx.a[0]}!`"),
            vec![Token::Template(vec![
                TemplateChunk::Text(" ".into()),
                TemplateChunk::Code("ctx.a[0]".into()),
                TemplateChunk::Text("!".into()),
            ])]
        );
    }

    #[test]
    fn test_template_with_nested_braces() {
        let (chunks, used) = scan_template("${ {a: '}'}.a } tail", None).unwrap();
        assert_eq!(used, 20);
        assert_eq!(chunks[0], TemplateChunk::Code(" {a: '}'}.a ".into()));
        assert_eq!(chunks[1], TemplateChunk::Text(" tail".into()));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(kinds("1 /* one */ + // two\n 2").len(), 3);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("  a + b").unwrap();
        assert_eq!(tokens[0].offset, 2);
        assert_eq!(tokens[2].offset, 6);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc").unwrap_err();
        assert_eq!(err.message, "Unterminated string");
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("a # b").unwrap_err();
        assert_eq!(err.offset, 2);
    }
}
