use super::token::{Span, Token, TokenKind};
use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;

/// What a matched rule turns into
enum Rule {
    /// Whitespace and comments
    Skip,
    /// Token whose kind does not depend on the matched text
    Fixed(TokenKind),
    /// `=` and the compound assignments
    Assign,
    Identifier,
    Decimal,
    Hex,
    Str,
    Char,
    /// `#include <...>`
    IncludeLib,
    /// `#include "..."`
    IncludeLocal,
    /// Catch-all single character, always an error
    Unidentified,
}

lazy_static! {
    /// Ordered tokenizer rules. The longest match wins; ties go to the rule listed first,
    /// which is how `int` beats the identifier rule while `international` does not.
    static ref RULES: Vec<(Regex, Rule)> = {
        let rules: Vec<(&str, Rule)> = vec![
            (r"\s+", Rule::Skip),
            ("void", Rule::Fixed(TokenKind::Void)),
            ("int", Rule::Fixed(TokenKind::Int)),
            ("bool", Rule::Fixed(TokenKind::Int)),
            ("char", Rule::Fixed(TokenKind::Int)),
            ("struct", Rule::Fixed(TokenKind::Struct)),
            ("true", Rule::Fixed(TokenKind::True)),
            ("false", Rule::Fixed(TokenKind::False)),
            ("&&", Rule::Fixed(TokenKind::AndAnd)),
            (r"\|\|", Rule::Fixed(TokenKind::OrOr)),
            ("!", Rule::Fixed(TokenKind::Bang)),
            ("return", Rule::Fixed(TokenKind::Return)),
            ("if", Rule::Fixed(TokenKind::If)),
            ("else", Rule::Fixed(TokenKind::Else)),
            ("while", Rule::Fixed(TokenKind::While)),
            ("for", Rule::Fixed(TokenKind::For)),
            ("do", Rule::Fixed(TokenKind::Do)),
            ("print", Rule::Fixed(TokenKind::Print)),
            ("break", Rule::Fixed(TokenKind::Break)),
            ("continue", Rule::Fixed(TokenKind::Continue)),
            ("switch", Rule::Fixed(TokenKind::Switch)),
            ("case", Rule::Fixed(TokenKind::Case)),
            ("default", Rule::Fixed(TokenKind::Default)),
            (";", Rule::Fixed(TokenKind::Semicolon)),
            (",", Rule::Fixed(TokenKind::Comma)),
            (":", Rule::Fixed(TokenKind::Colon)),
            (r"\.", Rule::Fixed(TokenKind::Dot)),
            (r"\(", Rule::Fixed(TokenKind::LeftParen)),
            (r"\)", Rule::Fixed(TokenKind::RightParen)),
            (r"\{", Rule::Fixed(TokenKind::LeftBrace)),
            (r"\}", Rule::Fixed(TokenKind::RightBrace)),
            (r"\[", Rule::Fixed(TokenKind::LeftBracket)),
            (r"\]", Rule::Fixed(TokenKind::RightBracket)),
            (r"=|\+=|-=|\*=|/=|%=|<<=|>>=|&=|\|=|\^=", Rule::Assign),
            ("<=", Rule::Fixed(TokenKind::LessEqual)),
            (">=", Rule::Fixed(TokenKind::GreaterEqual)),
            ("==", Rule::Fixed(TokenKind::EqualEqual)),
            ("!=", Rule::Fixed(TokenKind::BangEqual)),
            ("<", Rule::Fixed(TokenKind::Less)),
            (">", Rule::Fixed(TokenKind::Greater)),
            (r"\+\+", Rule::Fixed(TokenKind::PlusPlus)),
            ("--", Rule::Fixed(TokenKind::MinusMinus)),
            (r"\+", Rule::Fixed(TokenKind::Plus)),
            ("-", Rule::Fixed(TokenKind::Minus)),
            (r"\*", Rule::Fixed(TokenKind::Star)),
            ("/", Rule::Fixed(TokenKind::Slash)),
            ("%", Rule::Fixed(TokenKind::Percent)),
            (r"\*\*", Rule::Fixed(TokenKind::StarStar)),
            ("//", Rule::Fixed(TokenKind::SlashSlash)),
            ("%%", Rule::Fixed(TokenKind::PercentPercent)),
            ("<<", Rule::Fixed(TokenKind::ShiftLeft)),
            (">>", Rule::Fixed(TokenKind::ShiftRight)),
            ("~", Rule::Fixed(TokenKind::Tilde)),
            ("&", Rule::Fixed(TokenKind::Ampersand)),
            (r"\|", Rule::Fixed(TokenKind::Pipe)),
            (r"\^", Rule::Fixed(TokenKind::Caret)),
            (r#"#include\s*<([^>\n]+)>"#, Rule::IncludeLib),
            (r#"#include\s*"([^"\n]+)""#, Rule::IncludeLocal),
            ("[a-zA-Z_][a-zA-Z0-9_]*", Rule::Identifier),
            (r"[0-9]+", Rule::Decimal),
            ("0[xX][0-9a-fA-F]+", Rule::Hex),
            (r#""(\\.|[^"\\\n])*""#, Rule::Str),
            (r"'(\\x[0-9a-fA-F]{2}|\\.|[^'\\\n])'", Rule::Char),
            (r"//.*(\n|$)", Rule::Skip),
            (r"/\*[\s\S]*?\*/", Rule::Skip),
            (r"(?s).", Rule::Unidentified),
        ];
        rules
            .into_iter()
            .map(|(pattern, rule)| {
                let anchored = format!(r"\A(?:{})", pattern);
                (Regex::new(&anchored).expect("tokenizer rule must compile"), rule)
            })
            .collect()
    };
}

/// Regex-rule scanner for the C-like source language
pub struct Scanner {
    /// Source text
    source: String,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Current byte position in source
    current: usize,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Scanner {
            source: source.to_string(),
            tokens: Vec::new(),
            current: 0,
            line_starts,
        }
    }

    /// Scans all tokens from source code and returns them, terminated by `Eof`
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while self.current < self.source.len() {
            self.scan_token()?;
        }

        let end = self.span_at(self.source.len());
        self.tokens
            .push(Token::new(TokenKind::Eof, String::new(), end.line, end.column));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let rest = &self.source[self.current..];

        let mut best: Option<(usize, &Rule)> = None;
        for (regex, rule) in RULES.iter() {
            if let Some(m) = regex.find(rest) {
                if m.end() > best.map_or(0, |(len, _)| len) {
                    best = Some((m.end(), rule));
                }
            }
        }

        let span = self.span_at(self.current);
        let (len, rule) = match best {
            Some(found) => found,
            None => return Err(Error::lexical(span, "Unrecognized input")),
        };
        let lexeme = &rest[..len];

        let kind = match rule {
            Rule::Skip => None,
            Rule::Fixed(kind) => Some(kind.clone()),
            Rule::Assign => Some(assign_kind(lexeme)),
            Rule::Identifier => Some(TokenKind::Identifier(lexeme.to_string())),
            Rule::Decimal => Some(TokenKind::Number(parse_number(lexeme, 10, span)?)),
            Rule::Hex => Some(TokenKind::Number(parse_number(&lexeme[2..], 16, span)?)),
            Rule::Str => {
                let text = unescape(&lexeme[1..len - 1], span)?;
                Some(TokenKind::String(text))
            }
            Rule::Char => {
                let text = unescape(&lexeme[1..len - 1], span)?;
                let code = text.chars().next().map_or(0, |c| c as u32);
                if code > 0xFF {
                    return Err(Error::lexical(
                        span,
                        format!("Character literal {} does not fit in a cell", lexeme),
                    ));
                }
                Some(TokenKind::Char(code as u8))
            }
            Rule::IncludeLib | Rule::IncludeLocal => {
                let open = lexeme
                    .find(|c| c == '<' || c == '"')
                    .map_or(lexeme.len(), |i| i + 1);
                Some(TokenKind::Include {
                    path: lexeme[open..len - 1].trim().to_string(),
                    local: matches!(rule, Rule::IncludeLocal),
                })
            }
            Rule::Unidentified => {
                let c = lexeme.chars().next().unwrap_or(' ');
                return Err(Error::lexical(
                    span,
                    format!("Unidentified character '{}'", c.escape_default()),
                ));
            }
        };

        if let Some(kind) = kind {
            self.tokens
                .push(Token::new(kind, lexeme.to_string(), span.line, span.column));
        }
        self.current += len;
        Ok(())
    }

    fn span_at(&self, offset: usize) -> Span {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_index];
        let column = self.source[line_start..offset].chars().count() + 1;
        Span::new(line_index + 1, column)
    }
}

fn assign_kind(lexeme: &str) -> TokenKind {
    let op = match &lexeme[..lexeme.len() - 1] {
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "<<" => TokenKind::ShiftLeft,
        ">>" => TokenKind::ShiftRight,
        "&" => TokenKind::Ampersand,
        "|" => TokenKind::Pipe,
        "^" => TokenKind::Caret,
        _ => return TokenKind::Assign,
    };
    TokenKind::CompoundAssign(Box::new(op))
}

fn parse_number(digits: &str, radix: u32, span: Span) -> Result<i64> {
    i64::from_str_radix(digits, radix)
        .map_err(|_| Error::lexical(span, format!("Number literal '{}' is too large", digits)))
}

/// Resolves backslash escapes inside a string or char literal body
fn unescape(body: &str, span: Span) -> Result<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let value = u8::from_str_radix(&hex, 16).map_err(|_| {
                    Error::lexical(span, format!("Invalid escape sequence '\\x{}'", hex))
                })?;
                value as char
            }
            Some(other) => {
                return Err(Error::lexical(
                    span,
                    format!("Unknown escape sequence '\\{}'", other),
                ))
            }
            None => return Err(Error::lexical(span, "Dangling backslash in literal")),
        };
        out.push(escaped);
    }
    Ok(out)
}
