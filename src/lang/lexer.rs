//! Tokenizer for candidate scoring scripts.

use super::LangError;

/// A single token with the line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Token kinds of the candidate language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Num(f64),
    Ident(String),
    // Keywords
    Fn,
    Use,
    Let,
    If,
    Else,
    While,
    Return,
    True,
    False,
    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
    Assign,
}

/// Tokenize source text. `#` starts a line comment.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LangError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment runs to end of line.
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Exponent suffix, e.g. 1e-9.
                if let Some(&e) = chars.peek() {
                    if e == 'e' || e == 'E' {
                        text.push(e);
                        chars.next();
                        if let Some(&sign) = chars.peek() {
                            if sign == '+' || sign == '-' {
                                text.push(sign);
                                chars.next();
                            }
                        }
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                text.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
                let value: f64 = text.parse().map_err(|_| LangError::Syntax {
                    line,
                    message: format!("malformed number literal '{text}'"),
                })?;
                tokens.push(Token {
                    kind: TokenKind::Num(value),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let kind = match text.as_str() {
                    "fn" => TokenKind::Fn,
                    "use" => TokenKind::Use,
                    "let" => TokenKind::Let,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    "return" => TokenKind::Return,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    _ => TokenKind::Ident(text),
                };
                tokens.push(Token { kind, line });
            }
            _ => {
                chars.next();
                let kind = match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    ',' => TokenKind::Comma,
                    ';' => TokenKind::Semi,
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '%' => TokenKind::Percent,
                    '<' => {
                        if chars.peek() == Some(&'=') {
                            chars.next();
                            TokenKind::Le
                        } else {
                            TokenKind::Lt
                        }
                    }
                    '>' => {
                        if chars.peek() == Some(&'=') {
                            chars.next();
                            TokenKind::Ge
                        } else {
                            TokenKind::Gt
                        }
                    }
                    '=' => {
                        if chars.peek() == Some(&'=') {
                            chars.next();
                            TokenKind::EqEq
                        } else {
                            TokenKind::Assign
                        }
                    }
                    '!' => {
                        if chars.peek() == Some(&'=') {
                            chars.next();
                            TokenKind::NotEq
                        } else {
                            TokenKind::Bang
                        }
                    }
                    '&' => {
                        if chars.peek() == Some(&'&') {
                            chars.next();
                            TokenKind::AndAnd
                        } else {
                            return Err(LangError::Syntax {
                                line,
                                message: "expected '&&'".into(),
                            });
                        }
                    }
                    '|' => {
                        if chars.peek() == Some(&'|') {
                            chars.next();
                            TokenKind::OrOr
                        } else {
                            return Err(LangError::Syntax {
                                line,
                                message: "expected '||'".into(),
                            });
                        }
                    }
                    other => {
                        return Err(LangError::Syntax {
                            line,
                            message: format!("unexpected character '{other}'"),
                        });
                    }
                };
                tokens.push(Token { kind, line });
            }
        }
    }

    Ok(tokens)
}
