//! # Expression Evaluation
//!
//! A deliberately small subset of C expressions, enough to name a zval from
//! the command line:
//!
//! ```text
//! expr    := cast expr | '*' expr | '&' symbol | primary
//! cast    := '(' type-name '*'+ ')'
//! primary := integer | symbol | '(' expr ')'
//! ```
//!
//! | expression            | value                       | declared type |
//! |-----------------------|-----------------------------|---------------|
//! | `0x7f3a10`            | the literal                 | `long`        |
//! | `&executor_globals`   | symbol address              | `void *`      |
//! | `some_global`         | word stored at the symbol   | `long`        |
//! | `(zval *)e`           | value of `e`                | `zval *`      |
//! | `*e` with `e: T **`   | pointer read at `e`         | `T *`         |
//!
//! A bare literal therefore has type `long` and is rejected by the renderer,
//! as a real debugger would reject it; write `(zval *)0x…` instead.

use crate::accessor::MemoryAccessor;
use crate::error::{InspectError, Result};
use crate::types::{Handle, TypeName};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token
{
    LParen,
    RParen,
    Star,
    Amp,
    Int(u64),
    Ident(String),
}

/// Evaluate `text` against `mem`
///
/// ## Errors
///
/// - `ExpressionSyntax`: the text doesn't parse or dereferences a non-pointer
/// - `SymbolNotFound` / `MemoryAccess`: from the underlying accessor
pub fn evaluate<M>(mem: &M, text: &str) -> Result<Handle>
where
    M: MemoryAccessor + ?Sized,
{
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0, mem };
    let handle = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(syntax(format!("unexpected {token:?} after expression")));
    }
    tracing::debug!(expression = text, value = handle.value, ty = %handle.ty, "evaluated expression");
    Ok(handle)
}

fn syntax(message: impl Into<String>) -> InspectError
{
    InspectError::ExpressionSyntax(message.into())
}

fn tokenize(text: &str) -> Result<Vec<Token>>
{
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '*' | '&' => {
                chars.next();
                tokens.push(match ch {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '*' => Token::Star,
                    _ => Token::Amp,
                });
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !(c.is_ascii_alphanumeric() || c == '_') {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let word = &text[start..end];
                if ch.is_ascii_digit() {
                    tokens.push(Token::Int(parse_integer(word)?));
                } else {
                    tokens.push(Token::Ident(word.to_string()));
                }
            }
            other => return Err(syntax(format!("unexpected character {other:?}"))),
        }
    }

    if tokens.is_empty() {
        return Err(syntax("empty expression"));
    }
    Ok(tokens)
}

fn parse_integer(word: &str) -> Result<u64>
{
    let parsed = match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => word.parse(),
    };
    parsed.map_err(|_| syntax(format!("invalid integer literal {word:?}")))
}

struct Parser<'a, M: ?Sized>
{
    tokens: Vec<Token>,
    pos: usize,
    mem: &'a M,
}

impl<M> Parser<'_, M>
where
    M: MemoryAccessor + ?Sized,
{
    fn peek(&self) -> Option<&Token>
    {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token>
    {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<()>
    {
        match self.bump() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(syntax(format!("expected {expected:?}, found {token:?}"))),
            None => Err(syntax(format!("expected {expected:?} at end of expression"))),
        }
    }

    fn expr(&mut self) -> Result<Handle>
    {
        match self.peek() {
            Some(Token::Star) => {
                self.bump();
                let inner = self.expr()?;
                self.deref(inner)
            }
            Some(Token::Amp) => {
                self.bump();
                match self.bump() {
                    Some(Token::Ident(name)) => {
                        let address = self.mem.symbol_address(&name)?;
                        Ok(Handle::new(address.value(), TypeName::void_pointer()))
                    }
                    _ => Err(syntax("'&' must be followed by a symbol name")),
                }
            }
            Some(Token::LParen) => match self.cast_type() {
                Some((ty, len)) => {
                    self.pos += len;
                    let inner = self.expr()?;
                    Ok(inner.cast(ty))
                }
                None => {
                    self.bump();
                    let inner = self.expr()?;
                    self.expect(&Token::RParen)?;
                    Ok(inner)
                }
            },
            Some(Token::Int(value)) => {
                let value = *value;
                self.bump();
                Ok(Handle::new(value, TypeName::long()))
            }
            Some(Token::Ident(name)) => {
                let address = self.mem.symbol_address(name)?;
                self.bump();
                let value = self.mem.read_u64(address)?;
                Ok(Handle::new(value, TypeName::long()))
            }
            Some(token) => Err(syntax(format!("unexpected {token:?}"))),
            None => Err(syntax("unexpected end of expression")),
        }
    }

    /// If a cast starts at the current `(`, return its type and token length
    ///
    /// A cast is `(` words `*`+ `)`; without a star it's a parenthesised symbol.
    fn cast_type(&self) -> Option<(TypeName, usize)>
    {
        let mut words = Vec::new();
        let mut stars = 0;
        let mut i = self.pos + 1;
        while let Some(Token::Ident(word)) = self.tokens.get(i) {
            words.push(word.as_str());
            i += 1;
        }
        while let Some(Token::Star) = self.tokens.get(i) {
            stars += 1;
            i += 1;
        }
        if words.is_empty() || stars == 0 || self.tokens.get(i) != Some(&Token::RParen) {
            return None;
        }

        let base = match words.join(" ").as_str() {
            "struct _zval_struct" | "_zval_struct" => "zval".to_string(),
            other => other.to_string(),
        };
        Some((TypeName::new(&base, stars), i + 1 - self.pos))
    }

    fn deref(&self, handle: Handle) -> Result<Handle>
    {
        let pointee = handle
            .ty
            .pointee()
            .filter(TypeName::is_pointer)
            .ok_or_else(|| syntax(format!("cannot dereference a value of type '{}'", handle.ty)))?;
        let value = self.mem.read_u64(handle.address())?;
        Ok(Handle::new(value, pointee))
    }
}
