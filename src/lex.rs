/// #Notes
/// The lexer only separates plain SQL from directive comments. It knows which
///  comments are directives (`/*pmb.x*/`, `/*IF ...*/`, ...) and which are
///  ordinary SQL comments that must be kept verbatim (`/* note */`, `/*+ hint */`).
///  Interpreting directive contents is the analyzer's job.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenType {
    Sql,
    Comment,
    Else, // --ELSE
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: TokenType,

    // Byte indexes into the source
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unterminated comment starting at {0}")]
    UnterminatedComment(usize),
    #[error("Test value starting at {0} is missing its closing ')'")]
    UnbalancedTestValue(usize),
}

const ELSE_COMMENT: &[u8] = b"--ELSE";

/// This type simply holds a reference to the source and an index, so it's
///  cheap to copy, making lookahead/rewind operations in the analyzer easy.
///  All token boundaries fall on ASCII bytes so slicing the source by them is
///  always valid UTF-8.
#[derive(Clone)]
pub struct Lexer<'input> {
    source: &'input str,
    current: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Self { source, current: 0 }
    }

    #[inline]
    fn bytes(&self) -> &'input [u8] {
        self.source.as_bytes()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.current).copied()
    }

    #[inline]
    pub fn peek_at(&self, at: usize) -> Option<u8> {
        self.bytes().get(self.current + at).copied()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.current
    }

    #[inline]
    fn remaining(&self) -> &'input [u8] {
        &self.bytes()[self.current..]
    }

    #[inline]
    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Consumes a single-quoted literal, `''` included. An unterminated
    ///  literal runs to the end of the input.
    fn consume_quoted(&mut self) {
        debug_assert_eq!(self.peek(), Some(b'\''));
        self.current += 1;
        loop {
            match self.peek() {
                None => return,
                Some(b'\'') if self.peek_at(1) == Some(b'\'') => self.current += 2,
                Some(b'\'') => {
                    self.current += 1;
                    return;
                }
                Some(_) => self.current += 1,
            }
        }
    }

    /// Directive comments start right after `/*` with something other than
    ///  whitespace, a hint marker, or the closing `*/`.
    fn at_directive_comment(&self) -> bool {
        self.starts_with(b"/*")
            && match self.peek_at(2) {
                None => true,
                Some(c) => !(c.is_ascii_whitespace() || c == b'+' || c == b'*'),
            }
    }

    fn at_else_comment(&self) -> bool {
        self.starts_with(ELSE_COMMENT)
            && !matches!(self.peek_at(ELSE_COMMENT.len()), Some(c) if c.is_ascii_alphanumeric() || c == b'_')
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    /// Like [source_of] but omits the comment delimiters.
    #[inline]
    pub fn contents(&self, token: &Token) -> &'input str {
        let s = self.source_of(token);
        match token.ty {
            TokenType::Comment => &s[2..s.len() - 2],
            _ => s,
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        if self.is_empty() {
            return Ok(None);
        }
        let start = self.current;

        macro_rules! tok {
            ($name:ident) => {{
                Token {
                    ty: TokenType::$name,
                    start,
                    end: self.current,
                }
            }};
        }

        if self.at_directive_comment() {
            let Some(close) = find(&self.remaining()[2..], b"*/") else {
                return Err(Error::UnterminatedComment(start));
            };
            self.current += 2 + close + 2;
            return Ok(Some(tok!(Comment)));
        }

        if self.at_else_comment() {
            self.current += ELSE_COMMENT.len();
            return Ok(Some(tok!(Else)));
        }

        // Plain SQL up to the next directive. Quoted literals and ordinary
        //  comments are skipped as a whole so their contents are never read
        //  as directives.
        while !self.is_empty() {
            if self.at_directive_comment() || self.at_else_comment() {
                break;
            }
            match self.peek() {
                Some(b'\'') => self.consume_quoted(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    match find(&self.remaining()[2..], b"*/") {
                        Some(close) => self.current += 2 + close + 2,
                        None => return Err(Error::UnterminatedComment(self.current)),
                    }
                }
                _ => self.current += 1,
            }
        }
        Ok(Some(tok!(Sql)))
    }

    /// Skips the test value that follows a bind or embedded comment and
    ///  returns it: a quoted literal, a parenthesized group, or a plain run of
    ///  characters such as `3`, `null` or `SCHEMA.TABLE`.
    pub fn skip_test_value(&mut self) -> Result<&'input str, Error> {
        let start = self.current;
        match self.peek() {
            Some(b'\'') => self.consume_quoted(),
            Some(b'(') => {
                let mut depth = 0usize;
                loop {
                    let Some(c) = self.peek() else {
                        return Err(Error::UnbalancedTestValue(start));
                    };
                    match c {
                        b'\'' => {
                            self.consume_quoted();
                            continue;
                        }
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                self.current += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    self.current += 1;
                }
            }
            _ => {
                while let Some(c) = self.peek() {
                    if c.is_ascii_whitespace()
                        || matches!(c, b',' | b'(' | b')' | b';')
                        || self.starts_with(b"/*")
                        || self.starts_with(b"--")
                    {
                        break;
                    }
                    self.current += 1;
                }
            }
        }
        Ok(&self.source[start..self.current])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
