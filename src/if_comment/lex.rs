/// Tokens of an IF-comment expression such as
///  `pmb.memberId != null && pmb.memberList.size() > 0`.
///
/// #Notes
/// Property paths are lexed as a single token, method-call and `get(N)`
///  suffixes included: `pmb.list.get(0).name` is one Path token.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenType {
    Path,
    Number,
    String, // 'single quoted'
    Date,   // date '2024-01-31'
    Null,
    True,
    False,
    Equals,    // ==
    NotEquals, // !=
    GT,        // >
    LT,        // <
    GTE,       // >=
    LTE,       // <=
    Not,       // !
    And,       // &&
    Or,        // ||
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: TokenType,

    // Byte indexes into the source
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("unterminated string literal starting at {0}")]
    UnterminatedStringLiteral(usize),
    #[error("unexpected character at {0}")]
    UnexpectedCharacter(usize),
    #[error("unbalanced parenthesis at {0}")]
    UnbalancedParenthesis(usize),
}

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

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if let Some(c) = self.peek()
            && c == prefix
        {
            self.current += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
    }

    #[inline]
    fn consume_whitespace(&mut self) {
        self.consume_while(|b| b.is_ascii_whitespace());
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    /// Like [source_of] but omits the quotes of string literals and the
    ///  `date` keyword of date literals.
    pub fn contents(&self, token: &Token) -> &'input str {
        let s = self.source_of(token);
        match token.ty {
            TokenType::String => &s[1..s.len() - 1],
            TokenType::Date => {
                let quoted = s[4..].trim_start();
                &quoted[1..quoted.len() - 1]
            }
            _ => s,
        }
    }

    fn consume_quoted(&mut self, start: usize) -> Result<(), Error> {
        self.current += 1;
        loop {
            match self.peek() {
                None => return Err(Error::UnterminatedStringLiteral(start)),
                Some(b'\'') if self.peek_at(1) == Some(b'\'') => self.current += 2,
                Some(b'\'') => {
                    self.current += 1;
                    return Ok(());
                }
                Some(_) => self.current += 1,
            }
        }
    }

    /// Consumes the rest of a property path: identifier characters, dots,
    ///  and `(...)` suffixes without nesting.
    fn consume_path(&mut self) -> Result<(), Error> {
        loop {
            self.consume_while(is_path_char);
            if self.peek() != Some(b'(') {
                return Ok(());
            }
            let open = self.current;
            self.current += 1;
            self.consume_while(|b| b != b')' && b != b'(');
            if !self.consume1(b')') {
                return Err(Error::UnbalancedParenthesis(open));
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.consume_whitespace();

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

        // Safe: not empty
        let c = self.bytes()[self.current];
        self.current += 1;
        Ok(Some(match c {
            b'=' if self.consume1(b'=') => tok!(Equals),
            b'!' if self.consume1(b'=') => tok!(NotEquals),
            b'!' => tok!(Not),
            b'>' if self.consume1(b'=') => tok!(GTE),
            b'>' => tok!(GT),
            b'<' if self.consume1(b'=') => tok!(LTE),
            b'<' => tok!(LT),
            b'&' if self.consume1(b'&') => tok!(And),
            b'|' if self.consume1(b'|') => tok!(Or),
            b'\'' => {
                self.current = start;
                self.consume_quoted(start)?;
                tok!(String)
            }
            b'0'..=b'9' => {
                self.consume_while(|b| b.is_ascii_digit() || b == b'.');
                tok!(Number)
            }
            b'-' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                self.consume_while(|b| b.is_ascii_digit() || b == b'.');
                tok!(Number)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | b'#' => {
                self.consume_path()?;
                match &self.source[start..self.current] {
                    "null" => tok!(Null),
                    "true" => tok!(True),
                    "false" => tok!(False),
                    "date" => {
                        // date '2024-01-31'
                        let keyword_end = self.current;
                        self.consume_whitespace();
                        if self.peek() == Some(b'\'') {
                            let quote = self.current;
                            self.consume_quoted(quote)?;
                            tok!(Date)
                        } else {
                            self.current = keyword_end;
                            tok!(Path)
                        }
                    }
                    _ => tok!(Path),
                }
            }
            _ => return Err(Error::UnexpectedCharacter(start)),
        }))
    }
}

fn is_path_char(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' | b'#' | b'.')
}
