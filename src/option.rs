use std::fmt;

/// A value transformation applied at bind/embed time, plus the SQL fragment
///  that must follow the placeholder for the transformed value to mean what
///  it should (e.g. an ESCAPE clause).
pub trait FilteringBindOption: fmt::Debug + Send + Sync {
    /// Returns the value to actually bind, or `None` to leave it untouched.
    fn generate_real_value(&self, value: &str) -> Option<String>;

    /// Appended right after the placeholder. Empty means nothing to append.
    fn rear_option(&self) -> String;

    /// Tells the option how the target dialect concatenates strings. Options
    ///  that never render SQL-side concatenation can keep the default.
    fn with_string_connector(self, _connector: StringConnector) -> Self
    where
        Self: Sized,
    {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMode {
    Prefix,
    Suffix,
    Contain,
}

/// How a dialect concatenates strings, for callers that keep the wildcard on
///  the SQL side instead of inside the bound value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StringConnector {
    /// `a || b` (standard SQL, PostgreSQL, Oracle, SQLite)
    #[default]
    Pipes,
    /// `a + b` (SQL Server)
    Plus,
    /// `concat(a, b)` (MySQL)
    ConcatFunction,
}

impl StringConnector {
    pub fn connect(&self, parts: &[&str]) -> String {
        match self {
            Self::Pipes => parts.join(" || "),
            Self::Plus => parts.join(" + "),
            Self::ConcatFunction => format!("concat({})", parts.join(", ")),
        }
    }
}

pub const DEFAULT_ESCAPE: char = '|';

/// Prefix/suffix/contain search: wildcards already in the value are escaped,
///  then the value is wrapped with `%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeSearchOption {
    mode: LikeMode,
    escape: char,
    connector: Option<StringConnector>,
}

impl LikeSearchOption {
    pub fn new(mode: LikeMode) -> Self {
        Self {
            mode,
            escape: DEFAULT_ESCAPE,
            connector: None,
        }
    }

    pub fn prefix() -> Self {
        Self::new(LikeMode::Prefix)
    }

    pub fn suffix() -> Self {
        Self::new(LikeMode::Suffix)
    }

    pub fn contain() -> Self {
        Self::new(LikeMode::Contain)
    }

    pub fn escape_by(mut self, escape: char) -> Self {
        self.escape = escape;
        self
    }

    pub fn mode(&self) -> LikeMode {
        self.mode
    }

    pub fn escape(&self) -> char {
        self.escape
    }

    pub fn string_connector(&self) -> StringConnector {
        self.connector.unwrap_or_default()
    }

    /// Escapes `%`, `_`, their full-width forms, and the escape character.
    pub fn escape_wildcards(&self, value: &str) -> String {
        let mut res = String::with_capacity(value.len() + 4);
        for c in value.chars() {
            if c == self.escape || matches!(c, '%' | '_' | '％' | '＿') {
                res.push(self.escape);
            }
            res.push(c);
        }
        res
    }

    /// Renders the SQL-side wildcard concatenation around `expr`, e.g.
    ///  `? || '%'` for a prefix search with the default connector.
    pub fn connect_wildcards(&self, expr: &str) -> String {
        let connector = self.string_connector();
        match self.mode {
            LikeMode::Prefix => connector.connect(&[expr, "'%'"]),
            LikeMode::Suffix => connector.connect(&["'%'", expr]),
            LikeMode::Contain => connector.connect(&["'%'", expr, "'%'"]),
        }
    }
}

impl FilteringBindOption for LikeSearchOption {
    fn generate_real_value(&self, value: &str) -> Option<String> {
        let escaped = self.escape_wildcards(value);
        Some(match self.mode {
            LikeMode::Prefix => format!("{escaped}%"),
            LikeMode::Suffix => format!("%{escaped}"),
            LikeMode::Contain => format!("%{escaped}%"),
        })
    }

    fn rear_option(&self) -> String {
        format!(" escape '{}'", self.escape)
    }

    fn with_string_connector(mut self, connector: StringConnector) -> Self {
        self.connector = Some(connector);
        self
    }
}

/// Option suffix of a directive inside a FOR loop: `/*#current:likePrefix*/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InLoopOption {
    LikePrefix,
    LikeSuffix,
    LikeContain,
    NotLike,
}

impl InLoopOption {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LikePrefix => "likePrefix",
            Self::LikeSuffix => "likeSuffix",
            Self::LikeContain => "likeContain",
            Self::NotLike => "notLike",
        }
    }
}

impl TryFrom<&str> for InLoopOption {
    type Error = ();
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "likePrefix" => Ok(Self::LikePrefix),
            "likeSuffix" => Ok(Self::LikeSuffix),
            "likeContain" => Ok(Self::LikeContain),
            "notLike" => Ok(Self::NotLike),
            _ => Err(()),
        }
    }
}

/// Parses a pipe-separated option list. Returns the offending piece on error.
pub fn parse_in_loop_options(def: &str) -> Result<Vec<InLoopOption>, String> {
    def.split('|')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| InLoopOption::try_from(piece).map_err(|()| piece.to_string()))
        .collect()
}

/// The LIKE mode an option list asks for. The last one wins.
pub fn like_mode_of(options: &[InLoopOption]) -> Option<LikeMode> {
    options.iter().rev().find_map(|opt| match opt {
        InLoopOption::LikePrefix => Some(LikeMode::Prefix),
        InLoopOption::LikeSuffix => Some(LikeMode::Suffix),
        InLoopOption::LikeContain => Some(LikeMode::Contain),
        InLoopOption::NotLike => None,
    })
}

pub fn is_not_like(options: &[InLoopOption]) -> bool {
    options.contains(&InLoopOption::NotLike)
}
