//! 2-way SQL: SQL statements that run as-is in any SQL client, and that
//!  become parameterized statements once their directive comments are
//!  resolved against a parameter bean.
//!
//! ```text
//! select * from MEMBER
//!  /*BEGIN*/where
//!    /*IF pmb.memberId != null*/MEMBER_ID = /*pmb.memberId*/3/*END*/
//!    /*IF pmb.memberName != null*/and MEMBER_NAME like /*pmb.memberName:likePrefix*/'S%'/*END*/
//!  /*END*/
//! ```
//!
//! A statement is analyzed once into a [TwoWaySql] and can then be built any
//!  number of times, from any number of threads, against different
//!  [Arguments].

use tracing::debug;

pub mod bound;
pub mod context;
pub mod error;
pub mod evaluate;
pub mod fuzz_helper;
pub mod if_comment;
pub mod lex;
pub mod loop_info;
pub mod node;
pub mod option;
pub mod parser;
pub mod tracer;
pub mod value;

#[cfg(test)]
mod tests;

pub use context::{Arguments, BindValue, EmissionContext};
pub use error::{CommentKind, Error, Location};
pub use node::{NodeTree, TreePrinter};
pub use option::{FilteringBindOption, LikeSearchOption, StringConnector};
pub use parser::{AnalyzeError, AnalyzerConfig};
pub use value::{ParameterBean, ParameterMap, SimpleBean, Value, ValueType};

/// An analyzed statement.
#[derive(Debug, Clone)]
pub struct TwoWaySql {
    tree: NodeTree,
}

/// The output of one build: SQL with `?` placeholders and the values to bind
///  to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltSql {
    pub sql: String,
    pub binds: Vec<BindValue>,
    /// Whether any conditional part of the statement produced output.
    pub enabled: bool,
}

impl TwoWaySql {
    pub fn parse(sql: &str) -> Result<Self, AnalyzeError> {
        Self::parse_with(sql, AnalyzerConfig::default())
    }

    pub fn parse_with(sql: &str, config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        Ok(Self {
            tree: parser::analyze(sql, &config)?,
        })
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn build(&self, args: &Arguments) -> Result<BuiltSql, Error> {
        let mut ctx = EmissionContext::new(args);
        self.tree.accept(&mut ctx)?;
        let (sql, binds, enabled) = ctx.into_parts();
        debug!(binds = binds.len(), sql_len = sql.len(), enabled, "SQL built");
        Ok(BuiltSql {
            sql,
            binds,
            enabled,
        })
    }
}

impl std::fmt::Display for TwoWaySql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", TreePrinter(&self.tree))
    }
}
