//! Row types, row-to-domain mapping and the per-table halves of [`PgTx`](crate::PgTx).
//!
//! Enum columns are stored as their wire spelling and parsed back with the
//! domain type's `FromStr`.

pub mod access;
pub mod build;
pub mod environment;
pub mod membership;
pub mod release;
pub mod system;

use std::str::FromStr;

use crate::{DbError, DbResult};

/// Parse a text column into a domain enum.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> DbResult<T>
where
    T: FromStr<Err = relman_core::Error>,
{
    value
        .parse()
        .map_err(|_| DbError::Decode(format!("{column} = '{value}'")))
}
