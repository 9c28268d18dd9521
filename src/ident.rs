//! Row identity
//!
//! Every persisted entity carries an `Option<RowId>`:
//! - `None`: transient, never written to the store
//! - `Some(id)`: refers to exactly one row
//!
//! Identity is assigned by the store on insert and never changes afterwards.

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Store-assigned primary key of a row.
///
/// `RowId(0)` is a valid id; absence is always spelled `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(i64);

impl RowId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for RowId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for RowId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(RowId)
    }
}

/// Access to an entity's optional identity.
pub trait Identity {
    /// Human-readable entity name used in error messages
    const KIND: &'static str;

    fn ident(&self) -> Option<RowId>;

    fn is_persisted(&self) -> bool {
        self.ident().is_some()
    }

    /// Identity of an entity that must already have a row.
    fn require_persisted(&self) -> Result<RowId> {
        self.ident().ok_or_else(|| {
            Error::usage(format!("{} has no identity; it was never persisted", Self::KIND))
        })
    }

    /// Fails when the entity already has a row.
    fn require_transient(&self) -> Result<()> {
        match self.ident() {
            Some(id) => Err(Error::usage(format!(
                "{} already persisted with id {}",
                Self::KIND,
                id
            ))),
            None => Ok(()),
        }
    }
}

/// Fill an empty identity slot. A slot can only be filled once.
pub(crate) fn assign(slot: &mut Option<RowId>, id: RowId, kind: &str) -> Result<()> {
    if let Some(existing) = slot {
        return Err(Error::usage(format!(
            "{} identity {} cannot be reassigned to {}",
            kind, existing, id
        )));
    }
    *slot = Some(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    struct Probe(Option<RowId>);

    impl Identity for Probe {
        const KIND: &'static str = "probe";

        fn ident(&self) -> Option<RowId> {
            self.0
        }
    }

    #[test]
    fn test_assign_once() {
        let mut slot = None;
        assign(&mut slot, RowId::new(0), "probe").unwrap();
        assert_eq!(slot, Some(RowId::new(0)));

        let err = assign(&mut slot, RowId::new(7), "probe").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(slot, Some(RowId::new(0)));
    }

    #[test]
    fn test_require_helpers() {
        let transient = Probe(None);
        assert!(transient.require_transient().is_ok());
        assert_eq!(transient.require_persisted().unwrap_err().kind(), ErrorKind::Usage);

        let persisted = Probe(Some(RowId::new(0)));
        assert!(persisted.is_persisted());
        assert_eq!(persisted.require_persisted().unwrap(), RowId::new(0));
        assert_eq!(persisted.require_transient().unwrap_err().kind(), ErrorKind::Usage);
    }
}
