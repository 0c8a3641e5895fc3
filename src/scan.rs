//! Typed output bindings for single-row queries.
//!
//! Destinations are caller-owned slots. Decoding happens on the blocking
//! driver thread into owned values, and the slots are only written once the
//! whole row decoded, so a failed scan leaves every slot untouched.

use rusqlite::Row;
use rusqlite::types::FromSql;

use crate::error::SqlHelperError;

/// An ordered list of typed slots that receive a row's columns by position.
///
/// Implemented for `&mut T` (one column) and tuples of up to eight `&mut T`.
pub trait Destinations {
    /// The owned values decoded from a row, carried back from the driver thread.
    type Values: Send + 'static;

    /// Number of columns the row must have.
    const ARITY: usize;

    /// Decode the row's columns positionally.
    ///
    /// # Errors
    ///
    /// Returns `SqlHelperError::Scan` if any column fails to convert.
    fn decode(row: &Row<'_>) -> Result<Self::Values, SqlHelperError>;

    /// Move decoded values into the slots.
    fn assign(self, values: Self::Values);
}

impl<T> Destinations for &mut T
where
    T: FromSql + Send + 'static,
{
    type Values = T;
    const ARITY: usize = 1;

    fn decode(row: &Row<'_>) -> Result<Self::Values, SqlHelperError> {
        row.get(0).map_err(SqlHelperError::Scan)
    }

    fn assign(self, values: Self::Values) {
        *self = values;
    }
}

macro_rules! impl_destinations_tuple {
    ($arity:expr; $($ty:ident => $idx:tt),+) => {
        impl<$($ty),+> Destinations for ($(&mut $ty,)+)
        where
            $($ty: FromSql + Send + 'static,)+
        {
            type Values = ($($ty,)+);
            const ARITY: usize = $arity;

            fn decode(row: &Row<'_>) -> Result<Self::Values, SqlHelperError> {
                Ok(($(row.get::<_, $ty>($idx).map_err(SqlHelperError::Scan)?,)+))
            }

            fn assign(self, values: Self::Values) {
                $(*self.$idx = values.$idx;)+
            }
        }
    };
}

impl_destinations_tuple!(1; A => 0);
impl_destinations_tuple!(2; A => 0, B => 1);
impl_destinations_tuple!(3; A => 0, B => 1, C => 2);
impl_destinations_tuple!(4; A => 0, B => 1, C => 2, D => 3);
impl_destinations_tuple!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_destinations_tuple!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_destinations_tuple!(7; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_destinations_tuple!(8; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);
