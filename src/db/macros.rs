//! Vendor dispatch macro.
//!
//! `DbPool` and `DbConnection` share the same three variants. When every arm
//! runs the same expression against the inner value, this macro writes the
//! match for us.

/// Run `$body` against the inner value of a per-vendor enum.
///
/// ```ignore
/// for_each_vendor!(DbPool, self, pool => pool.close().await)
/// ```
macro_rules! for_each_vendor {
    ($kind:ident, $value:expr, $inner:ident => $body:expr) => {
        match $value {
            $kind::MySql($inner) => $body,
            $kind::Postgres($inner) => $body,
            $kind::Sqlite($inner) => $body,
        }
    };
}
