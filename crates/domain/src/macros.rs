//! Macro for implementing Display and FromStr for wire-level enums
//!
//! Enums such as sort directions travel to the REST API as fixed tokens. The
//! macro maps each variant to its token once and derives both directions of
//! the conversion from that table.
//!
//! # Example
//!
//! ```rust
//! use crmbatch_domain::impl_wire_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Asc,
//!     Desc,
//! }
//!
//! impl_wire_enum_conversions!(Direction {
//!     Asc => "ASC",
//!     Desc => "DESC",
//! });
//!
//! assert_eq!(Direction::Asc.to_string(), "ASC");
//! assert_eq!("desc".parse::<Direction>().unwrap(), Direction::Desc);
//! ```

/// Implements Display and FromStr traits for wire-level enums
///
/// - Display writes the token exactly as declared
/// - FromStr matches tokens case-insensitively (the API accepts `asc`,
///   `ASC` and `Asc` alike)
#[macro_export]
macro_rules! impl_wire_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
