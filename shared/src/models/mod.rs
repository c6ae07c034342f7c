//! Data models
//!
//! Shared between lane-server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Status columns are stored as TEXT and decoded through `TryFrom<String>`.

/// A TEXT column held a value that does not name any variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value}")]
pub struct InvalidEnumValue {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_db`, `from_db`, `Display` and `TryFrom<String>` for a
/// unit enum persisted as lowercase text.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub const fn as_db(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }

            pub fn from_db(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_db())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::models::InvalidEnumValue;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::from_db(&value).ok_or($crate::models::InvalidEnumValue {
                    kind: $kind,
                    value,
                })
            }
        }
    };
}

pub(crate) use text_enum;

pub mod closure;
pub mod delivery;
pub mod menu;
pub mod notification;
pub mod order;
pub mod profile;
pub mod settings;

// Re-exports
pub use closure::*;
pub use delivery::*;
pub use menu::*;
pub use notification::*;
pub use order::*;
pub use profile::*;
pub use settings::*;
