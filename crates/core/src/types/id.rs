//! Newtype IDs for payment-processor object references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally passing a price ID where a product ID is expected.

/// Errors that can occur when parsing a prefixed identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier does not start with the expected prefix.
    #[error("identifier must start with `{prefix}`")]
    MissingPrefix {
        /// Required prefix.
        prefix: &'static str,
    },
    /// The identifier is longer than allowed.
    #[error("identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The identifier contains characters other than `[A-Za-z0-9_]`.
    #[error("identifier contains invalid characters")]
    InvalidCharacter,
}

/// Maximum length of a processor identifier.
pub const MAX_ID_LENGTH: usize = 255;

/// Macro to define a type-safe, prefix-checked ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`, `Deserialize` through `parse`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `parse()`, `as_str()`, `into_inner()`
/// - `Display`, `FromStr` and `AsRef<str>`
///
/// # Example
///
/// ```rust
/// # use sunville_core::define_id;
/// define_id!(CouponId, "coupon_");
///
/// assert!(CouponId::parse("coupon_123").is_ok());
/// assert!(CouponId::parse("123").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Required prefix for this identifier.
            pub const PREFIX: &'static str = $prefix;

            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the prefix is missing, the value is too
            /// long, or it contains characters outside `[A-Za-z0-9_]`.
            pub fn parse(s: &str) -> Result<Self, $crate::types::IdError> {
                if !s.starts_with(Self::PREFIX) {
                    return Err($crate::types::IdError::MissingPrefix {
                        prefix: Self::PREFIX,
                    });
                }
                if s.len() > $crate::types::id::MAX_ID_LENGTH {
                    return Err($crate::types::IdError::TooLong {
                        max: $crate::types::id::MAX_ID_LENGTH,
                    });
                }
                if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err($crate::types::IdError::InvalidCharacter);
                }
                Ok(Self(s.to_owned()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the ID and returns its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&s).map_err(::serde::de::Error::custom)
            }
        }
    };
}

define_id!(ProductId, "prod_");
define_id!(PriceId, "price_");
