//! Newtype IDs for type-safe provider references.
//!
//! Stripe identifiers are opaque strings such as `prod_NfE4lTcDsvEtJq`,
//! `cs_test_123`, or caller-chosen product IDs like `camiseta-azul`. They end
//! up in request paths, so anything that could change the meaning of a path
//! or query is rejected on construction. Use the `define_id!` macro to create
//! wrappers that prevent accidentally passing a price ID where a product ID is
//! expected.

/// Errors that can occur when parsing a provider ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that is not printable ASCII, or one of `/?#%`.
    #[error("id contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// The input is a `.` or `..` path segment.
    #[error("id cannot be a dot segment")]
    DotSegment,
}

/// Maximum length accepted for a provider ID.
pub const MAX_ID_LENGTH: usize = 255;

/// Characters with meaning inside a URL path or query.
const URL_DELIMITERS: [char; 4] = ['/', '?', '#', '%'];

fn is_forbidden(c: char) -> bool {
    !c.is_ascii_graphic() || URL_DELIMITERS.contains(&c)
}

/// Validate a raw provider ID.
///
/// # Errors
///
/// Returns an error if the input is empty, longer than [`MAX_ID_LENGTH`],
/// a dot segment, or contains anything but printable ASCII other than `/?#%`.
pub fn validate_id(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }

    if s.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong { max: MAX_ID_LENGTH });
    }

    if let Some(c) = s.chars().find(|c| is_forbidden(*c)) {
        return Err(IdError::InvalidCharacter(c));
    }

    if s == "." || s == ".." {
        return Err(IdError::DotSegment);
    }

    Ok(())
}

/// Macro to define a type-safe provider ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`, validating `Deserialize`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `parse()`, `as_str()`, `into_inner()`
/// - `FromStr`, `Display` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use ignite_shop_core::define_id;
/// define_id!(ProductId);
/// define_id!(PriceId);
///
/// let product_id = ProductId::parse("prod_NfE4lTcDsvEtJq").unwrap();
/// let price_id = PriceId::parse("price_1").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = price_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an ID from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not a valid provider ID.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                $crate::types::id::validate_id(s)?;
                Ok(Self(s.to_owned()))
            }

            /// Returns the ID as a string slice.
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
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let raw = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&raw).map_err(::serde::de::Error::custom)
            }
        }
    };
}

// Stripe object IDs
define_id!(ProductId);
define_id!(PriceId);
define_id!(CheckoutSessionId);
