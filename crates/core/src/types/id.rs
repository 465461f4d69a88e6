//! Newtype document keys for type-safe entity references.
//!
//! Every document in the store is addressed by a string id. Use the
//! `define_key!` macro to create wrappers that prevent accidentally mixing
//! keys from different collections.

/// Macro to define a type-safe document key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>` and `From<&str>`/`From<String>` implementations
///
/// # Example
///
/// ```rust
/// # use bluefitt_core::define_key;
/// define_key!(WarehouseKey);
/// define_key!(SupplierKey);
///
/// let warehouse = WarehouseKey::new("stgo-01");
/// let supplier = SupplierKey::new("stgo-01");
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseKey = supplier;
/// assert_eq!(warehouse.as_str(), supplier.as_str());
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new key from any string-like value.
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Get the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the key and return the inner string.
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }
    };
}

// Document keys per collection
define_key!(ProductCode);
define_key!(UserUid);
define_key!(PostSlug);

impl PostSlug {
    /// Derive a URL slug from a post title.
    ///
    /// Lower-cases, folds common Spanish accents to ASCII, and collapses every
    /// run of non-alphanumeric characters into a single `-`.
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let mut slug = String::with_capacity(title.len());
        let mut pending_dash = false;

        for c in title.chars().flat_map(char::to_lowercase) {
            let c = match c {
                'á' | 'à' | 'ä' | 'â' => 'a',
                'é' | 'è' | 'ë' | 'ê' => 'e',
                'í' | 'ì' | 'ï' | 'î' => 'i',
                'ó' | 'ò' | 'ö' | 'ô' => 'o',
                'ú' | 'ù' | 'ü' | 'û' => 'u',
                'ñ' => 'n',
                other => other,
            };
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            } else {
                pending_dash = true;
            }
        }

        Self(slug)
    }

    /// Whether the slug is empty (title had no usable characters).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_display_as_inner_string() {
        let code = ProductCode::new("VAL-110");
        assert_eq!(code.to_string(), "VAL-110");
        assert_eq!(code.as_str(), "VAL-110");
    }

    #[test]
    fn test_keys_serialize_transparently() {
        let uid = UserUid::from("abc123");
        assert_eq!(serde_json::to_string(&uid).ok().as_deref(), Some("\"abc123\""));
    }

    #[test]
    fn test_slug_from_title() {
        assert_eq!(
            PostSlug::from_title("Riego por goteo: guía básica").as_str(),
            "riego-por-goteo-guia-basica"
        );
        assert_eq!(PostSlug::from_title("  Ñandú  2025!! ").as_str(), "nandu-2025");
    }

    #[test]
    fn test_slug_from_symbols_only_is_empty() {
        assert!(PostSlug::from_title("¡¿?!").is_empty());
    }
}
