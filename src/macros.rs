//! Internal macros

/// Declare a fieldless enum whose variants are spelled as fixed words in
/// query text, e.g. `VIEW summary` or `PERIOD last-6-months`.
///
/// Generates `NAMES`, case-insensitive `from_name`, `as_str`, `Display`
/// and serde renames so the serialized form matches the query spelling.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every accepted spelling, in declaration order
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            /// Parse from a word, ignoring case
            pub fn from_name(name: &str) -> Option<Self> {
                match name.to_ascii_lowercase().as_str() {
                    $( $text => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
