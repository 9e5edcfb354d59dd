//! Helpers shared by the domain modules.

/// Declares a closed set of values with a fixed wire/storage spelling.
///
/// Generates serde renames (plus any input aliases), `as_str`, `Display` and a
/// `FromStr` whose error is a validation failure listing the accepted values.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $wire:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(s: &str) -> $crate::Result<Self> {
                match s {
                    $($wire $(| $alias)* => Ok($name::$variant),)+
                    other => Err($crate::Error::Validation(format!(
                        "invalid {} '{}'; expected one of: {}",
                        $label,
                        other,
                        [$($wire),+].join(", ")
                    ))),
                }
            }
        }
    };
}

/// Rejects blank required text fields, returning the trimmed value.
pub(crate) fn required_text(field: &str, value: &str) -> crate::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
