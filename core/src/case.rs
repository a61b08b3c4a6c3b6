//! Name casing for generated flags, environment variables and commands.

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use serde::{Deserialize, Serialize};

/// Case conversion applied to a field name.
///
/// # Examples
///
/// ```
/// use cmdbind_core::Case;
///
/// assert_eq!(Case::Kebab.apply("dryRun"), "dry-run");
/// assert_eq!(Case::SnakeUpper.apply("dryRun"), "DRY_RUN");
/// assert_eq!(Case::CamelLower.apply("URL"), "url");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Case {
    /// Unchanged.
    #[default]
    None,
    Lower,
    Upper,
    Camel,
    CamelLower,
    Snake,
    SnakeUpper,
    Kebab,
    KebabUpper,
}

impl Case {
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::None => name.to_string(),
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
            Self::Camel => name.to_upper_camel_case(),
            Self::CamelLower if is_upper(name) => name.to_lowercase(),
            Self::CamelLower => name.to_lower_camel_case(),
            Self::Snake => name.to_snake_case(),
            Self::SnakeUpper => name.to_shouty_snake_case(),
            Self::Kebab => name.to_kebab_case(),
            Self::KebabUpper => name.to_shouty_kebab_case(),
        }
    }
}

/// Separator joining an argument-group prefix and a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Splicer {
    #[default]
    None,
    Dot,
    Dash,
    Underscore,
}

impl Splicer {
    /// Joins `prefix` and `name`; an empty prefix yields `name` alone.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdbind_core::Splicer;
    ///
    /// assert_eq!(Splicer::Dot.splice("db", "host"), "db.host");
    /// assert_eq!(Splicer::Underscore.splice("", "HOST"), "HOST");
    /// ```
    pub fn splice(self, prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            return name.to_string();
        }
        let sep = match self {
            Self::None => "",
            Self::Dot => ".",
            Self::Dash => "-",
            Self::Underscore => "_",
        };
        format!("{prefix}{sep}{name}")
    }
}

fn is_upper(s: &str) -> bool {
    s.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
}
