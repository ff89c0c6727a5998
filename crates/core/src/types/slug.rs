//! URL-safe post identifiers.

use core::fmt;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A URL-safe identifier derived from a post title.
///
/// Slugs contain only lowercase ASCII letters, digits and single hyphens, and
/// never start or end with a hyphen. Once assigned to a post a slug does not
/// change, even when the title is edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length in characters.
    pub const MAX_LENGTH: usize = 96;

    /// Fallback slug for titles with no usable characters.
    pub const FALLBACK: &'static str = "post";

    /// Derive a slug from a free-form title.
    ///
    /// ```
    /// use redline_core::Slug;
    ///
    /// assert_eq!(Slug::from_title("Stage 2 Tune: 420whp!").as_str(), "stage-2-tune-420whp");
    /// assert_eq!(Slug::from_title("   ").as_str(), "post");
    /// ```
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let mut slug = String::with_capacity(title.len());
        let mut pending_hyphen = false;

        for c in title.chars() {
            if !c.is_ascii_alphanumeric() {
                pending_hyphen = true;
                continue;
            }
            let hyphen = pending_hyphen && !slug.is_empty();
            if slug.len() + usize::from(hyphen) + 1 > Self::MAX_LENGTH {
                break;
            }
            if hyphen {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        }

        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            Self(Self::FALLBACK.to_owned())
        } else {
            Self(slug.to_owned())
        }
    }

    /// Wrap an existing slug string, e.g. from a request path.
    ///
    /// Returns `None` if the string is not already in slug form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s.len() <= Self::MAX_LENGTH + 8
            && !s.starts_with('-')
            && !s.ends_with('-')
            && !s.contains("--")
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        valid.then(|| Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns this slug with a numeric suffix, e.g. `my-post-2`.
    #[must_use]
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{n}", self.0))
    }
}

/// Pick the first free slug for `base` given the slugs already in use.
///
/// The bare slug is used when free; otherwise `-2`, `-3`, ... are tried in
/// order.
///
/// ```
/// use redline_core::{Slug, unique_slug};
///
/// let base = Slug::from_title("Dyno Day");
/// assert_eq!(unique_slug(&base, []).as_str(), "dyno-day");
/// assert_eq!(unique_slug(&base, ["dyno-day"]).as_str(), "dyno-day-2");
/// ```
#[must_use]
pub fn unique_slug<'a, I>(base: &Slug, taken: I) -> Slug
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = taken.into_iter().collect();
    if !taken.contains(base.as_str()) {
        return base.clone();
    }

    let mut n = 2;
    loop {
        let candidate = base.with_suffix(n);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
