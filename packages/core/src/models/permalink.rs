//! Permalink Value Type
//!
//! A permalink is the hierarchical, human-readable address of a node: the
//! ordered slug segments of its ancestors followed by its own slug. It is
//! stored and displayed as the segments joined by `/`.
//!
//! ```rust
//! use folio_core::models::Permalink;
//!
//! let parent: Permalink = "about/team".parse().unwrap();
//! let child = parent.child("Our Founders");
//! assert_eq!(child.to_string(), "about/team/our-founders");
//! ```

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Every run of characters that cannot appear in a slug
const NON_SLUG_PATTERN: &str = r"[^a-z0-9]+";

/// Convert free text into a URL slug.
///
/// Lower-cases the input and collapses every run of non-alphanumeric
/// characters into a single `-`, trimming dashes from both ends.
///
/// ```rust
/// use folio_core::models::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  --  "), "");
/// ```
pub fn slugify(text: &str) -> String {
    static NON_SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let non_slug = NON_SLUG_REGEX.get_or_init(|| Regex::new(NON_SLUG_PATTERN).unwrap());

    let lowered = text.to_lowercase();
    non_slug
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Ordered sequence of slug segments identifying a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permalink(Vec<String>);

impl Permalink {
    /// Build a permalink from already-slugged segments, dropping blanks
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.trim().is_empty())
                .collect(),
        )
    }

    /// Derive a child permalink: these segments plus the slug of `text`.
    ///
    /// A blank slug adds no segment.
    pub fn child(&self, text: &str) -> Self {
        let mut segments = self.0.clone();
        let slug = slugify(text);
        if !slug.is_empty() {
            segments.push(slug);
        }
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Permalink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for Permalink {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.split('/').map(str::trim)))
    }
}

impl From<&str> for Permalink {
    fn from(s: &str) -> Self {
        Self::new(s.split('/').map(str::trim))
    }
}

impl Serialize for Permalink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permalink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw.split('/').map(str::trim)))
    }
}
