//! Property paths addressing entries in an observable store.
//!
//! A [`PropertyPath`] is an ordered, non-empty sequence of non-empty string
//! segments. The human-friendly form separates segments with `.` (or `/`),
//! e.g. `session.user` or `widgets/loaded`. Parsing happens only at the API
//! edge through [`IntoPropertyPath`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlexusError, PlexusResult};

/// Separators accepted when parsing the string form of a path.
const SEPARATORS: [char; 2] = ['.', '/'];

/// An ordered sequence of property names.
///
/// Serializes as its segment array. Deserializing goes through
/// [`PropertyPath::from_segments`], so `[]` and `["a", ""]` are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    /// Parse a `.`- or `/`-delimited path.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if the input is empty or contains an
    /// empty segment (`a..b`, `.a`, `a/`).
    pub fn parse(raw: &str) -> PlexusResult<Self> {
        if raw.is_empty() {
            return Err(PlexusError::Usage("property path is empty".to_string()));
        }
        Self::from_segments(raw.split(SEPARATORS)).map_err(|_| {
            PlexusError::Usage(format!("property path '{raw}' contains an empty segment"))
        })
    }

    /// Build a path from already-split segments.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if there are no segments or any segment
    /// is empty.
    pub fn from_segments<I, S>(segments: I) -> PlexusResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PlexusError::Usage(
                "property path has no segments".to_string(),
            ));
        }
        if segments.iter().any(String::is_empty) {
            return Err(PlexusError::Usage(
                "property path contains an empty segment".to_string(),
            ));
        }
        Ok(Self(segments))
    }

    /// The path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The innermost segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl TryFrom<Vec<String>> for PropertyPath {
    type Error = PlexusError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_segments(segments)
    }
}

impl From<PropertyPath> for Vec<String> {
    fn from(path: PropertyPath) -> Self {
        path.0
    }
}

impl FromStr for PropertyPath {
    type Err = PlexusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Conversion into a [`PropertyPath`] at the API boundary.
///
/// Implemented for the string form (`&str`, `String`), for segment sequences
/// (`&[&str]`, `[&str; N]`, `Vec<String>`) and for paths themselves.
pub trait IntoPropertyPath {
    /// Convert into a validated path.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if the input does not describe a valid
    /// path.
    fn into_property_path(self) -> PlexusResult<PropertyPath>;
}

impl IntoPropertyPath for PropertyPath {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        Ok(self)
    }
}

impl IntoPropertyPath for &PropertyPath {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        Ok(self.clone())
    }
}

impl IntoPropertyPath for &str {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        PropertyPath::parse(self)
    }
}

impl IntoPropertyPath for String {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        PropertyPath::parse(&self)
    }
}

impl IntoPropertyPath for &String {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        PropertyPath::parse(self)
    }
}

impl IntoPropertyPath for &[&str] {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        PropertyPath::from_segments(self.iter().copied())
    }
}

impl<const N: usize> IntoPropertyPath for [&str; N] {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        PropertyPath::from_segments(self)
    }
}

impl IntoPropertyPath for Vec<String> {
    fn into_property_path(self) -> PlexusResult<PropertyPath> {
        PropertyPath::from_segments(self)
    }
}
