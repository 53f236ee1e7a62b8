//! Hierarchical tree paths.

use std::fmt;

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A path component is not a usable tree segment.
    #[error("invalid path component '{component}' at position {position}: {message}")]
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
}

/// A path in a storage tree.
///
/// A path is an ordered sequence of non-empty segments. The empty path is the
/// root of the tree. Paths order lexically segment by segment, so all the
/// descendants of a path sort directly after it.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    components: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path {
            components: Vec::new(),
        }
    }

    /// Parse a path string, validating components.
    ///
    /// # Path Syntax
    ///
    /// - Components are separated by `/`
    /// - Empty components are ignored (normalizes `//`, leading and trailing `/`)
    /// - `.` and `..` are rejected, as is any component containing NUL
    ///
    /// # Examples
    ///
    /// ```rust
    /// use storetree_content::Path;
    ///
    /// let path = Path::parse("/jobs/123/log").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(Path::parse("jobs/123/").unwrap(), Path::parse("jobs/123").unwrap());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let components: Vec<String> = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();

        Self::try_from_components(components)
    }

    /// Try to create a path from components, validating each.
    pub fn try_from_components(components: Vec<String>) -> Result<Self, PathError> {
        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }
        Ok(Path { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        let message = if component.is_empty() {
            "empty component"
        } else if component == "." || component == ".." {
            "relative components are not allowed"
        } else if component.contains('/') {
            "component contains the path delimiter"
        } else if component.contains('\0') {
            "component contains NUL"
        } else {
            return Ok(());
        };

        Err(PathError::InvalidComponent {
            component: component.to_string(),
            position,
            message: message.to_string(),
        })
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Same as [`Path::is_root`].
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// The last component, if any.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The parent path. The root has no parent.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        Some(self.slice(0, self.len() - 1))
    }

    /// Every proper ancestor, nearest to the root first, excluding the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.len()).map(move |end| self.slice(0, end))
    }

    /// Append a single validated segment.
    pub fn child(&self, name: &str) -> Result<Path, PathError> {
        Self::validate_component(name, self.len())?;
        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Path { components })
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }

    /// Check if `other` lies strictly below this path.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        other.len() > self.len() && other.has_prefix(self)
    }

    /// Get a slice of components as a new path.
    pub fn slice(&self, start: usize, end: usize) -> Path {
        Path {
            components: self.components[start..end].to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use storetree_content::path;
///
/// let p = path!("jobs/123/log");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
