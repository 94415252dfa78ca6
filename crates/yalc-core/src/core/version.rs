use crate::core::error::{YalcError, YalcResult};
use std::cmp::Ordering;
use std::fmt;

/// A package argument as typed on the command line: `name` or `name@version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: Option<String>,
}

impl PackageRef {
    /// Parse `name`, `name@1.0.0`, `@scope/name` or `@scope/name@1.0.0`.
    pub fn parse(input: &str) -> YalcResult<Self> {
        let input = input.trim();
        let (scope, rest) = match input.strip_prefix('@').and_then(|s| s.find('/')) {
            Some(slash) => input.split_at(slash + 2),
            None => ("", input),
        };

        let package = match rest.split_once('@') {
            Some((name, version)) => Self {
                name: format!("{}{}", scope, name),
                version: (!version.is_empty()).then(|| version.to_string()),
            },
            None => Self {
                name: format!("{}{}", scope, rest),
                version: None,
            },
        };
        validate_package_name(&package.name)?;
        Ok(package)
    }
}

/// Reject names that cannot be used as a single directory under `.yalc`
/// or `node_modules`: empty, `.`/`..`, backslashes, or anything other than
/// `name` and `@scope/name`.
pub fn validate_package_name(name: &str) -> YalcResult<()> {
    let invalid = |reason: &str| -> YalcResult<()> {
        Err(YalcError::Package(format!(
            "Invalid package name '{}': {}",
            name, reason
        )))
    };

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.contains('\\') {
        return invalid("backslashes are not allowed");
    }

    let segments: Vec<&str> = name.split('/').collect();
    match segments.as_slice() {
        [single] if single.starts_with('@') => invalid("scope without a package name"),
        [_] => Ok(()),
        [scope, _] if scope.len() > 1 && scope.starts_with('@') => Ok(()),
        [_, _] => invalid("only `@scope/name` may contain a slash"),
        _ => invalid("too many path segments"),
    }?;

    for segment in segments {
        let bare = segment.strip_prefix('@').unwrap_or(segment);
        if bare.is_empty() || bare == "." || bare == ".." {
            return invalid("path segments must be real names");
        }
    }
    Ok(())
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Order two store version directory names.
///
/// Dot-separated components compare numerically when both parse as integers
/// and lexicographically otherwise; with equal prefixes the longer one wins.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Pick the highest version by [`compare_versions`].
pub fn highest_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}
