//! Version gating rule
//!
//! A dependency violates the gate when it is the configured target package and
//! its resolved version is strictly greater than the allowed maximum. Scanners
//! report versions from many ecosystems, so parsing is lenient: any number of
//! numeric release components (`2.13.4.2`), a `v` prefix, semver pre-release
//! and build suffixes, and the PEP 440 tags (`1.0rc1`, `2.0.dev3`, `1.0.post1`).

use crate::error::{GateError, Result};
use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;

/// A parsed package version.
///
/// Release components compare numerically, with missing trailing components
/// treated as zero, so `1.2` equals `1.2.0` and `2.13.4.2` is above `2.13.4`.
/// A pre-release sorts below its release and a post-release above it. Build
/// metadata never affects ordering.
#[derive(Debug, Clone)]
pub struct Version {
    release: Vec<u64>,
    pre: Option<PreRelease>,
    post: Option<u64>,
    build: BuildMetadata,
}

/// Development snapshots sort below every tagged pre-release
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PreRelease {
    Dev(u64),
    Tagged(Prerelease),
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());

        (0..len)
            .map(|i| {
                release_component(&self.release, i).cmp(&release_component(&other.release, i))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
            .then_with(|| self.post.cmp(&other.post))
    }
}

fn release_component(release: &[u64], index: usize) -> u64 {
    release.get(index).copied().unwrap_or(0)
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}", release.join("."))?;
        match &self.pre {
            Some(PreRelease::Tagged(pre)) => write!(f, "-{}", pre)?,
            Some(PreRelease::Dev(n)) => write!(f, ".dev{}", n)?,
            None => {}
        }
        if let Some(post) = self.post {
            write!(f, ".post{}", post)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

/// Parse a version string leniently.
///
/// The numeric core may have any number of components; fewer than three are
/// padded with zeros. The suffix is read as PEP 440 tags (`rc1`, `.post2`,
/// `-beta`) when it fits, otherwise a `-` suffix is a semver pre-release.
/// Anything else is [`GateError::InvalidVersion`].
pub fn parse_version(input: &str) -> Result<Version> {
    let invalid = || GateError::InvalidVersion(input.to_string());

    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let (rest, build) = match trimmed.split_once('+') {
        Some((rest, build)) if !build.is_empty() => {
            (rest, BuildMetadata::new(build).map_err(|_| invalid())?)
        }
        Some(_) => return Err(invalid()),
        None => (trimmed, BuildMetadata::EMPTY),
    };

    let mut core_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    // `1.0.dev1`: the dot before a tag belongs to the suffix
    if core_end < rest.len() && rest[..core_end].ends_with('.') {
        core_end -= 1;
    }
    let (core, suffix) = rest.split_at(core_end);

    let mut release = core
        .split('.')
        .map(|part| {
            if part.is_empty() {
                None
            } else {
                part.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(invalid)?;
    while release.len() < 3 {
        release.push(0);
    }

    let (pre, post) = parse_suffix(suffix).ok_or_else(invalid)?;

    Ok(Version {
        release,
        pre,
        post,
        build,
    })
}

/// Parse whatever follows the numeric core into pre- and post-release parts
fn parse_suffix(suffix: &str) -> Option<(Option<PreRelease>, Option<u64>)> {
    if suffix.is_empty() {
        return Some((None, None));
    }
    if let Some(parts) = parse_pep440_tags(suffix) {
        return Some(parts);
    }

    let pre = suffix.strip_prefix('-').filter(|pre| !pre.is_empty())?;
    let pre = Prerelease::new(pre).ok()?;
    Some((Some(PreRelease::Tagged(pre)), None))
}

/// Read a run of `<tag><number>` segments such as `rc1`, `.post2` or `-dev`
fn parse_pep440_tags(mut rest: &str) -> Option<(Option<PreRelease>, Option<u64>)> {
    const SEPARATORS: [char; 3] = ['.', '-', '_'];

    let mut pre = None;
    let mut post = None;

    while !rest.is_empty() {
        rest = rest.trim_start_matches(SEPARATORS);
        let tag_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (tag, after) = rest.split_at(tag_end);

        let after = after.trim_start_matches(SEPARATORS);
        let digits_end = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        let (digits, remaining) = after.split_at(digits_end);
        let number = if digits.is_empty() {
            0
        } else {
            digits.parse::<u64>().ok()?
        };

        let tagged = |label: &str| Prerelease::new(&format!("{}.{}", label, number)).ok();
        let segment = match tag.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Some(PreRelease::Tagged(tagged("alpha")?)),
            "b" | "beta" => Some(PreRelease::Tagged(tagged("beta")?)),
            "c" | "rc" | "pre" | "preview" => Some(PreRelease::Tagged(tagged("rc")?)),
            "dev" => Some(PreRelease::Dev(number)),
            "post" | "rev" | "r" => {
                if post.replace(number).is_some() {
                    return None;
                }
                None
            }
            _ => return None,
        };

        if let Some(segment) = segment {
            if pre.replace(segment).is_some() {
                return None;
            }
        }
        rest = remaining;
    }

    Some((pre, post))
}

/// Decide whether `candidate_name@observed` violates the gate.
///
/// Packages other than `target_name` are never violations and their versions
/// are not parsed. Fails with [`GateError::InvalidVersion`] when either version
/// cannot be parsed; callers skip the record in that case.
pub fn is_violation(
    observed: &str,
    threshold: &str,
    target_name: &str,
    candidate_name: &str,
) -> Result<bool> {
    if candidate_name != target_name {
        return Ok(false);
    }

    let observed = parse_version(observed)?;
    let threshold = parse_version(threshold)?;

    Ok(observed > threshold)
}
