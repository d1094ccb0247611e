//! # Route
//!
//! An ordered, non-empty list of waypoints the vehicle patrols, and the ITN
//! route file reader that produces one.
//!
//! ITN files hold one waypoint per line, fields separated by `|`:
//!
//! ```text
//! 0845453|4902352|Point 1 |0|
//! 0848501|4900249|Point 2 |0|
//! ```
//!
//! The first field is the longitude and the second the latitude, both scaled
//! by 100 000. Any further fields (label, flag) are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::coordinate::Coordinate;
use crate::{Error, Result};

/// Fixed-point scale of ITN coordinates.
const ITN_SCALE: f64 = 100_000.0;

/// Immutable, non-empty sequence of waypoints.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    waypoints: Vec<Coordinate>,
}

impl Route {
    /// Create a route from its waypoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoute`] when `waypoints` is empty.
    pub fn new(waypoints: Vec<Coordinate>) -> Result<Self> {
        if waypoints.is_empty() {
            return Err(Error::InvalidRoute);
        }
        Ok(Self { waypoints })
    }

    /// The waypoint at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] when `index` is past the end of the
    /// route.
    pub fn at(&self, index: usize) -> Result<Coordinate> {
        self.waypoints
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange { index, len: self.waypoints.len() })
    }

    /// The waypoint following `index`, wrapping to the start of the route.
    #[must_use]
    pub fn advance(&self, index: usize) -> usize {
        advance(index, self.waypoints.len())
    }

    #[must_use]
    pub fn first(&self) -> Coordinate {
        self.waypoints[0]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the route has no waypoints.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

impl TryFrom<Vec<Coordinate>> for Route {
    type Error = Error;

    fn try_from(waypoints: Vec<Coordinate>) -> Result<Self> {
        Self::new(waypoints)
    }
}

/// Index of the waypoint after `index` on a route of `len` waypoints.
///
/// Traversal loops: the waypoint after the last one is the first. A zero
/// length yields 0.
#[must_use]
pub const fn advance(index: usize, len: usize) -> usize {
    match index.wrapping_add(1).checked_rem(len) {
        Some(next) => next,
        None => 0,
    }
}

/// Parse ITN text into coordinates. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`Error::RouteParse`] naming the offending (1-based) line when a
/// line has fewer than two fields or a coordinate is not a finite number.
pub fn parse_itn(text: &str) -> Result<Vec<Coordinate>> {
    let mut waypoints = vec![];

    for (number, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split('|').map(str::trim);
        let longitude = scaled(fields.next(), "longitude", number)?;
        let latitude = scaled(fields.next(), "latitude", number)?;
        waypoints.push(Coordinate::new(longitude, latitude));
    }

    Ok(waypoints)
}

fn scaled(field: Option<&str>, name: &str, line: usize) -> Result<f64> {
    let Some(raw) = field.filter(|f| !f.is_empty()) else {
        return Err(Error::RouteParse(format!("line {line}: missing {name}")));
    };
    let value: f64 = raw
        .parse()
        .map_err(|e| Error::RouteParse(format!("line {line}: invalid {name} {raw:?}: {e}")))?;
    if !value.is_finite() {
        return Err(Error::RouteParse(format!("line {line}: {name} {raw:?} is not finite")));
    }
    Ok(value / ITN_SCALE)
}

/// Read and parse an ITN route file.
///
/// # Errors
///
/// Returns [`Error::RouteParse`] when the file cannot be read or parsed.
pub fn load_route(path: impl AsRef<Path>) -> Result<Vec<Coordinate>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| Error::RouteParse(format!("reading {}: {e}", path.display())))?;
    let waypoints = parse_itn(&text).with_context(|| format!("parsing {}", path.display()))?;

    tracing::debug!(path = %path.display(), waypoints = waypoints.len(), "loaded route");
    Ok(waypoints)
}

/// The `.itn` files in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`Error::RouteParse`] when the directory cannot be read.
pub fn list_routes(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::RouteParse(format!("listing {}: {e}", dir.display())))?;

    let mut routes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("itn"))
        })
        .collect();
    routes.sort();

    Ok(routes)
}
