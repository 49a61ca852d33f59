//! Viewport-relative trigger positions
//!
//! `"<element-edge> <viewport-edge>"` resolves to the scroll position at
//! which the given point of the element meets the given line of the
//! viewport, e.g. `"top 85%"`: the element's top reaches 85% down the
//! viewport. An end position may instead be `"+=<px>"`, measured from the
//! resolved start.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Orientation;
use crate::dom::Bounds;
use crate::error::Error;

/// A point along one axis of a box
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    /// `top` / `left`
    Start,
    Center,
    /// `bottom` / `right`
    End,
    Percent(f64),
    Pixels(f64),
}

impl Edge {
    /// Offset of this point from the box start, for a box of `size`
    pub fn resolve(&self, size: f64) -> f64 {
        match *self {
            Edge::Start => 0.0,
            Edge::Center => size / 2.0,
            Edge::End => size,
            Edge::Percent(p) => size * p / 100.0,
            Edge::Pixels(px) => px,
        }
    }
}

impl FromStr for Edge {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "top" | "left" => return Ok(Edge::Start),
            "center" => return Ok(Edge::Center),
            "bottom" | "right" => return Ok(Edge::End),
            _ => {}
        }
        let invalid = || Error::InvalidPosition(s.to_string());
        if let Some(number) = s.strip_suffix('%') {
            return finite(number).map(Edge::Percent).ok_or_else(invalid);
        }
        let number = s.strip_suffix("px").unwrap_or(s);
        finite(number).map(Edge::Pixels).ok_or_else(invalid)
    }
}

/// Parse a number, refusing `nan` and the infinities
fn finite(number: &str) -> Option<f64> {
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Start => f.write_str("top"),
            Edge::Center => f.write_str("center"),
            Edge::End => f.write_str("bottom"),
            Edge::Percent(p) => write!(f, "{}%", p),
            Edge::Pixels(px) => write!(f, "{}px", px),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerPosition {
    Edges { element: Edge, viewport: Edge },
    /// Distance past the resolved start; only meaningful as an end
    Relative(f64),
}

impl TriggerPosition {
    pub const fn edges(element: Edge, viewport: Edge) -> Self {
        TriggerPosition::Edges { element, viewport }
    }

    /// `"top bottom"`: the element's top enters at the bottom of the viewport
    pub const DEFAULT_START: TriggerPosition = TriggerPosition::edges(Edge::Start, Edge::End);

    /// `"bottom top"`: the element's bottom leaves at the top of the viewport
    pub const DEFAULT_END: TriggerPosition = TriggerPosition::edges(Edge::End, Edge::Start);

    /// Resolve to an absolute scroll position
    ///
    /// `anchor` is the already-resolved start, used by relative positions; a
    /// relative start resolves against the element's own leading edge.
    pub fn resolve(
        &self,
        bounds: &Bounds,
        viewport_extent: f64,
        orientation: Orientation,
        anchor: Option<f64>,
    ) -> f64 {
        match *self {
            TriggerPosition::Edges { element, viewport } => {
                bounds.start(orientation) + element.resolve(bounds.size(orientation))
                    - viewport.resolve(viewport_extent)
            }
            TriggerPosition::Relative(distance) => {
                anchor.unwrap_or_else(|| bounds.start(orientation)) + distance
            }
        }
    }
}

impl FromStr for TriggerPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("+=") {
            let rest = rest.trim();
            let number = rest.strip_suffix("px").unwrap_or(rest);
            return finite(number)
                .map(TriggerPosition::Relative)
                .ok_or_else(|| Error::InvalidPosition(s.to_string()));
        }

        let mut parts = s.split_whitespace();
        let element = parts
            .next()
            .ok_or_else(|| Error::InvalidPosition(s.to_string()))?
            .parse()?;
        let viewport = match parts.next() {
            Some(part) => part.parse()?,
            None => Edge::Start,
        };
        if parts.next().is_some() {
            return Err(Error::InvalidPosition(s.to_string()));
        }
        Ok(TriggerPosition::Edges { element, viewport })
    }
}

impl fmt::Display for TriggerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerPosition::Edges { element, viewport } => write!(f, "{} {}", element, viewport),
            TriggerPosition::Relative(distance) => write!(f, "+={}", distance),
        }
    }
}

impl TryFrom<String> for TriggerPosition {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerPosition> for String {
    fn from(position: TriggerPosition) -> Self {
        position.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(0.0, 2000.0, 1200.0, 500.0)
    }

    #[test]
    fn test_parse_keywords_and_percent() {
        let position: TriggerPosition = "top 85%".parse().unwrap();
        assert_eq!(
            position,
            TriggerPosition::edges(Edge::Start, Edge::Percent(85.0))
        );
        let position: TriggerPosition = "bottom top".parse().unwrap();
        assert_eq!(position, TriggerPosition::DEFAULT_END);
        let position: TriggerPosition = "center 100px".parse().unwrap();
        assert_eq!(position, TriggerPosition::edges(Edge::Center, Edge::Pixels(100.0)));
    }

    #[test]
    fn test_parse_relative_and_single_token() {
        assert_eq!(
            "+=2000".parse::<TriggerPosition>().unwrap(),
            TriggerPosition::Relative(2000.0)
        );
        assert_eq!(
            "top".parse::<TriggerPosition>().unwrap(),
            TriggerPosition::edges(Edge::Start, Edge::Start)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("sideways 10%".parse::<TriggerPosition>().is_err());
        assert!("top bottom extra".parse::<TriggerPosition>().is_err());
        assert!("".parse::<TriggerPosition>().is_err());
        assert!("+=far".parse::<TriggerPosition>().is_err());
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert!(matches!(
            "top nan".parse::<TriggerPosition>(),
            Err(Error::InvalidPosition(_))
        ));
        assert!(matches!(
            "+=inf".parse::<TriggerPosition>(),
            Err(Error::InvalidPosition(_))
        ));
        assert!("-infinity% top".parse::<TriggerPosition>().is_err());
        assert!("NaNpx".parse::<Edge>().is_err());
    }

    #[test]
    fn test_resolve_against_viewport() {
        // top of element (2000) meets 85% of an 800px viewport (680)
        let start: TriggerPosition = "top 85%".parse().unwrap();
        assert_eq!(start.resolve(&bounds(), 800.0, Orientation::Vertical, None), 1320.0);

        let end = TriggerPosition::DEFAULT_END;
        assert_eq!(end.resolve(&bounds(), 800.0, Orientation::Vertical, None), 2500.0);

        let start = TriggerPosition::DEFAULT_START;
        assert_eq!(start.resolve(&bounds(), 800.0, Orientation::Vertical, None), 1200.0);
    }

    #[test]
    fn test_relative_end_uses_anchor() {
        let end = TriggerPosition::Relative(2000.0);
        assert_eq!(
            end.resolve(&bounds(), 800.0, Orientation::Vertical, Some(2000.0)),
            4000.0
        );
    }

    #[test]
    fn test_serde_string_form() {
        #[derive(Deserialize, Serialize)]
        struct Wrapper {
            start: TriggerPosition,
        }
        let w: Wrapper = toml::from_str(r#"start = "top 80%""#).unwrap();
        assert_eq!(w.start, TriggerPosition::edges(Edge::Start, Edge::Percent(80.0)));
        assert_eq!(toml::to_string(&w).unwrap().trim(), r#"start = "top 80%""#);
    }
}
