//! Headless element model
//!
//! UI regions own their elements (`ElementHandle`); the scheduler only keeps
//! `WeakElement` back-references, so dropping a region's elements can never
//! be blocked by a registration outliving it.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::config::Orientation;

/// Document-space box of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Leading edge on the scroll axis
    pub fn start(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.y,
            Orientation::Horizontal => self.x,
        }
    }

    /// Size on the scroll axis
    pub fn size(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.height,
            Orientation::Horizontal => self.width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn extent(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.height,
            Orientation::Horizontal => self.width,
        }
    }
}

/// Animatable style properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Opacity,
    X,
    Y,
    XPercent,
    YPercent,
    Scale,
    ScaleY,
}

impl Property {
    pub const ALL: [Property; 7] = [
        Property::Opacity,
        Property::X,
        Property::Y,
        Property::XPercent,
        Property::YPercent,
        Property::Scale,
        Property::ScaleY,
    ];
}

/// Fixed-position state applied while an element is pinned
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pin {
    /// Viewport-relative offset the element is held at
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    pub translate_x: f64,
    pub translate_y: f64,
    pub x_percent: f64,
    pub y_percent: f64,
    pub scale: f64,
    pub scale_y: f64,
    pub opacity: f64,
    pub pinned: Option<Pin>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            x_percent: 0.0,
            y_percent: 0.0,
            scale: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            pinned: None,
        }
    }
}

impl Style {
    pub fn get(&self, property: Property) -> f64 {
        match property {
            Property::Opacity => self.opacity,
            Property::X => self.translate_x,
            Property::Y => self.translate_y,
            Property::XPercent => self.x_percent,
            Property::YPercent => self.y_percent,
            Property::Scale => self.scale,
            Property::ScaleY => self.scale_y,
        }
    }

    pub fn set(&mut self, property: Property, value: f64) {
        match property {
            Property::Opacity => self.opacity = value.clamp(0.0, 1.0),
            Property::X => self.translate_x = value,
            Property::Y => self.translate_y = value,
            Property::XPercent => self.x_percent = value,
            Property::YPercent => self.y_percent = value,
            Property::Scale => self.scale = value,
            Property::ScaleY => self.scale_y = value,
        }
    }

    /// CSS `transform` value for the current state
    pub fn transform_css(&self) -> String {
        let mut css = String::new();
        if self.x_percent != 0.0 || self.y_percent != 0.0 {
            let _ = write!(css, "translate({}%, {}%) ", self.x_percent, self.y_percent);
        }
        let _ = write!(css, "translate3d({}px, {}px, 0px)", self.translate_x, self.translate_y);
        if self.scale != 1.0 || self.scale_y != 1.0 {
            let _ = write!(css, " scale({}, {})", self.scale, self.scale * self.scale_y);
        }
        css
    }
}

/// A headless document node
#[derive(Debug, Clone)]
pub struct Element {
    /// Host-side label, used in logs and reports
    pub label: String,
    pub bounds: Bounds,
    /// Full content width, wider than `bounds.width` for horizontal tracks
    pub scroll_width: f64,
    /// Full content height
    pub scroll_height: f64,
    /// False once removed from the document
    pub connected: bool,
    pub text: String,
    pub style: Style,
}

impl Element {
    pub fn new(label: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            label: label.into(),
            bounds,
            scroll_width: bounds.width,
            scroll_height: bounds.height,
            connected: true,
            text: String::new(),
            style: Style::default(),
        }
    }

    pub fn with_scroll_extent(mut self, width: f64, height: f64) -> Self {
        self.scroll_width = width;
        self.scroll_height = height;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn scroll_extent(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Vertical => self.scroll_height,
            Orientation::Horizontal => self.scroll_width,
        }
    }

    pub fn into_handle(self) -> ElementHandle {
        Rc::new(RefCell::new(self))
    }
}

/// Owning handle held by the UI region
pub type ElementHandle = Rc<RefCell<Element>>;

/// Non-owning back-reference held by the scheduler
#[derive(Debug, Clone, Default)]
pub struct WeakElement(Weak<RefCell<Element>>);

impl WeakElement {
    pub fn new(handle: &ElementHandle) -> Self {
        Self(Rc::downgrade(handle))
    }

    /// Resolve to a live, connected element
    pub fn resolve(&self) -> Option<ElementHandle> {
        self.0.upgrade().filter(|el| el.borrow().connected)
    }

    pub fn is_live(&self) -> bool {
        self.resolve().is_some()
    }

    pub fn ptr_eq(&self, other: &WeakElement) -> bool {
        self.0.ptr_eq(&other.0)
    }

    pub fn label(&self) -> String {
        self.0
            .upgrade()
            .map(|el| el.borrow().label.clone())
            .unwrap_or_else(|| "<dropped>".to_string())
    }

    /// Run `f` against the live element's style; no-op when missing
    pub fn with_style(&self, f: impl FnOnce(&mut Style)) -> bool {
        match self.resolve() {
            Some(el) => {
                f(&mut el.borrow_mut().style);
                true
            }
            None => false,
        }
    }
}

impl From<&ElementHandle> for WeakElement {
    fn from(handle: &ElementHandle) -> Self {
        WeakElement::new(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_element_never_owns() {
        let handle = Element::new("hero", Bounds::new(0.0, 100.0, 800.0, 400.0)).into_handle();
        let weak = WeakElement::new(&handle);
        assert!(weak.is_live());
        drop(handle);
        assert!(!weak.is_live());
        assert_eq!(weak.label(), "<dropped>");
    }

    #[test]
    fn test_disconnected_element_is_missing() {
        let handle = Element::new("card", Bounds::default()).into_handle();
        let weak = WeakElement::new(&handle);
        handle.borrow_mut().connected = false;
        assert!(weak.resolve().is_none());
        assert!(!weak.with_style(|style| style.opacity = 0.0));
        assert_eq!(handle.borrow().style.opacity, 1.0);
    }

    #[test]
    fn test_style_set_clamps_opacity() {
        let mut style = Style::default();
        style.set(Property::Opacity, 1.4);
        assert_eq!(style.get(Property::Opacity), 1.0);
        style.set(Property::Y, 60.0);
        assert_eq!(style.get(Property::Y), 60.0);
    }

    #[test]
    fn test_transform_css() {
        let mut style = Style::default();
        style.translate_x = -1000.0;
        assert_eq!(style.transform_css(), "translate3d(-1000px, 0px, 0px)");
    }

    #[test]
    fn test_axis_helpers() {
        let bounds = Bounds::new(10.0, 20.0, 300.0, 400.0);
        assert_eq!(bounds.start(Orientation::Vertical), 20.0);
        assert_eq!(bounds.size(Orientation::Horizontal), 300.0);
        assert_eq!(Viewport::new(1000.0, 800.0).extent(Orientation::Horizontal), 1000.0);
    }
}
