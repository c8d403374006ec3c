//! Color handling for Cartograph diagrams
//!
//! This module provides the [`Color`] type which wraps the `DynamicColor` type
//! from the color crate. Colors are accepted in any CSS notation and always
//! written to D2 as `#rrggbb` hex strings so the generated text stays stable.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use color::{DynamicColor, Srgb};

/// Wrapper around the `DynamicColor` type from the color crate.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_hex().hash(state);
    }
}

impl Color {
    /// Create a new `Color` from a CSS color string such as "#ff0000",
    /// "rgb(255, 0, 0)" or "red".
    ///
    /// # Examples
    ///
    /// ```
    /// use cartograph_core::color::Color;
    ///
    /// let red = Color::new("#ff0000").unwrap();
    /// let blue = Color::new("blue").unwrap();
    /// assert_eq!(blue.to_hex(), "#0000ff");
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Self { color }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// Returns the color as a lowercase `#rrggbb` string, dropping alpha.
    ///
    /// ```
    /// use cartograph_core::color::Color;
    ///
    /// let color = Color::new("rgb(255, 128, 0)").unwrap();
    /// assert_eq!(color.to_hex(), "#ff8000");
    /// ```
    pub fn to_hex(self) -> String {
        let rgba = self.color.to_alpha_color::<Srgb>().to_rgba8();
        format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("'black' is a valid CSS color")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
