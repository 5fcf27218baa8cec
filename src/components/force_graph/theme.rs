//! Visual theming for the knowledge graph.
//!
//! Colors, the label-hash palette, and the known-kind legend.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red.
	pub r: u8,
	/// Green.
	pub g: u8,
	/// Blue.
	pub b: u8,
	/// Opacity, 0.0..=1.0.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with opacity.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Builds an opaque color from hue (degrees), saturation and lightness
	/// (both 0.0..=1.0).
	pub fn hsl(h: f64, s: f64, l: f64) -> Self {
		let h = h.rem_euclid(360.0) / 60.0;
		let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
		let x = c * (1.0 - (h % 2.0 - 1.0).abs());
		let (r, g, b) = match h as u32 {
			0 => (c, x, 0.0),
			1 => (x, c, 0.0),
			2 => (0.0, c, x),
			3 => (0.0, x, c),
			4 => (x, 0.0, c),
			_ => (c, 0.0, x),
		};
		let m = l - c / 2.0;
		let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
		Self::rgb(channel(r), channel(g), channel(b))
	}

	/// Same color with opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// Perceived brightness, 0.0..=1.0.
	pub fn luminance(self) -> f64 {
		(0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
	}

	/// CSS form: `#rrggbb` when opaque, `rgba(...)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parses a CSS color string.
	/// Supports hex (`#RRGGBB`) and `rgb()`/`rgba()` functional notation;
	/// anything else becomes mid gray.
	pub fn parse(color_str: &str) -> Self {
		let color_str = color_str.trim();
		if color_str.starts_with('#') && color_str.len() == 7 {
			let channel = |range| {
				color_str
					.get(range)
					.and_then(|hex| u8::from_str_radix(hex, 16).ok())
					.unwrap_or(128)
			};
			Self::rgb(channel(1..3), channel(3..5), channel(5..7))
		} else if color_str.starts_with("rgb") {
			let nums: Vec<&str> = color_str
				.trim_start_matches("rgba(")
				.trim_start_matches("rgb(")
				.trim_end_matches(')')
				.split(',')
				.collect();
			let channel = |i: usize| {
				nums.get(i)
					.and_then(|s| s.trim().parse().ok())
					.unwrap_or(128)
			};
			let a = nums
				.get(3)
				.and_then(|s| s.trim().parse().ok())
				.unwrap_or(1.0);
			Self::rgba(channel(0), channel(1), channel(2), a)
		} else {
			Self::rgb(128, 128, 128)
		}
	}
}

/// Node kinds with a fixed color, shown in the legend.
pub const LEGEND: [(&str, Color); 3] = [
	("JavaClass", Color::rgb(0x00, 0xbf, 0xff)),
	("JavaMethod", Color::rgb(0xff, 0xa5, 0x00)),
	("JavaField", Color::rgb(0xdd, 0xa0, 0xdd)),
];

/// Stable color for a node label.
///
/// Legend kinds keep their fixed color; any other label hashes to a hue so
/// the same label always gets the same color across sessions.
pub fn name_to_color(name: &str) -> Color {
	if let Some((_, color)) = LEGEND.iter().find(|(kind, _)| *kind == name) {
		return *color;
	}
	let hash = name
		.bytes()
		.fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
	Color::hsl((hash % 360) as f64, 0.55, 0.6)
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Primary background color
	pub color: Color,
	/// Secondary color for gradients
	pub color_secondary: Color,
	/// Whether to use radial gradient
	pub use_gradient: bool,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Line color.
	pub color: Color,
	/// Relation text drawn at the edge midpoint.
	pub text_color: Color,
	/// Line width in screen pixels.
	pub line_width: f64,
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Whether nodes have inner gradients
	pub use_gradient: bool,
	/// Border width in screen pixels.
	pub border_width: f64,
	/// Border color.
	pub border_color: Color,
	/// Ring drawn around the highlighted node.
	pub highlight_color: Color,
	/// Dot drawn on pinned nodes.
	pub pin_color: Color,
	/// Label color on light fills; dark fills get white text.
	pub text_dark: Color,
	/// Label color on dark fills.
	pub text_light: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Theme name.
	pub name: &'static str,
	/// Canvas background.
	pub background: BackgroundStyle,
	/// Edge lines and text.
	pub edge: EdgeStyle,
	/// Node fill, border and markers.
	pub node: NodeStyle,
}

impl Theme {
	/// Dark background with subtle gradients (default)
	pub fn default_theme() -> Self {
		Self {
			name: "default",
			background: BackgroundStyle {
				color: Color::rgb(22, 27, 34),
				color_secondary: Color::rgb(30, 35, 42),
				use_gradient: true,
			},
			edge: EdgeStyle {
				color: Color::rgba(140, 160, 180, 0.7),
				text_color: Color::rgba(200, 210, 220, 0.9),
				line_width: 1.5,
			},
			node: NodeStyle {
				use_gradient: true,
				border_width: 1.0,
				border_color: Color::rgba(255, 255, 255, 0.35),
				highlight_color: Color::rgb(255, 215, 0),
				pin_color: Color::rgb(235, 90, 80),
				text_dark: Color::rgb(20, 24, 30),
				text_light: Color::rgb(255, 255, 255),
			},
		}
	}

	/// Text color that stays readable on `fill`.
	pub fn text_on(&self, fill: Color) -> Color {
		if fill.luminance() > 0.6 {
			self.node.text_dark
		} else {
			self.node.text_light
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::default_theme()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_css_colors() {
		assert_eq!(Color::parse("#00bfff"), Color::rgb(0, 191, 255));
		assert_eq!(Color::parse("rgb(1, 2, 3)"), Color::rgb(1, 2, 3));
		assert_eq!(Color::parse("rgba(1, 2, 3, 0.5)"), Color::rgba(1, 2, 3, 0.5));
		assert_eq!(Color::parse("tomato"), Color::rgb(128, 128, 128));
		assert_eq!(Color::parse("#zz0000"), Color::rgb(128, 0, 0));
	}

	#[test]
	fn css_output() {
		assert_eq!(Color::rgb(255, 165, 0).to_css(), "#ffa500");
		assert_eq!(Color::rgba(1, 2, 3, 0.5).to_css(), "rgba(1, 2, 3, 0.5)");
	}

	#[test]
	fn hsl_primaries() {
		assert_eq!(Color::hsl(0.0, 1.0, 0.5), Color::rgb(255, 0, 0));
		assert_eq!(Color::hsl(120.0, 1.0, 0.5), Color::rgb(0, 255, 0));
		assert_eq!(Color::hsl(240.0, 1.0, 0.5), Color::rgb(0, 0, 255));
		assert_eq!(Color::hsl(0.0, 0.0, 1.0), Color::rgb(255, 255, 255));
	}

	#[test]
	fn legend_kinds_keep_their_colors() {
		assert_eq!(name_to_color("JavaClass").to_css(), "#00bfff");
		assert_eq!(name_to_color("JavaMethod").to_css(), "#ffa500");
		assert_eq!(name_to_color("JavaField").to_css(), "#dda0dd");
	}

	#[test]
	fn label_colors_are_stable() {
		assert_eq!(name_to_color("Package"), name_to_color("Package"));
		assert_ne!(name_to_color("Package"), name_to_color("Module"));
	}

	#[test]
	fn text_contrast() {
		let theme = Theme::default();
		assert_eq!(theme.text_on(Color::rgb(250, 250, 250)), theme.node.text_dark);
		assert_eq!(theme.text_on(Color::rgb(10, 10, 10)), theme.node.text_light);
	}
}
