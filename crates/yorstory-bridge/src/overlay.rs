#![forbid(unsafe_code)]

//! DOM overlays the guest lays over its canvas.
//!
//! Text drawn by the browser looks better than text drawn in GL, so the guest
//! asks for absolutely positioned DOM nodes instead. Overlays carry no
//! identity: the guest clears them (typically once per frame) and issues the
//! full set again. Nothing is diffed.

/// Embed URL prefix for `addYoutubeEmbed`.
pub const YOUTUBE_EMBED_PREFIX: &str = "https://www.youtube.com/embed/";

/// Format a CSS pixel length.
#[must_use]
pub fn px(n: f64) -> String {
    format!("{n}px")
}

/// Horizontal alignment inside a text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    /// Decode the guest's integer alignment code; unknown codes align left.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Center,
            2 => Self::Right,
            3 => Self::Justify,
            _ => Self::Left,
        }
    }

    /// CSS `text-align` value.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }
}

/// Font settings shared by text lines and text boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub letter_spacing: f64,
    pub color: String,
    pub font_family: String,
}

impl TextStyle {
    /// Style used by the legacy `addText` import.
    #[must_use]
    pub fn plain(font_size: f64) -> Self {
        Self {
            font_size,
            letter_spacing: 0.0,
            color: String::new(),
            font_family: String::new(),
        }
    }
}

/// A positioned text container. `top` is the container's top edge, already
/// converted from the guest's baseline coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub style: TextStyle,
    /// Wrap width for text boxes; `None` for single lines.
    pub width: Option<f64>,
    pub line_height: Option<f64>,
    pub align: TextAlign,
}

/// A positioned iframe embed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedNode {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub src: String,
}

/// Where overlay nodes are materialised (the DOM on the web).
pub trait OverlaySurface {
    /// Remove every node tagged with `class`.
    fn remove_class(&mut self, class: &str);
    fn append_text(&mut self, class: &str, node: &TextNode);
    fn append_embed(&mut self, class: &str, node: &EmbedNode);
}

/// Guest arguments for `addTextLine`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub left: f64,
    pub baseline_y: f64,
    pub style: TextStyle,
}

/// Guest arguments for `addTextBox`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub text: String,
    pub left: f64,
    pub baseline_y: f64,
    pub width: f64,
    pub line_height: f64,
    pub style: TextStyle,
    pub align: TextAlign,
}

/// Turns guest overlay instructions into positioned nodes.
#[derive(Debug)]
pub struct OverlayRenderer<S> {
    surface: S,
    text_class: String,
    embed_class: String,
    left_gap_ratio: f64,
}

impl<S: OverlaySurface> OverlayRenderer<S> {
    pub fn new(surface: S, text_class: &str, embed_class: &str, left_gap_ratio: f64) -> Self {
        Self {
            surface,
            text_class: text_class.to_owned(),
            embed_class: embed_class.to_owned(),
            left_gap_ratio,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn clear_all_text(&mut self) {
        self.surface.remove_class(&self.text_class);
    }

    pub fn clear_all_embeds(&mut self) {
        self.surface.remove_class(&self.embed_class);
    }

    /// Native text boxes sit slightly right of where the glyphs start.
    #[must_use]
    pub fn left_gap(&self, font_size: f64) -> f64 {
        font_size * self.left_gap_ratio
    }

    pub fn add_text_line(&mut self, line: TextLine) -> TextNode {
        let node = TextNode {
            left: line.left - self.left_gap(line.style.font_size),
            top: line.baseline_y - line.style.font_size,
            text: line.text,
            style: line.style,
            width: None,
            line_height: None,
            align: TextAlign::Left,
        };
        self.surface.append_text(&self.text_class, &node);
        node
    }

    pub fn add_text_box(&mut self, text_box: TextBox) -> TextNode {
        let node = TextNode {
            left: text_box.left - self.left_gap(text_box.style.font_size),
            top: text_box.baseline_y - text_box.style.font_size,
            text: text_box.text,
            style: text_box.style,
            width: Some(text_box.width),
            line_height: Some(text_box.line_height),
            align: text_box.align,
        };
        self.surface.append_text(&self.text_class, &node);
        node
    }

    /// Legacy `addText`: baseline-to-top only, no inset correction.
    pub fn add_text(&mut self, text: String, left: f64, baseline_y: f64, font_size: f64) -> TextNode {
        let node = TextNode {
            text,
            left,
            top: baseline_y - font_size,
            style: TextStyle::plain(font_size),
            width: None,
            line_height: None,
            align: TextAlign::Left,
        };
        self.surface.append_text(&self.text_class, &node);
        node
    }

    pub fn add_youtube_embed(
        &mut self,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        video_id: &str,
    ) -> EmbedNode {
        let node = EmbedNode {
            left,
            top,
            width,
            height,
            src: format!("{YOUTUBE_EMBED_PREFIX}{video_id}"),
        };
        self.surface.append_embed(&self.embed_class, &node);
        node
    }
}
