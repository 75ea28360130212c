//! Composition filter graph.
//!
//! The graph shape is fixed:
//!
//! ```text
//! [0:v] ── scale, setsar ─────────────────────────────► [bg]
//! [1:v] ── scale ─► [img] ── overlay onto [bg] ───────► [lay1]
//! [2:v] ── scale ─► [vid] ── overlay onto [lay1] ─────► [lay2]   (optional)
//! [lay1|lay2] ── drawtext caption box ────────────────► [out]
//! ```
//!
//! The graph is built as a list of named stages and serialized to the
//! `-filter_complex` wire syntax: chains separated by `;`, each chain
//! prefixed with its input labels and suffixed with its output label.

use std::fmt;

use clipcraft_common::error::GeometryError;
use clipcraft_model::{Dimensions, Position, RenderSettings, TextOverlayStyle};

use crate::geometry::place_overlay;

/// Label of the graph's final output.
pub const TERMINAL_LABEL: &str = "out";

pub const STAGE_BACKGROUND: &str = "background";
pub const STAGE_IMAGE: &str = "image";
pub const STAGE_VIDEO: &str = "video";
pub const STAGE_CAPTION: &str = "caption";

/// Border drawn around caption glyphs.
const CAPTION_BORDER_WIDTH: u32 = 2;
const CAPTION_BORDER_COLOR: &str = "white@0.9";
const CAPTION_FONT_COLOR: &str = "white";
const CAPTION_BOX_COLOR: &str = "black";

/// One filter argument: positional (`1920`) or named (`x=10`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterArg {
    Positional(String),
    Named(String, String),
}

impl fmt::Display for FilterArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(value) => f.write_str(value),
            Self::Named(key, value) => write!(f, "{key}={value}"),
        }
    }
}

/// A single filter invocation such as `scale=1152:864`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    pub fn named(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args
            .push(FilterArg::Named(key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (idx, arg) in self.args.iter().enumerate() {
            f.write_str(if idx == 0 { "=" } else { ":" })?;
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

/// Filters applied in sequence from labelled inputs to one labelled output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChain {
    pub inputs: Vec<String>,
    pub filters: Vec<Filter>,
    pub output: String,
}

impl FilterChain {
    pub fn new<I, S>(inputs: I, filters: Vec<Filter>, output: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filters,
            output: output.into(),
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        for (idx, filter) in self.filters.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        write!(f, "[{}]", self.output)
    }
}

/// A named processing step: consumes one or two labels, produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: &'static str,
    pub chains: Vec<FilterChain>,
}

impl Stage {
    /// Label produced by this stage.
    pub fn output(&self) -> &str {
        self.chains
            .last()
            .map(|chain| chain.output.as_str())
            .unwrap_or_default()
    }

    /// External labels this stage consumes (labels produced inside the
    /// stage are not listed).
    pub fn inputs(&self) -> Vec<&str> {
        let internal: Vec<&str> = self.chains.iter().map(|c| c.output.as_str()).collect();
        self.chains
            .iter()
            .flat_map(|c| c.inputs.iter().map(String::as_str))
            .filter(|label| !internal.contains(label))
            .collect()
    }
}

/// Ordered stages ending in [`TERMINAL_LABEL`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterGraph {
    stages: Vec<Stage>,
}

impl FilterGraph {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    /// Label of the final stage's output.
    pub fn terminal_label(&self) -> &str {
        self.stages.last().map(Stage::output).unwrap_or_default()
    }

    /// Wire form for `-filter_complex`.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for chain in self.stages.iter().flat_map(|s| s.chains.iter()) {
            if !first {
                f.write_str(";")?;
            }
            first = false;
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

/// Build the composition graph.
///
/// `background` is the canvas. `video` is only composited when both of its
/// axes are non-zero. Fails on an empty canvas or an unimplemented anchor.
pub fn build_filter_graph(
    background: Dimensions,
    image: Dimensions,
    video: Option<Dimensions>,
    text: &str,
    settings: &RenderSettings,
) -> Result<FilterGraph, GeometryError> {
    if background.is_empty() {
        return Err(GeometryError::ZeroSizeCanvas);
    }
    let canvas = background;
    let mut graph = FilterGraph::default();

    graph.push(Stage {
        name: STAGE_BACKGROUND,
        chains: vec![FilterChain::new(
            ["0:v"],
            vec![
                Filter::new("scale").arg(canvas.width).arg(canvas.height),
                Filter::new("setsar").arg(1),
            ],
            "bg",
        )],
    });

    let image_placement = place_overlay(settings.overlay_position, canvas, image)?;
    graph.push(overlay_stage(
        STAGE_IMAGE,
        "1:v",
        "img",
        "bg",
        "lay1",
        image_placement.scaled.dimensions(),
        image_placement.position,
    ));

    let mut current = "lay1";
    if let Some(video) = video.filter(|v| !v.is_empty()) {
        let video_placement = place_overlay(settings.overlay_position, canvas, video)?;
        graph.push(overlay_stage(
            STAGE_VIDEO,
            "2:v",
            "vid",
            current,
            "lay2",
            video_placement.scaled.dimensions(),
            video_placement.position,
        ));
        current = "lay2";
    }

    graph.push(Stage {
        name: STAGE_CAPTION,
        chains: vec![FilterChain::new(
            [current],
            vec![caption_filter(text, &settings.text_overlay)],
            TERMINAL_LABEL,
        )],
    });

    Ok(graph)
}

fn overlay_stage(
    name: &'static str,
    source: &str,
    scaled_label: &str,
    base: &str,
    output: &str,
    size: Dimensions,
    at: Position,
) -> Stage {
    Stage {
        name,
        chains: vec![
            FilterChain::new(
                [source],
                vec![Filter::new("scale").arg(size.width).arg(size.height)],
                scaled_label,
            ),
            FilterChain::new(
                [base, scaled_label],
                vec![Filter::new("overlay").arg(at.x).arg(at.y)],
                output,
            ),
        ],
    }
}

/// Caption box drawn centered horizontally, 5% above the bottom edge.
///
/// The box primitive only draws rectangles, so rounded corners are not
/// rendered; the padded box approximates the intended card.
fn caption_filter(text: &str, style: &TextOverlayStyle) -> Filter {
    let mut filter = Filter::new("drawtext");
    if let Some(font) = &style.font_file {
        filter = filter.named(
            "fontfile",
            format!("'{}'", escape_caption(&font.to_string_lossy())),
        );
    }
    filter
        .named("text", format!("'{}'", escape_caption(text)))
        .named("fontcolor", CAPTION_FONT_COLOR)
        .named("fontsize", style.font_size)
        .named("box", 1)
        .named(
            "boxcolor",
            format!("{CAPTION_BOX_COLOR}@{}", style.clamped_opacity()),
        )
        .named("boxborderw", style.box_padding)
        .named("borderw", CAPTION_BORDER_WIDTH)
        .named("bordercolor", CAPTION_BORDER_COLOR)
        .named("x", "(w-text_w)/2")
        .named("y", "h-text_h-(h*0.05)")
}

/// Escape caption text for a filter argument.
///
/// Backslash is escaped first so the backslashes inserted for `:`, `'`
/// and `,` are not doubled.
pub fn escape_caption(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace(',', "\\,")
}

/// Inverse of [`escape_caption`], matching how the filter parser reads a
/// backslash-escaped argument.
pub fn unescape_caption(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcraft_model::OverlayPosition;
    use proptest::prelude::*;
    use std::path::PathBuf;

    const CANVAS: Dimensions = Dimensions::new(1920, 1080);
    const SCREENSHOT: Dimensions = Dimensions::new(800, 600);

    const CAPTION_TAIL: &str = "fontcolor=white:fontsize=48:box=1:boxcolor=black@0.8:boxborderw=20:borderw=2:bordercolor=white@0.9:x=(w-text_w)/2:y=h-text_h-(h*0.05)";

    #[test]
    fn test_graph_without_video_has_three_stages() {
        let graph =
            build_filter_graph(CANVAS, SCREENSHOT, None, "hello", &RenderSettings::default())
                .unwrap();
        assert_eq!(
            graph.stage_names(),
            vec![STAGE_BACKGROUND, STAGE_IMAGE, STAGE_CAPTION]
        );
        assert!(!graph.has_stage(STAGE_VIDEO));
        assert_eq!(graph.terminal_label(), TERMINAL_LABEL);
        assert_eq!(
            graph.serialize(),
            format!(
                "[0:v]scale=1920:1080,setsar=1[bg];\
                 [1:v]scale=1152:864[img];[bg][img]overlay=384:108[lay1];\
                 [lay1]drawtext=text='hello':{CAPTION_TAIL}[out]"
            )
        );
    }

    #[test]
    fn test_graph_with_video_adds_overlay_after_image() {
        let graph = build_filter_graph(
            CANVAS,
            SCREENSHOT,
            Some(Dimensions::new(1280, 720)),
            "hello",
            &RenderSettings::default(),
        )
        .unwrap();
        assert_eq!(
            graph.stage_names(),
            vec![STAGE_BACKGROUND, STAGE_IMAGE, STAGE_VIDEO, STAGE_CAPTION]
        );

        let wire = graph.serialize();
        assert!(wire.contains("[2:v]scale=1536:864[vid];[lay1][vid]overlay=192:108[lay2]"));
        assert!(wire.ends_with(&format!("[lay2]drawtext=text='hello':{CAPTION_TAIL}[out]")));
        let image_at = wire.find("[bg][img]overlay").unwrap();
        let video_at = wire.find("[lay1][vid]overlay").unwrap();
        assert!(image_at < video_at);
    }

    #[test]
    fn test_empty_video_dimensions_skip_overlay() {
        for video in [Some(Dimensions::ZERO), Some(Dimensions::new(640, 0)), None] {
            let graph =
                build_filter_graph(CANVAS, SCREENSHOT, video, "x", &RenderSettings::default())
                    .unwrap();
            assert_eq!(graph.stages().len(), 3);
            assert!(!graph.serialize().contains("[2:v]"));
        }
    }

    #[test]
    fn test_stage_inputs_and_outputs() {
        let graph = build_filter_graph(
            CANVAS,
            SCREENSHOT,
            Some(Dimensions::new(1280, 720)),
            "x",
            &RenderSettings::default(),
        )
        .unwrap();
        let stages = graph.stages();
        assert_eq!(stages[0].inputs(), vec!["0:v"]);
        assert_eq!(stages[0].output(), "bg");
        assert_eq!(stages[1].inputs(), vec!["1:v", "bg"]);
        assert_eq!(stages[1].output(), "lay1");
        assert_eq!(stages[2].inputs(), vec!["2:v", "lay1"]);
        assert_eq!(stages[2].output(), "lay2");
        assert_eq!(stages[3].inputs(), vec!["lay2"]);
        assert_eq!(stages[3].output(), "out");
    }

    #[test]
    fn test_overlay_position_moves_both_overlays() {
        let settings = RenderSettings {
            overlay_position: OverlayPosition::TopCenter,
            ..RenderSettings::default()
        };
        let portrait = Dimensions::new(1080, 1920);
        let graph = build_filter_graph(
            portrait,
            SCREENSHOT,
            Some(Dimensions::new(1920, 1080)),
            "x",
            &settings,
        )
        .unwrap();
        let wire = graph.serialize();
        assert!(wire.contains("[1:v]scale=864:648[img];[bg][img]overlay=108:192[lay1]"));
        assert!(wire.contains("[2:v]scale=864:486[vid];[lay1][vid]overlay=108:192[lay2]"));
        // Caption placement ignores the overlay anchor.
        assert!(wire.contains("y=h-text_h-(h*0.05)"));
    }

    #[test]
    fn test_custom_position_fails() {
        let settings = RenderSettings {
            overlay_position: OverlayPosition::Custom,
            ..RenderSettings::default()
        };
        let err = build_filter_graph(CANVAS, SCREENSHOT, None, "x", &settings).unwrap_err();
        assert!(matches!(err, GeometryError::UnsupportedAnchor { .. }));
    }

    #[test]
    fn test_zero_canvas_fails() {
        for canvas in [Dimensions::ZERO, Dimensions::new(1920, 0)] {
            let err = build_filter_graph(canvas, SCREENSHOT, None, "x", &RenderSettings::default())
                .unwrap_err();
            assert_eq!(err, GeometryError::ZeroSizeCanvas);
        }
    }

    #[test]
    fn test_caption_style_parameters() {
        let mut settings = RenderSettings::default();
        settings.text_overlay = TextOverlayStyle {
            font_size: 64,
            box_opacity: 0.5,
            box_padding: 12,
            font_file: Some(PathBuf::from("C:/Windows/Fonts/YuGothM.ttc")),
        };
        let graph = build_filter_graph(CANVAS, SCREENSHOT, None, "it's", &settings).unwrap();
        let wire = graph.serialize();
        assert!(wire.contains(
            "drawtext=fontfile='C\\:/Windows/Fonts/YuGothM.ttc':text='it\\'s':fontcolor=white:fontsize=64:box=1:boxcolor=black@0.5:boxborderw=12:"
        ));
    }

    #[test]
    fn test_escape_order() {
        assert_eq!(escape_caption(r"a\b"), r"a\\b");
        assert_eq!(escape_caption("a:b"), r"a\:b");
        assert_eq!(escape_caption("it's"), r"it\'s");
        assert_eq!(escape_caption("a,b"), r"a\,b");
        assert_eq!(escape_caption(r"\:"), r"\\\:");
        assert_eq!(escape_caption("line1\nline2"), "line1\nline2");
    }

    #[test]
    fn test_unescape_mock_caption() {
        let caption = "これはモックの投稿です.\nffmpeg のテストのために、いくつかの特殊文字: '\"\\, と改行が含まれています。";
        assert_eq!(unescape_caption(&escape_caption(caption)), caption);
    }

    proptest! {
        #[test]
        fn prop_escape_roundtrip(text in r#"[a-z\\:',\n "]{0,40}"#) {
            prop_assert_eq!(unescape_caption(&escape_caption(&text)), text);
        }

        #[test]
        fn prop_escaped_has_no_bare_separators(text in r#"[a-z\\:',]{0,40}"#) {
            let escaped = escape_caption(&text);
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    prop_assert!(chars.next().is_some());
                } else {
                    prop_assert!(c != ':' && c != ',' && c != '\'');
                }
            }
        }
    }
}
