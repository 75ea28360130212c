//! Print the filter graph for given input dimensions.

use clipcraft_model::{AppSettings, Dimensions};
use clipcraft_render_engine::build_filter_graph;

pub fn run(
    settings: &AppSettings,
    background: Dimensions,
    image: Dimensions,
    video: Option<Dimensions>,
    text: &str,
) -> anyhow::Result<()> {
    let graph = build_filter_graph(background, image, video, text, &settings.render)?;

    for stage in graph.stages() {
        tracing::debug!(
            stage = stage.name,
            inputs = ?stage.inputs(),
            output = stage.output(),
            "Filter stage"
        );
    }
    println!("{graph}");
    Ok(())
}
