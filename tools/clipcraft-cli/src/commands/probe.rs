//! Print a media file's dimensions.

use std::path::PathBuf;

use clipcraft_render_engine::{FfprobeProber, MediaProbe};

pub async fn run(file: PathBuf) -> anyhow::Result<()> {
    let dims = FfprobeProber::new().probe(&file).await?;
    println!("{dims}");
    Ok(())
}
