pub mod extract;
pub mod serve;

use anyhow::Result;

use reelgrab::{build_renderer, Config, VideoService};

/// Build the service described by `config`. The renderer starts lazily.
pub fn build_service(config: &Config) -> Result<VideoService> {
    config.validate()?;

    let renderer = build_renderer(
        config.renderer,
        config.render_options(),
        config.chrome_path.clone(),
    );

    Ok(VideoService::new(
        renderer,
        config.pipeline(),
        config.device_profile()?,
        config.allow.clone(),
    ))
}
