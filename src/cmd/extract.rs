use std::process::ExitCode;

use anyhow::Result;

use reelgrab::server::{ApiError, FetchResponse};
use reelgrab::Config;

use super::build_service;

/// Exit code when the page rendered but no video URL was resolved, or rendering failed.
const EXIT_NOT_FOUND: u8 = 1;
/// Exit code for input the service would reject with 400.
const EXIT_INVALID: u8 = 2;

pub async fn cmd_extract(config: Config, url: &str, json: bool) -> Result<ExitCode> {
    let service = build_service(&config)?;

    let outcome = match service.validate(url) {
        Err(e) => Err(ApiError::from(e)),
        Ok(target) => {
            let resolved = service.resolve(&target).await;
            service.renderer().shutdown().await;
            match resolved {
                Ok(extraction) => FetchResponse::try_from(extraction),
                Err(e) => Err(ApiError::from(e)),
            }
        }
    };

    match outcome {
        Ok(response) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.video_url);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&err.body())?);
            } else {
                eprintln!("❌ {err}");
                match &err {
                    ApiError::NotFound(debug) => {
                        for (method, candidate) in debug.methods.iter() {
                            eprintln!("   {}: {candidate}", method.key());
                        }
                    }
                    ApiError::Render(e) => eprintln!("   {e}"),
                    _ => {}
                }
            }
            let code = match err {
                ApiError::Validation(_) | ApiError::PayloadTooLarge => EXIT_INVALID,
                ApiError::NotFound(_) | ApiError::Render(_) => EXIT_NOT_FOUND,
            };
            Ok(ExitCode::from(code))
        }
    }
}
