//! `reelgrab` - Resolve social-media page URLs to direct video URLs
//!
//! # Features
//!
//! - **Rendering**: headless Chromium (chromiumoxide) or a browserless
//!   `QuickJS` renderer, both emulating a mobile device by default
//! - **Extraction**: a fixed cascade of strategies (`<video>`, Open Graph,
//!   ld+json, client state, brute-force scan) with a full per-strategy trace
//! - **Service**: `POST /api/fetch` over axum, plus a one-shot CLI
//!
//! # Example
//!
//! ```rust
//! use reelgrab::{Pipeline, RenderedDocument};
//!
//! let doc = RenderedDocument::from_html(
//!     "https://www.instagram.com/reel/abc/",
//!     r#"<meta property="og:video" content="https://cdn.example.com/clip123.mp4">"#,
//! );
//! let extraction = Pipeline::default().run(&doc);
//! assert_eq!(extraction.filename().as_deref(), Some("clip123.mp4"));
//! ```

pub mod allowlist;
pub mod config;
pub mod device;
pub mod document;
pub mod extract;
pub mod http_client;
pub mod js_engine;
pub mod render;
pub mod server;
pub mod service;
pub mod validate;

pub use allowlist::{AllowList, HostMatch, HostRule};
pub use config::Config;
pub use device::{DeviceProfile, Viewport};
pub use document::RenderedDocument;
pub use extract::select::SelectionPolicy;
pub use extract::{Extraction, ExtractionResult, Method, MethodTrace, Pipeline};
pub use http_client::PageClient;
pub use js_engine::JsEngine;
pub use render::{
    build_renderer, ChromeRenderer, PageRenderer, RenderError, RenderOptions, RendererKind,
    ScriptRenderer,
};
pub use server::{create_router, AppState, RouterOptions};
pub use service::VideoService;
pub use validate::ValidationError;

/// Version of reelgrab
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
