//! Theme Probe: decide whether a storefront's published theme can host app blocks.
//!
//! The probe walks the published theme's JSON templates, follows each
//! template's main section, reads the section's `{% schema %}` block and
//! reports which block types the theme accepts.

pub mod admin;
pub mod capability;
pub mod error;
pub mod fetcher;
pub mod preview;
pub mod probe;
pub mod resolver;
pub mod schema;
pub mod source;
pub mod template;
pub mod types;

pub use admin::{AdminClient, DEFAULT_API_VERSION};
pub use capability::{assess, evaluate, Capabilities};
pub use error::{ProbeError, ProbeResult};
pub use fetcher::{AssetFetcher, FetchOutcome};
pub use preview::{editor_url, first_published};
pub use probe::{Degradation, ProbeConfig, ProbeOrchestrator, ProbeRun, ProbeStage};
pub use resolver::resolve_published;
pub use schema::extract_schema;
pub use source::StorefrontSource;
pub use template::main_section_type;
pub use types::*;
