//! Pipeline stages for catalog ingestion.
//!
//! Each submodule implements exactly one step. The remote steps sit behind
//! traits so the orchestrator can be driven against fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ upload ──▶ write
//!   │                       ▲
//!   └──▶ render ────────────┘
//! (path/URL) (resize+JPEG)  (hosting)  (catalog record)
//! ```
//!
//! 1. [`input`]: read a local file or download a URL into memory
//! 2. [`normalize`]: bound an image's longest edge and re-encode as JPEG
//! 3. [`render`]: rasterise every PDF page; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 4. [`upload`]: send bytes to the hosting service, get a public URL
//! 5. [`write`]: create the product record in the document store

pub mod input;
pub mod normalize;
pub mod render;
pub mod upload;
pub mod write;
