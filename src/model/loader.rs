use log::info;

use super::chain::KinematicChain;
use super::description::parse_json;
use super::urdf::parse_urdf;
use crate::error::Result;
use crate::vfs::{normalize_path, VirtualFs};

/// On-disk format of a chain description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    Json,
    Urdf,
}

impl DescriptionFormat {
    /// `.urdf`/`.xml` paths and bodies opening with `<` are URDF, anything
    /// else is JSON.
    pub fn detect(path: &str, text: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".urdf") || lower.ends_with(".xml") {
            return Self::Urdf;
        }
        if text.trim_start_matches('\u{feff}').trim_start().starts_with('<') {
            Self::Urdf
        } else {
            Self::Json
        }
    }
}

/// Reads chain descriptions out of a [`VirtualFs`].
#[derive(Debug, Clone, Copy)]
pub struct ChainLoader<'a> {
    vfs: &'a VirtualFs,
}

impl<'a> ChainLoader<'a> {
    pub fn new(vfs: &'a VirtualFs) -> Self {
        Self { vfs }
    }

    pub fn load(&self, path: &str) -> Result<KinematicChain> {
        let text = self.vfs.read_to_string(path)?;
        let format = DescriptionFormat::detect(path, &text);
        let chain = match format {
            DescriptionFormat::Json => parse_json(&text)?,
            DescriptionFormat::Urdf => parse_urdf(&text)?,
        };
        info!(
            "loaded chain '{}' from {} ({:?}, {} links)",
            chain.name(),
            normalize_path(path),
            format,
            chain.link_count()
        );
        Ok(chain)
    }
}
