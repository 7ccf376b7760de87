use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tilesmith_chunk::{LiquidFormat, ReadOptions, WriteOptions};
use tilesmith_liquid::{LiquidBrush, LiquidKind, LiquidTypeTable};
use tilesmith_texture::Brush;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Editor settings. Every field has a default, so an empty file is valid.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct EditorConfig {
    #[serde(default)] pub alpha: AlphaConfig,
    #[serde(default)] pub brush: BrushConfig,
    #[serde(default)] pub liquid: LiquidConfig,
    #[serde(default)] pub loader: LoaderConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AlphaConfig {
    #[serde(default = "yes")] pub big_alpha: bool,
    #[serde(default = "yes")] pub compress: bool,
    #[serde(default = "yes")] pub fix_edges: bool,
}
fn yes() -> bool { true }
impl Default for AlphaConfig { fn default() -> Self { Self { big_alpha: true, compress: true, fix_edges: true } } }

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BrushConfig {
    #[serde(default = "default_radius")] pub radius: f32,
    #[serde(default = "default_hardness")] pub hardness: f32,
    #[serde(default = "default_pressure")] pub pressure: f32,
    /// Layers whose peak opacity stays at or below this are dropped by cleanup.
    #[serde(default = "default_unused_threshold")] pub unused_threshold: f32,
}
fn default_radius() -> f32 { 15.0 }
fn default_hardness() -> f32 { 0.5 }
fn default_pressure() -> f32 { 1.0 }
fn default_unused_threshold() -> f32 { 1.0 }
impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            hardness: default_hardness(),
            pressure: default_pressure(),
            unused_threshold: default_unused_threshold(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LiquidConfig {
    #[serde(default = "default_opacity_factor")] pub opacity_factor: f32,
    #[serde(default)] pub format: LiquidFormat,
    /// Entries added to (or replacing ids in) the built-in type table.
    #[serde(default)] pub types: Vec<LiquidTypeEntry>,
}
fn default_opacity_factor() -> f32 { 0.5 }
impl Default for LiquidConfig {
    fn default() -> Self {
        Self { opacity_factor: default_opacity_factor(), format: LiquidFormat::default(), types: Vec::new() }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct LiquidTypeEntry {
    pub id: u16,
    pub kind: LiquidKind,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct LoaderConfig {
    /// 0 picks the available parallelism.
    #[serde(default)] pub workers: usize,
}

impl EditorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            big_alpha: self.alpha.big_alpha,
            compress: self.alpha.compress,
            liquid_format: self.liquid.format,
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            fix_edges: self.alpha.fix_edges,
            liquid_types: self.liquid_table(),
        }
    }

    pub fn liquid_table(&self) -> LiquidTypeTable {
        let mut table = LiquidTypeTable::default();
        for entry in &self.liquid.types {
            table.insert(entry.id, entry.kind);
        }
        table
    }

    pub fn brush(&self) -> Brush {
        Brush::new(self.brush.radius, self.brush.hardness)
    }

    /// Flat, unlocked liquid brush of the configured radius.
    pub fn liquid_brush(&self, liquid_id: u16, add: bool) -> LiquidBrush {
        LiquidBrush {
            radius: self.brush.radius,
            liquid_id,
            add,
            angle: 0.0,
            orientation: 0.0,
            origin: None,
            override_height: false,
            override_liquid_id: false,
            opacity_factor: self.liquid.opacity_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = EditorConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EditorConfig::default());
        assert_eq!(cfg.write_options(), WriteOptions::default());
        assert_eq!(cfg.read_options(), ReadOptions::default());
        assert_eq!(cfg.brush.radius, 15.0);
        assert_eq!(cfg.loader.workers, 0);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = EditorConfig::from_toml_str(
            r#"
            [alpha]
            compress = false

            [brush]
            radius = 4.5

            [liquid]
            format = "legacy"
            types = [{ id = 900, kind = "magma" }, { id = 2, kind = "slime" }]

            [loader]
            workers = 3
            "#,
        )
        .unwrap();
        let w = cfg.write_options();
        assert!(w.big_alpha);
        assert!(!w.compress);
        assert_eq!(w.liquid_format, LiquidFormat::Legacy);
        assert_eq!(cfg.brush.radius, 4.5);
        assert_eq!(cfg.brush.hardness, 0.5);
        assert_eq!(cfg.loader.workers, 3);
        let table = cfg.liquid_table();
        assert_eq!(table.kind_of(900), Some(LiquidKind::Magma));
        assert_eq!(table.kind_of(2), Some(LiquidKind::Slime));
        let b = cfg.liquid_brush(900, true);
        assert_eq!(b.radius, 4.5);
        assert_eq!(b.opacity_factor, 0.5);
    }

    #[test]
    fn bad_values_are_parse_errors() {
        let err = EditorConfig::from_toml_str("[liquid]\nformat = \"wavy\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
