//! Reduction settings

use serde::{Deserialize, Serialize};

/// Importance of each attribute group in the error metric.
///
/// The defaults favour shading normals heavily over everything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeWeights {
    /// Per normal axis
    pub normal: f32,
    /// Per axis of each tangent
    pub tangent: f32,
    /// Per color channel
    pub color: f32,
    /// Per axis of each texture coordinate channel
    pub tex_coord: f32,
}

impl Default for AttributeWeights {
    fn default() -> Self {
        Self {
            normal: 16.0,
            tangent: 0.1,
            color: 0.1,
            tex_coord: 0.5,
        }
    }
}

/// Settings for a single reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionSettings {
    /// Fraction of the source triangles to keep, in (0, 1].
    pub percent_triangles: f32,
    pub attribute_weights: AttributeWeights,
    /// LOD this one is reduced from when building a chain.
    pub base_lod: usize,
    /// Rebuild overlapping corners of a reduced LOD with the point epsilon
    /// instead of exact matching.
    pub remove_degenerates: bool,
}

impl Default for ReductionSettings {
    fn default() -> Self {
        Self {
            percent_triangles: 1.0,
            attribute_weights: AttributeWeights::default(),
            base_lod: 0,
            remove_degenerates: true,
        }
    }
}

impl ReductionSettings {
    pub fn with_percent_triangles(percent_triangles: f32) -> Self {
        Self {
            percent_triangles,
            ..Default::default()
        }
    }

    /// Reduce from an earlier LOD of the chain instead of LOD 0.
    pub fn from_base_lod(mut self, base_lod: usize) -> Self {
        self.base_lod = base_lod;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ReductionSettings::default();
        assert_eq!(settings.percent_triangles, 1.0);
        assert_eq!(settings.attribute_weights.normal, 16.0);
        assert_eq!(settings.attribute_weights.tex_coord, 0.5);
        assert!(settings.remove_degenerates);
    }

    #[test]
    fn test_builders() {
        let settings = ReductionSettings::with_percent_triangles(0.25).from_base_lod(2);
        assert_eq!(settings.percent_triangles, 0.25);
        assert_eq!(settings.base_lod, 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: ReductionSettings =
            serde_json::from_str(r#"{ "percent_triangles": 0.5, "attribute_weights": { "color": 1.0 } }"#)
                .unwrap();
        assert_eq!(settings.percent_triangles, 0.5);
        assert_eq!(settings.attribute_weights.color, 1.0);
        assert_eq!(settings.attribute_weights.normal, 16.0);
        assert_eq!(settings.base_lod, 0);
    }
}
