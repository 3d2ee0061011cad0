//! Shader preprocessing: element constants prepended to the GLSL template.
//!
//! Every element gets `#define <UPPER> (<ordinal>u)`, the same value as its
//! `TYPE_<UPPER>` enumerator. The empty type owns no atlas slot, so the atlas
//! slot of an element is `<UPPER> - ATLAS_SLOT_OFFSET`; templates index the
//! atlas with that, not with the raw constant.

use crate::build::manifest::{ElementManifest, EMPTY_ORDINAL};
use std::fmt::Write as _;

/// GLSL version directive emitted first.
pub const GLSL_VERSION: &str = "#version 300 es";

/// Texel rows reserved per element in the atlas height constant.
pub const ROWS_PER_ELEMENT: usize = 8;

/// Difference between an element constant and its atlas slot.
pub const ATLAS_SLOT_OFFSET: u32 = EMPTY_ORDINAL + 1;

/// Value of the shader's `ATLAS_HEIGHT` constant for `element_count` elements.
///
/// Smallest power of two that is at least `element_count * 8`. This is not
/// the atlas slot padding; see [`crate::atlas::padded_slot_count`].
pub fn atlas_height(element_count: usize) -> usize {
    (element_count * ROWS_PER_ELEMENT).next_power_of_two()
}

/// Build the final shader source.
pub fn preprocess_shader(manifest: &ElementManifest, template: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GLSL_VERSION);
    let _ = writeln!(out, "#define ATLAS_HEIGHT ({}.0)", atlas_height(manifest.len()));
    let _ = writeln!(out, "// atlas slot of an element = <ELEMENT> - ATLAS_SLOT_OFFSET");
    let _ = writeln!(out, "#define ATLAS_SLOT_OFFSET ({}u)", ATLAS_SLOT_OFFSET);
    for element in manifest {
        let _ = writeln!(out, "#define {} ({}u)", element.upper(), element.ordinal);
    }
    out.push_str(template);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_height_rounding() {
        assert_eq!(atlas_height(1), 8);
        assert_eq!(atlas_height(2), 16);
        assert_eq!(atlas_height(3), 32);
        assert_eq!(atlas_height(4), 32);
        assert_eq!(atlas_height(5), 64);
        assert_eq!(atlas_height(16), 128);
        assert_eq!(atlas_height(17), 256);
    }

    #[test]
    fn test_atlas_height_no_elements() {
        assert_eq!(atlas_height(0), 1);
    }

    #[test]
    fn test_preprocess_three_elements() {
        let manifest = ElementManifest::from_names(["sand", "water", "stone"]);
        let out = preprocess_shader(&manifest, "void main() {}\n");
        assert_eq!(
            out,
            "#version 300 es\n\
             #define ATLAS_HEIGHT (32.0)\n\
             // atlas slot of an element = <ELEMENT> - ATLAS_SLOT_OFFSET\n\
             #define ATLAS_SLOT_OFFSET (1u)\n\
             #define SAND (1u)\n\
             #define WATER (2u)\n\
             #define STONE (3u)\n\
             void main() {}\n"
        );
    }

    #[test]
    fn test_template_body_unmodified() {
        let template = "precision highp float;\n#define SAND (99u)\nuniform sampler2D atlas;";
        let manifest = ElementManifest::from_names(["sand"]);
        let out = preprocess_shader(&manifest, template);
        assert!(out.ends_with(template));
    }

    #[test]
    fn test_constants_match_manifest_ordinals() {
        let manifest = ElementManifest::from_names(["a", "b", "c", "d", "e"]);
        let out = preprocess_shader(&manifest, "");
        for element in &manifest {
            assert!(out.contains(&format!("#define {} ({}u)\n", element.upper(), element.ordinal)));
        }
    }

    #[test]
    fn test_slot_offset_maps_constants_to_atlas_slots() {
        let manifest = ElementManifest::from_names(["sand", "water", "stone"]);
        for element in &manifest {
            assert_eq!((element.ordinal - ATLAS_SLOT_OFFSET) as usize, element.index());
        }
        let out = preprocess_shader(&manifest, "");
        assert!(out.contains("#define ATLAS_SLOT_OFFSET (1u)\n"));
    }
}
