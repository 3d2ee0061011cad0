//! Generation of the native element header.
//!
//! The header exposes two expansion tables (`FOREACH_ELEMENTTYPE` and
//! `FOREACH_ELEMENTTYPE_WITH_STRUCT_DATA`), the `ElementType` enum and one
//! `struct <name>_data` per element that declared a data layout. It is
//! always rewritten whole.

use crate::build::extract::DATA_LAYOUT_MARKER;
use crate::build::manifest::{ElementDefinition, ElementManifest, EMPTY_ORDINAL};
use std::fmt::Write as _;

/// Expansion table over every element.
pub const ALL_ELEMENTS_TABLE: &str = "FOREACH_ELEMENTTYPE";
/// Expansion table over elements with a data layout.
pub const STRUCT_ELEMENTS_TABLE: &str = "FOREACH_ELEMENTTYPE_WITH_STRUCT_DATA";

const BANNER: &str = "// DONT EDIT THIS CODE DIRECTLY!";
const GUARD: &str = "ELEMENTDATA_H";

/// Name of the element-specific data type.
pub fn data_type_name(element: &ElementDefinition) -> String {
    format!("{}_data", element.lower())
}

/// Rename the generic `struct data` of a layout to the element's own type.
pub fn rename_data_layout(layout: &str, element: &ElementDefinition) -> String {
    let renamed = format!("struct {} {{", data_type_name(element));
    layout.replacen(DATA_LAYOUT_MARKER, &renamed, 1)
}

fn include_line(include: &str) -> String {
    if include.starts_with('<') || include.starts_with('"') {
        format!("#include {}", include)
    } else {
        format!("#include \"{}\"", include)
    }
}

fn expansion_table<'a>(
    out: &mut String,
    name: &str,
    elements: impl Iterator<Item = &'a ElementDefinition>,
) {
    let rows: Vec<String> =
        elements.map(|e| format!("    M({},{})", e.upper(), e.lower())).collect();
    if rows.is_empty() {
        let _ = writeln!(out, "#define {}(M)", name);
    } else {
        let _ = writeln!(out, "#define {}(M)\\", name);
        let _ = writeln!(out, "{}", rows.join("\\\n"));
    }
}

/// Render the element header.
pub fn render_header(manifest: &ElementManifest, includes: &[String]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", BANNER);
    out.push('\n');
    let _ = writeln!(out, "#ifndef {}", GUARD);
    let _ = writeln!(out, "#define {}", GUARD);
    out.push('\n');

    if !includes.is_empty() {
        for include in includes {
            let _ = writeln!(out, "{}", include_line(include));
        }
        out.push('\n');
    }

    expansion_table(&mut out, ALL_ELEMENTS_TABLE, manifest.iter());
    out.push('\n');

    let _ = writeln!(out, "typedef enum ElementType {{");
    let _ = writeln!(out, "    TYPE_EMPTY = {},", EMPTY_ORDINAL);
    for element in manifest {
        let _ = writeln!(out, "    TYPE_{} = {},", element.upper(), element.ordinal);
    }
    let _ = writeln!(out, "    type_length = {}", manifest.type_count());
    let _ = writeln!(out, "}} __attribute__((__packed__)) ElementType;");
    out.push('\n');

    expansion_table(&mut out, STRUCT_ELEMENTS_TABLE, manifest.with_data_layout());
    out.push('\n');

    for element in manifest.with_data_layout() {
        if let Some(layout) = &element.data_layout {
            let _ = writeln!(out, "{};", rename_data_layout(layout, element));
        }
    }
    if manifest.with_data_layout().next().is_some() {
        out.push('\n');
    }

    let _ = writeln!(out, "#endif");
    out
}
