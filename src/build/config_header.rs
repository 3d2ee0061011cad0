//! Generation of the native configuration header.

use crate::config::BuildConfig;

/// Render `config.h`: one `0`/`1` preprocessor constant per build flag.
pub fn render_config_header(config: &BuildConfig) -> String {
    format!(
        "#define DEBUG {}\n#define USE_GPU {}\n\n",
        u8::from(config.debug),
        u8::from(config.gpu)
    )
}
