//! Configuration header generation.

use artifex_config::{ConfigHeader, DefineValue};

use crate::error::BuildError;
use crate::fs::ensure_dir;

/// Renders the header text.
pub fn render(header: &ConfigHeader) -> String {
    let mut out = String::from("/* Generated by artifex. Do not edit. */\n");
    out.push_str(&format!("#ifndef {0}\n#define {0}\n\n", header.guard));
    for (name, value) in &header.defines {
        match value {
            DefineValue::Flag(true) => out.push_str(&format!("#define {name} 1\n")),
            DefineValue::Flag(false) => out.push_str(&format!("/* #undef {name} */\n")),
            DefineValue::Integer(n) => out.push_str(&format!("#define {name} {n}\n")),
            DefineValue::Text(text) => out.push_str(&format!("#define {name} {text}\n")),
        }
    }
    out.push_str(&format!("\n#endif /* {} */\n", header.guard));
    out
}

/// Writes the header unless the file already has exactly this content.
///
/// Returns `true` if the file was written. Leaving an identical file alone
/// keeps its modification time, so sources including it stay up to date.
pub fn write_if_changed(header: &ConfigHeader) -> Result<bool, BuildError> {
    let text = render(header);
    if std::fs::read(&header.path).is_ok_and(|existing| existing == text.as_bytes()) {
        return Ok(false);
    }
    if let Some(parent) = header.path.parent() {
        ensure_dir(parent)?;
    }
    std::fs::write(&header.path, text).map_err(|e| BuildError::io(&header.path, e))?;
    tracing::debug!("wrote {}", header.path.display());
    Ok(true)
}
