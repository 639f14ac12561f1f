/// SPIR-V blob loading

use std::path::Path;

use crate::error::{Error, Result};

/// SPIR-V magic number (first word of every module)
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Read a compiled SPIR-V module from disk
///
/// # Arguments
///
/// * `path` - Path of the `.spv` file
///
/// # Returns
///
/// The module as native-endian words, or `Error::InvalidResource` when the
/// file cannot be read or is not a SPIR-V module
pub fn load_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        Error::InvalidResource(format!("Failed to read shader '{}': {}", path.display(), e))
    })?;

    parse_spirv(&bytes).map_err(|e| match e {
        Error::InvalidResource(msg) => {
            Error::InvalidResource(format!("Shader '{}': {}", path.display(), msg))
        }
        other => other,
    })
}

/// Turn a SPIR-V byte blob into words
///
/// Accepts modules of either endianness; byte-swapped modules are swapped
/// back to native order.
pub fn parse_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() {
        return Err(Error::InvalidResource("SPIR-V blob is empty".to_string()));
    }
    if bytes.len() % 4 != 0 {
        return Err(Error::InvalidResource(format!(
            "SPIR-V blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] == SPIRV_MAGIC.swap_bytes() {
        for word in &mut words {
            *word = word.swap_bytes();
        }
    }

    if words[0] != SPIRV_MAGIC {
        return Err(Error::InvalidResource(format!(
            "Bad SPIR-V magic number {:#010x}",
            words[0]
        )));
    }

    Ok(words)
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
