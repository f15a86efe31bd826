//! Unique names for remote temp files and PowerShell variables.

use crate::error::{CopyError, CopyResult};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::{Builder, Uuid};

/// Prefix of the variable that holds a session's stream writer.
pub const STREAM_VARIABLE_PREFIX: &str = "stream_";

fn random_uuid() -> CopyResult<Uuid> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CopyError::naming(format!("Unable to generate uuid: {}", e)))?;
    Ok(Builder::from_random_bytes(bytes).into_uuid())
}

/// `winrmcp-<uuid>.tmp`
pub fn temp_file_name() -> CopyResult<String> {
    Ok(format!("winrmcp-{}.tmp", random_uuid()?))
}

/// `prefix` followed by a dash-free uuid, usable as a PowerShell variable name.
pub fn temp_variable(prefix: &str) -> CopyResult<String> {
    Ok(format!("{}{}", prefix, random_uuid()?.simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_temp_file_name_shape() {
        let name = temp_file_name().unwrap();
        assert!(name.starts_with("winrmcp-"));
        assert!(name.ends_with(".tmp"));
        // winrmcp- + 36 char hyphenated uuid + .tmp
        assert_eq!(name.len(), 8 + 36 + 4);
    }

    #[test]
    fn test_temp_variable_is_identifier() {
        let name = temp_variable(STREAM_VARIABLE_PREFIX).unwrap();
        assert!(name.starts_with("stream_"));
        assert_eq!(name.len(), 7 + 32);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<String> = (0..256).map(|_| temp_file_name().unwrap()).collect();
        assert_eq!(names.len(), 256);
    }

    #[test]
    fn test_uuid_is_v4() {
        let id = random_uuid().unwrap();
        assert_eq!(id.get_version_num(), 4);
    }
}
