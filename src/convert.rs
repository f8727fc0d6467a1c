use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::GnssError;
use crate::fs_util;
use crate::resolver::NameSet;
use crate::tools::Converter;

/// Turns the intermediate Hatanaka file in `dir` into the canonical RINEX
/// deliverable.
///
/// On success the intermediate is deleted. On any failure the partial
/// deliverable is removed and the intermediate is kept, so a later run can
/// retry the conversion without downloading again.
pub fn convert(
    converter: &dyn Converter,
    dir: &Utf8Path,
    names: &NameSet,
) -> Result<Utf8PathBuf, GnssError> {
    let input = dir.join(&names.intermediate_name);
    let output = dir.join(&names.canonical_local_name);
    if !names.requires_conversion() {
        return Ok(output);
    }

    let reason = match converter.convert(&input, &output) {
        Err(err) => Some(err.to_string()),
        Ok(()) if !output.as_std_path().exists() => Some("no output was written".to_string()),
        Ok(()) if !fs_util::is_non_empty_file(&output) => Some("output is empty".to_string()),
        Ok(()) => None,
    };
    if let Some(reason) = reason {
        fs_util::remove_if_exists(&output)?;
        return Err(GnssError::ConversionFailed { input, reason });
    }

    fs_util::remove_if_exists(&input)?;
    debug!(path = %output, "converted");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::Compression;

    enum Behavior {
        Write(&'static [u8]),
        WriteThenFail,
        Nothing,
    }

    struct ScriptedConverter {
        behavior: Behavior,
        calls: Mutex<usize>,
    }

    impl ScriptedConverter {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: Mutex::new(0),
            }
        }
    }

    impl Converter for ScriptedConverter {
        fn convert(&self, _input: &Utf8Path, output: &Utf8Path) -> Result<(), GnssError> {
            *self.calls.lock().unwrap() += 1;
            match self.behavior {
                Behavior::Write(content) => {
                    fs::write(output, content).unwrap();
                    Ok(())
                }
                Behavior::WriteThenFail => {
                    fs::write(output, b"partial").unwrap();
                    Err(GnssError::ToolFailed {
                        tool: "crx2rnx".to_string(),
                        message: "broken header".to_string(),
                    })
                }
                Behavior::Nothing => Ok(()),
            }
        }
    }

    fn names() -> NameSet {
        NameSet {
            remote_stem: "abpo0060.21d".to_string(),
            intermediate_name: "abpo0060.21d".to_string(),
            canonical_local_name: "abpo0060.21o".to_string(),
            candidates: vec![Compression::Gzip, Compression::Compress],
        }
    }

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(dir.join("abpo0060.21d"), b"crx").unwrap();
        (temp, dir)
    }

    #[test]
    fn success_removes_intermediate() {
        let (_temp, dir) = scratch();
        let converter = ScriptedConverter::new(Behavior::Write(b"rinex"));
        let output = convert(&converter, &dir, &names()).unwrap();
        assert_eq!(output, dir.join("abpo0060.21o"));
        assert!(!dir.join("abpo0060.21d").exists());
        assert_eq!(*converter.calls.lock().unwrap(), 1);
    }

    #[test]
    fn failure_keeps_intermediate_and_drops_partial_output() {
        let (_temp, dir) = scratch();
        let converter = ScriptedConverter::new(Behavior::WriteThenFail);
        let err = convert(&converter, &dir, &names()).unwrap_err();
        assert_matches!(err, GnssError::ConversionFailed { .. });
        assert!(dir.join("abpo0060.21d").exists());
        assert!(!dir.join("abpo0060.21o").exists());
    }

    #[test]
    fn empty_or_missing_output_is_failure() {
        let (_temp, dir) = scratch();
        let err = convert(&ScriptedConverter::new(Behavior::Nothing), &dir, &names()).unwrap_err();
        assert_matches!(err, GnssError::ConversionFailed { reason, .. } if reason.contains("no output"));

        let err = convert(&ScriptedConverter::new(Behavior::Write(b"")), &dir, &names()).unwrap_err();
        assert_matches!(err, GnssError::ConversionFailed { .. });
        assert!(!dir.join("abpo0060.21o").exists());
        assert!(dir.join("abpo0060.21d").exists());
    }

    #[test]
    fn products_without_conversion_are_left_alone() {
        let (_temp, dir) = scratch();
        let plain = NameSet {
            canonical_local_name: "abpo0060.21d".to_string(),
            ..names()
        };
        let converter = ScriptedConverter::new(Behavior::Nothing);
        convert(&converter, &dir, &plain).unwrap();
        assert_eq!(*converter.calls.lock().unwrap(), 0);
        assert!(dir.join("abpo0060.21d").exists());
    }
}
