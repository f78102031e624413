//! External table loaders run as subprocesses
//!
//! These tools open their own database session, so whatever they write is
//! outside the importer's transaction. Success is judged only by exit status.

use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DatasetError, Result};

/// A program invoked to load files straight into the database
#[derive(Debug, Clone)]
pub struct ExternalLoader {
    program: String,
}

impl ExternalLoader {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the loader to completion and map a non-zero exit to an error
    pub async fn run(&self, args: &[OsString]) -> Result<()> {
        debug!(program = %self.program, ?args, "Running external loader");

        let status = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .status()
            .await?;

        if !status.success() {
            return Err(DatasetError::ExternalTool {
                program: self.program.clone(),
                status,
            });
        }

        info!(program = %self.program, "External loader finished");
        Ok(())
    }
}

/// Arguments for an `ogr2ogr` shapefile import into PostgreSQL
///
/// `append` adds to a layer created by a previous invocation. The spatial
/// index is left to the caller so its name does not depend on the layer name.
pub fn ogr2ogr_args(connection: &str, layer: &str, shapefile: &Path, append: bool) -> Vec<OsString> {
    let target = format!("PG:{}", connection);
    let mut args: Vec<OsString> = Vec::new();
    if append {
        args.push("-append".into());
    }
    for arg in [
        "-f",
        "PostgreSQL",
        target.as_str(),
        "-nln",
        layer,
        "-nlt",
        "MultiPolygon",
        "-lco",
        "PRECISION=no",
        "-lco",
        "GEOMETRY_NAME=geom",
        "-lco",
        "SPATIAL_INDEX=NONE",
    ] {
        args.push(arg.into());
    }
    args.push(shapefile.as_os_str().to_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_file_creates_layer() {
        let args = ogr2ogr_args("dbname=geo", "_tmp_municipalities_spain", Path::new("/s/a.shp"), false);
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-f",
                "PostgreSQL",
                "PG:dbname=geo",
                "-nln",
                "_tmp_municipalities_spain",
                "-nlt",
                "MultiPolygon",
                "-lco",
                "PRECISION=no",
                "-lco",
                "GEOMETRY_NAME=geom",
                "-lco",
                "SPATIAL_INDEX=NONE",
                "/s/a.shp",
            ]
        );
    }

    #[test]
    fn test_following_files_append() {
        let args = ogr2ogr_args("dbname=geo", "layer", Path::new("b.shp"), true);
        assert_eq!(args[0], OsString::from("-append"));
        assert_eq!(args.len(), 15);
    }

    #[tokio::test]
    async fn test_exit_status_is_checked() {
        assert!(ExternalLoader::new("true").run(&[]).await.is_ok());

        let err = ExternalLoader::new("false").run(&[]).await.unwrap_err();
        assert!(matches!(err, DatasetError::ExternalTool { ref program, .. } if program == "false"));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let result = ExternalLoader::new("geodata-no-such-loader").run(&[]).await;
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }
}
