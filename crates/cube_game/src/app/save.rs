use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use lattice::{write_text_atomic, CellColor, CubeSize, Palette};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const SAVE_VERSION: u32 = 1;
pub(crate) const SAVE_FILE_NAME: &str = "lattice.json";

/// On-disk snapshot of the colour assignment for one lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LatticeSave {
    pub(crate) save_version: u32,
    pub(crate) cube_size: i32,
    pub(crate) palette: Palette,
    pub(crate) cells: Vec<CellColor>,
}

#[derive(Debug, Error)]
pub(crate) enum SaveError {
    #[error("read save '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write save '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("parse save json{}: {source}", location_suffix(.location))]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {field}: {message}")]
    Validation { field: String, message: String },
}

fn location_suffix(location: &str) -> String {
    if location.is_empty() || location == "." {
        String::new()
    } else {
        format!(" at {location}")
    }
}

impl LatticeSave {
    pub(crate) fn new(cube_size: i32, palette: Palette, cells: Vec<CellColor>) -> Self {
        Self {
            save_version: SAVE_VERSION,
            cube_size,
            palette,
            cells,
        }
    }

    pub(crate) fn from_json_str(raw: &str) -> Result<Self, SaveError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let save: Self =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                let location = error.path().to_string();
                SaveError::Parse {
                    location,
                    source: error.into_inner(),
                }
            })?;
        save.validate()?;
        Ok(save)
    }

    pub(crate) fn validate(&self) -> Result<(), SaveError> {
        if self.save_version != SAVE_VERSION {
            return Err(expected_actual(
                "save_version",
                SAVE_VERSION,
                self.save_version,
            ));
        }
        let size = CubeSize::new(self.cube_size)
            .map_err(|error| validation_err("cube_size", error.to_string()))?;
        if self.cells.len() != size.cell_count() {
            return Err(expected_actual(
                "cells",
                format!("{} entries", size.cell_count()),
                self.cells.len(),
            ));
        }
        for (index, cell) in self.cells.iter().enumerate() {
            if let Some(palette_index) = cell {
                if usize::from(*palette_index) >= self.palette.len() {
                    return Err(validation_err(
                        &format!("cells[{index}]"),
                        format!(
                            "palette index {palette_index} out of range for {} colours",
                            self.palette.len()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn write_save(path: &Path, save: &LatticeSave) -> Result<(), SaveError> {
    let json = serde_json::to_string_pretty(save).map_err(SaveError::Encode)?;
    write_text_atomic(path, &json).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_save(path: &Path) -> Result<LatticeSave, SaveError> {
    let raw = fs::read_to_string(path).map_err(|source| SaveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    LatticeSave::from_json_str(&raw)
}

fn validation_err(field: &str, message: impl Into<String>) -> SaveError {
    SaveError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

fn expected_actual(field: &str, expected: impl Display, actual: impl Display) -> SaveError {
    validation_err(field, format!("expected {expected}, got {actual}"))
}
