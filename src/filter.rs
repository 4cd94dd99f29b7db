use crate::handle::{Handle, HandleOption};
use crate::heartbeat::{EntityType, HeartBeat};
use crate::project::{self, ProjectError};
use regex::Regex;
use std::io;
use std::path::Path;

/// Which heartbeats survive [`with_filtering`].
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub exclude: Vec<Regex>,
    pub exclude_unknown_project: bool,
    pub include: Vec<Regex>,
    pub include_only_with_project_file: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The heartbeat should be dropped. Not a failure.
    #[error("skipping because {0}")]
    Skip(String),

    #[error("error detecting project file: {0}")]
    ProjectFile(#[from] ProjectError),
}

pub fn with_filtering<'a>(config: FilterConfig) -> HandleOption<'a> {
    Box::new(move |mut next: Handle<'a>| -> Handle<'a> {
        Box::new(move |hh: Vec<HeartBeat>| {
            let mut filtered = Vec::with_capacity(hh.len());

            for h in hh {
                match filter(&h, &config) {
                    Ok(()) => filtered.push(h),
                    Err(FilterError::Skip(reason)) => {
                        tracing::debug!(entity = %h.entity, "skipping because {}", reason);
                    }
                    Err(e) => return Err(anyhow::Error::new(e).context("error filtering heartbeat")),
                }
            }

            if filtered.is_empty() {
                tracing::debug!("no heartbeat left after filtering. abort heartbeat handling.");
                return Ok(Vec::new());
            }

            next(filtered)
        })
    })
}

/// Decides whether `h` should be sent. `Err(FilterError::Skip)` means drop it.
pub fn filter(h: &HeartBeat, config: &FilterConfig) -> Result<(), FilterError> {
    if config.exclude_unknown_project && h.project.as_deref().map_or(true, str::is_empty) {
        return Err(FilterError::Skip("of unknown project".into()));
    }

    filter_by_pattern(&h.entity, &config.include, &config.exclude)?;

    if h.entity_type == EntityType::File {
        filter_file_entity(Path::new(&h.entity), config.include_only_with_project_file)?;
    }

    Ok(())
}

// include wins over exclude
fn filter_by_pattern(entity: &str, include: &[Regex], exclude: &[Regex]) -> Result<(), FilterError> {
    if entity.is_empty() {
        return Ok(());
    }

    if include.iter().any(|pattern| pattern.is_match(entity)) {
        return Ok(());
    }

    match exclude.iter().find(|pattern| pattern.is_match(entity)) {
        Some(pattern) => Err(FilterError::Skip(format!(
            "matches exclude pattern {:?}",
            pattern.as_str()
        ))),
        None => Ok(()),
    }
}

fn filter_file_entity(path: &Path, include_only_with_project_file: bool) -> Result<(), FilterError> {
    match path.metadata() {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FilterError::Skip(format!(
                "of non-existing file {:?}",
                path.display().to_string()
            )));
        }
        Err(e) => {
            // Exists but can't be inspected; keep it and let the detectors cope.
            tracing::warn!("failed to stat file {:?}: {}", path.display().to_string(), e);
        }
        Ok(_) => {}
    }

    if include_only_with_project_file && project::file::find_file(path)?.is_none() {
        return Err(FilterError::Skip(format!(
            "of missing {} file in parent path",
            project::file::PROJECT_FILE
        )));
    }

    Ok(())
}
