//! Submission validation
//!
//! Turns a raw [`CheckRequest`] into a validated submission before anything
//! touches the filesystem. A submission must declare which client sent it;
//! the declared source decides how the entry-file field is interpreted.
//! Nothing here guesses: an undeclared source is an error, not a fallback.

use drydock_core::protocol::{CheckRequest, SubmittedFile};
use drydock_core::{DrydockError, Result};
use std::fmt;

/// Clients allowed to submit checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    WebIde,
    Vscode,
}

/// A `major.minor.patch` client version, ordered lexicographically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ClientVersion {
    /// First vscode client that sends the entry file as a path segment
    /// array instead of a literal filename
    pub const SEGMENTED_MAIN_SINCE: Self = Self {
        major: 0,
        minor: 2,
        patch: 6,
    };

    pub fn parse(version: &str) -> Result<Self> {
        let parts: Vec<&str> = version.split('.').collect();
        let &[major, minor, patch] = parts.as_slice() else {
            return Err(DrydockError::Submission(format!(
                "invalid client version: {version}"
            )));
        };
        let parse = |part: &str| {
            part.parse::<u32>().map_err(|_| {
                DrydockError::Submission(format!("invalid client version: {version}"))
            })
        };
        Ok(Self {
            major: parse(major)?,
            minor: parse(minor)?,
            patch: parse(patch)?,
        })
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A validated submission, ready for namespace allocation
#[derive(Debug, Clone)]
pub struct Submission {
    /// Workspace-relative path of the entry file
    pub main_file: String,
    pub source: Source,
    pub version: Option<ClientVersion>,
}

/// Validate a check request into a [`Submission`].
pub fn parse_submission(request: &CheckRequest) -> Result<Submission> {
    let source = request
        .source
        .as_deref()
        .filter(|source| !source.is_empty())
        .ok_or_else(|| {
            DrydockError::Submission(String::from("submission must declare a source"))
        })?;

    let submission = match source {
        "web-ide" => Submission {
            main_file: join_segments(&request.main)?,
            source: Source::WebIde,
            version: None,
        },
        "vscode" => {
            let version = request.version.as_deref().ok_or_else(|| {
                DrydockError::Submission(String::from(
                    "vscode submission must declare a client version",
                ))
            })?;
            let version = ClientVersion::parse(version)?;
            let main_file = if version >= ClientVersion::SEGMENTED_MAIN_SINCE {
                join_segments(&request.main)?
            } else {
                // Old clients send the filename literally.
                validate_relative_path(&request.main)?;
                request.main.clone()
            };
            Submission {
                main_file,
                source: Source::Vscode,
                version: Some(version),
            }
        }
        other => {
            return Err(DrydockError::Submission(format!(
                "unknown source: {other}"
            )));
        }
    };

    validate_files(&request.files)?;
    Ok(submission)
}

/// Decode a JSON-encoded path segment array into a relative path
fn join_segments(main: &str) -> Result<String> {
    let segments: Vec<String> = serde_json::from_str(main).map_err(|_| {
        DrydockError::Submission(String::from(
            "entry file must be a JSON-encoded path segment array",
        ))
    })?;
    if segments.is_empty() {
        return Err(DrydockError::Submission(String::from(
            "entry file path is empty",
        )));
    }
    let joined = segments.join("/");
    validate_relative_path(&joined)?;
    Ok(joined)
}

/// Reject paths that could escape the run workspace
fn validate_relative_path(path: &str) -> Result<()> {
    let escapes = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|segment| segment.is_empty() || segment == "..");
    if escapes {
        return Err(DrydockError::Submission(format!(
            "illegal file path in submission: {path}"
        )));
    }
    Ok(())
}

/// Every submitted file must stay inside the workspace
pub fn validate_files(files: &[SubmittedFile]) -> Result<()> {
    for file in files {
        validate_relative_path(&file.path)?;
    }
    Ok(())
}
