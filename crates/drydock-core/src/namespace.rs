//! Run namespaces
//!
//! Every check runs inside its own namespace: a uniquely-named workspace
//! directory holding the submitted files, plus reserved host paths for the
//! artifacts copied back out of the sandbox. The namespace id doubles as the
//! container name, so id uniqueness is what keeps concurrent runs apart.

use crate::{DrydockError, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One sandboxed execution's identity and on-disk layout
#[derive(Debug, Clone)]
pub struct RunNamespace {
    /// Unique id; also the sandbox container name
    pub id: String,

    /// Exclusively-owned workspace directory
    pub directory: PathBuf,

    /// Submitted entry file inside the workspace
    pub main_file: PathBuf,

    /// Entry file name as submitted, relative to the workspace
    pub main_filename: String,

    /// Host path reserved for the retrieved report
    pub report_file: PathBuf,

    /// Host path reserved for the retrieved trace rendering
    pub trace_file: PathBuf,
}

/// Allocates and destroys run namespaces under fixed root directories
#[derive(Debug, Clone)]
pub struct NamespaceAllocator {
    uploads_root: PathBuf,
    traces_root: PathBuf,
}

impl NamespaceAllocator {
    pub fn new(uploads_root: impl Into<PathBuf>, traces_root: impl Into<PathBuf>) -> Self {
        Self {
            uploads_root: uploads_root.into(),
            traces_root: traces_root.into(),
        }
    }

    /// Allocate a fresh namespace and create its workspace directory.
    ///
    /// A collision with an existing workspace fails the allocation rather
    /// than reusing the directory; it signals either an oversized workspace
    /// pool or an exhausted id space, and the caller may simply retry.
    pub async fn allocate(&self, main_filename: &str) -> Result<RunNamespace> {
        self.allocate_with_id(&Uuid::new_v4().to_string(), main_filename)
            .await
    }

    async fn allocate_with_id(&self, id: &str, main_filename: &str) -> Result<RunNamespace> {
        let directory = self.uploads_root.join(id);
        if tokio::fs::try_exists(&directory).await? {
            return Err(DrydockError::Allocation(format!(
                "workspace for id {id} already exists"
            )));
        }
        tokio::fs::create_dir_all(&directory).await?;

        // The report gets its own uuid so a submission named like the report
        // file can never shadow it.
        let report_file = directory.join(Uuid::new_v4().to_string());
        let trace_file = self.traces_root.join(format!("{id}.html"));

        Ok(RunNamespace {
            id: id.to_owned(),
            directory: directory.clone(),
            main_file: directory.join(main_filename),
            main_filename: main_filename.to_owned(),
            report_file,
            trace_file,
        })
    }

    /// Recursively delete the namespace workspace.
    ///
    /// Failures are warnings: by the time this runs the outcome has already
    /// been determined and handed back, and a leaked directory must never
    /// turn it into an error.
    pub async fn destroy(&self, namespace: &RunNamespace) {
        if let Err(e) = tokio::fs::remove_dir_all(&namespace.directory).await {
            tracing::warn!(
                namespace = %namespace.id,
                error = %e,
                "failed to clean up workspace"
            );
        }
    }
}

impl RunNamespace {
    /// Whether the submitted entry file is present and a regular file
    pub async fn main_file_exists(&self) -> bool {
        tokio::fs::metadata(&self.main_file)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Workspace-relative path of the entry file as seen from the container
    /// working directory
    #[must_use]
    pub fn container_main_arg(&self, mount_point: &Path) -> String {
        let mount = mount_point
            .file_name()
            .map_or_else(|| String::from("code"), |n| n.to_string_lossy().into_owned());
        format!("../{mount}/{}", self.main_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn allocator(root: &TempDir) -> NamespaceAllocator {
        NamespaceAllocator::new(root.path().join("uploads"), root.path().join("traces"))
    }

    #[tokio::test]
    async fn allocate_creates_the_workspace() {
        let root = TempDir::new().unwrap();
        let ns = allocator(&root).allocate("main.ex").await.unwrap();

        assert!(ns.directory.is_dir());
        assert_eq!(ns.main_file, ns.directory.join("main.ex"));
        assert_eq!(ns.directory.file_name().unwrap().to_str().unwrap(), ns.id);
        assert_eq!(ns.report_file.parent().unwrap(), ns.directory);
        assert_ne!(ns.report_file, ns.main_file);
        assert_eq!(
            ns.trace_file,
            root.path().join("traces").join(format!("{}.html", ns.id))
        );
    }

    #[tokio::test]
    async fn allocations_get_distinct_ids() {
        let root = TempDir::new().unwrap();
        let allocator = allocator(&root);
        let a = allocator.allocate("a.ex").await.unwrap();
        let b = allocator.allocate("b.ex").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.directory, b.directory);
    }

    #[tokio::test]
    async fn colliding_id_fails_without_overwrite() {
        let root = TempDir::new().unwrap();
        let allocator = allocator(&root);

        let taken = root.path().join("uploads").join("fixed-id");
        tokio::fs::create_dir_all(&taken).await.unwrap();
        let marker = taken.join("existing");
        tokio::fs::write(&marker, b"keep").await.unwrap();

        let err = allocator
            .allocate_with_id("fixed-id", "main.ex")
            .await
            .unwrap_err();
        assert!(matches!(err, DrydockError::Allocation(_)));
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn allocate_after_destroy_can_reuse_the_id() {
        let root = TempDir::new().unwrap();
        let allocator = allocator(&root);

        let ns = allocator.allocate_with_id("reused", "main.ex").await.unwrap();
        allocator.destroy(&ns).await;
        assert!(!ns.directory.exists());

        let again = allocator.allocate_with_id("reused", "main.ex").await.unwrap();
        assert!(again.directory.is_dir());
    }

    #[tokio::test]
    async fn destroy_tolerates_a_missing_workspace() {
        let root = TempDir::new().unwrap();
        let allocator = allocator(&root);
        let ns = allocator.allocate("main.ex").await.unwrap();
        allocator.destroy(&ns).await;
        // Second destroy only logs.
        allocator.destroy(&ns).await;
    }

    #[tokio::test]
    async fn main_file_check_requires_a_regular_file() {
        let root = TempDir::new().unwrap();
        let ns = allocator(&root).allocate("main.ex").await.unwrap();
        assert!(!ns.main_file_exists().await);

        tokio::fs::create_dir(&ns.main_file).await.unwrap();
        assert!(!ns.main_file_exists().await);

        tokio::fs::remove_dir(&ns.main_file).await.unwrap();
        tokio::fs::write(&ns.main_file, b"assert False\n").await.unwrap();
        assert!(ns.main_file_exists().await);
    }

    #[test]
    fn container_main_arg_is_relative_to_the_workdir() {
        let ns = RunNamespace {
            id: String::from("abc"),
            directory: PathBuf::from("/tmp/uploads/abc"),
            main_file: PathBuf::from("/tmp/uploads/abc/main.ex"),
            main_filename: String::from("main.ex"),
            report_file: PathBuf::from("/tmp/uploads/abc/report"),
            trace_file: PathBuf::from("/tmp/traces/abc.html"),
        };
        assert_eq!(ns.container_main_arg(Path::new("/code")), "../code/main.ex");
    }
}
