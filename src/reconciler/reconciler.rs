use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use derive_more::Display;
use filetime::FileTime;
use snafu::{Report, ResultExt, Snafu, ensure};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::reconciler::Checksum;

/// Counters describing what a single reconciliation pass did to the replica.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[display(
    "{dirs_created} directories created, {files_copied} files copied, \
     {files_unchanged} files unchanged, {files_removed} files removed, \
     {dirs_removed} directories removed, {failed_entries} entries failed"
)]
pub struct PassSummary {
    pub dirs_created: usize,
    pub files_copied: usize,
    pub files_unchanged: usize,
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub failed_entries: usize,
}

impl PassSummary {
    pub fn is_clean(&self) -> bool {
        self.failed_entries == 0
    }
}

/// Mirrors a source tree onto a replica tree.
///
/// A pass first propagates every source directory and changed file onto the
/// replica, then prunes whatever the replica holds that the source does not.
/// The source tree is never written to.
#[derive(Debug, Clone)]
pub struct Reconciler {
    source_root: PathBuf,
    replica_root: PathBuf,
}

impl Reconciler {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
        }
    }

    /// Runs one full pass.
    ///
    /// Fails only when one of the roots cannot be used. Failures on individual
    /// entries are logged and counted in the returned summary.
    pub fn reconcile(&self) -> Result<PassSummary, ReconcileError> {
        let mut summary = PassSummary::default();

        self.ensure_source_root()?;
        self.ensure_replica_root(&mut summary)?;

        self.propagate(&mut summary)?;
        self.prune(&mut summary)?;

        Ok(summary)
    }

    fn ensure_source_root(&self) -> Result<(), ReconcileError> {
        let metadata = fs::metadata(&self.source_root).context(SourceRootSnafu {
            path: &self.source_root,
        })?;
        ensure!(
            metadata.is_dir(),
            SourceNotDirectorySnafu {
                path: &self.source_root
            }
        );
        fs::read_dir(&self.source_root).context(SourceRootSnafu {
            path: &self.source_root,
        })?;
        Ok(())
    }

    fn ensure_replica_root(&self, summary: &mut PassSummary) -> Result<(), ReconcileError> {
        match fs::metadata(&self.replica_root) {
            Ok(metadata) => {
                ensure!(
                    metadata.is_dir(),
                    ReplicaNotDirectorySnafu {
                        path: &self.replica_root
                    }
                );
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.replica_root).context(ReplicaRootSnafu {
                    path: &self.replica_root,
                })?;
                debug!("Created directory {}", self.replica_root.display());
                summary.dirs_created += 1;
            }
            Err(error) => {
                return Err(error).context(ReplicaRootSnafu {
                    path: &self.replica_root,
                });
            }
        }
        Ok(())
    }

    /// Brings every source directory and file over to the replica.
    fn propagate(&self, summary: &mut PassSummary) -> Result<(), ReconcileError> {
        let walker = WalkDir::new(&self.source_root)
            .min_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    Self::record_walk_failure(&self.source_root, error, summary)?;
                    continue;
                }
            };

            let result = counterpart(entry.path(), &self.source_root, &self.replica_root)
                .and_then(|replica_path| {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        Self::mirror_directory(&replica_path, summary)
                    } else if file_type.is_file() {
                        Self::mirror_file(entry.path(), &replica_path, summary)
                    } else if file_type.is_symlink() {
                        Self::mirror_symlink(entry.path(), &replica_path, summary)
                    } else {
                        debug!("Skipping special file {}", entry.path().display());
                        Ok(())
                    }
                });

            if let Err(error) = result {
                Self::record_entry_failure(error, summary);
            }
        }

        Ok(())
    }

    /// Removes every replica entry the source no longer has.
    fn prune(&self, summary: &mut PassSummary) -> Result<(), ReconcileError> {
        let mut walker = WalkDir::new(&self.replica_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    Self::record_walk_failure(&self.replica_root, error, summary)?;
                    continue;
                }
            };

            let source_path = match counterpart(entry.path(), &self.replica_root, &self.source_root)
            {
                Ok(source_path) => source_path,
                Err(error) => {
                    Self::record_entry_failure(error, summary);
                    continue;
                }
            };

            let result = if entry.file_type().is_dir() {
                if is_mirrored_directory(&source_path) {
                    continue;
                }
                // The whole subtree goes, so its children need no inspection.
                walker.skip_current_dir();
                Self::remove_directory(entry.path(), summary)
            } else if !is_mirrored_file(&source_path) {
                Self::remove_file(entry.path(), summary)
            } else {
                Ok(())
            };

            if let Err(error) = result {
                Self::record_entry_failure(error, summary);
            }
        }

        Ok(())
    }

    fn mirror_directory(
        replica_path: &Path,
        summary: &mut PassSummary,
    ) -> Result<(), ReconcileError> {
        match fs::symlink_metadata(replica_path) {
            Ok(metadata) if metadata.is_dir() => return Ok(()),
            Ok(_) => Self::remove_file(replica_path, summary)?,
            Err(_) => {}
        }

        fs::create_dir_all(replica_path).context(CreateDirectorySnafu { path: replica_path })?;
        debug!("Created directory {}", replica_path.display());
        summary.dirs_created += 1;
        Ok(())
    }

    fn mirror_file(
        source_path: &Path,
        replica_path: &Path,
        summary: &mut PassSummary,
    ) -> Result<(), ReconcileError> {
        match fs::symlink_metadata(replica_path) {
            Ok(metadata) if metadata.is_dir() => Self::remove_directory(replica_path, summary)?,
            Ok(metadata) if metadata.is_file() => {
                if !Self::contents_differ(source_path, replica_path)? {
                    summary.files_unchanged += 1;
                    return Ok(());
                }
            }
            // Copying onto a link would write through to its target.
            Ok(_) => Self::remove_file(replica_path, summary)?,
            Err(_) => {}
        }

        Self::copy_file(source_path, replica_path)?;
        summary.files_copied += 1;
        Ok(())
    }

    fn mirror_symlink(
        source_path: &Path,
        replica_path: &Path,
        summary: &mut PassSummary,
    ) -> Result<(), ReconcileError> {
        match fs::metadata(source_path) {
            Ok(metadata) if metadata.is_file() => {
                Self::mirror_file(source_path, replica_path, summary)
            }
            Ok(_) => {
                debug!(
                    "Skipping symbolic link to directory {}",
                    source_path.display()
                );
                Ok(())
            }
            Err(_) => {
                debug!("Skipping dangling symbolic link {}", source_path.display());
                Ok(())
            }
        }
    }

    fn contents_differ(source_path: &Path, replica_path: &Path) -> Result<bool, ReconcileError> {
        let source_checksum =
            Checksum::from_file(source_path).context(ChecksumSnafu { path: source_path })?;
        let replica_checksum =
            Checksum::from_file(replica_path).context(ChecksumSnafu { path: replica_path })?;
        Ok(source_checksum != replica_checksum)
    }

    /// Copies content and permissions, then carries the access and modification
    /// times over.
    fn copy_file(source_path: &Path, replica_path: &Path) -> Result<(), ReconcileError> {
        fs::copy(source_path, replica_path).context(CopySnafu {
            from: source_path,
            to: replica_path,
        })?;

        let metadata = fs::metadata(source_path).context(TimestampSnafu { path: replica_path })?;
        filetime::set_file_times(
            replica_path,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )
        .context(TimestampSnafu { path: replica_path })?;

        debug!(
            "Copied file {} to {}",
            source_path.display(),
            replica_path.display()
        );
        Ok(())
    }

    fn remove_file(path: &Path, summary: &mut PassSummary) -> Result<(), ReconcileError> {
        fs::remove_file(path).context(RemoveFileSnafu { path })?;
        debug!("Removed file {}", path.display());
        summary.files_removed += 1;
        Ok(())
    }

    fn remove_directory(path: &Path, summary: &mut PassSummary) -> Result<(), ReconcileError> {
        fs::remove_dir_all(path).context(RemoveDirectorySnafu { path })?;
        debug!("Removed directory {}", path.display());
        summary.dirs_removed += 1;
        Ok(())
    }

    /// A walk error on the root itself fails the pass, anything deeper is an
    /// entry failure.
    fn record_walk_failure(
        root: &Path,
        error: walkdir::Error,
        summary: &mut PassSummary,
    ) -> Result<(), ReconcileError> {
        if error.depth() == 0 {
            return Err(error).context(WalkSnafu { path: root });
        }
        Self::record_entry_failure(
            ReconcileError::WalkError {
                path: root.to_path_buf(),
                source: error,
            },
            summary,
        );
        Ok(())
    }

    fn record_entry_failure(error: ReconcileError, summary: &mut PassSummary) {
        warn!("Skipping entry: {}", Report::from_error(error));
        summary.failed_entries += 1;
    }
}

/// Maps `path` under `from_root` onto the same relative path under `to_root`.
fn counterpart(path: &Path, from_root: &Path, to_root: &Path) -> Result<PathBuf, ReconcileError> {
    path.strip_prefix(from_root)
        .map(|relative| to_root.join(relative))
        .map_err(|_| ReconcileError::OutsideRootError {
            path: path.to_path_buf(),
            root: from_root.to_path_buf(),
        })
}

/// Directories are mirrored only when they are real directories, links to
/// directories are never descended into.
fn is_mirrored_directory(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

fn is_mirrored_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

#[derive(Debug, Snafu)]
pub enum ReconcileError {
    #[snafu(display("Source root {} is not accessible", path.display()))]
    SourceRootError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Source root {} is not a directory", path.display()))]
    SourceNotDirectoryError { path: PathBuf },
    #[snafu(display("Replica root {} is not accessible", path.display()))]
    ReplicaRootError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Replica root {} is not a directory", path.display()))]
    ReplicaNotDirectoryError { path: PathBuf },
    #[snafu(display("Failed to walk the tree under {}", path.display()))]
    WalkError {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[snafu(display("Entry {} lies outside of {}", path.display(), root.display()))]
    OutsideRootError { path: PathBuf, root: PathBuf },
    #[snafu(display("Failed to create directory {}", path.display()))]
    CreateDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to compute the checksum of {}", path.display()))]
    ChecksumError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to copy {} to {}", from.display(), to.display()))]
    CopyError {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to copy timestamps onto {}", path.display()))]
    TimestampError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove file {}", path.display()))]
    RemoveFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove directory {}", path.display()))]
    RemoveDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
}
