use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Fixed key of the one draft kept per device scope.
pub const DRAFT_KEY: &str = "athlete_questionnaire_draft";

/// Durable key-value slot holding the serialized draft.
pub trait DraftSlot: Debug + Send + Sync {
    fn read(&self) -> Result<Option<String>, DraftSlotError>;
    fn write(&self, contents: &str) -> Result<(), DraftSlotError>;
    fn clear(&self) -> Result<(), DraftSlotError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DraftSlotError {
    #[error("draft slot io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft slot unavailable: {0}")]
    Unavailable(String),
}

/// Draft slot backed by `<directory>/athlete_questionnaire_draft.json`.
#[derive(Debug, Clone)]
pub struct FileDraftSlot {
    path: PathBuf,
}

impl FileDraftSlot {
    pub fn in_directory<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            path: directory.as_ref().join(format!("{DRAFT_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DraftSlot for FileDraftSlot {
    fn read(&self) -> Result<Option<String>, DraftSlotError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, contents: &str) -> Result<(), DraftSlotError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Whole-object overwrite through a sibling file so readers never see half a draft.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), DraftSlotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process slot for tests and the demo.
#[derive(Debug, Default)]
pub struct MemoryDraftSlot {
    contents: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

impl MemoryDraftSlot {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            writes: Mutex::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().expect("draft slot mutex poisoned").clone()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().expect("draft slot mutex poisoned")
    }
}

impl DraftSlot for MemoryDraftSlot {
    fn read(&self) -> Result<Option<String>, DraftSlotError> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<(), DraftSlotError> {
        *self.contents.lock().expect("draft slot mutex poisoned") = Some(contents.to_string());
        *self.writes.lock().expect("draft slot mutex poisoned") += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), DraftSlotError> {
        *self.contents.lock().expect("draft slot mutex poisoned") = None;
        Ok(())
    }
}

impl<S: DraftSlot + ?Sized> DraftSlot for Arc<S> {
    fn read(&self) -> Result<Option<String>, DraftSlotError> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> Result<(), DraftSlotError> {
        (**self).write(contents)
    }

    fn clear(&self) -> Result<(), DraftSlotError> {
        (**self).clear()
    }
}

/// Hands each user their own slot; the device scope of a draft.
pub trait DraftSlotFactory: Send + Sync {
    fn slot_for(&self, scope: &str) -> Box<dyn DraftSlot>;
}

/// One subdirectory per scope under a root directory.
#[derive(Debug, Clone)]
pub struct FileDraftSlotFactory {
    root: PathBuf,
}

impl FileDraftSlotFactory {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl DraftSlotFactory for FileDraftSlotFactory {
    fn slot_for(&self, scope: &str) -> Box<dyn DraftSlot> {
        Box::new(FileDraftSlot::in_directory(
            self.root.join(sanitize_scope(scope)),
        ))
    }
}

const SCOPE_PREFIX_LEN: usize = 32;

/// Readable prefix plus a digest of the raw scope, so distinct scopes never share a directory.
fn sanitize_scope(scope: &str) -> String {
    let readable: String = scope
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(SCOPE_PREFIX_LEN)
        .collect();
    let digest = hex::encode(Sha256::digest(scope.as_bytes()));
    if readable.is_empty() {
        format!("anonymous-{digest}")
    } else {
        format!("{readable}-{digest}")
    }
}
