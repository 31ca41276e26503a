use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::data::loader::load_workbook;
use crate::data::model::{Table, Workbook};
use crate::data::relationships::{RelationshipSlices, slice_relationships};
use crate::data::schema::{Capabilities, SheetKind};
use crate::error::LoadError;
use crate::view::trends::Page;

// ---------------------------------------------------------------------------
// Upload identity
// ---------------------------------------------------------------------------

/// Identity of an opened file. Two handles are equal when they name the
/// same file with the same size and modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl UploadHandle {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let meta = std::fs::metadata(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// What [`SessionContext::open`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file was parsed and installed.
    Loaded,
    /// The same file is already installed; nothing was re-parsed.
    Reused,
}

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// The four well-known sheets, when the workbook has them.
#[derive(Debug, Clone, Default)]
pub struct SessionTables {
    pub techniques: Option<Table>,
    pub software: Option<Table>,
    pub relationships: Option<Table>,
    pub campaigns: Option<Table>,
}

impl SessionTables {
    pub fn get(&self, kind: SheetKind) -> Option<&Table> {
        match kind {
            SheetKind::Techniques => self.techniques.as_ref(),
            SheetKind::Software => self.software.as_ref(),
            SheetKind::Relationships => self.relationships.as_ref(),
            SheetKind::Campaigns => self.campaigns.as_ref(),
        }
    }

    fn slot(&mut self, kind: SheetKind) -> &mut Option<Table> {
        match kind {
            SheetKind::Techniques => &mut self.techniques,
            SheetKind::Software => &mut self.software,
            SheetKind::Relationships => &mut self.relationships,
            SheetKind::Campaigns => &mut self.campaigns,
        }
    }
}

/// Everything derived from the opened workbook, plus the current Trends
/// page. Owned by the app and passed by reference into page builders.
#[derive(Debug, Default)]
pub struct SessionContext {
    upload: Option<UploadHandle>,
    workbook: Option<Workbook>,
    tables: SessionTables,
    slices: Option<RelationshipSlices>,
    capabilities: Capabilities,
    page: Page,
}

impl SessionContext {
    /// Open a workbook from disk, skipping the parse when the same file is
    /// already installed.
    pub fn open(&mut self, path: &Path) -> Result<UploadOutcome, LoadError> {
        self.open_with(path, load_workbook)
    }

    /// [`SessionContext::open`] with an explicit parser.
    ///
    /// Any failure discards the previous upload.
    pub fn open_with<F>(&mut self, path: &Path, load: F) -> Result<UploadOutcome, LoadError>
    where
        F: FnOnce(&Path) -> Result<Workbook, LoadError>,
    {
        let result = UploadHandle::from_path(path).and_then(|handle| {
            if self.workbook.is_some() && self.upload.as_ref() == Some(&handle) {
                log::debug!("{} unchanged, reusing parsed sheets", handle.file_name());
                return Ok(UploadOutcome::Reused);
            }
            let workbook = load(path)?;
            self.install(handle, workbook);
            Ok(UploadOutcome::Loaded)
        });
        if result.is_err() {
            self.clear();
        }
        result
    }

    /// Make `workbook` the session workbook and derive everything from it.
    pub fn install(&mut self, handle: UploadHandle, workbook: Workbook) {
        let capabilities = Capabilities::from_workbook(&workbook);

        let mut tables = SessionTables::default();
        for kind in SheetKind::ALL {
            *tables.slot(kind) = workbook.sheet(kind.sheet_name()).cloned();
            match capabilities.sheet(kind) {
                None => log::info!("Workbook has no '{}' sheet", kind.sheet_name()),
                Some(sheet) if !sheet.missing_required.is_empty() => log::warn!(
                    "'{}' sheet lacks required columns {:?}",
                    kind.sheet_name(),
                    sheet.missing_required
                ),
                Some(sheet) if !sheet.missing_optional.is_empty() => log::info!(
                    "'{}' sheet lacks optional columns {:?}",
                    kind.sheet_name(),
                    sheet.missing_optional
                ),
                Some(_) => {}
            }
        }

        self.slices = tables
            .relationships
            .as_ref()
            .filter(|_| capabilities.ready(SheetKind::Relationships))
            .map(slice_relationships);

        log::info!(
            "Opened {} with sheets {:?}",
            handle.file_name(),
            workbook.sheet_names()
        );
        self.tables = tables;
        self.capabilities = capabilities;
        self.workbook = Some(workbook);
        self.upload = Some(handle);
    }

    /// Drop the workbook and everything derived from it. The current
    /// Trends page is kept.
    pub fn clear(&mut self) {
        if let Some(handle) = &self.upload {
            log::info!("Removed {}", handle.file_name());
        }
        *self = SessionContext {
            page: self.page,
            ..SessionContext::default()
        };
    }

    pub fn is_loaded(&self) -> bool {
        self.workbook.is_some()
    }

    pub fn upload(&self) -> Option<&UploadHandle> {
        self.upload.as_ref()
    }

    pub fn workbook(&self) -> Option<&Workbook> {
        self.workbook.as_ref()
    }

    pub fn tables(&self) -> &SessionTables {
        &self.tables
    }

    /// `None` unless the relationships sheet has every required column.
    pub fn slices(&self) -> Option<&RelationshipSlices> {
        self.slices.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn navigate(&mut self, page: Page) {
        if page != self.page {
            log::debug!("Trends page {:?} → {:?}", self.page, page);
        }
        self.page = page;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn workbook() -> Workbook {
        Workbook::new(vec![
            Table::from_rows(
                "relationships",
                &["source name", "source type", "target name", "target type", "mapping type"],
                vec![vec!["APT28", "group", "T1059", "technique", "uses"]],
            ),
            Table::from_rows("campaigns", &["name"], vec![vec!["C0010"]]),
        ])
    }

    fn file_with(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(file.path(), contents).expect("write");
        file
    }

    #[test]
    fn install_populates_known_sheets_and_slices() {
        let file = file_with("x");
        let mut session = SessionContext::default();
        let outcome = session.open_with(file.path(), |_| Ok(workbook())).unwrap();

        assert_eq!(outcome, UploadOutcome::Loaded);
        assert!(session.tables().relationships.is_some());
        assert!(session.tables().campaigns.is_some());
        assert!(session.tables().techniques.is_none());
        assert_eq!(session.slices().map(|s| s.techniques.len()), Some(1));
    }

    #[test]
    fn reopening_the_same_file_skips_parsing() {
        let file = file_with("x");
        let parses = Cell::new(0);
        let load = |_: &Path| {
            parses.set(parses.get() + 1);
            Ok(workbook())
        };

        let mut session = SessionContext::default();
        session.open_with(file.path(), load).unwrap();
        let again = session.open_with(file.path(), load).unwrap();

        assert_eq!(again, UploadOutcome::Reused);
        assert_eq!(parses.get(), 1);

        std::fs::write(file.path(), "longer contents").unwrap();
        assert_eq!(session.open_with(file.path(), load).unwrap(), UploadOutcome::Loaded);
        assert_eq!(parses.get(), 2);
    }

    #[test]
    fn failed_load_discards_previous_upload() {
        let file = file_with("x");
        let mut session = SessionContext::default();
        session.open_with(file.path(), |_| Ok(workbook())).unwrap();
        session.navigate(Page::Software);

        let other = file_with("y");
        let err = session
            .open_with(other.path(), |p| {
                Err(LoadError::Empty {
                    path: p.to_path_buf(),
                })
            })
            .unwrap_err();

        assert!(matches!(err, LoadError::Empty { .. }));
        assert!(!session.is_loaded());
        assert!(session.tables().relationships.is_none());
        assert!(session.slices().is_none());
        assert_eq!(session.page(), Page::Software);
    }

    #[test]
    fn clear_resets_everything_but_the_page() {
        let file = file_with("x");
        let mut session = SessionContext::default();
        session.open_with(file.path(), |_| Ok(workbook())).unwrap();
        session.navigate(Page::Attribute);
        session.clear();

        assert!(session.upload().is_none());
        assert!(session.workbook().is_none());
        assert_eq!(session.capabilities(), &Capabilities::default());
        assert_eq!(session.page(), Page::Attribute);
    }

    #[test]
    fn incomplete_relationships_sheet_produces_no_slices() {
        let file = file_with("x");
        let mut session = SessionContext::default();
        session
            .open_with(file.path(), |_| {
                Ok(Workbook::new(vec![Table::from_rows(
                    "relationships",
                    &["source name", "target name"],
                    vec![vec!["APT28", "T1059"]],
                )]))
            })
            .unwrap();
        assert!(session.tables().relationships.is_some());
        assert!(session.slices().is_none());
    }
}
