//! Ordered, immutable changeset sequence.

use std::path::{Path, PathBuf};
use std::slice;

use crate::ChangeSet;

/// Changesets in declared order: source order first, then in-source order.
///
/// Built once through [`ChangeLogBuilder`] and read-only afterwards. An empty
/// changelog (no sources, or sources without changesets) is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeLog {
    changesets: Vec<ChangeSet>,
    sources: Vec<PathBuf>,
}

impl ChangeLog {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> ChangeLogBuilder {
        ChangeLogBuilder::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changesets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }

    #[must_use]
    pub fn get(&self, ordinal: usize) -> Option<&ChangeSet> {
        self.changesets.get(ordinal)
    }

    pub fn iter(&self) -> slice::Iter<'_, ChangeSet> {
        self.changesets.iter()
    }

    /// Declared sources, including ones that contributed no changesets.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

impl<'a> IntoIterator for &'a ChangeLog {
    type Item = &'a ChangeSet;
    type IntoIter = slice::Iter<'a, ChangeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Accumulates sources in declaration order and assigns ordinals.
#[derive(Debug, Default)]
pub struct ChangeLogBuilder {
    changesets: Vec<ChangeSet>,
    sources: Vec<PathBuf>,
}

impl ChangeLogBuilder {
    /// Append every changeset of one source, stamping origin and ordinal.
    #[must_use]
    pub fn source(
        mut self,
        origin: impl AsRef<Path>,
        changesets: impl IntoIterator<Item = ChangeSet>,
    ) -> Self {
        let origin = origin.as_ref();
        for mut changeset in changesets {
            changeset.place(origin, self.changesets.len());
            self.changesets.push(changeset);
        }
        self.sources.push(origin.to_path_buf());
        self
    }

    #[must_use]
    pub fn build(self) -> ChangeLog {
        ChangeLog {
            changesets: self.changesets,
            sources: self.sources,
        }
    }
}
