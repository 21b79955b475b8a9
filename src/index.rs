// src/index.rs

use crate::essence_file::EssenceFile;
use crate::keyword::EssenceKeyword;
use crate::model::{FilePath, KeywordName};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Files by full path and keywords by name.
///
/// Every keyword used by an indexed file has an aggregate that has recorded
/// that file, and every file recorded by an aggregate is indexed.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    files: BTreeMap<FilePath, Arc<EssenceFile>>,
    keywords: BTreeMap<KeywordName, EssenceKeyword>,
}

impl CorpusIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold step: the index with `file` and its keyword uses merged in.
    pub fn with_file(mut self, file: EssenceFile) -> Self {
        self.add_file(file);
        self
    }

    /// Returns false if a file with the same path is already indexed.
    pub fn add_file(&mut self, file: EssenceFile) -> bool {
        let key = file.str_path(0);
        if self.files.contains_key(&key) {
            return false;
        }

        let file = Arc::new(file);
        for keyword in file.keywords() {
            self.keywords
                .entry(keyword.to_string())
                .or_insert_with(|| EssenceKeyword::new(keyword))
                .add_file(&file);
        }
        self.files.insert(key, file);
        true
    }

    /// Combine two partial indexes. The result does not depend on which side
    /// a file was folded into.
    pub fn merge(mut self, other: CorpusIndex) -> Self {
        for (path, file) in other.files {
            self.files.entry(path).or_insert(file);
        }
        for (name, keyword) in other.keywords {
            match self.keywords.get_mut(&name) {
                Some(existing) => existing.merge(keyword),
                None => {
                    self.keywords.insert(name, keyword);
                }
            }
        }
        self
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<EssenceFile>> {
        self.files.values()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &EssenceKeyword> {
        self.keywords.values()
    }

    pub fn file(&self, path: &str) -> Option<&Arc<EssenceFile>> {
        self.files.get(path)
    }

    pub fn keyword(&self, name: &str) -> Option<&EssenceKeyword> {
        self.keywords.get(name)
    }

    pub fn n_files(&self) -> usize {
        self.files.len()
    }

    pub fn n_keywords(&self) -> usize {
        self.keywords.len()
    }
}

impl FromIterator<EssenceFile> for CorpusIndex {
    fn from_iter<T: IntoIterator<Item = EssenceFile>>(iter: T) -> Self {
        iter.into_iter().fold(CorpusIndex::new(), CorpusIndex::with_file)
    }
}
