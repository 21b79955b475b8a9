// src/keyword.rs

use crate::colour::{linear_gradient, Colour, GREEN, HOT_ORANGE, RED, YELLOW};
use crate::error::KeywordError;
use crate::essence_file::EssenceFile;
use crate::model::{FilePath, KeywordName};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Usage statistics of one keyword across every file that uses it.
#[derive(Debug, Clone)]
pub struct EssenceKeyword {
    name: KeywordName,
    total_usages: usize,
    min_usages: Option<usize>,
    max_usages: Option<usize>,
    file_usages: HashMap<Arc<EssenceFile>, usize>,
}

#[derive(Debug, Serialize)]
pub struct EssenceKeywordJson<'a> {
    pub name: &'a str,
    pub used_in_files: Vec<FilePath>,
    pub max_usages_in_file: Option<usize>,
    pub min_usages_in_file: Option<usize>,
    pub avg_usages_per_file: Option<f64>,
    pub total_usages: usize,
}

impl EssenceKeyword {
    pub fn new(name: impl Into<KeywordName>) -> Self {
        EssenceKeyword {
            name: name.into(),
            total_usages: 0,
            min_usages: None,
            max_usages: None,
            file_usages: HashMap::new(),
        }
    }

    pub fn with_files<'a>(name: impl Into<KeywordName>, files: impl IntoIterator<Item = &'a Arc<EssenceFile>>) -> Self {
        let mut keyword = EssenceKeyword::new(name);
        for file in files {
            keyword.add_file(file);
        }
        keyword
    }

    /// Record `file`'s uses of this keyword. Returns false (and changes nothing)
    /// if the file was already recorded or does not use the keyword.
    pub fn add_file(&mut self, file: &Arc<EssenceFile>) -> bool {
        let usages = file.uses(&self.name);
        if usages == 0 || self.file_usages.contains_key(file) {
            return false;
        }
        self.record(Arc::clone(file), usages);
        true
    }

    fn record(&mut self, file: Arc<EssenceFile>, usages: usize) {
        self.file_usages.insert(file, usages);
        self.total_usages += usages;
        self.min_usages = Some(self.min_usages.map_or(usages, |m| m.min(usages)));
        self.max_usages = Some(self.max_usages.map_or(usages, |m| m.max(usages)));
    }

    /// Fold another aggregate of the same keyword into this one.
    pub fn merge(&mut self, other: EssenceKeyword) {
        debug_assert_eq!(self.name, other.name);
        for (file, usages) in other.file_usages {
            if !self.file_usages.contains_key(&file) {
                self.record(file, usages);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_usages(&self) -> usize {
        self.total_usages
    }

    pub fn min_usages(&self) -> Option<usize> {
        self.min_usages
    }

    pub fn max_usages(&self) -> Option<usize> {
        self.max_usages
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<EssenceFile>> {
        self.file_usages.keys()
    }

    pub fn file_usages(&self) -> &HashMap<Arc<EssenceFile>, usize> {
        &self.file_usages
    }

    pub fn num_files_using_keyword(&self) -> usize {
        self.file_usages.len()
    }

    pub fn average_usage(&self) -> Result<f64, KeywordError> {
        if self.file_usages.is_empty() {
            return Err(KeywordError::NoContributingFiles(self.name.clone()));
        }
        Ok(self.total_usages as f64 / self.file_usages.len() as f64)
    }

    /// Paths of the files using this keyword, sorted.
    pub fn file_paths(&self, depth: usize) -> Vec<FilePath> {
        let mut paths: Vec<_> = self.files().map(|f| f.str_path(depth)).collect();
        paths.sort();
        paths
    }

    pub fn usages_in_file(&self, file: &EssenceFile) -> usize {
        file.uses(&self.name)
    }

    /// Heat-map colour for a file using this keyword `n_uses` times.
    ///
    /// Zero uses are red. Below the (truncated) average the colour runs from
    /// hot orange at the minimum to yellow at the average; from the average
    /// up it runs from yellow to green at the maximum.
    pub fn get_colour(&self, n_uses: usize) -> Colour {
        let (Ok(avg), Some(min), Some(max)) = (self.average_usage(), self.min_usages, self.max_usages) else {
            return RED;
        };
        let avg = avg.trunc();
        let n = n_uses as f64;

        if n_uses == 0 {
            RED
        } else if n < avg {
            linear_gradient(n, min as f64, avg, HOT_ORANGE, YELLOW)
        } else {
            linear_gradient(n, avg, max as f64, YELLOW, GREEN)
        }
    }

    pub fn as_json(&self, path_depth: usize) -> EssenceKeywordJson<'_> {
        EssenceKeywordJson {
            name: &self.name,
            used_in_files: self.file_paths(path_depth),
            max_usages_in_file: self.max_usages,
            min_usages_in_file: self.min_usages,
            avg_usages_per_file: self.average_usage().ok(),
            total_usages: self.total_usages,
        }
    }
}
