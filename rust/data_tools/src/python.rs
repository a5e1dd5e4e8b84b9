use crate::dedup::{CandidateIndex, NearDedupConfig, NearDeduplicator};
use crate::exact::ExactDeduplicator;
use crate::repetition::RepetitionFilter;
use crate::shingle::ShingleMode;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Python module entry point
#[pymodule]
fn balnlp_data_tools_rs(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(remove_exact_duplicates, m)?)?;
    m.add_function(wrap_pyfunction!(remove_repetitive, m)?)?;
    m.add_class::<PyNearDeduplicator>()?;
    Ok(())
}

/// Remove exact duplicates after Unicode, whitespace and raw comparison
#[pyfunction]
pub fn remove_exact_duplicates(texts: Vec<String>) -> Vec<String> {
    ExactDeduplicator::new().remove_all_duplicates(&texts)
}

/// Drop documents dominated by one character or one word
#[pyfunction]
#[pyo3(signature = (texts, char_repeat_threshold=0.7, word_repeat_threshold=0.6))]
pub fn remove_repetitive(
    texts: Vec<String>,
    char_repeat_threshold: f64,
    word_repeat_threshold: f64,
) -> PyResult<Vec<String>> {
    let filter = RepetitionFilter::new(char_repeat_threshold, word_repeat_threshold)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(filter.remove_repetitive(&texts))
}

/// Jaccard near-duplicate removal over word or character shingles
#[pyclass(name = "NearDedup", module = "balnlp_data_tools_rs")]
pub struct PyNearDeduplicator {
    inner: NearDeduplicator,
}

#[pymethods]
impl PyNearDeduplicator {
    #[new]
    #[pyo3(signature = (shingle_size=3, threshold=0.8, mode="word", num_perm=None, num_bands=None))]
    pub fn new(
        shingle_size: usize,
        threshold: f64,
        mode: &str,
        num_perm: Option<usize>,
        num_bands: Option<usize>,
    ) -> PyResult<Self> {
        let mode = match mode {
            "word" => ShingleMode::Word,
            "char" => ShingleMode::Char,
            other => {
                return Err(PyValueError::new_err(format!(
                    "mode must be 'word' or 'char', got '{other}'"
                )))
            }
        };
        let index = match (num_perm, num_bands) {
            (Some(num_perm), Some(num_bands)) => CandidateIndex::MinHashLsh {
                num_perm,
                num_bands,
            },
            _ => CandidateIndex::Exhaustive,
        };
        let config = NearDedupConfig {
            shingle_size,
            threshold,
            mode,
            index,
        };
        let inner =
            NearDeduplicator::new(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Returns a list of documents with near-duplicates removed.
    pub fn remove_near_duplicates(&self, texts: Vec<String>) -> Vec<String> {
        self.inner.remove_near_duplicates(&texts)
    }
}
