use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::TokenizerError;
use crate::tokenizer::BpeTokenizer;
use crate::trainer::TrainerConfig;

/// Python module entry point
#[pymodule]
fn balnlp_tokenizer_rs(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyTokenizer>()?;
    Ok(())
}

fn to_py_err(err: TokenizerError) -> PyErr {
    match err {
        TokenizerError::NotTrained => PyRuntimeError::new_err(err.to_string()),
        TokenizerError::Io { .. } | TokenizerError::MissingArtifact { .. } => {
            PyIOError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Python wrapper for the BPE tokenizer
#[pyclass(name = "BPETokenizer", module = "balnlp_tokenizer_rs")]
pub struct PyTokenizer {
    pub(crate) inner: BpeTokenizer,
}

#[pymethods]
impl PyTokenizer {
    #[new]
    #[pyo3(signature = (vocab_size=5000, special_tokens=None))]
    pub fn new(vocab_size: usize, special_tokens: Option<Vec<String>>) -> Self {
        let mut config = TrainerConfig {
            vocab_size,
            ..Default::default()
        };
        if let Some(special_tokens) = special_tokens {
            config.special_tokens = special_tokens;
        }
        Self {
            inner: BpeTokenizer::new(config),
        }
    }

    /// Train on a list of documents, optionally saving the bundle
    #[pyo3(signature = (texts, save_dir=None))]
    pub fn train(&mut self, texts: Vec<String>, save_dir: Option<&str>) -> PyResult<()> {
        self.inner.train(&texts).map_err(to_py_err)?;
        if let Some(dir) = save_dir {
            self.inner.save(dir).map_err(to_py_err)?;
        }
        Ok(())
    }

    /// Encode text to a list of token IDs
    pub fn encode(&self, text: &str) -> PyResult<Vec<u32>> {
        self.inner.encode(text).map_err(to_py_err)
    }

    /// Decode a list of token IDs to a string
    pub fn decode(&self, ids: Vec<u32>) -> PyResult<String> {
        self.inner.decode(&ids).map_err(to_py_err)
    }

    /// Token strings for debugging
    pub fn tokenize(&self, text: &str) -> PyResult<Vec<String>> {
        self.inner.tokenize(text).map_err(to_py_err)
    }

    pub fn save(&self, save_dir: &str) -> PyResult<()> {
        self.inner.save(save_dir).map_err(to_py_err)
    }

    #[staticmethod]
    pub fn load(save_dir: &str) -> PyResult<Self> {
        let inner = BpeTokenizer::load(save_dir).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    pub fn get_vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }

    pub fn __len__(&self) -> usize {
        self.inner.vocab_size()
    }
}
