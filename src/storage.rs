//! Node-list persistence
//!
//! Saves and loads the known-node list. The list is small, so the whole
//! set is written on every save: to a temporary file first, then renamed
//! over the previous copy so a crash mid-write never leaves a torn file.

use crate::address::NetAddress;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

const NODES_FILE: &str = "nodes.json";
const NODES_TMP: &str = "nodes.json.tmp";

/// On-disk store for the node list.
pub struct NodeStore {
    data_dir: PathBuf,
}

impl NodeStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn nodes_path(&self) -> PathBuf {
        self.data_dir.join(NODES_FILE)
    }

    /// Check if a saved node list exists
    pub fn exists(&self) -> bool {
        self.nodes_path().exists()
    }

    /// Save the full node list, replacing any previous copy atomically.
    pub fn save(&self, nodes: &[NetAddress]) -> Result<(), StorageError> {
        let temp_path = self.data_dir.join(NODES_TMP);
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, nodes)?;
        writer.flush()?;

        fs::rename(&temp_path, self.nodes_path())?;
        Ok(())
    }

    /// Load the saved node list.
    pub fn load(&self) -> Result<Vec<NetAddress>, StorageError> {
        let file = fs::File::open(self.nodes_path())?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
