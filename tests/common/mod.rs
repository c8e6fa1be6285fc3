#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use iscc_eval::EvalConfig;

pub fn write(root: &Path, rel: &str, body: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, body).unwrap();
    path
}

/// Two clusters of case / punctuation variants and one unrelated distractor.
pub fn text_corpus(root: &Path) {
    write(
        root,
        "cluster_a/000.txt",
        "The quick brown fox jumps over the lazy dog near the river bank",
    );
    write(
        root,
        "cluster_a/001.txt",
        "THE QUICK BROWN FOX, jumps over the lazy dog near the river bank!",
    );
    write(
        root,
        "cluster_b/000.txt",
        "Lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod",
    );
    write(
        root,
        "cluster_b/001.txt",
        "lorem ipsum dolor sit amet; consectetur adipiscing elit. Sed do eiusmod",
    );
    write(
        root,
        "distractor.txt",
        "An unrelated note about quantum chromodynamics, gluons and colour charge",
    );
}

pub fn config_with_data_dir(data_dir: &Path) -> EvalConfig {
    EvalConfig {
        data_dir: Some(data_dir.to_path_buf()),
        ..EvalConfig::default()
    }
}
