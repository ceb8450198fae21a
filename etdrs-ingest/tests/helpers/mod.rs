//! Shared fixtures for etdrs-ingest integration tests

#![allow(dead_code)]

pub mod log_capture;

use std::fs;
use std::path::{Path, PathBuf};

/// Density report with one acquisition row and the given sector rows
pub fn density_report(side: &str, sectors: &[(&str, &str)]) -> String {
    let mut text = String::new();
    text.push_str("Patient ID,Name\n");
    text.push_str("x,y\n\n");
    text.push_str("Eye,S/N,Version(F/S),Date\n");
    text.push_str(&format!("{},611167,22100,2022/09/13\n\n", side));
    text.push_str("<ETDRS 9 Sector Density>\n");
    text.push_str("Size,Diameter\n");
    for (label, value) in sectors {
        text.push_str(&format!("{},{},0.00\n", label, value));
    }
    text.push_str("\n<Other>\nCenter,99.9\n");
    text
}

/// Thickness report listing `sides` in the acquisition block
pub fn thickness_report(sides: &[&str], sectors: &[(&str, &str, &str)]) -> String {
    let mut text = String::new();
    text.push_str("Eye,S/N\n");
    for side in sides {
        text.push_str(&format!("{},611167\n", side));
    }
    text.push_str("\n<ETDRS>\n");
    text.push_str("Sector,Thickness R,Thickness L\n");
    text.push_str("Size,1mm,3mm\n");
    for (label, right, left) in sectors {
        text.push_str(&format!("{},{},{}\n", label, right, left));
    }
    text
}

pub fn write(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
