// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration file location.

use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "docscan";
const CONFIG_FILE: &str = "config.json";

/// `$XDG_CONFIG_HOME/docscan/config.json`, falling back to
/// `~/.config/docscan/config.json`.
pub fn default_config_path() -> PathBuf {
    config_base().join(APP_DIR).join(CONFIG_FILE)
}

fn config_base() -> PathBuf {
    config_base_from(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME"))
}

fn config_base_from(xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
    if let Some(xdg) = xdg.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(xdg);
    }
    match home {
        Some(home) => PathBuf::from(home).join(".config"),
        // Last resort
        None => PathBuf::from("."),
    }
}
