// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use purseline::config;
use std::io::Write;

#[test]
fn partial_file_keeps_defaults() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        f,
        r#"
log_filter = "purseline=debug"

[rates]
base = "EUR"

[savings]
good = 15
"#
    )
    .unwrap();

    let cfg = config::load_file(f.path()).unwrap();
    assert_eq!(cfg.log_filter, "purseline=debug");
    assert_eq!(cfg.rates.base, "EUR");
    assert_eq!(cfg.rates.url, "https://open.er-api.com/v6/latest");
    assert_eq!(cfg.rates.timeout_secs, 15);
    assert_eq!(cfg.savings.good, 15);
    assert_eq!(cfg.savings.excellent, 20);
    assert!(cfg.database_path.is_none());
}

#[test]
fn malformed_file_is_an_error() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "rates = 3").unwrap();
    assert!(config::load_file(f.path()).is_err());
}
