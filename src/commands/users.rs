// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::{PreferenceStore, SqliteStore};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let email = sub.get_one::<String>("email").unwrap();
            let id = SqliteStore::new(conn).create_user(name, email)?;
            println!("Added user '{}' <{}> (id {})", name.trim(), email.trim(), id);
        }
        Some(("use", sub)) => {
            let email = sub.get_one::<String>("email").unwrap();
            let user = SqliteStore::new(conn)
                .find_user(email)?
                .ok_or_else(|| anyhow!("No user with email '{}'", email.trim()))?;
            let store = SqliteStore::sign_in(conn, user.id)?;
            let prefs = store.preferences()?;
            println!("Signed in as {} (currency {})", user.name, prefs.currency);
        }
        Some(("signout", _)) => {
            SqliteStore::sign_out(conn)?;
            println!("Signed out");
        }
        _ => {}
    }
    Ok(())
}
