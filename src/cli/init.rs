use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{self, Settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut current = settings::load_settings();
    if let Some(dir) = data_dir {
        current.data_dir = settings::shellexpand_path(&dir);
    }
    let dir = PathBuf::from(&current.data_dir);
    std::fs::create_dir_all(&dir)?;
    settings::save_settings(&Settings { session_token: None, ..current })?;

    let conn = get_connection(&settings::db_path())?;
    init_db(&conn)?;

    println!("Initialized khata data in {}", dir.display());
    println!("Next: `khata setup` to set your password.");
    Ok(())
}
