//! Handler for `terrabuild clean`.

use miette::Result;
use terrabuild_ops::context::find_project_root;
use terrabuild_ops::ops_clean::{self, CleanResult};

pub fn exec(platform: Option<&str>) -> Result<()> {
    let root = find_project_root(&super::current_dir()?)?;
    match ops_clean::clean(&root, platform)? {
        CleanResult::AllCleaned => println!("Cleaned build directory"),
        CleanResult::PlatformCleaned(name) => println!("Cleaned platform '{name}'"),
        CleanResult::PlatformNotFound(name) => {
            println!("Platform '{name}' build directory does not exist")
        }
        CleanResult::NothingToClean => println!("Nothing to clean"),
    }
    Ok(())
}
