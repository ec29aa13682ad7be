//! Handler for `terrabuild catalog`.

use std::path::Path;

use console::Style;
use miette::Result;
use terrabuild_ops::ops_catalog;

use crate::cli::CatalogAction;

pub fn exec(action: CatalogAction, catalog: Option<&Path>) -> Result<()> {
    let loaded = ops_catalog::load(&super::current_dir()?, catalog)?;
    match action {
        CatalogAction::Get { path } => {
            println!("{}", ops_catalog::get(&loaded, &path)?);
        }
        CatalogAction::List { namespace } => {
            let key_style = Style::new().bold();
            for (path, value) in ops_catalog::list(&loaded, namespace.as_deref())? {
                println!("{} = {value}", key_style.apply_to(path));
            }
        }
    }
    Ok(())
}
