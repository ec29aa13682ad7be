//! Handler for `terrabuild plan`.

use std::path::Path;

use miette::Result;
use terrabuild_ops::ops_plan;

pub fn exec(platform: &str, json: bool, catalog: Option<&Path>) -> Result<()> {
    let ctx = super::load_project(catalog)?;
    let plan = ops_plan::plan(&ctx, platform)?;
    if json {
        println!("{}", ops_plan::to_json(&plan)?);
    } else {
        print!("{}", ops_plan::render(&plan));
    }
    Ok(())
}
