//! Rename command - lists the locations renamed together with a name

use anyhow::Result;
use clap::Args;
use vbscope_core::Position;

use super::{PositionArgs, find_document, load_project};
use crate::output::pretty::PrettyFormatter;

#[derive(Args, Debug)]
pub struct RenameArgs {
    #[command(flatten)]
    pub query: PositionArgs,
}

impl RenameArgs {
    pub fn run(&self) -> Result<()> {
        let loaded = load_project(&self.query.path)?;
        let uri = find_document(&loaded.project, &self.query.document)?;
        let position = Position::new(self.query.line, self.query.character);

        let locations = loaded.project.rename(&uri, position)?;

        match self.query.format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&locations)?),
            _ => print!("{}", PrettyFormatter::new().format_locations(&locations)),
        }

        Ok(())
    }
}
